use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leakwatch_core::{
    collector::LinuxProcessTable,
    config::Config,
    counter::{Counter, CpuCounter, RssCounter},
    db::{Database, RunKind},
    detector::{self, LeakVerdict},
    executor::{self, RemediationOutcome},
    injector::{self, LeakInjector},
    notifier::Notifier,
    plot::{GnuplotSink, PlotRequest, PlotSink},
    recovery,
    sampler::Sampler,
    scanner::{self, ZombieRecord},
    series::TimeSeries,
};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leakwatch")]
#[command(about = "Sample memory/CPU counters, flag leaks, find zombie processes", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the per-user config path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Skip rendering plots
    #[arg(long, global = true)]
    no_plot: bool,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor resident memory of a process (this one by default)
    Memory {
        #[arg(short, long)]
        duration: Option<u64>,
        #[arg(short, long)]
        interval: Option<u64>,
        #[arg(short, long)]
        pid: Option<u32>,
    },
    /// Allocate blocks on a timer and classify the resulting growth
    Leak {
        #[arg(short, long)]
        blocks: Option<u64>,
        #[arg(short, long)]
        interval: Option<u64>,
        /// Keep the allocated blocks for the rest of the process lifetime
        #[arg(long)]
        no_cleanup: bool,
    },
    /// Monitor system-wide CPU utilization
    Cpu {
        #[arg(short, long)]
        duration: Option<u64>,
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Find zombie processes, optionally killing their parents
    Zombies {
        /// SIGKILL the parent of every zombie found. Parents are live
        /// processes and may supervise unrelated work.
        #[arg(long)]
        kill_parents: bool,
        /// Leave an unreaped child behind first so there is something to find
        #[arg(long)]
        spawn_demo: bool,
    },
    /// Record data in the recovery log, then exit abnormally
    Crash {
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Restore the last data recorded in the recovery log
    Recover,
}

/// Where a run's series goes and how its plot is labelled.
struct RunOutput<'a> {
    kind: RunKind,
    data_file: &'a str,
    plot_file: &'a str,
    title: &'a str,
    y_label: &'a str,
    legend: &'a str,
}

struct AppState {
    config: Config,
    plotter: Option<GnuplotSink>,
    history: Option<Database>,
    notifier: Notifier,
    json: bool,
}

impl AppState {
    fn new(config: Config, no_plot: bool, json: bool) -> Self {
        let plotter = (config.plot.enabled && !no_plot)
            .then(|| GnuplotSink::new(&config.plot.gnuplot_path, config.plot.open_viewer));
        let history = if config.history.enabled {
            open_history(&config)
        } else {
            None
        };
        let notifier = Notifier::new(config.general.notify);
        Self { config, plotter, history, notifier, json }
    }

    /// Saves the series, renders it and records the run.
    fn finish_run(&self, output: &RunOutput<'_>, series: &TimeSeries, verdict: Option<&LeakVerdict>) -> Result<()> {
        let data_path = self.config.output_path(output.data_file);
        series
            .save(&data_path)
            .with_context(|| format!("writing {}", data_path.display()))?;
        info!("Wrote {} samples to {}", series.len(), data_path.display());

        if let Some(plotter) = &self.plotter {
            let request = PlotRequest::new(
                &data_path,
                &self.config.output_path(output.plot_file),
                output.title,
                output.y_label,
                output.legend,
            );
            if let Err(e) = plotter.render(&request) {
                warn!("Could not plot {}: {}", data_path.display(), e);
            }
        }

        if let Some(db) = &self.history {
            if let Err(e) = db.insert_run(output.kind, series.len(), Some(&data_path), verdict) {
                error!("Failed to save run: {}", e);
            }
        }
        Ok(())
    }

    fn monitor(&self, kind: RunKind, counter: &mut dyn Counter, duration: u64, interval: u64) -> Result<TimeSeries> {
        info!("Monitoring {} for {} seconds...", kind.as_str(), duration);
        let sampler = Sampler::new(duration, interval)?;
        Ok(sampler.run(counter)?)
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(())
    }

    fn report_verdict(&self, verdict: &LeakVerdict) {
        info!("=== [ANALYSIS] Memory Leak ===");
        for line in verdict.to_string().lines() {
            info!("{}", line);
        }
        if verdict.suspected {
            self.notifier.send(
                "LeakWatch: memory leak suspected",
                &format!("Net growth {} KB", verdict.net_growth),
            );
        }
    }

    fn record_remediations(&self, outcomes: &[RemediationOutcome]) {
        for outcome in outcomes {
            if let Some(db) = &self.history {
                if let Err(e) = db.insert_remediation(outcome) {
                    error!("Failed to save remediation: {}", e);
                }
            }
            if outcome.success {
                self.notifier.send(
                    "LeakWatch: zombie parent killed",
                    &format!("PID {} (parent of zombie {})", outcome.parent_pid, outcome.zombie_pid),
                );
            }
        }
    }
}

fn open_history(config: &Config) -> Option<Database> {
    let path = config.history.db_path.clone().unwrap_or_else(Database::default_path);
    let opened = Database::open(&path).and_then(|db| {
        db.init_schema()?;
        db.cleanup_old_data(config.history.retention_days)?;
        Ok(db)
    });
    match opened {
        Ok(db) => Some(db),
        Err(e) => {
            warn!("Run history disabled, could not open {}: {}", path.display(), e);
            None
        }
    }
}

#[derive(Serialize)]
struct ZombieOutput<'a> {
    zombies: &'a [ZombieRecord],
    errors: Vec<String>,
    remediations: &'a [RemediationOutcome],
}

fn read_crash_data() -> Result<String> {
    print!("Enter data to write before crash: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = if config_path.exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        info!("No config file found, using defaults");
        Config::default()
    };

    let state = AppState::new(config, cli.no_plot, cli.json);
    let proc_root = state.config.general.proc_root.clone();

    match cli.command {
        Commands::Memory { duration, interval, pid } => {
            let run = &state.config.memory;
            let pid = pid.unwrap_or_else(std::process::id);
            let mut counter = RssCounter::with_root(&proc_root, pid);
            let series = state.monitor(
                RunKind::Memory,
                &mut counter,
                duration.unwrap_or(run.duration_seconds),
                interval.unwrap_or(run.interval_seconds),
            )?;
            let output = RunOutput {
                kind: RunKind::Memory,
                data_file: &run.data_file,
                plot_file: &run.plot_file,
                title: "Memory Usage Over Time",
                y_label: counter.unit_label(),
                legend: "VmRSS",
            };
            state.finish_run(&output, &series, None)?;
            match detector::classify(&series) {
                Ok(verdict) => {
                    state.report_verdict(&verdict);
                    state.print_json(&serde_json::json!({ "series": series, "verdict": verdict }))?;
                }
                Err(e) => {
                    warn!("{}", e);
                    state.print_json(&serde_json::json!({ "series": series }))?;
                }
            }
        }

        Commands::Leak { blocks, interval, no_cleanup } => {
            let leak = &state.config.leak;
            let cleanup = leak.cleanup && !no_cleanup;
            let mut counter = RssCounter::with_root(&proc_root, std::process::id());
            let mut injector = LeakInjector::new();
            let run = injector.simulate(
                &mut counter,
                blocks.unwrap_or(leak.block_count),
                interval.unwrap_or(leak.interval_seconds),
                false,
            )?;
            let output = RunOutput {
                kind: RunKind::Leak,
                data_file: &leak.data_file,
                plot_file: &leak.plot_file,
                title: "Memory Leak Simulation",
                y_label: counter.unit_label(),
                legend: "VmRSS",
            };
            state.finish_run(&output, &run.series, run.verdict.as_ref().ok())?;
            match &run.verdict {
                Ok(verdict) => {
                    state.report_verdict(verdict);
                    state.print_json(&serde_json::json!({ "series": run.series, "verdict": verdict }))?;
                }
                Err(e) => {
                    warn!("{}", e);
                    state.print_json(&serde_json::json!({ "series": run.series }))?;
                }
            }
            if cleanup {
                injector.release();
            } else {
                info!("Holding {} blocks until exit", injector.held_blocks());
            }
        }

        Commands::Cpu { duration, interval } => {
            let run = &state.config.cpu;
            let mut counter = CpuCounter::with_root(&proc_root);
            let series = state.monitor(
                RunKind::Cpu,
                &mut counter,
                duration.unwrap_or(run.duration_seconds),
                interval.unwrap_or(run.interval_seconds),
            )?;
            let output = RunOutput {
                kind: RunKind::Cpu,
                data_file: &run.data_file,
                plot_file: &run.plot_file,
                title: "CPU Usage Over Time",
                y_label: counter.unit_label(),
                legend: "CPU Usage",
            };
            state.finish_run(&output, &series, None)?;
            state.print_json(&series)?;
        }

        Commands::Zombies { kill_parents, spawn_demo } => {
            let remediate = kill_parents || state.config.zombie.remediate;
            // held so the demo child stays unreaped until the scan is over
            let _demo = if spawn_demo || state.config.zombie.spawn_demo {
                if remediate {
                    warn!("The demo zombie's parent is this process; remediation will kill leakwatch itself");
                }
                Some(injector::spawn_zombie(Duration::from_secs(1)).context("spawning demo child")?)
            } else {
                None
            };

            let table = LinuxProcessTable::with_root(&proc_root);
            let report = scanner::scan_zombies(&table)?;
            let outcomes = if remediate && !report.is_empty() {
                warn!("Killing parents of {} zombie(s); this also ends any other work they supervise", report.zombies.len());
                executor::remediate(&table, &report)
            } else {
                if !report.is_empty() {
                    info!("Detection only; pass --kill-parents to terminate their parents");
                }
                Vec::new()
            };
            state.record_remediations(&outcomes);
            state.print_json(&ZombieOutput {
                zombies: &report.zombies,
                errors: report.errors.iter().map(|e| e.to_string()).collect(),
                remediations: &outcomes,
            })?;
        }

        Commands::Crash { data } => {
            let data = match data {
                Some(data) => data,
                None => read_crash_data()?,
            };
            recovery::record(&state.config.recovery.log_file, &data)
                .with_context(|| format!("appending to {}", state.config.recovery.log_file.display()))?;
            error!("Simulated crash after logging data");
            std::process::exit(1);
        }

        Commands::Recover => {
            let recovery = &state.config.recovery;
            match recovery::recover(&recovery.log_file, &recovery.data_file)? {
                Some(data) => info!("Recovered file with last data: {}", data),
                None => info!("No data found to recover."),
            }
        }
    }

    Ok(())
}
