//! Configuration management (TOML)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub memory: RunConfig,
    pub leak: LeakConfig,
    pub cpu: RunConfig,
    #[serde(default)]
    pub zombie: ZombieConfig,
    #[serde(default)]
    pub plot: PlotConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub proc_root: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub notify: bool,
}

/// A timed sampling run and where its output lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub duration_seconds: u64,
    pub interval_seconds: u64,
    pub data_file: String,
    pub plot_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeakConfig {
    pub block_count: u64,
    pub interval_seconds: u64,
    pub cleanup: bool,
    pub data_file: String,
    pub plot_file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZombieConfig {
    /// Kill the parent of each zombie found. Off unless asked for.
    pub remediate: bool,
    pub spawn_demo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    pub enabled: bool,
    pub gnuplot_path: PathBuf,
    pub open_viewer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    pub log_file: PathBuf,
    pub data_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    pub retention_days: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            enabled: true,
            gnuplot_path: PathBuf::from("/usr/bin/gnuplot"),
            open_viewer: false,
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            log_file: PathBuf::from("recovery_log.txt"),
            data_file: PathBuf::from("file_data.txt"),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig { enabled: false, db_path: None, retention_days: 30 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            general: GeneralConfig {
                proc_root: PathBuf::from("/proc"),
                output_dir: PathBuf::from("."),
                notify: false,
            },
            memory: RunConfig {
                duration_seconds: 10,
                interval_seconds: 1,
                data_file: "mem_data.txt".to_string(),
                plot_file: "mem_plot.png".to_string(),
            },
            leak: LeakConfig {
                block_count: 10,
                interval_seconds: 1,
                cleanup: true,
                data_file: "leak_data.txt".to_string(),
                plot_file: "leak_plot.png".to_string(),
            },
            cpu: RunConfig {
                duration_seconds: 10,
                interval_seconds: 1,
                data_file: "cpu_usage_data.txt".to_string(),
                plot_file: "cpu_usage_plot.png".to_string(),
            },
            zombie: ZombieConfig::default(),
            plot: PlotConfig::default(),
            recovery: RecoveryConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "leakwatch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// `name` placed under `general.output_dir`.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.general.output_dir.join(name)
    }
}
