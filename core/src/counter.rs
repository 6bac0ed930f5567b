//! Counter readers: resident memory of a process, system-wide CPU busy time

use crate::collector::linux::DEFAULT_PROC_ROOT;
use crate::error::{MonitorError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Something that yields one current value per call.
pub trait Counter {
    fn read(&mut self) -> Result<f64>;

    /// Axis label for plots of this counter.
    fn unit_label(&self) -> &'static str;
}

/// Value of the `VmRSS:` line of a status record, in kB.
pub fn parse_vm_rss_kb(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .map(|rest| rest.trim().trim_end_matches("kB").trim())
        .and_then(|kb| kb.parse().ok())
}

/// Resident memory of one process.
#[derive(Debug, Clone)]
pub struct RssCounter {
    pid: u32,
    status_path: PathBuf,
}

impl RssCounter {
    pub fn new(pid: u32) -> Self {
        Self::with_root(DEFAULT_PROC_ROOT, pid)
    }

    pub fn with_root(root: impl AsRef<Path>, pid: u32) -> Self {
        let status_path = root.as_ref().join(pid.to_string()).join("status");
        Self { pid, status_path }
    }

    pub fn current_process() -> Self {
        Self::new(std::process::id())
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn read_kb(&self) -> Result<u64> {
        let unavailable = |reason: String| MonitorError::CounterUnavailable {
            target: format!("pid {}", self.pid),
            reason,
        };
        let status = fs::read_to_string(&self.status_path).map_err(|e| unavailable(e.to_string()))?;
        parse_vm_rss_kb(&status).ok_or_else(|| unavailable("no VmRSS field".to_string()))
    }
}

impl Counter for RssCounter {
    fn read(&mut self) -> Result<f64> {
        Ok(self.read_kb()? as f64)
    }

    fn unit_label(&self) -> &'static str {
        "Memory (kB)"
    }
}

/// Cumulative CPU time counters from the aggregate `cpu` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
}

impl CpuTimes {
    /// Parses `cpu  <user> <nice> <system> <idle> <iowait> <irq> <softirq> ...`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        if fields.next()? != "cpu" {
            return None;
        }
        let mut next = || fields.next()?.parse::<u64>().ok();
        Some(Self {
            user: next()?,
            nice: next()?,
            system: next()?,
            idle: next()?,
            iowait: next()?,
            irq: next()?,
            softirq: next()?,
        })
    }

    pub fn total(&self) -> u64 {
        [self.nice, self.system, self.idle, self.iowait, self.irq, self.softirq]
            .iter()
            .fold(self.user, |sum, &v| sum.saturating_add(v))
    }

    pub fn idle_time(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    /// Busy percentage over the interval between `previous` and `self`.
    pub fn busy_percent_since(&self, previous: &CpuTimes) -> f64 {
        let total_diff = self.total().saturating_sub(previous.total());
        if total_diff == 0 {
            return 0.0;
        }
        let idle_diff = self.idle_time().saturating_sub(previous.idle_time());
        100.0 * (1.0 - idle_diff as f64 / total_diff as f64)
    }
}

/// System CPU utilization. Holds the previous cumulative reading; each
/// instance is independent of every other.
#[derive(Debug, Clone)]
pub struct CpuCounter {
    stat_path: PathBuf,
    previous: Option<CpuTimes>,
}

impl CpuCounter {
    pub fn new() -> Self {
        Self::with_root(DEFAULT_PROC_ROOT)
    }

    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self { stat_path: root.as_ref().join("stat"), previous: None }
    }

    pub fn previous(&self) -> Option<CpuTimes> {
        self.previous
    }

    /// Folds a new cumulative reading into the carried state. The first
    /// reading has nothing to compare against and yields 0.
    pub fn observe(&mut self, current: CpuTimes) -> f64 {
        let percent = match &self.previous {
            Some(previous) => current.busy_percent_since(previous),
            None => 0.0,
        };
        self.previous = Some(current);
        percent
    }

    fn read_times(&self) -> Result<CpuTimes> {
        let unavailable = |reason: String| MonitorError::CounterUnavailable {
            target: self.stat_path.display().to_string(),
            reason,
        };
        let stat = fs::read_to_string(&self.stat_path).map_err(|e| unavailable(e.to_string()))?;
        stat.lines()
            .next()
            .and_then(CpuTimes::parse)
            .ok_or_else(|| unavailable("malformed cpu line".to_string()))
    }
}

impl Default for CpuCounter {
    fn default() -> Self { Self::new() }
}

impl Counter for CpuCounter {
    fn read(&mut self) -> Result<f64> {
        let current = self.read_times()?;
        Ok(self.observe(current))
    }

    fn unit_label(&self) -> &'static str {
        "CPU Usage (%)"
    }
}
