//! Process table access (reads /proc on Linux, in-memory for tests)

pub mod linux;
pub mod memory;

pub use linux::LinuxProcessTable;
pub use memory::InMemoryProcessTable;

use crate::error::Result;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessState {
    Running,
    Sleeping,
    Zombie,
    Stopped,
    Other,
}

impl ProcessState {
    /// Maps the single-letter kernel state code.
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => ProcessState::Running,
            'S' | 'D' | 'I' => ProcessState::Sleeping,
            'Z' => ProcessState::Zombie,
            'T' | 't' => ProcessState::Stopped,
            _ => ProcessState::Other,
        }
    }

    /// Finds the `State:` line of a status record, e.g. `State:\tZ (zombie)`.
    pub fn from_status(status: &str) -> Option<Self> {
        status
            .lines()
            .find_map(|line| line.strip_prefix("State:"))
            .and_then(|rest| rest.trim_start().chars().next())
            .map(Self::from_code)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Running => "running",
            ProcessState::Sleeping => "sleeping",
            ProcessState::Zombie => "zombie",
            ProcessState::Stopped => "stopped",
            ProcessState::Other => "other",
        };
        f.write_str(s)
    }
}

/// Snapshot of one process taken during a single scan pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub state: ProcessState,
    pub parent_pid: Option<u32>,
}

/// Parent pid is the 4th whitespace-separated token of a stat line.
pub fn parse_parent_pid(stat_line: &str) -> Option<u32> {
    stat_line.split_whitespace().nth(3)?.parse().ok()
}

/// Enumerate, inspect and signal processes.
pub trait ProcessTable: Send + Sync {
    /// Every numeric entry of the process list. Fails with `ScanUnavailable`
    /// when the list itself cannot be read.
    fn pids(&self) -> Result<Vec<u32>>;

    fn read_state(&self, pid: u32) -> Result<ProcessState>;

    /// The raw one-line stat record of `pid`.
    fn read_stat(&self, pid: u32) -> Result<String>;

    /// Sends a forced kill to `pid`.
    fn terminate(&self, pid: u32) -> Result<()>;

    /// Records for every readable process; unreadable pids are skipped.
    fn list_processes(&self) -> Result<Vec<ProcessRecord>> {
        let mut records = Vec::new();
        for pid in self.pids()? {
            let Ok(state) = self.read_state(pid) else { continue };
            let parent_pid = self.read_stat(pid).ok().as_deref().and_then(parse_parent_pid);
            records.push(ProcessRecord { pid, state, parent_pid });
        }
        Ok(records)
    }
}
