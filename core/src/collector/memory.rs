use super::{ProcessState, ProcessTable};
use crate::error::{MonitorError, Result};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct FakeProcess {
    state: ProcessState,
    stat: Option<String>,
}

/// A process table held entirely in memory. Terminations are recorded, not
/// performed.
#[derive(Debug, Default)]
pub struct InMemoryProcessTable {
    processes: BTreeMap<u32, FakeProcess>,
    unavailable: bool,
    refuse_terminate: HashSet<u32>,
    terminated: Mutex<Vec<u32>>,
}

impl InMemoryProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table whose process list cannot be read at all.
    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Self::default() }
    }

    /// Adds a process with a well-formed stat line naming `parent_pid`.
    pub fn with_process(self, pid: u32, state: ProcessState, parent_pid: u32) -> Self {
        let code = match state {
            ProcessState::Running => 'R',
            ProcessState::Sleeping => 'S',
            ProcessState::Zombie => 'Z',
            ProcessState::Stopped => 'T',
            ProcessState::Other => 'X',
        };
        let stat = format!("{} (fake) {} {} {} {} 0 -1", pid, code, parent_pid, pid, pid);
        self.with_stat(pid, state, stat)
    }

    pub fn with_stat(mut self, pid: u32, state: ProcessState, stat: impl Into<String>) -> Self {
        self.processes.insert(pid, FakeProcess { state, stat: Some(stat.into()) });
        self
    }

    /// Adds a process whose stat record cannot be read.
    pub fn with_unreadable_stat(mut self, pid: u32, state: ProcessState) -> Self {
        self.processes.insert(pid, FakeProcess { state, stat: None });
        self
    }

    /// Makes `terminate(pid)` fail.
    pub fn refuse_terminate(mut self, pid: u32) -> Self {
        self.refuse_terminate.insert(pid);
        self
    }

    /// Pids passed to successful `terminate` calls, in call order.
    pub fn terminated(&self) -> Vec<u32> {
        self.terminated.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn get(&self, pid: u32) -> Result<&FakeProcess> {
        self.processes.get(&pid).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such process {}", pid)).into()
        })
    }
}

impl ProcessTable for InMemoryProcessTable {
    fn pids(&self) -> Result<Vec<u32>> {
        if self.unavailable {
            return Err(MonitorError::ScanUnavailable {
                root: PathBuf::from("<memory>"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "process list unavailable"),
            });
        }
        Ok(self.processes.keys().copied().collect())
    }

    fn read_state(&self, pid: u32) -> Result<ProcessState> {
        Ok(self.get(pid)?.state)
    }

    fn read_stat(&self, pid: u32) -> Result<String> {
        self.get(pid)?.stat.clone().ok_or_else(|| {
            io::Error::new(io::ErrorKind::PermissionDenied, format!("stat of {} unreadable", pid)).into()
        })
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        if self.refuse_terminate.contains(&pid) || !self.processes.contains_key(&pid) {
            return Err(MonitorError::RemediationFailed {
                pid,
                reason: "No such process or operation not permitted".to_string(),
            });
        }
        if let Ok(mut terminated) = self.terminated.lock() {
            terminated.push(pid);
        }
        Ok(())
    }
}
