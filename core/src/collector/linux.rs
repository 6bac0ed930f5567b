use super::{ProcessState, ProcessTable};
use crate::error::{MonitorError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Process table backed by a procfs-style directory tree.
#[derive(Debug, Clone)]
pub struct LinuxProcessTable {
    root: PathBuf,
}

impl LinuxProcessTable {
    pub fn new() -> Self {
        Self::with_root(DEFAULT_PROC_ROOT)
    }

    /// Reads from `root` instead of `/proc`, e.g. a synthetic tree in tests.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_entry(&self, pid: u32, file: &str) -> io::Result<String> {
        fs::read_to_string(self.root.join(pid.to_string()).join(file))
    }
}

impl Default for LinuxProcessTable {
    fn default() -> Self { Self::new() }
}

fn is_pid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

impl ProcessTable for LinuxProcessTable {
    fn pids(&self) -> Result<Vec<u32>> {
        let entries = fs::read_dir(&self.root).map_err(|source| MonitorError::ScanUnavailable {
            root: self.root.clone(),
            source,
        })?;
        let mut pids: Vec<u32> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_str()?;
                if is_pid_name(name) { name.parse().ok() } else { None }
            })
            .collect();
        pids.sort_unstable();
        Ok(pids)
    }

    fn read_state(&self, pid: u32) -> Result<ProcessState> {
        let status = self.read_entry(pid, "status")?;
        ProcessState::from_status(&status).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("no State line for pid {}", pid)).into()
        })
    }

    fn read_stat(&self, pid: u32) -> Result<String> {
        let stat = self.read_entry(pid, "stat")?;
        Ok(stat.lines().next().unwrap_or_default().to_string())
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        let target = libc::pid_t::try_from(pid).map_err(|_| MonitorError::RemediationFailed {
            pid,
            reason: "pid out of range".to_string(),
        })?;
        let result = unsafe { libc::kill(target, libc::SIGKILL) };
        if result == 0 {
            Ok(())
        } else {
            Err(MonitorError::RemediationFailed {
                pid,
                reason: io::Error::last_os_error().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_names_are_all_digits() {
        assert!(is_pid_name("42"));
        assert!(!is_pid_name("self"));
        assert!(!is_pid_name("+42"));
        assert!(!is_pid_name(""));
    }

    #[test]
    fn missing_root_is_scan_unavailable() {
        let table = LinuxProcessTable::with_root("/nonexistent/leakwatch-proc");
        assert!(matches!(table.pids(), Err(MonitorError::ScanUnavailable { .. })));
    }
}
