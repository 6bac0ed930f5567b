//! Zombie process detection

use crate::collector::{parse_parent_pid, ProcessState, ProcessTable};
use crate::error::{MonitorError, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZombieRecord {
    pub pid: u32,
    /// `None` when the stat line could not be resolved to a parent.
    pub parent_pid: Option<u32>,
}

/// Outcome of one scan pass.
#[derive(Debug, Default)]
pub struct ZombieReport {
    pub zombies: Vec<ZombieRecord>,
    /// Per-entry failures that did not stop the scan.
    pub errors: Vec<MonitorError>,
}

impl ZombieReport {
    pub fn is_empty(&self) -> bool {
        self.zombies.is_empty()
    }

    /// Zombies whose parent is known, as `(zombie_pid, parent_pid)`.
    pub fn resolved(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.zombies
            .iter()
            .filter_map(|z| z.parent_pid.map(|ppid| (z.pid, ppid)))
    }
}

/// Walks the whole process table once and collects every zombie.
///
/// Only an unreadable process list fails the scan. A pid whose status can't
/// be read is skipped; a zombie whose parent can't be resolved is still
/// reported, with a `ParentResolutionFailed` entry in `errors`.
pub fn scan_zombies<T: ProcessTable + ?Sized>(table: &T) -> Result<ZombieReport> {
    let mut report = ZombieReport::default();

    for pid in table.pids()? {
        let state = match table.read_state(pid) {
            Ok(state) => state,
            Err(e) => {
                debug!("Skipping pid {}: {}", pid, e);
                continue;
            }
        };
        if state != ProcessState::Zombie {
            continue;
        }

        info!("Zombie process detected: PID {}", pid);
        let parent_pid = table.read_stat(pid).ok().as_deref().and_then(parse_parent_pid);
        match parent_pid {
            Some(ppid) => info!("Parent PID: {}", ppid),
            None => {
                let err = MonitorError::ParentResolutionFailed { pid };
                warn!("{}", err);
                report.errors.push(err);
            }
        }
        report.zombies.push(ZombieRecord { pid, parent_pid });
    }

    if report.is_empty() {
        info!("No zombie processes found.");
    }
    Ok(report)
}
