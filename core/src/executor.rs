//! Zombie remediation: kill the parent so init adopts and reaps the zombie.
//!
//! This is blunt. The parent is a live process, often a supervisor or shell
//! that owns other healthy children, and all of them lose it. Only run it
//! behind an explicit opt-in.

use crate::collector::ProcessTable;
use crate::error::{MonitorError, Result};
use crate::scanner::ZombieReport;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationOutcome {
    pub zombie_pid: u32,
    pub parent_pid: u32,
    pub success: bool,
    pub error: Option<String>,
}

/// Sends SIGKILL to `parent_pid`. Pid 0 is refused since it addresses the
/// caller's whole process group.
pub fn terminate_parent<T: ProcessTable + ?Sized>(table: &T, parent_pid: u32) -> Result<()> {
    if parent_pid == 0 {
        return Err(MonitorError::RemediationFailed {
            pid: parent_pid,
            reason: "pid 0 is not a process".to_string(),
        });
    }
    table.terminate(parent_pid)
}

/// Kills the parent of every resolved zombie in `report`, one at a time.
/// A failure is recorded and the next zombie is still handled. Zombies
/// without a known parent are skipped.
pub fn remediate<T: ProcessTable + ?Sized>(table: &T, report: &ZombieReport) -> Vec<RemediationOutcome> {
    report
        .resolved()
        .map(|(zombie_pid, parent_pid)| match terminate_parent(table, parent_pid) {
            Ok(()) => {
                info!("Successfully sent SIGKILL to Parent PID {}", parent_pid);
                RemediationOutcome { zombie_pid, parent_pid, success: true, error: None }
            }
            Err(e) => {
                warn!("Failed to send SIGKILL to Parent PID {}: {}", parent_pid, e);
                RemediationOutcome {
                    zombie_pid,
                    parent_pid,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect()
}
