//! Error taxonomy shared by the sampling, analysis and scanning modules

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    /// The counter source for a process or the system could not be read.
    #[error("counter unavailable for {target}: {reason}")]
    CounterUnavailable { target: String, reason: String },

    /// A sampling tick failed; runs have no per-tick recovery.
    #[error("sampling failed at tick {tick}: {source}")]
    SamplingFailed {
        tick: usize,
        #[source]
        source: Box<MonitorError>,
    },

    #[error("leak classification needs at least 2 samples, got {len}")]
    InsufficientSamples { len: usize },

    /// The process-list root could not be listed; fatal to a scan.
    #[error("process list {root:?} unavailable: {source}")]
    ScanUnavailable {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not resolve parent pid of zombie {pid}")]
    ParentResolutionFailed { pid: u32 },

    #[error("failed to terminate pid {pid}: {reason}")]
    RemediationFailed { pid: u32, reason: String },

    #[error("invalid schedule: duration {duration}s, interval {interval}s")]
    InvalidSchedule { duration: u64, interval: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
