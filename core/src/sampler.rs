//! Fixed-interval sampling into a time series

use crate::counter::Counter;
use crate::error::{MonitorError, Result};
use crate::series::TimeSeries;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Drives one monitoring run: a sample at t = 0, interval, 2*interval, ...
/// while t < duration. Acquire first, then sleep.
#[derive(Debug, Clone)]
pub struct Sampler {
    duration: u64,
    interval: u64,
    pause: Duration,
}

impl Sampler {
    /// `duration` and `interval` are seconds, both positive, interval <= duration.
    pub fn new(duration: u64, interval: u64) -> Result<Self> {
        if duration == 0 || interval == 0 || interval > duration {
            return Err(MonitorError::InvalidSchedule { duration, interval });
        }
        Ok(Self { duration, interval, pause: Duration::from_secs(interval) })
    }

    /// Replaces the wall-clock pause between ticks. Timestamps are unaffected.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// ceil(duration / interval)
    pub fn tick_count(&self) -> usize {
        self.duration.div_ceil(self.interval) as usize
    }

    pub fn run<C: Counter + ?Sized>(&self, counter: &mut C) -> Result<TimeSeries> {
        let label = counter.unit_label();
        self.run_with(|_| {
            let value = counter.read()?;
            debug!(unit = label, value, "sampled");
            Ok(value)
        })
    }

    /// Calls `acquire(tick)` once per tick. The first failure ends the run.
    pub fn run_with<F>(&self, mut acquire: F) -> Result<TimeSeries>
    where
        F: FnMut(usize) -> Result<f64>,
    {
        let mut series = TimeSeries::with_capacity(self.tick_count());
        for tick in 0..self.tick_count() {
            let t = tick as u64 * self.interval;
            let value = acquire(tick).map_err(|e| MonitorError::SamplingFailed {
                tick,
                source: Box::new(e),
            })?;
            info!("[t={}s] {}", t, value);
            series.push(t, value);
            if !self.pause.is_zero() {
                thread::sleep(self.pause);
            }
        }
        Ok(series)
    }
}
