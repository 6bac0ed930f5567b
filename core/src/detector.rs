//! Memory leak classification over a completed memory series
//!
//! Deliberately crude: adjacent deltas are counted as rising or not, and the
//! verdict only looks at last minus first. There is no slope fit or noise
//! filtering.

use crate::error::{MonitorError, Result};
use crate::series::TimeSeries;
use serde::Serialize;
use std::fmt;

/// A step counts as rising only when it grows by more than this many kB.
pub const RISING_DELTA_KB: f64 = 8.0;

/// Net growth above this many kB marks the run as a suspected leak.
pub const LEAK_THRESHOLD_KB: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakVerdict {
    pub initial: f64,
    pub final_value: f64,
    pub net_growth: f64,
    pub rising_intervals: usize,
    pub flat_or_falling_intervals: usize,
    pub suspected: bool,
}

impl LeakVerdict {
    pub fn summary(&self) -> &'static str {
        if self.suspected {
            "memory usage increased and was not released; predicting memory loss if it is never freed"
        } else {
            "no leak detected"
        }
    }
}

impl fmt::Display for LeakVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Initial: {} KB | Final: {} KB", self.initial, self.final_value)?;
        writeln!(f, "Net growth: {} KB", self.net_growth)?;
        writeln!(
            f,
            "Intervals growing: {}, stable/dropping: {}",
            self.rising_intervals, self.flat_or_falling_intervals
        )?;
        write!(f, "RESULT -> {}", self.summary())
    }
}

pub fn classify(series: &TimeSeries) -> Result<LeakVerdict> {
    let values: Vec<f64> = series.values().collect();
    classify_values(&values)
}

pub fn classify_values(values: &[f64]) -> Result<LeakVerdict> {
    let (initial, final_value) = match values {
        [first, .., last] => (*first, *last),
        _ => return Err(MonitorError::InsufficientSamples { len: values.len() }),
    };

    let rising_intervals = values
        .windows(2)
        .filter(|pair| pair[1] - pair[0] > RISING_DELTA_KB)
        .count();
    let flat_or_falling_intervals = values.len() - 1 - rising_intervals;
    let net_growth = final_value - initial;

    Ok(LeakVerdict {
        initial,
        final_value,
        net_growth,
        rising_intervals,
        flat_or_falling_intervals,
        suspected: net_growth > LEAK_THRESHOLD_KB,
    })
}
