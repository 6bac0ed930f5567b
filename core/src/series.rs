//! Time series of sampled counter values and their two-column file format

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// One recorded value, `timestamp` seconds after the run started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: u64,
    pub value: f64,
}

/// Samples in acquisition order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    samples: Vec<Sample>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { samples: Vec::with_capacity(capacity) }
    }

    /// Builds a series from bare values, one second apart.
    pub fn from_values(values: &[f64]) -> Self {
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, &value)| Sample { timestamp: i as u64, value })
            .collect();
        Self { samples }
    }

    pub(crate) fn push(&mut self, timestamp: u64, value: f64) {
        debug_assert!(self.samples.last().map_or(true, |s| s.timestamp <= timestamp));
        self.samples.push(Sample { timestamp, value });
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Writes `<timestamp> <value>` lines, no header.
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        for s in &self.samples {
            writeln!(out, "{} {}", s.timestamp, s.value)?;
        }
        out.flush()
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = fs::File::create(path)?;
        self.write_to(io::BufWriter::new(file))
    }

    /// Parses the two-column format back. Blank lines are ignored.
    pub fn read_from<R: io::Read>(input: R) -> io::Result<Self> {
        let mut series = Self::new();
        for (lineno, line) in BufReader::new(input).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut cols = line.split_whitespace();
            let parsed = match (cols.next(), cols.next(), cols.next()) {
                (Some(ts), Some(value), None) => ts.parse::<u64>().ok().zip(value.parse::<f64>().ok()),
                _ => None,
            };
            let (timestamp, value) = parsed.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line {}: expected `<timestamp> <value>`, got {:?}", lineno + 1, line),
                )
            })?;
            series.samples.push(Sample { timestamp, value });
        }
        Ok(series)
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Self::read_from(fs::File::open(path)?)
    }
}
