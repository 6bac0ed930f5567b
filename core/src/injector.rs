//! Demo harnesses: artificial memory growth and an unreaped child

use crate::counter::Counter;
use crate::detector::{self, LeakVerdict};
use crate::error::Result;
use crate::sampler::Sampler;
use crate::series::TimeSeries;
use std::io;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::info;

/// 100_000 four-byte words, roughly 400 kB per block.
pub const BLOCK_WORDS: usize = 100_000;

/// Holds every block it allocates until `release` is called.
#[derive(Debug, Default)]
pub struct LeakInjector {
    blocks: Vec<Box<[u32]>>,
    pause: Option<Duration>,
}

/// A finished injection run. The series is kept even when it is too short
/// to classify.
#[derive(Debug)]
pub struct LeakRun {
    pub series: TimeSeries,
    pub verdict: Result<LeakVerdict>,
}

impl LeakInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the wall-clock pause between allocations.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn held_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn held_bytes(&self) -> usize {
        self.blocks.len() * BLOCK_WORDS * std::mem::size_of::<u32>()
    }

    /// Allocates `block_count` blocks, one per tick, reading `counter`
    /// after each allocation. Timestamps are `i * interval`.
    pub fn inject<C: Counter + ?Sized>(
        &mut self,
        counter: &mut C,
        block_count: u64,
        interval: u64,
    ) -> Result<TimeSeries> {
        let mut sampler = Sampler::new(block_count.saturating_mul(interval), interval)?;
        if let Some(pause) = self.pause {
            sampler = sampler.with_pause(pause);
        }
        sampler.run_with(|_| {
            // filled, not zeroed, so the pages are actually resident
            self.blocks.push(vec![0xA5A5_A5A5u32; BLOCK_WORDS].into_boxed_slice());
            counter.read()
        })
    }

    /// Injects, releases the blocks if `cleanup` is set, then classifies.
    /// With `cleanup` the blocks are released even when sampling fails.
    pub fn simulate<C: Counter + ?Sized>(
        &mut self,
        counter: &mut C,
        block_count: u64,
        interval: u64,
        cleanup: bool,
    ) -> Result<LeakRun> {
        let injected = self.inject(counter, block_count, interval);
        if cleanup {
            self.release();
        }
        let series = injected?;
        let verdict = detector::classify(&series);
        Ok(LeakRun { series, verdict })
    }

    /// Frees every held block.
    pub fn release(&mut self) {
        let count = self.blocks.len();
        self.blocks.clear();
        self.blocks.shrink_to_fit();
        info!("Memory cleaned up ({} blocks released).", count);
    }
}

/// Spawns a child that exits at once and is never waited on, then pauses
/// for `settle` so it has time to turn into a zombie. Keep the returned
/// handle alive; reaping it (`wait`) removes the zombie.
pub fn spawn_zombie(settle: Duration) -> io::Result<Child> {
    let child = Command::new("true")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    info!("Spawned short-lived child {} without reaping it", child.id());
    thread::sleep(settle);
    Ok(child)
}
