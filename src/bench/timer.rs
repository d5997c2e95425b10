//! Block timer
//!
//! Runs the write and read passes one block at a time and records the
//! elapsed time of every individual block operation. Only the I/O call
//! itself sits between the two clock reads: buffer generation and
//! progress reporting happen outside the timed region.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::bench::progress::{Phase, ProgressObserver, ProgressThrottle};
use crate::config::BufferFill;
use crate::io::{BlockSource, ReadAt};
use crate::{BenchError, Result};

/// Floor applied to samples so that every recorded time is positive
const MIN_SAMPLE: Duration = Duration::from_nanos(1);

/// Per-block elapsed times produced by one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockTiming {
    samples: Vec<Duration>,
}

impl BlockTiming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Build a timing from recorded samples (zero samples are floored to 1ns)
    pub fn from_samples<I: IntoIterator<Item = Duration>>(samples: I) -> Self {
        let mut timing = Self::new();
        for sample in samples {
            timing.push(sample);
        }
        timing
    }

    pub fn push(&mut self, sample: Duration) {
        self.samples.push(sample.max(MIN_SAMPLE));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Duration] {
        &self.samples
    }

    /// Sum of all samples
    pub fn total(&self) -> Duration {
        self.samples.iter().sum()
    }

    /// Fastest block, `None` when empty
    pub fn min(&self) -> Option<Duration> {
        self.samples.iter().min().copied()
    }

    /// Slowest block, `None` when empty
    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().max().copied()
    }
}

/// Write `block_count` blocks of `block_size` bytes at the current position
pub fn write_pass<W: Write + ?Sized>(
    file: &mut W,
    block_size: usize,
    block_count: u64,
    fill: BufferFill,
    observer: &mut dyn ProgressObserver,
) -> Result<BlockTiming> {
    let mut source = BlockSource::new(block_size, fill);
    write_blocks(file, &mut source, block_count, observer)
}

/// Write pass with a caller-supplied block source
pub fn write_blocks<W: Write + ?Sized>(
    file: &mut W,
    source: &mut BlockSource,
    block_count: u64,
    observer: &mut dyn ProgressObserver,
) -> Result<BlockTiming> {
    let mut timing = BlockTiming::with_capacity(capacity_hint(block_count));
    let mut throttle = ProgressThrottle::new(Phase::Write, block_count);

    for index in 0..block_count {
        let block = source.next_block();

        let start = Instant::now();
        let written = file.write_all(block);
        let elapsed = start.elapsed();

        written.map_err(|e| io_context(e, format!("write of block {} failed", index)))?;
        timing.push(elapsed);
        throttle.tick(index + 1, observer);
    }

    Ok(timing)
}

/// Read one block at each offset, in the given order
///
/// `buf` is the block: its length is the read size. The pass ends at the
/// first read that returns zero bytes; that read is not recorded.
pub fn read_pass<F: ReadAt + ?Sized>(
    file: &F,
    buf: &mut [u8],
    offsets: &[u64],
    observer: &mut dyn ProgressObserver,
) -> Result<BlockTiming> {
    let mut timing = BlockTiming::with_capacity(offsets.len());
    let mut throttle = ProgressThrottle::new(Phase::Read, offsets.len() as u64);

    for (index, &offset) in offsets.iter().enumerate() {
        let start = Instant::now();
        let read = file.read_at(buf, offset);
        let elapsed = start.elapsed();

        let bytes = read.map_err(|e| io_context(e, format!("read at offset {} failed", offset)))?;
        if bytes == 0 {
            tracing::debug!(
                offset,
                completed = timing.len(),
                planned = offsets.len(),
                "End of file reached, stopping read pass"
            );
            break;
        }

        timing.push(elapsed);
        throttle.tick(index as u64 + 1, observer);
    }

    Ok(timing)
}

fn io_context(err: io::Error, context: String) -> BenchError {
    BenchError::from(io::Error::new(err.kind(), format!("{}: {}", context, err)))
}

fn capacity_hint(block_count: u64) -> usize {
    usize::try_from(block_count).unwrap_or(usize::MAX).min(1 << 20)
}
