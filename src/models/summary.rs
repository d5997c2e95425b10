//! Result summary
//!
//! Aggregate statistics derived from the two block timings. The summary
//! keeps full precision; [`ResultRecord`] is the rounded, flat form used
//! for JSON export and the text report.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::bench::timer::BlockTiming;
use crate::config::BenchmarkConfig;
use crate::util::units::{bytes_to_mb, round_to};
use crate::{BenchError, Result};

/// Aggregate statistics for one benchmark run; speeds are in bytes per second
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    /// Bytes actually written (whole blocks only)
    pub written_bytes: u64,
    pub write_block_size: u64,
    pub write_blocks: u64,
    /// Sum of the per-block write times
    pub write_time: Duration,
    pub write_speed: f64,
    /// Block size over the slowest block
    pub write_speed_min: f64,
    /// Block size over the fastest block
    pub write_speed_max: f64,
    /// Blocks actually read before end of file
    pub read_blocks: u64,
    pub read_block_size: u64,
    pub read_time: Duration,
    pub read_speed: f64,
    pub read_speed_min: f64,
    pub read_speed_max: f64,
}

/// Flat JSON record; sizes and speeds in MB and MB/s, times in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub written_mb: f64,
    pub write_time: f64,
    pub write_speed: f64,
    pub write_speed_min: f64,
    pub write_speed_max: f64,
    pub read_blocks: u64,
    pub block_size: u64,
    pub read_time: f64,
    pub read_speed: f64,
    pub read_speed_min: f64,
    pub read_speed_max: f64,
}

/// Per-pass throughput figures
struct PassStats {
    bytes: u64,
    time: Duration,
    speed: f64,
    speed_min: f64,
    speed_max: f64,
}

fn pass_stats(pass: &str, timing: &BlockTiming, block_size: u64) -> Result<PassStats> {
    let (fastest, slowest) = match (timing.min(), timing.max()) {
        (Some(min), Some(max)) => (min, max),
        _ => {
            return Err(BenchError::AggregationError(format!(
                "{} pass collected no samples",
                pass
            )))
        }
    };

    let bytes = timing.len() as u64 * block_size;
    let time = timing.total();
    let block = block_size as f64;

    Ok(PassStats {
        bytes,
        time,
        speed: bytes as f64 / time.as_secs_f64(),
        speed_min: block / slowest.as_secs_f64(),
        speed_max: block / fastest.as_secs_f64(),
    })
}

impl ResultSummary {
    /// Aggregate the two passes of a run
    ///
    /// Fails with `AggregationError` when either timing is empty.
    pub fn from_timings(
        config: &BenchmarkConfig,
        write: &BlockTiming,
        read: &BlockTiming,
    ) -> Result<Self> {
        let write_block_size = config.effective_write_block_size();
        let read_block_size = config.effective_read_block_size();

        let w = pass_stats("write", write, write_block_size)?;
        let r = pass_stats("read", read, read_block_size)?;

        Ok(Self {
            written_bytes: w.bytes,
            write_block_size,
            write_blocks: write.len() as u64,
            write_time: w.time,
            write_speed: w.speed,
            write_speed_min: w.speed_min,
            write_speed_max: w.speed_max,
            read_blocks: read.len() as u64,
            read_block_size,
            read_time: r.time,
            read_speed: r.speed,
            read_speed_min: r.speed_min,
            read_speed_max: r.speed_max,
        })
    }

    /// Rounded flat record for export
    pub fn to_record(&self) -> ResultRecord {
        let mbps = |bytes_per_sec: f64| round_to(bytes_to_mb(bytes_per_sec), 2);

        ResultRecord {
            written_mb: round_to(bytes_to_mb(self.written_bytes as f64), 0),
            write_time: round_to(self.write_time.as_secs_f64(), 4),
            write_speed: mbps(self.write_speed),
            write_speed_min: mbps(self.write_speed_min),
            write_speed_max: mbps(self.write_speed_max),
            read_blocks: self.read_blocks,
            block_size: self.read_block_size,
            read_time: round_to(self.read_time.as_secs_f64(), 4),
            read_speed: mbps(self.read_speed),
            read_speed_min: mbps(self.read_speed_min),
            read_speed_max: mbps(self.read_speed_max),
        }
    }
}
