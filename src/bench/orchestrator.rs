//! Benchmark orchestrator
//!
//! Drives one run through its stages: create the target, write it,
//! prepare the read (open mode, offsets, cache drop), read it back,
//! aggregate and clean up. Any stage failure aborts the run; the
//! [`TargetFile`] guard removes the file on every exit path.

use std::io;
use std::time::{Duration, Instant};

use crate::bench::cache::{
    check_capability, direct_io_eligible, drop_page_cache, is_memory_backed, CacheDropOutcome,
    Privilege, SystemTempDir, TempDirProvider,
};
use crate::bench::offsets::shuffled_offsets;
use crate::bench::progress::ProgressObserver;
use crate::bench::timer::{read_pass, write_pass};
use crate::config::{BenchmarkConfig, BufferFill};
use crate::io::{open_read, AlignedBuffer, ReadAt, ReadHandle, TargetFile, DIRECT_IO_ALIGNMENT};
use crate::models::ResultSummary;
use crate::{BenchError, Result};

/// Run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Created,
    Writing,
    ReadPrep,
    Reading,
    Aggregated,
    Cleaned,
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub summary: ResultSummary,
    pub cache: CacheDropOutcome,
    /// Whether the read pass bypassed the page cache
    pub direct_io: bool,
    pub fill: BufferFill,
    /// Non-fatal conditions met during the run
    pub warnings: Vec<String>,
    /// Wall-clock duration of the whole run, including setup and cleanup
    pub elapsed: Duration,
}

/// Single-threaded benchmark executor
pub struct Benchmark {
    config: BenchmarkConfig,
    temp_dir: Box<dyn TempDirProvider + Send>,
    privilege: Privilege,
}

impl Benchmark {
    /// Create an executor using the OS temp dir and the process privilege
    pub fn new(config: BenchmarkConfig) -> Self {
        Self {
            config,
            temp_dir: Box::new(SystemTempDir),
            privilege: Privilege::detect(),
        }
    }

    /// Override the location considered memory-backed
    pub fn with_temp_dir(mut self, provider: impl TempDirProvider + Send + 'static) -> Self {
        self.temp_dir = Box::new(provider);
        self
    }

    /// Override the detected privilege
    pub fn with_privilege(mut self, privilege: Privilege) -> Self {
        self.privilege = privilege;
        self
    }

    /// Execute the benchmark
    ///
    /// Blocks the calling thread for the whole run. `observer` is called
    /// between block operations, never inside a timed region.
    pub fn run(&self, observer: &mut dyn ProgressObserver) -> Result<BenchmarkReport> {
        let started = Instant::now();
        let config = &self.config;
        config.validate()?;
        check_capability(config.cache_drop, self.privilege)?;

        let mut warnings = Vec::new();
        let mut stage = Stage::Created;

        let (target, mut file) = TargetFile::create(&config.target_path).map_err(|e| {
            with_context(e, format!("cannot create {}", config.target_path.display()))
        })?;

        advance(&mut stage, Stage::Writing);
        tracing::debug!(
            bytes = config.bytes_written(),
            blocks = config.write_block_count(),
            "Write pass starting"
        );
        let write_block_size = config.effective_write_block_size() as usize;
        let write = write_pass(
            &mut file,
            write_block_size,
            config.write_block_count(),
            config.fill,
            observer,
        )?;
        drop(file);

        advance(&mut stage, Stage::ReadPrep);
        let read_block_size = config.effective_read_block_size();
        let memory_backed = is_memory_backed(target.path(), self.temp_dir.as_ref());
        let want_direct = direct_io_eligible(memory_backed, read_block_size);
        tracing::debug!(memory_backed, want_direct, "Read mode decided");

        let mut buf = AlignedBuffer::new(read_block_size as usize, DIRECT_IO_ALIGNMENT)?;
        let mut handle = open_read(target.path(), want_direct)?;
        if handle.direct {
            handle = probe_direct(handle, &mut buf, target.path())?;
        }
        if want_direct && !handle.direct {
            let warning = "direct I/O unavailable for the target; reads may be served from the page cache";
            tracing::warn!("{}", warning);
            warnings.push(warning.to_string());
        }

        let offsets = shuffled_offsets(
            read_block_size,
            config.read_block_count(),
            &mut rand::thread_rng(),
        );

        let cache = drop_page_cache(config.cache_drop, target.path(), self.privilege);
        if let Some(warning) = cache.warning {
            tracing::warn!("{}", warning);
            warnings.push(warning.to_string());
        }

        advance(&mut stage, Stage::Reading);
        let read = read_pass(&handle, &mut buf, &offsets, observer)?;
        let direct_io = handle.direct;
        drop(handle);

        advance(&mut stage, Stage::Aggregated);
        let summary = ResultSummary::from_timings(config, &write, &read)?;

        advance(&mut stage, Stage::Cleaned);
        if let Err(e) = target.remove() {
            tracing::warn!(error = %e, "Failed to remove target file");
            warnings.push(format!("target file was not removed: {}", e));
        }

        Ok(BenchmarkReport {
            summary,
            cache: cache.outcome,
            direct_io,
            fill: config.fill,
            warnings,
            elapsed: started.elapsed(),
        })
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::debug!(from = ?*stage, to = ?next, "Stage transition");
    *stage = next;
}

/// Untimed read at offset 0; some filesystems accept `O_DIRECT` on open
/// but reject the reads themselves with `EINVAL`
fn probe_direct(
    handle: ReadHandle,
    buf: &mut [u8],
    path: &std::path::Path,
) -> Result<ReadHandle> {
    match handle.read_at(buf, 0) {
        Ok(_) => Ok(handle),
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
            tracing::debug!(error = %e, "Direct read rejected, reopening buffered");
            drop(handle);
            Ok(open_read(path, false)?)
        }
        Err(e) => Err(with_context(e, "probe read failed".to_string())),
    }
}

fn with_context(err: io::Error, context: String) -> BenchError {
    BenchError::from(io::Error::new(err.kind(), format!("{}: {}", context, err)))
}
