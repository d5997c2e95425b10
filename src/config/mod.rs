//! Configuration management module
//!
//! Holds the immutable benchmark configuration, its validation and the
//! clamping rules, plus the optional TOML defaults file.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{BenchError, Result, DEFAULT_TARGET_FILE};

pub mod settings;

pub use settings::Settings;

/// How the write pass fills each block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BufferFill {
    /// Fresh pseudo-random bytes for every block
    #[default]
    Random,
    /// One zeroed buffer reused for every block. Compressing or
    /// deduplicating devices may shortcut these writes.
    Zero,
}

impl BufferFill {
    pub fn description(&self) -> &'static str {
        match self {
            BufferFill::Random => "random",
            BufferFill::Zero => "zero",
        }
    }
}

/// What to do about the OS page cache before the read pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CacheDropPolicy {
    /// Never touch the page cache
    Skip,
    /// Try to drop caches, degrade to a warning when that is not possible
    #[default]
    BestEffort,
    /// Refuse to start without the privilege needed to drop caches
    Required,
}

impl CacheDropPolicy {
    pub fn description(&self) -> &'static str {
        match self {
            CacheDropPolicy::Skip => "skip",
            CacheDropPolicy::BestEffort => "best-effort",
            CacheDropPolicy::Required => "required",
        }
    }
}

/// Benchmark configuration: one target file, one payload, two block sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// File that is created, written, read back and deleted
    pub target_path: PathBuf,
    /// Total payload size in bytes
    pub total_size: u64,
    /// Block size for the write pass in bytes
    pub write_block_size: u64,
    /// Block size for the read pass in bytes
    pub read_block_size: u64,
    /// Page cache handling before the read pass
    pub cache_drop: CacheDropPolicy,
    /// Write buffer content
    pub fill: BufferFill,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            target_path: default_target_path(),
            total_size: 128 * 1024 * 1024, // 128 MiB
            write_block_size: 1024 * 1024, // 1 MiB
            read_block_size: 512,
            cache_drop: CacheDropPolicy::default(),
            fill: BufferFill::default(),
        }
    }
}

/// `<temp dir>/monkeytest`
pub fn default_target_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_TARGET_FILE)
}

impl BenchmarkConfig {
    /// Create a new benchmark configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    ///
    /// Block sizes larger than the payload are not an error; they are
    /// clamped by [`effective_write_block_size`](Self::effective_write_block_size)
    /// and [`effective_read_block_size`](Self::effective_read_block_size).
    pub fn validate(&self) -> Result<()> {
        if self.target_path.as_os_str().is_empty() {
            return Err(BenchError::ConfigError("Target file path is empty".to_string()));
        }

        if self.target_path.is_dir() {
            return Err(BenchError::ConfigError(format!(
                "Target path is a directory: {}",
                self.target_path.display()
            )));
        }

        if self.total_size == 0 {
            return Err(BenchError::ConfigError("Size must be greater than 0".to_string()));
        }

        if self.write_block_size == 0 {
            return Err(BenchError::ConfigError(
                "Write block size must be greater than 0".to_string(),
            ));
        }

        if self.read_block_size == 0 {
            return Err(BenchError::ConfigError(
                "Read block size must be greater than 0".to_string(),
            ));
        }

        if usize::try_from(self.effective_write_block_size()).is_err()
            || usize::try_from(self.effective_read_block_size()).is_err()
        {
            return Err(BenchError::ConfigError(
                "Block size does not fit in memory on this platform".to_string(),
            ));
        }

        Ok(())
    }

    /// Write block size clamped to the payload size
    pub fn effective_write_block_size(&self) -> u64 {
        self.write_block_size.min(self.total_size)
    }

    /// Read block size clamped to the payload size
    pub fn effective_read_block_size(&self) -> u64 {
        self.read_block_size.min(self.total_size)
    }

    /// Number of whole write blocks; a partial final block is dropped
    pub fn write_block_count(&self) -> u64 {
        block_count(self.total_size, self.effective_write_block_size())
    }

    /// Number of whole read blocks; a partial final block is dropped
    pub fn read_block_count(&self) -> u64 {
        block_count(self.total_size, self.effective_read_block_size())
    }

    /// Bytes the write pass actually puts on disk
    pub fn bytes_written(&self) -> u64 {
        self.write_block_count() * self.effective_write_block_size()
    }

    /// Set the target file
    pub fn with_target_path(mut self, path: PathBuf) -> Self {
        self.target_path = path;
        self
    }

    /// Set the total payload size
    pub fn with_total_size(mut self, size: u64) -> Self {
        self.total_size = size;
        self
    }

    /// Set the write block size
    pub fn with_write_block_size(mut self, size: u64) -> Self {
        self.write_block_size = size;
        self
    }

    /// Set the read block size
    pub fn with_read_block_size(mut self, size: u64) -> Self {
        self.read_block_size = size;
        self
    }

    /// Set the cache drop policy
    pub fn with_cache_drop(mut self, policy: CacheDropPolicy) -> Self {
        self.cache_drop = policy;
        self
    }

    /// Set the write buffer fill mode
    pub fn with_fill(mut self, fill: BufferFill) -> Self {
        self.fill = fill;
        self
    }
}

fn block_count(total: u64, block_size: u64) -> u64 {
    if block_size == 0 {
        0
    } else {
        total / block_size
    }
}
