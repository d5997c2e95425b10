//! Command line interface
//!
//! Every option is optional so that the precedence command line, then
//! defaults file, then built-in defaults can be applied in one place.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{BenchmarkConfig, BufferFill, CacheDropPolicy, Settings};
use crate::util::units::parse_size;
use crate::Result;

#[derive(Debug, Parser)]
#[command(name = "monkeytest")]
#[command(version, about = "Storage throughput probe: synchronous block writes, shuffled block reads")]
pub struct Cli {
    /// Target file, created and deleted by the run [default: <temp dir>/monkeytest]
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Total bytes to write, e.g. 128MB [default: 128MB]
    #[arg(short, long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub size: Option<u64>,

    /// Write block size [default: 1MB]
    #[arg(short, long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub write_block_size: Option<u64>,

    /// Read block size [default: 512B]
    #[arg(short, long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub read_block_size: Option<u64>,

    /// Write JSON results to this path instead of printing the report
    #[arg(short, long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Page cache handling before the read pass [default: best-effort]
    #[arg(long, value_enum, value_name = "POLICY")]
    pub cache_drop: Option<CacheDropPolicy>,

    /// Write buffer content [default: random]
    #[arg(long, value_enum, value_name = "MODE")]
    pub fill: Option<BufferFill>,

    /// Defaults file [default: <config dir>/monkeytest/monkeytest.toml]
    #[arg(long, value_name = "PATH", env = "MONKEYTEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_size_arg(value: &str) -> std::result::Result<u64, String> {
    parse_size(value).map_err(|e| e.to_string())
}

impl Cli {
    /// Resolve the benchmark configuration from `settings` and these options
    pub fn to_config(&self, settings: &Settings) -> Result<BenchmarkConfig> {
        let mut config = settings.apply(BenchmarkConfig::default())?;

        if let Some(file) = &self.file {
            config.target_path = file.clone();
        }
        if let Some(size) = self.size {
            config.total_size = size;
        }
        if let Some(size) = self.write_block_size {
            config.write_block_size = size;
        }
        if let Some(size) = self.read_block_size {
            config.read_block_size = size;
        }
        if let Some(policy) = self.cache_drop {
            config.cache_drop = policy;
        }
        if let Some(fill) = self.fill {
            config.fill = fill;
        }

        Ok(config)
    }
}
