//! monkeytest - storage throughput probe
//!
//! Writes a scratch file in fixed-size synchronous blocks, reads it back
//! at shuffled block offsets, and reports per-pass throughput derived from
//! the individual block timings.

use std::fmt;

pub mod bench;
pub mod cli;
pub mod config;
pub mod io;
pub mod models;
pub mod report;
pub mod util;

// Common error types
#[derive(Debug)]
pub enum BenchError {
    /// I/O operation on the target file failed
    IoError(std::io::Error),
    /// Malformed size string, non-positive size or unreadable defaults file
    ConfigError(String),
    /// Access denied, or a required privilege is missing
    PermissionDenied(String),
    /// Page cache could not be dropped (non-fatal)
    CacheControlError(String),
    /// A pass produced no samples to aggregate
    AggregationError(String),
    /// Results could not be written
    PersistenceError(String),
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::IoError(err) => write!(f, "I/O error: {}", err),
            BenchError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            BenchError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BenchError::CacheControlError(msg) => write!(f, "Cache control error: {}", msg),
            BenchError::AggregationError(msg) => write!(f, "Aggregation error: {}", msg),
            BenchError::PersistenceError(msg) => write!(f, "Results persistence error: {}", msg),
        }
    }
}

impl std::error::Error for BenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BenchError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BenchError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                BenchError::PermissionDenied(format!("Access denied: {}", err))
            }
            _ => BenchError::IoError(err),
        }
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::PersistenceError(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for BenchError {
    fn from(err: toml::de::Error) -> Self {
        BenchError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl BenchError {
    /// Whether this error must abort the run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BenchError::CacheControlError(_))
    }
}

/// Result type alias for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Error handling utilities
pub mod error {
    use super::BenchError;

    /// Process exit code for a fatal error
    pub fn exit_code(error: &BenchError) -> u8 {
        match error {
            BenchError::ConfigError(_) => 2,
            BenchError::PermissionDenied(_) => 3,
            _ => 1,
        }
    }

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &BenchError) -> String {
        match error {
            BenchError::PermissionDenied(msg) => format!(
                "Permission denied ({}). Run as root, pick another target file, or use --cache-drop best-effort.",
                msg
            ),
            BenchError::ConfigError(msg) => {
                format!("Configuration error: {}. Check your arguments and defaults file.", msg)
            }
            BenchError::AggregationError(msg) => format!(
                "No usable samples: {}. Increase --size or reduce the block sizes.",
                msg
            ),
            BenchError::CacheControlError(msg) => format!(
                "Page cache was not dropped ({}). Read timings may include cache hits.",
                msg
            ),
            BenchError::PersistenceError(_) => {
                "Failed to save results. Check the --json path and disk space.".to_string()
            }
            _ => error.to_string(),
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "monkeytest";
pub const CONFIG_FILE: &str = "monkeytest.toml";
pub const DEFAULT_TARGET_FILE: &str = "monkeytest";
