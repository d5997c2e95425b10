//! Data models module
//!
//! Aggregated benchmark results and their flat export record.

pub mod summary;

// Re-export commonly used types
pub use summary::{ResultRecord, ResultSummary};
