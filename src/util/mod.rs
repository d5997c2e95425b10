//! Utility functions module
//!
//! Size-string parsing and MB/s conversion helpers.

pub mod units;

// Re-export commonly used functions
pub use units::{bytes_to_mb, format_bytes, parse_size, round_to};
