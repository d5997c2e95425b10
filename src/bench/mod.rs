//! Benchmark engine module
//!
//! Contains the block timer, the read-offset shuffler, cache control and
//! the orchestrator that ties one run together.

pub mod cache;
pub mod offsets;
pub mod orchestrator;
pub mod progress;
pub mod timer;

// Re-export commonly used types
pub use cache::{CacheDropOutcome, Privilege, SystemTempDir, TempDirProvider};
pub use orchestrator::{Benchmark, BenchmarkReport, Stage};
pub use progress::{ChannelObserver, NoProgress, Phase, ProgressObserver, ProgressUpdate};
pub use timer::BlockTiming;
