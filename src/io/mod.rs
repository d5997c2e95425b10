//! I/O operations module
//!
//! Platform-specific open modes for the benchmark target (synchronous
//! writes, direct reads), the positional-read seam used by the read pass,
//! and the buffers both passes work with.

pub mod buffer;
pub mod disk;

pub use buffer::{AlignedBuffer, BlockSource, DIRECT_IO_ALIGNMENT, SECTOR_SIZE};
pub use disk::{direct_io_supported, open_read, open_sync_write, ReadAt, ReadHandle, TargetFile};
