use std::alloc::{self, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::config::BufferFill;
use crate::{BenchError, Result};

/// Alignment satisfying `O_DIRECT` on common devices and filesystems
pub const DIRECT_IO_ALIGNMENT: usize = 4096;

/// Read sizes that are not a multiple of this cannot use `O_DIRECT`
pub const SECTOR_SIZE: u64 = 512;

/// Heap buffer with a guaranteed start-address alignment
///
/// `Vec<u8>` only promises byte alignment, which direct reads reject.
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

// SAFETY: the buffer exclusively owns its allocation.
unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Allocate `len` zeroed bytes aligned to `alignment` (a power of two)
    pub fn new(len: usize, alignment: usize) -> Result<Self> {
        if len == 0 {
            return Err(BenchError::ConfigError(
                "Buffer size must be greater than 0".to_string(),
            ));
        }
        let layout = Layout::from_size_align(len, alignment).map_err(|e| {
            BenchError::ConfigError(format!("Invalid buffer layout ({} / {}): {}", len, alignment, e))
        })?;

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        };

        Ok(Self { ptr, layout })
    }

    pub fn alignment(&self) -> usize {
        self.layout.align()
    }
}

impl Deref for AlignedBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: ptr is valid for layout.size() initialized bytes.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for layout.size() bytes and uniquely borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with this exact layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// Produces the content of each block in the write pass
pub struct BlockSource {
    buffer: Vec<u8>,
    rng: Option<SmallRng>,
}

impl BlockSource {
    pub fn new(block_size: usize, fill: BufferFill) -> Self {
        let rng = match fill {
            BufferFill::Random => Some(SmallRng::from_entropy()),
            BufferFill::Zero => None,
        };
        Self {
            buffer: vec![0u8; block_size],
            rng,
        }
    }

    /// Deterministic random content, for tests
    pub fn seeded(block_size: usize, seed: u64) -> Self {
        Self {
            buffer: vec![0u8; block_size],
            rng: Some(SmallRng::seed_from_u64(seed)),
        }
    }

    /// Content for the next block: new random bytes, or the shared zero block
    pub fn next_block(&mut self) -> &[u8] {
        if let Some(rng) = self.rng.as_mut() {
            rng.fill_bytes(&mut self.buffer);
        }
        &self.buffer
    }

    pub fn block_size(&self) -> usize {
        self.buffer.len()
    }
}
