use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Positional read used by the read pass
pub trait ReadAt {
    /// Read up to `buf.len()` bytes starting at `offset`; `Ok(0)` means end of file
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

/// Read-only handle for the read pass
pub struct ReadHandle {
    pub file: File,
    /// Whether the handle bypasses the page cache
    pub direct: bool,
}

impl ReadAt for ReadHandle {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        ReadAt::read_at(&self.file, buf, offset)
    }
}

/// Benchmark target file with automatic cleanup
///
/// Holds only the path: the write handle is closed before the read pass
/// reopens the file, but the file itself must disappear on every exit path.
#[derive(Debug)]
pub struct TargetFile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl TargetFile {
    /// Create (or truncate) the target and open it for synchronous writes
    pub fn create(path: &Path) -> io::Result<(Self, File)> {
        let file = open_sync_write(path)?;
        let target = Self {
            path: path.to_path_buf(),
            cleanup_on_drop: true,
        };
        Ok((target, file))
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now instead of on drop
    pub fn remove(mut self) -> io::Result<()> {
        self.cleanup_on_drop = false;
        remove_if_present(&self.path)
    }
}

impl Drop for TargetFile {
    fn drop(&mut self) {
        if self.cleanup_on_drop {
            if let Err(e) = remove_if_present(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove target file");
            }
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use std::os::windows::fs::{FileExt, OpenOptionsExt};

    const FILE_FLAG_WRITE_THROUGH: u32 = 0x80000000;
    const FILE_FLAG_NO_BUFFERING: u32 = 0x20000000;

    pub fn open_sync_write(path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .custom_flags(FILE_FLAG_WRITE_THROUGH)
            .open(path)
    }

    pub fn open_read(path: &Path, direct: bool) -> io::Result<ReadHandle> {
        if direct {
            if let Ok(file) = OpenOptions::new()
                .read(true)
                .custom_flags(FILE_FLAG_NO_BUFFERING)
                .open(path)
            {
                return Ok(ReadHandle { file, direct: true });
            }
        }
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(ReadHandle { file, direct: false })
    }

    pub fn direct_io_supported() -> bool {
        true
    }

    impl ReadAt for File {
        fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
            self.seek_read(buf, offset)
        }
    }
}

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::os::unix::fs::{FileExt, OpenOptionsExt};

    /// Open for writing with `O_SYNC` so each write returns only once committed
    pub fn open_sync_write(path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
    }

    /// Open read-only, trying `O_DIRECT` first when requested
    pub fn open_read(path: &Path, direct: bool) -> io::Result<ReadHandle> {
        if direct && direct_io_supported() {
            match open_direct(path) {
                Ok(file) => return Ok(ReadHandle { file, direct: true }),
                Err(e) => {
                    tracing::debug!(error = %e, "O_DIRECT open failed, falling back to buffered reads");
                }
            }
        }

        let file = OpenOptions::new().read(true).open(path)?;
        Ok(ReadHandle { file, direct: false })
    }

    #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
    fn open_direct(path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECT)
            .open(path)
    }

    #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
    fn open_direct(_path: &Path) -> io::Result<File> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "O_DIRECT is not available"))
    }

    pub fn direct_io_supported() -> bool {
        cfg!(any(target_os = "linux", target_os = "android", target_os = "freebsd"))
    }

    impl ReadAt for File {
        fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
            FileExt::read_at(self, buf, offset)
        }
    }
}

// Re-export platform-specific implementations
#[cfg(windows)]
pub use windows_impl::*;

#[cfg(unix)]
pub use unix_impl::*;
