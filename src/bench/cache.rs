//! Cache control
//!
//! Decides whether the read pass can bypass the page cache, and tries to
//! evict cached pages before it starts. Nothing in here is allowed to
//! abort a run except the startup privilege check under
//! [`CacheDropPolicy::Required`].

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::config::CacheDropPolicy;
use crate::io::{direct_io_supported, SECTOR_SIZE};
use crate::{BenchError, Result};

/// Source of the volatile temporary-storage location
pub trait TempDirProvider {
    fn temp_dir(&self) -> PathBuf;
}

/// The OS temp directory (`std::env::temp_dir`)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTempDir;

impl TempDirProvider for SystemTempDir {
    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }
}

/// Fixed temp directory, for tests and callers that know better
#[derive(Debug, Clone)]
pub struct FixedTempDir(pub PathBuf);

impl TempDirProvider for FixedTempDir {
    fn temp_dir(&self) -> PathBuf {
        self.0.clone()
    }
}

/// Whether `path` lies under the temp directory
pub fn is_memory_backed(path: &Path, temp: &dyn TempDirProvider) -> bool {
    let target = resolve(path);
    let temp_dir = resolve(&temp.temp_dir());
    target.starts_with(&temp_dir)
}

/// Whether the read pass should try `O_DIRECT`
///
/// Direct reads need sector-multiple sizes and offsets, and make no
/// sense on a memory-backed filesystem.
pub fn direct_io_eligible(memory_backed: bool, read_block_size: u64) -> bool {
    !memory_backed && read_block_size % SECTOR_SIZE == 0 && direct_io_supported()
}

/// Canonical path when it (or its parent) exists, otherwise absolute and
/// lexically normalized
fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let normalized = normalize(&absolute(path));
    match (normalized.parent(), normalized.file_name()) {
        (Some(parent), Some(name)) => match fs::canonicalize(parent) {
            Ok(parent) => parent.join(name),
            Err(_) => normalized,
        },
        _ => normalized,
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Effective privilege of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Root,
    Unprivileged,
}

impl Privilege {
    pub fn detect() -> Self {
        #[cfg(unix)]
        {
            // SAFETY: geteuid has no preconditions and cannot fail.
            if unsafe { libc::geteuid() } == 0 {
                return Privilege::Root;
            }
        }
        Privilege::Unprivileged
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Privilege::Root)
    }
}

/// Startup capability check
///
/// Returns a warning for degraded mode, or `PermissionDenied` when the
/// policy requires a privilege the process does not have.
pub fn check_capability(policy: CacheDropPolicy, privilege: Privilege) -> Result<Option<BenchError>> {
    match (policy, privilege) {
        (CacheDropPolicy::Required, Privilege::Unprivileged) => Err(BenchError::PermissionDenied(
            "dropping the page cache requires root; rerun with sudo or use --cache-drop best-effort"
                .to_string(),
        )),
        (CacheDropPolicy::BestEffort, Privilege::Unprivileged) => {
            Ok(Some(BenchError::CacheControlError(
                "not running as root; only the target file's cached pages will be evicted".to_string(),
            )))
        }
        _ => Ok(None),
    }
}

/// What the cache drop achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDropOutcome {
    /// System-wide page cache dropped
    Dropped,
    /// Only the target file's pages were evicted
    TargetEvicted,
    /// Nothing was evicted
    Skipped,
}

impl CacheDropOutcome {
    pub fn description(&self) -> &'static str {
        match self {
            CacheDropOutcome::Dropped => "page cache dropped",
            CacheDropOutcome::TargetEvicted => "target file evicted",
            CacheDropOutcome::Skipped => "caches not dropped",
        }
    }
}

/// Result of [`drop_page_cache`]: an outcome plus an optional non-fatal warning
#[derive(Debug)]
pub struct CacheDrop {
    pub outcome: CacheDropOutcome,
    pub warning: Option<BenchError>,
}

/// Best-effort eviction of cached pages before the read pass
pub fn drop_page_cache(policy: CacheDropPolicy, target: &Path, privilege: Privilege) -> CacheDrop {
    if policy == CacheDropPolicy::Skip {
        return CacheDrop {
            outcome: CacheDropOutcome::Skipped,
            warning: None,
        };
    }

    let reason = if privilege.is_root() {
        match drop_system_caches() {
            Ok(()) => {
                tracing::debug!("System page cache dropped");
                return CacheDrop {
                    outcome: CacheDropOutcome::Dropped,
                    warning: None,
                };
            }
            Err(e) => format!("drop_caches failed: {}", e),
        }
    } else {
        "not running as root".to_string()
    };

    match evict_file_pages(target) {
        Ok(()) => CacheDrop {
            outcome: CacheDropOutcome::TargetEvicted,
            warning: Some(BenchError::CacheControlError(format!(
                "{}; evicted only the target file's pages",
                reason
            ))),
        },
        Err(e) => CacheDrop {
            outcome: CacheDropOutcome::Skipped,
            warning: Some(BenchError::CacheControlError(format!(
                "{}; target eviction failed: {}; read timings may include cache hits",
                reason, e
            ))),
        },
    }
}

/// `sync` then `echo 1 > /proc/sys/vm/drop_caches`
#[cfg(target_os = "linux")]
fn drop_system_caches() -> io::Result<()> {
    // SAFETY: sync has no preconditions.
    unsafe { libc::sync() };
    fs::write("/proc/sys/vm/drop_caches", b"1")
}

#[cfg(not(target_os = "linux"))]
fn drop_system_caches() -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "dropping the page cache is not supported on this platform",
    ))
}

/// `posix_fadvise(POSIX_FADV_DONTNEED)` over the whole file
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
fn evict_file_pages(path: &Path) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let file = fs::File::open(path)?;
    // SAFETY: the descriptor stays open for the duration of the call.
    let ret = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_DONTNEED) };
    if ret != 0 {
        return Err(io::Error::from_raw_os_error(ret));
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
fn evict_file_pages(_path: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "posix_fadvise is not available on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_backed_under_temp_dir() {
        let tmp = FixedTempDir(PathBuf::from("/volatile-tmp"));
        assert!(is_memory_backed(Path::new("/volatile-tmp/monkeytest"), &tmp));
        assert!(is_memory_backed(Path::new("/volatile-tmp/a/b/c"), &tmp));
        assert!(!is_memory_backed(Path::new("/var/volatile-tmp/monkeytest"), &tmp));
        assert!(!is_memory_backed(Path::new("/volatile-tmpfoo/file"), &tmp));
    }

    #[test]
    fn test_memory_backed_normalizes_paths() {
        let tmp = FixedTempDir(PathBuf::from("/nonexistent-tmp/"));
        assert!(is_memory_backed(Path::new("/nonexistent-tmp/./x/../file"), &tmp));
        assert!(!is_memory_backed(Path::new("/nonexistent-tmp/../home/file"), &tmp));
    }

    #[test]
    fn test_memory_backed_with_real_dirs() {
        let dir = tempdir().unwrap();
        let inside = dir.path().join("target.dat");
        std::fs::write(&inside, b"x").unwrap();

        let provider = FixedTempDir(dir.path().to_path_buf());
        assert!(is_memory_backed(&inside, &provider));

        let other = tempdir().unwrap();
        let provider = FixedTempDir(other.path().to_path_buf());
        assert!(!is_memory_backed(&inside, &provider));
    }

    #[test]
    fn test_system_temp_dir_provider() {
        let path = std::env::temp_dir().join("monkeytest-probe");
        assert!(is_memory_backed(&path, &SystemTempDir));
    }

    #[test]
    fn test_direct_io_eligibility() {
        assert!(!direct_io_eligible(true, 4096));
        assert!(!direct_io_eligible(false, 1000));
        assert_eq!(direct_io_eligible(false, 4096), direct_io_supported());
    }

    #[test]
    fn test_capability_check() {
        assert!(matches!(
            check_capability(CacheDropPolicy::Required, Privilege::Unprivileged),
            Err(BenchError::PermissionDenied(_))
        ));
        assert!(matches!(
            check_capability(CacheDropPolicy::BestEffort, Privilege::Unprivileged),
            Ok(Some(BenchError::CacheControlError(_)))
        ));
        assert!(matches!(
            check_capability(CacheDropPolicy::Skip, Privilege::Unprivileged),
            Ok(None)
        ));
        assert!(matches!(
            check_capability(CacheDropPolicy::Required, Privilege::Root),
            Ok(None)
        ));
    }

    #[test]
    fn test_skip_policy_does_nothing() {
        let drop = drop_page_cache(CacheDropPolicy::Skip, Path::new("/nonexistent"), Privilege::Root);
        assert_eq!(drop.outcome, CacheDropOutcome::Skipped);
        assert!(drop.warning.is_none());
    }

    #[test]
    fn test_unprivileged_drop_degrades_to_warning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("target.dat");
        std::fs::write(&path, vec![0u8; 8192]).unwrap();

        let drop = drop_page_cache(CacheDropPolicy::BestEffort, &path, Privilege::Unprivileged);
        assert_ne!(drop.outcome, CacheDropOutcome::Dropped);
        match &drop.warning {
            Some(BenchError::CacheControlError(msg)) => assert!(msg.contains("not running as root")),
            other => panic!("expected cache control warning, got {:?}", other),
        }
        assert!(!drop.warning.unwrap().is_fatal());
    }

    #[test]
    fn test_missing_target_is_not_fatal() {
        let drop = drop_page_cache(
            CacheDropPolicy::BestEffort,
            Path::new("/nonexistent/monkeytest"),
            Privilege::Unprivileged,
        );
        assert_eq!(drop.outcome, CacheDropOutcome::Skipped);
        assert!(drop.warning.is_some());
    }
}
