//! Advisory locking and atomic replacement for persisted artifacts.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Exclusive advisory lock on `<artifact>.lock`, held until dropped.
pub struct ArtifactLock {
    /// Open handle carrying the lock.
    file: File,
    /// Lock file path, for diagnostics.
    path: PathBuf,
}

impl ArtifactLock {
    /// Block until the exclusive lock for `artifact` is held.
    ///
    /// # Errors
    ///
    /// Returns `Error::LockFailed` if the lock file cannot be opened or locked.
    pub fn acquire(artifact: &Path) -> Result<Self, Error> {
        let path = lock_path(artifact);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| return Error::LockFailed {
                path: path.clone(),
                reason: format!("open: {e}"),
            })?;

        fs2::FileExt::lock_exclusive(&file).map_err(|e| return Error::LockFailed {
            path: path.clone(),
            reason: format!("acquire: {e}"),
        })?;

        log::debug!("acquired {}", path.display());
        return Ok(Self { file, path });
    }
}

impl Drop for ArtifactLock {
    fn drop(&mut self) {
        let _released = fs2::FileExt::unlock(&self.file);
        log::debug!("released {}", self.path.display());
    }
}

/// Sibling lock file for an artifact: `config.yml` → `config.yml.lock`.
fn lock_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".lock");
    return artifact.with_file_name(name);
}

/// Run `f` while holding the artifact's lock. The lock is released on every
/// exit path, including an `Err` from `f` or a panic unwinding through it.
///
/// # Errors
///
/// Returns `Error::LockFailed` if the lock cannot be taken, or whatever `f` returns.
pub fn with_lock<T>(artifact: &Path, f: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
    let _guard = ArtifactLock::acquire(artifact)?;
    return f();
}

/// Replace `path` with `bytes` under its lock: write a sibling temp file,
/// flush it, then rename it over the target. Readers see the old or the new
/// content, never a partial file.
///
/// # Errors
///
/// Returns `Error::LockFailed` or `Error::Io` on failure. The target is left
/// untouched when writing the temp file fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    return with_lock(path, || {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp_name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        let written = File::create(&tmp).and_then(|mut file| {
            file.write_all(bytes)?;
            return file.sync_all();
        });
        if let Err(e) = written {
            let _removed = std::fs::remove_file(&tmp);
            return Err(Error::Io(e));
        }

        std::fs::rename(&tmp, path)?;
        log::info!("wrote {}", path.display());
        return Ok(());
    });
}
