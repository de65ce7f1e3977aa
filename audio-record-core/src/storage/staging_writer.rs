//! Per-session PCM scratch file.
//!
//! Captured PCM is appended to `audio-<uuid>.pcm` in the staging directory
//! while the WAV header cannot be written yet. [`StagingFile`] owns the path
//! and deletes it when dropped, so every exit path of a session cleans up.
//!
//! Each scratch file has an `audio-<uuid>.lock` sidecar held under an
//! exclusive advisory lock for the life of the session. Cleanup only removes
//! scratch files whose lock it can take, so a sweep never touches a file
//! another recorder (in this process or another) is still writing.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::models::error::CaptureError;

const STAGING_PREFIX: &str = "audio-";
const STAGING_EXTENSION: &str = ".pcm";
const LOCK_EXTENSION: &str = ".lock";

/// Scratch file guard. Removes the file and its lock on drop.
#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
    lock_path: PathBuf,
    lock: Option<File>,
}

impl StagingFile {
    /// Create a fresh, uniquely named scratch file in `dir` and open it for appending.
    pub fn create(dir: &Path) -> Result<(Self, StagingWriter), CaptureError> {
        fs::create_dir_all(dir)
            .map_err(|e| CaptureError::StorageError(format!("failed to create staging directory: {}", e)))?;

        let stem = format!("{}{}", STAGING_PREFIX, uuid::Uuid::new_v4());
        let lock_path = dir.join(format!("{}{}", stem, LOCK_EXTENSION));
        let lock = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to create staging lock: {}", e)))?;
        if let Err(e) = lock.try_lock_exclusive() {
            drop(lock);
            remove_if_present(&lock_path);
            return Err(CaptureError::StorageError(format!("failed to lock staging file: {}", e)));
        }

        // Dropping the guard on the error path below releases and removes the lock.
        let mut staging = Self {
            path: dir.join(format!("{}{}", stem, STAGING_EXTENSION)),
            lock_path,
            lock: Some(lock),
        };
        let path = staging.path.clone();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                // Nothing was created at `path`.
                staging.path = PathBuf::new();
                CaptureError::StorageError(format!("failed to create staging file: {}", e))
            })?;

        log::debug!("staging PCM to {}", path.display());
        let writer = StagingWriter {
            file: BufWriter::new(file),
            bytes_written: 0,
        };
        Ok((staging, writer))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if !self.path.as_os_str().is_empty() {
            remove_if_present(&self.path);
        }
        // Closing the handle releases the lock before the sidecar goes away.
        drop(self.lock.take());
        remove_if_present(&self.lock_path);
    }
}

fn remove_if_present(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!("failed to remove {}: {}", path.display(), e),
    }
}

/// Whether the session owning `lock_path` is gone. A missing sidecar means
/// the writer died before or while cleaning up.
fn is_abandoned(lock_path: &Path) -> bool {
    let lock = match OpenOptions::new().write(true).open(lock_path) {
        Ok(lock) => lock,
        Err(e) if e.kind() == ErrorKind::NotFound => return true,
        Err(e) => {
            log::warn!("cannot open staging lock {}: {}", lock_path.display(), e);
            return false;
        }
    };
    lock.try_lock_exclusive().is_ok()
}

/// Append-only writer for the staging file.
pub struct StagingWriter {
    file: BufWriter<File>,
    bytes_written: u64,
}

impl StagingWriter {
    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        self.file
            .write_all(data)
            .map_err(|e| CaptureError::StorageError(format!("staging write failed: {}", e)))?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and close the file. Consuming the writer guarantees nothing is
    /// appended after finalization starts.
    pub fn finish(self) -> Result<u64, CaptureError> {
        let file = self
            .file
            .into_inner()
            .map_err(|e| CaptureError::StorageError(format!("staging flush failed: {}", e.error())))?;
        file.sync_all()
            .map_err(|e| CaptureError::StorageError(format!("staging sync failed: {}", e)))?;
        Ok(self.bytes_written)
    }
}

/// Delete scratch files left behind by sessions that never finished
/// (process killed mid-capture). Files whose session still holds its lock
/// are skipped. Returns how many scratch files were removed.
pub fn cleanup_stale_staging_files(dir: &Path) -> Result<usize, CaptureError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(CaptureError::StorageError(format!("failed to list staging directory: {}", e))),
    };

    let mut removed = 0;
    let mut in_use = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(stem) = name
            .strip_prefix(STAGING_PREFIX)
            .and_then(|rest| rest.strip_suffix(STAGING_EXTENSION))
        else {
            continue;
        };

        let lock_path = dir.join(format!("{}{}{}", STAGING_PREFIX, stem, LOCK_EXTENSION));
        if !is_abandoned(&lock_path) {
            in_use += 1;
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                removed += 1;
                remove_if_present(&lock_path);
            }
            Err(e) => log::warn!("failed to remove stale staging file {}: {}", name, e),
        }
    }
    if in_use > 0 {
        log::debug!("kept {} staging file(s) still in use in {}", in_use, dir.display());
    }
    if removed > 0 {
        log::info!("removed {} stale staging file(s) from {}", removed, dir.display());
    }
    Ok(removed)
}
