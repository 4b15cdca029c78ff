// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Lock
//!
//! The singleton file lock guaranteeing at most one concurrent run per
//! installation. The lock is an advisory exclusive lock on
//! `<app-dir>/.etl.lock`, acquired before any stage runs and released when
//! the [`ProcessLock`] drops - which the OS also guarantees on abnormal
//! termination, because the lock dies with the file descriptor.
//!
//! A second process attempting acquisition while the lock is held fails
//! immediately with a typed contention error; there is no waiting and no
//! stale-lock detection. A lock file left behind by a crashed run holds no
//! lock (the descriptor is gone), so the next run acquires it normally;
//! only manual inspection of the recorded PID is offered.

use daybatch_domain::EtlError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Lock file name inside the application directory
pub const LOCK_FILE_NAME: &str = ".etl.lock";

/// An acquired, exclusive process lock.
///
/// Holding the value holds the lock; dropping it releases the lock and
/// removes the file best-effort.
#[derive(Debug)]
pub struct ProcessLock {
    // NOTE(lifetime): held to maintain the exclusive lock; released on drop
    file: File,
    path: PathBuf,
}

impl ProcessLock {
    /// Acquires the exclusive lock under `app_dir`, creating the directory
    /// if needed, and records this process's PID in the file.
    ///
    /// # Errors
    ///
    /// - [`EtlError::LockContention`] when another process holds the lock
    /// - [`EtlError::IoError`] for any other filesystem failure
    pub fn acquire(app_dir: &Path) -> Result<Self, EtlError> {
        std::fs::create_dir_all(app_dir)?;
        let path = app_dir.join(LOCK_FILE_NAME);

        // Open without truncating: the file must not be clobbered before we
        // actually hold the lock, or we would erase the holder's PID.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.try_lock_exclusive().map_err(|err| {
            if err.kind() == fs2::lock_contended_error().kind() {
                EtlError::LockContention(format!(
                    "lock file {} is held by another run",
                    path.display()
                ))
            } else {
                EtlError::IoError(format!("cannot lock {}: {}", path.display(), err))
            }
        })?;

        // The lock is held; now the PID can be written safely.
        let mut file = file;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Self { file, path })
    }

    /// Path of the held lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        // Unlock explicitly, then remove the artifact. Both are best-effort:
        // the descriptor closing releases the lock regardless.
        let _ = fs2::FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}
