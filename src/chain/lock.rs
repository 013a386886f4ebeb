// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Advisory locking for archive chains.
//!
//! Two simultaneous runs against the same chain would race on reading the
//! current depth and on the pointer rename, and both could pick the same next
//! depth. Every run therefore holds an exclusive advisory lock on
//! `<name>.lock` in the destination directory from the moment the chain is
//! opened until the run finishes. The lock is released on every exit path,
//! including failure, by dropping the guard.

use fs2::FileExt;
use std::{
    fs::{File, OpenOptions},
    path::PathBuf,
};
use tracing::debug;

/// Exclusive per-chain lock guard.
///
/// Holds the lock for as long as the value lives. Dropping the guard releases
/// the lock, as does process exit of any kind.
#[derive(Debug)]
pub struct ChainLock {
    file: File,
    path: PathBuf,
}

impl ChainLock {
    /// Acquire the chain lock without blocking.
    ///
    /// # Errors
    ///
    /// - Return [`LockError::Open`] if the lock file cannot be created or
    ///   opened.
    /// - Return [`LockError::Held`] if another run already holds the lock.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| LockError::Open {
                source: err,
                path: path.clone(),
            })?;

        file.try_lock_exclusive().map_err(|err| LockError::Held {
            source: err,
            path: path.clone(),
        })?;

        debug!("acquired chain lock at {:?}", path.display());

        Ok(Self { file, path })
    }
}

impl Drop for ChainLock {
    fn drop(&mut self) {
        // Closing the file would release the lock anyway; unlock explicitly
        // so the release is not tied to drop order of the file handle.
        let _ = fs2::FileExt::unlock(&self.file);
        debug!("released chain lock at {:?}", self.path.display());
    }
}

/// Chain lock error types.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Lock file cannot be created or opened.
    #[error("failed to open chain lock at {:?}", path.display())]
    Open {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Another run holds the lock.
    #[error("another run holds the chain lock at {:?}", path.display())]
    Held {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = LockError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use sealed_test::prelude::*;

    #[sealed_test]
    fn acquire_is_exclusive_until_dropped() -> anyhow::Result<()> {
        let first = ChainLock::acquire("chain.lock")?;

        let second = ChainLock::acquire("chain.lock");
        assert!(matches!(second, Err(LockError::Held { .. })));

        drop(first);

        let third = ChainLock::acquire("chain.lock");
        assert!(third.is_ok());

        Ok(())
    }
}
