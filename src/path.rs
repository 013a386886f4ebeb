// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Resolve and validate the two directories every run operates on: the source
//! directory being archived, and the destination directory that receives
//! artifacts, state, and the latest pointer.

use std::{
    fs,
    io::{Error as IoError, ErrorKind},
    path::{Path, PathBuf},
};

/// Resolve source directory to an absolute path.
///
/// The path must exist and name a readable directory. Resolution follows
/// symbolic links, so the returned path is the real location that gets
/// archived.
///
/// # Errors
///
/// - Return [`DirError::InvalidSource`] if the path does not exist, is not a
///   directory, or cannot be read.
pub fn resolve_source_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let resolved = path.canonicalize().map_err(|err| DirError::InvalidSource {
        source: err,
        path: path.to_path_buf(),
    })?;

    if !resolved.is_dir() {
        return Err(DirError::InvalidSource {
            source: IoError::new(ErrorKind::InvalidInput, "not a directory"),
            path: resolved,
        });
    }

    // INVARIANT: The directory must be listable, or the archive engine has
    // nothing to work with.
    fs::read_dir(&resolved).map_err(|err| DirError::InvalidSource {
        source: err,
        path: resolved.clone(),
    })?;

    Ok(resolved)
}

/// Resolve destination directory to an absolute path.
///
/// The path must exist and name a writable directory.
///
/// # Errors
///
/// - Return [`DirError::InvalidDestination`] if the path does not exist, is
///   not a directory, or is read-only.
pub fn resolve_dest_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let resolved = path
        .canonicalize()
        .map_err(|err| DirError::InvalidDestination {
            source: err,
            path: path.to_path_buf(),
        })?;

    if !resolved.is_dir() {
        return Err(DirError::InvalidDestination {
            source: IoError::new(ErrorKind::InvalidInput, "not a directory"),
            path: resolved,
        });
    }

    let metadata = fs::metadata(&resolved).map_err(|err| DirError::InvalidDestination {
        source: err,
        path: resolved.clone(),
    })?;

    if metadata.permissions().readonly() {
        return Err(DirError::InvalidDestination {
            source: IoError::new(ErrorKind::PermissionDenied, "directory is read-only"),
            path: resolved,
        });
    }

    Ok(resolved)
}

/// Directory validation error types.
#[derive(Debug, thiserror::Error)]
pub enum DirError {
    /// Source directory is missing, unreadable, or not a directory.
    #[error("invalid source directory {:?}", path.display())]
    InvalidSource {
        #[source]
        source: IoError,
        path: PathBuf,
    },

    /// Destination directory is missing, unwritable, or not a directory.
    #[error("invalid destination directory {:?}", path.display())]
    InvalidDestination {
        #[source]
        source: IoError,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = DirError> = std::result::Result<T, E>;
