// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Archive engine seam.
//!
//! Timecap does not implement archival itself. It sequences an external
//! engine that knows how to (a) fully archive a directory tree and (b)
//! incrementally archive it against a state blob recording what the previous
//! step saw. The engine owns the state blob format; Timecap treats it as
//! opaque bytes.
//!
//! The default engine is GNU tar in `--listed-incremental` mode: handed a
//! missing state file it produces a full archive and a fresh blob, handed an
//! existing one it archives only entries that changed since the blob was
//! written, updating the blob in place. The caller is responsible for handing
//! it the right state path for the step it wants.

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::Command,
};
use tracing::{debug, instrument};

/// Interface for producing archive artifacts.
///
/// Both operations write the artifact to `artifact` and leave the state blob
/// at `state` describing the tree as of this archive. Implementations must
/// treat both paths as theirs to create or update, and must not touch
/// anything else in the destination directory.
pub trait ArchiveEngine {
    /// Produce a full baseline archive of `source_dir`.
    ///
    /// `state` names a path where a fresh state blob must be written. It is
    /// guaranteed not to exist when called.
    fn archive_full(&self, source_dir: &Path, artifact: &Path, state: &Path) -> Result<()>;

    /// Produce an incremental archive of `source_dir` against `state`.
    ///
    /// `state` holds the blob from the previous step and must be updated to
    /// describe the tree as of this archive.
    fn archive_incremental(&self, source_dir: &Path, artifact: &Path, state: &Path) -> Result<()>;
}

/// Archive engine backed by the system tar binary.
#[derive(Clone, Debug)]
pub struct TarEngine {
    program: OsString,
}

impl TarEngine {
    /// Construct new engine invoking `tar` from the search path.
    pub fn new() -> Self {
        Self {
            program: "tar".into(),
        }
    }

    /// Construct new engine invoking a specific tar binary.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the tar argument list for one archive step.
    ///
    /// Full and incremental steps use the same invocation; tar decides which
    /// to perform from whether the state file exists. Archiving "." relative
    /// to the source directory keeps member paths stable across runs, which
    /// the state blob comparison depends on.
    fn build_args(source_dir: &Path, artifact: &Path, state: &Path) -> Vec<OsString> {
        let mut listed_incremental = OsString::from("--listed-incremental=");
        listed_incremental.push(state);

        vec![
            listed_incremental,
            "-cpf".into(),
            artifact.into(),
            "-C".into(),
            source_dir.into(),
            ".".into(),
        ]
    }

    #[instrument(skip(self), level = "debug")]
    fn invoke(&self, source_dir: &Path, artifact: &Path, state: &Path) -> Result<()> {
        let args = Self::build_args(source_dir, artifact, state);
        debug!("invoking {:?} {:?}", self.program, args);
        syscall(&self.program, args)
    }
}

impl Default for TarEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveEngine for TarEngine {
    fn archive_full(&self, source_dir: &Path, artifact: &Path, state: &Path) -> Result<()> {
        self.invoke(source_dir, artifact, state)
    }

    fn archive_incremental(&self, source_dir: &Path, artifact: &Path, state: &Path) -> Result<()> {
        self.invoke(source_dir, artifact, state)
    }
}

fn syscall(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<()> {
    let output = Command::new(cmd.as_ref())
        .args(args)
        .output()
        .map_err(|err| EngineError::Spawn {
            source: err,
            program: cmd.as_ref().to_os_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();

        // INVARIANT: Chomp trailing newlines.
        let stderr = stderr
            .strip_suffix("\r\n")
            .or(stderr.strip_suffix('\n'))
            .map(ToString::to_string)
            .unwrap_or(stderr);

        return Err(EngineError::Failed {
            program: cmd.as_ref().to_os_string(),
            message: stderr,
        });
    }

    Ok(())
}

/// Archive engine error types.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Engine binary cannot be spawned at all.
    #[error("failed to spawn archive engine {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: OsString,
    },

    /// Engine ran and reported failure.
    #[error("archive engine {program:?} failed: {message}")]
    Failed { program: OsString, message: String },
}

/// Friendly result alias :3
type Result<T, E = EngineError> = std::result::Result<T, E>;
