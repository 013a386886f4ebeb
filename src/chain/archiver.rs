// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Archive run orchestration.
//!
//! One invocation equals one archive operation. A run is split into two
//! phases so callers can report on the chain before committing to work:
//!
//! 1. [`Archiver::prepare`] resolves and validates both directories, loads
//!    the chain configuration, takes the chain lock, and reads the sidecar
//!    metadata to learn where the chain left off.
//! 2. [`Archiver::run`] picks the next depth, drives the archive engine
//!    against staged paths, commits on success, and refreshes the latest
//!    pointer.
//!
//! The lock taken in phase one is held by the `Archiver` value itself, so
//! the whole read-modify-write sequence is covered and release happens on
//! every exit path.

use crate::{
    chain::{
        engine::{ArchiveEngine, EngineError},
        layout::{ChainLayout, LayoutError},
        lock::{ChainLock, LockError},
    },
    config::{ChainConfig, ChainName, ConfigError},
    path::{self, DirError},
};

use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// A prepared archive run for one chain.
///
/// Holds the chain lock from construction until the run completes or the
/// value is dropped.
#[derive(Debug)]
pub struct Archiver {
    source_dir: PathBuf,
    config: ChainConfig,
    layout: ChainLayout,
    previous_depth: Option<u32>,
    _lock: ChainLock,
}

impl Archiver {
    /// Prepare an archive run.
    ///
    /// Validates both directories, loads the chain configuration from the
    /// source directory, acquires the chain lock, and discovers the previous
    /// depth from the sidecar metadata. A sidecar record without a live
    /// state blob is treated as if no previous backup exists, since the
    /// engine cannot continue a chain whose state is gone.
    ///
    /// # Errors
    ///
    /// - Return [`DirError`] variants for an invalid source or destination.
    /// - Return [`ConfigError::Missing`] if the source carries no
    ///   configuration file; Timecap fails closed rather than archiving
    ///   under a guessed identity.
    /// - Return [`LockError::Held`] if another run owns the chain.
    /// - Return [`LayoutError`] variants if the sidecar metadata is
    ///   unreadable.
    #[instrument(level = "debug")]
    pub fn prepare(
        source_dir: impl AsRef<Path> + Debug,
        dest_dir: impl AsRef<Path> + Debug,
    ) -> Result<Self> {
        let source_dir = path::resolve_source_dir(source_dir)?;
        let dest_dir = path::resolve_dest_dir(dest_dir)?;
        let config = ChainConfig::load(&source_dir)?;
        let layout = ChainLayout::new(dest_dir, config.name.clone());
        let lock = ChainLock::acquire(layout.lock_path())?;

        let previous_depth = match layout.read_meta()? {
            Some(meta) if layout.state_path().exists() => Some(meta.depth),
            Some(meta) => {
                warn!(
                    "chain {} has metadata at depth {} but no state blob, starting over",
                    config.name, meta.depth
                );
                None
            }
            None => None,
        };

        Ok(Self {
            source_dir,
            config,
            layout,
            previous_depth,
            _lock: lock,
        })
    }

    /// Chain identifier resolved from configuration.
    pub fn name(&self) -> &ChainName {
        &self.config.name
    }

    /// Depth bound of the chain.
    pub fn max_depth(&self) -> u32 {
        self.config.max_depth
    }

    /// Depth of the previous backup, if one exists.
    pub fn previous_depth(&self) -> Option<u32> {
        self.previous_depth
    }

    /// Execute the archive run.
    ///
    /// Consumes the archiver; the chain lock is released when the run
    /// returns.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::Engine`] if the engine fails. Staged files
    ///   are discarded and the live state blob, metadata, and pointer are
    ///   exactly what the last successful run left.
    /// - Return [`ArchiveError::Layout`] if committing the successful
    ///   archive fails.
    ///
    /// A failure to refresh the latest pointer is NOT an error: the artifact
    /// is already committed, so it is logged as a warning and reflected by
    /// [`ArchiveResult::latest_path`] being `None`.
    #[instrument(skip(self, engine), fields(chain = %self.config.name))]
    pub fn run(self, engine: &impl ArchiveEngine) -> Result<ArchiveResult> {
        let depth = next_depth(self.previous_depth, self.config.max_depth);
        let staged_artifact = self.layout.staged_artifact_path(depth);
        let staged_state = self.layout.staged_state_path();

        let outcome = if depth > 0 {
            info!("incremental step to depth {depth}");
            self.layout.stage_state_copy()?;
            engine.archive_incremental(&self.source_dir, &staged_artifact, &staged_state)
        } else {
            info!("full baseline at depth 0");
            self.layout.clear_staged_state()?;
            engine.archive_full(&self.source_dir, &staged_artifact, &staged_state)
        };

        if let Err(err) = outcome {
            self.layout.discard_staged(depth);
            return Err(err.into());
        }

        let artifact_path = self.layout.commit(depth)?;

        let latest_path = match self.layout.refresh_latest(depth) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("{err}, artifact stands and a retry is safe");
                None
            }
        };

        info!(
            "archived {:?} at depth {depth}",
            self.source_dir.display()
        );

        Ok(ArchiveResult {
            name: self.config.name,
            depth,
            artifact_path,
            latest_path,
        })
    }
}

/// Outcome of a successful archive run.
#[derive(Debug)]
pub struct ArchiveResult {
    /// Chain the artifact belongs to.
    pub name: ChainName,

    /// Depth of the produced artifact, 0 meaning a baseline.
    pub depth: u32,

    /// Committed artifact path.
    pub artifact_path: PathBuf,

    /// Latest pointer path, or `None` if the pointer refresh failed and
    /// should be retried.
    pub latest_path: Option<PathBuf>,
}

/// Pick the depth of the next archive step.
///
/// Continue the chain while it stays under the depth bound; roll over to a
/// new baseline otherwise. No previous backup always means a baseline.
fn next_depth(previous_depth: Option<u32>, max_depth: u32) -> u32 {
    match previous_depth {
        Some(depth) if depth + 1 < max_depth => depth + 1,
        _ => 0,
    }
}

/// Archive run error types.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Source or destination directory failed validation.
    #[error(transparent)]
    Dir(#[from] DirError),

    /// Chain configuration is missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Chain lock cannot be acquired.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Destination layout operation failed.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Archive engine invocation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Friendly result alias :3
type Result<T, E = ArchiveError> = std::result::Result<T, E>;
