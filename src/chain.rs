// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Archive chain domain.
//!
//! A __chain__ is the ordered sequence of archives produced for one source
//! directory: a full baseline at depth 0 followed by up to `MAXDEPTH - 1`
//! incremental steps, each capturing only what changed since the step before
//! it. When a chain reaches its depth bound, the next run starts a new
//! baseline and the cycle repeats.
//!
//! # Chain Components
//!
//! Everything a chain owns lives in its destination directory, filed under
//! the chain name:
//!
//! - the artifacts themselves, `<name>-<depth>.archive`;
//! - the engine-owned state blob `<name>.state`, opaque bytes the archive
//!   engine uses to detect changes since the previous step;
//! - the sidecar metadata record `<name>.meta`, which stores the current
//!   depth explicitly instead of encoding it in file names;
//! - the latest pointer `<name>-latest.archive`, a symbolic link that always
//!   resolves to the newest artifact;
//! - the advisory lock file `<name>.lock`, which serializes runs against the
//!   same chain.
//!
//! # Commit Discipline
//!
//! The archive engine never writes to a live file. Artifacts and the state
//! blob are produced at a ".new" staging path and renamed into place only
//! after the engine reports success, so a failed or interrupted run leaves
//! the chain exactly as the last successful run left it.

pub mod archiver;
pub mod engine;
pub mod layout;
pub mod lock;

pub use archiver::{ArchiveError, ArchiveResult, Archiver};
pub use engine::{ArchiveEngine, EngineError, TarEngine};
pub use layout::{ChainLayout, ChainMeta, LayoutError, PointerError};
pub use lock::{ChainLock, LockError};
