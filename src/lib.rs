// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Depth-bounded incremental archiving.
//!
//! Timecap maintains an __archive chain__ per source directory: a full
//! baseline archive followed by incremental archives, each recording only
//! what changed since the step before it. Once a chain reaches its
//! configured depth bound, the next run rolls over to a fresh baseline. A
//! symbolic "latest" pointer in the destination directory always resolves to
//! the newest artifact.
//!
//! The archival work itself is delegated to an external engine (GNU tar in
//! listed-incremental mode by default) behind the
//! [`ArchiveEngine`](crate::chain::ArchiveEngine) trait. Timecap's job is
//! the part the engine does not do: identity, depth bookkeeping, locking,
//! and making sure nothing observable changes unless the engine succeeds.

pub mod chain;
pub mod config;
pub mod path;

pub use chain::{ArchiveEngine, ArchiveError, ArchiveResult, Archiver, TarEngine};
pub use config::{ChainConfig, ChainName};
