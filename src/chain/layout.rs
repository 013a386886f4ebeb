// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Destination directory layout for archive chains.
//!
//! Every file a chain owns in its destination directory is named here, and
//! every mutation of those files goes through this module so the commit
//! discipline stays in one place: staged writes under a ".new" suffix,
//! renamed into place only after the archive engine has succeeded.
//!
//! # Sidecar Metadata
//!
//! The current depth of a chain is recorded in a small TOML sidecar file
//! `<name>.meta` beside the state blob, rather than being parsed back out of
//! artifact file names. The sidecar is rewritten through the same
//! stage-then-rename path as everything else, so it always describes the last
//! successful run.

use crate::config::ChainName;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Suffix marking a staged file that has not been committed yet.
const STAGING_SUFFIX: &str = ".new";

/// Path scheme for one chain inside its destination directory.
#[derive(Clone, Debug)]
pub struct ChainLayout {
    dest_dir: PathBuf,
    name: ChainName,
}

impl ChainLayout {
    /// Construct new layout for a chain rooted at `dest_dir`.
    pub fn new(dest_dir: impl Into<PathBuf>, name: ChainName) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            name,
        }
    }

    /// Chain identifier this layout files everything under.
    pub fn name(&self) -> &ChainName {
        &self.name
    }

    /// Destination directory the chain lives in.
    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Path of the live engine-owned state blob.
    pub fn state_path(&self) -> PathBuf {
        self.dest_dir.join(format!("{}.state", self.name))
    }

    /// Path the state blob is staged at during a run.
    pub fn staged_state_path(&self) -> PathBuf {
        staged(self.state_path())
    }

    /// Path of the sidecar metadata record.
    pub fn meta_path(&self) -> PathBuf {
        self.dest_dir.join(format!("{}.meta", self.name))
    }

    /// Path of the artifact at a given depth.
    pub fn artifact_path(&self, depth: u32) -> PathBuf {
        self.dest_dir
            .join(format!("{}-{depth}.archive", self.name))
    }

    /// Path the artifact at a given depth is staged at during a run.
    pub fn staged_artifact_path(&self, depth: u32) -> PathBuf {
        staged(self.artifact_path(depth))
    }

    /// Path of the latest pointer.
    pub fn latest_path(&self) -> PathBuf {
        self.dest_dir
            .join(format!("{}-latest.archive", self.name))
    }

    /// Path of the advisory lock file guarding the chain.
    pub fn lock_path(&self) -> PathBuf {
        self.dest_dir.join(format!("{}.lock", self.name))
    }

    /// Read the sidecar metadata record, if one exists.
    ///
    /// # Errors
    ///
    /// - Return [`LayoutError::ReadMeta`] if the record exists but cannot be
    ///   read.
    /// - Return [`LayoutError::ParseMeta`] if the record cannot be parsed.
    pub fn read_meta(&self) -> Result<Option<ChainMeta>> {
        let path = self.meta_path();
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(LayoutError::ReadMeta { source: err, path }),
        };

        let meta = toml::de::from_str(data.as_str())
            .map_err(|err| LayoutError::ParseMeta { source: err, path })?;

        Ok(Some(meta))
    }

    /// Seed the staged state blob for an incremental step.
    ///
    /// The engine updates the state blob it archives against, so incremental
    /// steps run against a copy of the live blob. The live blob is replaced
    /// only at commit, which keeps it untouched by failed or interrupted
    /// runs.
    ///
    /// # Errors
    ///
    /// - Return [`LayoutError::StageState`] if the live blob cannot be
    ///   copied.
    pub fn stage_state_copy(&self) -> Result<()> {
        fs::copy(self.state_path(), self.staged_state_path()).map_err(|err| {
            LayoutError::StageState {
                source: err,
                path: self.state_path(),
            }
        })?;

        Ok(())
    }

    /// Drop any staged state blob left behind by an earlier run.
    ///
    /// A baseline step needs the engine to build its state blob from
    /// scratch, so a stale staged blob must not be lying around.
    ///
    /// # Errors
    ///
    /// - Return [`LayoutError::StageState`] if a stale staged blob exists but
    ///   cannot be removed.
    pub fn clear_staged_state(&self) -> Result<()> {
        remove_if_present(self.staged_state_path()).map_err(|err| LayoutError::StageState {
            source: err,
            path: self.staged_state_path(),
        })
    }

    /// Commit a successful archive step.
    ///
    /// Renames the staged artifact and staged state blob into place, then
    /// rewrites the sidecar metadata record to the new depth. Rename is used
    /// instead of copy so there is no window where a live file holds partial
    /// content.
    ///
    /// # Errors
    ///
    /// - Return [`LayoutError::Commit`] if any rename fails.
    /// - Return [`LayoutError::WriteMeta`] if the sidecar record cannot be
    ///   rewritten.
    pub fn commit(&self, depth: u32) -> Result<PathBuf> {
        let artifact = self.artifact_path(depth);

        rename(self.staged_artifact_path(depth), &artifact)?;
        rename(self.staged_state_path(), self.state_path())?;

        let meta = ChainMeta {
            depth,
            artifact: artifact
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        self.write_meta(&meta)?;

        debug!("committed depth {depth} for chain {}", self.name);

        Ok(artifact)
    }

    /// Remove staged files after a failed engine invocation. Best effort;
    /// leftovers are overwritten by the next run anyway.
    pub fn discard_staged(&self, depth: u32) {
        let _ = remove_if_present(self.staged_artifact_path(depth));
        let _ = remove_if_present(self.staged_state_path());
    }

    /// Point the latest pointer at the artifact of a given depth.
    ///
    /// The pointer is a symbolic link holding only the artifact's file name,
    /// so a relocated destination directory keeps working. Replacement goes
    /// through a staged link renamed over the old pointer, which is atomic on
    /// POSIX filesystems.
    ///
    /// # Errors
    ///
    /// - Return [`PointerError`] if the link cannot be created or renamed.
    ///   The artifact itself is already committed at this point, so the
    ///   caller may treat this as recoverable and retry later.
    pub fn refresh_latest(&self, depth: u32) -> Result<PathBuf, PointerError> {
        let latest = self.latest_path();
        let staged_latest = staged(&latest);
        let target = PathBuf::from(format!("{}-{depth}.archive", self.name));

        let outcome = remove_if_present(&staged_latest)
            .and_then(|_| symlink(&target, &staged_latest))
            .and_then(|_| fs::rename(&staged_latest, &latest));

        match outcome {
            Ok(()) => Ok(latest),
            Err(err) => Err(PointerError {
                source: err,
                path: latest,
            }),
        }
    }

    fn write_meta(&self, meta: &ChainMeta) -> Result<()> {
        let path = self.meta_path();
        let staged_path = staged(&path);
        let data = toml::ser::to_string_pretty(meta).map_err(LayoutError::SerializeMeta)?;

        fs::write(&staged_path, data).map_err(|err| LayoutError::WriteMeta {
            source: err,
            path: staged_path.clone(),
        })?;
        rename(staged_path, path)?;

        Ok(())
    }
}

impl Display for ChainLayout {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{} in {:?}", self.name, self.dest_dir.display())
    }
}

/// Sidecar metadata record describing the last successful run of a chain.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChainMeta {
    /// Depth of the most recent artifact, 0 meaning a baseline.
    pub depth: u32,

    /// File name of the most recent artifact.
    pub artifact: String,
}

fn staged(path: impl AsRef<Path>) -> PathBuf {
    let mut path = path.as_ref().as_os_str().to_os_string();
    path.push(STAGING_SUFFIX);
    path.into()
}

fn rename(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    fs::rename(from.as_ref(), to.as_ref()).map_err(|err| LayoutError::Commit {
        source: err,
        from: from.as_ref().to_path_buf(),
        to: to.as_ref().to_path_buf(),
    })
}

fn remove_if_present(path: impl AsRef<Path>) -> std::io::Result<()> {
    match fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Chain layout error types.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Sidecar metadata record cannot be read.
    #[error("failed to read chain metadata at {:?}", path.display())]
    ReadMeta {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Sidecar metadata record cannot be parsed.
    #[error("failed to parse chain metadata at {:?}", path.display())]
    ParseMeta {
        #[source]
        source: toml::de::Error,
        path: PathBuf,
    },

    /// Sidecar metadata record cannot be serialized.
    #[error(transparent)]
    SerializeMeta(#[from] toml::ser::Error),

    /// Sidecar metadata record cannot be written.
    #[error("failed to write chain metadata at {:?}", path.display())]
    WriteMeta {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// State blob cannot be staged for an incremental step.
    #[error("failed to stage state blob from {:?}", path.display())]
    StageState {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Staged file cannot be renamed into place.
    #[error("failed to rename {:?} to {:?}", from.display(), to.display())]
    Commit {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },
}

/// Latest pointer cannot be replaced.
///
/// Recoverable: the artifact this pointer should reference is already
/// committed, so retrying the pointer update is safe.
#[derive(Debug, thiserror::Error)]
#[error("failed to update latest pointer at {:?}", path.display())]
pub struct PointerError {
    #[source]
    source: std::io::Error,
    path: PathBuf,
}

/// Friendly result alias :3
type Result<T, E = LayoutError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn layout() -> ChainLayout {
        ChainLayout::new(".", ChainName::new("documents").unwrap())
    }

    #[test]
    fn path_scheme_files_everything_under_chain_name() {
        let layout = ChainLayout::new("/backups", ChainName::new("documents").unwrap());

        assert_eq!(layout.state_path(), PathBuf::from("/backups/documents.state"));
        assert_eq!(layout.meta_path(), PathBuf::from("/backups/documents.meta"));
        assert_eq!(layout.lock_path(), PathBuf::from("/backups/documents.lock"));
        assert_eq!(
            layout.artifact_path(3),
            PathBuf::from("/backups/documents-3.archive")
        );
        assert_eq!(
            layout.staged_artifact_path(3),
            PathBuf::from("/backups/documents-3.archive.new")
        );
        assert_eq!(
            layout.latest_path(),
            PathBuf::from("/backups/documents-latest.archive")
        );
    }

    #[sealed_test]
    fn read_meta_returns_none_when_absent() -> anyhow::Result<()> {
        assert_eq!(layout().read_meta()?, None);
        Ok(())
    }

    #[sealed_test]
    fn commit_renames_staged_files_and_records_depth() -> anyhow::Result<()> {
        let layout = layout();
        fs::write(layout.staged_artifact_path(2), "artifact")?;
        fs::write(layout.staged_state_path(), "state")?;

        let artifact = layout.commit(2)?;

        assert_eq!(fs::read_to_string(&artifact)?, "artifact");
        assert_eq!(fs::read_to_string(layout.state_path())?, "state");
        assert!(!layout.staged_artifact_path(2).exists());
        assert!(!layout.staged_state_path().exists());

        let meta = layout.read_meta()?.expect("meta record must exist");
        let expect = ChainMeta {
            depth: 2,
            artifact: "documents-2.archive".into(),
        };
        assert_eq!(meta, expect);

        Ok(())
    }

    #[sealed_test]
    fn refresh_latest_replaces_previous_pointer() -> anyhow::Result<()> {
        let layout = layout();
        fs::write(layout.artifact_path(0), "baseline")?;
        fs::write(layout.artifact_path(1), "step one")?;

        layout.refresh_latest(0)?;
        assert_eq!(
            fs::read_link(layout.latest_path())?,
            PathBuf::from("documents-0.archive")
        );

        layout.refresh_latest(1)?;
        assert_eq!(
            fs::read_link(layout.latest_path())?,
            PathBuf::from("documents-1.archive")
        );
        assert_eq!(fs::read_to_string(layout.latest_path())?, "step one");

        Ok(())
    }

    #[sealed_test]
    fn discard_staged_removes_leftovers() -> anyhow::Result<()> {
        let layout = layout();
        fs::write(layout.staged_artifact_path(1), "partial")?;
        fs::write(layout.staged_state_path(), "partial")?;

        layout.discard_staged(1);

        assert!(!layout.staged_artifact_path(1).exists());
        assert!(!layout.staged_state_path().exists());

        Ok(())
    }
}
