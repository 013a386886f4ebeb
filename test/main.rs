// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use anyhow::Result;
use std::{cell::Cell, fs, path::Path, path::PathBuf};
use timecap::{
    chain::{ArchiveEngine, ChainLayout, EngineError},
    ChainName,
};

/// One source/destination directory pair with a written chain configuration.
///
/// Expects to be constructed inside a fresh working directory, which
/// sealed_test provides per test.
pub(crate) struct ChainFixture {
    pub(crate) source_dir: PathBuf,
    pub(crate) dest_dir: PathBuf,
    name: String,
}

impl ChainFixture {
    pub(crate) fn new(name: &str, max_depth: u32) -> Result<Self> {
        let fixture = Self::without_config(name)?;
        fs::write(
            fixture.source_dir.join(".timecap"),
            format!("SRCNAME = \"{name}\"\nMAXDEPTH = {max_depth}\n"),
        )?;

        Ok(fixture)
    }

    pub(crate) fn without_config(name: &str) -> Result<Self> {
        let source_dir = PathBuf::from("source");
        let dest_dir = PathBuf::from("dest");
        fs::create_dir_all(&source_dir)?;
        fs::create_dir_all(&dest_dir)?;
        fs::write(source_dir.join("notes.txt"), "first version")?;

        Ok(Self {
            source_dir,
            dest_dir,
            name: name.into(),
        })
    }

    pub(crate) fn layout(&self) -> ChainLayout {
        ChainLayout::new(self.dest_dir.clone(), ChainName::new(self.name.as_str()).unwrap())
    }
}

/// Archive engine double that records archives as tiny text files.
///
/// The state blob content mimics the engine contract: a baseline writes a
/// fresh blob, an incremental step appends to the blob it was handed. That
/// makes "new blob after rollover" versus "updated blob mid-chain"
/// observable from file content alone.
pub(crate) struct FakeEngine {
    fail: bool,
    calls: Cell<u32>,
}

impl FakeEngine {
    pub(crate) fn new() -> Self {
        Self {
            fail: false,
            calls: Cell::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            calls: Cell::new(0),
        }
    }

    fn check(&self) -> Result<(), EngineError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(EngineError::Failed {
                program: "fake".into(),
                message: "induced failure".into(),
            });
        }

        Ok(())
    }
}

impl ArchiveEngine for FakeEngine {
    fn archive_full(&self, source_dir: &Path, artifact: &Path, state: &Path) -> Result<(), EngineError> {
        self.check()?;
        assert!(
            !state.exists(),
            "baseline must be handed a missing state path"
        );
        fs::write(artifact, format!("full of {}", source_dir.display())).map_err(io_failed)?;
        fs::write(state, "base").map_err(io_failed)?;

        Ok(())
    }

    fn archive_incremental(
        &self,
        source_dir: &Path,
        artifact: &Path,
        state: &Path,
    ) -> Result<(), EngineError> {
        self.check()?;
        let blob = fs::read_to_string(state).map_err(io_failed)?;
        fs::write(artifact, format!("incr of {}", source_dir.display())).map_err(io_failed)?;
        fs::write(state, format!("{blob}+step")).map_err(io_failed)?;

        Ok(())
    }
}

fn io_failed(err: std::io::Error) -> EngineError {
    EngineError::Failed {
        program: "fake".into(),
        message: err.to_string(),
    }
}
