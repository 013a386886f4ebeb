// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Chain configuration layout.
//!
//! Specify the layout for the per-source configuration file that Timecap uses
//! to identify an archive chain, and simplify the process of serialization
//! and deserialization.
//!
//! # General Layout
//!
//! Every source directory that Timecap archives must carry a configuration
//! file named ".timecap" at its top-level. The file is plain TOML holding two
//! required keys: `SRCNAME`, the identifier under which all archives of the
//! source are filed in the destination directory, and `MAXDEPTH`, the number
//! of archives a chain may grow to before the next run is forced back to a
//! full baseline.
//!
//! # Strictness
//!
//! Timecap refuses to guess. A missing configuration file, a missing key, or
//! an unrecognized key all abort the run. Archiving a directory under an
//! identity the user never wrote down is worse than asking them to write two
//! lines of TOML.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// File name of the per-source configuration record.
pub const CONFIG_FILE_NAME: &str = ".timecap";

/// Archive chain configuration.
///
/// Identifies one archive chain: the name its artifacts are filed under, and
/// the depth bound after which the chain rolls over to a fresh baseline.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Chain identifier used for every file the chain owns in the
    /// destination directory.
    #[serde(rename = "SRCNAME")]
    pub name: ChainName,

    /// Maximum number of archives in a chain before the next run resets to a
    /// baseline. Must be at least 1.
    #[serde(rename = "MAXDEPTH")]
    pub max_depth: u32,
}

impl ChainConfig {
    /// Load chain configuration from the top-level of a source directory.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Missing`] if no configuration file exists.
    /// - Return [`ConfigError::Read`] if the file exists but cannot be read.
    /// - Return parse errors as described by [`ChainConfig::from_str`].
    pub fn load(source_dir: impl AsRef<Path>) -> Result<Self> {
        let path = source_dir.as_ref().join(CONFIG_FILE_NAME);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing { path })
            }
            Err(err) => return Err(ConfigError::Read { source: err, path }),
        };

        data.parse()
    }
}

impl FromStr for ChainConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let config: ChainConfig = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: A chain must allow at least its baseline archive.
        if config.max_depth == 0 {
            return Err(ConfigError::InvalidDepth);
        }

        Ok(config)
    }
}

impl Display for ChainConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Validated identifier of an archive chain.
///
/// # Invariant
///
/// - Never empty, and never contains a path separator or a leading dot, so
///   that every destination file name derived from it stays inside the
///   destination directory.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainName(String);

impl ChainName {
    /// Construct new chain name after validation.
    ///
    /// # Errors
    ///
    /// - Return [`InvalidChainName`] if the name is empty, starts with a dot,
    ///   or contains a path separator.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidChainName> {
        let name = name.into();

        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name.starts_with('.') {
            Some("name starts with a dot")
        } else if name.contains(['/', '\\']) {
            Some("name contains a path separator")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(InvalidChainName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    /// Treat chain name as string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for ChainName {
    type Error = InvalidChainName;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl From<ChainName> for String {
    fn from(name: ChainName) -> Self {
        name.0
    }
}

impl Display for ChainName {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Chain name failed validation.
#[derive(Clone, Debug, thiserror::Error)]
#[error("invalid chain name {name:?}: {reason}")]
pub struct InvalidChainName {
    name: String,
    reason: &'static str,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration file exists at the expected path.
    #[error("no chain configuration found at {:?}", path.display())]
    Missing { path: PathBuf },

    /// Configuration file exists but cannot be read.
    #[error("failed to read chain configuration at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Maximum depth does not permit even a baseline archive.
    #[error("MAXDEPTH must be at least 1")]
    InvalidDepth,
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
