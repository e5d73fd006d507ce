// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Store directories and the paths below them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use libnixstore_base_encoding::{Base, DecodeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of digest bytes in a store path hash part.
pub const STORE_PATH_HASH_SIZE: usize = 20;
/// Length of the hash part as it appears in a file name.
pub const STORE_PATH_HASH_ENCODED_LEN: usize = 32;
/// Longest name accepted after the hash part.
pub const MAX_NAME_LEN: usize = 211;

pub const DEFAULT_STORE_DIR: &str = "/nix/store";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorePathError {
    #[error("path '{path}' is not in the Nix store '{store_dir}'")]
    NotInStore { path: String, store_dir: String },

    #[error("store path '{0}' is too short")]
    TooShort(String),

    #[error("store path '{0}' is missing the '-' after its hash part")]
    MissingSeparator(String),

    #[error("store path '{path}' has an invalid hash part: {source}")]
    Hash {
        path: String,
        #[source]
        source: DecodeError,
    },

    #[error("store path name '{name}' {reason}")]
    Name { name: String, reason: NameError },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    #[error("is empty")]
    Empty,
    #[error("is longer than {MAX_NAME_LEN} characters ({0})")]
    TooLong(usize),
    #[error("must not start with a period")]
    LeadingPeriod,
    #[error("contains illegal character {symbol:?} at position {position}")]
    Symbol { position: usize, symbol: char },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("store directory '{0}' is not an absolute path")]
pub struct StoreDirError(String);

/// The logical root under which store paths live, `/nix/store` by default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreDir(String);

impl StoreDir {
    pub fn new(dir: impl Into<String>) -> Result<StoreDir, StoreDirError> {
        let dir = dir.into();
        let trimmed = dir.trim_end_matches('/');
        if !trimmed.starts_with('/') {
            return Err(StoreDirError(dir));
        }
        Ok(StoreDir(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Parse an absolute path that must name an entry directly inside this
    /// store directory. Sub-paths of a store path are rejected.
    pub fn parse_path(&self, path: &str) -> Result<StorePath, StorePathError> {
        let not_in_store = || StorePathError::NotInStore {
            path: path.to_owned(),
            store_dir: self.0.clone(),
        };
        let base_name = path
            .strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| rest.trim_end_matches('/'))
            .ok_or_else(not_in_store)?;
        if base_name.contains('/') {
            return Err(not_in_store());
        }
        StorePath::from_base_name(base_name)
    }

    /// The absolute path of `path` as text.
    pub fn display_path(&self, path: &StorePath) -> String {
        format!("{}/{}", self.0, path)
    }

    pub fn join(&self, path: &StorePath) -> PathBuf {
        self.to_path().join(path.to_string())
    }
}

impl Default for StoreDir {
    fn default() -> Self {
        StoreDir(DEFAULT_STORE_DIR.to_owned())
    }
}

impl fmt::Display for StoreDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StoreDir {
    type Error = StoreDirError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        StoreDir::new(value)
    }
}

impl From<StoreDir> for String {
    fn from(value: StoreDir) -> Self {
        value.0
    }
}

impl AsRef<Path> for StoreDir {
    fn as_ref(&self) -> &Path {
        self.to_path()
    }
}

/// The 32 character nix base32 prefix of a store path file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorePathHash(String);

impl StorePathHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn digest(&self) -> Result<[u8; STORE_PATH_HASH_SIZE], DecodeError> {
        let bytes = Base::NixBase32.decode(self.0.as_bytes(), STORE_PATH_HASH_SIZE)?;
        let mut out = [0u8; STORE_PATH_HASH_SIZE];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}

impl FromStr for StorePathHash {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Base::NixBase32.decode(s.as_bytes(), STORE_PATH_HASH_SIZE)?;
        Ok(StorePathHash(s.to_owned()))
    }
}

impl fmt::Display for StorePathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The human readable part of a store path file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorePathName(String);

impl StorePathName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_name_symbol(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_' | '?' | '=')
}

impl FromStr for StorePathName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(NameError::Empty);
        }
        if s.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong(s.len()));
        }
        if s.starts_with('.') {
            return Err(NameError::LeadingPeriod);
        }
        if let Some((position, symbol)) = s.char_indices().find(|(_, c)| !is_name_symbol(*c)) {
            return Err(NameError::Symbol { position, symbol });
        }
        Ok(StorePathName(s.to_owned()))
    }
}

impl fmt::Display for StorePathName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A store path without its store directory: `<hash part>-<name>`.
///
/// Ordering follows the file name, which is the order Nix uses when it lists
/// references.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorePath {
    hash: StorePathHash,
    name: StorePathName,
}

impl StorePath {
    pub fn from_base_name(base_name: &str) -> Result<StorePath, StorePathError> {
        if base_name.len() < STORE_PATH_HASH_ENCODED_LEN + 2 {
            return Err(StorePathError::TooShort(base_name.to_owned()));
        }
        let (hash, rest) = base_name
            .split_at_checked(STORE_PATH_HASH_ENCODED_LEN)
            .ok_or_else(|| StorePathError::Hash {
                path: base_name.to_owned(),
                source: DecodeError::Symbol {
                    base: Base::NixBase32,
                    position: base_name.find(|c: char| !c.is_ascii()).unwrap_or(0),
                },
            })?;
        let name = rest
            .strip_prefix('-')
            .ok_or_else(|| StorePathError::MissingSeparator(base_name.to_owned()))?;
        let hash = hash.parse().map_err(|source| StorePathError::Hash {
            path: base_name.to_owned(),
            source,
        })?;
        let name = name.parse().map_err(|reason| StorePathError::Name {
            name: name.to_owned(),
            reason,
        })?;
        Ok(StorePath { hash, name })
    }

    pub fn hash(&self) -> &StorePathHash {
        &self.hash
    }

    pub fn name(&self) -> &StorePathName {
        &self.name
    }

    /// Whether this path names a derivation, decided by the `.drv` suffix.
    pub fn is_derivation(&self) -> bool {
        self.name.0.ends_with(".drv")
    }
}

impl FromStr for StorePath {
    type Err = StorePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorePath::from_base_name(s)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.hash, self.name)
    }
}

impl TryFrom<String> for StorePath {
    type Error = StorePathError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        StorePath::from_base_name(&value)
    }
}

impl From<StorePath> for String {
    fn from(value: StorePath) -> Self {
        value.to_string()
    }
}
