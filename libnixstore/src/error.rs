// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use libnixstore_aterm::ATermError;
use libnixstore_core::fingerprint::FingerprintError;
use libnixstore_core::signature::SignatureFormatError;
use libnixstore_core::signing::SigningError;
use libnixstore_core::store_path::StorePathError;
use libnixstore_hash::ParseHashError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid store path: {0}")]
    InvalidPath(#[from] StorePathError),

    #[error("Path '{0}' is not valid")]
    NotRegistered(String),

    #[error("Path '{0}' is not a derivation")]
    NotDerivation(String),

    #[error("Malformed hash: {0}")]
    MalformedHash(#[from] ParseHashError),

    #[error("Invalid signature input: {0}")]
    SignatureFormat(#[from] SignatureFormatError),

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] libnixstore_db::Error),

    #[error("Store database error: {0}")]
    Db(#[from] libnixstore_db::Error),

    #[error("Store database entry for '{path}' is malformed: {reason}")]
    CorruptEntry { path: String, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse derivation '{path}': {source}")]
    Derivation {
        path: String,
        #[source]
        source: ATermError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unsupported file type at '{}'", .0.display())]
    UnsupportedFileType(PathBuf),

    #[error("File name is not valid UTF-8: '{}'", .0.display())]
    NonUtf8Name(PathBuf),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error is about the path argument itself: malformed,
    /// unregistered, or not of the required kind.
    pub fn is_invalid_path(&self) -> bool {
        matches!(
            self,
            Error::InvalidPath(_) | Error::NotRegistered(_) | Error::NotDerivation(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid signing key: {reason}")]
    InvalidSigningKey { reason: String },

    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to IO errors
pub trait IoErrorContext<T> {
    fn io_context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> IoErrorContext<T> for std::result::Result<T, std::io::Error> {
    fn io_context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io {
            context: context.into(),
            source: e,
        })
    }
}
