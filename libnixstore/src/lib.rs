// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Read-only queries against a Nix store.
//!
//! The free functions in this crate work on the process-wide
//! [`StoreHandle`], which is opened from [`Settings::load`] on first use.
//! Every operation is also available as a method on [`StoreHandle`] for
//! callers that build their own handle, for example from explicit
//! [`Settings`] or around a custom [`Store`].
//!
//! Nothing is cached between calls: path info, validity and derivation
//! outputs are read from the store database each time.

pub mod build_log;
pub mod config;
mod derivation;
pub mod error;
pub mod nar_list;
pub mod path_info;
pub mod store;

#[cfg(test)]
mod testing;

use std::path::PathBuf;

use libnixstore_core::signature;
use libnixstore_core::signing::SigningKey;
use tracing::warn;

pub use build_log::{LogChain, LogSource, LogStore};
pub use config::Settings;
pub use error::{ConfigError, Error, IoErrorContext, Result};
pub use libnixstore_core::{Derivation, DerivedPath, StoreDir, StorePath};
pub use libnixstore_hash::{Algorithm, Hash, Radix};
pub use nar_list::{NarEntry, NarList};
pub use path_info::{PathInfo, ValidPathInfo};
pub use store::{LocalStore, Store, StoreHandle, StoreParams};

/// Open the shared store now instead of on first use.
pub fn init() -> Result<()> {
    StoreHandle::init()
}

/// Whether `path` is a registered store path. Never fails: a malformed path
/// or an unreachable store counts as not valid.
pub fn is_valid_path(path: &str) -> bool {
    match StoreHandle::get() {
        Ok(handle) => handle.is_valid_path(path),
        Err(e) => {
            warn!("cannot open store: {e}");
            false
        }
    }
}

/// The NAR hash of `path` as `<algo>:<base32>`.
pub fn query_path_hash(path: &str) -> Result<String> {
    StoreHandle::get()?.query_path_hash(path)
}

pub fn query_path_info(path: &str, radix: Radix) -> Result<PathInfo> {
    StoreHandle::get()?.query_path_info(path, radix)
}

/// The full path of the registered path with this hash part, if any.
pub fn query_path_from_hash_part(hash_part: &str) -> Result<Option<String>> {
    let handle = StoreHandle::get()?;
    Ok(handle
        .query_path_from_hash_part(hash_part)?
        .map(|path| handle.store_dir().display_path(&path)))
}

/// Re-encode a hash of `algorithm` given in any accepted form.
pub fn convert_hash(algorithm: &str, text: &str, radix: Radix) -> Result<String> {
    Ok(libnixstore_hash::convert_hash(algorithm, text, radix)?)
}

/// Sign `msg` with a secret key in `name:base64` form, returning
/// `name:base64-signature`.
pub fn sign_string(secret_key: &str, msg: &[u8]) -> Result<String> {
    Ok(SigningKey::parse(secret_key)?.sign_string(msg))
}

/// Check a detached Ed25519 signature given as raw bytes.
pub fn check_signature(public_key: &[u8], sig: &[u8], msg: &[u8]) -> Result<bool> {
    Ok(signature::check_signature(public_key, sig, msg)?)
}

pub fn derivation_from_path(drv_path: &str) -> Result<Derivation> {
    StoreHandle::get()?.derivation_from_path(drv_path)
}

/// The logical store directory. Does not open the store.
pub fn get_store_dir() -> StoreDir {
    if let Some(handle) = StoreHandle::try_get() {
        return handle.store_dir().clone();
    }
    configured_store_dir(Settings::load_without_keys())
}

/// The physical store directory. If the store cannot be opened it is taken
/// from the settings.
pub fn get_real_store_dir() -> PathBuf {
    match StoreHandle::get() {
        Ok(handle) => handle.real_store_dir().to_owned(),
        Err(e) => {
            warn!("cannot open store: {e}");
            configured_real_store_dir(Settings::load_without_keys())
        }
    }
}

fn configured_store_dir(settings: std::result::Result<Settings, ConfigError>) -> StoreDir {
    match settings {
        Ok(settings) => settings.store_dir,
        Err(e) => {
            warn!("cannot load settings, using the default store directory: {e}");
            StoreDir::default()
        }
    }
}

fn configured_real_store_dir(settings: std::result::Result<Settings, ConfigError>) -> PathBuf {
    match settings {
        Ok(settings) => settings
            .real_store_dir
            .unwrap_or_else(|| settings.store_dir.to_path().to_owned()),
        Err(e) => {
            warn!("cannot load settings, using the default store directory: {e}");
            StoreDir::default().to_path().to_owned()
        }
    }
}

pub fn get_build_log(path: &str) -> Result<Option<String>> {
    StoreHandle::get()?.get_build_log(path)
}

/// The recursive listing of `path` as `{"version":1,"root":...}` JSON.
pub fn get_nar_list(path: &str) -> Result<String> {
    let listing = StoreHandle::get()?.get_nar_list(path)?;
    Ok(serde_json::to_string(&listing)?)
}
