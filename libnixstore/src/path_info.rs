// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Path validity and metadata.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use libnixstore_core::fingerprint::fingerprint_path;
use libnixstore_core::signature::{NarSignature, PublicKey, verify_nar_signature};
use libnixstore_core::signing::SigningKey;
use libnixstore_core::{StoreDir, StorePath, StorePathHash};
use libnixstore_hash::{Hash, Radix};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::store::StoreHandle;

/// Everything the store records about a valid path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPathInfo {
    pub path: StorePath,
    pub deriver: Option<StorePath>,
    pub nar_hash: Hash,
    pub nar_size: u64,
    pub registration_time: SystemTime,
    pub references: BTreeSet<StorePath>,
    pub signatures: Vec<String>,
    pub content_address: Option<String>,
    /// Built locally rather than substituted.
    pub ultimate: bool,
}

impl ValidPathInfo {
    pub(crate) fn from_row(store_dir: &StoreDir, row: libnixstore_db::ValidPathInfo) -> Result<Self> {
        let corrupt = |reason: String| Error::CorruptEntry {
            path: row.path.clone(),
            reason,
        };
        let parse = |path: &str| store_dir.parse_path(path).map_err(|e| corrupt(e.to_string()));

        let references = row
            .references
            .iter()
            .map(|reference| parse(reference))
            .collect::<Result<BTreeSet<_>>>()?;

        Ok(ValidPathInfo {
            path: parse(&row.path)?,
            deriver: row.deriver().map(parse).transpose()?,
            nar_hash: Hash::parse_prefixed(&row.hash).map_err(|e| corrupt(e.to_string()))?,
            nar_size: row.nar_size.unwrap_or(0),
            registration_time: row.registration_time,
            references,
            signatures: row.signatures().into_iter().map(str::to_owned).collect(),
            content_address: row.content_address().map(str::to_owned),
            ultimate: row.ultimate,
        })
    }

    /// The message a signature over this path is made on.
    pub fn fingerprint(&self, store_dir: &StoreDir) -> Result<Vec<u8>> {
        Ok(fingerprint_path(
            store_dir,
            &self.path,
            &self.nar_hash,
            self.nar_size,
            &self.references,
        )?)
    }

    /// Sign the fingerprint with each key, in the order given.
    pub fn sign(&self, store_dir: &StoreDir, keys: &[SigningKey]) -> Result<Vec<NarSignature>> {
        let fingerprint = self.fingerprint(store_dir)?;
        Ok(keys.iter().map(|key| key.sign(&fingerprint)).collect())
    }

    /// The recorded signatures made by one of the `trusted` keys.
    pub fn trusted_signatures(
        &self,
        store_dir: &StoreDir,
        trusted: &[PublicKey],
    ) -> Result<Vec<NarSignature>> {
        let fingerprint = self.fingerprint(store_dir)?;
        Ok(self
            .signatures
            .iter()
            .filter_map(|text| match NarSignature::parse(text) {
                Ok(sig) => Some(sig),
                Err(e) => {
                    warn!("ignoring malformed signature on {}: {e}", self.path);
                    None
                }
            })
            .filter(|sig| verify_nar_signature(&fingerprint, sig, trusted))
            .collect())
    }

    /// The caller-facing record, with the NAR hash rendered in `radix`.
    pub fn render(&self, radix: Radix) -> PathInfo {
        PathInfo {
            deriver: self.deriver.clone(),
            nar_hash: self.nar_hash.render_prefixed(radix),
            registration_time: unix_time(self.registration_time),
            nar_size: self.nar_size,
            references: self.references.clone(),
            signatures: self.signatures.clone(),
            content_address: self.content_address.clone(),
        }
    }
}

fn unix_time(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Path metadata as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathInfo {
    pub deriver: Option<StorePath>,
    /// `<algo>:<digest>`
    pub nar_hash: String,
    /// Seconds since the Unix epoch.
    pub registration_time: i64,
    pub nar_size: u64,
    pub references: BTreeSet<StorePath>,
    pub signatures: Vec<String>,
    pub content_address: Option<String>,
}

impl StoreHandle {
    /// Whether `path` is a well-formed path in this store that is registered.
    /// Lookup failures are logged and count as not valid.
    pub fn is_valid_path(&self, path: &str) -> bool {
        let Ok(store_path) = self.parse_path(path) else {
            return false;
        };
        match self.store().is_valid_path(&store_path) {
            Ok(valid) => valid,
            Err(e) => {
                warn!("failed to check validity of {path}: {e}");
                false
            }
        }
    }

    pub fn query_valid_path_info(&self, path: &str) -> Result<ValidPathInfo> {
        let store_path = self.parse_path(path)?;
        self.store()
            .query_path_info(&store_path)?
            .ok_or_else(|| Error::NotRegistered(path.to_owned()))
    }

    pub fn query_path_info(&self, path: &str, radix: Radix) -> Result<PathInfo> {
        Ok(self.query_valid_path_info(path)?.render(radix))
    }

    /// The NAR hash as `<algo>:<base32>`.
    pub fn query_path_hash(&self, path: &str) -> Result<String> {
        Ok(self
            .query_valid_path_info(path)?
            .nar_hash
            .render_prefixed(Radix::Base32))
    }

    /// The registered path with the given hash part, if any. A string that
    /// cannot be a hash part matches nothing.
    pub fn query_path_from_hash_part(&self, hash_part: &str) -> Result<Option<StorePath>> {
        let hash: StorePathHash = match hash_part.parse() {
            Ok(hash) => hash,
            Err(e) => {
                debug!("not a store path hash part: {e}");
                return Ok(None);
            }
        };
        self.store().query_path_from_hash_part(&hash)
    }

    /// Sign `path` with every configured secret key.
    pub fn sign_path(&self, path: &str) -> Result<Vec<NarSignature>> {
        self.query_valid_path_info(path)?
            .sign(self.store_dir(), self.secret_keys())
    }
}
