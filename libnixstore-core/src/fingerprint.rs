// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use libnixstore_hash::{Algorithm, Hash, Radix};
use thiserror::Error;

use crate::store_path::{StoreDir, StorePath};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("NAR hash must be a sha256 hash, got {0}")]
    NarHashAlgorithm(Algorithm),
}

/// Generate the message that is signed to vouch for a store path.
///
/// The fingerprint format is:
/// `1;<store-path>;sha256:<base32 nar-hash>;<nar-size>;<comma-separated-references>`
///
/// All paths are absolute. References come out in the set's order, which is
/// the order of their file names.
pub fn fingerprint_path(
    store_dir: &StoreDir,
    store_path: &StorePath,
    nar_hash: &Hash,
    nar_size: u64,
    references: &BTreeSet<StorePath>,
) -> Result<Vec<u8>, FingerprintError> {
    if nar_hash.algorithm() != Algorithm::SHA256 {
        return Err(FingerprintError::NarHashAlgorithm(nar_hash.algorithm()));
    }
    let references: Vec<String> = references
        .iter()
        .map(|reference| store_dir.display_path(reference))
        .collect();
    Ok(format!(
        "1;{};{};{};{}",
        store_dir.display_path(store_path),
        nar_hash.render_prefixed(Radix::Base32),
        nar_size,
        references.join(",")
    )
    .into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha256(text: &str) -> Hash {
        Hash::parse(Algorithm::SHA256, text).unwrap()
    }

    #[test]
    fn fingerprint_basic() {
        let store_path: StorePath = "syd87l2rxw8cbsxmxl853h0r6pdwhwjr-curl-7.82.0-bin".parse().unwrap();
        let nar_hash = sha256("sha256:1b4sb93wp679q4zx9k1ignby1yna3z7c4c2ri3wphylbc2dwsys0");
        let references: BTreeSet<StorePath> = [
            "5dq2jj6d7k197p6fzqn8l5n0jfmhxmcg-glibc-2.33-59".parse().unwrap(),
            "0jqd0rlxzra1rs38rdxl43yh6rxchgc6-curl-7.82.0".parse().unwrap(),
        ]
        .into();

        let fingerprint = fingerprint_path(
            &StoreDir::default(),
            &store_path,
            &nar_hash,
            196040,
            &references,
        )
        .unwrap();
        let expected = b"1;/nix/store/syd87l2rxw8cbsxmxl853h0r6pdwhwjr-curl-7.82.0-bin;sha256:1b4sb93wp679q4zx9k1ignby1yna3z7c4c2ri3wphylbc2dwsys0;196040;/nix/store/0jqd0rlxzra1rs38rdxl43yh6rxchgc6-curl-7.82.0,/nix/store/5dq2jj6d7k197p6fzqn8l5n0jfmhxmcg-glibc-2.33-59";
        assert_eq!(fingerprint, expected);
    }

    #[test]
    fn fingerprint_no_references() {
        let store_path: StorePath = "26xbg1ndr7hbcncrlf9nhx5is2b25d13-hello-2.12.1".parse().unwrap();
        let nar_hash = sha256("1mkvday29m2qxg1fnbv8xh9s6151bh8a2xzhh0k86j7lqhyfwibh");

        let fingerprint = fingerprint_path(
            &StoreDir::default(),
            &store_path,
            &nar_hash,
            226560,
            &BTreeSet::new(),
        )
        .unwrap();
        let expected = b"1;/nix/store/26xbg1ndr7hbcncrlf9nhx5is2b25d13-hello-2.12.1;sha256:1mkvday29m2qxg1fnbv8xh9s6151bh8a2xzhh0k86j7lqhyfwibh;226560;";
        assert_eq!(fingerprint, expected);
    }

    #[test]
    fn fingerprint_requires_sha256() {
        let store_path: StorePath = "26xbg1ndr7hbcncrlf9nhx5is2b25d13-hello-2.12.1".parse().unwrap();
        let result = fingerprint_path(
            &StoreDir::default(),
            &store_path,
            &Algorithm::SHA512.digest("abc"),
            100,
            &BTreeSet::new(),
        );
        assert_eq!(
            result,
            Err(FingerprintError::NarHashAlgorithm(Algorithm::SHA512))
        );
    }
}
