// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

use std::path::Path;

use base64::{Engine, engine::general_purpose};
use ed25519_dalek::{Signer, SigningKey as DalekSigningKey};
use thiserror::Error;

use crate::signature::{NarSignature, PublicKey, Signature};

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("failed to read signing key file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode base64: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("failed to parse signing key: {0}")]
    ParseKey(&'static str),

    #[error("invalid signing key length: expected 32 or 64 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("invalid Ed25519 keypair: {0}")]
    Keypair(#[source] ed25519_dalek::SignatureError),
}

/// A named Ed25519 secret key.
#[derive(Clone, Debug)]
pub struct SigningKey {
    /// The name of the key (e.g., "cache.example.com-1")
    pub name: String,
    key: DalekSigningKey,
}

impl SigningKey {
    /// Parse a secret key file.
    pub fn from_file(path: &Path) -> Result<Self, SigningError> {
        let content = std::fs::read_to_string(path).map_err(|source| SigningError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse `name:base64-key`, where the key is either a 32 byte seed or a
    /// 64 byte keypair (seed followed by the public key).
    pub fn parse(s: &str) -> Result<Self, SigningError> {
        let (name, key_base64) = s
            .split_once(':')
            .ok_or(SigningError::ParseKey("sign key does not contain a ':'"))?;
        if name.is_empty() {
            return Err(SigningError::ParseKey("empty key name"));
        }

        let key = general_purpose::STANDARD.decode(key_base64.trim())?;
        let key = if let Ok(seed) = <[u8; 32]>::try_from(key.as_slice()) {
            DalekSigningKey::from_bytes(&seed)
        } else if let Ok(keypair) = <[u8; 64]>::try_from(key.as_slice()) {
            DalekSigningKey::from_keypair_bytes(&keypair).map_err(SigningError::Keypair)?
        } else {
            return Err(SigningError::InvalidKeyLength(key.len()));
        };

        Ok(Self {
            name: name.to_owned(),
            key,
        })
    }

    pub fn to_public_key(&self) -> PublicKey {
        PublicKey {
            name: self.name.clone(),
            key: self.key.verifying_key(),
        }
    }

    pub fn sign(&self, msg: &[u8]) -> NarSignature {
        let sig = Signature::from(self.key.sign(msg));
        NarSignature::new(self.name.clone(), sig)
    }

    /// Sign a message and return `name:base64-signature`.
    pub fn sign_string(&self, msg: &[u8]) -> String {
        self.sign(msg).to_text()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::io::Write as _;

    use libnixstore_hash::{Algorithm, Hash};

    use super::*;
    use crate::fingerprint::fingerprint_path;
    use crate::signature::{check_signature, verify_nar_signature};
    use crate::store_path::{StoreDir, StorePath};

    const ZERO_SEED: &str = "test-key:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

    #[test]
    fn parse_seed() {
        let key = SigningKey::parse(ZERO_SEED).unwrap();
        assert_eq!(key.name, "test-key");
    }

    #[test]
    fn keypair_and_seed_sign_alike() {
        let seed = SigningKey::parse(ZERO_SEED).unwrap();
        let mut keypair = seed.key.to_bytes().to_vec();
        keypair.extend_from_slice(seed.key.verifying_key().as_bytes());
        let text = format!("test-key:{}", general_purpose::STANDARD.encode(&keypair));
        let from_keypair = SigningKey::parse(&text).unwrap();
        assert_eq!(seed.sign_string(b"msg"), from_keypair.sign_string(b"msg"));
    }

    #[test]
    fn keypair_with_wrong_public_half() {
        let mut keypair = vec![0u8; 64];
        keypair[63] = 1;
        let text = format!("k:{}", general_purpose::STANDARD.encode(&keypair));
        assert!(matches!(
            SigningKey::parse(&text),
            Err(SigningError::Keypair(_))
        ));
    }

    #[test]
    fn sign_is_deterministic_and_verifies() {
        let key = SigningKey::parse(ZERO_SEED).unwrap();
        let msg = b"Hello, world!";
        let signature = key.sign_string(msg);
        assert_eq!(signature, key.sign_string(msg));
        assert!(signature.starts_with("test-key:"));

        let nar_sig = NarSignature::parse(&signature).unwrap();
        let public = key.to_public_key();
        assert!(
            check_signature(public.key.as_bytes(), &nar_sig.sig.to_bytes(), msg).unwrap()
        );
        assert!(
            !check_signature(public.key.as_bytes(), &nar_sig.sig.to_bytes(), b"other").unwrap()
        );
    }

    #[test]
    fn sign_fingerprint() {
        let key = SigningKey::parse(
            "cache.example.com-1:zFD7RJEU40VJzJvgT7h5xQwFm8FufXKH2CJPaKvh/xo=",
        )
        .unwrap();

        let store_dir = StoreDir::default();
        let path: StorePath = "26xbg1ndr7hbcncrlf9nhx5is2b25d13-hello-2.12.1".parse().unwrap();
        let references: BTreeSet<StorePath> = [
            path.clone(),
            "sl141d1g77wvhr050ah87lcyz2czdxa3-glibc-2.40-36".parse().unwrap(),
        ]
        .into();
        let fingerprint = fingerprint_path(
            &store_dir,
            &path,
            &Hash::parse(
                Algorithm::SHA256,
                "sha256:1mkvday29m2qxg1fnbv8xh9s6151bh8a2xzhh0k86j7lqhyfwibh",
            )
            .unwrap(),
            226560,
            &references,
        )
        .unwrap();

        let sig = key.sign(&fingerprint);
        assert_eq!(sig.key_name, "cache.example.com-1");
        assert!(verify_nar_signature(&fingerprint, &sig, &[key.to_public_key()]));

        let mut renamed = key.to_public_key();
        renamed.name = "other-1".into();
        assert!(!verify_nar_signature(&fingerprint, &sig, &[renamed]));
    }

    #[test]
    fn invalid_key_format() {
        assert!(SigningKey::parse("no-colon").is_err());
        assert!(SigningKey::parse(":no-name").is_err());
        assert!(SigningKey::parse("name:invalid-base64!!!").is_err());
        assert!(matches!(
            SigningKey::parse("name:AAAA"),
            Err(SigningError::InvalidKeyLength(3))
        ));
    }

    #[test]
    fn from_file_trims_newline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{ZERO_SEED}").unwrap();
        let key = SigningKey::from_file(file.path()).unwrap();
        assert_eq!(key.name, "test-key");
    }

    #[test]
    fn from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SigningKey::from_file(&dir.path().join("absent.key")),
            Err(SigningError::Io { .. })
        ));
    }
}
