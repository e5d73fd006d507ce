// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Ed25519 detached signatures and the `name:base64` text forms Nix uses for
//! signatures and public keys.

use std::fmt;

use base64::{Engine, engine::general_purpose};
use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey};
use thiserror::Error;

pub const PUBLIC_KEY_LENGTH: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;
pub const SIGNATURE_LENGTH: usize = ed25519_dalek::SIGNATURE_LENGTH;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("failed to decode base64: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("invalid signature format: {0}")]
    InvalidFormat(&'static str),

    #[error(transparent)]
    Length(#[from] SignatureFormatError),

    #[error("invalid Ed25519 public key: {0}")]
    PublicKey(#[source] ed25519_dalek::SignatureError),
}

/// Raw key or signature material of the wrong size.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFormatError {
    #[error("public key is {0} bytes, expected {PUBLIC_KEY_LENGTH}")]
    PublicKeyLength(usize),
    #[error("signature is {0} bytes, expected {SIGNATURE_LENGTH}")]
    SignatureLength(usize),
}

/// Check a detached Ed25519 signature over `message`.
///
/// Sizes are validated before any cryptography runs. A public key that is the
/// right size but not a valid curve point cannot have produced the signature,
/// so it verifies as `false` rather than failing.
pub fn check_signature(
    public_key: &[u8],
    signature: &[u8],
    message: &[u8],
) -> Result<bool, SignatureFormatError> {
    let public_key: &[u8; PUBLIC_KEY_LENGTH] = public_key
        .try_into()
        .map_err(|_| SignatureFormatError::PublicKeyLength(public_key.len()))?;
    let signature: &[u8; SIGNATURE_LENGTH] = signature
        .try_into()
        .map_err(|_| SignatureFormatError::SignatureLength(signature.len()))?;
    let Ok(key) = VerifyingKey::from_bytes(public_key) else {
        return Ok(false);
    };
    let signature = Ed25519Signature::from_bytes(signature);
    Ok(key.verify(message, &signature).is_ok())
}

/// A newtype wrapper around an Ed25519 signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature(Ed25519Signature);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureFormatError> {
        let bytes: &[u8; SIGNATURE_LENGTH] = bytes
            .try_into()
            .map_err(|_| SignatureFormatError::SignatureLength(bytes.len()))?;
        Ok(Signature(Ed25519Signature::from_bytes(bytes)))
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        self.0.to_bytes()
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(s: &str) -> Result<Self, SignatureError> {
        let bytes = general_purpose::STANDARD.decode(s.trim())?;
        Ok(Self::from_bytes(&bytes)?)
    }
}

impl From<Ed25519Signature> for Signature {
    fn from(value: Ed25519Signature) -> Self {
        Signature(value)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

/// Split `name:payload`, rejecting an empty name.
fn split_named(text: &str) -> Result<(&str, &str), SignatureError> {
    let (name, payload) = text
        .split_once(':')
        .ok_or(SignatureError::InvalidFormat("missing ':' separator"))?;
    if name.is_empty() {
        return Err(SignatureError::InvalidFormat("empty key name"));
    }
    Ok((name, payload))
}

/// A signature tagged with the name of the key that produced it, as stored in
/// path info and narinfo files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarSignature {
    /// The name of the key, e.g. `cache.nixos.org-1`
    pub key_name: String,
    pub sig: Signature,
}

impl NarSignature {
    pub fn new(key_name: impl Into<String>, sig: Signature) -> Self {
        Self {
            key_name: key_name.into(),
            sig,
        }
    }

    /// The Nix text format: `key-name:base64-signature`
    pub fn to_text(&self) -> String {
        format!("{}:{}", self.key_name, self.sig.to_base64())
    }

    pub fn parse(text: &str) -> Result<Self, SignatureError> {
        let (key_name, sig) = split_named(text)?;
        Ok(Self::new(key_name, Signature::from_base64(sig)?))
    }
}

impl fmt::Display for NarSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// A named Ed25519 public key, `name:base64-key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    pub name: String,
    pub key: VerifyingKey,
}

impl PublicKey {
    pub fn parse(text: &str) -> Result<Self, SignatureError> {
        let (name, key) = split_named(text)?;
        let bytes = general_purpose::STANDARD.decode(key.trim())?;
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| SignatureFormatError::PublicKeyLength(bytes.len()))?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(SignatureError::PublicKey)?;
        Ok(PublicKey {
            name: name.to_owned(),
            key,
        })
    }

    pub fn to_text(&self) -> String {
        format!(
            "{}:{}",
            self.name,
            general_purpose::STANDARD.encode(self.key.as_bytes())
        )
    }

    pub fn verify(&self, message: &[u8], sig: &Signature) -> bool {
        self.key.verify(message, &sig.0).is_ok()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Whether `sig` was made over `fingerprint` by one of the `trusted` keys.
/// Only a key with the same name as the signature is consulted.
pub fn verify_nar_signature(fingerprint: &[u8], sig: &NarSignature, trusted: &[PublicKey]) -> bool {
    trusted
        .iter()
        .filter(|key| key.name == sig.key_name)
        .any(|key| key.verify(fingerprint, &sig.sig))
}

#[cfg(test)]
mod unittests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn signature_base64_roundtrip() {
        let sig = Signature::from_bytes(&[42u8; SIGNATURE_LENGTH]).unwrap();
        let sig2 = Signature::from_base64(&sig.to_base64()).unwrap();
        assert_eq!(sig, sig2);
    }

    #[test]
    fn nar_signature_parse() {
        let text = "cache.example.com-1:6wzr1QlOPHG+knFuJIaw+85Z5ivwbdI512JikexG+nQ7JDSZM2hw8zzlcLrguzoLEpCA9VzaEEQflZEHVwy9AA==";
        let nar_sig = NarSignature::parse(text).unwrap();
        assert_eq!(nar_sig.key_name, "cache.example.com-1");
        assert_eq!(nar_sig.to_text(), text);
    }

    #[rstest]
    #[case::no_colon("cache.example.com-1")]
    #[case::empty_name(":AAAA")]
    #[case::bad_base64("name:not base64!")]
    #[case::short("name:AAAA")]
    fn nar_signature_rejects(#[case] text: &str) {
        assert!(NarSignature::parse(text).is_err());
    }

    #[test]
    fn public_key_parse() {
        let text = "cache.nixos.org-1:6NCHdD59X431o0gWypbMrAURkbJ16ZPMQFGspcDShjY=";
        let key = PublicKey::parse(text).unwrap();
        assert_eq!(key.name, "cache.nixos.org-1");
        assert_eq!(key.to_text(), text);
    }

    #[rstest]
    #[case::short_key(&[0u8; 31], &[0u8; 64], SignatureFormatError::PublicKeyLength(31))]
    #[case::long_key(&[0u8; 33], &[0u8; 64], SignatureFormatError::PublicKeyLength(33))]
    #[case::short_sig(&[0u8; 32], &[0u8; 63], SignatureFormatError::SignatureLength(63))]
    #[case::long_sig(&[0u8; 32], &[0u8; 65], SignatureFormatError::SignatureLength(65))]
    #[case::empty(&[], &[], SignatureFormatError::PublicKeyLength(0))]
    fn check_signature_lengths(
        #[case] key: &[u8],
        #[case] sig: &[u8],
        #[case] expected: SignatureFormatError,
    ) {
        let messages: [&[u8]; 3] = [b"", b"hello", &[0xff; 1024]];
        for message in messages {
            assert_eq!(check_signature(key, sig, message), Err(expected));
        }
    }
}
