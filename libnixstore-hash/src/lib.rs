// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Content hashes and their Nix text renderings.
//!
//! A [`Hash`] is an algorithm tag plus digest bytes. Nix prints digests either
//! as lowercase hex ("base16") or in its own base32 alphabet; parsing accepts
//! both, plus base64, an optional `<algo>:` prefix and the SRI form
//! `<algo>-<base64>`. Rendering never changes the algorithm or the digest.

use std::fmt;

use libnixstore_base_encoding::{Base, DecodeError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

mod algo;

pub use algo::{Algorithm, UnknownAlgorithm};

const LARGEST_ALGORITHM: Algorithm = Algorithm::LARGEST;

/// The two output encodings Nix uses when printing digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Radix {
    /// Lowercase hexadecimal.
    Base16,
    /// Nix base32, the encoding used for file names under the store directory.
    #[default]
    Base32,
}

impl Radix {
    pub fn from_base32_flag(base32: bool) -> Radix {
        if base32 { Radix::Base32 } else { Radix::Base16 }
    }

    fn base(self) -> Base {
        match self {
            Radix::Base16 => Base::Hex,
            Radix::Base32 => Base::NixBase32,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ParseHashError {
    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),

    #[error("hash '{hash}' has type '{actual}', expected '{expected}'")]
    TypeMismatch {
        hash: String,
        expected: Algorithm,
        actual: Algorithm,
    },

    #[error("hash '{hash}' has wrong length {length} for hash type '{algorithm}'")]
    WrongLength {
        hash: String,
        algorithm: Algorithm,
        length: usize,
    },

    #[error("hash '{hash}' is not valid {base}: {source}")]
    Decode {
        hash: String,
        base: Base,
        #[source]
        source: DecodeError,
    },

    #[error("hash '{0}' does not state its type")]
    MissingType(String),
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Hash {
    algorithm: Algorithm,
    data: [u8; LARGEST_ALGORITHM.size()],
}

impl Hash {
    /// Panics if `hash` is not exactly `algorithm.size()` bytes.
    pub const fn new(algorithm: Algorithm, hash: &[u8]) -> Hash {
        let mut data = [0u8; LARGEST_ALGORITHM.size()];
        let (hash_data, _postfix) = data.split_at_mut(algorithm.size());
        hash_data.copy_from_slice(hash);
        Hash { algorithm, data }
    }

    #[inline]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[inline]
    pub fn digest_bytes(&self) -> &[u8] {
        &self.data[0..(self.algorithm.size())]
    }

    /// Parse `text` as a hash of type `algorithm`.
    ///
    /// The digest may be base16, nix base32 or base64, optionally prefixed by
    /// `<algo>:`, or given as an SRI string `<algo>-<base64>`. A prefix naming
    /// a different algorithm is an error.
    pub fn parse(algorithm: Algorithm, text: &str) -> Result<Hash, ParseHashError> {
        if let Some((prefix, rest)) = split_type(text) {
            let (actual, sri) = prefix;
            if actual != algorithm {
                return Err(ParseHashError::TypeMismatch {
                    hash: text.to_owned(),
                    expected: algorithm,
                    actual,
                });
            }
            if sri {
                return decode_digest(algorithm, Base::Base64, text, rest);
            }
            return Self::parse_bare(algorithm, text, rest);
        }
        Self::parse_bare(algorithm, text, text)
    }

    /// Parse a hash that carries its own type, like `sha256:<digest>` or an
    /// SRI string. This is the form the store database records.
    pub fn parse_prefixed(text: &str) -> Result<Hash, ParseHashError> {
        match split_type(text) {
            Some(((algorithm, true), rest)) => {
                decode_digest(algorithm, Base::Base64, text, rest)
            }
            Some(((algorithm, false), rest)) => Self::parse_bare(algorithm, text, rest),
            None => match text.split_once(':') {
                Some((algo, _)) => Err(UnknownAlgorithm(algo.to_owned()).into()),
                None => Err(ParseHashError::MissingType(text.to_owned())),
            },
        }
    }

    fn parse_bare(algorithm: Algorithm, text: &str, digest: &str) -> Result<Hash, ParseHashError> {
        let base = Base::ALL
            .into_iter()
            .find(|base| base.encoded_len(algorithm.size()) == digest.len())
            .ok_or_else(|| ParseHashError::WrongLength {
                hash: text.to_owned(),
                algorithm,
                length: digest.len(),
            })?;
        decode_digest(algorithm, base, text, digest)
    }

    /// Render the digest without a type prefix.
    pub fn render(&self, radix: Radix) -> String {
        radix.base().encode(self.digest_bytes())
    }

    /// Render as `<algo>:<digest>`.
    pub fn render_prefixed(&self, radix: Radix) -> String {
        format!("{}:{}", self.algorithm, self.render(radix))
    }

    /// Render as an SRI string, `<algo>-<base64>`.
    pub fn to_sri(&self) -> String {
        format!("{}-{}", self.algorithm, Base::Base64.encode(self.digest_bytes()))
    }
}

/// Splits `<algo>:<rest>` or `<algo>-<rest>`; the flag is true for SRI form.
fn split_type(text: &str) -> Option<((Algorithm, bool), &str)> {
    if let Some((algo, rest)) = text.split_once(':') {
        return algo.parse().ok().map(|a| ((a, false), rest));
    }
    let (algo, rest) = text.split_once('-')?;
    algo.parse().ok().map(|a| ((a, true), rest))
}

fn decode_digest(
    algorithm: Algorithm,
    base: Base,
    text: &str,
    digest: &str,
) -> Result<Hash, ParseHashError> {
    let bytes = base
        .decode(digest.as_bytes(), algorithm.size())
        .map_err(|source| match source {
            DecodeError::Length { length, .. } => ParseHashError::WrongLength {
                hash: text.to_owned(),
                algorithm,
                length,
            },
            source => ParseHashError::Decode {
                hash: text.to_owned(),
                base,
                source,
            },
        })?;
    Ok(Hash::new(algorithm, &bytes))
}

/// Re-encode a hash given as text.
///
/// `algorithm` names the expected hash type; the result is bare (no prefix).
pub fn convert_hash(algorithm: &str, text: &str, to: Radix) -> Result<String, ParseHashError> {
    let algorithm: Algorithm = algorithm.parse()?;
    Ok(Hash::parse(algorithm, text)?.render(to))
}

impl std::ops::Deref for Hash {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.digest_bytes()
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        self.digest_bytes()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_prefixed(Radix::Base32))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash")
            .field(&self.render_prefixed(Radix::Base16))
            .finish()
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_sri())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash::parse_prefixed(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod unittests {
    use hex_literal::hex;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    /// value taken from: https://tools.ietf.org/html/rfc1321
    const MD5_ABC: Hash = Hash::new(Algorithm::MD5, &hex!("900150983cd24fb0d6963f7d28e17f72"));
    /// value taken from: https://tools.ietf.org/html/rfc3174
    const SHA1_ABC: Hash = Hash::new(
        Algorithm::SHA1,
        &hex!("a9993e364706816aba3e25717850c26c9cd0d89d"),
    );
    /// value taken from: https://tools.ietf.org/html/rfc4634
    const SHA256_ABC: Hash = Hash::new(
        Algorithm::SHA256,
        &hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"),
    );
    /// value taken from: https://tools.ietf.org/html/rfc4634
    const SHA512_ABC: Hash = Hash::new(
        Algorithm::SHA512,
        &hex!(
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        ),
    );

    #[rstest]
    #[case::md5(&MD5_ABC)]
    #[case::sha1(&SHA1_ABC)]
    #[case::sha256(&SHA256_ABC)]
    #[case::sha512(&SHA512_ABC)]
    fn digest_abc(#[case] expected: &Hash) {
        assert_eq!(expected.algorithm().digest("abc"), *expected);
    }

    #[rstest]
    #[case::md5("md5", Algorithm::MD5)]
    #[case::sha1_upper("SHA1", Algorithm::SHA1)]
    #[case::sha256_mixed("ShA256", Algorithm::SHA256)]
    #[case::sha512("sha512", Algorithm::SHA512)]
    fn algorithm_from_str(#[case] input: &str, #[case] expected: Algorithm) {
        assert_eq!(input.parse::<Algorithm>().unwrap(), expected);
    }

    #[test]
    fn unknown_algorithm() {
        assert_eq!(
            Err(UnknownAlgorithm("blake2".into())),
            "blake2".parse::<Algorithm>()
        );
        assert!(matches!(
            convert_hash("blake2", "00", Radix::Base16),
            Err(ParseHashError::UnknownAlgorithm(_))
        ));
    }

    #[rstest]
    #[case::base16("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")]
    #[case::base32("1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s")]
    #[case::base64("ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=")]
    #[case::prefixed_base16(
        "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    )]
    #[case::prefixed_base32("sha256:1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s")]
    #[case::sri("sha256-ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=")]
    fn parse_accepts_every_form(#[case] text: &str) {
        assert_eq!(Hash::parse(Algorithm::SHA256, text).unwrap(), SHA256_ABC);
    }

    #[test]
    fn parse_rejects_other_type_prefix() {
        let err = Hash::parse(
            Algorithm::SHA512,
            "sha256:1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ParseHashError::TypeMismatch {
                expected: Algorithm::SHA512,
                actual: Algorithm::SHA256,
                ..
            }
        ));
    }

    #[rstest]
    #[case::too_short("ba7816bf")]
    #[case::one_short("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015a")]
    fn parse_rejects_length(#[case] text: &str) {
        assert!(matches!(
            Hash::parse(Algorithm::SHA256, text),
            Err(ParseHashError::WrongLength { .. })
        ));
    }

    #[test]
    fn parse_rejects_bad_charset() {
        // right length for base32, but 'e' is not a nix base32 symbol
        let text = "eb8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s";
        assert!(matches!(
            Hash::parse(Algorithm::SHA256, text),
            Err(ParseHashError::Decode { .. })
        ));
    }

    #[test]
    fn parse_prefixed_requires_type() {
        assert_eq!(
            Hash::parse_prefixed(
                "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
            )
            .unwrap(),
            SHA256_ABC
        );
        assert!(matches!(
            Hash::parse_prefixed("1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s"),
            Err(ParseHashError::MissingType(_))
        ));
        assert!(matches!(
            Hash::parse_prefixed("blake2:00"),
            Err(ParseHashError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn convert_between_encodings() {
        let base32 = convert_hash(
            "sha256",
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
            Radix::Base32,
        )
        .unwrap();
        assert_eq!(base32, "1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s");
        let base16 = convert_hash("SHA256", &base32, Radix::Base16).unwrap();
        assert_eq!(
            base16,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn render_prefixed_and_sri() {
        assert_eq!(
            SHA256_ABC.render_prefixed(Radix::Base32),
            "sha256:1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s"
        );
        assert_eq!(
            SHA1_ABC.to_sri(),
            "sha1-qZk+NkcGgWq6PiVxeFDCbJzQ2J0="
        );
        assert_eq!(SHA256_ABC.to_string(), SHA256_ABC.render_prefixed(Radix::Base32));
    }

    #[test]
    fn serde_uses_sri() {
        let value = serde_json::to_value(SHA512_ABC).unwrap();
        assert!(value.as_str().unwrap().starts_with("sha512-"));
        let back: Hash = serde_json::from_value(value).unwrap();
        assert_eq!(back, SHA512_ABC);
    }

    fn any_hash() -> impl Strategy<Value = Hash> {
        (
            prop::sample::select(Algorithm::ALL.to_vec()),
            any::<Vec<u8>>(),
        )
            .prop_map(|(algorithm, data)| algorithm.digest(data))
    }

    proptest! {
        #[test]
        fn render_then_parse_is_identity(hash in any_hash(), base32 in any::<bool>()) {
            let radix = Radix::from_base32_flag(base32);
            let text = hash.render(radix);
            prop_assert_eq!(Hash::parse(hash.algorithm(), &text).unwrap(), hash);
            let prefixed = hash.render_prefixed(radix);
            prop_assert_eq!(Hash::parse_prefixed(&prefixed).unwrap(), hash);
        }
    }
}
