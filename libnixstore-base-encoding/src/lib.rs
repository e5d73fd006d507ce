// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Text encodings used for digests in the Nix store.
//!
//! Nix renders digests in three encodings: lowercase hex ("base16"), its own
//! 32-symbol alphabet ("nix base32", used for store path hash parts and
//! narinfo hashes) and standard padded base64 (used in SRI strings and
//! signatures).

pub mod base32;

use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};
use thiserror::Error;

/// A textual encoding for digest bytes.
#[derive(derive_more::Display, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Base {
    #[display("base16")]
    Hex,
    #[display("nixbase32")]
    NixBase32,
    #[display("base64")]
    Base64,
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("invalid {base} length {length}, expected {expected}")]
    Length {
        base: Base,
        length: usize,
        expected: usize,
    },
    #[error("invalid {base} symbol at position {position}")]
    Symbol { base: Base, position: usize },
    #[error("non-zero trailing bits in {base} input")]
    Trailing { base: Base },
}

impl Base {
    pub const ALL: [Base; 3] = [Base::Hex, Base::NixBase32, Base::Base64];

    /// Length of the text form of `decoded_size` bytes.
    #[inline]
    pub const fn encoded_len(&self, decoded_size: usize) -> usize {
        match self {
            Base::Hex => decoded_size * 2,
            Base::NixBase32 => base32::encode_len(decoded_size),
            Base::Base64 => decoded_size.div_ceil(3) * 4,
        }
    }

    pub fn encode(&self, input: &[u8]) -> String {
        match self {
            Base::Hex => data_encoding::HEXLOWER.encode(input),
            Base::NixBase32 => base32::encode_string(input),
            Base::Base64 => BASE64.encode(input),
        }
    }

    /// Decode `input` which must encode exactly `decoded_size` bytes.
    pub fn decode(&self, input: &[u8], decoded_size: usize) -> Result<Vec<u8>, DecodeError> {
        let expected = self.encoded_len(decoded_size);
        if input.len() != expected {
            return Err(DecodeError::Length {
                base: *self,
                length: input.len(),
                expected,
            });
        }
        let mut output = vec![0u8; decoded_size];
        let res = match self {
            Base::Hex => HEXLOWER_PERMISSIVE.decode_mut(input, &mut output),
            Base::NixBase32 => base32::decode_mut(input, &mut output),
            Base::Base64 => {
                // padded base64 may decode into a slightly larger scratch buffer
                let mut scratch = vec![0u8; BASE64.decode_len(input.len()).unwrap_or(0)];
                match BASE64.decode_mut(input, &mut scratch) {
                    Ok(written) if written == decoded_size => {
                        output.copy_from_slice(&scratch[..written]);
                        Ok(written)
                    }
                    Ok(written) => {
                        return Err(DecodeError::Length {
                            base: *self,
                            length: written,
                            expected: decoded_size,
                        });
                    }
                    Err(err) => Err(err),
                }
            }
        };
        res.map_err(|partial| match partial.error.kind {
            data_encoding::DecodeKind::Trailing => DecodeError::Trailing { base: *self },
            _ => DecodeError::Symbol {
                base: *self,
                position: partial.error.position,
            },
        })?;
        Ok(output)
    }
}
