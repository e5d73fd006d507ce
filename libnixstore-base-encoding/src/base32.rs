// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Nix base32.
//!
//! Nix encodes least significant bits first and then writes the symbols in
//! reverse, so the most significant symbol comes first. There is no padding.

use data_encoding::{BitOrder, DecodeError, DecodePartial, Encoding, Specification};
use std::sync::LazyLock;

/// The 32-character alphabet used by Nix (omits `e`, `o`, `t` and `u`).
pub const ALPHABET: &str = "0123456789abcdfghijklmnpqrsvwxyz";

static NIX_BASE32: LazyLock<Encoding> = LazyLock::new(|| {
    let mut spec = Specification::new();
    spec.symbols.push_str(ALPHABET);
    spec.bit_order = BitOrder::LeastSignificantFirst;
    spec.encoding()
        .unwrap_or_else(|err| unreachable!("nix base32 specification is valid: {err}"))
});

pub const fn encode_len(len: usize) -> usize {
    (8 * len).div_ceil(5)
}

/// Whether `c` is a symbol of the nix base32 alphabet.
pub fn is_valid_symbol(c: u8) -> bool {
    ALPHABET.as_bytes().contains(&c)
}

pub fn encode_string(input: &[u8]) -> String {
    NIX_BASE32.encode(input).chars().rev().collect()
}

pub fn encode_mut(input: &[u8], output: &mut [u8]) {
    NIX_BASE32.encode_mut(input, output);
    output.reverse();
}

/// Decode `input` into `output`, which must be exactly `5 * input.len() / 8` bytes.
pub fn decode_mut(input: &[u8], output: &mut [u8]) -> Result<usize, DecodePartial> {
    let reversed: Vec<u8> = input.iter().rev().copied().collect();
    NIX_BASE32.decode_mut(&reversed, output).map_err(|err| {
        // report positions in terms of the caller's (unreversed) input
        let position = input.len() - err.error.position - 1;
        DecodePartial {
            read: position / 8 * 8,
            written: position / 8 * 5,
            error: DecodeError {
                position,
                kind: err.error.kind,
            },
        }
    })
}
