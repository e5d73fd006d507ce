// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Core Nix store types.
//!
//! Everything in this crate is a pure value: store directories and store
//! paths, the derived-path addressing form, the derivation record returned by
//! inspection, and the Ed25519 signature types used to establish trust in
//! store contents. No filesystem or database access happens here.

pub mod derivation;
pub mod derived_path;
pub mod fingerprint;
pub mod signature;
pub mod signing;
pub mod store_path;

pub use derivation::Derivation;
pub use derived_path::{DerivedPath, OutputName};
pub use store_path::{StoreDir, StorePath, StorePathHash, StorePathName};
