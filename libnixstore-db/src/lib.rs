// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Read-only access to the Nix store's SQLite database.
//!
//! The database at `<state dir>/db/db.sqlite` records every valid store path
//! together with its NAR hash and size, registration time, deriver,
//! signatures, content address and references, plus the output paths of
//! registered derivations. This crate queries those tables; it never writes
//! to a live store.
//!
//! With the `test` feature the crate can also create a database with the
//! Nix schema and register fixture paths into it.
//!
//! # Example
//!
//! ```ignore
//! use libnixstore_db::StoreDb;
//!
//! let db = StoreDb::open_system_at("/nix/var/nix/db/db.sqlite")?;
//! if let Some(info) = db.query_path_info("/nix/store/...")? {
//!     println!("NAR size: {}", info.nar_size.unwrap_or(0));
//! }
//! ```

mod connection;
mod error;
mod query;
mod types;

#[cfg(any(test, feature = "test"))]
mod schema;
#[cfg(any(test, feature = "test"))]
mod write;


pub use connection::{OpenMode, StoreDb};
pub use error::{Error, Result};
pub use types::{DerivationOutput, ValidPathInfo};

#[cfg(any(test, feature = "test"))]
pub use write::RegisterPathParams;
