// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Database connection management.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{Error, Result};

/// How a database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only, sharing locks with a running Nix daemon so every query
    /// sees the current state of the store.
    ReadOnly,
    /// Read-only with SQLite's `immutable` flag. Needed when the database
    /// directory is not writable by the caller, at the price of not noticing
    /// concurrent writers.
    Immutable,
}

/// SQLite database connection for Nix store metadata.
pub struct StoreDb {
    pub(crate) conn: Connection,
}

impl std::fmt::Debug for StoreDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreDb")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl StoreDb {
    /// Open a store database for reading.
    ///
    /// Tries a regular read-only connection first and falls back to an
    /// immutable one when that cannot read the schema, which is what happens
    /// to unprivileged users of a multi-user install.
    pub fn open_system_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match Self::open(path, OpenMode::ReadOnly) {
            Ok(db) => Ok(db),
            Err(Error::DatabaseNotFound(path)) => Err(Error::DatabaseNotFound(path)),
            Err(err) => {
                debug!("read-only open of {} failed ({err}), retrying immutable", path.display());
                Self::open(path, OpenMode::Immutable)
            }
        }
    }

    /// Open an existing database file in the given mode and check that it
    /// carries the store schema.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DatabaseNotFound(path.to_owned()));
        }

        let open_err = |source| Error::DatabaseOpen {
            path: path.to_owned(),
            source,
        };
        let conn = match mode {
            OpenMode::ReadOnly => {
                Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
                    .map_err(open_err)?
            }
            OpenMode::Immutable => {
                let uri = format!("file:{}?immutable=1", path.display());
                Connection::open_with_flags(
                    &uri,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
                )
                .map_err(open_err)?
            }
        };

        let db = Self { conn };
        if !db.has_schema().map_err(|err| match err {
            Error::Sqlite(source) => open_err(source),
            other => other,
        })? {
            return Err(Error::MissingSchema(path.to_owned()));
        }

        debug!("opened store database at {} ({:?})", path.display(), mode);
        Ok(db)
    }

    /// Whether the `ValidPaths` table exists.
    pub(crate) fn has_schema(&self) -> Result<bool> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='ValidPaths'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
