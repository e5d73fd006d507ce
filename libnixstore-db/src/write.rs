// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Schema creation and fixture writers, for tests only.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::SystemTime;

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::debug;

use crate::connection::StoreDb;
use crate::error::{Error, Result};
use crate::schema::SCHEMA_SQL;
use crate::types::system_time_to_unix;

/// Parameters for registering a new valid path.
#[derive(Debug, Clone)]
pub struct RegisterPathParams {
    /// Full store path
    pub path: String,
    /// NAR hash as `<algo>:<base16>`
    pub hash: String,
    pub registration_time: SystemTime,
    pub deriver: Option<String>,
    pub nar_size: Option<u64>,
    pub ultimate: bool,
    /// Space-separated signatures
    pub sigs: Option<String>,
    pub ca: Option<String>,
    /// Paths this references; they must already be registered
    pub references: BTreeSet<String>,
}

impl Default for RegisterPathParams {
    fn default() -> Self {
        Self {
            path: String::new(),
            hash: String::new(),
            registration_time: SystemTime::now(),
            deriver: None,
            nar_size: None,
            ultimate: false,
            sigs: None,
            ca: None,
            references: BTreeSet::new(),
        }
    }
}

impl StoreDb {
    /// Create a database file with the store schema.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(|source| Error::DatabaseOpen {
            path: path.to_owned(),
            source,
        })?;
        let db = Self { conn };
        db.create_schema()?;
        debug!("created store database at {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database with the store schema.
    pub fn open_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.create_schema()?;
        Ok(db)
    }

    fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Register a new valid path and its references.
    ///
    /// Returns the database ID of the new path.
    pub fn register_valid_path(&mut self, params: &RegisterPathParams) -> Result<i64> {
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO ValidPaths (path, hash, registrationTime, deriver, narSize, ultimate, sigs, ca)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                params.path,
                params.hash,
                system_time_to_unix(params.registration_time),
                params.deriver,
                params.nar_size.map(|n| n as i64),
                i32::from(params.ultimate),
                params.sigs,
                params.ca,
            ],
        )?;

        let id = tx.last_insert_rowid();

        for reference in &params.references {
            let ref_id: Option<i64> = if *reference == params.path {
                Some(id)
            } else {
                tx.query_row(
                    "SELECT id FROM ValidPaths WHERE path = ?1",
                    params![reference],
                    |row| row.get(0),
                )
                .optional()?
            };

            if let Some(ref_id) = ref_id {
                tx.execute(
                    "INSERT OR REPLACE INTO Refs (referrer, reference) VALUES (?1, ?2)",
                    params![id, ref_id],
                )?;
            }
        }

        tx.commit()?;
        Ok(id)
    }

    /// Record the path of a derivation output.
    pub fn register_derivation_output(
        &self,
        drv_path: &str,
        output_id: &str,
        output_path: &str,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO DerivationOutputs (drv, id, path)
            SELECT v.id, ?2, ?3
            FROM ValidPaths v
            WHERE v.path = ?1
            "#,
            params![drv_path, output_id, output_path],
        )?;
        Ok(())
    }
}
