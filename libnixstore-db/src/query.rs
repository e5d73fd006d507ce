// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Read query operations for the store database.

use std::collections::BTreeSet;

use rusqlite::{OptionalExtension, params};

use crate::connection::StoreDb;
use crate::error::Result;
use crate::types::{DerivationOutput, ValidPathInfo, unix_to_system_time};

impl StoreDb {
    /// Query path info by full store path.
    ///
    /// Returns `None` if the path is not in the database.
    pub fn query_path_info(&self, path: &str) -> Result<Option<ValidPathInfo>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT id, path, hash, registrationTime, deriver, narSize, ultimate, sigs, ca
            FROM ValidPaths
            WHERE path = ?1
            "#,
        )?;

        let info = stmt
            .query_row(params![path], |row| {
                Ok(ValidPathInfo {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    hash: row.get(2)?,
                    registration_time: unix_to_system_time(row.get(3)?),
                    deriver: row.get(4)?,
                    nar_size: row.get::<_, Option<i64>>(5)?.map(|n| n as u64),
                    ultimate: row.get::<_, Option<i32>>(6)?.unwrap_or(0) != 0,
                    sigs: row.get(7)?,
                    ca: row.get(8)?,
                    references: BTreeSet::new(),
                })
            })
            .optional()?;

        match info {
            Some(mut info) => {
                info.references = self.query_references_by_id(info.id)?;
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    /// Look up a store path by its hash part (the 32-character prefix).
    ///
    /// The `store_dir` should be the store directory (e.g., "/nix/store").
    pub fn query_path_from_hash_part(
        &self,
        store_dir: &str,
        hash_part: &str,
    ) -> Result<Option<String>> {
        let prefix = format!("{store_dir}/{hash_part}");

        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT path FROM ValidPaths WHERE path >= ?1 LIMIT 1
            "#,
        )?;

        let result: Option<String> = stmt
            .query_row(params![&prefix], |row| row.get(0))
            .optional()?;

        // the first path sorting after the prefix may belong to another hash
        Ok(result.filter(|path| path.starts_with(&prefix)))
    }

    /// Check if a store path is valid (exists in the database).
    pub fn is_valid_path(&self, path: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT 1 FROM ValidPaths WHERE path = ?1 LIMIT 1
            "#,
        )?;

        Ok(stmt.query_row(params![path], |_| Ok(())).optional()?.is_some())
    }

    fn query_references_by_id(&self, id: i64) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT v.path
            FROM Refs r
            JOIN ValidPaths v ON r.reference = v.id
            WHERE r.referrer = ?1
            "#,
        )?;

        let mut refs = BTreeSet::new();
        let mut rows = stmt.query(params![id])?;
        while let Some(row) = rows.next()? {
            refs.insert(row.get(0)?);
        }
        Ok(refs)
    }

    /// Get the recorded outputs of a derivation, ordered by output name.
    pub fn query_derivation_outputs(&self, drv_path: &str) -> Result<Vec<DerivationOutput>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT d.id, d.path
            FROM DerivationOutputs d
            JOIN ValidPaths v ON d.drv = v.id
            WHERE v.path = ?1
            ORDER BY d.id
            "#,
        )?;

        let mut outputs = Vec::new();
        let mut rows = stmt.query(params![drv_path])?;
        while let Some(row) = rows.next()? {
            outputs.push(DerivationOutput {
                output_id: row.get(0)?,
                path: row.get(1)?,
            });
        }
        Ok(outputs)
    }
}
