// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use libnixstore_aterm::ParsedDerivation;
use libnixstore_core::{Derivation, StorePath};
use tracing::debug;

use crate::error::{Error, IoErrorContext, Result};
use crate::store::StoreHandle;

impl StoreHandle {
    /// Read the registered derivation at `drv_path`.
    pub fn derivation_from_path(&self, drv_path: &str) -> Result<Derivation> {
        let drv_path = self.parse_path(drv_path)?;
        self.read_derivation(&drv_path)
    }

    /// Read a derivation, filling in output paths the file leaves open from
    /// the store's record of built outputs.
    pub fn read_derivation(&self, drv_path: &StorePath) -> Result<Derivation> {
        let parsed = self.parse_derivation_file(drv_path)?;

        let recorded = if parsed.outputs.iter().any(|(_, output)| output.path.is_none()) {
            self.store().query_derivation_outputs(drv_path)?
        } else {
            BTreeMap::new()
        };
        Ok(parsed.into_derivation(|name| recorded.get(name).cloned()))
    }

    /// Parse the `.drv` file of a registered derivation.
    pub(crate) fn parse_derivation_file(&self, drv_path: &StorePath) -> Result<ParsedDerivation> {
        let display = self.store_dir().display_path(drv_path);
        if !drv_path.is_derivation() {
            return Err(Error::NotDerivation(display));
        }
        self.ensure_valid(drv_path)?;

        let file = self.real_path(drv_path);
        debug!("reading derivation {}", file.display());
        let text = std::fs::read_to_string(&file)
            .io_context(format!("Failed to read derivation {}", file.display()))?;
        libnixstore_aterm::parse(self.store_dir(), &text).map_err(|source| Error::Derivation {
            path: display,
            source,
        })
    }
}
