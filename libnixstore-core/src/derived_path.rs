// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use serde::Serialize;

use crate::store_path::{StoreDir, StorePath};

pub type OutputName = String;

/// How a store path is addressed when asking a store for things built from it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum DerivedPath {
    /// A plain artifact.
    Opaque { path: StorePath },
    /// A derivation together with the outputs it declares.
    Built {
        drv_path: StorePath,
        outputs: BTreeSet<OutputName>,
    },
}

impl DerivedPath {
    /// The store path a log lookup is keyed on: the artifact for opaque
    /// paths, the derivation for built ones.
    pub fn store_path(&self) -> &StorePath {
        match self {
            DerivedPath::Opaque { path } => path,
            DerivedPath::Built { drv_path, .. } => drv_path,
        }
    }

    /// Render in the `<drv>^<out1>,<out2>` syntax Nix uses on the command line.
    pub fn to_string_in(&self, store_dir: &StoreDir) -> String {
        match self {
            DerivedPath::Opaque { path } => store_dir.display_path(path),
            DerivedPath::Built { drv_path, outputs } => {
                let outputs: Vec<&str> = outputs.iter().map(String::as_str).collect();
                format!("{}^{}", store_dir.display_path(drv_path), outputs.join(","))
            }
        }
    }
}
