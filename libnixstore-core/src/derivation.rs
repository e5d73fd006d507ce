// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use serde::Serialize;

use crate::derived_path::OutputName;
use crate::store_path::StorePath;

/// A build recipe as read back from a `.drv` file.
///
/// Outputs keep the order in which the derivation declares them. An output
/// without a known path (floating or deferred content addressing that has not
/// been built) is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Derivation {
    pub outputs: Vec<(OutputName, Option<StorePath>)>,
    pub input_derivations: BTreeSet<StorePath>,
    pub input_sources: BTreeSet<StorePath>,
    pub platform: String,
    pub builder: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}
