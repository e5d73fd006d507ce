// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Database row types for Nix store metadata.

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A row of the ValidPaths table together with its references.
///
/// Paths are absolute, exactly as Nix stores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPathInfo {
    pub id: i64,
    pub path: String,
    /// NAR hash as `<algo>:<base16>`
    pub hash: String,
    pub registration_time: SystemTime,
    pub deriver: Option<String>,
    pub nar_size: Option<u64>,
    /// Whether the path was built locally rather than substituted
    pub ultimate: bool,
    /// Space-separated signatures
    pub sigs: Option<String>,
    pub ca: Option<String>,
    pub references: BTreeSet<String>,
}

impl ValidPathInfo {
    /// Signatures in the order they are recorded.
    pub fn signatures(&self) -> Vec<&str> {
        self.sigs
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// The content address, if one is recorded.
    pub fn content_address(&self) -> Option<&str> {
        self.ca.as_deref().filter(|ca| !ca.is_empty())
    }

    /// The deriver, if one is recorded.
    pub fn deriver(&self) -> Option<&str> {
        self.deriver.as_deref().filter(|d| !d.is_empty())
    }
}

/// A row of the DerivationOutputs table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationOutput {
    /// Symbolic output name (usually "out")
    pub output_id: String,
    pub path: String,
}

pub(crate) fn unix_to_system_time(timestamp: i64) -> SystemTime {
    if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp.unsigned_abs())
    } else {
        UNIX_EPOCH - Duration::from_secs(timestamp.unsigned_abs())
    }
}

#[cfg(any(test, feature = "test"))]
pub(crate) fn system_time_to_unix(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn info(sigs: Option<&str>, ca: Option<&str>, deriver: Option<&str>) -> ValidPathInfo {
        ValidPathInfo {
            id: 1,
            path: "/nix/store/26xbg1ndr7hbcncrlf9nhx5is2b25d13-hello".into(),
            hash: "sha256:abc".into(),
            registration_time: UNIX_EPOCH,
            deriver: deriver.map(Into::into),
            nar_size: None,
            ultimate: false,
            sigs: sigs.map(Into::into),
            ca: ca.map(Into::into),
            references: BTreeSet::new(),
        }
    }

    #[rstest]
    #[case::none(None, &[])]
    #[case::empty(Some(""), &[])]
    #[case::two(
        Some("cache.example.com:abc123 other:def456"),
        &["cache.example.com:abc123", "other:def456"]
    )]
    fn signatures(#[case] sigs: Option<&str>, #[case] expected: &[&str]) {
        assert_eq!(info(sigs, None, None).signatures(), expected);
    }

    #[test]
    fn empty_columns_are_absent() {
        let info = info(None, Some(""), Some(""));
        assert_eq!(info.content_address(), None);
        assert_eq!(info.deriver(), None);
    }

    #[rstest]
    #[case::epoch(0)]
    #[case::recent(1_700_000_000)]
    #[case::before_epoch(-86_400)]
    fn unix_time_roundtrip(#[case] timestamp: i64) {
        assert_eq!(system_time_to_unix(unix_to_system_time(timestamp)), timestamp);
    }
}
