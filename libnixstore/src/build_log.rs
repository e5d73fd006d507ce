// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Build logs and the chain of sources they are looked up in.
//!
//! The local store is asked first, then every configured log substituter in
//! order. A source that cannot serve logs at all is dropped when the chain is
//! built, and the first source that has the log wins.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bzip2::read::BzDecoder;
use libnixstore_core::{DerivedPath, StorePath};
use tracing::{debug, warn};

use crate::error::{IoErrorContext, Result};
use crate::store::StoreHandle;

/// A backend that may be able to serve build logs.
pub trait LogSource: Send + Sync {
    /// Used in log messages.
    fn name(&self) -> String;

    /// The log capability, if this source has it.
    fn as_log_store(&self) -> Option<&dyn LogStore> {
        None
    }
}

pub trait LogStore {
    /// The build log for `path`, `None` if this store does not have one.
    fn get_build_log(&self, path: &StorePath) -> Result<Option<String>>;
}

/// Build log sources in lookup order, restricted to those that serve logs.
pub struct LogChain<'a> {
    stores: Vec<(String, &'a dyn LogStore)>,
}

impl<'a> LogChain<'a> {
    pub fn new(sources: impl IntoIterator<Item = &'a dyn LogSource>) -> LogChain<'a> {
        let stores = sources
            .into_iter()
            .filter_map(|source| match source.as_log_store() {
                Some(store) => Some((source.name(), store)),
                None => {
                    debug!("{} does not serve build logs", source.name());
                    None
                }
            })
            .collect();
        LogChain { stores }
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Ask each store in turn, stopping at the first log found. Opaque paths
    /// are looked up by themselves, built ones by their derivation.
    pub fn get_log(&self, path: &DerivedPath) -> Result<Option<String>> {
        let key = path.store_path();
        for (name, store) in &self.stores {
            debug!("looking up build log of {key} in {name}");
            if let Some(log) = store.get_build_log(key)? {
                return Ok(Some(log));
            }
        }
        Ok(None)
    }
}

impl StoreHandle {
    /// How build results of `path` are addressed: a derivation with its
    /// declared outputs, or the artifact itself.
    pub fn classify(&self, path: &StorePath) -> Result<DerivedPath> {
        if !path.is_derivation() {
            return Ok(DerivedPath::Opaque { path: path.clone() });
        }
        let parsed = self.parse_derivation_file(path)?;
        Ok(DerivedPath::Built {
            drv_path: path.clone(),
            outputs: parsed.outputs.into_iter().map(|(name, _)| name).collect(),
        })
    }

    /// The build log of a registered path from the first source that has it.
    pub fn get_build_log(&self, path: &str) -> Result<Option<String>> {
        let path = self.valid_path(path)?;
        let derived = self.classify(&path)?;
        LogChain::new(self.log_sources()).get_log(&derived)
    }
}

/// Read a file, treating a missing file as absent.
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match File::open(path) {
        Ok(mut file) => {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .io_context(format!("Failed to read build log {}", path.display()))?;
            Ok(Some(buf))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).io_context(format!("Failed to open build log {}", path.display())),
    }
}

/// Look up the log of `drv_path` in a Nix log directory:
/// `<log_dir>/drvs/<first two characters>/<rest>`, optionally with a `.bz2`
/// suffix.
pub fn read_local_log(log_dir: &Path, drv_path: &StorePath) -> Result<Option<String>> {
    let base_name = drv_path.to_string();
    let (prefix, rest) = base_name.split_at(2);
    let dir = log_dir.join("drvs").join(prefix);

    let plain = dir.join(rest);
    if let Some(log) = read_optional(&plain)? {
        debug!("found build log {}", plain.display());
        return Ok(Some(String::from_utf8_lossy(&log).into_owned()));
    }

    let compressed = dir.join(format!("{rest}.bz2"));
    let Some(log) = read_optional(&compressed)? else {
        return Ok(None);
    };
    debug!("found compressed build log {}", compressed.display());
    let mut decompressed = Vec::new();
    BzDecoder::new(log.as_slice())
        .read_to_end(&mut decompressed)
        .io_context(format!("Failed to decompress {}", compressed.display()))?;
    Ok(Some(String::from_utf8_lossy(&decompressed).into_owned()))
}

/// A binary cache on the local filesystem, which keeps logs under
/// `<cache>/log/<drv basename>`.
#[derive(Debug, Clone)]
pub struct BinaryCacheLogSource {
    url: String,
    root: PathBuf,
}

impl BinaryCacheLogSource {
    pub fn new(url: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            root: root.into(),
        }
    }
}

impl LogSource for BinaryCacheLogSource {
    fn name(&self) -> String {
        self.url.clone()
    }

    fn as_log_store(&self) -> Option<&dyn LogStore> {
        Some(self)
    }
}

impl LogStore for BinaryCacheLogSource {
    fn get_build_log(&self, path: &StorePath) -> Result<Option<String>> {
        let file = self.root.join("log").join(path.to_string());
        Ok(read_optional(&file)?.map(|log| String::from_utf8_lossy(&log).into_owned()))
    }
}

/// A substituter reached over the network. It is kept so the configured
/// chain can be reported, but it never serves logs here.
#[derive(Debug, Clone)]
pub struct RemoteLogSource {
    url: String,
}

impl LogSource for RemoteLogSource {
    fn name(&self) -> String {
        self.url.clone()
    }
}

/// The log source for a configured substituter URL. `file://` URLs and
/// absolute paths are binary caches on disk; anything else is remote.
pub fn log_source_for_url(url: &str) -> Arc<dyn LogSource> {
    let local = url
        .strip_prefix("file://")
        .or_else(|| url.starts_with('/').then_some(url))
        .map(|path| path.split('?').next().unwrap_or(path));
    match local {
        Some(path) => Arc::new(BinaryCacheLogSource::new(url, path)),
        None => {
            warn!("log substituter {url} is not a local binary cache, it will not be asked for build logs");
            Arc::new(RemoteLogSource {
                url: url.to_owned(),
            })
        }
    }
}
