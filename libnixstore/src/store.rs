// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use libnixstore_core::signing::SigningKey;
use libnixstore_core::{OutputName, StoreDir, StorePath, StorePathHash};
use libnixstore_db::StoreDb;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::build_log::{self, LogSource, LogStore};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::path_info::ValidPathInfo;

/// Store parameters that are fixed for every store this crate opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreParams {
    /// Path info is read from the database on every query.
    pub path_info_cache_size: usize,
    /// Missing paths are never fetched from substituters.
    pub substitute: bool,
}

impl Default for StoreParams {
    fn default() -> Self {
        Self {
            path_info_cache_size: 0,
            substitute: false,
        }
    }
}

/// Read-only view of a Nix store.
pub trait Store: Send + Sync {
    /// The logical store directory paths are rendered under.
    fn store_dir(&self) -> &StoreDir;

    /// Where the store directory is physically mounted, if that differs from
    /// [`Store::store_dir`].
    fn real_store_dir(&self) -> Option<&Path> {
        None
    }

    fn params(&self) -> StoreParams {
        StoreParams::default()
    }

    /// `None` if the path is not registered.
    fn query_path_info(&self, path: &StorePath) -> Result<Option<ValidPathInfo>>;

    fn is_valid_path(&self, path: &StorePath) -> Result<bool> {
        Ok(self.query_path_info(path)?.is_some())
    }

    fn query_path_from_hash_part(&self, hash: &StorePathHash) -> Result<Option<StorePath>>;

    /// Output paths the database records for a derivation.
    fn query_derivation_outputs(
        &self,
        drv_path: &StorePath,
    ) -> Result<BTreeMap<OutputName, StorePath>>;

    /// The store itself as the first entry of a build log chain.
    fn as_log_source(&self) -> &dyn LogSource;
}

/// A store backed by the local SQLite database and log directory.
pub struct LocalStore {
    store_dir: StoreDir,
    real_store_dir: Option<PathBuf>,
    log_dir: PathBuf,
    db: Mutex<StoreDb>,
}

impl LocalStore {
    pub fn open(settings: &Settings) -> Result<LocalStore> {
        let db_path = settings.db_path();
        let db = StoreDb::open_system_at(&db_path).map_err(Error::StoreUnavailable)?;
        debug!(
            "opened store {} with database {}",
            settings.store_dir,
            db_path.display()
        );
        Ok(Self::with_db(settings, db))
    }

    /// Use an already opened database.
    pub fn with_db(settings: &Settings, db: StoreDb) -> LocalStore {
        LocalStore {
            store_dir: settings.store_dir.clone(),
            real_store_dir: settings.real_store_dir.clone(),
            log_dir: settings.log_dir.clone(),
            db: Mutex::new(db),
        }
    }

    // Queries are read-only, so a panic while holding the lock leaves
    // nothing half-written.
    fn db(&self) -> MutexGuard<'_, StoreDb> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn parse_recorded(&self, owner: &str, path: &str) -> Result<StorePath> {
        self.store_dir
            .parse_path(path)
            .map_err(|e| Error::CorruptEntry {
                path: owner.to_owned(),
                reason: e.to_string(),
            })
    }
}

impl Store for LocalStore {
    fn store_dir(&self) -> &StoreDir {
        &self.store_dir
    }

    fn real_store_dir(&self) -> Option<&Path> {
        self.real_store_dir.as_deref()
    }

    fn query_path_info(&self, path: &StorePath) -> Result<Option<ValidPathInfo>> {
        let row = self.db().query_path_info(&self.store_dir.display_path(path))?;
        row.map(|row| ValidPathInfo::from_row(&self.store_dir, row))
            .transpose()
    }

    fn is_valid_path(&self, path: &StorePath) -> Result<bool> {
        Ok(self.db().is_valid_path(&self.store_dir.display_path(path))?)
    }

    fn query_path_from_hash_part(&self, hash: &StorePathHash) -> Result<Option<StorePath>> {
        let found = self
            .db()
            .query_path_from_hash_part(self.store_dir.as_str(), hash.as_str())?;
        found
            .map(|path| self.parse_recorded(&path, &path))
            .transpose()
    }

    fn query_derivation_outputs(
        &self,
        drv_path: &StorePath,
    ) -> Result<BTreeMap<OutputName, StorePath>> {
        let drv = self.store_dir.display_path(drv_path);
        self.db()
            .query_derivation_outputs(&drv)?
            .into_iter()
            .map(|output| {
                self.parse_recorded(&drv, &output.path)
                    .map(|path| (output.output_id, path))
            })
            .collect()
    }

    fn as_log_source(&self) -> &dyn LogSource {
        self
    }
}

impl LogSource for LocalStore {
    fn name(&self) -> String {
        format!("local store {}", self.store_dir)
    }

    fn as_log_store(&self) -> Option<&dyn LogStore> {
        Some(self)
    }
}

impl LogStore for LocalStore {
    /// Logs are kept per derivation; an output path is looked up through its
    /// deriver.
    fn get_build_log(&self, path: &StorePath) -> Result<Option<String>> {
        let drv_path = if path.is_derivation() {
            path.clone()
        } else {
            match self.query_path_info(path)?.and_then(|info| info.deriver) {
                Some(deriver) => deriver,
                None => return Ok(None),
            }
        };
        build_log::read_local_log(&self.log_dir, &drv_path)
    }
}

static STORE: OnceCell<StoreHandle> = OnceCell::new();

/// A store together with the log sources and keys configured for it.
///
/// [`StoreHandle::get`] returns the process-wide handle built from
/// [`Settings::load`]; [`StoreHandle::from_settings`] and
/// [`StoreHandle::new`] build independent handles.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn Store>,
    log_sources: Vec<Arc<dyn LogSource>>,
    secret_keys: Vec<SigningKey>,
}

impl StoreHandle {
    /// The shared handle, opened on first use.
    pub fn get() -> Result<&'static StoreHandle> {
        Self::get_or_init_in(&STORE, || {
            let settings = Settings::load()?;
            StoreHandle::from_settings(&settings)
        })
    }

    /// Open the shared handle now rather than on first use.
    pub fn init() -> Result<()> {
        Self::get().map(|_| ())
    }

    /// Open the shared handle from explicit settings. If it is already open,
    /// the existing handle is returned and `settings` are ignored.
    pub fn init_from(settings: &Settings) -> Result<&'static StoreHandle> {
        Self::get_or_init_in(&STORE, || StoreHandle::from_settings(settings))
    }

    /// `init` runs at most once per cell, also under concurrent first use.
    fn get_or_init_in(
        cell: &'static OnceCell<StoreHandle>,
        init: impl FnOnce() -> Result<StoreHandle>,
    ) -> Result<&'static StoreHandle> {
        cell.get_or_try_init(init)
    }

    /// The shared handle, if it has been opened.
    pub fn try_get() -> Option<&'static StoreHandle> {
        STORE.get()
    }

    pub fn from_settings(settings: &Settings) -> Result<StoreHandle> {
        let store = LocalStore::open(settings)?;
        let mut handle = StoreHandle::new(Arc::new(store))
            .with_secret_keys(settings.secret_keys.clone());
        for url in &settings.log_substituters {
            handle = handle.with_log_source(build_log::log_source_for_url(url));
        }
        Ok(handle)
    }

    pub fn new(store: Arc<dyn Store>) -> StoreHandle {
        StoreHandle {
            store,
            log_sources: Vec::new(),
            secret_keys: Vec::new(),
        }
    }

    /// Append a source to ask for build logs after the store itself.
    pub fn with_log_source(mut self, source: Arc<dyn LogSource>) -> StoreHandle {
        self.log_sources.push(source);
        self
    }

    pub fn with_secret_keys(mut self, keys: Vec<SigningKey>) -> StoreHandle {
        self.secret_keys = keys;
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn store_dir(&self) -> &StoreDir {
        self.store.store_dir()
    }

    /// The physical store directory, which is the logical one unless the
    /// store is mounted elsewhere.
    pub fn real_store_dir(&self) -> &Path {
        self.store
            .real_store_dir()
            .unwrap_or_else(|| self.store.store_dir().to_path())
    }

    /// Where the contents of `path` can be read.
    pub fn real_path(&self, path: &StorePath) -> PathBuf {
        self.real_store_dir().join(path.to_string())
    }

    pub fn params(&self) -> StoreParams {
        self.store.params()
    }

    pub fn secret_keys(&self) -> &[SigningKey] {
        &self.secret_keys
    }

    /// The store first, then every configured log source in order.
    pub fn log_sources(&self) -> Vec<&dyn LogSource> {
        let mut sources = vec![self.store.as_log_source()];
        sources.extend(
            self.log_sources
                .iter()
                .map(|source| source.as_ref() as &dyn LogSource),
        );
        sources
    }

    /// Parse an absolute path under this store's directory.
    pub fn parse_path(&self, path: &str) -> Result<StorePath> {
        Ok(self.store_dir().parse_path(path)?)
    }

    /// Parse `path` and require it to be registered.
    pub(crate) fn valid_path(&self, path: &str) -> Result<StorePath> {
        let store_path = self.parse_path(path)?;
        self.ensure_valid(&store_path)?;
        Ok(store_path)
    }

    pub(crate) fn ensure_valid(&self, path: &StorePath) -> Result<()> {
        if self.store.is_valid_path(path)? {
            Ok(())
        } else {
            Err(Error::NotRegistered(self.store_dir().display_path(path)))
        }
    }
}
