// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! A throwaway store on disk for unit tests.

use std::fs;
use std::time::{Duration, UNIX_EPOCH};

use libnixstore_core::{StoreDir, StorePath};
use libnixstore_db::{RegisterPathParams, StoreDb};
use libnixstore_hash::{Algorithm, Radix};
use tempfile::TempDir;

use crate::config::Settings;
use crate::store::StoreHandle;

pub(crate) const REGISTRATION_TIME: u64 = 1_700_000_000;

pub(crate) struct Fixture {
    pub dir: TempDir,
    pub settings: Settings,
    db: StoreDb,
}

impl Fixture {
    pub fn new() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        fs::create_dir_all(&store).unwrap();
        let settings = Settings {
            store_dir: StoreDir::new(store.to_str().unwrap()).unwrap(),
            state_dir: dir.path().join("state"),
            log_dir: dir.path().join("log"),
            ..Settings::default()
        };
        fs::create_dir_all(settings.state_dir.join("db")).unwrap();
        let db = StoreDb::create(settings.db_path()).unwrap();
        Fixture { dir, settings, db }
    }

    pub fn handle(&self) -> StoreHandle {
        StoreHandle::from_settings(&self.settings).unwrap()
    }

    /// A store path whose hash part is derived from `name`.
    pub fn store_path(name: &str) -> StorePath {
        let hash = Algorithm::SHA256.digest(name).render(Radix::Base32);
        format!("{}-{name}", &hash[..32]).parse().unwrap()
    }

    pub fn display(&self, path: &StorePath) -> String {
        self.settings.store_dir.display_path(path)
    }

    /// Register `name` with a NAR hash of `sha256(name)` and a NAR size of
    /// the name's length.
    pub fn add_path(
        &mut self,
        name: &str,
        references: &[&StorePath],
        deriver: Option<&StorePath>,
    ) -> StorePath {
        let path = Self::store_path(name);
        self.register(RegisterPathParams {
            path: self.display(&path),
            hash: Algorithm::SHA256.digest(name).render_prefixed(Radix::Base16),
            registration_time: UNIX_EPOCH + Duration::from_secs(REGISTRATION_TIME),
            deriver: deriver.map(|d| self.display(d)),
            nar_size: Some(name.len() as u64),
            references: references.iter().map(|r| self.display(r)).collect(),
            ..RegisterPathParams::default()
        });
        path
    }

    pub fn register(&mut self, params: RegisterPathParams) {
        self.db.register_valid_path(&params).unwrap();
    }

    /// Write a `.drv` file into the store and register it.
    pub fn add_derivation(&mut self, name: &str, aterm: &str) -> StorePath {
        let path = self.add_path(name, &[], None);
        fs::write(self.settings.store_dir.join(&path), aterm).unwrap();
        path
    }

    pub fn record_output(&self, drv: &StorePath, output: &str, path: &StorePath) {
        self.db
            .register_derivation_output(&self.display(drv), output, &self.display(path))
            .unwrap();
    }
}
