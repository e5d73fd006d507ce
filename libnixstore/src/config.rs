// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use libnixstore_core::signing::SigningKey;
use libnixstore_core::StoreDir;
use serde::Deserialize;
use tracing::warn;

use crate::error::ConfigError;

fn default_state_dir() -> PathBuf {
    PathBuf::from("/nix/var/nix")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/nix/var/log/nix")
}

/// Where the store lives and which extra sources to consult.
///
/// Settings come from a TOML file and are then overridden by the environment
/// variables Nix itself honours. Path info caching and substitution cannot
/// be configured; a store opened from these settings never does either.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub store_dir: StoreDir,

    /// Physical location of `store_dir`, for stores mounted somewhere else.
    #[serde(default)]
    pub real_store_dir: Option<PathBuf>,

    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Defaults to `<state_dir>/db/db.sqlite`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Binary caches to ask for build logs, after the local store.
    #[serde(default)]
    pub log_substituters: Vec<String>,

    #[serde(default)]
    pub sign_key_paths: Vec<PathBuf>,

    #[serde(skip)]
    pub secret_keys: Vec<SigningKey>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: StoreDir::default(),
            real_store_dir: None,
            state_dir: default_state_dir(),
            log_dir: default_log_dir(),
            db_path: None,
            log_substituters: Vec::new(),
            sign_key_paths: Vec::new(),
            secret_keys: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_file(settings_file: &Path) -> Result<Settings, ConfigError> {
        let contents = read_to_string(settings_file).map_err(|e| ConfigError::ReadFile {
            path: settings_file.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Settings, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load settings the way the process was configured: `CONFIG_FILE`,
    /// else `settings.toml` in the working directory, else defaults. The
    /// environment is applied on top and signing keys are read.
    pub fn load() -> Result<Settings, ConfigError> {
        let mut settings = Self::load_without_keys()?;
        settings.load_secret_keys()?;
        Ok(settings)
    }

    /// [`Settings::load`] without reading signing keys, for callers that
    /// only need the store location.
    pub fn load_without_keys() -> Result<Settings, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    pub(crate) fn load_with(
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, ConfigError> {
        let mut settings = match var("CONFIG_FILE") {
            None => {
                if Path::new("settings.toml").exists() {
                    Self::from_file(Path::new("settings.toml"))?
                } else {
                    Settings::default()
                }
            }
            Some(settings_file) => Self::from_file(Path::new(&settings_file))?,
        };
        settings.apply_env(&var)?;
        Ok(settings)
    }

    /// Apply `NIX_*` and list overrides looked up through `var`.
    pub fn apply_env(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(store_dir) = var("NIX_STORE_DIR") {
            self.store_dir = StoreDir::new(store_dir).map_err(|e| ConfigError::Invalid {
                reason: format!("NIX_STORE_DIR: {e}"),
            })?;
        }
        if let Some(real_store_dir) = var("NIX_REAL_STORE_DIR") {
            self.real_store_dir = Some(PathBuf::from(real_store_dir));
        }
        if let Some(state_dir) = var("NIX_STATE_DIR") {
            self.state_dir = PathBuf::from(state_dir);
        }
        if let Some(log_dir) = var("NIX_LOG_DIR") {
            self.log_dir = PathBuf::from(log_dir);
        }
        if let Some(substituters) = var("LOG_SUBSTITUTERS") {
            self.log_substituters = substituters
                .split_whitespace()
                .map(str::to_owned)
                .collect();
        }
        if let Some(sign_key_paths) = var("SIGN_KEY_PATHS") {
            for sign_key_path in sign_key_paths.split_whitespace() {
                self.sign_key_paths.push(PathBuf::from(sign_key_path));
            }
        }
        if self.real_store_dir.as_deref() == Some(self.store_dir.to_path()) {
            warn!(
                "real_store_dir equals store_dir ({}), ignoring it",
                self.store_dir
            );
            self.real_store_dir = None;
        }
        Ok(())
    }

    /// Read every key in `sign_key_paths`.
    pub fn load_secret_keys(&mut self) -> Result<(), ConfigError> {
        self.secret_keys.clear();
        for sign_key_path in &self.sign_key_paths {
            self.secret_keys
                .push(SigningKey::from_file(sign_key_path).map_err(|e| {
                    ConfigError::InvalidSigningKey {
                        reason: format!(
                            "Couldn't parse secret key from '{}': {}",
                            sign_key_path.display(),
                            e
                        ),
                    }
                })?);
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.state_dir.join("db").join("db.sqlite"))
    }
}
