// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Command-line queries against the local Nix store.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use libnixstore::{Derivation, PathInfo, Radix, Settings, StoreDir, StoreHandle};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nix-store-query")]
#[command(about = "Read-only queries against the local Nix store")]
#[command(version)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, env = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open the store and exit
    Check,
    /// Print whether a path is registered
    IsValid { path: String },
    /// Print the NAR hash of a path as <algo>:<base32>
    PathHash { path: String },
    /// Print the metadata of a path as JSON
    PathInfo {
        path: String,
        /// Render the NAR hash in hexadecimal
        #[arg(long)]
        base16: bool,
    },
    /// Print the registered path with the given hash part
    FromHashPart { hash_part: String },
    /// Re-encode a hash
    ConvertHash {
        /// md5, sha1, sha256 or sha512
        algorithm: String,
        hash: String,
        /// Print hexadecimal instead of nix base32
        #[arg(long)]
        base16: bool,
    },
    /// Sign a message with a secret key file
    Sign {
        #[arg(long)]
        key_file: PathBuf,
        message: String,
    },
    /// Check a detached signature; key and signature are base64
    CheckSignature {
        public_key: String,
        signature: String,
        message: String,
    },
    /// Sign a registered path with the configured keys
    SignPath { path: String },
    /// Print a derivation as JSON
    Derivation { drv_path: String },
    /// Print the logical store directory
    StoreDir,
    /// Print the physical store directory
    RealStoreDir,
    /// Print the build log of a derivation or output
    BuildLog { path: String },
    /// Print the listing of a path as JSON
    NarList { path: String },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Store(#[from] libnixstore::Error),
    #[error("invalid input: {0}")]
    Input(String),
    #[error("{0}")]
    NotFound(String),
}

impl From<libnixstore::ConfigError> for CliError {
    fn from(e: libnixstore::ConfigError) -> Self {
        CliError::Store(e.into())
    }
}

type CliResult<T> = std::result::Result<T, CliError>;

fn load_settings(config: Option<&Path>) -> CliResult<Settings> {
    match config {
        Some(config) => {
            let mut settings = Settings::from_file(config)?;
            settings.apply_env(|name| std::env::var(name).ok())?;
            settings.load_secret_keys()?;
            Ok(settings)
        }
        None => Ok(Settings::load()?),
    }
}

fn open(config: Option<&Path>) -> CliResult<StoreHandle> {
    Ok(StoreHandle::from_settings(&load_settings(config)?)?)
}

fn decode_base64(what: &str, text: &str) -> CliResult<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| CliError::Input(format!("{what} is not base64: {e}")))
}

fn path_info_json(store_dir: &StoreDir, info: &PathInfo) -> Value {
    json!({
        "deriver": info.deriver.as_ref().map(|d| store_dir.display_path(d)),
        "narHash": info.nar_hash,
        "registrationTime": info.registration_time,
        "narSize": info.nar_size,
        "references": info
            .references
            .iter()
            .map(|r| store_dir.display_path(r))
            .collect::<Vec<_>>(),
        "signatures": info.signatures,
        "contentAddress": info.content_address,
    })
}

/// Outputs and env stay lists of pairs so declaration order and repeated
/// keys survive.
fn derivation_json(store_dir: &StoreDir, drv: &Derivation) -> Value {
    let outputs: Vec<Value> = drv
        .outputs
        .iter()
        .map(|(name, path)| json!([name, path.as_ref().map(|p| store_dir.display_path(p))]))
        .collect();
    let env: Vec<Value> = drv.env.iter().map(|(k, v)| json!([k, v])).collect();
    json!({
        "outputs": outputs,
        "inputDrvs": drv
            .input_derivations
            .iter()
            .map(|p| store_dir.display_path(p))
            .collect::<Vec<_>>(),
        "inputSrcs": drv
            .input_sources
            .iter()
            .map(|p| store_dir.display_path(p))
            .collect::<Vec<_>>(),
        "platform": drv.platform,
        "builder": drv.builder,
        "args": drv.args,
        "env": env,
    })
}

fn run(cli: Cli) -> CliResult<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Check => {
            open(config)?;
        }
        Command::IsValid { path } => {
            println!("{}", open(config)?.is_valid_path(&path));
        }
        Command::PathHash { path } => {
            println!("{}", open(config)?.query_path_hash(&path)?);
        }
        Command::PathInfo { path, base16 } => {
            let handle = open(config)?;
            let info = handle.query_path_info(&path, Radix::from_base32_flag(!base16))?;
            println!("{}", path_info_json(handle.store_dir(), &info));
        }
        Command::FromHashPart { hash_part } => {
            let handle = open(config)?;
            let path = handle.query_path_from_hash_part(&hash_part)?.ok_or_else(|| {
                CliError::NotFound(format!("no path with hash part '{hash_part}'"))
            })?;
            println!("{}", handle.store_dir().display_path(&path));
        }
        Command::ConvertHash {
            algorithm,
            hash,
            base16,
        } => {
            let radix = Radix::from_base32_flag(!base16);
            println!("{}", libnixstore::convert_hash(&algorithm, &hash, radix)?);
        }
        Command::Sign { key_file, message } => {
            let key = std::fs::read_to_string(&key_file).map_err(|e| {
                CliError::Input(format!("cannot read {}: {e}", key_file.display()))
            })?;
            println!(
                "{}",
                libnixstore::sign_string(key.trim(), message.as_bytes())?
            );
        }
        Command::CheckSignature {
            public_key,
            signature,
            message,
        } => {
            let public_key = decode_base64("public key", &public_key)?;
            let signature = decode_base64("signature", &signature)?;
            let valid =
                libnixstore::check_signature(&public_key, &signature, message.as_bytes())?;
            println!("{valid}");
        }
        Command::SignPath { path } => {
            for signature in open(config)?.sign_path(&path)? {
                println!("{signature}");
            }
        }
        Command::Derivation { drv_path } => {
            let handle = open(config)?;
            let drv = handle.derivation_from_path(&drv_path)?;
            println!("{}", derivation_json(handle.store_dir(), &drv));
        }
        Command::StoreDir => {
            println!("{}", load_settings(config)?.store_dir);
        }
        Command::RealStoreDir => {
            println!("{}", open(config)?.real_store_dir().display());
        }
        Command::BuildLog { path } => {
            let log = open(config)?
                .get_build_log(&path)?
                .ok_or_else(|| CliError::NotFound(format!("no build log for '{path}'")))?;
            print!("{log}");
        }
        Command::NarList { path } => {
            let listing = open(config)?.get_nar_list(&path)?;
            println!(
                "{}",
                serde_json::to_string(&listing).map_err(libnixstore::Error::from)?
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
