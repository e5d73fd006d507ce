// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{Duration, UNIX_EPOCH};

use libnixstore::{Algorithm, Radix, StorePath};
use libnixstore_db::{RegisterPathParams, StoreDb};

const SECRET_KEY: &str = "cache.example.com-1:zFD7RJEU40VJzJvgT7h5xQwFm8FufXKH2CJPaKvh/xo=";

struct Store {
    dir: tempfile::TempDir,
    config: PathBuf,
    drv: StorePath,
    out: StorePath,
}

fn store_path(name: &str) -> StorePath {
    let hash = Algorithm::SHA256.digest(name).render(Radix::Base32);
    format!("{}-{name}", &hash[..32]).parse().unwrap()
}

impl Store {
    fn new() -> Store {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("store");
        let state_dir = dir.path().join("state");
        let log_dir = dir.path().join("log");
        fs::create_dir_all(&store_dir).unwrap();
        fs::create_dir_all(state_dir.join("db")).unwrap();

        let key_file = dir.path().join("secret-key");
        fs::write(&key_file, SECRET_KEY).unwrap();
        let config = dir.path().join("settings.toml");
        fs::write(
            &config,
            format!(
                "store_dir = \"{}\"\nstate_dir = \"{}\"\nlog_dir = \"{}\"\nsign_key_paths = [\"{}\"]\n",
                store_dir.display(),
                state_dir.display(),
                log_dir.display(),
                key_file.display()
            ),
        )
        .unwrap();

        let drv = store_path("hello-2.12.1.drv");
        let out = store_path("hello-2.12.1");
        let display = |path: &StorePath| format!("{}/{path}", store_dir.display());

        let mut db = StoreDb::create(state_dir.join("db").join("db.sqlite")).unwrap();
        for (path, deriver) in [(&drv, None), (&out, Some(display(&drv)))] {
            db.register_valid_path(&RegisterPathParams {
                path: display(path),
                hash: Algorithm::SHA256
                    .digest(path.to_string())
                    .render_prefixed(Radix::Base16),
                registration_time: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
                deriver,
                nar_size: Some(512),
                ..RegisterPathParams::default()
            })
            .unwrap();
        }

        fs::write(
            store_dir.join(drv.to_string()),
            format!(
                r#"Derive([("out","{}","",""),("dev","","r:sha256","")],[],[],"x86_64-linux","/bin/sh",["-c","true"],[("out","{}"),("z","1"),("a","2"),("z","3")])"#,
                display(&out),
                display(&out)
            ),
        )
        .unwrap();
        fs::create_dir_all(store_dir.join(out.to_string())).unwrap();
        fs::write(store_dir.join(out.to_string()).join("README"), b"hi").unwrap();
        write_log(&log_dir, &drv, "building hello\n");

        Store {
            dir,
            config,
            drv,
            out,
        }
    }

    fn display(&self, path: &StorePath) -> String {
        format!("{}/{path}", self.dir.path().join("store").display())
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_nix-store-query"))
            .env("CONFIG_FILE", &self.config)
            .env_remove("NIX_STORE_DIR")
            .env_remove("NIX_REAL_STORE_DIR")
            .env_remove("NIX_STATE_DIR")
            .env_remove("NIX_LOG_DIR")
            .env_remove("LOG_SUBSTITUTERS")
            .env_remove("SIGN_KEY_PATHS")
            .args(args)
            .output()
            .unwrap()
    }

    fn stdout(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "{args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }
}

fn write_log(log_dir: &Path, drv: &StorePath, text: &str) {
    let base_name = drv.to_string();
    let dir = log_dir.join("drvs").join(&base_name[..2]);
    fs::create_dir_all(&dir).unwrap();
    let file = fs::File::create(dir.join(format!("{}.bz2", &base_name[2..]))).unwrap();
    let mut encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

#[test]
fn validity() {
    let store = Store::new();
    assert_eq!(store.stdout(&["is-valid", &store.display(&store.out)]), "true\n");
    assert_eq!(
        store.stdout(&["is-valid", &store.display(&store_path("missing"))]),
        "false\n"
    );
}

#[test]
fn path_info() {
    let store = Store::new();
    let json: serde_json::Value = serde_json::from_str(
        &store.stdout(&["path-info", "--base16", &store.display(&store.out)]),
    )
    .unwrap();
    assert_eq!(json["deriver"], store.display(&store.drv));
    assert_eq!(json["narSize"], 512);
    assert_eq!(json["registrationTime"], 1_700_000_000);
    assert!(json["narHash"].as_str().unwrap().starts_with("sha256:"));
    assert_eq!(json["narHash"].as_str().unwrap().len(), "sha256:".len() + 64);
}

#[test]
fn hash_part() {
    let store = Store::new();
    assert_eq!(
        store.stdout(&["from-hash-part", store.out.hash().as_str()]),
        format!("{}\n", store.display(&store.out))
    );
    assert!(!store.run(&["from-hash-part", "not-a-hash"]).status.success());
}

#[test]
fn derivation() {
    let store = Store::new();
    let json: serde_json::Value =
        serde_json::from_str(&store.stdout(&["derivation", &store.display(&store.drv)])).unwrap();
    assert_eq!(
        json["outputs"],
        serde_json::json!([["out", store.display(&store.out)], ["dev", null]])
    );
    assert_eq!(json["builder"], "/bin/sh");
    assert_eq!(
        json["env"],
        serde_json::json!([
            ["out", store.display(&store.out)],
            ["z", "1"],
            ["a", "2"],
            ["z", "3"]
        ])
    );
}

#[test]
fn build_log_of_output() {
    let store = Store::new();
    assert_eq!(
        store.stdout(&["build-log", &store.display(&store.out)]),
        "building hello\n"
    );
}

#[test]
fn nar_list() {
    let store = Store::new();
    assert_eq!(
        store.stdout(&["nar-list", &store.display(&store.out)]).trim_end(),
        r#"{"version":1,"root":{"type":"directory","entries":{"README":{"type":"regular","size":2}}}}"#
    );
}

#[test]
fn store_dirs() {
    let store = Store::new();
    let expected = format!("{}\n", store.dir.path().join("store").display());
    assert_eq!(store.stdout(&["store-dir"]), expected);
    assert_eq!(store.stdout(&["real-store-dir"]), expected);
}

#[test]
fn convert_hash() {
    let store = Store::new();
    assert_eq!(
        store.stdout(&[
            "convert-hash",
            "sha256",
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        ]),
        "1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s\n"
    );
}

#[test]
fn sign_path_with_configured_key() {
    let store = Store::new();
    let signatures = store.stdout(&["sign-path", &store.display(&store.out)]);
    assert!(signatures.starts_with("cache.example.com-1:"));
    assert_eq!(signatures.lines().count(), 1);
}

#[test]
fn foreign_path_fails() {
    let store = Store::new();
    let output = store.run(&["path-hash", "/elsewhere/26xbg1ndr7hbcncrlf9nhx5is2b25d13-hello"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
