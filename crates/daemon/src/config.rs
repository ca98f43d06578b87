// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration (SPEC_FULL §6/§9): built-in defaults, an optional
//! TOML file, CLI flags, then environment variable overrides — the same
//! stacking order the teacher's `oj-daemon`/`oj-cli` env helpers use, just
//! with a file layer added in between since batchflow ships one process
//! instead of a user-facing CLI plus a background daemon.

use std::path::{Path, PathBuf};

use batchflow_engine::Tunables;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a state directory (set BATCHFLOW_STATE_DIR or HOME)")]
    NoStateDir,
    #[error("failed to read config file {0}: {1}")]
    ReadFile(PathBuf, std::io::Error),
    #[error("failed to parse config file {0}: {1}")]
    ParseFile(PathBuf, toml::de::Error),
}

/// Resolved engine configuration, independent of whether it's running in
/// `app` or `job` mode.
#[derive(Debug, Clone)]
pub struct Config {
    pub volume_path: PathBuf,
    pub wal_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub port: u16,
    pub log_level: String,
    pub account: String,
    pub reservation: Option<String>,
    pub tunables: Tunables,
}

/// Values accepted from the `app`/`job` clap commands, applied as the third
/// layer (over defaults and an optional TOML file, under env overrides).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub volume_path: Option<PathBuf>,
    pub store_path: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub account: Option<String>,
}

/// Shape of the optional TOML config file. Every field is optional so a
/// partial file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    volume_path: Option<PathBuf>,
    store_path: Option<PathBuf>,
    port: Option<u16>,
    log_level: Option<String>,
    account: Option<String>,
    reservation: Option<String>,
}

impl Config {
    /// Layer defaults, then `cli.config_file` (if given) or
    /// `{state_dir}/config.toml` (if it exists), then CLI flags, then
    /// `BATCHFLOW_*` environment overrides.
    pub fn load(cli: CliOverrides) -> Result<Self, ConfigError> {
        let state_dir = state_dir()?;
        let mut cfg = Config {
            volume_path: state_dir.join("volume"),
            wal_path: state_dir.join("wal").join("events.jsonl"),
            snapshot_path: state_dir.join("snapshot.zst"),
            socket_path: state_dir.join("batchflow.sock"),
            lock_path: state_dir.join("batchflow.pid"),
            log_path: state_dir.join("batchflow.log"),
            port: 7878,
            log_level: "info".to_string(),
            account: "batchflow".to_string(),
            reservation: None,
            tunables: Tunables::from_env(),
            state_dir,
        };

        let config_file = cli
            .config_file
            .clone()
            .unwrap_or_else(|| cfg.state_dir.join("config.toml"));
        if config_file.exists() {
            cfg.apply_file(&config_file)?;
        }

        cfg.apply_cli(cli);
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile(path.to_path_buf(), e))?;
        let file: FileConfig = toml::from_str(&text).map_err(|e| ConfigError::ParseFile(path.to_path_buf(), e))?;
        if let Some(v) = file.volume_path {
            self.volume_path = v;
        }
        if let Some(v) = file.store_path {
            self.wal_path = v.join("events.jsonl");
            self.snapshot_path = v.join("snapshot.zst");
        }
        if let Some(v) = file.port {
            self.port = v;
        }
        if let Some(v) = file.log_level {
            self.log_level = v;
        }
        if let Some(v) = file.account {
            self.account = v;
        }
        if let Some(v) = file.reservation {
            self.reservation = Some(v);
        }
        Ok(())
    }

    fn apply_cli(&mut self, cli: CliOverrides) {
        if let Some(v) = cli.volume_path {
            self.volume_path = v;
        }
        if let Some(v) = cli.store_path {
            self.wal_path = v.join("events.jsonl");
            self.snapshot_path = v.join("snapshot.zst");
        }
        if let Some(v) = cli.port {
            self.port = v;
        }
        if let Some(v) = cli.log_level {
            self.log_level = v;
        }
        if let Some(v) = cli.account {
            self.account = v;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("BATCHFLOW_VOLUME_PATH") {
            self.volume_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BATCHFLOW_STORE_PATH") {
            let dir = PathBuf::from(v);
            self.wal_path = dir.join("events.jsonl");
            self.snapshot_path = dir.join("snapshot.zst");
        }
        if let Ok(v) = std::env::var("BATCHFLOW_PORT").ok().and_then(|s| s.parse().ok()) {
            self.port = v;
        }
        if let Ok(v) = std::env::var("BATCHFLOW_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var("BATCHFLOW_ACCOUNT") {
            self.account = v;
        }
        if let Ok(v) = std::env::var("BATCHFLOW_RESERVATION") {
            self.reservation = Some(v);
        }
    }
}

/// Resolve the state directory: `BATCHFLOW_STATE_DIR` > `XDG_STATE_HOME/batchflow`
/// > `~/.local/state/batchflow`, mirroring the teacher's `env::state_dir`.
fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("BATCHFLOW_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("batchflow"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/batchflow"))
}
