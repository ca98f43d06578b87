// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-level startup plumbing shared by `app` mode: acquire the
//! single-daemon lock, create the state directory tree, and wire up
//! logging. Mirrors the teacher's `lifecycle.rs` lock-file/log-setup
//! sequence; the event-sourced recovery the teacher does here is instead
//! handled by `batchflow_store::Store::open` plus
//! `AdmissionLoop::reconcile_on_startup`, called directly from `app.rs`.

use std::fs::File;
use std::io::Write as _;

use fs2::FileExt;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to acquire lock: batchflow is already running")]
    LockFailed(#[source] std::io::Error),
    #[error("log_path {0} has no parent directory / file name")]
    BadLogPath(std::path::PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Holds the exclusive lock on `config.lock_path` for the process lifetime;
/// dropping it releases the lock.
pub struct LockGuard {
    #[allow(dead_code)]
    file: File,
}

/// Create the state directory and take the exclusive startup lock,
/// recording this process's pid. Fails fast if another `app` is already
/// running against the same state directory.
pub fn acquire_lock(config: &Config) -> Result<LockGuard, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    Ok(LockGuard { file: lock_file })
}

/// Release the lock's backing files. The advisory lock itself is released
/// when `LockGuard` drops; this additionally removes the pid file so a
/// stale one doesn't confuse the next startup's diagnostics.
pub fn release_lock(config: &Config, _guard: LockGuard) {
    let _ = std::fs::remove_file(&config.lock_path);
}

/// Set up file-backed `tracing` logging at `config.log_path`, honoring
/// `config.log_level` unless `RUST_LOG` is set (same precedence the
/// teacher's `setup_logging` uses).
pub fn setup_logging(config: &Config) -> Result<WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let parent = config.log_path.parent().ok_or_else(|| LifecycleError::BadLogPath(config.log_path.clone()))?;
    let file_name = config.log_path.file_name().ok_or_else(|| LifecycleError::BadLogPath(config.log_path.clone()))?;
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
