// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `app` mode (spec.md §6): start the Submission API listener plus the
//! admission loop, and keep both running until a shutdown signal arrives.
//! Mirrors the teacher's `main.rs` engine-loop shape — lock, log, startup
//! reconciliation before accepting traffic is replaced by reconciling
//! first and accepting only after, since `AdmissionLoop::reconcile_on_startup`
//! is cheap enough not to need the teacher's deferred-background treatment.

use std::sync::Arc;
use std::time::Duration;

use batchflow_backend::{Backend, SlurmBackend};
use batchflow_content::Volume;
use batchflow_core::{SystemClock, UuidIdGen};
use batchflow_engine::AdmissionLoop;
use batchflow_store::{Checkpointer, Store};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::config::Config;
use crate::lifecycle;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Lifecycle(#[from] lifecycle::LifecycleError),
    #[error("failed to open store: {0}")]
    StoreOpen(#[from] batchflow_store::StoreOpenError),
    #[error("failed to bind socket at {0}: {1}")]
    Bind(std::path::PathBuf, std::io::Error),
    #[error("engine error: {0}")]
    Engine(#[from] batchflow_core::EngineError),
}

pub async fn run(config: Config) -> Result<(), AppError> {
    let lock = lifecycle::acquire_lock(&config)?;
    let _log_guard = lifecycle::setup_logging(&config)?;
    info!("starting batchflow app");

    std::fs::create_dir_all(&config.volume_path).map_err(lifecycle::LifecycleError::from)?;
    if let Some(parent) = config.wal_path.parent() {
        std::fs::create_dir_all(parent).map_err(lifecycle::LifecycleError::from)?;
    }

    let (store, _processed_seq) = Store::open(&config.wal_path, &config.snapshot_path)?;
    let store = Arc::new(store);
    let volume = Arc::new(Volume::new(&config.volume_path));
    let clock = Arc::new(SystemClock);
    let backend: Arc<dyn Backend> = Arc::new(SlurmBackend::new(config.account.clone(), config.reservation.clone()));

    let admission = Arc::new(AdmissionLoop::new(
        store.clone(),
        volume.clone(),
        backend,
        clock.clone(),
        UuidIdGen,
        config.tunables,
    ));

    admission.reconcile_on_startup().await?;

    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    let unix_listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| AppError::Bind(config.socket_path.clone(), e))?;

    tokio::spawn(crate::listener::run(unix_listener, store.clone()));
    tokio::spawn(spawn_admission_ticks(admission.clone(), config.tunables.admission_tick));
    tokio::spawn(spawn_checkpoint(store.clone(), config.snapshot_path.clone()));

    info!(socket = %config.socket_path.display(), "batchflow app ready");
    println!("READY");

    wait_for_shutdown().await;

    admission.shutdown();
    let _ = std::fs::remove_file(&config.socket_path);
    lifecycle::release_lock(&config, lock);
    info!("batchflow app stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGINT handler");
            return;
        }
    };
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }
}

async fn spawn_admission_ticks<C: batchflow_core::Clock + 'static, I: batchflow_core::IdGen + 'static>(
    admission: Arc<AdmissionLoop<C, I>>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(e) = admission.tick().await {
            error!(error = %e, "admission loop tick failed");
        }
    }
}

const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

async fn spawn_checkpoint(store: Arc<Store>, snapshot_path: std::path::PathBuf) {
    let checkpointer = Checkpointer::new(snapshot_path);
    let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
    loop {
        interval.tick().await;
        let processed_seq = store.wal_processed_seq();
        if processed_seq == 0 {
            continue;
        }
        let state = store.snapshot_state();
        let handle = checkpointer.start(processed_seq, &state);
        match tokio::task::spawn_blocking(move || handle.wait()).await {
            Ok(Ok(result)) => {
                if let Err(e) = store.truncate_wal_before(processed_seq) {
                    tracing::warn!(error = %e, "failed to truncate WAL after checkpoint");
                } else {
                    tracing::debug!(seq = result.seq, size_bytes = result.size_bytes, "checkpoint complete");
                }
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "checkpoint failed, WAL not truncated"),
            Err(e) => tracing::warn!(error = %e, "checkpoint task panicked"),
        }
    }
}

