// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `job` mode (spec.md §6): run exactly one job to completion then exit.
//! This is the process a job's own `command` (built by
//! `dag::materialize_task`) re-invokes the engine binary as — grounded on
//! `maestro/loop/job.py`'s single-job entrypoint, which likewise starts by
//! reading its own task record back out of the store to find its image.

use std::sync::Arc;

use batchflow_content::Volume;
use batchflow_core::{DatasetKind, EngineError, SystemClock, TaskId, UuidIdGen};
use batchflow_engine::{ContainerExecLauncher, JobOutcome, JobRunner};
use batchflow_store::Store;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::lifecycle;

#[derive(Debug, Error)]
pub enum JobModeError {
    #[error(transparent)]
    Lifecycle(#[from] lifecycle::LifecycleError),
    #[error("failed to open store: {0}")]
    StoreOpen(#[from] batchflow_store::StoreOpenError),
    #[error("engine error: {0}")]
    Engine(#[from] batchflow_core::EngineError),
}

/// Parsed `job` subcommand arguments — the `(task_id, job_index, file_id)`
/// triple a job's own re-invocation command carries (spec.md §6).
pub struct JobArgs {
    pub task_id: String,
    pub job_index: u32,
    pub file_id: String,
}

pub fn run(config: Config, args: JobArgs) -> Result<JobOutcome, JobModeError> {
    let _log_guard = lifecycle::setup_logging(&config)?;
    info!(task = %args.task_id, job_index = args.job_index, "starting batchflow job");

    let (store, _processed_seq) = Store::open(&config.wal_path, &config.snapshot_path)?;
    let store = Arc::new(store);
    let volume = Arc::new(Volume::new(&config.volume_path));
    let clock = Arc::new(SystemClock);

    let task_id = TaskId::new(args.task_id);
    let task = store
        .get_task(&task_id)
        .ok_or_else(|| EngineError::Existence(format!("unknown task {task_id}")))?;

    let image_dataset_id = store
        .dataset_id_by_name(&task.spec.image)
        .ok_or_else(|| EngineError::Existence(format!("unknown image dataset {}", task.spec.image)))?;
    let image_dataset = store
        .get_dataset(&image_dataset_id)
        .ok_or_else(|| EngineError::Existence(format!("unknown image dataset {image_dataset_id}")))?;
    let image_file_id = image_dataset
        .files
        .first()
        .ok_or_else(|| EngineError::Content(format!("image dataset {image_dataset_id} has no file")))?;
    let image_file = store
        .get_file(image_file_id)
        .ok_or_else(|| EngineError::Existence(format!("unknown file {image_file_id}")))?;
    let image_path = volume.dataset_basepath(&image_dataset_id, DatasetKind::Image).join(&image_file.filename);

    let mut binds = vec![format!("{0}:{0}", config.volume_path.display())];
    binds.extend(task.spec.binds.clone());
    let launcher = ContainerExecLauncher::new(image_path, binds);

    let runner = JobRunner::new(store, volume, clock, UuidIdGen, launcher, config.tunables, task_id, args.job_index, args.file_id);

    let outcome = runner.run()?;
    info!(outcome = ?outcome, "batchflow job finished");
    Ok(outcome)
}
