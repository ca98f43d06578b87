// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read models for task and dataset inspection (SPEC_FULL §10.1/§10.2),
//! grounded on `maestro/manager/task.py:describe`/`:list` and
//! `maestro/manager/dataset.py`'s describe/list views. Both live here,
//! rather than split across `batchflow-store`/`batchflow-content`, since a
//! `DatasetInfo`'s `filepath` needs the `Volume` layout and a `TaskInfo`
//! needs nothing `Store` doesn't already expose directly.

use std::collections::HashMap;
use std::path::PathBuf;

use batchflow_content::Volume;
use batchflow_core::{
    DatasetId, DatasetKind, EngineError, EngineResult, JobId, JobStatus, TaskId, TaskStatus, UserId,
};
use batchflow_store::Store;

/// `maestro/manager/task.py:describe` read model.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
    pub owner: UserId,
    pub partition: String,
    pub status: TaskStatus,
    pub job_status_histogram: HashMap<JobStatus, u32>,
    pub total_retry_count: u32,
    pub job_ids: Vec<JobId>,
}

/// One file entry of a `DatasetInfo` — the file's own digest plus its
/// resolved path under the volume.
#[derive(Debug, Clone)]
pub struct DatasetFileInfo {
    pub filename: String,
    pub md5: String,
    pub filepath: PathBuf,
}

/// `maestro/manager/dataset.py:describe` read model.
#[derive(Debug, Clone)]
pub struct DatasetInfo {
    pub id: DatasetId,
    pub name: String,
    pub owner: UserId,
    pub kind: DatasetKind,
    pub files: Vec<DatasetFileInfo>,
}

/// Build the `TaskInfo` read model for one task.
pub fn describe_task(store: &Store, task_id: &TaskId) -> EngineResult<TaskInfo> {
    let task = store
        .get_task(task_id)
        .ok_or_else(|| EngineError::Existence(format!("unknown task {task_id}")))?;

    let jobs = store.jobs_of(task_id);
    let mut job_status_histogram: HashMap<JobStatus, u32> = HashMap::new();
    let mut total_retry_count = 0;
    let mut job_ids = Vec::with_capacity(jobs.len());
    for job in &jobs {
        *job_status_histogram.entry(job.status).or_insert(0) += 1;
        total_retry_count += job.retry;
        job_ids.push(job.id.clone());
    }

    Ok(TaskInfo {
        id: task.id,
        name: task.name,
        owner: task.owner,
        partition: task.partition,
        status: task.status,
        job_status_histogram,
        total_retry_count,
        job_ids,
    })
}

/// Describe every task whose name matches `pattern` (glob syntax, §6).
pub fn list_tasks(store: &Store, pattern: &str) -> EngineResult<Vec<TaskInfo>> {
    store.glob_tasks(pattern).iter().map(|id| describe_task(store, id)).collect()
}

/// Build the `DatasetInfo` read model for one dataset.
pub fn describe_dataset(store: &Store, volume: &Volume, dataset_id: &DatasetId) -> EngineResult<DatasetInfo> {
    let dataset = store
        .get_dataset(dataset_id)
        .ok_or_else(|| EngineError::Existence(format!("unknown dataset {dataset_id}")))?;

    let basepath = volume.dataset_basepath(dataset_id, dataset.kind);
    let mut files = Vec::with_capacity(dataset.files.len());
    for file_id in &dataset.files {
        let file = store
            .get_file(file_id)
            .ok_or_else(|| EngineError::Existence(format!("unknown file {file_id}")))?;
        files.push(DatasetFileInfo {
            filepath: basepath.join(&file.filename),
            filename: file.filename,
            md5: file.md5,
        });
    }

    Ok(DatasetInfo { id: dataset.id, name: dataset.name, owner: dataset.owner, kind: dataset.kind, files })
}

/// Describe every dataset whose name matches `pattern` (glob syntax, §6).
pub fn list_datasets(store: &Store, volume: &Volume, pattern: &str) -> EngineResult<Vec<DatasetInfo>> {
    store.glob_datasets(pattern).iter().map(|id| describe_dataset(store, volume, id)).collect()
}

#[cfg(test)]
#[path = "info_tests.rs"]
mod tests;
