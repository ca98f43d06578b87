// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transactional facade C1 describes (§4.1, §4.8): existence checks,
//! name lookups, typed accessors, updates, filtered queries, and a per-task
//! lock table. Every write appends a `StoreEvent` to the WAL and applies it
//! to `MaterializedState` under one lock — that append-then-apply pair is
//! the store's atomic unit.

use crate::event::StoreEvent;
use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use crate::{load_snapshot, SnapshotError};
use batchflow_core::{
    Dataset, DatasetId, ExternalState, File, FileId, Job, JobId, JobStatus, Task, TaskId,
    TaskStatus, User, UserId,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreOpenError {
    #[error(transparent)]
    Wal(#[from] WalError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Shared handle to the event-sourced store. Cheap to clone (wraps `Arc`s
/// internally would be redundant here — callers hold this behind their own
/// `Arc<Store>`).
pub struct Store {
    state: RwLock<MaterializedState>,
    wal: Mutex<Wal>,
    task_locks: Mutex<HashMap<TaskId, Arc<Mutex<()>>>>,
}

impl Store {
    /// Load the last snapshot (if any), replay WAL entries after it, and
    /// open the WAL for further appends. Returns the store plus the
    /// sequence number recovery completed at (§4.8).
    pub fn open(wal_path: &Path, snapshot_path: &Path) -> Result<(Self, u64), StoreOpenError> {
        let (mut state, processed_seq) = match load_snapshot(snapshot_path)? {
            Some(snapshot) => (snapshot.state, snapshot.seq),
            None => (MaterializedState::default(), 0),
        };

        let wal = Wal::open(wal_path, processed_seq)?;
        for entry in wal.entries_after(processed_seq)? {
            state.apply(&entry.event);
        }

        Ok((
            Self {
                state: RwLock::new(state),
                wal: Mutex::new(wal),
                task_locks: Mutex::new(HashMap::new()),
            },
            processed_seq,
        ))
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn open_in_memory(wal_path: &Path) -> Result<Self, StoreOpenError> {
        let wal = Wal::open(wal_path, 0)?;
        Ok(Self {
            state: RwLock::new(MaterializedState::default()),
            wal: Mutex::new(wal),
            task_locks: Mutex::new(HashMap::new()),
        })
    }

    fn commit(&self, event: StoreEvent) -> Result<u64, WalError> {
        let mut wal = self.wal.lock();
        let seq = wal.append(&event)?;
        if wal.needs_flush() {
            wal.flush()?;
        }
        drop(wal);
        self.state.write().apply(&event);
        Ok(seq)
    }

    /// Force buffered WAL entries to disk, bypassing the group-commit
    /// interval/threshold. Callers on a durability-sensitive path (shutdown,
    /// a caller-visible acknowledgement) should call this explicitly.
    pub fn flush(&self) -> Result<(), WalError> {
        self.wal.lock().flush()
    }

    pub fn wal_processed_seq(&self) -> u64 {
        self.wal.lock().processed_seq()
    }

    pub fn wal_write_seq(&self) -> u64 {
        self.wal.lock().write_seq()
    }

    pub fn mark_wal_processed(&self, seq: u64) {
        self.wal.lock().mark_processed(seq);
    }

    pub fn truncate_wal_before(&self, seq: u64) -> Result<(), WalError> {
        self.wal.lock().truncate_before(seq)
    }

    /// A clone of the current in-memory state, suitable for a checkpoint or
    /// for reconciliation (which must not hold this lock while it works).
    pub fn snapshot_state(&self) -> MaterializedState {
        self.state.read().clone()
    }

    /// The lock a per-task scheduler step must hold for its duration
    /// (§4.1, §4.8): steps on the same task serialize, steps on different
    /// tasks proceed in parallel.
    pub fn task_lock(&self, task_id: &TaskId) -> Arc<Mutex<()>> {
        self.task_locks
            .lock()
            .entry(task_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // --- existence checks ---

    pub fn user_exists(&self, id: &UserId) -> bool {
        self.state.read().users.contains_key(id)
    }

    pub fn dataset_exists(&self, id: &DatasetId) -> bool {
        self.state.read().datasets.contains_key(id)
    }

    pub fn task_exists(&self, id: &TaskId) -> bool {
        self.state.read().tasks.contains_key(id)
    }

    pub fn job_exists(&self, id: &JobId) -> bool {
        self.state.read().jobs.contains_key(id)
    }

    pub fn task_name_exists(&self, name: &str) -> bool {
        self.state.read().task_by_name.contains_key(name)
    }

    pub fn dataset_name_exists(&self, name: &str) -> bool {
        self.state.read().dataset_by_name.contains_key(name)
    }

    // --- name lookups ---

    pub fn task_id_by_name(&self, name: &str) -> Option<TaskId> {
        self.state.read().task_by_name.get(name).cloned()
    }

    pub fn dataset_id_by_name(&self, name: &str) -> Option<DatasetId> {
        self.state.read().dataset_by_name.get(name).cloned()
    }

    pub fn user_id_by_token(&self, token: &str) -> Option<UserId> {
        self.state.read().user_by_token.get(token).cloned()
    }

    // --- typed accessors ---

    pub fn get_user(&self, id: &UserId) -> Option<User> {
        self.state.read().users.get(id).cloned()
    }

    pub fn get_dataset(&self, id: &DatasetId) -> Option<Dataset> {
        self.state.read().datasets.get(id).cloned()
    }

    pub fn get_task(&self, id: &TaskId) -> Option<Task> {
        self.state.read().tasks.get(id).cloned()
    }

    pub fn get_job(&self, id: &JobId) -> Option<Job> {
        self.state.read().jobs.get(id).cloned()
    }

    pub fn get_file(&self, id: &FileId) -> Option<File> {
        self.state.read().files.get(id).cloned()
    }

    // --- filtered queries ---

    pub fn jobs_of(&self, task_id: &TaskId) -> Vec<Job> {
        self.state
            .read()
            .jobs_of(task_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn all_jobs(&self, task_id: &TaskId, pred: impl Fn(&Job) -> bool) -> bool {
        self.state.read().all_jobs(task_id, pred)
    }

    pub fn any_job(&self, task_id: &TaskId, pred: impl Fn(&Job) -> bool) -> bool {
        self.state.read().any_job(task_id, pred)
    }

    pub fn queueable_jobs(&self, status: JobStatus, limit: usize) -> Vec<JobId> {
        self.state.read().queueable_jobs(status, limit)
    }

    pub fn glob_tasks(&self, pattern: &str) -> Vec<TaskId> {
        self.state.read().glob_tasks(pattern)
    }

    pub fn glob_datasets(&self, pattern: &str) -> Vec<DatasetId> {
        self.state.read().glob_datasets(pattern)
    }

    pub fn all_task_ids(&self) -> Vec<TaskId> {
        self.state.read().tasks.keys().cloned().collect()
    }

    // --- save-new-entity ---

    pub fn create_user(&self, user: User) -> Result<u64, WalError> {
        self.commit(StoreEvent::UserCreated(user))
    }

    pub fn create_dataset(&self, dataset: Dataset) -> Result<u64, WalError> {
        self.commit(StoreEvent::DatasetCreated(dataset))
    }

    pub fn append_file(&self, file: File) -> Result<u64, WalError> {
        self.commit(StoreEvent::FileAppended(file))
    }

    pub fn create_task(&self, task: Task) -> Result<u64, WalError> {
        self.commit(StoreEvent::TaskCreated(task))
    }

    pub fn add_edge(&self, parent: impl Into<String>, child: impl Into<String>) -> Result<u64, WalError> {
        self.commit(StoreEvent::EdgeAdded {
            parent: parent.into(),
            child: child.into(),
        })
    }

    pub fn create_job(&self, job: Job) -> Result<u64, WalError> {
        self.commit(StoreEvent::JobCreated(job))
    }

    // --- updates ---

    pub fn set_task_status(&self, task_id: &TaskId, status: TaskStatus) -> Result<u64, WalError> {
        self.commit(StoreEvent::TaskStatusSet {
            task_id: task_id.as_str().to_string(),
            status,
        })
    }

    pub fn consume_task_external_state(&self, task_id: &TaskId) -> Result<u64, WalError> {
        self.commit(StoreEvent::TaskExternalStateConsumed {
            task_id: task_id.as_str().to_string(),
        })
    }

    pub fn set_task_external_state(
        &self,
        task_id: &TaskId,
        state: ExternalState,
    ) -> Result<u64, WalError> {
        self.commit(StoreEvent::TaskExternalStateSet {
            task_id: task_id.as_str().to_string(),
            state,
        })
    }

    pub fn set_job_status(&self, job_id: &JobId, status: JobStatus, now_ms: u64) -> Result<u64, WalError> {
        self.commit(StoreEvent::JobStatusSet {
            job_id: job_id.as_str().to_string(),
            status,
            now_ms,
        })
    }

    pub fn bind_job_backend(
        &self,
        job_id: &JobId,
        backend_job_id: i64,
        backend_state: impl Into<String>,
    ) -> Result<u64, WalError> {
        self.commit(StoreEvent::JobBackendBound {
            job_id: job_id.as_str().to_string(),
            backend_job_id,
            backend_state: backend_state.into(),
        })
    }

    pub fn reset_job(&self, job_id: &JobId, now_ms: u64, bump_retry: bool) -> Result<u64, WalError> {
        self.commit(StoreEvent::JobReset {
            job_id: job_id.as_str().to_string(),
            now_ms,
            bump_retry,
        })
    }

    pub fn ping_job(&self, job_id: &JobId, now_ms: u64) -> Result<u64, WalError> {
        self.commit(StoreEvent::JobPinged {
            job_id: job_id.as_str().to_string(),
            now_ms,
        })
    }

    pub fn update_job_usage(
        &self,
        job_id: &JobId,
        used_sys_memory_mb: f64,
        used_gpu_memory_mb: f64,
    ) -> Result<u64, WalError> {
        self.commit(StoreEvent::JobUsageUpdated {
            job_id: job_id.as_str().to_string(),
            used_sys_memory_mb,
            used_gpu_memory_mb,
        })
    }

    pub fn grow_job_reservation(
        &self,
        job_id: &JobId,
        reserved_sys_memory_mb: f64,
        reserved_gpu_memory_mb: f64,
    ) -> Result<u64, WalError> {
        self.commit(StoreEvent::JobReservationGrown {
            job_id: job_id.as_str().to_string(),
            reserved_sys_memory_mb,
            reserved_gpu_memory_mb,
        })
    }

    pub fn start_job(&self, job_id: &JobId, now_ms: u64) -> Result<u64, WalError> {
        self.commit(StoreEvent::JobStarted {
            job_id: job_id.as_str().to_string(),
            now_ms,
        })
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
