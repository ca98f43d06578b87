// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory projection of every `StoreEvent` ever applied. Rebuilt at
//! startup by loading the last snapshot and replaying the WAL entries after
//! it (§4.8).

use crate::event::StoreEvent;
use batchflow_core::{
    Dataset, DatasetId, ExternalState, File, FileId, Job, JobId, JobStatus, Task, TaskId, User,
    UserId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    pub users: HashMap<UserId, User>,
    pub user_by_name: HashMap<String, UserId>,
    pub user_by_token: HashMap<String, UserId>,

    pub datasets: HashMap<DatasetId, Dataset>,
    pub dataset_by_name: HashMap<String, DatasetId>,

    pub files: HashMap<FileId, File>,

    pub tasks: HashMap<TaskId, Task>,
    pub task_by_name: HashMap<String, TaskId>,

    pub jobs: HashMap<JobId, Job>,
    /// Job ids per task, in creation order (Task -> Jobs is 1-to-many,
    /// ordered by creation index, §3 Relationships).
    pub jobs_by_task: HashMap<TaskId, Vec<JobId>>,
    /// Monotonic counter so priority ties break on insertion order (§4.1).
    pub job_insertion_seq: HashMap<JobId, u64>,
    next_insertion_seq: u64,

    /// Parent -> child task-name edges (spec.md §9: re-encode the
    /// stringified parent/child lists as a proper table).
    pub edges: Vec<(String, String)>,
}

impl MaterializedState {
    pub fn apply(&mut self, event: &StoreEvent) {
        match event {
            StoreEvent::UserCreated(user) => {
                self.user_by_name.insert(user.name.clone(), user.id.clone());
                self.user_by_token.insert(user.token.clone(), user.id.clone());
                self.users.insert(user.id.clone(), user.clone());
            }
            StoreEvent::DatasetCreated(dataset) => {
                self.dataset_by_name
                    .insert(dataset.name.clone(), dataset.id.clone());
                self.datasets.insert(dataset.id.clone(), dataset.clone());
            }
            StoreEvent::FileAppended(file) => {
                if let Some(dataset) = self.datasets.get_mut(&file.dataset) {
                    dataset.files.push(file.id.clone());
                }
                self.files.insert(file.id.clone(), file.clone());
            }
            StoreEvent::TaskCreated(task) => {
                self.task_by_name.insert(task.name.clone(), task.id.clone());
                self.tasks.insert(task.id.clone(), task.clone());
            }
            StoreEvent::EdgeAdded { parent, child } => {
                self.edges.push((parent.clone(), child.clone()));
            }
            StoreEvent::JobCreated(job) => {
                self.jobs_by_task
                    .entry(job.task.clone())
                    .or_default()
                    .push(job.id.clone());
                self.next_insertion_seq += 1;
                self.job_insertion_seq
                    .insert(job.id.clone(), self.next_insertion_seq);
                self.jobs.insert(job.id.clone(), job.clone());
            }
            StoreEvent::TaskStatusSet { task_id, status } => {
                if let Some(task) = self.tasks.get_mut(&TaskId::new(task_id.clone())) {
                    task.status = *status;
                }
            }
            StoreEvent::TaskExternalStateConsumed { task_id } => {
                if let Some(task) = self.tasks.get_mut(&TaskId::new(task_id.clone())) {
                    task.external_state = ExternalState::Waiting;
                }
            }
            StoreEvent::TaskExternalStateSet { task_id, state } => {
                if let Some(task) = self.tasks.get_mut(&TaskId::new(task_id.clone())) {
                    task.external_state = *state;
                }
            }
            StoreEvent::JobStatusSet {
                job_id,
                status,
                now_ms,
            } => {
                if let Some(job) = self.jobs.get_mut(&JobId::new(job_id.clone())) {
                    job.status = *status;
                    job.ping(*now_ms);
                    if !status.may_hold_backend_id() {
                        job.backend_job_id = -1;
                        job.backend_state.clear();
                    }
                }
            }
            StoreEvent::JobBackendBound {
                job_id,
                backend_job_id,
                backend_state,
            } => {
                if let Some(job) = self.jobs.get_mut(&JobId::new(job_id.clone())) {
                    job.backend_job_id = *backend_job_id;
                    job.backend_state = backend_state.clone();
                }
            }
            StoreEvent::JobReset {
                job_id,
                now_ms,
                bump_retry,
            } => {
                if let Some(job) = self.jobs.get_mut(&JobId::new(job_id.clone())) {
                    if *bump_retry {
                        job.retry += 1;
                    } else {
                        job.retry = 0;
                    }
                    job.reset_for_reassignment(*now_ms);
                }
            }
            StoreEvent::JobPinged { job_id, now_ms } => {
                if let Some(job) = self.jobs.get_mut(&JobId::new(job_id.clone())) {
                    job.ping(*now_ms);
                }
            }
            StoreEvent::JobUsageUpdated {
                job_id,
                used_sys_memory_mb,
                used_gpu_memory_mb,
            } => {
                if let Some(job) = self.jobs.get_mut(&JobId::new(job_id.clone())) {
                    job.used_sys_memory_mb = *used_sys_memory_mb;
                    job.used_gpu_memory_mb = *used_gpu_memory_mb;
                }
            }
            StoreEvent::JobReservationGrown {
                job_id,
                reserved_sys_memory_mb,
                reserved_gpu_memory_mb,
            } => {
                if let Some(job) = self.jobs.get_mut(&JobId::new(job_id.clone())) {
                    job.reserved_sys_memory_mb = *reserved_sys_memory_mb;
                    job.reserved_gpu_memory_mb = *reserved_gpu_memory_mb;
                }
            }
            StoreEvent::JobStarted { job_id, now_ms } => {
                if let Some(job) = self.jobs.get_mut(&JobId::new(job_id.clone())) {
                    job.start_time_ms = Some(*now_ms);
                    job.ping(*now_ms);
                }
            }
        }
    }

    pub fn jobs_of(&self, task_id: &TaskId) -> Vec<&Job> {
        self.jobs_by_task
            .get(task_id)
            .map(|ids| ids.iter().filter_map(|id| self.jobs.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn all_jobs(&self, task_id: &TaskId, pred: impl Fn(&Job) -> bool) -> bool {
        let jobs = self.jobs_of(task_id);
        !jobs.is_empty() && jobs.iter().all(|j| pred(j))
    }

    pub fn any_job(&self, task_id: &TaskId, pred: impl Fn(&Job) -> bool) -> bool {
        self.jobs_of(task_id).iter().any(|j| pred(j))
    }

    /// Jobs in `status` with no bound backend id, ordered by priority desc
    /// then insertion order asc, bounded to `limit` (§4.1, §4.4 step 3).
    pub fn queueable_jobs(&self, status: JobStatus, limit: usize) -> Vec<JobId> {
        let mut candidates: Vec<&Job> = self
            .jobs
            .values()
            .filter(|j| j.status == status && j.backend_job_id == -1)
            .collect();
        candidates.sort_by(|a, b| {
            b.priority.cmp(&a.priority).then_with(|| {
                let sa = self.job_insertion_seq.get(&a.id).copied().unwrap_or(0);
                let sb = self.job_insertion_seq.get(&b.id).copied().unwrap_or(0);
                sa.cmp(&sb)
            })
        });
        candidates
            .into_iter()
            .take(limit)
            .map(|j| j.id.clone())
            .collect()
    }

    pub fn glob_tasks(&self, pattern: &str) -> Vec<TaskId> {
        glob_match_names(&self.task_by_name, pattern)
    }

    pub fn glob_datasets(&self, pattern: &str) -> Vec<DatasetId> {
        glob_match_names(&self.dataset_by_name, pattern)
    }
}

fn glob_match_names<V: Clone>(index: &HashMap<String, V>, pattern: &str) -> Vec<V> {
    let prefix = pattern.trim_end_matches('*');
    let anchored = !pattern.ends_with('*');
    index
        .iter()
        .filter(|(name, _)| {
            if anchored {
                name.as_str() == pattern
            } else {
                name.starts_with(prefix)
            }
        })
        .map(|(_, v)| v.clone())
        .collect()
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
