// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event vocabulary the write-ahead log durably records. Every mutation
//! to the entity model of `batchflow-core` is expressed as one of these
//! before it is applied to the in-memory `MaterializedState` — append then
//! apply is the store's atomic unit (SPEC_FULL §4.8).

use batchflow_core::{Dataset, File, Job, JobStatus, Task, TaskStatus, User};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreEvent {
    UserCreated(User),
    DatasetCreated(Dataset),
    FileAppended(File),
    TaskCreated(Task),
    /// Parent/child edge between task names, recorded as a proper table
    /// rather than a stringified list (spec.md §9).
    EdgeAdded { parent: String, child: String },
    JobCreated(Job),

    TaskStatusSet {
        task_id: String,
        status: TaskStatus,
    },
    TaskExternalStateConsumed {
        task_id: String,
    },
    TaskExternalStateSet {
        task_id: String,
        state: batchflow_core::ExternalState,
    },

    JobStatusSet {
        job_id: String,
        status: JobStatus,
        now_ms: u64,
    },
    JobBackendBound {
        job_id: String,
        backend_job_id: i64,
        backend_state: String,
    },
    JobReset {
        job_id: String,
        now_ms: u64,
        bump_retry: bool,
    },
    JobPinged {
        job_id: String,
        now_ms: u64,
    },
    JobUsageUpdated {
        job_id: String,
        used_sys_memory_mb: f64,
        used_gpu_memory_mb: f64,
    },
    JobReservationGrown {
        job_id: String,
        reserved_sys_memory_mb: f64,
        reserved_gpu_memory_mb: f64,
    },
    JobStarted {
        job_id: String,
        now_ms: u64,
    },
}
