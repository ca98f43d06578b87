// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The narrow interface the engine uses to talk to a batch execution
//! backend (§4.6): submit shell scripts, report node capacity, query job
//! state, cancel jobs.

use crate::error::BackendError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Parameters for one job submission.
pub struct SubmitRequest<'a> {
    pub command: &'a str,
    pub cpus: u32,
    pub mem_mb: f64,
    pub partition: &'a str,
    pub jobname: &'a str,
    pub workarea: &'a str,
    pub envs: &'a HashMap<String, String>,
    pub venv: Option<&'a str>,
}

/// A backend job's full status report, as returned by `describe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescription {
    pub backend_job_id: i64,
    pub state: String,
    pub name: String,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Whether at least one node holding `partition` has `cpus` free CPUs
    /// and `memory_mb` free memory.
    async fn has_available(
        &self,
        partition: &str,
        cpus: u32,
        memory_mb: f64,
    ) -> Result<bool, BackendError>;

    /// Construct the backend-specific batch script and submit it, returning
    /// the assigned backend job id and its initial state string.
    async fn submit(&self, req: SubmitRequest<'_>) -> Result<(i64, String), BackendError>;

    /// Current state string for a backend job, or `None` if it is unknown
    /// to the backend.
    async fn status(&self, backend_job_id: i64) -> Result<Option<String>, BackendError>;

    /// Request cancellation of a backend job. Returns `false` if the job
    /// wasn't found.
    async fn cancel(&self, backend_job_id: i64) -> Result<bool, BackendError>;

    /// Full status report for a backend job, or `None` if unknown.
    async fn describe(&self, backend_job_id: i64) -> Result<Option<JobDescription>, BackendError>;

    /// Cancel every backend job whose name contains `name_prefix` and whose
    /// state equals `state`.
    async fn cancel_with(&self, name_prefix: &str, state: &str) -> Result<(), BackendError>;
}
