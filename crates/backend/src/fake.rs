// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory `Backend` for deterministic tests, matching the teacher's
//! `Fake*Adapter` convention.

use crate::backend::{Backend, JobDescription, SubmitRequest};
use crate::error::BackendError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct FakeJob {
    state: String,
    name: String,
}

/// Fake backend with unlimited capacity and a scripted state per job.
pub struct FakeBackend {
    jobs: Arc<Mutex<HashMap<i64, FakeJob>>>,
    next_id: AtomicI64,
    available: Arc<Mutex<bool>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicI64::new(1),
            available: Arc::new(Mutex::new(true)),
        }
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock() = available;
    }

    pub fn set_state(&self, backend_job_id: i64, state: impl Into<String>) {
        if let Some(job) = self.jobs.lock().get_mut(&backend_job_id) {
            job.state = state.into();
        }
    }

    pub fn submitted_jobs(&self) -> Vec<i64> {
        self.jobs.lock().keys().copied().collect()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn has_available(
        &self,
        _partition: &str,
        _cpus: u32,
        _memory_mb: f64,
    ) -> Result<bool, BackendError> {
        Ok(*self.available.lock())
    }

    async fn submit(&self, req: SubmitRequest<'_>) -> Result<(i64, String), BackendError> {
        let backend_job_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().insert(
            backend_job_id,
            FakeJob {
                state: "pending".to_string(),
                name: req.jobname.to_string(),
            },
        );
        Ok((backend_job_id, "pending".to_string()))
    }

    async fn status(&self, backend_job_id: i64) -> Result<Option<String>, BackendError> {
        Ok(self.jobs.lock().get(&backend_job_id).map(|j| j.state.clone()))
    }

    async fn cancel(&self, backend_job_id: i64) -> Result<bool, BackendError> {
        let mut jobs = self.jobs.lock();
        if let Some(job) = jobs.get_mut(&backend_job_id) {
            job.state = "cancelled".to_string();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn describe(&self, backend_job_id: i64) -> Result<Option<JobDescription>, BackendError> {
        Ok(self.jobs.lock().get(&backend_job_id).map(|j| JobDescription {
            backend_job_id,
            state: j.state.clone(),
            name: j.name.clone(),
        }))
    }

    async fn cancel_with(&self, name_prefix: &str, state: &str) -> Result<(), BackendError> {
        let ids: Vec<i64> = self
            .jobs
            .lock()
            .iter()
            .filter(|(_, j)| j.name.contains(name_prefix) && j.state == state)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.cancel(id).await?;
        }
        Ok(())
    }
}
