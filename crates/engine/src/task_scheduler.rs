// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task state machine (C5, §4.3): one cooperative loop per task,
//! running on its own OS thread (§5), applying the first matching
//! transition of the ordered table on every tick while holding that
//! task's lock.

use batchflow_core::{Clock, EngineError, EngineResult, ExternalState, JobId, JobStatus, TaskId, TaskStatus};
use batchflow_store::{Store, WalError};
use std::sync::Arc;
use tracing::{debug, info};

use crate::tunables::Tunables;

/// The store's own error type carries no semantics the six `EngineError`
/// kinds need to distinguish here; every store failure on this path is a
/// storage-layer fault.
fn store_err<T>(r: Result<T, WalError>) -> EngineResult<T> {
    r.map_err(|e| EngineError::Content(e.to_string()))
}

/// Drives one task through §4.3's transition table until it reaches a
/// terminal status, then returns. Intended to be run on its own
/// `std::thread` by the admission loop.
pub struct TaskScheduler<C: Clock> {
    store: Arc<Store>,
    clock: Arc<C>,
    tunables: Tunables,
    task_id: TaskId,
    /// Gates the three TESTING-mode transitions inserted between rows 1
    /// and 2 of the table (§4.3, Open Question 1).
    testing: bool,
}

impl<C: Clock> TaskScheduler<C> {
    pub fn new(store: Arc<Store>, clock: Arc<C>, tunables: Tunables, task_id: TaskId) -> Self {
        Self { store, clock, tunables, task_id, testing: false }
    }

    pub fn with_testing(mut self, testing: bool) -> Self {
        self.testing = testing;
        self
    }

    /// Run until the task reaches a terminal status or `should_stop` fires
    /// between ticks. Blocks the calling thread via `Clock::sleep_ms`.
    pub fn run(&self, mut should_stop: impl FnMut() -> bool) -> EngineResult<()> {
        loop {
            if should_stop() {
                return Ok(());
            }
            if self.tick()? {
                info!(task = %self.task_id, "task reached terminal status");
                return Ok(());
            }
            self.clock.sleep_ms(self.tunables.task_tick.as_millis() as u64);
        }
    }

    /// One scheduler step: acquire the task's lock, reconcile stuck jobs,
    /// then apply the first matching transition. Returns whether the task
    /// is now terminal.
    pub fn tick(&self) -> EngineResult<bool> {
        let lock = self.store.task_lock(&self.task_id);
        let _guard = lock.lock();

        let Some(task) = self.store.get_task(&self.task_id) else {
            return Ok(true);
        };
        if task.status.is_terminal() {
            return Ok(true);
        }

        self.reconcile_stuck_jobs(&task.id)?;

        let new_status = self.apply_first_matching_transition(task.status, task.external_state)?;
        if let Some(status) = new_status {
            store_err(self.store.set_task_status(&task.id, status))?;
            debug!(task = %task.id, from = ?task.status, to = ?status, "task transition");
            return Ok(status.is_terminal());
        }
        Ok(false)
    }

    /// Liveness reconciliation (§4.3): any job in RUNNING/PENDING whose
    /// last ping predates the stuck timeout is demoted back to ASSIGNED.
    fn reconcile_stuck_jobs(&self, task_id: &TaskId) -> EngineResult<()> {
        let now_ms = self.clock.now_ms();
        for job in self.store.jobs_of(task_id) {
            let stuck = matches!(job.status, JobStatus::Running | JobStatus::Pending)
                && !job.is_alive(now_ms, self.tunables.stuck_timeout_secs);
            if stuck {
                store_err(self.store.reset_job(&job.id, now_ms, false))?;
            }
        }
        Ok(())
    }

    fn apply_first_matching_transition(
        &self,
        status: TaskStatus,
        external: ExternalState,
    ) -> EngineResult<Option<TaskStatus>> {
        let now_ms = self.clock.now_ms();
        let task_id = &self.task_id;

        match status {
            // Row 1: REGISTERED -> ASSIGNED, every job reassigned.
            TaskStatus::Registered => {
                self.assign_all(task_id, now_ms)?;
                Ok(Some(TaskStatus::Assigned))
            }

            // Row 2 (or TESTING insertion): ASSIGNED -> RUNNING.
            TaskStatus::Assigned => {
                if self.testing {
                    if let Some(first) = self.store.jobs_of(task_id).into_iter().next() {
                        store_err(self.store.set_job_status(&first.id, JobStatus::Assigned, now_ms))?;
                    }
                    return Ok(Some(TaskStatus::Testing));
                }
                self.assign_all(task_id, now_ms)?;
                Ok(Some(TaskStatus::Running))
            }

            // TESTING insertion rows: wait for the probe job to finish.
            TaskStatus::Testing => {
                let jobs = self.store.jobs_of(task_id);
                let Some(probe) = jobs.first() else {
                    return Ok(Some(TaskStatus::Running));
                };
                match probe.status {
                    JobStatus::Completed => {
                        for job in jobs.iter().skip(1) {
                            store_err(self.store.set_job_status(&job.id, JobStatus::Assigned, now_ms))?;
                        }
                        Ok(Some(TaskStatus::Running))
                    }
                    JobStatus::Failed | JobStatus::Broken => Ok(Some(TaskStatus::Broken)),
                    _ => Ok(None),
                }
            }

            TaskStatus::Running => self.transition_running(task_id, external, now_ms),

            // Row 8: FINALIZED --RETRY--> RUNNING.
            TaskStatus::Finalized => {
                if external == ExternalState::Retry {
                    for job in self.store.jobs_of(task_id) {
                        if job.status != JobStatus::Completed {
                            store_err(self.store.reset_job(&job.id, now_ms, true))?;
                        }
                    }
                    store_err(self.store.consume_task_external_state(task_id))?;
                    return Ok(Some(TaskStatus::Running));
                }
                Ok(None)
            }

            // Row 9: BROKEN --RETRY--> REGISTERED.
            TaskStatus::Broken => {
                if external == ExternalState::Retry {
                    self.assign_all(task_id, now_ms)?;
                    store_err(self.store.consume_task_external_state(task_id))?;
                    return Ok(Some(TaskStatus::Registered));
                }
                Ok(None)
            }

            // Row 10: KILL -> KILLED once every job reports KILLED.
            TaskStatus::Kill => {
                if self.store.all_jobs(task_id, |j| j.status == JobStatus::Killed) {
                    return Ok(Some(TaskStatus::Killed));
                }
                Ok(None)
            }

            // Row 11: KILLED --RETRY--> REGISTERED.
            TaskStatus::Killed => {
                if external == ExternalState::Retry {
                    self.assign_all(task_id, now_ms)?;
                    store_err(self.store.consume_task_external_state(task_id))?;
                    return Ok(Some(TaskStatus::Registered));
                }
                Ok(None)
            }

            TaskStatus::PreRegistered
            | TaskStatus::Completed
            | TaskStatus::Failed
            | TaskStatus::Removed => Ok(None),
        }
    }

    fn transition_running(
        &self,
        task_id: &TaskId,
        external: ExternalState,
        now_ms: u64,
    ) -> EngineResult<Option<TaskStatus>> {
        // Row 3.
        if self.store.all_jobs(task_id, |j| j.status == JobStatus::Completed) {
            return Ok(Some(TaskStatus::Completed));
        }
        // Row 4.
        if self.store.all_jobs(task_id, |j| j.status == JobStatus::Broken) {
            return Ok(Some(TaskStatus::Broken));
        }
        // Row 5.
        if external == ExternalState::Kill {
            for job in self.store.jobs_of(task_id) {
                let target = if job.status == JobStatus::Running {
                    JobStatus::Kill
                } else {
                    JobStatus::Killed
                };
                store_err(self.store.set_job_status(&job.id, target, now_ms))?;
            }
            store_err(self.store.consume_task_external_state(task_id))?;
            return Ok(Some(TaskStatus::Kill));
        }
        // Row 6.
        let max_retry = self.tunables.max_retry;
        let retryable: Vec<JobId> = self
            .store
            .jobs_of(task_id)
            .into_iter()
            .filter(|j| j.status == JobStatus::Failed && j.retry < max_retry)
            .map(|j| j.id)
            .collect();
        if !retryable.is_empty() {
            for job_id in &retryable {
                store_err(self.store.reset_job(job_id, now_ms, true))?;
            }
            return Ok(Some(TaskStatus::Running));
        }
        // Row 7.
        let none_active = !self
            .store
            .any_job(task_id, |j| matches!(j.status, JobStatus::Assigned | JobStatus::Running));
        let not_all_completed = !self.store.all_jobs(task_id, |j| j.status == JobStatus::Completed);
        if none_active && not_all_completed {
            return Ok(Some(TaskStatus::Finalized));
        }
        Ok(None)
    }

    fn assign_all(&self, task_id: &TaskId, now_ms: u64) -> EngineResult<()> {
        for job in self.store.jobs_of(task_id) {
            store_err(self.store.reset_job(&job.id, now_ms, false))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "task_scheduler_tests.rs"]
mod tests;
