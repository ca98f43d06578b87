// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission loop (C6, §4.4): a single long-running loop that promotes
//! PRE_REGISTERED tasks, starts a per-task scheduler thread (C5) for every
//! newly REGISTERED task, queues ASSIGNED jobs onto the backend, garbage
//! collects finished scheduler threads, and performs startup reconciliation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{info, warn};

use batchflow_backend::{Backend, SubmitRequest};
use batchflow_content::Volume;
use batchflow_core::{Clock, EngineError, EngineResult, IdGen, JobStatus, TaskId, TaskStatus};
use batchflow_store::Store;

use crate::dag;
use crate::task_scheduler::TaskScheduler;
use crate::tunables::Tunables;

/// Prefix every backend job name carries, so `cancel_with` can target only
/// jobs this engine submitted (§4.4 startup reconciliation).
pub const JOB_NAME_PREFIX: &str = "batchflow";

struct TaskThread {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct AdmissionLoop<C: Clock + 'static, I: IdGen + 'static> {
    store: Arc<Store>,
    volume: Arc<Volume>,
    backend: Arc<dyn Backend>,
    clock: Arc<C>,
    ids: I,
    tunables: Tunables,
    task_threads: Mutex<HashMap<TaskId, TaskThread>>,
}

impl<C: Clock + 'static, I: IdGen + 'static> AdmissionLoop<C, I> {
    pub fn new(
        store: Arc<Store>,
        volume: Arc<Volume>,
        backend: Arc<dyn Backend>,
        clock: Arc<C>,
        ids: I,
        tunables: Tunables,
    ) -> Self {
        Self {
            store,
            volume,
            backend,
            clock,
            ids,
            tunables,
            task_threads: Mutex::new(HashMap::new()),
        }
    }

    /// Startup reconciliation (§4.4): cancel backend jobs this engine owns
    /// that are still RUNNING/PENDING, reset KILL/RUNNING/ASSIGNED jobs to
    /// a clean queueable state, then revive a scheduler for every
    /// non-terminal task.
    pub async fn reconcile_on_startup(&self) -> EngineResult<()> {
        self.backend
            .cancel_with(JOB_NAME_PREFIX, "RUNNING")
            .await
            .map_err(|e| EngineError::Backend(e.to_string()))?;
        self.backend
            .cancel_with(JOB_NAME_PREFIX, "PENDING")
            .await
            .map_err(|e| EngineError::Backend(e.to_string()))?;

        let now_ms = self.clock.now_ms();
        for task_id in self.store.all_task_ids() {
            for job in self.store.jobs_of(&task_id) {
                match job.status {
                    JobStatus::Kill => {
                        store_err(self.store.set_job_status(&job.id, JobStatus::Killed, now_ms))?;
                    }
                    JobStatus::Running => {
                        store_err(self.store.reset_job(&job.id, now_ms, false))?;
                    }
                    JobStatus::Assigned => {
                        store_err(self.store.bind_job_backend(&job.id, -1, String::new()))?;
                    }
                    _ => {}
                }
            }
        }

        for task_id in self.store.all_task_ids() {
            if let Some(task) = self.store.get_task(&task_id) {
                if !task.status.is_terminal() {
                    self.ensure_scheduler(task_id);
                }
            }
        }

        info!("startup reconciliation complete");
        Ok(())
    }

    /// One admission-loop pass (§4.4 steps 1-4).
    pub async fn tick(&self) -> EngineResult<()> {
        self.promote_pre_registered()?;
        self.discover_registered_tasks();
        self.queue_jobs().await?;
        self.garbage_collect_threads();
        Ok(())
    }

    fn promote_pre_registered(&self) -> EngineResult<()> {
        for task_id in self.store.all_task_ids() {
            let Some(task) = self.store.get_task(&task_id) else { continue };
            if task.status != TaskStatus::PreRegistered {
                continue;
            }
            let now_ms = self.clock.now_ms();
            match dag::materialize_task(&self.store, &self.volume, &self.ids, now_ms, &task_id) {
                Ok(()) => {}
                Err(EngineError::Validation(msg)) => {
                    // Parent not ready yet; retried next tick.
                    warn!(task = %task_id, msg, "task not ready for materialization");
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    fn discover_registered_tasks(&self) {
        for task_id in self.store.all_task_ids() {
            let Some(task) = self.store.get_task(&task_id) else { continue };
            if task.status.is_terminal() {
                continue;
            }
            self.ensure_scheduler(task_id);
        }
    }

    fn ensure_scheduler(&self, task_id: TaskId) {
        let mut threads = self.task_threads.lock();
        if threads.contains_key(&task_id) {
            return;
        }
        let stop = Arc::new(AtomicBool::new(false));
        let scheduler = TaskScheduler::new(self.store.clone(), self.clock.clone(), self.tunables, task_id.clone());
        let stop_clone = stop.clone();
        let handle = std::thread::spawn(move || {
            if let Err(err) = scheduler.run(|| stop_clone.load(Ordering::Relaxed)) {
                warn!(error = %err, "task scheduler thread exited with error");
            }
        });
        threads.insert(task_id, TaskThread { stop, handle });
    }

    async fn queue_jobs(&self) -> EngineResult<()> {
        let job_ids = self.store.queueable_jobs(JobStatus::Assigned, self.tunables.procs);
        for job_id in job_ids {
            let Some(job) = self.store.get_job(&job_id) else { continue };
            if job.backend_job_id != -1 {
                continue;
            }
            let Some(task) = self.store.get_task(&job.task) else { continue };

            let available = self
                .backend
                .has_available(&job.partition, job.reserved_cpu_number, job.reserved_sys_memory_mb)
                .await
                .map_err(|e| EngineError::Backend(e.to_string()))?;
            if !available {
                continue;
            }

            self.volume
                .job_workarea(&job.id)
                .map_err(|e| EngineError::Content(e.to_string()))?;

            let jobname = format!("{JOB_NAME_PREFIX}-{}", job.id);
            let req = SubmitRequest {
                command: &job.command,
                cpus: job.reserved_cpu_number,
                mem_mb: job.reserved_sys_memory_mb,
                partition: &job.partition,
                jobname: &jobname,
                workarea: &job.workarea,
                envs: &task.spec.envs,
                venv: None,
            };
            let (backend_job_id, backend_state) = self
                .backend
                .submit(req)
                .await
                .map_err(|e| EngineError::Backend(e.to_string()))?;

            let now_ms = self.clock.now_ms();
            store_err(self.store.bind_job_backend(&job.id, backend_job_id, backend_state))?;
            store_err(self.store.ping_job(&job.id, now_ms))?;
        }
        Ok(())
    }

    fn garbage_collect_threads(&self) {
        let mut threads = self.task_threads.lock();
        threads.retain(|_, t| !t.handle.is_finished());
    }

    /// Signal every live per-task scheduler thread to stop at its next
    /// tick boundary and wait for them to exit. Used on graceful shutdown.
    pub fn shutdown(&self) {
        let mut threads = self.task_threads.lock();
        for thread in threads.values() {
            thread.stop.store(true, Ordering::Relaxed);
        }
        for (_, thread) in threads.drain() {
            let _ = thread.handle.join();
        }
    }
}

fn store_err<T>(r: Result<T, batchflow_store::WalError>) -> EngineResult<T> {
    r.map_err(|e| EngineError::Content(e.to_string()))
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
