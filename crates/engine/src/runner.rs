// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job runner (C4, §4.5): everything that happens once the backend actually
//! starts the `batchflow job --task-id ... --job-index ... --file-id ...`
//! process a job's command resolves to. Runs as its own OS process, not a
//! thread — `bind` claims the job, `stage` prepares its workarea, `exec`
//! launches the container, `supervise` polls it to completion while
//! watching resource usage and external kill requests, `publish` registers
//! its output files, and `finish` records the terminal status.

use std::collections::HashMap;
use std::fs;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{info, warn};

use batchflow_content::{stage_input_file, stage_output_file, stage_secondary_dataset, md5_of_file, Volume};
use batchflow_core::{
    Clock, DatasetKind, EngineError, EngineResult, File, FileId, IdGen, Job, JobId, JobStatus,
    Task, TaskId,
};
use batchflow_store::Store;

use crate::placeholder;
use crate::runner::monitor::ResourceMonitor;
use crate::tunables::Tunables;

pub mod monitor;
mod procfs;

/// Abstraction over launching the job's container and watching its process
/// tree, so tests can swap in a plain shell for `container-exec`.
pub trait Launcher: Send + Sync {
    fn spawn(&self, command: &str, workarea: &Path, envs: &HashMap<String, String>) -> std::io::Result<Box<dyn SupervisedProcess>>;
}

pub trait SupervisedProcess: Send {
    /// Non-blocking poll: `Some(code)` once the process tree's root has
    /// exited, `None` while it's still running.
    fn try_wait(&mut self) -> std::io::Result<Option<i32>>;
    /// Resident memory (MB) summed across the whole process tree.
    fn sys_memory_mb(&self) -> f64;
    /// GPU memory (MB) summed across the whole process tree.
    fn gpu_memory_mb(&self) -> f64;
    /// Send SIGKILL to the whole process tree.
    fn kill_tree(&mut self);
}

struct ChildProcess {
    child: std::process::Child,
    pgid: u32,
}

impl SupervisedProcess for ChildProcess {
    fn try_wait(&mut self) -> std::io::Result<Option<i32>> {
        Ok(self.child.try_wait()?.map(|status| status.code().unwrap_or(-1)))
    }

    fn sys_memory_mb(&self) -> f64 {
        procfs::sum_rss_mb(&procfs::descendant_pids(self.pgid))
    }

    fn gpu_memory_mb(&self) -> f64 {
        procfs::sum_gpu_mb(&procfs::descendant_pids(self.pgid))
    }

    fn kill_tree(&mut self) {
        let _ = Command::new("kill").arg("-KILL").arg(format!("-{}", self.pgid)).status();
    }
}

/// Production launcher: runs the job command inside `container-exec`,
/// redirecting stdout/stderr to `{workarea}/output.log` (§4.5 step 3).
pub struct ContainerExecLauncher {
    image: PathBuf,
    binds: Vec<String>,
}

impl ContainerExecLauncher {
    pub fn new(image: PathBuf, binds: Vec<String>) -> Self {
        Self { image, binds }
    }
}

impl Launcher for ContainerExecLauncher {
    fn spawn(&self, command: &str, workarea: &Path, envs: &HashMap<String, String>) -> std::io::Result<Box<dyn SupervisedProcess>> {
        let entrypoint = workarea.join("entrypoint.sh");
        fs::write(&entrypoint, format!("cd {}\n{command}\n", workarea.display()))?;

        let log_path = workarea.join("output.log");
        let log = fs::File::create(&log_path)?;

        let mut cmd = Command::new("container-exec");
        cmd.arg("--nv").arg("--writable-tmpfs");
        for bind in &self.binds {
            cmd.arg("--bind").arg(bind);
        }
        cmd.arg(&self.image).arg("bash").arg(&entrypoint);
        cmd.envs(envs);
        cmd.stdout(Stdio::from(log.try_clone()?));
        cmd.stderr(Stdio::from(log));
        cmd.process_group(0);

        let child = cmd.spawn()?;
        let pgid = child.id();
        Ok(Box::new(ChildProcess { child, pgid }))
    }
}

/// Outcome of having run a job to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
    Killed,
}

/// Executes one job end to end (§4.5). Identified by `(task_id, job_index)`
/// rather than a `JobId` directly, since that's what a job's own `command`
/// (built by `dag::materialize_task`) re-invokes this binary with.
pub struct JobRunner<C: Clock, I: IdGen, L: Launcher> {
    store: std::sync::Arc<Store>,
    volume: std::sync::Arc<Volume>,
    clock: std::sync::Arc<C>,
    ids: I,
    launcher: L,
    tunables: Tunables,
    task_id: TaskId,
    job_index: u32,
    file_id: String,
}

impl<C: Clock, I: IdGen, L: Launcher> JobRunner<C, I, L> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: std::sync::Arc<Store>,
        volume: std::sync::Arc<Volume>,
        clock: std::sync::Arc<C>,
        ids: I,
        launcher: L,
        tunables: Tunables,
        task_id: TaskId,
        job_index: u32,
        file_id: String,
    ) -> Self {
        Self {
            store,
            volume,
            clock,
            ids,
            launcher,
            tunables,
            task_id,
            job_index,
            file_id,
        }
    }

    /// Run the job to completion, returning its terminal outcome.
    pub fn run(&self) -> EngineResult<JobOutcome> {
        let (job, task) = self.bind()?;
        let command = match self.stage(&task, &job) {
            Ok(command) => command,
            Err(err) => {
                self.finish(&job.id, JobStatus::Failed)?;
                return Err(err);
            }
        };

        let envs = self.build_envs(&task, &job);
        let workarea = PathBuf::from(&job.workarea);
        let mut proc = match self.launcher.spawn(&command, &workarea, &envs) {
            Ok(proc) => proc,
            Err(err) => {
                self.finish(&job.id, JobStatus::Failed)?;
                return Err(EngineError::JobExecution(err.to_string()));
            }
        };

        let outcome = self.supervise(proc.as_mut(), &job);

        let final_status = match outcome {
            JobOutcome::Completed => match self.publish(&task, &job) {
                Ok(()) => JobStatus::Completed,
                Err(err) => {
                    warn!(job = %job.id, error = %err, "publish failed");
                    JobStatus::Failed
                }
            },
            JobOutcome::Failed => JobStatus::Failed,
            JobOutcome::Killed => JobStatus::Killed,
        };

        self.finish(&job.id, final_status)?;
        Ok(match final_status {
            JobStatus::Completed => JobOutcome::Completed,
            JobStatus::Killed => JobOutcome::Killed,
            _ => JobOutcome::Failed,
        })
    }

    /// Step 1: claim the job, flip it to RUNNING, and record its start time.
    fn bind(&self) -> EngineResult<(Job, Task)> {
        let job = self
            .store
            .jobs_of(&self.task_id)
            .into_iter()
            .find(|j| j.job_index == self.job_index)
            .ok_or_else(|| {
                EngineError::Existence(format!(
                    "no job at index {} for task {}",
                    self.job_index, self.task_id
                ))
            })?;
        let task = self
            .store
            .get_task(&self.task_id)
            .ok_or_else(|| EngineError::Existence(format!("unknown task {}", self.task_id)))?;

        let now_ms = self.clock.now_ms();
        store_err(self.store.set_job_status(&job.id, JobStatus::Running, now_ms))?;
        store_err(self.store.start_job(&job.id, now_ms))?;
        info!(job = %job.id, task = %self.task_id, "job bound and running");
        Ok((job, task))
    }

    /// Step 2: build the workarea's symlinks and substitute the command
    /// template's placeholders.
    fn stage(&self, task: &Task, job: &Job) -> EngineResult<String> {
        let workarea = self.volume.job_workarea(&job.id).map_err(|e| EngineError::Content(e.to_string()))?;
        let mut substitutions: HashMap<String, String> = HashMap::new();

        if let Some(input_name) = &task.spec.input {
            if !self.file_id.is_empty() {
                let dataset_id = self
                    .store
                    .dataset_id_by_name(input_name)
                    .ok_or_else(|| EngineError::Existence(format!("unknown input dataset {input_name}")))?;
                let file = self
                    .store
                    .get_file(&FileId::new(self.file_id.clone()))
                    .ok_or_else(|| EngineError::Existence(format!("unknown file {}", self.file_id)))?;
                let link = stage_input_file(&self.volume, &workarea, &dataset_id, DatasetKind::Files, &file.filename)
                    .map_err(|e| EngineError::Content(e.to_string()))?;
                substitutions.insert("%IN".to_string(), link.display().to_string());
            }
        }

        for (key, dataset_name) in &task.spec.secondary_data {
            let dataset_id = self
                .store
                .dataset_id_by_name(dataset_name)
                .ok_or_else(|| EngineError::Existence(format!("unknown secondary dataset {dataset_name}")))?;
            let link = stage_secondary_dataset(&self.volume, &workarea, &dataset_id, DatasetKind::Files)
                .map_err(|e| EngineError::Content(e.to_string()))?;
            substitutions.insert(format!("%{key}"), link.display().to_string());
        }

        for (key, filename) in &task.spec.outputs {
            let name = format!("{}.{}", task.name, filename);
            let dataset_id = self
                .store
                .dataset_id_by_name(&name)
                .ok_or_else(|| EngineError::Existence(format!("unknown output dataset {name}")))?;
            let link = stage_output_file(&self.volume, &workarea, &dataset_id, DatasetKind::Files, filename)
                .map_err(|e| EngineError::Content(e.to_string()))?;
            substitutions.insert(format!("%{key}"), link.display().to_string());
        }

        placeholder::substitute(&task.spec.command, &substitutions).map_err(EngineError::Validation)
    }

    fn build_envs(&self, task: &Task, job: &Job) -> HashMap<String, String> {
        let mut envs = HashMap::new();
        envs.insert("JOB_ID".to_string(), job.id.to_string());
        envs.insert("JOB_WORKAREA".to_string(), job.workarea.clone());
        envs.insert("TF_CPP_MIN_LOG_LEVEL".to_string(), "3".to_string());
        envs.insert("CUDA_VISIBLE_ORDER".to_string(), "PCI_BUS_ID".to_string());
        envs.insert(
            "CUDA_VISIBLE_DEVICES".to_string(),
            std::env::var("CUDA_VISIBLE_DEVICES").unwrap_or_else(|_| "-1".to_string()),
        );
        let cpus = std::env::var("SLURM_CPUS_PER_TASK").unwrap_or_else(|_| "4".to_string());
        envs.insert("OMP_NUM_THREADS".to_string(), cpus.clone());
        envs.insert("SLURM_CPUS_PER_TASK".to_string(), cpus);
        envs.insert(
            "SLURM_MEM_PER_NODE".to_string(),
            std::env::var("SLURM_MEM_PER_NODE").unwrap_or_else(|_| "2048".to_string()),
        );
        for (key, value) in &task.spec.envs {
            envs.insert(key.clone(), value.clone());
        }
        envs
    }

    /// Step 4: poll the process tree to completion, pinging liveness and
    /// watching resource usage/external kill requests.
    fn supervise(&self, proc: &mut dyn SupervisedProcess, job: &Job) -> JobOutcome {
        let mut monitor = ResourceMonitor::new(
            self.tunables.dynamic_growth_pct,
            self.tunables.dynamic_memory_growth,
            self.tunables.job_ping_interval.as_secs_f64(),
        );
        let mut last_ping_ms = self.clock.now_ms();

        loop {
            match proc.try_wait() {
                Ok(Some(code)) => return if code == 0 { JobOutcome::Completed } else { JobOutcome::Failed },
                Ok(None) => {}
                Err(err) => {
                    warn!(job = %job.id, error = %err, "failed polling job process");
                    proc.kill_tree();
                    return JobOutcome::Failed;
                }
            }

            let now_ms = self.clock.now_ms();
            let sys_mb = proc.sys_memory_mb();
            let gpu_mb = proc.gpu_memory_mb();
            let outcome = monitor.sample(now_ms, sys_mb, gpu_mb, job.reserved_sys_memory_mb, job.reserved_gpu_memory_mb);

            if now_ms.saturating_sub(last_ping_ms) >= self.tunables.job_ping_interval.as_millis() as u64 {
                last_ping_ms = now_ms;
                let _ = self.store.ping_job(&job.id, now_ms);
                let _ = self.store.update_job_usage(&job.id, monitor.average_sys_memory_mb(), monitor.average_gpu_memory_mb());
            }

            if let Some(current) = self.store.get_job(&job.id) {
                if current.status == JobStatus::Kill {
                    proc.kill_tree();
                    return JobOutcome::Killed;
                }
            }

            if !outcome.healthy {
                if let Some(grow_sys) = outcome.grow_sys_memory_mb {
                    let grow_gpu = outcome.grow_gpu_memory_mb.unwrap_or(0.0);
                    let _ = self.store.grow_job_reservation(
                        &job.id,
                        job.reserved_sys_memory_mb + grow_sys,
                        job.reserved_gpu_memory_mb + grow_gpu,
                    );
                } else {
                    warn!(job = %job.id, "resource reservation breached, killing job");
                    proc.kill_tree();
                    return JobOutcome::Failed;
                }
            }

            self.clock.sleep_ms(self.tunables.monitor_tick.as_millis() as u64);
        }
    }

    /// Step 5: register each output file in its (already materialized,
    /// write-through-symlinked) dataset.
    fn publish(&self, task: &Task, job: &Job) -> EngineResult<()> {
        for filename in task.spec.outputs.values() {
            let name = format!("{}.{}", task.name, filename);
            let dataset_id = self
                .store
                .dataset_id_by_name(&name)
                .ok_or_else(|| EngineError::Existence(format!("unknown output dataset {name}")))?;
            let path = self.volume.dataset_basepath(&dataset_id, DatasetKind::Files).join(filename);
            if !path.exists() {
                return Err(EngineError::JobExecution(format!("job {} did not produce {filename}", job.id)));
            }
            let digest = md5_of_file(&path).map_err(|e| EngineError::Content(e.to_string()))?;
            store_err(self.store.append_file(File::data(FileId::new(self.ids.next()), dataset_id, filename.clone(), digest)))?;
        }
        Ok(())
    }

    /// Step 6: flip the job to its terminal status and ping one last time.
    fn finish(&self, job_id: &JobId, status: JobStatus) -> EngineResult<()> {
        let now_ms = self.clock.now_ms();
        store_err(self.store.set_job_status(job_id, status, now_ms))?;
        store_err(self.store.ping_job(job_id, now_ms))?;
        info!(job = %job_id, status = ?status, "job finished");
        Ok(())
    }
}

fn store_err<T>(r: Result<T, batchflow_store::WalError>) -> EngineResult<T> {
    r.map_err(|e| EngineError::Content(e.to_string()))
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
