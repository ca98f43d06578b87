// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A `Backend` that shells out to the SLURM CLI (`sbatch`/`squeue`/`scancel`/
//! `sinfo`), grounded on `maestro/backend.py`'s `SlurmService`.

use crate::backend::{Backend, JobDescription, SubmitRequest};
use crate::env::slurm_bin;
use crate::error::BackendError;
use crate::job_logger::JobLogger;
use crate::subprocess::{run_with_timeout, CANCEL_TIMEOUT, QUERY_TIMEOUT, SUBMIT_TIMEOUT};
use async_trait::async_trait;
use std::io::Write;
use tokio::process::Command;
use tracing::{info, warn};

pub struct SlurmBackend {
    account: String,
    reservation: Option<String>,
}

impl SlurmBackend {
    pub fn new(account: impl Into<String>, reservation: Option<String>) -> Self {
        Self {
            account: account.into(),
            reservation,
        }
    }

    fn batch_script(&self, req: &SubmitRequest<'_>) -> String {
        let mut script = String::new();
        script.push_str("#!/bin/bash\n");
        script.push_str("#SBATCH --ntasks=1\n");
        script.push_str(&format!("#SBATCH --cpus-per-task={}\n", req.cpus));
        script.push_str(&format!("#SBATCH --account={}\n", self.account));
        script.push_str(&format!("#SBATCH --partition={}\n", req.partition));
        if let Some(reservation) = &self.reservation {
            script.push_str(&format!("#SBATCH --reservation={reservation}\n"));
        }
        script.push_str(&format!("#SBATCH --job-name={}\n", req.jobname));
        script.push_str(&format!("#SBATCH --output={}/output.out\n", req.workarea));
        script.push_str(&format!("#SBATCH --error={}/output.err\n", req.workarea));
        let mem_per_cpu = (req.mem_mb / req.cpus.max(1) as f64).ceil() as u64;
        script.push_str(&format!("#SBATCH --mem-per-cpu={mem_per_cpu}\n"));

        for (key, value) in req.envs {
            script.push_str(&format!("export {key}='{value}'\n"));
        }
        if let Some(venv) = req.venv {
            script.push_str(&format!("source {venv}/bin/activate\n"));
        }
        script.push_str("echo Node: $SLURM_JOB_NODELIST\n");
        script.push_str("export OMP_NUM_THREADS=$SLURM_CPUS_PER_TASK\n");
        script.push_str(&format!("{} > {}/output.log\n", req.command, req.workarea));
        script.push_str("wait\n");
        script
    }
}

#[async_trait]
impl Backend for SlurmBackend {
    async fn has_available(
        &self,
        partition: &str,
        cpus: u32,
        memory_mb: f64,
    ) -> Result<bool, BackendError> {
        let mut cmd = Command::new(slurm_bin("sinfo"));
        cmd.args(["-h", "-p", partition, "-N", "-o", "%C %m"]);
        let output = run_with_timeout(cmd, QUERY_TIMEOUT, "sinfo")
            .await
            .map_err(BackendError::Query)?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            let mut parts = line.split_whitespace();
            let Some(cpu_field) = parts.next() else {
                continue;
            };
            let Some(mem_field) = parts.next() else {
                continue;
            };
            // %C is "allocated/idle/other/total"
            let idle_cpus: u32 = cpu_field
                .split('/')
                .nth(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            let total_mem_mb: f64 = mem_field.parse().unwrap_or(0.0);
            if idle_cpus >= cpus && total_mem_mb >= memory_mb {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn submit(&self, req: SubmitRequest<'_>) -> Result<(i64, String), BackendError> {
        let script = self.batch_script(&req);

        let mut tmp = tempfile::NamedTempFile::new()
            .map_err(|e| BackendError::Submit(format!("failed to create batch script: {e}")))?;
        tmp.write_all(script.as_bytes())
            .map_err(|e| BackendError::Submit(format!("failed to write batch script: {e}")))?;
        tmp.flush()
            .map_err(|e| BackendError::Submit(format!("failed to flush batch script: {e}")))?;

        let mut cmd = Command::new(slurm_bin("sbatch"));
        cmd.arg(tmp.path());
        let output = run_with_timeout(cmd, SUBMIT_TIMEOUT, "sbatch")
            .await
            .map_err(BackendError::Submit)?;

        if !output.status.success() {
            return Err(BackendError::Submit(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let backend_job_id: i64 = stdout
            .trim()
            .split_whitespace()
            .next_back()
            .and_then(|tok| tok.parse().ok())
            .ok_or_else(|| {
                BackendError::Submit(format!("could not parse job id from sbatch output: {stdout}"))
            })?;

        let state = self.status(backend_job_id).await?.unwrap_or_default();
        info!(backend_job_id, jobname = req.jobname, "submitted job");

        JobLogger::spawn(backend_job_id, req.workarea.to_string(), req.jobname.to_string());

        Ok((backend_job_id, state))
    }

    async fn status(&self, backend_job_id: i64) -> Result<Option<String>, BackendError> {
        let mut cmd = Command::new(slurm_bin("squeue"));
        cmd.args(["-h", "-j", &backend_job_id.to_string(), "-o", "%T"]);
        let output = run_with_timeout(cmd, QUERY_TIMEOUT, "squeue")
            .await
            .map_err(BackendError::Query)?;

        let state = String::from_utf8_lossy(&output.stdout).trim().to_lowercase();
        if state.is_empty() {
            Ok(None)
        } else {
            Ok(Some(state))
        }
    }

    async fn cancel(&self, backend_job_id: i64) -> Result<bool, BackendError> {
        if self.status(backend_job_id).await?.is_none() {
            return Ok(false);
        }
        let mut cmd = Command::new(slurm_bin("scancel"));
        cmd.arg(backend_job_id.to_string());
        let output = run_with_timeout(cmd, CANCEL_TIMEOUT, "scancel")
            .await
            .map_err(BackendError::Query)?;
        if !output.status.success() {
            warn!(backend_job_id, "scancel reported failure");
        }
        Ok(output.status.success())
    }

    async fn describe(&self, backend_job_id: i64) -> Result<Option<JobDescription>, BackendError> {
        let mut cmd = Command::new(slurm_bin("squeue"));
        cmd.args(["-h", "-j", &backend_job_id.to_string(), "-o", "%T %j"]);
        let output = run_with_timeout(cmd, QUERY_TIMEOUT, "squeue")
            .await
            .map_err(BackendError::Query)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let mut parts = line.splitn(2, ' ');
        let state = parts.next().unwrap_or_default().to_lowercase();
        let name = parts.next().unwrap_or_default().to_string();
        Ok(Some(JobDescription {
            backend_job_id,
            state,
            name,
        }))
    }

    async fn cancel_with(&self, name_prefix: &str, state: &str) -> Result<(), BackendError> {
        let mut cmd = Command::new(slurm_bin("squeue"));
        cmd.args(["-h", "-o", "%i %j %T"]);
        let output = run_with_timeout(cmd, QUERY_TIMEOUT, "squeue")
            .await
            .map_err(BackendError::Query)?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            let mut parts = line.split_whitespace();
            let (Some(id), Some(name), Some(job_state)) =
                (parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            if name.contains(name_prefix) && job_state.eq_ignore_ascii_case(state) {
                if let Ok(backend_job_id) = id.parse::<i64>() {
                    self.cancel(backend_job_id).await?;
                }
            }
        }
        Ok(())
    }
}
