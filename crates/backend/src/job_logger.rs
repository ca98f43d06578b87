// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tails a submitted job's `output.log`, mirroring new lines tagged with
//! the job name, matching `maestro/backend.py:JobLogger` (§10.6). Purely
//! observability — logged via `tracing`, not surfaced to the engine.

use crate::env::{job_logger_poll_ms, slurm_bin};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::info;

const TERMINAL_STATES: &[&str] = &[
    "failed",
    "completed",
    "stopped",
    "suspended",
    "cancelled",
];

pub struct JobLogger;

impl JobLogger {
    /// Spawn a detached background task that polls `backend_job_id`'s state
    /// until it reaches a terminal state, tailing `output.log` on every poll.
    pub fn spawn(backend_job_id: i64, workarea: String, jobname: String) {
        tokio::spawn(async move {
            let log_path = PathBuf::from(&workarea).join("output.log");
            let mut current_line = 0usize;
            loop {
                tokio::time::sleep(job_logger_poll_ms()).await;
                tail_once(&log_path, &jobname, &mut current_line).await;

                match query_state(backend_job_id).await {
                    Some(state) if !TERMINAL_STATES.contains(&state.as_str()) => continue,
                    _ => break,
                }
            }
        });
    }
}

async fn tail_once(log_path: &PathBuf, jobname: &str, current_line: &mut usize) {
    let Ok(contents) = tokio::fs::read_to_string(log_path).await else {
        return;
    };
    let lines: Vec<&str> = contents.lines().collect();
    for line in lines.iter().skip(*current_line) {
        if line.contains(jobname) {
            info!(jobname, "{line}");
        }
    }
    *current_line = lines.len().saturating_sub(1).max(0);
}

async fn query_state(backend_job_id: i64) -> Option<String> {
    let mut cmd = Command::new(slurm_bin("squeue"));
    cmd.args(["-h", "-j", &backend_job_id.to_string(), "-o", "%T"]);
    let output = cmd.output().await.ok()?;
    let state = String::from_utf8_lossy(&output.stdout).trim().to_lowercase();
    if state.is_empty() {
        None
    } else {
        Some(state)
    }
}
