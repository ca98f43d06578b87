// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the backend crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Interval at which `JobLogger` re-reads a job's `output.log` (default: 5000ms).
pub fn job_logger_poll_ms() -> Duration {
    parse_duration_ms("BATCHFLOW_JOB_LOGGER_POLL_MS").unwrap_or(Duration::from_secs(5))
}

/// Override for the `sbatch`/`squeue`/`scancel` binary names, for test
/// environments that stub them out under a different `PATH` entry.
pub fn slurm_bin(name: &str) -> String {
    let var = format!("BATCHFLOW_{}_BIN", name.to_uppercase());
    std::env::var(&var).unwrap_or_else(|_| name.to_string())
}
