// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Overridable engine constants (SPEC_FULL §9): `MAX_RETRY`, `STUCK_TIMEOUT`,
//! `PROCS`, and the dynamic-memory-growth `PCT` fraction, plus the per-loop
//! tick intervals of §5. `batchflow-daemon::Config` layers these under its
//! defaults -> TOML -> CLI flags -> env stack; this module supplies the
//! innermost (built-in default) layer and the env-var override, mirroring
//! the teacher's own `parse_duration_ms`-style helpers.

use batchflow_core::{DYNAMIC_GROWTH_PCT, MAX_RETRY, STUCK_TIMEOUT_SECS};
use std::time::Duration;

fn env_u64(var: &str) -> Option<u64> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

fn env_f64(var: &str) -> Option<f64> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

/// Tunable knobs for the admission loop, task scheduler, and job runner.
#[derive(Debug, Clone, Copy)]
pub struct Tunables {
    pub max_retry: u32,
    pub stuck_timeout_secs: u64,
    pub procs: usize,
    pub dynamic_growth_pct: f64,
    pub dynamic_memory_growth: bool,
    pub admission_tick: Duration,
    pub task_tick: Duration,
    pub job_ping_interval: Duration,
    pub monitor_tick: Duration,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            max_retry: MAX_RETRY,
            stuck_timeout_secs: STUCK_TIMEOUT_SECS,
            procs: 10,
            dynamic_growth_pct: DYNAMIC_GROWTH_PCT,
            dynamic_memory_growth: false,
            admission_tick: Duration::from_secs(10),
            task_tick: Duration::from_secs(1),
            job_ping_interval: Duration::from_secs(5),
            monitor_tick: Duration::from_secs(1),
        }
    }
}

impl Tunables {
    /// Apply `BATCHFLOW_*` environment overrides on top of the defaults.
    pub fn from_env() -> Self {
        let mut t = Self::default();
        if let Some(v) = env_u64("BATCHFLOW_MAX_RETRY") {
            t.max_retry = v as u32;
        }
        if let Some(v) = env_u64("BATCHFLOW_STUCK_TIMEOUT_SECS") {
            t.stuck_timeout_secs = v;
        }
        if let Some(v) = env_u64("BATCHFLOW_PROCS") {
            t.procs = v as usize;
        }
        if let Some(v) = env_f64("BATCHFLOW_DYNAMIC_GROWTH_PCT") {
            t.dynamic_growth_pct = v;
        }
        if let Ok(v) = std::env::var("BATCHFLOW_DYNAMIC_MEMORY_GROWTH") {
            t.dynamic_memory_growth = v == "1" || v.eq_ignore_ascii_case("true");
        }
        t
    }
}
