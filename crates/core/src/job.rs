// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Job entity (§3, §4.5).

use crate::ids::{JobId, TaskId};
use serde::{Deserialize, Serialize};

pub const MAX_RETRY: u32 = 5;
pub const STUCK_TIMEOUT_SECS: u64 = 5 * 60;
pub const DYNAMIC_GROWTH_PCT: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Registered,
    Assigned,
    Pending,
    Running,
    Completed,
    Failed,
    Kill,
    Killed,
    Broken,
}

impl JobStatus {
    pub fn is_final(self) -> bool {
        matches!(
            self,
            JobStatus::Broken | JobStatus::Failed | JobStatus::Killed | JobStatus::Completed
        )
    }

    /// Whether a job in this status is permitted to hold a backend job id
    /// (invariant 3 of §3).
    pub fn may_hold_backend_id(self) -> bool {
        matches!(self, JobStatus::Assigned | JobStatus::Pending | JobStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Gpu,
}

impl Default for Device {
    fn default() -> Self {
        Device::Cpu
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub task: TaskId,
    pub job_index: u32,
    pub command: String,
    pub workarea: String,
    pub priority: i32,
    pub device: Device,
    pub retry: u32,
    pub partition: String,
    pub status: JobStatus,

    pub backend_job_id: i64,
    pub backend_state: String,

    pub reserved_cpu_number: u32,
    pub reserved_sys_memory_mb: f64,
    pub reserved_gpu_memory_mb: f64,
    pub used_sys_memory_mb: f64,
    pub used_gpu_memory_mb: f64,

    /// Milliseconds since epoch; `None` until the job starts running.
    pub start_time_ms: Option<u64>,
    /// Last-ping timestamp (ms since epoch), used to detect stuck workers.
    pub updated_time_ms: u64,
}

impl Job {
    pub fn new(
        id: JobId,
        task: TaskId,
        job_index: u32,
        command: impl Into<String>,
        workarea: impl Into<String>,
        priority: i32,
        partition: impl Into<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            task,
            job_index,
            command: command.into(),
            workarea: workarea.into(),
            priority,
            device: Device::Cpu,
            retry: 0,
            partition: partition.into(),
            status: JobStatus::Registered,
            backend_job_id: -1,
            backend_state: String::new(),
            reserved_cpu_number: 4,
            reserved_sys_memory_mb: 0.0,
            reserved_gpu_memory_mb: 0.0,
            used_sys_memory_mb: 0.0,
            used_gpu_memory_mb: 0.0,
            start_time_ms: None,
            updated_time_ms: now_ms,
        }
    }

    pub fn ping(&mut self, now_ms: u64) {
        self.updated_time_ms = now_ms;
    }

    pub fn is_alive(&self, now_ms: u64, stuck_timeout_secs: u64) -> bool {
        now_ms.saturating_sub(self.updated_time_ms) < stuck_timeout_secs * 1000
    }

    pub fn reset_for_reassignment(&mut self, now_ms: u64) {
        self.status = JobStatus::Assigned;
        self.backend_job_id = -1;
        self.backend_state.clear();
        self.ping(now_ms);
    }
}
