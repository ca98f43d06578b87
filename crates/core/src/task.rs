// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Task entity and its specification (§3, §4.7).

use crate::ids::{TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Internal status, driven by the transition table of §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    PreRegistered,
    Registered,
    Assigned,
    Running,
    Testing,
    Completed,
    Finalized,
    Failed,
    Kill,
    Killed,
    Broken,
    Removed,
}

impl TaskStatus {
    /// A status from which no further automatic transition occurs.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed
                | TaskStatus::Finalized
                | TaskStatus::Killed
                | TaskStatus::Broken
                | TaskStatus::Failed
        )
    }
}

/// An externally requested state, consumed by the scheduler on its next
/// tick. Dataset deletion (`Delete`) is represented for completeness of the
/// state space but is never produced or acted on by this engine (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalState {
    Waiting,
    Retry,
    Kill,
    Delete,
}

impl Default for ExternalState {
    fn default() -> Self {
        ExternalState::Waiting
    }
}

/// Resource requests attached to a task specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub cpu_cores: u32,
    pub memory_mb: f64,
    pub gpu_memory_mb: f64,
    pub device: String,
}

/// The user-declared specification of a task, submitted as part of a
/// `TaskInputs` DTO (§6) and stored verbatim on the Task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub command: String,
    pub image: String,
    pub input: Option<String>,
    /// output key -> filename
    pub outputs: HashMap<String, String>,
    /// secondary-input key -> dataset name
    pub secondary_data: HashMap<String, String>,
    pub binds: Vec<String>,
    pub envs: HashMap<String, String>,
    pub resources: ResourceRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// `user.<name>.<label>`
    pub name: String,
    pub owner: UserId,
    pub partition: String,
    pub priority: i32,
    pub spec: TaskSpec,
    pub parents: Vec<String>,
    pub status: TaskStatus,
    pub external_state: ExternalState,
}

impl Task {
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        owner: UserId,
        partition: impl Into<String>,
        priority: i32,
        spec: TaskSpec,
        parents: Vec<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            owner,
            partition: partition.into(),
            priority,
            spec,
            parents,
            status: TaskStatus::PreRegistered,
            external_state: ExternalState::Waiting,
        }
    }
}
