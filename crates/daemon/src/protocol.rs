// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for the Submission API (spec.md §6).
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload, same
//! framing the teacher's IPC protocol uses — no HTTP framework is in this
//! workspace's dependency stack, and nothing in the example pack reaches
//! for one for a local request/dispatch layer, so this keeps that shape
//! rather than adding a new dependency for it.

use batchflow_core::{Dataset, DatasetId, Task, TaskId};
use batchflow_engine::TaskInputs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Submit a task group (spec.md §4.7): validated and registered atomically.
    Submit { group: Vec<TaskInputs> },
    ListTasks,
    DescribeTask { task_id: TaskId },
    /// Request the task (and its jobs) be killed at the scheduler's next tick.
    CancelTask { task_id: TaskId },
    /// Request a failed task's jobs be retried at the scheduler's next tick.
    RetryTask { task_id: TaskId },
    ListDatasets,
    DescribeDataset { dataset_id: DatasetId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Submitted { task_ids: Vec<TaskId> },
    Tasks { tasks: Vec<Task> },
    Task { task: Task },
    Datasets { datasets: Vec<Dataset> },
    Dataset { dataset: Dataset },
    Ack,
    Error { message: String },
}
