// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! batchflow execution engine: the DAG manager (C7), task scheduler (C5),
//! admission loop (C6), and job runner (C4) that drive tasks and jobs
//! through the transition tables of §4.3/§4.5 on top of a `batchflow-store`
//! `Store`, plus the task/dataset inspection read models in `info`.

pub mod admission;
pub mod dag;
pub mod info;
pub mod placeholder;
pub mod runner;
pub mod task_scheduler;
pub mod tunables;

pub use admission::AdmissionLoop;
pub use dag::{materialize_task, validate_and_register_group, TaskInputs};
pub use info::{describe_dataset, describe_task, list_datasets, list_tasks, DatasetFileInfo, DatasetInfo, TaskInfo};
pub use runner::{ContainerExecLauncher, JobOutcome, JobRunner, Launcher};
pub use task_scheduler::TaskScheduler;
pub use tunables::Tunables;
