// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG manager (C7, §4.7): validates a proposed task group in ordered
//! phases, failing the whole group atomically, then later materializes a
//! PRE_REGISTERED task's jobs once its parents are ready.

use crate::placeholder::validate_declared_keys;
use batchflow_content::Volume;
use batchflow_core::{
    Dataset, DatasetId, DatasetKind, EngineError, EngineResult, IdGen, Job, Task, TaskId,
    TaskSpec, TaskStatus, UserId,
};
use batchflow_store::Store;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One task's worth of a submitted `TaskInputs` DTO (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInputs {
    pub name: String,
    pub owner: UserId,
    pub partition: String,
    pub priority: i32,
    pub spec: TaskSpec,
}

/// Validate a task group (§4.7 phases 1-7) and, on success, insert every
/// task as PRE_REGISTERED with parent edges resolved from the group's
/// internal input/secondary -> producing-task mapping. Returns the new
/// task ids in submission order.
pub fn validate_and_register_group(
    store: &Store,
    ids: &impl IdGen,
    group: &[TaskInputs],
) -> EngineResult<Vec<TaskId>> {
    // Phase 1: collect the group's own output namespace (derived dataset
    // name -> producing task name), detecting in-group collisions along
    // the way (phase 7's "not produced by multiple tasks in the group").
    let mut group_outputs: HashMap<String, String> = HashMap::new();
    let mut seen_names: HashSet<&str> = HashSet::new();
    for inputs in group {
        if !seen_names.insert(inputs.name.as_str()) {
            return Err(EngineError::Validation(format!(
                "duplicate task name in group: {}",
                inputs.name
            )));
        }
        if inputs.spec.outputs.is_empty() {
            return Err(EngineError::Validation(format!(
                "task {} declares no outputs",
                inputs.name
            )));
        }
        for filename in inputs.spec.outputs.values() {
            let derived = format!("{}.{}", inputs.name, filename);
            if group_outputs.insert(derived.clone(), inputs.name.clone()).is_some() {
                return Err(EngineError::Validation(format!(
                    "output {derived} produced by more than one task in the group"
                )));
            }
        }
    }

    for inputs in group {
        // Phase 2: name rule.
        let owner = store
            .get_user(&inputs.owner)
            .ok_or_else(|| EngineError::Existence(format!("unknown user {}", inputs.owner)))?;
        let required_prefix = format!("user.{}.", owner.name);
        if !inputs.name.starts_with(&required_prefix) {
            return Err(EngineError::Validation(format!(
                "task name {} must start with {required_prefix}",
                inputs.name
            )));
        }

        // Phase 3: uniqueness against the store (in-group already checked above).
        if store.task_name_exists(&inputs.name) {
            return Err(EngineError::Validation(format!(
                "duplicate task name: {}",
                inputs.name
            )));
        }

        // Phase 4: image dataset exists.
        let image = store
            .get_dataset(
                &store
                    .dataset_id_by_name(&inputs.spec.image)
                    .ok_or_else(|| {
                        EngineError::Existence(format!("unknown image dataset {}", inputs.spec.image))
                    })?,
            )
            .ok_or_else(|| EngineError::Existence(format!("unknown image dataset {}", inputs.spec.image)))?;
        if image.kind != DatasetKind::Image {
            return Err(EngineError::Validation(format!(
                "dataset {} is not an image dataset",
                inputs.spec.image
            )));
        }

        // Phase 5: input is empty, an existing dataset, or a group output.
        if let Some(input_name) = &inputs.spec.input {
            let exists_in_store = store.dataset_name_exists(input_name);
            let exists_in_group = group_outputs.contains_key(input_name);
            if !exists_in_store && !exists_in_group {
                return Err(EngineError::Existence(format!(
                    "input dataset {input_name} not found in store or group outputs"
                )));
            }
        }

        // Phase 6: secondary inputs.
        let secondary_keys: Vec<String> = inputs.spec.secondary_data.keys().cloned().collect();
        let output_keys: Vec<String> = inputs.spec.outputs.keys().cloned().collect();
        validate_declared_keys(
            &inputs.spec.command,
            inputs.spec.input.is_some(),
            &output_keys,
            &secondary_keys,
        )
        .map_err(EngineError::Validation)?;
        for dataset_name in inputs.spec.secondary_data.values() {
            let exists_in_store = store.dataset_name_exists(dataset_name);
            let exists_in_group = group_outputs.contains_key(dataset_name);
            if !exists_in_store && !exists_in_group {
                return Err(EngineError::Existence(format!(
                    "secondary dataset {dataset_name} not found in store or group outputs"
                )));
            }
        }
    }

    // All phases passed: insert tasks with resolved parent edges.
    let mut task_ids = Vec::with_capacity(group.len());
    for inputs in group {
        let mut parents: Vec<String> = Vec::new();
        if let Some(input_name) = &inputs.spec.input {
            if let Some(producer) = group_outputs.get(input_name) {
                parents.push(producer.clone());
            }
        }
        for dataset_name in inputs.spec.secondary_data.values() {
            if let Some(producer) = group_outputs.get(dataset_name) {
                if !parents.contains(producer) {
                    parents.push(producer.clone());
                }
            }
        }

        let task_id = TaskId::new(ids.next());
        let task = Task::new(
            task_id.clone(),
            inputs.name.clone(),
            inputs.owner.clone(),
            inputs.partition.clone(),
            inputs.priority,
            inputs.spec.clone(),
            parents.clone(),
        );
        store.create_task(task).map_err(|e| EngineError::Content(e.to_string()))?;
        for parent in &parents {
            store
                .add_edge(parent.clone(), inputs.name.clone())
                .map_err(|e| EngineError::Content(e.to_string()))?;
        }
        task_ids.push(task_id);
    }

    Ok(task_ids)
}

/// Materialize a PRE_REGISTERED task once its parents are all
/// {COMPLETED, FINALIZED} (invoked by the admission loop, §4.4 step 1):
/// recheck referenced datasets, create one empty output dataset per output
/// key, build one job per input file (or the sentinel job when the task has
/// no input), and flip the task to REGISTERED.
pub fn materialize_task(
    store: &Store,
    volume: &Volume,
    ids: &impl IdGen,
    clock_now_ms: u64,
    task_id: &TaskId,
) -> EngineResult<()> {
    let task = store
        .get_task(task_id)
        .ok_or_else(|| EngineError::Existence(format!("unknown task {task_id}")))?;

    for parent_name in &task.parents {
        let parent_id = store
            .task_id_by_name(parent_name)
            .ok_or_else(|| EngineError::Existence(format!("unknown parent task {parent_name}")))?;
        let parent = store
            .get_task(&parent_id)
            .ok_or_else(|| EngineError::Existence(format!("unknown parent task {parent_name}")))?;
        if !matches!(parent.status, TaskStatus::Completed | TaskStatus::Finalized) {
            return Err(EngineError::Validation(format!(
                "parent not ready: task {parent_name} is {:?}",
                parent.status
            )));
        }
    }

    if let Some(input_name) = &task.spec.input {
        if !store.dataset_name_exists(input_name) {
            return Err(EngineError::Validation(format!(
                "parent not ready: input dataset {input_name} missing at materialization"
            )));
        }
    }
    for dataset_name in task.spec.secondary_data.values() {
        if !store.dataset_name_exists(dataset_name) {
            return Err(EngineError::Validation(format!(
                "parent not ready: secondary dataset {dataset_name} missing at materialization"
            )));
        }
    }

    for filename in task.spec.outputs.values() {
        let name = format!("{}.{}", task.name, filename);
        let dataset_id = DatasetId::new(ids.next());
        volume
            .mkdir_dataset(&dataset_id, DatasetKind::Files)
            .map_err(|e| EngineError::Content(e.to_string()))?;
        let dataset = Dataset::new(dataset_id, name, DatasetKind::Files, task.owner.clone());
        store
            .create_dataset(dataset)
            .map_err(|e| EngineError::Content(e.to_string()))?;
    }

    let input_file_ids: Vec<String> = match &task.spec.input {
        Some(input_name) => {
            let dataset_id = store
                .dataset_id_by_name(input_name)
                .ok_or_else(|| EngineError::Existence(format!("unknown input dataset {input_name}")))?;
            let dataset = store
                .get_dataset(&dataset_id)
                .ok_or_else(|| EngineError::Existence(format!("unknown input dataset {input_name}")))?;
            dataset.files.iter().map(|f| f.as_str().to_string()).collect()
        }
        None => vec![String::new()],
    };

    for (job_index, file_id) in input_file_ids.iter().enumerate() {
        let job_id = batchflow_core::JobId::new(ids.next());
        let workarea = volume
            .job_workarea(&job_id)
            .map_err(|e| EngineError::Content(e.to_string()))?;
        let command = format!(
            "batchflow job --task-id {} --job-index {} --file-id {}",
            task.id, job_index, file_id
        );
        let job = Job::new(
            job_id,
            task.id.clone(),
            job_index as u32,
            command,
            workarea.display().to_string(),
            task.priority,
            task.partition.clone(),
            clock_now_ms,
        );
        store
            .create_job(job)
            .map_err(|e| EngineError::Content(e.to_string()))?;
    }

    store
        .set_task_status(&task.id, TaskStatus::Registered)
        .map_err(|e| EngineError::Content(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
