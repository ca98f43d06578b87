// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newtype identifiers for every entity in the data model.

use crate::define_id;

define_id! {
    /// Stable identifier for a User.
    pub struct UserId;
}

define_id! {
    /// Stable identifier for a Dataset.
    pub struct DatasetId;
}

define_id! {
    /// Stable identifier for a File.
    pub struct FileId;
}

define_id! {
    /// Stable identifier for a Task.
    pub struct TaskId;
}

define_id! {
    /// Stable identifier for a Job.
    pub struct JobId;
}
