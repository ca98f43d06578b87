// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from the batch backend adapter (§4.6). Maps onto the `Backend` arm
/// of `batchflow_core::EngineError` at the engine boundary.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0}")]
    Submit(String),
    #[error("{0}")]
    Query(String),
    #[error("backend job {0} not found")]
    NotFound(i64),
}
