// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error kinds for the engine.
//!
//! The six semantic kinds below are raised by different components but
//! share one enum so the admission loop and task scheduler can log and
//! branch on kind without downcasting a component-local error type.

use thiserror::Error;

/// A semantic error kind, independent of which component raised it.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed DTO, name rule violation, missing referenced dataset or
    /// image, duplicate task/output name, missing placeholder in a command
    /// template. Raised synchronously at submission; never recoverable by
    /// retry.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown id or unauthorized token. Synchronous, client-facing.
    #[error("not found or unauthorized: {0}")]
    Existence(String),

    /// Submit failure or unreachable backend. The caller should leave the
    /// job in ASSIGNED with backend_id=-1 so the admission loop retries it
    /// next tick.
    #[error("transient backend error: {0}")]
    Backend(String),

    /// Non-zero exit, an exception inside the runner, or a memory-limit
    /// breach. Recoverable up to MAX_RETRY per job.
    #[error("job execution error: {0}")]
    JobExecution(String),

    /// Output file missing, move failure, digest mismatch on upload.
    #[error("storage/content error: {0}")]
    Content(String),

    /// Missing ping past STUCK_TIMEOUT. Reclaimed silently by
    /// reconciliation; this variant exists for logging, not propagation.
    #[error("stuck worker: {0}")]
    StuckWorker(String),
}

/// Result alias used throughout the engine crates.
pub type EngineResult<T> = Result<T, EngineError>;
