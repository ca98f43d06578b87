// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from content I/O (§4.2). Maps onto the `Content` arm of
/// `batchflow_core::EngineError` at the engine boundary.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("file already exists in dataset: {0}")]
    AlreadyExists(String),
    #[error("md5 mismatch for {filename}: expected {expected}, computed {computed}")]
    Md5Mismatch {
        filename: String,
        expected: String,
        computed: String,
    },
}
