// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps dataset/job identifiers to paths under a single configured volume
//! (§4.2). This is the only place in the workspace that knows the on-disk
//! directory layout.

use crate::digest::md5_of_file;
use crate::error::ContentError;
use batchflow_core::{DatasetId, DatasetKind, JobId};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Root of the content volume, e.g. `/data/batchflow`.
#[derive(Debug, Clone)]
pub struct Volume {
    root: PathBuf,
}

impl Volume {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `{volume}/datasets/{id}` for a files dataset, `{volume}/images/{id}`
    /// for an image dataset.
    pub fn dataset_basepath(&self, id: &DatasetId, kind: DatasetKind) -> PathBuf {
        let subdir = match kind {
            DatasetKind::Files => "datasets",
            DatasetKind::Image => "images",
        };
        self.root.join(subdir).join(id.as_str())
    }

    /// `{volume}/jobs/{id}`, created idempotently.
    pub fn job_workarea(&self, id: &JobId) -> Result<PathBuf, ContentError> {
        let path = self.root.join("jobs").join(id.as_str());
        create_dir_idempotent(&path)?;
        Ok(path)
    }

    /// Create the dataset directory idempotently, returning its basepath.
    pub fn mkdir_dataset(
        &self,
        id: &DatasetId,
        kind: DatasetKind,
    ) -> Result<PathBuf, ContentError> {
        let path = self.dataset_basepath(id, kind);
        create_dir_idempotent(&path)?;
        Ok(path)
    }

    /// Whether `filename` already exists in the dataset directory.
    pub fn check_existence(&self, id: &DatasetId, kind: DatasetKind, filename: &str) -> bool {
        self.dataset_basepath(id, kind).join(filename).exists()
    }

    /// Move `src` into the dataset directory under `filename`, returning the
    /// file's md5 digest. If `expected_md5` is given, the digest of `src` is
    /// verified *before* the move and a mismatch leaves `src` untouched
    /// (§10.3: digest verification at registration).
    pub fn save(
        &self,
        id: &DatasetId,
        kind: DatasetKind,
        src: &Path,
        filename: &str,
        expected_md5: Option<&str>,
    ) -> Result<String, ContentError> {
        let computed = md5_of_file(src).map_err(|source| ContentError::Io {
            path: src.display().to_string(),
            source,
        })?;

        if let Some(expected) = expected_md5 {
            if expected != computed {
                return Err(ContentError::Md5Mismatch {
                    filename: filename.to_string(),
                    expected: expected.to_string(),
                    computed,
                });
            }
        }

        let basepath = self.mkdir_dataset(id, kind)?;
        let dest = basepath.join(filename);
        fs::rename(src, &dest).map_err(|source| ContentError::Io {
            path: dest.display().to_string(),
            source,
        })?;
        info!(dataset = %id, filename, "saved file into dataset");
        Ok(computed)
    }
}

fn create_dir_idempotent(path: &Path) -> Result<(), ContentError> {
    fs::create_dir_all(path).map_err(|source| ContentError::Io {
        path: path.display().to_string(),
        source,
    })
}
