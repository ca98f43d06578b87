// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Symlink staging for a job workarea (§4.2): one symlink per secondary
//! dataset (directory-level), one per input file (file-level, named to
//! encode the parent dataset), and one per output (file-level into the
//! workarea) so the user command's view is self-contained without copies.

use crate::error::ContentError;
use crate::volume::Volume;
use batchflow_core::{DatasetId, DatasetKind};
use std::path::{Path, PathBuf};

fn symlink(target: &Path, link: &Path) -> Result<(), ContentError> {
    if let Some(parent) = link.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ContentError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    std::os::unix::fs::symlink(target, link).map_err(|source| ContentError::Io {
        path: link.display().to_string(),
        source,
    })
}

/// Encode a dataset-qualified filename so files from different datasets
/// never collide inside a workarea.
pub fn staged_input_name(dataset_id: &DatasetId, filename: &str) -> String {
    format!("{}__{filename}", dataset_id.as_str())
}

/// One directory-level symlink for a whole secondary dataset.
pub fn stage_secondary_dataset(
    volume: &Volume,
    workarea: &Path,
    dataset_id: &DatasetId,
    kind: DatasetKind,
) -> Result<PathBuf, ContentError> {
    let target = volume.dataset_basepath(dataset_id, kind);
    let link = workarea.join(dataset_id.as_str());
    symlink(&target, &link)?;
    Ok(link)
}

/// One file-level symlink for a single input file.
pub fn stage_input_file(
    volume: &Volume,
    workarea: &Path,
    dataset_id: &DatasetId,
    kind: DatasetKind,
    filename: &str,
) -> Result<PathBuf, ContentError> {
    let target = volume.dataset_basepath(dataset_id, kind).join(filename);
    let link = workarea.join(staged_input_name(dataset_id, filename));
    symlink(&target, &link)?;
    Ok(link)
}

/// One file-level symlink into the workarea for an output, pointing at its
/// (empty, pre-materialized) target dataset so the job command writes
/// straight through to the final location.
pub fn stage_output_file(
    volume: &Volume,
    workarea: &Path,
    dataset_id: &DatasetId,
    kind: DatasetKind,
    filename: &str,
) -> Result<PathBuf, ContentError> {
    let target = volume.dataset_basepath(dataset_id, kind).join(filename);
    let link = workarea.join(filename);
    symlink(&target, &link)?;
    Ok(link)
}
