// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dataset and File entities (§3).

use crate::ids::{DatasetId, FileId, UserId};
use serde::{Deserialize, Serialize};

/// A dataset's data-kind tag: a plain file collection or a container image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatasetKind {
    Files,
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    /// `user.<name>.<label>` for user data, `<user>/<label>` for images.
    pub name: String,
    pub kind: DatasetKind,
    pub owner: UserId,
    pub files: Vec<FileId>,
}

impl Dataset {
    pub fn new(id: DatasetId, name: impl Into<String>, kind: DatasetKind, owner: UserId) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            owner,
            files: Vec::new(),
        }
    }
}

/// A file's storage-kind tag. A LINK file records an external path rather
/// than storing bytes under the engine's control; a DATA file is copied
/// into the dataset directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageKind {
    Data,
    Link,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: FileId,
    pub dataset: DatasetId,
    pub filename: String,
    pub md5: String,
    pub storage: StorageKind,
    /// Present only for LINK files: the external path the symlink resolves to.
    pub link_path: Option<String>,
}

impl File {
    pub fn data(id: FileId, dataset: DatasetId, filename: impl Into<String>, md5: impl Into<String>) -> Self {
        Self {
            id,
            dataset,
            filename: filename.into(),
            md5: md5.into(),
            storage: StorageKind::Data,
            link_path: None,
        }
    }

    pub fn link(
        id: FileId,
        dataset: DatasetId,
        filename: impl Into<String>,
        md5: impl Into<String>,
        link_path: impl Into<String>,
    ) -> Self {
        Self {
            id,
            dataset,
            filename: filename.into(),
            md5: md5.into(),
            storage: StorageKind::Link,
            link_path: Some(link_path.into()),
        }
    }
}
