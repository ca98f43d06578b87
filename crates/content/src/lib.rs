// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Content I/O (C2): maps dataset and job identifiers to paths under a
//! single configured volume, and stages the symlinks a job command sees
//! in its workarea (§4.2).

mod digest;
mod error;
mod staging;
mod volume;

pub use digest::md5_of_file;
pub use error::ContentError;
pub use staging::{stage_input_file, stage_output_file, stage_secondary_dataset, staged_input_name};
pub use volume::Volume;
