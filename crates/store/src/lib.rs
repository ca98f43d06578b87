// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Event-sourced storage layer: WAL + materialized state + snapshots.

pub mod checkpoint;
pub mod event;
mod handle;
mod snapshot;
mod state;
mod wal;

pub use checkpoint::{
    CheckpointError, CheckpointHandle, CheckpointResult, Checkpointer, CheckpointWriter,
    FsCheckpointWriter, load_snapshot,
};
pub use event::StoreEvent;
pub use handle::{Store, StoreOpenError};
pub use snapshot::{CURRENT_SNAPSHOT_VERSION, Snapshot, SnapshotError};
pub use state::MaterializedState;
pub use wal::{Wal, WalEntry, WalError};
