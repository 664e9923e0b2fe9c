// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-storage: status-partitioned task persistence.
//!
//! Tasks live as `{queue_dir}/{status}/{task_id}.json`. The store is the
//! single source of truth for what exists; moves between status partitions
//! are atomic (stage-then-delete) and duplicate presence after a crash is
//! resolved newest-wins.

mod error;
mod fs;
mod store;

pub use error::StorageError;
pub use fs::FsTaskStore;
pub use store::TaskStore;
