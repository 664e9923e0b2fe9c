// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The storage contract the orchestrator consumes.

use crate::error::StorageError;
use drover_core::{Task, TaskId, TaskStatus};

/// Status-partitioned task persistence.
///
/// Implementations must make [`TaskStore::move_task_to`] observably
/// transactional: at any instant a task occupies exactly one status
/// partition (between calls). The orchestrator's reconciler relies on this.
///
/// All operations are blocking filesystem I/O; callers on async workers go
/// through `spawn_blocking`-free direct calls since writes are small and
/// infrequent.
pub trait TaskStore: Send + Sync + 'static {
    /// All task records currently in the given status partition.
    fn list(&self, status: TaskStatus) -> Result<Vec<Task>, StorageError>;

    /// Persist the task body into the given partition, removing any copy
    /// the task may have left in another partition.
    fn save(&self, task: &Task, status: TaskStatus) -> Result<(), StorageError>;

    /// Persist the task body without scanning other partitions. Used right
    /// after [`TaskStore::move_task_to`], which already guarantees the task
    /// exists only in the destination.
    fn save_skip_cleanup(&self, task: &Task, status: TaskStatus) -> Result<(), StorageError>;

    /// Atomically move a task to a new status partition.
    ///
    /// Returns the task body (status mirror updated) and the partition it
    /// was found in.
    fn move_task_to(
        &self,
        task_id: &TaskId,
        to: TaskStatus,
    ) -> Result<(Task, TaskStatus), StorageError>;

    /// Legacy two-arg move; fails if the task is not in `from`.
    fn move_task(
        &self,
        task_id: &TaskId,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<(), StorageError>;

    /// The partition the task currently occupies, if any.
    fn current_status(&self, task_id: &TaskId) -> Result<Option<TaskStatus>, StorageError>;

    /// Load a task body by ID from whichever partition holds it.
    fn get(&self, task_id: &TaskId) -> Result<Option<Task>, StorageError>;
}
