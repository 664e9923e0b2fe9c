// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory registry of live executions.
//!
//! One entry per task currently holding a slot. The registry is the
//! authority for "is this task running"; the `in-progress` partition on disk
//! is reconciled against it. All operations take one lock and never touch
//! I/O, so holding it across any await point is unnecessary and forbidden.

use drover_core::TaskId;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Live-execution bookkeeping for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEntry {
    pub task_id: TaskId,
    pub execution_id: String,
    pub agent_tag: String,
    /// Agent-service run handle, known only after the run starts.
    pub run_id: Option<String>,
    pub reserved_at_ms: u64,
    /// Instant after which the watchdog may kill the run.
    pub deadline_ms: u64,
    pub timed_out: bool,
}

#[derive(Default)]
pub struct ExecutionRegistry {
    inner: RwLock<HashMap<TaskId, ExecutionEntry>>,
}

impl ExecutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for a task before its run exists.
    ///
    /// Re-reserving a tracked task refreshes its agent tag but keeps the
    /// original reservation time and deadline, so a retry path can never
    /// extend a task's timeout window.
    pub fn reserve(
        &self,
        task_id: &TaskId,
        execution_id: &str,
        agent_tag: &str,
        reserved_at_ms: u64,
        deadline_ms: u64,
    ) {
        self.inner
            .write()
            .entry(task_id.clone())
            .and_modify(|entry| entry.agent_tag = agent_tag.to_string())
            .or_insert_with(|| ExecutionEntry {
                task_id: task_id.clone(),
                execution_id: execution_id.to_string(),
                agent_tag: agent_tag.to_string(),
                run_id: None,
                reserved_at_ms,
                deadline_ms,
                timed_out: false,
            });
    }

    /// Attach the agent-service run handle once the run has started.
    pub fn register_run_id(&self, task_id: &TaskId, run_id: &str) {
        if let Some(entry) = self.inner.write().get_mut(task_id) {
            entry.run_id = Some(run_id.to_string());
        }
    }

    /// Release the task's slot. Idempotent; returns the entry if one was
    /// tracked.
    pub fn unregister(&self, task_id: &TaskId) -> Option<ExecutionEntry> {
        self.inner.write().remove(task_id)
    }

    pub fn get(&self, task_id: &TaskId) -> Option<ExecutionEntry> {
        self.inner.read().get(task_id).cloned()
    }

    pub fn is_running(&self, task_id: &TaskId) -> bool {
        self.inner.read().contains_key(task_id)
    }

    pub fn running_ids(&self) -> Vec<TaskId> {
        self.inner.read().keys().cloned().collect()
    }

    /// Running task ids as a set, for membership checks during a tick.
    pub fn running_id_set(&self) -> HashSet<TaskId> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.inner.read().len()
    }

    pub fn snapshot(&self) -> Vec<ExecutionEntry> {
        self.inner.read().values().cloned().collect()
    }

    /// Entries whose deadline has passed and which have not yet been marked.
    pub fn timed_out(&self, now_ms: u64) -> Vec<ExecutionEntry> {
        self.inner
            .read()
            .values()
            .filter(|e| !e.timed_out && e.deadline_ms <= now_ms)
            .cloned()
            .collect()
    }

    /// Mark an entry so repeated watchdog scans do not re-kill it.
    pub fn mark_timed_out(&self, task_id: &TaskId) {
        if let Some(entry) = self.inner.write().get_mut(task_id) {
            entry.timed_out = true;
        }
    }

    /// Drop all entries; returns how many were tracked.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let count = inner.len();
        inner.clear();
        count
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
