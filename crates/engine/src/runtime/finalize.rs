// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic status finalization.

use super::Orchestrator;
use crate::error::EngineError;
use drover_agent::AgentService;
use drover_core::{Clock, Event, Task, TaskStatus};
use drover_storage::TaskStore;
use tracing::warn;

impl<S: TaskStore, A: AgentService, C: Clock> Orchestrator<S, A, C> {
    /// Move the task to its new status partition and persist the caller's
    /// body there, then broadcast the change. Returns the partition the
    /// task came from.
    ///
    /// The move is the transactional step; the follow-up save only refreshes
    /// the body inside the destination, so a crash between the two leaves a
    /// correctly-partitioned task with slightly stale fields.
    pub(crate) fn finalize_task(
        &self,
        task: &mut Task,
        to: TaskStatus,
    ) -> Result<TaskStatus, EngineError> {
        let (_, from) = self.inner.store.move_task_to(&task.id, to)?;
        task.status = to;
        task.updated_at_ms = self.inner.clock.epoch_ms();
        self.inner.store.save_skip_cleanup(task, to)?;

        match self.inner.store.current_status(&task.id) {
            Ok(Some(current)) if current == to => {}
            Ok(current) => {
                warn!(task_id = %task.id, expected = %to, ?current, "post-finalize status mismatch");
            }
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "post-finalize verification failed");
            }
        }

        self.inner.bus.emit(Event::TaskStatusChanged {
            task_id: task.id.clone(),
            old_status: from,
            new_status: to,
            task: Box::new(task.clone()),
        });
        Ok(from)
    }
}
