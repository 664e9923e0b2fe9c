// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation of the in-progress partition against live executions.
//!
//! After a crash or kill -9 the partition can hold tasks no worker owns;
//! they would otherwise sit in-progress forever. The reconciler re-queues
//! them, with a grace period so a task whose worker is mid-startup is left
//! alone, and with the agent sweep so a task an external (pre-restart)
//! agent is still working on is not double-started.

use super::Orchestrator;
use drover_agent::AgentService;
use drover_core::{Clock, TaskId, TaskStatus};
use drover_storage::TaskStore;
use tracing::{info, warn};

impl<S: TaskStore, A: AgentService, C: Clock> Orchestrator<S, A, C> {
    /// Full pass: sweep the agent service, then reconcile.
    pub async fn reconcile_pass(&self) -> Vec<TaskId> {
        let tags = self.sweep_agent_tags().await;
        self.reconcile_with_tags(&tags).await
    }

    /// Reconcile in-progress tasks against the registry and a sweep result.
    /// Returns the ids re-queued to pending.
    pub(crate) async fn reconcile_with_tags(&self, tags: &[String]) -> Vec<TaskId> {
        let in_progress = match self.inner.store.list(TaskStatus::InProgress) {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "failed to list in-progress tasks");
                return Vec::new();
            }
        };

        let external = self.external_task_ids(tags);
        let now_ms = self.inner.clock.epoch_ms();
        let grace_ms = self.inner.config.reconcile_grace.as_millis() as u64;
        let mut requeued = Vec::new();

        for mut task in in_progress {
            if task.id.is_empty() {
                warn!("skipping in-progress record with empty id");
                continue;
            }

            if let Some(entry) = self.inner.registry.get(&task.id) {
                // A live worker owns it. If it is overdue, stop the run;
                // the worker observes the cancellation and finalizes.
                if entry.deadline_ms <= now_ms && !entry.timed_out {
                    warn!(task_id = %task.id, "tracked execution past deadline, stopping run");
                    self.inner.registry.mark_timed_out(&task.id);
                    if let Some(run_id) = entry.run_id {
                        if let Err(e) = self.inner.agents.stop_run(&run_id).await {
                            warn!(run_id = %run_id, error = %e, "failed to stop overdue run");
                        }
                    }
                }
                continue;
            }

            if external.contains(&task.id) {
                // A stray agent (from before a restart) is still on it.
                continue;
            }

            let started_ms = task.started_at_ms.unwrap_or(task.updated_at_ms);
            if now_ms.saturating_sub(started_ms) < grace_ms {
                continue;
            }

            info!(task_id = %task.id, "re-queueing orphaned in-progress task");
            self.inner.task_logger.clear(&task.id);
            match self.finalize_task(&mut task, TaskStatus::Pending) {
                Ok(_) => requeued.push(task.id.clone()),
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "failed to re-queue orphaned task");
                }
            }
        }
        requeued
    }
}
