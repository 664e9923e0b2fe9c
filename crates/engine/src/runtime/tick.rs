// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One scheduler pass: gate checks, reconcile, recycle, admit.

use super::Orchestrator;
use crate::error::EngineError;
use drover_agent::AgentService;
use drover_core::{Clock, Event, Task, TaskId, TaskStatus};
use drover_storage::TaskStore;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

impl<S: TaskStore, A: AgentService, C: Clock> Orchestrator<S, A, C> {
    /// Run one scheduling pass. Every step is best-effort: a failure in one
    /// stage logs and moves on, so a bad task can never wedge the loop.
    pub async fn tick(&self) {
        if self.inner.maintenance_paused.load(Ordering::SeqCst) {
            debug!("maintenance pause active, skipping tick");
            return;
        }

        let gate = self.inner.rate_limiter.check();
        if gate.paused {
            self.inner.bus.emit(Event::RateLimitPause {
                pause_until: gate.pause_until,
                remaining_secs: gate.remaining_secs,
            });
            return;
        }
        if gate.just_resumed {
            self.inner.bus.emit(Event::RateLimitResume);
        }

        self.inner.last_tick_ms.store(self.inner.clock.epoch_ms(), Ordering::SeqCst);

        // One sweep per tick; reconcile and the capacity count share it.
        let tags = self.sweep_agent_tags().await;
        self.reconcile_with_tags(&tags).await;
        self.recycle();

        let external = self.external_task_ids(&tags);
        let executing = self.inner.registry.count() + external.len();
        let slots = self.inner.config.slots;
        if executing >= slots {
            debug!(executing, slots, "slot pool full");
            return;
        }
        let mut available = slots - executing;

        let mut pending = match self.inner.store.list(TaskStatus::Pending) {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "failed to list pending tasks");
                return;
            }
        };
        let now_ms = self.inner.clock.epoch_ms();
        pending.retain(|t| {
            t.auto_requeue && !t.in_cooldown(now_ms) && !self.inner.registry.is_running(&t.id)
        });
        // Highest priority first; FIFO within a priority band.
        pending.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at_ms.cmp(&b.created_at_ms))
                .then(a.id.cmp(&b.id))
        });

        for task in pending {
            if available == 0 {
                break;
            }
            if self.admit(task).await.is_ok() {
                available -= 1;
            }
        }
    }

    /// Live agent tags under our prefix. A sweep failure degrades to "none
    /// visible"; reconcile's grace period covers the blind spot.
    pub(crate) async fn sweep_agent_tags(&self) -> Vec<String> {
        match self.inner.agents.list_agent_tags(&self.inner.config.tag_prefix()).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!(error = %e, "agent tag sweep failed");
                Vec::new()
            }
        }
    }

    /// Task ids of swept agents this process is not tracking. They occupy
    /// slots so a restarted daemon cannot over-subscribe the machine.
    pub(crate) fn external_task_ids(&self, tags: &[String]) -> HashSet<TaskId> {
        let prefix = self.inner.config.tag_prefix();
        tags.iter()
            .filter_map(|tag| tag.strip_prefix(prefix.as_str()))
            .map(TaskId::from)
            .filter(|id| !self.inner.registry.is_running(id))
            .collect()
    }

    /// Re-queue recycled tasks: completed or failed, auto-requeue enabled,
    /// cooldown lapsed.
    pub(crate) fn recycle(&self) {
        let now_ms = self.inner.clock.epoch_ms();
        for status in [TaskStatus::Completed, TaskStatus::Failed] {
            let tasks = match self.inner.store.list(status) {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!(status = %status, error = %e, "failed to list tasks for recycling");
                    continue;
                }
            };
            for mut task in tasks {
                if !task.auto_requeue || task.in_cooldown(now_ms) {
                    continue;
                }
                match self.finalize_task(&mut task, TaskStatus::Pending) {
                    Ok(_) => info!(task_id = %task.id, from = %status, "recycled task to pending"),
                    Err(e) => {
                        warn!(task_id = %task.id, error = %e, "failed to recycle task");
                    }
                }
            }
        }
    }

    /// Admit one pending task: move it to in-progress, reserve a slot, and
    /// spawn its execution worker. An error means admission failed before
    /// taking the slot.
    pub(crate) async fn admit(&self, candidate: Task) -> Result<(), EngineError> {
        self.admit_inner(candidate, false).await
    }

    pub(crate) async fn admit_inner(
        &self,
        candidate: Task,
        forced: bool,
    ) -> Result<(), EngineError> {
        let task_id = candidate.id.clone();
        let (mut task, from) = match self.inner.store.move_task_to(&task_id, TaskStatus::InProgress)
        {
            Ok(moved) => moved,
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "failed to move task to in-progress");
                return Err(e.into());
            }
        };

        let now_ms = self.inner.clock.epoch_ms();
        task.started_at_ms = Some(now_ms);
        task.updated_at_ms = now_ms;
        if let Err(e) = self.inner.store.save_skip_cleanup(&task, TaskStatus::InProgress) {
            warn!(task_id = %task_id, error = %e, "failed to stamp admitted task");
        }

        let execution_id = self.inner.exec_ids.next(&self.inner.clock);
        let agent_tag = self.inner.config.agent_tag(task_id.as_str());
        let timeout = self.inner.config.timeout_for(task.timeout_secs);
        let deadline_ms = now_ms + timeout.as_millis() as u64;
        self.inner.registry.reserve(&task_id, &execution_id, &agent_tag, now_ms, deadline_ms);

        self.inner.bus.emit(Event::TaskStatusChanged {
            task_id: task_id.clone(),
            old_status: from,
            new_status: TaskStatus::InProgress,
            task: Box::new(task.clone()),
        });
        info!(task_id = %task_id, execution_id = %execution_id, forced, "admitted task");

        let tracker = self.inner.loops.lock().as_ref().map(|guard| guard.tracker.clone());
        match tracker {
            Some(tracker) => {
                let this = self.clone();
                tracker.spawn(async move {
                    this.run_attempt(task, execution_id, agent_tag, deadline_ms).await;
                });
            }
            // Not started (tests drive ticks by hand): run inline.
            None => self.run_attempt(task, execution_id, agent_tag, deadline_ms).await,
        }
        Ok(())
    }
}
