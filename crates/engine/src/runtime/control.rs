// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control surface: lifecycle, maintenance pause, force-start, diagnostics.

use super::{LoopGuard, Orchestrator};
use crate::error::EngineError;
use drover_agent::AgentService;
use drover_core::{Clock, TaskId, TaskStatus};
use drover_storage::TaskStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Snapshot of the queue for status surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    /// Whether the scheduler loops are running.
    pub processor_active: bool,
    /// Task count per status partition.
    pub statuses: BTreeMap<String, usize>,
    /// Ids of tasks currently holding slots.
    pub running: Vec<String>,
    pub slots: usize,
    /// Configured scheduler pass cadence, in seconds.
    pub refresh_interval_secs: u64,
    pub maintenance_paused: bool,
    pub rate_limited: bool,
    pub rate_limit_remaining_secs: u64,
    /// When the scheduler last completed a pass (unix ms; 0 before the
    /// first pass).
    pub last_tick_ms: u64,
}

/// Read-only preview of what [`Orchestrator::resume`] with reset would
/// touch, for an operator confirmation step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResumeDiagnostics {
    /// True when a reset would stop agents or move tasks.
    pub needs_confirmation: bool,
    pub rate_limit_paused: bool,
    /// Unix seconds when an active pause lifts.
    pub rate_limit_resume_at: Option<u64>,
    /// Live agent tags not tracked by this process.
    pub external_task_ids: Vec<String>,
    /// Executions this process is tracking.
    pub executing_task_ids: Vec<String>,
    /// In-progress on disk with no execution behind them anywhere.
    pub orphaned_task_ids: Vec<String>,
    pub notes: Vec<String>,
}

/// What a resume-with-reset actually did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResumeSummary {
    pub agents_stopped: usize,
    pub executions_cleared: usize,
    /// Process groups killed because a polite stop failed.
    pub processes_terminated: usize,
    pub requeued: Vec<String>,
    pub rate_limit_cleared: bool,
    /// Human-readable log of what the reset did, for the operator surface.
    pub actions_taken: Vec<String>,
}

impl<S: TaskStore, A: AgentService, C: Clock> Orchestrator<S, A, C> {
    /// Launch the scheduler loop, the watchdog, and the initial
    /// orphan-recovery pass. Idempotent.
    pub fn start(&self) {
        let mut loops = self.inner.loops.lock();
        if loops.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        {
            let this = self.clone();
            let cancel = cancel.clone();
            let interval = self.inner.config.tick_interval;
            tracker.spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        _ = ticker.tick() => {}
                        () = this.inner.wake.notified() => {}
                    }
                    this.tick().await;
                }
            });
        }

        {
            let this = self.clone();
            let cancel = cancel.clone();
            let interval = self.inner.config.watchdog_interval;
            tracker.spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        _ = ticker.tick() => {}
                    }
                    this.watchdog_scan().await;
                }
            });
        }

        {
            let this = self.clone();
            let cancel = cancel.clone();
            let delay = self.inner.config.initial_reconcile_delay;
            tracker.spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(delay) => {}
                }
                let requeued = this.reconcile_pass().await;
                if !requeued.is_empty() {
                    info!(count = requeued.len(), "initial reconcile recovered orphaned tasks");
                    this.inner.wake.notify_one();
                }
            });
        }

        info!(slots = self.inner.config.slots, "orchestrator started");
        *loops = Some(LoopGuard { cancel, tracker });
    }

    /// Stop the loops, ask live runs to stop, and wait for in-flight
    /// workers to finish their cleanup.
    pub async fn stop(&self) {
        let Some(guard) = self.inner.loops.lock().take() else { return };
        guard.cancel.cancel();

        for entry in self.inner.registry.snapshot() {
            if let Some(run_id) = entry.run_id {
                if let Err(e) = self.inner.agents.stop_run(&run_id).await {
                    warn!(run_id = %run_id, error = %e, "failed to stop run during shutdown");
                    self.reap_run(&run_id, &entry.task_id).await;
                }
            }
        }

        guard.tracker.close();
        guard.tracker.wait().await;
        info!("orchestrator stopped");
    }

    /// Suspend scheduling; running attempts finish normally.
    pub fn pause(&self) {
        self.inner.maintenance_paused.store(true, Ordering::SeqCst);
        info!("maintenance pause engaged");
    }

    /// Resume scheduling. With `reset`, first stop live runs, clear the
    /// registry and any rate-limit pause, and re-queue every in-progress
    /// task.
    pub async fn resume(&self, reset: bool) -> ResumeSummary {
        let mut summary = ResumeSummary::default();
        if reset {
            for entry in self.inner.registry.snapshot() {
                let Some(run_id) = entry.run_id else { continue };
                match self.inner.agents.stop_run(&run_id).await {
                    Ok(()) => {
                        summary.agents_stopped += 1;
                        summary
                            .actions_taken
                            .push(format!("stopped run {run_id} for task {}", entry.task_id));
                    }
                    Err(e) => {
                        warn!(run_id = %run_id, error = %e, "failed to stop run during reset");
                        if self.reap_run(&run_id, &entry.task_id).await {
                            summary.processes_terminated += 1;
                            summary.actions_taken.push(format!(
                                "terminated process group for task {}",
                                entry.task_id
                            ));
                        }
                    }
                }
            }
            summary.executions_cleared = self.inner.registry.clear();
            summary.rate_limit_cleared = self.inner.rate_limiter.clear_silent();
            if summary.rate_limit_cleared {
                summary.actions_taken.push("cleared rate-limit pause".into());
            }
            summary.requeued =
                self.requeue_all_in_progress().iter().map(ToString::to_string).collect();
            for id in &summary.requeued {
                summary.actions_taken.push(format!("re-queued task {id}"));
            }
        }
        self.inner.maintenance_paused.store(false, Ordering::SeqCst);
        self.inner.wake.notify_one();
        info!(reset, "maintenance pause lifted");
        summary
    }

    /// Move every in-progress task back to pending, bypassing the grace
    /// period. Used by resume-with-reset, where the operator has declared
    /// no execution is trustworthy.
    fn requeue_all_in_progress(&self) -> Vec<TaskId> {
        let tasks = match self.inner.store.list(TaskStatus::InProgress) {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "failed to list in-progress tasks for reset");
                return Vec::new();
            }
        };
        let mut requeued = Vec::new();
        for mut task in tasks {
            self.inner.task_logger.clear(&task.id);
            match self.finalize_task(&mut task, TaskStatus::Pending) {
                Ok(_) => requeued.push(task.id.clone()),
                Err(e) => warn!(task_id = %task.id, error = %e, "failed to re-queue task"),
            }
        }
        requeued
    }

    /// Last resort after a failed polite stop: look up the run's process
    /// group and kill it. Returns whether a group was terminated.
    async fn reap_run(&self, run_id: &str, task_id: &TaskId) -> bool {
        let pgid = match self.inner.agents.run_pgid(run_id).await {
            Ok(Some(pgid)) => pgid,
            Ok(None) => return false,
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "failed to look up run process group");
                return false;
            }
        };
        match self.inner.reaper.terminate_group(pgid).await {
            Ok(()) => {
                info!(task_id = %task_id, pgid, "terminated process group after failed stop");
                true
            }
            Err(e) => {
                warn!(task_id = %task_id, pgid, error = %e, "failed to terminate process group");
                false
            }
        }
    }

    /// Nudge the scheduler loop to run a pass now.
    pub fn wake(&self) {
        self.inner.wake.notify_one();
    }

    /// Start a specific task immediately, bypassing eligibility filters.
    /// Without `allow_overflow` the slot pool still applies.
    pub async fn force_start(
        &self,
        task_id: &TaskId,
        allow_overflow: bool,
    ) -> Result<(), EngineError> {
        if self.inner.registry.is_running(task_id) {
            return Err(EngineError::AlreadyRunning(task_id.to_string()));
        }
        let task = self
            .inner
            .store
            .get(task_id)?
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;

        if !allow_overflow {
            let tags = self.sweep_agent_tags().await;
            let running = self.inner.registry.count() + self.external_task_ids(&tags).len();
            let slots = self.inner.config.slots;
            if running >= slots {
                return Err(EngineError::PoolFull { running, slots });
            }
        }
        info!(task_id = %task_id, allow_overflow, "force-starting task");
        self.admit_inner(task, true).await
    }

    /// Survey what a resume-with-reset would touch, without touching it.
    pub async fn resume_diagnostics(&self) -> ResumeDiagnostics {
        let gate = self.inner.rate_limiter.peek();
        let tags = self.sweep_agent_tags().await;
        let mut external: Vec<String> =
            self.external_task_ids(&tags).iter().map(ToString::to_string).collect();
        external.sort();
        let mut executing: Vec<String> =
            self.inner.registry.running_ids().iter().map(ToString::to_string).collect();
        executing.sort();

        let mut orphaned = Vec::new();
        match self.inner.store.list(TaskStatus::InProgress) {
            Ok(tasks) => {
                for task in tasks {
                    let covered = self.inner.registry.is_running(&task.id)
                        || tags.contains(&self.inner.config.agent_tag(task.id.as_str()));
                    if !covered {
                        orphaned.push(task.id.to_string());
                    }
                }
                orphaned.sort();
            }
            Err(e) => warn!(error = %e, "failed to list in-progress tasks for diagnostics"),
        }

        let mut notes = Vec::new();
        if gate.paused {
            notes.push(format!("rate-limit pause lifts in {}s", gate.remaining_secs));
        }
        if !orphaned.is_empty() {
            notes.push(format!("{} in-progress task(s) have no live execution", orphaned.len()));
        }
        ResumeDiagnostics {
            needs_confirmation: gate.paused
                || !external.is_empty()
                || !executing.is_empty()
                || !orphaned.is_empty(),
            rate_limit_paused: gate.paused,
            rate_limit_resume_at: gate.paused.then_some(gate.pause_until),
            external_task_ids: external,
            executing_task_ids: executing,
            orphaned_task_ids: orphaned,
            notes,
        }
    }

    /// Clear an active rate-limit pause (operator override).
    pub fn reset_rate_limit(&self) {
        self.inner.rate_limiter.reset();
        self.inner.wake.notify_one();
    }

    pub fn queue_status(&self) -> QueueStatus {
        let mut statuses = BTreeMap::new();
        for status in TaskStatus::ALL {
            let count = match self.inner.store.list(status) {
                Ok(tasks) => tasks.len(),
                Err(e) => {
                    warn!(status = %status, error = %e, "failed to count tasks");
                    0
                }
            };
            statuses.insert(status.to_string(), count);
        }
        let gate = self.inner.rate_limiter.peek();
        let mut running: Vec<String> =
            self.inner.registry.running_ids().iter().map(ToString::to_string).collect();
        running.sort();
        QueueStatus {
            processor_active: self.inner.loops.lock().is_some(),
            statuses,
            running,
            slots: self.inner.config.slots,
            refresh_interval_secs: self.inner.config.tick_interval.as_secs(),
            maintenance_paused: self.inner.maintenance_paused.load(Ordering::SeqCst),
            rate_limited: gate.paused,
            rate_limit_remaining_secs: gate.remaining_secs,
            last_tick_ms: self.inner.last_tick_ms.load(Ordering::SeqCst),
        }
    }
}
