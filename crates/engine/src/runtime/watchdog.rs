// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout watchdog.
//!
//! A backstop for the attempt worker's own deadline: if a run hangs past
//! its registered deadline the watchdog kills it. The worker then sees the
//! cancelled run, classifies it as a timeout, and finalizes normally, so
//! every timed-out attempt still produces exactly one failure event.

use super::Orchestrator;
use drover_agent::AgentService;
use drover_core::Clock;
use drover_storage::TaskStore;
use tracing::warn;

impl<S: TaskStore, A: AgentService, C: Clock> Orchestrator<S, A, C> {
    /// One watchdog pass over the registry.
    pub async fn watchdog_scan(&self) {
        let now_ms = self.inner.clock.epoch_ms();
        for entry in self.inner.registry.timed_out(now_ms) {
            let overdue_ms = now_ms.saturating_sub(entry.deadline_ms);
            warn!(
                task_id = %entry.task_id,
                execution_id = %entry.execution_id,
                overdue_ms,
                "execution past deadline, stopping run"
            );
            // Mark first: repeated scans (and the reconciler) must not
            // re-kill while the worker is finalizing.
            self.inner.registry.mark_timed_out(&entry.task_id);
            match entry.run_id {
                Some(run_id) => {
                    if let Err(e) = self.inner.agents.stop_run(&run_id).await {
                        warn!(run_id = %run_id, error = %e, "failed to stop timed-out run");
                    }
                }
                None => {
                    warn!(task_id = %entry.task_id, "timed-out execution has no run yet");
                }
            }
        }
    }
}
