// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout specs
//!
//! An attempt that outlives its deadline is stopped, recorded as a timeout,
//! and fails exactly once.

use crate::prelude::*;

#[tokio::test]
async fn overdue_attempt_fails_once_with_a_timeout_record() {
    let mut pool = pool_with(|cfg| cfg.wait_slack = Duration::ZERO);
    let id = pool.seed(Task::builder().id("t1").auto_requeue(true).timeout_secs(0_u64).build());
    pool.agents.script("t1", ScriptedRun::success("too slow").running_for(Duration::from_secs(60)));

    pool.orch.tick().await;

    let task = pool.task(&id);
    assert_eq!(task.status, TaskStatus::Failed);
    let results = task.results.unwrap();
    assert!(!results.success);
    assert_eq!(results.extras.get("timeout").map(String::as_str), Some("true"));

    // The run was told to stop, and the failure was reported exactly once.
    assert_eq!(pool.agents.stop_calls().len(), 1);
    let kinds = pool.drain_event_kinds();
    assert_eq!(kinds.iter().filter(|k| **k == "task_failed").count(), 1);

    let records = pool.orch.history().executions_for(&id);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].exit_reason, drover_core::ExitReason::Timeout);
}

#[tokio::test]
async fn timed_out_task_recycles_after_its_cooldown() {
    let mut pool = pool_with(|cfg| cfg.wait_slack = Duration::ZERO);
    let id = pool.seed(Task::builder().id("t1").auto_requeue(true).timeout_secs(0_u64).build());
    pool.agents.script("t1", ScriptedRun::success("slow").running_for(Duration::from_secs(60)));
    pool.agents.script("t1", ScriptedRun::success("quick this time"));

    pool.orch.tick().await;
    assert_eq!(pool.status_of(&id), TaskStatus::Failed);
    pool.drain_event_kinds();

    // The operator fixes the misconfigured deadline before the retry.
    let mut task = pool.task(&id);
    task.timeout_secs = None;
    pool.store.save(&task, task.status).unwrap();

    pool.clock.advance(PAST_COOLDOWN);
    pool.orch.tick().await;

    let task = pool.task(&id);
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.completion_count, 1);
    assert!(pool.drain_event_kinds().contains(&"task_completed"));
}
