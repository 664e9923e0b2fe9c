// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling specs
//!
//! A pool of two slots admits pending tasks by priority, runs each attempt
//! to completion, and re-queues successful auto-requeue tasks behind a
//! cooldown.

use crate::prelude::*;

#[tokio::test]
async fn pool_runs_tasks_by_priority_and_requeues_on_success() {
    let mut pool = pool();
    pool.seed(
        Task::builder()
            .id("t-low")
            .auto_requeue(true)
            .priority(Priority::Low)
            .created_at_ms(1)
            .build(),
    );
    pool.seed(
        Task::builder()
            .id("t-high")
            .auto_requeue(true)
            .priority(Priority::High)
            .created_at_ms(3)
            .build(),
    );
    pool.seed(
        Task::builder()
            .id("t-med")
            .auto_requeue(true)
            .priority(Priority::Medium)
            .created_at_ms(2)
            .build(),
    );
    pool.agents.script("t-high", ScriptedRun::success("shipped the feature"));
    pool.agents.script("t-med", ScriptedRun::success("wrote the docs"));
    pool.agents.script("t-low", ScriptedRun::success("cleaned up"));

    pool.orch.tick().await;

    // Two slots: high and medium run, low waits its turn.
    let started: Vec<String> =
        pool.agents.started().into_iter().map(|r| r.task_id.to_string()).collect();
    assert_eq!(started, vec!["t-high", "t-med"]);

    let high = pool.task(&TaskId::from("t-high"));
    assert_eq!(high.status, TaskStatus::Pending);
    assert_eq!(high.completion_count, 1);
    assert!(high.cooldown_until_ms.is_some());
    assert_eq!(high.results.unwrap().message, "shipped the feature");

    // The finished tasks are cooling down, so the freed slots go to t-low.
    pool.orch.tick().await;
    let started: Vec<String> =
        pool.agents.started().into_iter().map(|r| r.task_id.to_string()).collect();
    assert_eq!(started, vec!["t-high", "t-med", "t-low"]);

    // Past the cooldown everything is eligible again.
    pool.clock.advance(PAST_COOLDOWN);
    pool.orch.tick().await;
    assert_eq!(pool.agents.started().len(), 5);

    let kinds = pool.drain_event_kinds();
    assert!(kinds.contains(&"task_started"));
    assert!(kinds.contains(&"claude_execution_complete"));
    assert!(kinds.contains(&"task_completed"));
}

#[tokio::test]
async fn attempts_leave_a_history_record_with_artifacts() {
    let pool = pool();
    let id = pool.seed(auto_task("t1"));
    pool.agents.script("t1", ScriptedRun::success("all done"));

    pool.orch.tick().await;

    let records = pool.orch.history().executions_for(&id);
    assert_eq!(records.len(), 1);
    assert!(records[0].success);
    assert!(records[0].artifacts.prompt.is_some());

    // The next attempt gets pointed at the previous one's output.
    pool.clock.advance(PAST_COOLDOWN);
    pool.orch.tick().await;
    let prompt = pool.agents.last_prompt_for("t1").unwrap();
    assert!(prompt.contains("previous attempt"));
}

#[tokio::test]
async fn broadcast_envelopes_carry_a_type_tag_and_timestamp() {
    let mut pool = pool();
    pool.seed(auto_task("t1"));
    pool.orch.tick().await;

    let envelope = pool.rx.try_recv().unwrap();
    let wire: serde_json::Value = serde_json::from_str(&serde_json::to_string(&envelope).unwrap()).unwrap();
    assert!(wire["type"].is_string());
    assert!(wire["timestamp"].is_u64());
    assert!(!pool.drain_event_kinds().is_empty());
}

#[tokio::test]
async fn queue_status_reports_partitions_slots_and_tick() {
    let pool = pool();
    pool.seed(auto_task("t1"));
    // Deactivated, so the recycler leaves it parked in failed.
    pool.seed(Task::builder().id("t2").auto_requeue(false).status(TaskStatus::Failed).build());

    pool.orch.tick().await;

    let status = pool.orch.queue_status();
    assert_eq!(status.slots, 2);
    assert_eq!(status.refresh_interval_secs, 10);
    assert_eq!(status.statuses.get("failed"), Some(&1));
    assert!(status.last_tick_ms > 0);
    assert!(!status.maintenance_paused);
}
