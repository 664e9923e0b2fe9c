// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-recovery specs
//!
//! After a restart, in-progress tasks with no live execution are returned
//! to pending once their grace period lapses. Tasks covered by a still-live
//! external agent are left alone.

use crate::prelude::*;

#[tokio::test]
async fn restart_requeues_orphaned_in_progress_tasks() {
    // A crashed daemon leaves the task in-progress on disk with no
    // execution behind it; the fresh orchestrator has an empty registry.
    let pool = pool();
    let now = pool.clock.epoch_ms();
    let id = pool.seed(
        Task::builder()
            .id("t1")
            .auto_requeue(true)
            .status(TaskStatus::InProgress)
            .started_at_ms(now)
            .build(),
    );

    // Within the grace period the task is presumed still settling.
    let mut pool = pool;
    assert!(pool.orch.reconcile_pass().await.is_empty());
    assert_eq!(pool.status_of(&id), TaskStatus::InProgress);

    pool.clock.advance(Duration::from_secs(121));
    let requeued = pool.orch.reconcile_pass().await;
    assert_eq!(requeued, vec![id.clone()]);
    assert_eq!(pool.status_of(&id), TaskStatus::Pending);
    assert!(pool.drain_event_kinds().contains(&"task_status_changed"));

    // The recovered task is schedulable again.
    pool.orch.tick().await;
    assert_eq!(pool.agents.started().len(), 1);
}

#[tokio::test]
#[serial_test::serial]
async fn started_daemon_runs_an_initial_reconcile_pass() {
    let pool = pool_with(|cfg| cfg.initial_reconcile_delay = Duration::from_millis(5));
    let now = pool.clock.epoch_ms();
    let id = pool.seed(
        Task::builder()
            .id("t1")
            .auto_requeue(false)
            .status(TaskStatus::InProgress)
            .started_at_ms(now.saturating_sub(10 * 60 * 1000))
            .build(),
    );

    // Maintenance pause keeps the scheduler tick out of the picture; only
    // the startup reconcile can move the task.
    pool.orch.pause();
    pool.orch.start();
    let mut recovered = false;
    for _ in 0..200 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if pool.status_of(&id) == TaskStatus::Pending {
            recovered = true;
            break;
        }
    }
    assert!(recovered, "initial reconcile should requeue the orphan");

    pool.orch.stop().await;
}

#[tokio::test]
async fn reconcile_leaves_externally_covered_tasks_alone() {
    let pool = pool();
    let now = pool.clock.epoch_ms();
    let covered = pool.seed(
        Task::builder()
            .id("t-covered")
            .status(TaskStatus::InProgress)
            .started_at_ms(now.saturating_sub(10 * 60 * 1000))
            .build(),
    );
    let orphan = pool.seed(
        Task::builder()
            .id("t-orphan")
            .status(TaskStatus::InProgress)
            .started_at_ms(now.saturating_sub(10 * 60 * 1000))
            .build(),
    );
    pool.agents.add_external_tag("drover-t-covered");

    let requeued = pool.orch.reconcile_pass().await;
    assert_eq!(requeued, vec![orphan.clone()]);
    assert_eq!(pool.status_of(&covered), TaskStatus::InProgress);
    assert_eq!(pool.status_of(&orphan), TaskStatus::Pending);
}

#[tokio::test]
async fn external_agents_occupy_slots_until_they_disappear() {
    let pool = pool();
    pool.seed(auto_task("t1"));
    pool.agents.add_external_tag("drover-stray-1");
    pool.agents.add_external_tag("drover-stray-2");

    pool.orch.tick().await;
    assert!(pool.agents.started().is_empty());

    pool.agents.clear_external_tags();
    pool.orch.tick().await;
    assert_eq!(pool.agents.started().len(), 1);
}
