// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manual-control specs
//!
//! Deactivated tasks (`auto_requeue == false`) never enter the scheduler on
//! their own; operators run them with `force_start` and pause the whole
//! pool for maintenance.

use crate::prelude::*;
use serial_test::serial;

#[tokio::test]
async fn deactivated_tasks_run_only_when_forced() {
    let pool = pool();
    let id = pool.seed(Task::builder().id("t1").auto_requeue(false).build());
    pool.agents.script("t1", ScriptedRun::success("one-off run"));

    pool.orch.tick().await;
    assert!(pool.agents.started().is_empty());

    pool.orch.force_start(&id, false).await.unwrap();
    assert_eq!(pool.agents.started().len(), 1);
    assert_eq!(pool.status_of(&id), TaskStatus::Completed);

    // Parked in completed; no cooldown lapse brings it back.
    pool.clock.advance(PAST_COOLDOWN);
    pool.orch.tick().await;
    assert_eq!(pool.agents.started().len(), 1);
    assert_eq!(pool.status_of(&id), TaskStatus::Completed);
}

// Loop-driven: serialized so wall-clock waits stay predictable.
#[tokio::test]
#[serial]
async fn force_start_respects_the_pool_unless_told_otherwise() {
    let pool = pool();
    let id = pool.seed(Task::builder().id("t-manual").auto_requeue(false).build());
    pool.seed(auto_task("t-a"));
    pool.seed(auto_task("t-b"));
    pool.agents
        .script("t-a", ScriptedRun::success("slow").running_for(Duration::from_secs(600)));
    pool.agents
        .script("t-b", ScriptedRun::success("slow").running_for(Duration::from_secs(600)));

    // Fill both slots with long-running attempts.
    pool.orch.start();
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if pool.agents.started().len() == 2 {
            break;
        }
    }
    assert_eq!(pool.agents.started().len(), 2);

    let err = pool.orch.force_start(&id, false).await.unwrap_err();
    assert!(matches!(err, EngineError::PoolFull { running: 2, slots: 2 }));

    // Overflow runs it anyway, beyond the slot count.
    pool.orch.force_start(&id, true).await.unwrap();
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if pool.status_of(&id) == TaskStatus::Completed {
            break;
        }
    }
    assert_eq!(pool.status_of(&id), TaskStatus::Completed);

    pool.orch.stop().await;
}

#[tokio::test]
async fn deactivation_beats_an_unfinished_steering_profile() {
    use drover_core::SteerMode;
    use drover_engine::{SteerPhase, SteerProfile};

    let pool = pool();
    pool.orch.steering().register_profile(SteerProfile::new(
        "long-haul",
        vec![SteerPhase { mode: SteerMode::Progress, iterations: 10 }],
    ));
    let id = pool.seed(
        Task::builder().id("t1").auto_requeue(false).steer_profile_id("long-haul").build(),
    );

    pool.orch.force_start(&id, false).await.unwrap();

    // The profile has nine iterations left, but the task is deactivated:
    // it parks in completed instead of going around again.
    assert_eq!(pool.status_of(&id), TaskStatus::Completed);
    pool.clock.advance(PAST_COOLDOWN);
    pool.orch.tick().await;
    assert_eq!(pool.agents.started().len(), 1);
    assert_eq!(pool.status_of(&id), TaskStatus::Completed);
}

#[tokio::test]
async fn maintenance_pause_stops_scheduling_until_resume() {
    let pool = pool();
    pool.seed(auto_task("t1"));

    pool.orch.pause();
    pool.orch.tick().await;
    assert!(pool.agents.started().is_empty());
    assert!(pool.orch.queue_status().maintenance_paused);

    pool.orch.resume(false).await;
    pool.orch.tick().await;
    assert_eq!(pool.agents.started().len(), 1);
}

#[tokio::test]
#[serial]
async fn resume_with_reset_recalls_everything_in_flight() {
    let pool = pool();
    let id = pool.seed(auto_task("t1"));
    pool.agents.script("t1", ScriptedRun::success("slow").running_for(Duration::from_secs(600)));

    pool.orch.start();
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if pool.agents.started().len() == 1 {
            break;
        }
    }

    let summary = pool.orch.resume(true).await;
    assert_eq!(summary.agents_stopped, 1);
    assert_eq!(summary.executions_cleared, 1);
    assert_eq!(summary.requeued, vec![id.to_string()]);
    assert_eq!(summary.processes_terminated, 0);
    assert!(summary.actions_taken.iter().any(|a| a.contains("re-queued")));
    assert_eq!(pool.agents.stop_calls().len(), 1);

    pool.orch.stop().await;
}
