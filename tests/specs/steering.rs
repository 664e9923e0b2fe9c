// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Steering specs
//!
//! Profile-steered tasks get per-phase guidance injected into every prompt,
//! then finalize once the profile's phases are spent.

use crate::prelude::*;
use drover_engine::{SteerPhase, SteerProfile};
use drover_core::SteerMode;

fn profiled_pool() -> Pool {
    let pool = pool();
    pool.orch.steering().register_profile(SteerProfile::new(
        "ship-it",
        vec![
            SteerPhase { mode: SteerMode::Progress, iterations: 2 },
            SteerPhase { mode: SteerMode::Verify, iterations: 1 },
        ],
    ));
    pool
}

#[tokio::test]
async fn profile_guides_each_attempt_then_finalizes_the_task() {
    let pool = profiled_pool();
    let id = pool.seed(
        Task::builder().id("t1").auto_requeue(true).steer_profile_id("ship-it").build(),
    );

    // Attempt 1 and 2: progress phase.
    pool.orch.tick().await;
    let prompt = pool.agents.last_prompt_for("t1").unwrap();
    assert!(prompt.contains("## Steering"));
    assert!(prompt.contains("concrete progress"));
    assert_eq!(pool.status_of(&id), TaskStatus::Pending);

    pool.clock.advance(PAST_COOLDOWN);
    pool.orch.tick().await;
    assert_eq!(pool.status_of(&id), TaskStatus::Pending);

    // Attempt 3: verify phase, after which the profile is exhausted.
    pool.clock.advance(PAST_COOLDOWN);
    pool.orch.tick().await;
    let prompt = pool.agents.last_prompt_for("t1").unwrap();
    assert!(prompt.contains("Verify the work completed so far"));

    let task = pool.task(&id);
    assert_eq!(task.status, TaskStatus::CompletedFinalized);
    assert!(!task.auto_requeue);
    assert!(task.results.unwrap().extras.get("stop_reason").unwrap().contains("exhausted"));

    // Terminal: no amount of waiting re-admits it.
    pool.clock.advance(Duration::from_secs(24 * 3600));
    pool.orch.tick().await;
    assert_eq!(pool.agents.started().len(), 3);
}

#[tokio::test]
async fn task_naming_an_unregistered_profile_runs_once_then_finalizes() {
    let pool = pool();
    let id = pool.seed(
        Task::builder().id("t1").auto_requeue(true).steer_profile_id("never-registered").build(),
    );
    pool.agents.script("t1", ScriptedRun::success("did the work"));

    pool.orch.tick().await;

    // The attempt still runs, but the broken profile pins the outcome so
    // the task cannot loop.
    assert_eq!(pool.agents.started().len(), 1);
    let task = pool.task(&id);
    assert_eq!(task.status, TaskStatus::CompletedFinalized);
    assert!(!task.auto_requeue);

    pool.clock.advance(PAST_COOLDOWN);
    pool.orch.tick().await;
    assert_eq!(pool.agents.started().len(), 1);
}

#[tokio::test]
async fn unprofiled_tasks_get_default_progress_guidance() {
    let pool = pool();
    pool.seed(auto_task("t1"));

    pool.orch.tick().await;

    let prompt = pool.agents.last_prompt_for("t1").unwrap();
    assert!(prompt.contains("## Steering"));
    assert!(prompt.contains("concrete progress"));
}
