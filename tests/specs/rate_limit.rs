// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limit specs
//!
//! A 429 from any attempt pauses the whole pool without failing the task;
//! the pause expires on its own or is cleared by an operator reset.

use crate::prelude::*;

#[tokio::test]
async fn rate_limited_attempts_pause_the_pool_without_failing_tasks() {
    let mut pool = pool();
    let a = pool.seed(auto_task("t-a"));
    let b = pool.seed(auto_task("t-b"));
    pool.agents.script("t-a", ScriptedRun::rate_limited(900));
    pool.agents.script("t-b", ScriptedRun::rate_limited(900));

    pool.orch.tick().await;

    // Both attempts bounced off the limit; neither counts as a failure.
    assert_eq!(pool.status_of(&a), TaskStatus::Pending);
    assert_eq!(pool.status_of(&b), TaskStatus::Pending);
    assert!(pool.task(&a).cooldown_until_ms.is_none());

    let kinds = pool.drain_event_kinds();
    assert!(kinds.contains(&"rate_limit_hit"));
    assert!(kinds.contains(&"rate_limit_pause_started"));
    assert!(!kinds.contains(&"task_failed"));

    // The gate holds: further ticks admit nothing.
    let before = pool.agents.started().len();
    pool.orch.tick().await;
    assert_eq!(pool.agents.started().len(), before);
    assert!(pool.orch.queue_status().rate_limited);

    // The pause expires and scheduling resumes by itself.
    pool.clock.advance(Duration::from_secs(901));
    pool.orch.tick().await;
    assert!(pool.drain_event_kinds().contains(&"rate_limit_resume"));
    assert!(pool.agents.started().len() > before);
}

#[tokio::test]
async fn missing_retry_hint_falls_back_to_the_default_pause() {
    let mut pool = pool();
    pool.seed(auto_task("t1"));
    pool.agents.script("t1", ScriptedRun::failed("429 too many requests"));

    pool.orch.tick().await;
    assert!(pool.drain_event_kinds().contains(&"rate_limit_pause_started"));
    let status = pool.orch.queue_status();
    assert!(status.rate_limited);
    // Default retry window is five minutes.
    assert!(status.rate_limit_remaining_secs <= 300);
    assert!(status.rate_limit_remaining_secs > 290);
}

#[tokio::test]
async fn operator_reset_clears_the_pause_early() {
    let mut pool = pool();
    pool.seed(auto_task("t1"));
    pool.agents.script("t1", ScriptedRun::rate_limited(3600));

    pool.orch.tick().await;
    assert!(pool.orch.queue_status().rate_limited);

    pool.orch.reset_rate_limit();
    assert!(!pool.orch.queue_status().rate_limited);
    assert!(pool.drain_event_kinds().contains(&"rate_limit_manual_reset"));

    pool.orch.tick().await;
    assert!(pool.agents.started().len() > 1);
}
