// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use std::time::Duration;

#[test]
fn execution_ids_sort_chronologically() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    let gen = ExecutionIdGen::new();

    let a = gen.next(&clock);
    clock.advance(Duration::from_millis(5));
    let b = gen.next(&clock);
    clock.advance(Duration::from_secs(1));
    let c = gen.next(&clock);

    assert!(a < b, "{a} should sort before {b}");
    assert!(b < c, "{b} should sort before {c}");
}

#[test]
fn execution_ids_stay_monotonic_when_clock_stalls() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000);
    let gen = ExecutionIdGen::new();

    let mut prev = gen.next(&clock);
    for _ in 0..100 {
        let next = gen.next(&clock);
        assert!(next > prev, "{next} should sort after {prev}");
        prev = next;
    }
}

#[test]
fn exit_reason_serde_is_snake_case() {
    assert_eq!(serde_json::to_string(&ExitReason::RateLimited).unwrap(), "\"rate_limited\"");
    assert_eq!(ExitReason::RateLimited.to_string(), "rate_limited");
}

#[test]
fn record_roundtrips_through_serde() {
    let record = ExecutionRecord {
        task_id: "task-1".into(),
        execution_id: "0000000001000-000".into(),
        started_at_ms: 1_000,
        ended_at_ms: 4_000,
        duration_ms: 3_000,
        success: true,
        exit_reason: ExitReason::Completed,
        prompt_chars: 512,
        steering: SteeringSnapshot::default_progress(),
        artifacts: ArtifactPaths {
            prompt: Some("executions/0000000001000-000/prompt.txt".into()),
            ..Default::default()
        },
    };
    let json = serde_json::to_string(&record).unwrap();
    let back: ExecutionRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back.execution_id, record.execution_id);
    assert_eq!(back.steering.source, SteeringSource::DefaultProgress);
    assert_eq!(back.artifacts.prompt, record.artifacts.prompt);
}
