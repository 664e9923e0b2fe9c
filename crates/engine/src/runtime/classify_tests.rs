// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn run(status: RunStatus, error_msg: &str, summary: &str) -> Run {
    Run {
        run_id: "run-1".into(),
        status,
        summary: summary.into(),
        error_msg: error_msg.into(),
        started_at_ms: 0,
        ended_at_ms: 0,
    }
}

#[test]
fn complete_runs_are_successes() {
    let result = classify_run(&run(RunStatus::Complete, "", "did the thing"), "out".into(), false);
    assert!(result.success);
    assert_eq!(result.message, "did the thing");
    assert_eq!(result.output, "out");
    assert!(result.error.is_none());
}

#[test]
fn complete_with_empty_summary_gets_a_default_message() {
    let result = classify_run(&run(RunStatus::Complete, "", ""), String::new(), false);
    assert_eq!(result.message, "completed");
}

#[parameterized(
    phrase = { "429 too many requests" },
    underscore = { "provider rate_limit tripped" },
    spaced = { "Rate Limit exceeded" },
    overloaded = { "server overloaded, backing off" },
)]
fn rate_limit_text_classifies_as_rate_limited(error: &str) {
    let result = classify_run(&run(RunStatus::Failed, error, ""), String::new(), false);
    assert!(result.rate_limited);
    assert!(!result.success);
}

#[parameterized(
    suffix_s = { "429, retry after 900s", Some(900) },
    header = { "rate limit; retry-after: 1200", Some(1200) },
    missing = { "rate limit hit", None },
)]
fn retry_after_is_parsed_when_present(error: &str, expected: Option<u64>) {
    let result = classify_run(&run(RunStatus::Failed, error, ""), String::new(), false);
    assert!(result.rate_limited);
    assert_eq!(result.retry_after_secs, expected);
}

#[test]
fn timeout_status_wins_over_generic_failure() {
    let result = classify_run(&run(RunStatus::Timeout, "", ""), String::new(), false);
    assert!(result.timed_out);
    assert_eq!(result.error.as_deref(), Some("execution timed out"));
}

#[test]
fn cancelled_past_deadline_reads_as_timeout() {
    let result = classify_run(&run(RunStatus::Cancelled, "", ""), String::new(), true);
    assert!(result.timed_out);
}

#[test]
fn cancelled_before_deadline_is_a_plain_failure() {
    let result = classify_run(&run(RunStatus::Cancelled, "", ""), String::new(), false);
    assert!(!result.timed_out);
    assert!(!result.success);
}

#[test]
fn max_turns_marker_is_detected() {
    let result =
        classify_run(&run(RunStatus::Failed, "stopped: MAX_TURNS reached", ""), String::new(), false);
    assert!(result.max_turns_exceeded);
    assert_eq!(result.message, "turn limit reached");
}

#[test]
fn rate_limit_outranks_timeout_text() {
    // A rate-limited run often also says it gave up waiting; the pause
    // matters more than the wording.
    let result = classify_run(
        &run(RunStatus::Failed, "rate limit; request timed out", ""),
        String::new(),
        false,
    );
    assert!(result.rate_limited);
    assert!(!result.timed_out);
}
