// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classification of finished agent runs.
//!
//! The agent service reports a coarse status; the interesting cases
//! (rate limits, turn exhaustion) only show up in the error text, so
//! classification is string matching over the run's reported output.

use drover_agent::{Run, RunStatus};

/// Classified outcome of one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub rate_limited: bool,
    /// Provider-reported retry-after, when one could be parsed.
    pub retry_after_secs: Option<u64>,
    pub timed_out: bool,
    pub max_turns_exceeded: bool,
    /// Accumulated agent output from the event stream.
    pub output: String,
    /// Short human summary of the attempt.
    pub message: String,
    pub error: Option<String>,
}

const RATE_LIMIT_PATTERNS: &[&str] =
    &["rate limit", "rate_limit", "too many requests", "overloaded", "429"];

const TIMEOUT_PATTERNS: &[&str] = &["timed out", "timeout", "deadline exceeded"];

const MAX_TURNS_PATTERNS: &[&str] = &["max_turns", "max turns", "maximum turns"];

/// Classify a finished run. `deadline_passed` tells us whether this
/// process's own deadline elapsed, so a watchdog-cancelled run reads as a
/// timeout rather than a plain failure.
pub fn classify_run(run: &Run, output: String, deadline_passed: bool) -> ExecutionResult {
    let text = format!("{} {}", run.error_msg, run.summary);
    let lowered = text.to_lowercase();

    if run.status == RunStatus::Complete {
        return ExecutionResult {
            success: true,
            output,
            message: if run.summary.is_empty() { "completed".into() } else { run.summary.clone() },
            ..Default::default()
        };
    }

    if RATE_LIMIT_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return ExecutionResult {
            rate_limited: true,
            retry_after_secs: parse_retry_after(&lowered),
            output,
            message: "rate limited".into(),
            error: Some(run.error_msg.clone()),
            ..Default::default()
        };
    }

    let timed_out = run.status == RunStatus::Timeout
        || (run.status == RunStatus::Cancelled && deadline_passed)
        || TIMEOUT_PATTERNS.iter().any(|p| lowered.contains(p));
    if timed_out {
        return ExecutionResult {
            timed_out: true,
            output,
            message: "timed out".into(),
            error: Some(if run.error_msg.is_empty() {
                "execution timed out".into()
            } else {
                run.error_msg.clone()
            }),
            ..Default::default()
        };
    }

    let max_turns_exceeded = MAX_TURNS_PATTERNS.iter().any(|p| lowered.contains(p));
    ExecutionResult {
        max_turns_exceeded,
        output,
        message: if max_turns_exceeded { "turn limit reached".into() } else { "failed".into() },
        error: Some(if run.error_msg.is_empty() {
            format!("run ended with status {}", run.status)
        } else {
            run.error_msg.clone()
        }),
        ..Default::default()
    }
}

/// Best-effort parse of a retry-after value from provider error text, e.g.
/// `retry after 900s` or `retry-after: 900`.
fn parse_retry_after(lowered: &str) -> Option<u64> {
    for marker in ["retry after ", "retry-after: ", "retry-after="] {
        if let Some(idx) = lowered.find(marker) {
            let rest = &lowered[idx + marker.len()..];
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            if let Ok(secs) = digits.parse::<u64>() {
                return Some(secs);
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
