// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable per-attempt execution records.

use crate::clock::Clock;
use crate::task::{SteerMode, TaskId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Why an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Completed,
    Failed,
    Timeout,
    RateLimited,
}

crate::simple_display! {
    ExitReason {
        Completed => "completed",
        Failed => "failed",
        Timeout => "timeout",
        RateLimited => "rate_limited",
    }
}

/// Which steering strategy produced the guidance for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteeringSource {
    /// Profile-based multi-phase steering.
    AutoSteer,
    /// A registered external provider for the task type/operation.
    SteeringQueue,
    /// Task-specified valid mode.
    ManualMode,
    /// The terminal default section.
    DefaultProgress,
}

crate::simple_display! {
    SteeringSource {
        AutoSteer => "auto_steer",
        SteeringQueue => "steering_queue",
        ManualMode => "manual_mode",
        DefaultProgress => "default_progress",
    }
}

/// Snapshot of the steering state that shaped one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteeringSnapshot {
    pub source: SteeringSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SteerMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    /// 1-indexed phase position for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<u32>,
    /// 1-indexed iteration within the phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_iteration: Option<u32>,
}

impl SteeringSnapshot {
    pub fn default_progress() -> Self {
        Self {
            source: SteeringSource::DefaultProgress,
            mode: Some(SteerMode::Progress),
            profile_id: None,
            phase: None,
            phase_iteration: None,
        }
    }
}

/// Relative paths into the history tree for one attempt's artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// Record of one task attempt. Written once when the attempt concludes and
/// never mutated; pruned only by the retention policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub task_id: TaskId,
    pub execution_id: String,
    pub started_at_ms: u64,
    pub ended_at_ms: u64,
    pub duration_ms: u64,
    pub success: bool,
    pub exit_reason: ExitReason,
    /// Size of the assembled prompt in characters.
    #[serde(default)]
    pub prompt_chars: usize,
    pub steering: SteeringSnapshot,
    #[serde(default)]
    pub artifacts: ArtifactPaths,
}

/// Generator for sortable, strictly increasing execution IDs.
///
/// Format: `{epoch_ms:013}-{seq:03}`. Zero-padding keeps lexicographic
/// order equal to chronological order; the sequence disambiguates IDs
/// minted within the same millisecond. Monotonic within one process
/// lifetime, even if the clock stalls.
#[derive(Clone, Default)]
pub struct ExecutionIdGen {
    last: Arc<Mutex<(u64, u32)>>,
}

impl ExecutionIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, clock: &impl Clock) -> String {
        let now = clock.epoch_ms();
        let mut last = self.last.lock();
        if now > last.0 {
            *last = (now, 0);
        } else {
            last.1 += 1;
        }
        format!("{:013}-{:03}", last.0, last.1)
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
