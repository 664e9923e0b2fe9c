// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast event taxonomy for UI subscribers.
//!
//! Serializes with `{"type": "event_name", ...fields}` format; the
//! [`Envelope`] wrapper adds the unix-seconds timestamp. Broadcast is
//! telemetry, not transport for correctness — emitters drop events when the
//! bus is full.

use crate::task::{Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

/// Which output stream a log entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
}

crate::simple_display! {
    LogStream {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// Observable state changes carried by the broadcast bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TaskStatusChanged {
        task_id: TaskId,
        old_status: TaskStatus,
        new_status: TaskStatus,
        task: Box<Task>,
    },

    TaskStarted {
        task_id: TaskId,
        agent_tag: String,
        execution_id: String,
    },

    /// The attempt entered a named execution phase (e.g. `executing_claude`).
    TaskExecuting {
        task_id: TaskId,
        phase: String,
    },

    TaskProgress {
        task_id: TaskId,
        message: String,
    },

    TaskCompleted {
        task_id: TaskId,
        message: String,
        duration_ms: u64,
    },

    TaskFailed {
        task_id: TaskId,
        error: String,
    },

    /// The agent run finished and its result was classified.
    ClaudeExecutionComplete {
        task_id: TaskId,
        run_id: String,
        success: bool,
    },

    ToolCall {
        task_id: TaskId,
        tool: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    LogEntry {
        task_id: TaskId,
        agent_id: String,
        stream: LogStream,
        level: String,
        message: String,
        sequence: u64,
        timestamp: u64,
    },

    /// Status broadcast each tick while the pool is paused.
    RateLimitPause {
        pause_until: u64,
        remaining_secs: u64,
    },

    RateLimitPauseStarted {
        pause_until: u64,
        retry_after_secs: u64,
    },

    RateLimitResume,

    RateLimitHit {
        task_id: TaskId,
        retry_after_secs: u64,
    },

    RateLimitManualReset,
}

impl Event {
    /// Wire name of the event type (the serde tag).
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TaskStatusChanged { .. } => "task_status_changed",
            Event::TaskStarted { .. } => "task_started",
            Event::TaskExecuting { .. } => "task_executing",
            Event::TaskProgress { .. } => "task_progress",
            Event::TaskCompleted { .. } => "task_completed",
            Event::TaskFailed { .. } => "task_failed",
            Event::ClaudeExecutionComplete { .. } => "claude_execution_complete",
            Event::ToolCall { .. } => "tool_call",
            Event::LogEntry { .. } => "log_entry",
            Event::RateLimitPause { .. } => "rate_limit_pause",
            Event::RateLimitPauseStarted { .. } => "rate_limit_pause_started",
            Event::RateLimitResume => "rate_limit_resume",
            Event::RateLimitHit { .. } => "rate_limit_hit",
            Event::RateLimitManualReset => "rate_limit_manual_reset",
        }
    }
}

/// Wire envelope: `{type, ...data, timestamp}` with unix-seconds timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub event: Event,
    pub timestamp: u64,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
