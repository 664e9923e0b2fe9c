// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The consumed agent-service RPC surface.

use crate::error::AgentError;
use async_trait::async_trait;
use drover_core::TaskId;
use serde::{Deserialize, Serialize};

/// Final status of an agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Complete,
    Failed,
    Timeout,
    Cancelled,
}

drover_core::simple_display! {
    RunStatus {
        Complete => "COMPLETE",
        Failed => "FAILED",
        Timeout => "TIMEOUT",
        Cancelled => "CANCELLED",
    }
}

/// A finished (or finishing) agent run as reported by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub status: RunStatus,
    /// Short human summary of what the run did.
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub error_msg: String,
    #[serde(default)]
    pub started_at_ms: u64,
    #[serde(default)]
    pub ended_at_ms: u64,
}

/// Event kinds streamed from a live run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunEventKind {
    Log,
    Message,
    ToolCall,
    ToolResult,
    Error,
    Status,
}

/// One event from a run's stream. Sequences are strictly increasing per run
/// so consumers can poll with `after_seq`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub seq: u64,
    pub kind: RunEventKind,
    #[serde(default)]
    pub text: String,
    /// Tool name for `ToolCall` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Whether a `ToolResult` succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
}

/// Request to start an async run.
#[derive(Debug, Clone)]
pub struct StartRun {
    pub task_id: TaskId,
    pub prompt: String,
    pub timeout_secs: u64,
    /// Agent tag of the form `{prefix}-{task_id}`; the sweep discovers
    /// stray agents by this prefix.
    pub tag: String,
}

/// Async agent-manager RPC surface.
///
/// All methods are cancel-safe: callers wrap them in `tokio::time::timeout`
/// where a deadline applies.
#[async_trait]
pub trait AgentService: Send + Sync + 'static {
    /// Whether the service is reachable and able to start runs.
    async fn is_available(&self) -> bool;

    /// Start an async run; returns the service's run handle.
    async fn execute_task_async(&self, req: StartRun) -> Result<String, AgentError>;

    /// Block until the run reaches a terminal status.
    async fn wait_for_run(&self, run_id: &str) -> Result<Run, AgentError>;

    /// Events with `seq > after_seq`, oldest first.
    async fn get_run_events(&self, run_id: &str, after_seq: u64)
        -> Result<Vec<RunEvent>, AgentError>;

    /// Request the run stop. Idempotent; stopping a finished run is not an
    /// error.
    async fn stop_run(&self, run_id: &str) -> Result<(), AgentError>;

    /// OS process group of a live run, when the service tracks one. Used to
    /// escalate after a failed [`AgentService::stop_run`].
    async fn run_pgid(&self, run_id: &str) -> Result<Option<i32>, AgentError>;

    /// Tags of live agents whose tag starts with `prefix`, whether or not
    /// this process started them.
    async fn list_agent_tags(&self, prefix: &str) -> Result<Vec<String>, AgentError>;
}
