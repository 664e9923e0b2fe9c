// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identity, attributes, and the status state machine.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for a task.
    ///
    /// Opaque and unique across history. Tasks created by external surfaces
    /// keep whatever ID they arrived with; tasks created internally get a
    /// `task-` prefixed random ID.
    pub struct TaskId("task-");
}

/// Status partition a task occupies.
///
/// A task lives in exactly one partition at any instant; the storage layer
/// uses the string form as the directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    CompletedFinalized,
    FailedBlocked,
    Archived,
    Review,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        InProgress => "in-progress",
        Completed => "completed",
        Failed => "failed",
        CompletedFinalized => "completed-finalized",
        FailedBlocked => "failed-blocked",
        Archived => "archived",
        Review => "review",
    }
}

impl TaskStatus {
    /// All statuses, in scan order for storage enumeration.
    pub const ALL: [TaskStatus; 8] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::CompletedFinalized,
        TaskStatus::FailedBlocked,
        TaskStatus::Archived,
        TaskStatus::Review,
    ];

    /// Directory name under the queue root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::CompletedFinalized => "completed-finalized",
            TaskStatus::FailedBlocked => "failed-blocked",
            TaskStatus::Archived => "archived",
            TaskStatus::Review => "review",
        }
    }

    /// Parse a directory name back into a status.
    pub fn from_dir_name(name: &str) -> Option<TaskStatus> {
        TaskStatus::ALL.into_iter().find(|s| s.dir_name() == name)
    }

    /// Statuses the scheduler never re-admits from.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::CompletedFinalized
                | TaskStatus::FailedBlocked
                | TaskStatus::Archived
                | TaskStatus::Review
        )
    }

    /// Whether the lifecycle permits a direct move from `self` to `to`.
    ///
    /// Reconcile and manual surfaces bypass this check; it exists for the
    /// scheduler and finalizer paths, which only ever make legal moves.
    pub fn can_transition(&self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, to) {
            (Pending, InProgress) => true,
            (InProgress, Completed | Failed | Pending | CompletedFinalized | FailedBlocked) => true,
            (Completed, Pending) => true,
            _ => false,
        }
    }
}

/// Scheduling priority. Ordering is `critical > high > medium > low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

crate::simple_display! {
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// Steering mode a task can request manually, or a profile phase can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteerMode {
    /// Keep making forward progress on the task goal (the default).
    Progress,
    /// Revisit and improve what the previous attempt produced.
    Refine,
    /// Verify the work so far and fix anything found.
    Verify,
}

crate::simple_display! {
    SteerMode {
        Progress => "progress",
        Refine => "refine",
        Verify => "verify",
    }
}

impl SteerMode {
    /// Parse a task-specified mode string. Unknown strings are rejected so a
    /// typo in a manually queued task falls back to the default section.
    pub fn parse(s: &str) -> Option<SteerMode> {
        match s {
            "progress" => Some(SteerMode::Progress),
            "refine" => Some(SteerMode::Refine),
            "verify" => Some(SteerMode::Verify),
            _ => None,
        }
    }
}

/// Free-form outcome map filled in when an attempt concludes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResults {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub started_at_ms: u64,
    #[serde(default)]
    pub ended_at_ms: u64,
    /// Extra markers (e.g. `max_turns_exceeded`, `timeout`).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extras: HashMap<String, String>,
}

/// A unit of work the orchestrator schedules and runs as an agent process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// Task type (e.g. "maintenance", "feature").
    pub kind: String,
    /// Operation within the type (e.g. "implement", "triage").
    pub operation: String,
    #[serde(default)]
    pub priority: Priority,
    /// When false the task was queued by a human and only runs via
    /// force-start; when true the recycler may re-queue it after completion.
    #[serde(default)]
    pub auto_requeue: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steer_profile_id: Option<String>,
    /// Manually requested steering mode (raw string; validated at use).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steer_mode: Option<String>,
    #[serde(default)]
    pub completion_count: u32,
    /// Scheduler will not re-admit the task before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_until_ms: Option<u64>,
    /// Mirror of the status partition the task record lives in.
    pub status: TaskStatus,
    /// Per-task timeout override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<TaskResults>,
    /// Relative path to the latest execution's output, surfaced so the
    /// prompt assembler can reference the previous attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_output_path: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed_at_ms: Option<u64>,
}

impl Task {
    /// Create a new pending task.
    pub fn new(
        id: impl Into<TaskId>,
        title: impl Into<String>,
        kind: impl Into<String>,
        operation: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.epoch_ms();
        Self {
            id: id.into(),
            title: title.into(),
            kind: kind.into(),
            operation: operation.into(),
            priority: Priority::default(),
            auto_requeue: false,
            steer_profile_id: None,
            steer_mode: None,
            completion_count: 0,
            cooldown_until_ms: None,
            status: TaskStatus::Pending,
            timeout_secs: None,
            results: None,
            latest_output_path: None,
            created_at_ms: now,
            updated_at_ms: now,
            started_at_ms: None,
            completed_at_ms: None,
            last_completed_at_ms: None,
        }
    }

    /// Whether the cooldown window (if any) is still in the future.
    pub fn in_cooldown(&self, now_ms: u64) -> bool {
        self.cooldown_until_ms.is_some_and(|until| until > now_ms)
    }

    /// Record a successful completion: bumps the count and stamps both
    /// completion timestamps.
    pub fn record_completion(&mut self, now_ms: u64) {
        self.completion_count += 1;
        self.completed_at_ms = Some(now_ms);
        self.last_completed_at_ms = Some(now_ms);
    }

    /// The manually requested steer mode, if present and valid.
    pub fn manual_steer_mode(&self) -> Option<SteerMode> {
        self.steer_mode.as_deref().and_then(SteerMode::parse)
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            id: TaskId = "task-test-1",
            title: String = "test task",
            kind: String = "maintenance",
            operation: String = "improve",
        }
        set {
            priority: Priority = Priority::Medium,
            auto_requeue: bool = true,
            completion_count: u32 = 0,
            status: TaskStatus = TaskStatus::Pending,
            created_at_ms: u64 = 1_000_000,
            updated_at_ms: u64 = 1_000_000,
        }
        option {
            steer_profile_id: String = None,
            steer_mode: String = None,
            cooldown_until_ms: u64 = None,
            timeout_secs: u64 = None,
            results: TaskResults = None,
            latest_output_path: String = None,
            started_at_ms: u64 = None,
            completed_at_ms: u64 = None,
            last_completed_at_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
