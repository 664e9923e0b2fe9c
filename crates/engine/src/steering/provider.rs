// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use drover_core::{SteerMode, Task};

/// Guidance produced by an external steering source.
#[derive(Debug, Clone)]
pub struct SteerGuidance {
    /// Body of the guidance section appended to the prompt.
    pub section: String,
    pub mode: Option<SteerMode>,
}

/// External steering source registered for a (task kind, operation) pair.
///
/// Providers outrank every other guidance source: a queue of human review
/// notes, for example, takes precedence over the task's own profile.
pub trait SteerProvider: Send + Sync + 'static {
    /// Guidance for the task's next attempt, or `None` to pass.
    fn guidance(&self, task: &Task) -> Option<SteerGuidance>;
}
