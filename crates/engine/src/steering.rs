// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Steering: guidance injected into each attempt's prompt, and the
//! continuation decision made after each success.
//!
//! Guidance sources are consulted in fixed precedence order:
//!
//! 1. a registered [`SteerProvider`] for the task's (kind, operation)
//! 2. the task's steering profile (multi-phase plan)
//! 3. the task's manually requested mode
//! 4. the default progress section
//!
//! The first source that yields guidance wins; the chain always terminates
//! because the default never passes.

mod profile;
mod provider;

pub use profile::{ProfileState, SteerPhase, SteerProfile};
pub use provider::{SteerGuidance, SteerProvider};

use crate::error::EngineError;
use drover_core::{SteerMode, SteeringSnapshot, SteeringSource, Task, TaskId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Marker heading for the injected section; injection is idempotent on it.
const SECTION_HEADER: &str = "## Steering";

/// Outcome of the post-success continuation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    pub should_continue: bool,
    /// Reason for stopping, when one is worth surfacing.
    pub reason: Option<String>,
}

pub struct SteeringEngine {
    providers: RwLock<HashMap<(String, String), Arc<dyn SteerProvider>>>,
    profiles: RwLock<HashMap<String, SteerProfile>>,
    states: Mutex<HashMap<TaskId, ProfileState>>,
}

impl Default for SteeringEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SteeringEngine {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_provider(
        &self,
        kind: impl Into<String>,
        operation: impl Into<String>,
        provider: Arc<dyn SteerProvider>,
    ) {
        self.providers.write().insert((kind.into(), operation.into()), provider);
    }

    pub fn register_profile(&self, profile: SteerProfile) {
        self.profiles.write().insert(profile.id.clone(), profile);
    }

    /// Ensure the task's profile cursor exists. Fails when the task names a
    /// profile nobody registered.
    pub fn init_task(&self, task: &Task) -> Result<(), EngineError> {
        let Some(profile_id) = task.steer_profile_id.as_deref() else {
            return Ok(());
        };
        let profiles = self.profiles.read();
        let profile = profiles
            .get(profile_id)
            .ok_or_else(|| EngineError::ProfileNotFound(profile_id.to_string()))?;
        self.states
            .lock()
            .entry(task.id.clone())
            .or_insert_with(|| ProfileState::new(profile));
        Ok(())
    }

    /// Append the winning guidance section to the prompt. Returns the
    /// augmented prompt and a snapshot of which source shaped it.
    pub fn inject(&self, task: &Task, prompt: String) -> (String, SteeringSnapshot) {
        let (section, snapshot) = self.guidance_for(task);
        if prompt.contains(SECTION_HEADER) {
            debug!(task_id = %task.id, "prompt already carries a steering section");
            return (prompt, snapshot);
        }
        let augmented = format!("{prompt}\n\n{SECTION_HEADER}\n\n{section}\n");
        (augmented, snapshot)
    }

    fn guidance_for(&self, task: &Task) -> (String, SteeringSnapshot) {
        let key = (task.kind.clone(), task.operation.clone());
        if let Some(provider) = self.providers.read().get(&key).cloned() {
            if let Some(guidance) = provider.guidance(task) {
                let snapshot = SteeringSnapshot {
                    source: SteeringSource::SteeringQueue,
                    mode: guidance.mode,
                    profile_id: None,
                    phase: None,
                    phase_iteration: None,
                };
                return (guidance.section, snapshot);
            }
        }

        if let Some((mode, snapshot)) = self.profile_guidance(task) {
            return (section_for(mode), snapshot);
        }

        if let Some(mode) = task.manual_steer_mode() {
            let snapshot = SteeringSnapshot {
                source: SteeringSource::ManualMode,
                mode: Some(mode),
                profile_id: None,
                phase: None,
                phase_iteration: None,
            };
            return (section_for(mode), snapshot);
        }

        (section_for(SteerMode::Progress), SteeringSnapshot::default_progress())
    }

    fn profile_guidance(&self, task: &Task) -> Option<(SteerMode, SteeringSnapshot)> {
        let profile_id = task.steer_profile_id.as_deref()?;
        let profiles = self.profiles.read();
        let profile = profiles.get(profile_id)?;
        let states = self.states.lock();
        let state = states.get(&task.id)?;
        let phase = state.current_phase(profile)?;
        let snapshot = SteeringSnapshot {
            source: SteeringSource::AutoSteer,
            mode: Some(phase.mode),
            profile_id: Some(profile.id.clone()),
            phase: Some(state.phase_index as u32 + 1),
            phase_iteration: Some(state.phase_iteration + 1),
        };
        Some((phase.mode, snapshot))
    }

    /// Advance the task's profile cursor after a successful attempt.
    /// Returns whether the profile is now exhausted. Tasks without a
    /// profile are never exhausted.
    pub fn record_success(&self, task: &Task) -> Result<bool, EngineError> {
        let Some(profile_id) = task.steer_profile_id.as_deref() else {
            return Ok(false);
        };
        let profiles = self.profiles.read();
        let profile = profiles
            .get(profile_id)
            .ok_or_else(|| EngineError::ProfileNotFound(profile_id.to_string()))?;
        let mut states = self.states.lock();
        let state = states
            .entry(task.id.clone())
            .or_insert_with(|| ProfileState::new(profile));
        state.advance(profile);
        Ok(state.exhausted)
    }

    /// Whether the recycler may queue another attempt after a success.
    ///
    /// Manual tasks (`auto_requeue == false`) always stop, with no reason:
    /// stopping is their normal behavior, not a condition to report.
    pub fn should_continue(&self, task: &Task) -> Continuation {
        if !task.auto_requeue {
            return Continuation { should_continue: false, reason: None };
        }
        if let Some(profile_id) = task.steer_profile_id.as_deref() {
            let exhausted = self
                .states
                .lock()
                .get(&task.id)
                .map(|s| s.exhausted)
                .unwrap_or(false);
            if exhausted {
                return Continuation {
                    should_continue: false,
                    reason: Some(format!("steering profile {profile_id} exhausted")),
                };
            }
        }
        Continuation { should_continue: true, reason: None }
    }

    /// Drop the task's profile cursor (task reached a terminal status).
    pub fn clear_task(&self, task_id: &TaskId) {
        self.states.lock().remove(task_id);
    }
}

/// Canned guidance body for a steering mode.
fn section_for(mode: SteerMode) -> String {
    match mode {
        SteerMode::Progress => {
            "Continue making concrete progress toward the task goal. \
             Pick the highest-leverage next step and complete it."
        }
        SteerMode::Refine => {
            "Review what the previous attempt produced and improve it. \
             Prefer tightening existing work over starting new threads."
        }
        SteerMode::Verify => {
            "Verify the work completed so far. Check it against the task \
             goal and fix any problems you find before adding anything new."
        }
    }
    .to_string()
}

#[cfg(test)]
#[path = "steering_tests.rs"]
mod tests;
