// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use drover_core::SteerMode;
use serde::{Deserialize, Serialize};

/// One phase of a steering profile: run `iterations` attempts in `mode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteerPhase {
    pub mode: SteerMode,
    pub iterations: u32,
}

/// A multi-phase steering plan, e.g. progress x3 then verify x1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteerProfile {
    pub id: String,
    pub phases: Vec<SteerPhase>,
}

impl SteerProfile {
    pub fn new(id: impl Into<String>, phases: Vec<SteerPhase>) -> Self {
        Self { id: id.into(), phases }
    }
}

/// Mutable per-task cursor into a profile. Held in memory only; a restart
/// begins the profile over, which is acceptable for recurring tasks.
#[derive(Debug, Clone)]
pub struct ProfileState {
    pub profile_id: String,
    /// 0-indexed phase position.
    pub phase_index: usize,
    /// Completed iterations within the current phase.
    pub phase_iteration: u32,
    pub exhausted: bool,
}

impl ProfileState {
    pub fn new(profile: &SteerProfile) -> Self {
        Self {
            profile_id: profile.id.clone(),
            phase_index: 0,
            phase_iteration: 0,
            // A profile with no phases has nothing to run.
            exhausted: profile.phases.is_empty(),
        }
    }

    /// The phase the next attempt runs under.
    pub fn current_phase<'a>(&self, profile: &'a SteerProfile) -> Option<&'a SteerPhase> {
        if self.exhausted {
            return None;
        }
        profile.phases.get(self.phase_index)
    }

    /// Record one completed attempt; advances phases and flags exhaustion
    /// after the final iteration of the final phase.
    pub fn advance(&mut self, profile: &SteerProfile) {
        if self.exhausted {
            return;
        }
        self.phase_iteration += 1;
        let Some(phase) = profile.phases.get(self.phase_index) else {
            self.exhausted = true;
            return;
        };
        if self.phase_iteration >= phase.iterations {
            self.phase_index += 1;
            self.phase_iteration = 0;
            if self.phase_index >= profile.phases.len() {
                self.exhausted = true;
            }
        }
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
