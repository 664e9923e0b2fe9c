// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limit gate for the slot pool.
//!
//! A single rate-limited attempt pauses all admissions until the provider's
//! retry-after deadline. The pause expires lazily: the next check past the
//! deadline flips the gate open and reports the resume.

use crate::bus::Bus;
use drover_core::{Clock, Event};
use parking_lot::Mutex;
use tracing::{info, warn};

/// Floor for a pause, in case the provider reports a tiny retry-after.
pub const MIN_PAUSE_SECS: u64 = 300;
/// Ceiling for a pause; anything longer is treated as a bogus value.
pub const MAX_PAUSE_SECS: u64 = 14_400;
/// Applied when a rate-limited result carries no usable retry-after.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 300;

/// Result of one gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub paused: bool,
    /// Unix seconds when the pause lifts; 0 when not paused.
    pub pause_until: u64,
    pub remaining_secs: u64,
    /// True exactly once: on the first check after the deadline passed.
    pub just_resumed: bool,
}

#[derive(Default)]
struct GateState {
    paused: bool,
    pause_until_ms: u64,
}

pub struct RateLimiter<C: Clock> {
    state: Mutex<GateState>,
    bus: Bus<C>,
    clock: C,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(bus: Bus<C>, clock: C) -> Self {
        Self { state: Mutex::new(GateState::default()), bus, clock }
    }

    /// Report the gate state, expiring a pause whose deadline has passed.
    pub fn check(&self) -> RateLimitStatus {
        let now_ms = self.clock.epoch_ms();
        let mut state = self.state.lock();
        if !state.paused {
            return RateLimitStatus {
                paused: false,
                pause_until: 0,
                remaining_secs: 0,
                just_resumed: false,
            };
        }
        if now_ms >= state.pause_until_ms {
            state.paused = false;
            state.pause_until_ms = 0;
            info!("rate limit pause expired, resuming admissions");
            return RateLimitStatus {
                paused: false,
                pause_until: 0,
                remaining_secs: 0,
                just_resumed: true,
            };
        }
        RateLimitStatus {
            paused: true,
            pause_until: state.pause_until_ms / 1000,
            remaining_secs: (state.pause_until_ms - now_ms).div_ceil(1000),
            just_resumed: false,
        }
    }

    /// Read-only view of the gate; never expires a pause, so the scheduler
    /// still observes (and broadcasts) the resume itself.
    pub fn peek(&self) -> RateLimitStatus {
        let now_ms = self.clock.epoch_ms();
        let state = self.state.lock();
        if !state.paused || now_ms >= state.pause_until_ms {
            return RateLimitStatus {
                paused: false,
                pause_until: 0,
                remaining_secs: 0,
                just_resumed: false,
            };
        }
        RateLimitStatus {
            paused: true,
            pause_until: state.pause_until_ms / 1000,
            remaining_secs: (state.pause_until_ms - now_ms).div_ceil(1000),
            just_resumed: false,
        }
    }

    /// Pause admissions for a clamped retry-after window and broadcast the
    /// pause. Returns the clamped seconds actually applied.
    pub fn handle_pause(&self, retry_after_secs: u64) -> u64 {
        let clamped = retry_after_secs.clamp(MIN_PAUSE_SECS, MAX_PAUSE_SECS);
        if clamped != retry_after_secs {
            warn!(
                reported = retry_after_secs,
                applied = clamped,
                "clamped rate limit retry-after"
            );
        }
        let pause_until_ms = self.clock.epoch_ms() + clamped * 1000;
        {
            let mut state = self.state.lock();
            state.paused = true;
            // A new hit extends, never shortens, an active pause.
            state.pause_until_ms = state.pause_until_ms.max(pause_until_ms);
        }
        info!(retry_after_secs = clamped, "rate limit pause started");
        self.bus.emit(Event::RateLimitPauseStarted {
            pause_until: pause_until_ms / 1000,
            retry_after_secs: clamped,
        });
        clamped
    }

    /// Clear the pause immediately (operator override) and broadcast it.
    pub fn reset(&self) {
        let was_paused = {
            let mut state = self.state.lock();
            let was = state.paused;
            state.paused = false;
            state.pause_until_ms = 0;
            was
        };
        if was_paused {
            info!("rate limit manually reset");
        }
        self.bus.emit(Event::RateLimitManualReset);
    }

    /// Silently drop any pause without broadcasting, for resume-with-reset.
    pub fn clear_silent(&self) -> bool {
        let mut state = self.state.lock();
        let was = state.paused;
        state.paused = false;
        state.pause_until_ms = 0;
        was
    }

    pub fn is_paused(&self) -> bool {
        let state = self.state.lock();
        state.paused && self.clock.epoch_ms() < state.pause_until_ms
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
