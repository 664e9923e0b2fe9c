// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast bus for state-change events.
//!
//! A bounded channel with non-blocking sends. The consumer (UI bridge,
//! daemon log tap) drains [`Envelope`]s; when it falls behind the channel
//! fills and emitters drop events with a warning. Nothing in the engine
//! reads its own events back, so a lost event never affects correctness.

use drover_core::{Clock, Envelope, Event};
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Clone)]
pub struct Bus<C: Clock> {
    tx: mpsc::Sender<Envelope>,
    clock: C,
}

impl<C: Clock> Bus<C> {
    /// Create a bus and the receiver that drains it.
    pub fn channel(capacity: usize, clock: C) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, clock }, rx)
    }

    /// Emit an event, stamping the envelope with the current unix seconds.
    /// Never blocks; a full channel drops the event.
    pub fn emit(&self, event: Event) {
        let kind = event.kind();
        let envelope = Envelope { event, timestamp: self.clock.epoch_secs() };
        if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(envelope) {
            warn!(event = kind, "event bus full, dropping event");
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
