// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drover_core::FakeClock;

#[tokio::test]
async fn envelopes_carry_the_clock_timestamp() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42_000);
    let (bus, mut rx) = Bus::channel(4, clock);

    bus.emit(Event::RateLimitResume);

    let envelope = rx.recv().await.unwrap();
    assert_eq!(envelope.timestamp, 42);
    assert_eq!(envelope.event, Event::RateLimitResume);
}

#[tokio::test]
async fn full_bus_drops_instead_of_blocking() {
    let (bus, mut rx) = Bus::channel(1, FakeClock::new());

    bus.emit(Event::RateLimitResume);
    bus.emit(Event::RateLimitManualReset); // dropped

    assert_eq!(rx.recv().await.unwrap().event, Event::RateLimitResume);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn closed_receiver_is_not_an_error() {
    let (bus, rx) = Bus::channel(1, FakeClock::new());
    drop(rx);
    bus.emit(Event::RateLimitResume);
}
