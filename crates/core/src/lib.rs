// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-core: Domain types for the drover task orchestrator

pub mod macros;

pub mod clock;
pub mod event;
pub mod execution;
pub mod id;
pub mod task;

pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{Envelope, Event, LogStream};
pub use execution::{
    ArtifactPaths, ExecutionIdGen, ExecutionRecord, ExitReason, SteeringSnapshot, SteeringSource,
};
pub use id::short;
#[cfg(any(test, feature = "test-support"))]
pub use task::TaskBuilder;
pub use task::{Priority, SteerMode, Task, TaskId, TaskResults, TaskStatus};
