// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-agent: the agent-manager service boundary.
//!
//! The orchestrator never spawns agent processes itself; it talks to an
//! agent service through the [`AgentService`] trait (start/stop/wait async
//! runs, stream run events). This crate also carries the OS-level
//! process-group termination helpers used during shutdown and reset.

mod error;
#[cfg(any(test, feature = "test-support"))]
mod fake;
pub mod process;
mod service;

pub use error::AgentError;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeAgentService, RecordingReaper, ScriptedRun};
pub use process::{GroupReaper, ProcessReaper};
pub use service::{AgentService, Run, RunEvent, RunEventKind, RunStatus, StartRun};
