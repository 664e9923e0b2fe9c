// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-daemon: process lifecycle around the orchestrator.
//!
//! Owns the state directory layout, the exclusive PID lock, the
//! agent-manager socket client, and the event drain that mirrors the
//! broadcast bus into `events.jsonl`.

mod config;
mod error;
mod lifecycle;
mod rpc;

pub use config::{state_dir, Config};
pub use error::DaemonError;
pub use lifecycle::{Daemon, LockFile};
pub use rpc::SocketAgentClient;
