// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-engine: the task orchestrator.
//!
//! [`Orchestrator`] wires a [`drover_storage::TaskStore`] and a
//! [`drover_agent::AgentService`] into a scheduling loop with a bounded
//! slot pool, per-attempt execution workers, crash reconciliation, a
//! timeout watchdog, and a queue-wide rate-limit gate.

pub mod bus;
pub mod config;
pub mod error;
pub mod history;
pub mod prompt;
pub mod rate_limit;
pub mod registry;
pub mod runtime;
pub mod steering;
pub mod task_logger;

pub use bus::Bus;
pub use config::EngineConfig;
pub use error::EngineError;
pub use history::HistoryManager;
pub use prompt::{BasicPromptAssembler, PromptAssembler};
pub use rate_limit::{RateLimitStatus, RateLimiter};
pub use registry::{ExecutionEntry, ExecutionRegistry};
pub use runtime::{ExecutionResult, Orchestrator, QueueStatus, ResumeDiagnostics, ResumeSummary};
pub use steering::{SteerGuidance, SteerPhase, SteerProfile, SteerProvider, SteeringEngine};
pub use task_logger::{LogTail, TaskLogEntry, TaskLogger, MAX_TASK_LOG_ENTRIES};
