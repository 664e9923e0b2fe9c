// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent service unavailable: {0}")]
    Unavailable(String),

    #[error("run {0} not found")]
    RunNotFound(String),

    #[error("agent rpc failed: {0}")]
    Rpc(String),

    #[error("failed to terminate process group {pgid}: {reason}")]
    Terminate { pgid: i32, reason: String },
}
