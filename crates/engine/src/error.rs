// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! Attempt-level failures never propagate out of a worker as panics or
//! aborts; they are classified into the task's final status. These errors
//! cover the control surfaces and internal plumbing.

use drover_agent::AgentError;
use drover_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already running: {0}")]
    AlreadyRunning(String),

    #[error("slot pool is full ({running}/{slots})")]
    PoolFull { running: usize, slots: usize },

    #[error("prompt assembly failed: {0}")]
    Prompt(String),

    #[error("steering profile not found: {0}")]
    ProfileNotFound(String),

    #[error("history io error at {path}: {source}")]
    History {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub(crate) fn history(path: impl Into<String>, source: std::io::Error) -> Self {
        EngineError::History { path: path.into(), source }
    }
}
