// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not resolve a state directory (set DROVER_STATE_DIR or HOME)")]
    NoStateDir,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("another daemon already holds {0}")]
    AlreadyRunning(PathBuf),

    #[error(transparent)]
    Storage(#[from] drover_storage::StorageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
