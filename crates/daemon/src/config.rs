// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! State lives under one directory, resolved `DROVER_STATE_DIR` >
//! `$XDG_STATE_HOME/drover` > `~/.local/state/drover`. An optional
//! `drover.toml` inside it tunes the engine and declares steering profiles.

use crate::error::DaemonError;
use drover_engine::steering::SteerProfile;
use drover_engine::EngineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Resolve the state directory from the environment.
pub fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("DROVER_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("drover"));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/drover"))
}

/// The optional on-disk config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    engine: EngineConfig,
    /// Socket of the agent-manager service.
    agent_socket: Option<PathBuf>,
    steering: SteeringSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SteeringSection {
    profiles: Vec<SteerProfile>,
}

/// Fully resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub queue_dir: PathBuf,
    pub lock_path: PathBuf,
    pub log_dir: PathBuf,
    /// Broadcast envelopes are appended here as JSON lines.
    pub events_path: PathBuf,
    pub agent_socket: PathBuf,
    pub engine: EngineConfig,
    pub steering_profiles: Vec<SteerProfile>,
}

impl Config {
    /// Load configuration from the state directory, applying `drover.toml`
    /// when present.
    pub fn load() -> Result<Self, DaemonError> {
        let state_dir = state_dir()?;
        Self::load_from(&state_dir)
    }

    pub fn load_from(state_dir: &Path) -> Result<Self, DaemonError> {
        let config_path = state_dir.join("drover.toml");
        let file: FileConfig = if config_path.is_file() {
            let text = std::fs::read_to_string(&config_path)
                .map_err(|e| DaemonError::Config(format!("{}: {e}", config_path.display())))?;
            toml::from_str(&text)
                .map_err(|e| DaemonError::Config(format!("{}: {e}", config_path.display())))?
        } else {
            FileConfig::default()
        };

        let mut engine = file.engine;
        // The history tree always lives inside the state dir.
        engine.logs_dir = state_dir.join("task-runs");

        Ok(Self {
            queue_dir: state_dir.join("queue"),
            lock_path: state_dir.join("daemon.pid"),
            log_dir: state_dir.join("logs"),
            events_path: state_dir.join("events.jsonl"),
            agent_socket: file
                .agent_socket
                .unwrap_or_else(|| state_dir.join("agent-manager.sock")),
            engine,
            steering_profiles: file.steering.profiles,
            state_dir: state_dir.to_path_buf(),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
