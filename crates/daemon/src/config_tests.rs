// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drover_core::SteerMode;
use std::time::Duration;

#[test]
fn missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from(dir.path()).unwrap();

    assert_eq!(config.state_dir, dir.path());
    assert_eq!(config.queue_dir, dir.path().join("queue"));
    assert_eq!(config.lock_path, dir.path().join("daemon.pid"));
    assert_eq!(config.events_path, dir.path().join("events.jsonl"));
    assert_eq!(config.agent_socket, dir.path().join("agent-manager.sock"));
    assert_eq!(config.engine.slots, 2);
    assert_eq!(config.engine.logs_dir, dir.path().join("task-runs"));
    assert!(config.steering_profiles.is_empty());
}

#[test]
fn toml_file_tunes_engine_and_declares_profiles() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("drover.toml"),
        r#"
agent_socket = "/run/agents.sock"

[engine]
slots = 4
tick_interval = 5
default_timeout = 600
agent_tag_prefix = "herd"

[[steering.profiles]]
id = "standard"
phases = [
    { mode = "progress", iterations = 3 },
    { mode = "verify", iterations = 1 },
]
"#,
    )
    .unwrap();

    let config = Config::load_from(dir.path()).unwrap();
    assert_eq!(config.agent_socket, PathBuf::from("/run/agents.sock"));
    assert_eq!(config.engine.slots, 4);
    assert_eq!(config.engine.tick_interval, Duration::from_secs(5));
    assert_eq!(config.engine.default_timeout, Duration::from_secs(600));
    assert_eq!(config.engine.agent_tag_prefix, "herd");
    // Untouched knobs keep their defaults.
    assert_eq!(config.engine.watchdog_interval, Duration::from_secs(30));

    assert_eq!(config.steering_profiles.len(), 1);
    let profile = &config.steering_profiles[0];
    assert_eq!(profile.id, "standard");
    assert_eq!(profile.phases.len(), 2);
    assert_eq!(profile.phases[0].mode, SteerMode::Progress);
    assert_eq!(profile.phases[0].iterations, 3);
}

#[test]
fn logs_dir_in_file_is_overridden_by_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("drover.toml"),
        "[engine]\nlogs_dir = \"/elsewhere\"\n",
    )
    .unwrap();

    let config = Config::load_from(dir.path()).unwrap();
    assert_eq!(config.engine.logs_dir, dir.path().join("task-runs"));
}

#[test]
fn malformed_toml_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("drover.toml"), "slots = [nope").unwrap();

    let err = Config::load_from(dir.path()).unwrap_err();
    assert!(matches!(err, DaemonError::Config(_)));
}
