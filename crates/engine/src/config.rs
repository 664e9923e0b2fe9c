// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator tuning knobs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one orchestrator instance.
///
/// Defaults are the production values; tests shrink the intervals and drive
/// deadlines through a fake clock instead of scaling them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root of the per-task history tree (`{logs_dir}/{task_id}/...`).
    pub logs_dir: PathBuf,

    /// Maximum concurrent executions, counting stray external agents.
    pub slots: usize,

    /// Safety-timer cadence of the scheduler loop. Completions and control
    /// calls wake the loop early.
    #[serde(with = "secs")]
    pub tick_interval: Duration,

    /// Cadence of the timeout watchdog scan.
    #[serde(with = "secs")]
    pub watchdog_interval: Duration,

    /// Delay before the first orphan-recovery pass after start.
    #[serde(with = "secs")]
    pub initial_reconcile_delay: Duration,

    /// An in-progress task younger than this is left alone by reconcile.
    #[serde(with = "secs")]
    pub reconcile_grace: Duration,

    /// Timeout applied to tasks that carry no per-task override.
    #[serde(with = "secs")]
    pub default_timeout: Duration,

    /// Slack added on top of the task timeout when waiting on the agent
    /// service, so the service's own timeout fires first.
    #[serde(with = "secs")]
    pub wait_slack: Duration,

    /// Cooldown stamped on a task after a completed attempt, gating when the
    /// scheduler may admit it again. `None` disables cooldowns.
    #[serde(default, with = "opt_secs")]
    pub completion_cooldown: Option<Duration>,

    /// Agent tag prefix; runs are tagged `{prefix}-{task_id}` and the stray
    /// sweep queries by this prefix.
    pub agent_tag_prefix: String,

    /// Execution history older than this many days is pruned.
    pub retention_days: u32,

    /// Broadcast bus channel capacity. Events beyond it are dropped.
    pub bus_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("task-runs"),
            slots: 2,
            tick_interval: Duration::from_secs(10),
            watchdog_interval: Duration::from_secs(30),
            initial_reconcile_delay: Duration::from_secs(2),
            reconcile_grace: Duration::from_secs(120),
            default_timeout: Duration::from_secs(3600),
            wait_slack: Duration::from_secs(30),
            completion_cooldown: Some(Duration::from_secs(300)),
            agent_tag_prefix: "drover".into(),
            retention_days: 14,
            bus_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Effective timeout for a task, honoring its override.
    pub fn timeout_for(&self, timeout_secs: Option<u64>) -> Duration {
        timeout_secs.map_or(self.default_timeout, Duration::from_secs)
    }

    /// Agent tag for a task id.
    pub fn agent_tag(&self, task_id: &str) -> String {
        format!("{}-{}", self.agent_tag_prefix, task_id)
    }

    /// The sweep prefix, including the separator.
    pub fn tag_prefix(&self) -> String {
        format!("{}-", self.agent_tag_prefix)
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
