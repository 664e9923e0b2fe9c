// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the end-to-end specs.
//!
//! Each spec gets its own queue and history tree in a temp dir, a fake
//! clock, and a scripted agent service, then drives the orchestrator by
//! hand or through its loops.

pub use drover_agent::{FakeAgentService, ScriptedRun};
pub use drover_core::{Clock, Envelope, FakeClock, Priority, Task, TaskId, TaskStatus};
pub use drover_engine::{BasicPromptAssembler, EngineConfig, EngineError, Orchestrator};
pub use drover_storage::{FsTaskStore, TaskStore};
pub use std::sync::Arc;
pub use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

pub struct Pool {
    pub orch: Orchestrator<FsTaskStore, FakeAgentService, FakeClock>,
    pub store: Arc<FsTaskStore>,
    pub agents: Arc<FakeAgentService>,
    pub clock: FakeClock,
    pub rx: mpsc::Receiver<Envelope>,
    _dir: TempDir,
}

pub fn pool() -> Pool {
    pool_with(|_| {})
}

pub fn pool_with(tweak: impl FnOnce(&mut EngineConfig)) -> Pool {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let store = Arc::new(FsTaskStore::open(dir.path().join("queue")).unwrap());
    let agents = Arc::new(FakeAgentService::new());
    let mut config =
        EngineConfig { logs_dir: dir.path().join("task-runs"), ..EngineConfig::default() };
    tweak(&mut config);
    let (orch, rx) = Orchestrator::new(
        Arc::clone(&store),
        Arc::clone(&agents),
        Arc::new(BasicPromptAssembler),
        config,
        clock.clone(),
    );
    Pool { orch, store, agents, clock, rx, _dir: dir }
}

impl Pool {
    pub fn seed(&self, task: Task) -> TaskId {
        let id = task.id.clone();
        self.store.save(&task, task.status).unwrap();
        id
    }

    pub fn status_of(&self, id: &TaskId) -> TaskStatus {
        self.store.current_status(id).unwrap().unwrap()
    }

    pub fn task(&self, id: &TaskId) -> Task {
        self.store.get(id).unwrap().unwrap()
    }

    pub fn drain_event_kinds(&mut self) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        while let Ok(envelope) = self.rx.try_recv() {
            kinds.push(envelope.event.kind());
        }
        kinds
    }
}

pub fn auto_task(id: &str) -> Task {
    Task::builder().id(id).auto_requeue(true).build()
}

/// Default completion cooldown plus a second, in fake-clock terms.
pub const PAST_COOLDOWN: Duration = Duration::from_secs(301);
