// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator: scheduler loop, execution workers, reconciler, and
//! timeout watchdog over one task store and one agent service.
//!
//! All state lives behind an `Arc`; clones are handles to the same
//! orchestrator. Workers run on a [`TaskTracker`] so shutdown can wait for
//! in-flight attempts to finish their cleanup.

mod classify;
mod control;
mod execute;
mod finalize;
mod reconcile;
mod tick;
mod watchdog;

pub use classify::{classify_run, ExecutionResult};
pub use control::{QueueStatus, ResumeDiagnostics, ResumeSummary};

use crate::bus::Bus;
use crate::config::EngineConfig;
use crate::history::HistoryManager;
use crate::prompt::PromptAssembler;
use crate::rate_limit::RateLimiter;
use crate::registry::ExecutionRegistry;
use crate::steering::SteeringEngine;
use crate::task_logger::TaskLogger;
use drover_agent::{AgentService, GroupReaper, ProcessReaper};
use drover_core::{Clock, Envelope, ExecutionIdGen};
use drover_storage::TaskStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub struct Orchestrator<S, A, C: Clock> {
    inner: Arc<Inner<S, A, C>>,
}

impl<S, A, C: Clock> Clone for Orchestrator<S, A, C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

pub(crate) struct Inner<S, A, C: Clock> {
    pub(crate) store: Arc<S>,
    pub(crate) agents: Arc<A>,
    pub(crate) prompts: Arc<dyn PromptAssembler>,
    /// Last-resort process-group killer for runs the service cannot stop.
    pub(crate) reaper: Arc<dyn ProcessReaper>,
    pub(crate) clock: C,
    pub(crate) config: EngineConfig,
    pub(crate) bus: Bus<C>,
    pub(crate) registry: ExecutionRegistry,
    pub(crate) rate_limiter: RateLimiter<C>,
    pub(crate) task_logger: TaskLogger<C>,
    pub(crate) history: HistoryManager<C>,
    pub(crate) steering: SteeringEngine,
    pub(crate) exec_ids: ExecutionIdGen,
    /// Operator-requested maintenance pause; the tick becomes a no-op.
    pub(crate) maintenance_paused: AtomicBool,
    /// Wakes the scheduler loop ahead of its safety timer.
    pub(crate) wake: Notify,
    pub(crate) last_tick_ms: AtomicU64,
    pub(crate) loops: Mutex<Option<LoopGuard>>,
}

pub(crate) struct LoopGuard {
    pub(crate) cancel: CancellationToken,
    pub(crate) tracker: TaskTracker,
}

impl<S: TaskStore, A: AgentService, C: Clock> Orchestrator<S, A, C> {
    /// Build an orchestrator and the receiver draining its broadcast bus.
    pub fn new(
        store: Arc<S>,
        agents: Arc<A>,
        prompts: Arc<dyn PromptAssembler>,
        config: EngineConfig,
        clock: C,
    ) -> (Self, mpsc::Receiver<Envelope>) {
        Self::new_with_reaper(store, agents, prompts, config, clock, Arc::new(GroupReaper))
    }

    /// As [`Orchestrator::new`], with a custom process reaper.
    pub fn new_with_reaper(
        store: Arc<S>,
        agents: Arc<A>,
        prompts: Arc<dyn PromptAssembler>,
        config: EngineConfig,
        clock: C,
        reaper: Arc<dyn ProcessReaper>,
    ) -> (Self, mpsc::Receiver<Envelope>) {
        let (bus, rx) = Bus::channel(config.bus_capacity, clock.clone());
        let inner = Inner {
            rate_limiter: RateLimiter::new(bus.clone(), clock.clone()),
            task_logger: TaskLogger::new(config.logs_dir.clone(), bus.clone(), clock.clone()),
            history: HistoryManager::new(config.logs_dir.clone(), clock.clone()),
            registry: ExecutionRegistry::new(),
            steering: SteeringEngine::new(),
            exec_ids: ExecutionIdGen::new(),
            maintenance_paused: AtomicBool::new(false),
            wake: Notify::new(),
            last_tick_ms: AtomicU64::new(0),
            loops: Mutex::new(None),
            store,
            agents,
            prompts,
            reaper,
            clock,
            config,
            bus,
        };
        (Self { inner: Arc::new(inner) }, rx)
    }

    pub fn steering(&self) -> &SteeringEngine {
        &self.inner.steering
    }

    pub fn history(&self) -> &HistoryManager<C> {
        &self.inner.history
    }

    pub fn task_logger(&self) -> &TaskLogger<C> {
        &self.inner.task_logger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
