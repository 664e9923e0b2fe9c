// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted in-memory agent service for tests.

use crate::error::AgentError;
use crate::process::ProcessReaper;
use crate::service::{AgentService, Run, RunEvent, RunEventKind, RunStatus, StartRun};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Scripted outcome for one run.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    pub status: RunStatus,
    pub summary: String,
    pub error_msg: String,
    pub events: Vec<RunEvent>,
    /// How long `wait_for_run` blocks before reporting the outcome.
    pub duration: Duration,
    /// OS process group the fake reports for this run.
    pub pgid: Option<i32>,
    /// Whether `stop_run` fails for this run.
    pub stop_fails: bool,
}

impl ScriptedRun {
    pub fn success(summary: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Complete,
            summary: summary.into(),
            error_msg: String::new(),
            events: vec![RunEvent {
                seq: 1,
                kind: RunEventKind::Message,
                text: "done".into(),
                tool: None,
                ok: None,
            }],
            duration: Duration::from_millis(10),
            pgid: None,
            stop_fails: false,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            summary: String::new(),
            error_msg: error.into(),
            events: Vec::new(),
            duration: Duration::from_millis(10),
            pgid: None,
            stop_fails: false,
        }
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::failed(format!("429 rate limit exceeded, retry after {retry_after_secs}s"))
    }

    pub fn running_for(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_events(mut self, events: Vec<RunEvent>) -> Self {
        self.events = events;
        self
    }

    /// Pretend the run owns this OS process group.
    pub fn with_pgid(mut self, pgid: i32) -> Self {
        self.pgid = Some(pgid);
        self
    }

    /// Make `stop_run` fail for this run.
    pub fn stop_fails(mut self) -> Self {
        self.stop_fails = true;
        self
    }
}

struct RunEntry {
    task_id: String,
    tag: String,
    script: ScriptedRun,
    stop: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

/// In-memory [`AgentService`] with per-task scripted outcomes.
///
/// Unscripted tasks get an immediate successful run. Tests can inject
/// "external" agent tags to exercise the stray-agent sweep.
#[derive(Default)]
pub struct FakeAgentService {
    unavailable: AtomicBool,
    scripts: Mutex<HashMap<String, VecDeque<ScriptedRun>>>,
    runs: Mutex<HashMap<String, RunEntry>>,
    started: Mutex<Vec<StartRun>>,
    stop_calls: Mutex<Vec<String>>,
    external_tags: Mutex<Vec<String>>,
    next_run: std::sync::atomic::AtomicU64,
}

impl FakeAgentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a scripted outcome for the task's next run.
    pub fn script(&self, task_id: &str, run: ScriptedRun) {
        self.scripts.lock().entry(task_id.to_string()).or_default().push_back(run);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Inject a live agent tag this process does not own.
    pub fn add_external_tag(&self, tag: &str) {
        self.external_tags.lock().push(tag.to_string());
    }

    pub fn clear_external_tags(&self) {
        self.external_tags.lock().clear();
    }

    /// Every start request seen, in order.
    pub fn started(&self) -> Vec<StartRun> {
        self.started.lock().clone()
    }

    /// Run ids passed to `stop_run`, in order.
    pub fn stop_calls(&self) -> Vec<String> {
        self.stop_calls.lock().clone()
    }

    /// The prompt of the most recent run started for a task.
    pub fn last_prompt_for(&self, task_id: &str) -> Option<String> {
        self.started
            .lock()
            .iter()
            .rev()
            .find(|req| req.task_id.as_str() == task_id)
            .map(|req| req.prompt.clone())
    }
}

#[async_trait]
impl AgentService for FakeAgentService {
    async fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    async fn execute_task_async(&self, req: StartRun) -> Result<String, AgentError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AgentError::Unavailable("fake service down".into()));
        }
        let script = self
            .scripts
            .lock()
            .get_mut(req.task_id.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| ScriptedRun::success("ok"));

        let run_id = format!("run-{}", self.next_run.fetch_add(1, Ordering::SeqCst) + 1);
        self.runs.lock().insert(
            run_id.clone(),
            RunEntry {
                task_id: req.task_id.to_string(),
                tag: req.tag.clone(),
                script,
                stop: Arc::new(Notify::new()),
                stopped: Arc::new(AtomicBool::new(false)),
                finished: Arc::new(AtomicBool::new(false)),
            },
        );
        self.started.lock().push(req);
        Ok(run_id)
    }

    async fn wait_for_run(&self, run_id: &str) -> Result<Run, AgentError> {
        let (script, stop, stopped, finished) = {
            let runs = self.runs.lock();
            let entry = runs.get(run_id).ok_or_else(|| AgentError::RunNotFound(run_id.into()))?;
            (
                entry.script.clone(),
                Arc::clone(&entry.stop),
                Arc::clone(&entry.stopped),
                Arc::clone(&entry.finished),
            )
        };

        let status = tokio::select! {
            _ = tokio::time::sleep(script.duration) => script.status,
            _ = stop.notified() => RunStatus::Cancelled,
        };
        // A stop that raced the natural finish still reports Cancelled.
        let status = if stopped.load(Ordering::SeqCst) { RunStatus::Cancelled } else { status };
        finished.store(true, Ordering::SeqCst);

        Ok(Run {
            run_id: run_id.to_string(),
            status,
            summary: script.summary,
            error_msg: script.error_msg,
            started_at_ms: 0,
            ended_at_ms: 0,
        })
    }

    async fn get_run_events(
        &self,
        run_id: &str,
        after_seq: u64,
    ) -> Result<Vec<RunEvent>, AgentError> {
        let runs = self.runs.lock();
        let entry = runs.get(run_id).ok_or_else(|| AgentError::RunNotFound(run_id.into()))?;
        Ok(entry.script.events.iter().filter(|e| e.seq > after_seq).cloned().collect())
    }

    async fn stop_run(&self, run_id: &str) -> Result<(), AgentError> {
        self.stop_calls.lock().push(run_id.to_string());
        let runs = self.runs.lock();
        if let Some(entry) = runs.get(run_id) {
            if entry.script.stop_fails {
                return Err(AgentError::Rpc(format!("stop {run_id}: scripted failure")));
            }
            entry.stopped.store(true, Ordering::SeqCst);
            entry.stop.notify_waiters();
        }
        Ok(())
    }

    async fn run_pgid(&self, run_id: &str) -> Result<Option<i32>, AgentError> {
        let runs = self.runs.lock();
        let entry = runs.get(run_id).ok_or_else(|| AgentError::RunNotFound(run_id.into()))?;
        Ok(entry.script.pgid)
    }

    async fn list_agent_tags(&self, prefix: &str) -> Result<Vec<String>, AgentError> {
        let mut tags: Vec<String> = self
            .runs
            .lock()
            .values()
            .filter(|e| !e.finished.load(Ordering::SeqCst))
            .map(|e| e.tag.clone())
            .collect();
        tags.extend(self.external_tags.lock().iter().cloned());
        tags.retain(|t| t.starts_with(prefix));
        tags.sort();
        tags.dedup();
        Ok(tags)
    }
}

impl FakeAgentService {
    /// Task id that owns a run, for assertions.
    pub fn task_of_run(&self, run_id: &str) -> Option<String> {
        self.runs.lock().get(run_id).map(|e| e.task_id.clone())
    }
}

/// Reaper that records the process groups it is asked to kill.
#[derive(Default)]
pub struct RecordingReaper {
    calls: Mutex<Vec<i32>>,
}

impl RecordingReaper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pgids terminated so far, in call order.
    pub fn terminated(&self) -> Vec<i32> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ProcessReaper for RecordingReaper {
    async fn terminate_group(&self, pgid: i32) -> Result<(), AgentError> {
        self.calls.lock().push(pgid);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
