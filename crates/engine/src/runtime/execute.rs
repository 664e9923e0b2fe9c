// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One task attempt, start to finish.
//!
//! The worker owns the attempt lifecycle: prompt assembly, steering
//! injection, the agent run with its event stream, classification, artifact
//! persistence, and finalization. The slot is released only after the
//! task's final status is on disk, so a task is never untracked while still
//! sitting in the in-progress partition.

use super::classify::{classify_run, ExecutionResult};
use super::Orchestrator;
use crate::history::{
    CLEAN_OUTPUT_FILE, LAST_MESSAGE_FILE, PROMPT_FILE, RAW_LOG_FILE, TRANSCRIPT_FILE,
};
use crate::rate_limit::DEFAULT_RETRY_AFTER_SECS;
use drover_agent::{AgentService, Run, RunEvent, RunEventKind, RunStatus, StartRun};
use drover_core::{
    ArtifactPaths, Clock, Event, ExecutionRecord, ExitReason, LogStream, SteeringSnapshot, Task,
    TaskId, TaskResults, TaskStatus,
};
use drover_storage::TaskStore;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Phase name broadcast while the agent run is live.
pub(crate) const EXECUTING_PHASE: &str = "executing_claude";

/// Poll cadence of the run event consumer.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Settle delay before the final event poll after a turn-limit stop; the
/// service flushes its tail events slightly after the run concludes.
const MAX_TURNS_SETTLE: Duration = Duration::from_millis(500);

#[derive(Default)]
struct StreamState {
    output: String,
    last_message: String,
    events: Vec<RunEvent>,
    last_seq: u64,
}

struct AttemptOutcome {
    result: ExecutionResult,
    snapshot: SteeringSnapshot,
    prompt_chars: usize,
    artifacts: ArtifactPaths,
    /// Status override for conditions that bypass the normal branches
    /// (a steering setup failure pins the result to completed-finalized).
    forced_status: Option<TaskStatus>,
}

fn failure(error: impl Into<String>) -> ExecutionResult {
    ExecutionResult { message: "failed".into(), error: Some(error.into()), ..Default::default() }
}

impl<S: TaskStore, A: AgentService, C: Clock> Orchestrator<S, A, C> {
    pub(crate) async fn run_attempt(
        &self,
        mut task: Task,
        execution_id: String,
        agent_tag: String,
        deadline_ms: u64,
    ) {
        let started_ms = self.inner.clock.epoch_ms();
        let outcome = self.attempt(&mut task, &execution_id, &agent_tag, deadline_ms).await;
        self.conclude(task, &execution_id, started_ms, outcome).await;
        self.inner.wake.notify_one();
    }

    async fn attempt(
        &self,
        task: &mut Task,
        execution_id: &str,
        agent_tag: &str,
        deadline_ms: u64,
    ) -> AttemptOutcome {
        let task_id = task.id.clone();
        let mut artifacts = ArtifactPaths::default();

        // A failed steering init does not cancel the attempt; it runs, but
        // the outcome is pinned to completed-finalized so the task cannot
        // loop on a broken profile.
        let mut forced_status = None;
        if let Err(e) = self.inner.steering.init_task(task) {
            warn!(task_id = %task_id, error = %e, "steering init failed, attempt will be finalized");
            forced_status = Some(TaskStatus::CompletedFinalized);
        }

        task.latest_output_path = self.inner.history.latest_output_path(&task_id);

        let prompt = match self.inner.prompts.assemble(task) {
            Ok(prompt) => prompt,
            Err(e) => {
                return AttemptOutcome {
                    result: failure(format!("prompt assembly failed: {e}")),
                    snapshot: SteeringSnapshot::default_progress(),
                    prompt_chars: 0,
                    artifacts,
                    forced_status,
                };
            }
        };
        let (prompt, snapshot) = self.inner.steering.inject(task, prompt);
        let prompt_chars = prompt.chars().count();
        match self.inner.history.write_artifact(&task_id, execution_id, PROMPT_FILE, &prompt) {
            Ok(path) => artifacts.prompt = Some(path),
            Err(e) => warn!(task_id = %task_id, error = %e, "failed to persist prompt"),
        }

        if !self.inner.agents.is_available().await {
            return AttemptOutcome {
                result: failure("agent service unavailable"),
                snapshot,
                prompt_chars,
                artifacts,
                forced_status,
            };
        }

        self.inner.task_logger.begin(&task_id, agent_tag);
        self.inner.bus.emit(Event::TaskStarted {
            task_id: task_id.clone(),
            agent_tag: agent_tag.to_string(),
            execution_id: execution_id.to_string(),
        });
        self.inner
            .bus
            .emit(Event::TaskExecuting { task_id: task_id.clone(), phase: EXECUTING_PHASE.into() });
        if let Err(e) = self.inner.store.save_skip_cleanup(task, TaskStatus::InProgress) {
            warn!(task_id = %task_id, error = %e, "failed to persist executing task");
        }

        let timeout = self.inner.config.timeout_for(task.timeout_secs);
        let run_id = match self
            .inner
            .agents
            .execute_task_async(StartRun {
                task_id: task_id.clone(),
                prompt,
                timeout_secs: timeout.as_secs(),
                tag: agent_tag.to_string(),
            })
            .await
        {
            Ok(run_id) => run_id,
            Err(e) => {
                return AttemptOutcome {
                    result: failure(format!("failed to start agent run: {e}")),
                    snapshot,
                    prompt_chars,
                    artifacts,
                    forced_status,
                };
            }
        };
        self.inner.registry.register_run_id(&task_id, &run_id);
        info!(task_id = %task_id, run_id = %run_id, "agent run started");

        let state = Arc::new(Mutex::new(StreamState::default()));
        let stream_cancel = CancellationToken::new();
        let pump = {
            let this = self.clone();
            let task_id = task_id.clone();
            let run_id = run_id.clone();
            let state = Arc::clone(&state);
            let cancel = stream_cancel.clone();
            tokio::spawn(async move {
                this.pump_run_events(&task_id, &run_id, &state, cancel).await;
            })
        };

        let wait = tokio::time::timeout(
            timeout + self.inner.config.wait_slack,
            self.inner.agents.wait_for_run(&run_id),
        )
        .await;
        let run = match wait {
            Ok(Ok(run)) => run,
            Ok(Err(e)) => Run {
                run_id: run_id.clone(),
                status: RunStatus::Failed,
                summary: String::new(),
                error_msg: format!("wait for run failed: {e}"),
                started_at_ms: 0,
                ended_at_ms: 0,
            },
            Err(_) => {
                // The service blew past its own timeout plus our slack.
                if let Err(e) = self.inner.agents.stop_run(&run_id).await {
                    warn!(run_id = %run_id, error = %e, "failed to stop overdue run");
                }
                Run {
                    run_id: run_id.clone(),
                    status: RunStatus::Timeout,
                    summary: String::new(),
                    error_msg: "wait deadline exceeded".into(),
                    started_at_ms: 0,
                    ended_at_ms: 0,
                }
            }
        };
        stream_cancel.cancel();
        if let Err(e) = pump.await {
            warn!(task_id = %task_id, error = %e, "event consumer panicked");
        }

        let deadline_passed = self.inner.clock.epoch_ms() >= deadline_ms
            || self.inner.registry.get(&task_id).is_none_or(|entry| entry.timed_out);
        let mut result =
            { classify_run(&run, state.lock().output.clone(), deadline_passed) };

        if result.max_turns_exceeded {
            tokio::time::sleep(MAX_TURNS_SETTLE).await;
            self.poll_events_once(&task_id, &run_id, &state).await;
            result.output = state.lock().output.clone();
        }

        self.inner.bus.emit(Event::ClaudeExecutionComplete {
            task_id: task_id.clone(),
            run_id: run_id.clone(),
            success: result.success,
        });

        self.persist_stream_artifacts(&task_id, execution_id, &state, &result, &mut artifacts);

        AttemptOutcome { result, snapshot, prompt_chars, artifacts, forced_status }
    }

    fn persist_stream_artifacts(
        &self,
        task_id: &TaskId,
        execution_id: &str,
        state: &Arc<Mutex<StreamState>>,
        result: &ExecutionResult,
        artifacts: &mut ArtifactPaths,
    ) {
        let (last_message, mut transcript) = {
            let state = state.lock();
            let transcript: String = state
                .events
                .iter()
                .filter_map(|e| serde_json::to_string(e).ok())
                .map(|line| line + "\n")
                .collect();
            (state.last_message.clone(), transcript)
        };
        if transcript.is_empty() {
            // No events from the agent; leave a one-line transcript so every
            // execution directory has a conversation record.
            let stub = RunEvent {
                seq: 0,
                kind: RunEventKind::Message,
                text: if result.output.is_empty() {
                    result.message.clone()
                } else {
                    result.output.clone()
                },
                tool: None,
                ok: None,
            };
            if let Ok(line) = serde_json::to_string(&stub) {
                transcript = line + "\n";
            }
        }

        let mut write = |name: &str, content: &str| {
            if content.is_empty() {
                return None;
            }
            match self.inner.history.write_artifact(task_id, execution_id, name, content) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(task_id = %task_id, artifact = name, error = %e, "failed to persist artifact");
                    None
                }
            }
        };
        artifacts.clean_output = write(CLEAN_OUTPUT_FILE, &result.output);
        artifacts.last_message = write(LAST_MESSAGE_FILE, &last_message);
        artifacts.transcript = write(TRANSCRIPT_FILE, &transcript);
        artifacts.raw_log = write(RAW_LOG_FILE, &self.inner.task_logger.raw_text(task_id));
    }

    /// Apply the classified result to the task, persist its final status,
    /// and release the slot.
    async fn conclude(
        &self,
        mut task: Task,
        execution_id: &str,
        started_ms: u64,
        outcome: AttemptOutcome,
    ) {
        let AttemptOutcome { result, snapshot, prompt_chars, artifacts, forced_status } = outcome;
        let task_id = task.id.clone();
        let now_ms = self.inner.clock.epoch_ms();
        let duration_ms = now_ms.saturating_sub(started_ms);

        let mut results = TaskResults {
            success: result.success,
            message: result.message.clone(),
            output: result.output.clone(),
            duration_ms,
            started_at_ms: started_ms,
            ended_at_ms: now_ms,
            extras: Default::default(),
        };
        if result.timed_out {
            results.extras.insert("timeout".into(), "true".into());
        }
        if result.max_turns_exceeded {
            results.extras.insert("max_turns_exceeded".into(), "true".into());
        }

        let status = if let Some(forced) = forced_status {
            if forced.is_terminal() {
                task.auto_requeue = false;
                self.inner.steering.clear_task(&task_id);
            }
            forced
        } else if result.success {
            task.record_completion(now_ms);
            if task.auto_requeue {
                if let Some(cooldown) = self.inner.config.completion_cooldown {
                    task.cooldown_until_ms = Some(now_ms + cooldown.as_millis() as u64);
                }
            }
            match self.inner.steering.record_success(&task) {
                Err(e) => {
                    warn!(task_id = %task_id, error = %e, "steering evaluation failed, parking task");
                    task.auto_requeue = false;
                    self.inner.steering.clear_task(&task_id);
                    TaskStatus::CompletedFinalized
                }
                Ok(_) => {
                    let continuation = self.inner.steering.should_continue(&task);
                    if continuation.should_continue {
                        TaskStatus::Pending
                    } else if let Some(reason) = continuation.reason {
                        info!(task_id = %task_id, reason = %reason, "steering concluded the task");
                        results.extras.insert("stop_reason".into(), reason);
                        task.auto_requeue = false;
                        self.inner.steering.clear_task(&task_id);
                        TaskStatus::CompletedFinalized
                    } else {
                        // Manual task: done until someone force-starts it again.
                        TaskStatus::Completed
                    }
                }
            }
        } else if result.rate_limited {
            let retry = result.retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            self.inner.rate_limiter.handle_pause(retry);
            self.inner
                .bus
                .emit(Event::RateLimitHit { task_id: task_id.clone(), retry_after_secs: retry });
            // The attempt never really ran; retry as soon as the pause lifts.
            task.cooldown_until_ms = None;
            TaskStatus::Pending
        } else {
            if task.auto_requeue {
                if let Some(cooldown) = self.inner.config.completion_cooldown {
                    task.cooldown_until_ms = Some(now_ms + cooldown.as_millis() as u64);
                }
            }
            TaskStatus::Failed
        };
        task.results = Some(results);

        if result.success {
            self.inner.bus.emit(Event::TaskCompleted {
                task_id: task_id.clone(),
                message: result.message.clone(),
                duration_ms,
            });
        } else if !result.rate_limited {
            self.inner.bus.emit(Event::TaskFailed {
                task_id: task_id.clone(),
                error: result.error.clone().unwrap_or_else(|| result.message.clone()),
            });
        }

        if let Err(e) = self.finalize_task(&mut task, status) {
            error!(task_id = %task_id, status = %status, error = %e, "failed to finalize task");
        }

        let exit_reason = if result.success {
            ExitReason::Completed
        } else if result.rate_limited {
            ExitReason::RateLimited
        } else if result.timed_out {
            ExitReason::Timeout
        } else {
            ExitReason::Failed
        };
        let record = ExecutionRecord {
            task_id: task_id.clone(),
            execution_id: execution_id.to_string(),
            started_at_ms: started_ms,
            ended_at_ms: now_ms,
            duration_ms,
            success: result.success,
            exit_reason,
            prompt_chars,
            steering: snapshot,
            artifacts,
        };
        if let Err(e) = self.inner.history.write_record(&record) {
            warn!(task_id = %task_id, error = %e, "failed to write execution record");
        }
        self.inner.history.prune(&task_id, self.inner.config.retention_days);

        self.inner.task_logger.finalize(&task_id, result.success);
        // Slot release comes last: a task must never be untracked while its
        // record still says in-progress.
        self.inner.registry.unregister(&task_id);
    }

    async fn pump_run_events(
        &self,
        task_id: &TaskId,
        run_id: &str,
        state: &Arc<Mutex<StreamState>>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(EVENT_POLL_INTERVAL) => {}
            }
            self.poll_events_once(task_id, run_id, state).await;
        }
        // Final drain so the tail of a fast run is not lost.
        self.poll_events_once(task_id, run_id, state).await;
    }

    async fn poll_events_once(
        &self,
        task_id: &TaskId,
        run_id: &str,
        state: &Arc<Mutex<StreamState>>,
    ) {
        let after_seq = state.lock().last_seq;
        let events = match self.inner.agents.get_run_events(run_id, after_seq).await {
            Ok(events) => events,
            Err(e) => {
                debug!(run_id = %run_id, error = %e, "event poll failed");
                return;
            }
        };
        for event in events {
            {
                let mut s = state.lock();
                s.last_seq = s.last_seq.max(event.seq);
                match event.kind {
                    RunEventKind::Log | RunEventKind::Message => {
                        s.output.push_str(&event.text);
                        s.output.push('\n');
                    }
                    _ => {}
                }
                if event.kind == RunEventKind::Message {
                    s.last_message = event.text.clone();
                }
                s.events.push(event.clone());
            }
            match event.kind {
                RunEventKind::Log | RunEventKind::Message | RunEventKind::Status => {
                    self.inner.task_logger.append(task_id, LogStream::Stdout, &event.text);
                }
                RunEventKind::ToolCall => {
                    let tool = event.tool.clone().unwrap_or_else(|| "unknown".into());
                    self.inner.task_logger.append(
                        task_id,
                        LogStream::Stdout,
                        &format!("tool call: {tool}"),
                    );
                    self.inner.bus.emit(Event::ToolCall {
                        task_id: task_id.clone(),
                        tool,
                        detail: (!event.text.is_empty()).then(|| event.text.clone()),
                    });
                }
                RunEventKind::ToolResult => {
                    let stream = if event.ok == Some(false) {
                        LogStream::Stderr
                    } else {
                        LogStream::Stdout
                    };
                    self.inner.task_logger.append(task_id, stream, &event.text);
                }
                RunEventKind::Error => {
                    self.inner.task_logger.append(task_id, LogStream::Stderr, &event.text);
                }
            }
        }
    }
}
