// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task live log buffers.
//!
//! Each running task gets a bounded in-memory ring of log entries that UI
//! surfaces poll with an `after_seq` cursor. Every append is also mirrored
//! onto the broadcast bus. When the attempt concludes the buffer is spilled
//! to `{logs_dir}/{task_id}.log` and retired.

use crate::bus::Bus;
use drover_core::{Clock, Event, LogStream, TaskId};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

/// Ring capacity per task. Older entries fall off; sequences keep counting.
pub const MAX_TASK_LOG_ENTRIES: usize = 2000;

#[derive(Debug, Clone, Serialize)]
pub struct TaskLogEntry {
    pub sequence: u64,
    pub stream: LogStream,
    pub level: String,
    pub message: String,
    pub timestamp_ms: u64,
}

/// Snapshot returned to pollers.
#[derive(Debug, Clone, Serialize)]
pub struct LogTail {
    pub entries: Vec<TaskLogEntry>,
    pub last_seq: u64,
    pub agent_id: String,
    pub completed: bool,
    /// Pid of the process serving this buffer; pollers use it to detect a
    /// daemon restart between reads.
    pub process_id: u32,
}

struct TaskLog {
    entries: VecDeque<TaskLogEntry>,
    last_seq: u64,
    agent_id: String,
    completed: bool,
}

pub struct TaskLogger<C: Clock> {
    logs: Mutex<HashMap<TaskId, TaskLog>>,
    logs_dir: PathBuf,
    bus: Bus<C>,
    clock: C,
}

impl<C: Clock> TaskLogger<C> {
    pub fn new(logs_dir: PathBuf, bus: Bus<C>, clock: C) -> Self {
        Self { logs: Mutex::new(HashMap::new()), logs_dir, bus, clock }
    }

    /// Open (or reopen) a task's buffer for a new attempt.
    pub fn begin(&self, task_id: &TaskId, agent_id: &str) {
        self.logs.lock().insert(
            task_id.clone(),
            TaskLog {
                entries: VecDeque::new(),
                last_seq: 0,
                agent_id: agent_id.to_string(),
                completed: false,
            },
        );
    }

    /// Append one line; assigns the next sequence and mirrors to the bus.
    pub fn append(&self, task_id: &TaskId, stream: LogStream, message: &str) {
        let timestamp_ms = self.clock.epoch_ms();
        let level = match stream {
            LogStream::Stdout => "info",
            LogStream::Stderr => "error",
        };
        let (entry, agent_id) = {
            let mut logs = self.logs.lock();
            let log = logs.entry(task_id.clone()).or_insert_with(|| TaskLog {
                entries: VecDeque::new(),
                last_seq: 0,
                agent_id: String::new(),
                completed: false,
            });
            log.last_seq += 1;
            let entry = TaskLogEntry {
                sequence: log.last_seq,
                stream,
                level: level.to_string(),
                message: message.to_string(),
                timestamp_ms,
            };
            log.entries.push_back(entry.clone());
            while log.entries.len() > MAX_TASK_LOG_ENTRIES {
                log.entries.pop_front();
            }
            (entry, log.agent_id.clone())
        };
        self.bus.emit(Event::LogEntry {
            task_id: task_id.clone(),
            agent_id,
            stream,
            level: entry.level.clone(),
            message: entry.message.clone(),
            sequence: entry.sequence,
            timestamp: timestamp_ms / 1000,
        });
    }

    /// Entries with `sequence > after_seq`, plus buffer metadata.
    pub fn tail(&self, task_id: &TaskId, after_seq: u64) -> Option<LogTail> {
        let logs = self.logs.lock();
        let log = logs.get(task_id)?;
        Some(LogTail {
            entries: log.entries.iter().filter(|e| e.sequence > after_seq).cloned().collect(),
            last_seq: log.last_seq,
            agent_id: log.agent_id.clone(),
            completed: log.completed,
            process_id: std::process::id(),
        })
    }

    /// Snapshot of the raw buffer text, for artifact persistence.
    pub fn raw_text(&self, task_id: &TaskId) -> String {
        let logs = self.logs.lock();
        let Some(log) = logs.get(task_id) else { return String::new() };
        let mut out = String::new();
        for entry in &log.entries {
            out.push_str(&format!("[{}] {}\n", entry.stream, entry.message));
        }
        out
    }

    /// Mark the attempt finished and spill the buffer to
    /// `{logs_dir}/{task_id}.log`. The buffer stays queryable until
    /// [`TaskLogger::clear`].
    pub fn finalize(&self, task_id: &TaskId, success: bool) {
        let (header, body) = {
            let mut logs = self.logs.lock();
            let Some(log) = logs.get_mut(task_id) else { return };
            log.completed = true;
            let header = format!(
                "# task {task_id} agent={} entries={} success={success}\n",
                log.agent_id,
                log.entries.len(),
            );
            let mut body = String::new();
            for entry in &log.entries {
                body.push_str(&format!(
                    "{} [{}] {}\n",
                    entry.timestamp_ms, entry.stream, entry.message
                ));
            }
            (header, body)
        };
        let path = self.logs_dir.join(format!("{task_id}.log"));
        let result = std::fs::create_dir_all(&self.logs_dir).and_then(|()| {
            let mut file = std::fs::File::create(&path)?;
            file.write_all(header.as_bytes())?;
            file.write_all(body.as_bytes())
        });
        if let Err(e) = result {
            warn!(task_id = %task_id, path = %path.display(), error = %e, "failed to spill task log");
        }
    }

    /// Drop the buffer (e.g. when reconcile re-queues an orphan).
    pub fn clear(&self, task_id: &TaskId) {
        self.logs.lock().remove(task_id);
    }
}

#[cfg(test)]
#[path = "task_logger_tests.rs"]
mod tests;
