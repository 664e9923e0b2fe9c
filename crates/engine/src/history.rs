// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution history on disk.
//!
//! Every attempt leaves an immutable directory:
//!
//! ```text
//! {logs_dir}/{task_id}/executions/{execution_id}/
//!     prompt.txt          assembled prompt as sent
//!     output.log          raw event stream text
//!     clean_output.txt    accumulated agent output
//!     last_message.txt    final agent message
//!     conversation.jsonl  transcript
//!     metadata.json       the ExecutionRecord
//! ```
//!
//! Execution ids sort chronologically, so directory order is history order.

use crate::error::EngineError;
use drover_core::{Clock, ExecutionRecord, TaskId};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const PROMPT_FILE: &str = "prompt.txt";
pub const RAW_LOG_FILE: &str = "output.log";
pub const CLEAN_OUTPUT_FILE: &str = "clean_output.txt";
pub const LAST_MESSAGE_FILE: &str = "last_message.txt";
pub const TRANSCRIPT_FILE: &str = "conversation.jsonl";
pub const METADATA_FILE: &str = "metadata.json";

/// How long an aggregate history scan stays served from cache.
pub const AGGREGATE_CACHE_TTL: Duration = Duration::from_secs(10);

pub struct HistoryManager<C: Clock> {
    logs_dir: PathBuf,
    clock: C,
    aggregate_cache: Mutex<Option<(u64, Vec<ExecutionRecord>)>>,
}

impl<C: Clock> HistoryManager<C> {
    pub fn new(logs_dir: PathBuf, clock: C) -> Self {
        Self { logs_dir, clock, aggregate_cache: Mutex::new(None) }
    }

    fn executions_dir(&self, task_id: &TaskId) -> PathBuf {
        self.logs_dir.join(task_id.as_str()).join("executions")
    }

    fn execution_dir(&self, task_id: &TaskId, execution_id: &str) -> PathBuf {
        self.executions_dir(task_id).join(execution_id)
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.logs_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    /// Write one artifact file; returns its path relative to the logs root.
    pub fn write_artifact(
        &self,
        task_id: &TaskId,
        execution_id: &str,
        file_name: &str,
        content: &str,
    ) -> Result<String, EngineError> {
        let dir = self.execution_dir(task_id, execution_id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| EngineError::history(dir.display().to_string(), e))?;
        let path = dir.join(file_name);
        std::fs::write(&path, content)
            .map_err(|e| EngineError::history(path.display().to_string(), e))?;
        Ok(self.relative(&path))
    }

    /// Persist the attempt record as `metadata.json`.
    pub fn write_record(&self, record: &ExecutionRecord) -> Result<(), EngineError> {
        let dir = self.execution_dir(&record.task_id, &record.execution_id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| EngineError::history(dir.display().to_string(), e))?;
        let path = dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| EngineError::history(path.display().to_string(), e.into()))?;
        std::fs::write(&path, json)
            .map_err(|e| EngineError::history(path.display().to_string(), e))?;
        *self.aggregate_cache.lock() = None;
        Ok(())
    }

    /// All recorded attempts for a task, newest first. Directories without a
    /// readable record are skipped with a warning.
    pub fn executions_for(&self, task_id: &TaskId) -> Vec<ExecutionRecord> {
        let dir = self.executions_dir(task_id);
        let Ok(entries) = std::fs::read_dir(&dir) else { return Vec::new() };
        let mut records: Vec<ExecutionRecord> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path().join(METADATA_FILE);
                let data = std::fs::read_to_string(&path).ok()?;
                match serde_json::from_str(&data) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable execution record");
                        None
                    }
                }
            })
            .collect();
        records.sort_by(|a, b| b.execution_id.cmp(&a.execution_id));
        records
    }

    /// Every task's attempts, newest first, behind a short-lived cache so
    /// status surfaces polling each second do not rescan the tree.
    pub fn all_executions(&self) -> Vec<ExecutionRecord> {
        let now_ms = self.clock.epoch_ms();
        {
            let cache = self.aggregate_cache.lock();
            if let Some((cached_at, records)) = cache.as_ref() {
                if now_ms.saturating_sub(*cached_at) < AGGREGATE_CACHE_TTL.as_millis() as u64 {
                    return records.clone();
                }
            }
        }

        let mut records = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&self.logs_dir) {
            for entry in entries.flatten() {
                if !entry.path().is_dir() {
                    continue;
                }
                let task_id = TaskId::from(entry.file_name().to_string_lossy().as_ref());
                records.extend(self.executions_for(&task_id));
            }
        }
        records.sort_by(|a, b| b.execution_id.cmp(&a.execution_id));
        *self.aggregate_cache.lock() = Some((now_ms, records.clone()));
        records
    }

    /// Relative path to the newest attempt's output, preferring the clean
    /// accumulated output over the raw log.
    pub fn latest_output_path(&self, task_id: &TaskId) -> Option<String> {
        let newest = self.executions_for(task_id).into_iter().next()?;
        let dir = self.execution_dir(task_id, &newest.execution_id);
        for name in [CLEAN_OUTPUT_FILE, RAW_LOG_FILE] {
            let path = dir.join(name);
            if path.is_file() {
                return Some(self.relative(&path));
            }
        }
        None
    }

    /// Delete execution directories older than the retention window.
    /// Returns how many were removed.
    pub fn prune(&self, task_id: &TaskId, retention_days: u32) -> usize {
        let cutoff_ms = self
            .clock
            .epoch_ms()
            .saturating_sub(u64::from(retention_days) * 24 * 60 * 60 * 1000);
        let mut removed = 0;
        for record in self.executions_for(task_id) {
            if record.ended_at_ms >= cutoff_ms {
                continue;
            }
            let dir = self.execution_dir(task_id, &record.execution_id);
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {
                    debug!(task_id = %task_id, execution_id = %record.execution_id, "pruned execution history");
                    removed += 1;
                }
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "failed to prune execution history");
                }
            }
        }
        if removed > 0 {
            *self.aggregate_cache.lock() = None;
        }
        removed
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
