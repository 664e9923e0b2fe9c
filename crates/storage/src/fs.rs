// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-backed task store.

use crate::error::StorageError;
use crate::store::TaskStore;
use drover_core::{Task, TaskId, TaskStatus};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One JSON file per task under `{queue_dir}/{status}/{task_id}.json`.
///
/// Moves stage the record into the destination partition first, then delete
/// the source, so a crash can leave a duplicate but never lose the record.
/// [`FsTaskStore::open`] resolves any duplicates newest-wins before the
/// store is handed out.
pub struct FsTaskStore {
    queue_dir: PathBuf,
    // Serializes move/save mutations. Reads go lock-free; the rename-based
    // writes are atomic at the file level.
    write_lock: Mutex<()>,
}

impl FsTaskStore {
    /// Open (creating directories as needed) and run duplicate recovery.
    pub fn open(queue_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let queue_dir = queue_dir.into();
        for status in TaskStatus::ALL {
            let dir = queue_dir.join(status.dir_name());
            fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        }
        let store = Self { queue_dir, write_lock: Mutex::new(()) };
        store.recover_duplicates()?;
        Ok(store)
    }

    pub fn queue_dir(&self) -> &Path {
        &self.queue_dir
    }

    fn task_path(&self, status: TaskStatus, task_id: &str) -> PathBuf {
        self.queue_dir.join(status.dir_name()).join(format!("{}.json", task_id))
    }

    /// Scan partitions in declaration order for the task's file.
    fn find(&self, task_id: &str) -> Option<(TaskStatus, PathBuf)> {
        TaskStatus::ALL.into_iter().find_map(|status| {
            let path = self.task_path(status, task_id);
            path.exists().then_some((status, path))
        })
    }

    fn read_task(&self, path: &Path) -> Result<Task, StorageError> {
        let data = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        serde_json::from_str(&data)
            .map_err(|e| StorageError::InvalidRecord { path: path.to_path_buf(), source: e })
    }

    /// Write via a staged temp file + rename so readers never observe a
    /// half-written record.
    fn write_task(&self, path: &Path, task: &Task) -> Result<(), StorageError> {
        let data = serde_json::to_string_pretty(task)
            .map_err(|e| StorageError::InvalidRecord { path: path.to_path_buf(), source: e })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data).map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))?;
        Ok(())
    }

    /// A crash between stage and delete leaves the same task id in two
    /// partitions. The newer file (by mtime) is the record that won.
    fn recover_duplicates(&self) -> Result<(), StorageError> {
        let mut seen: std::collections::HashMap<String, (PathBuf, std::time::SystemTime)> =
            std::collections::HashMap::new();

        for status in TaskStatus::ALL {
            let dir = self.queue_dir.join(status.dir_name());
            for entry in fs::read_dir(&dir).map_err(|e| StorageError::io(&dir, e))? {
                let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
                let path = entry.path();
                let Some(id) = task_id_of(&path) else { continue };
                let mtime = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);

                match seen.get(&id) {
                    None => {
                        seen.insert(id, (path, mtime));
                    }
                    Some((prev_path, prev_mtime)) => {
                        // Newer record wins; drop the stale copy.
                        let (stale, keep_path, keep_mtime) = if mtime > *prev_mtime {
                            (prev_path.clone(), path, mtime)
                        } else {
                            (path, prev_path.clone(), *prev_mtime)
                        };
                        warn!(
                            task_id = %id,
                            stale = %stale.display(),
                            "duplicate task record after crash, keeping newer copy"
                        );
                        if let Err(e) = fs::remove_file(&stale) {
                            warn!(path = %stale.display(), error = %e, "failed to remove stale duplicate");
                        }
                        seen.insert(id, (keep_path, keep_mtime));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Extract the task id from a `{task_id}.json` path, ignoring temp files.
fn task_id_of(path: &Path) -> Option<String> {
    if path.extension()? != "json" {
        return None;
    }
    Some(path.file_stem()?.to_string_lossy().into_owned())
}

impl TaskStore for FsTaskStore {
    fn list(&self, status: TaskStatus) -> Result<Vec<Task>, StorageError> {
        let dir = self.queue_dir.join(status.dir_name());
        let mut tasks = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| StorageError::io(&dir, e))? {
            let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
            let path = entry.path();
            if task_id_of(&path).is_none() {
                continue;
            }
            match self.read_task(&path) {
                Ok(task) => tasks.push(task),
                // A corrupt record must not wedge the whole partition.
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable task record"),
            }
        }
        Ok(tasks)
    }

    fn save(&self, task: &Task, status: TaskStatus) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let mut body = task.clone();
        body.status = status;
        self.write_task(&self.task_path(status, &task.id), &body)?;
        for other in TaskStatus::ALL {
            if other == status {
                continue;
            }
            let stale = self.task_path(other, &task.id);
            if stale.exists() {
                fs::remove_file(&stale).map_err(|e| StorageError::io(&stale, e))?;
            }
        }
        Ok(())
    }

    fn save_skip_cleanup(&self, task: &Task, status: TaskStatus) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let mut body = task.clone();
        body.status = status;
        self.write_task(&self.task_path(status, &task.id), &body)
    }

    fn move_task_to(
        &self,
        task_id: &TaskId,
        to: TaskStatus,
    ) -> Result<(Task, TaskStatus), StorageError> {
        let _guard = self.write_lock.lock();
        let (from, source) = self
            .find(task_id)
            .ok_or_else(|| StorageError::TaskNotFound(task_id.to_string()))?;

        let mut task = self.read_task(&source)?;
        task.status = to;

        if from == to {
            self.write_task(&source, &task)?;
            return Ok((task, from));
        }

        // Stage into the destination first; only then delete the source.
        self.write_task(&self.task_path(to, task_id), &task)?;
        fs::remove_file(&source).map_err(|e| StorageError::io(&source, e))?;
        Ok((task, from))
    }

    fn move_task(
        &self,
        task_id: &TaskId,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<(), StorageError> {
        {
            let path = self.task_path(from, task_id);
            if !path.exists() {
                return Err(StorageError::TaskNotFound(task_id.to_string()));
            }
        }
        self.move_task_to(task_id, to).map(|_| ())
    }

    fn current_status(&self, task_id: &TaskId) -> Result<Option<TaskStatus>, StorageError> {
        Ok(self.find(task_id).map(|(status, _)| status))
    }

    fn get(&self, task_id: &TaskId) -> Result<Option<Task>, StorageError> {
        match self.find(task_id) {
            Some((_, path)) => self.read_task(&path).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
