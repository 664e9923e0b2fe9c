// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.
//!
//! Startup takes the exclusive PID lock, opens the task queue, wires the
//! orchestrator to the agent-manager socket, and drains the broadcast bus
//! into `events.jsonl` for external subscribers.

use crate::config::Config;
use crate::error::DaemonError;
use crate::rpc::SocketAgentClient;
use drover_core::{Envelope, SystemClock};
use drover_engine::{BasicPromptAssembler, Orchestrator};
use drover_storage::FsTaskStore;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type DaemonOrchestrator = Orchestrator<FsTaskStore, SocketAgentClient, SystemClock>;

/// Exclusive daemon lock, held for the life of the process.
///
/// The file stays on disk between runs; the advisory lock is what prevents
/// a second daemon, so a stale file from a crashed process is harmless.
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    pub fn acquire(path: PathBuf) -> Result<Self, DaemonError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        if file.try_lock_exclusive().is_err() {
            return Err(DaemonError::AlreadyRunning(path));
        }
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;
        Ok(Self { file, path })
    }

    pub fn release(self) {
        let _ = self.file.unlock();
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}

/// A running daemon: the orchestrator plus its event drain and PID lock.
pub struct Daemon {
    orchestrator: DaemonOrchestrator,
    drain: tokio::task::JoinHandle<()>,
    drain_cancel: CancellationToken,
    lock: LockFile,
}

impl Daemon {
    /// Bring the daemon up: lock, open the queue, start the orchestrator
    /// loops, and begin draining events to disk.
    pub fn start(config: Config) -> Result<Self, DaemonError> {
        std::fs::create_dir_all(&config.state_dir)?;
        let lock = LockFile::acquire(config.lock_path.clone())?;
        std::fs::create_dir_all(&config.log_dir)?;
        std::fs::create_dir_all(&config.engine.logs_dir)?;

        let store = Arc::new(FsTaskStore::open(&config.queue_dir)?);
        let agents = Arc::new(SocketAgentClient::new(config.agent_socket.clone()));
        let (orchestrator, rx) = Orchestrator::new(
            store,
            agents,
            Arc::new(BasicPromptAssembler),
            config.engine.clone(),
            SystemClock,
        );
        for profile in &config.steering_profiles {
            orchestrator.steering().register_profile(profile.clone());
        }

        let drain_cancel = CancellationToken::new();
        let drain =
            tokio::spawn(drain_events(rx, config.events_path.clone(), drain_cancel.clone()));
        orchestrator.start();
        info!(
            state_dir = %config.state_dir.display(),
            agent_socket = %config.agent_socket.display(),
            slots = config.engine.slots,
            "daemon started"
        );

        Ok(Self { orchestrator, drain, drain_cancel, lock })
    }

    pub fn orchestrator(&self) -> &DaemonOrchestrator {
        &self.orchestrator
    }

    /// Stop the loops and live runs, flush the event drain, drop the lock.
    pub async fn shutdown(self) {
        self.orchestrator.stop().await;
        self.drain_cancel.cancel();
        if let Err(e) = self.drain.await {
            warn!(error = %e, "event drain ended abnormally");
        }
        self.lock.release();
        info!("daemon stopped");
    }
}

/// Append each broadcast envelope to `events_path` as one JSON line.
///
/// On cancellation, already-queued events are flushed before exit.
async fn drain_events(
    mut rx: mpsc::Receiver<Envelope>,
    events_path: PathBuf,
    cancel: CancellationToken,
) {
    let file = OpenOptions::new().create(true).append(true).open(&events_path);
    let mut file = match file {
        Ok(f) => f,
        Err(e) => {
            warn!(path = %events_path.display(), error = %e, "cannot open events file; dropping events");
            cancel.cancelled().await;
            return;
        }
    };
    loop {
        tokio::select! {
            envelope = rx.recv() => match envelope {
                Some(envelope) => append_event(&mut file, &events_path, &envelope),
                None => return,
            },
            _ = cancel.cancelled() => break,
        }
    }
    while let Ok(envelope) = rx.try_recv() {
        append_event(&mut file, &events_path, &envelope);
    }
}

fn append_event(file: &mut File, events_path: &std::path::Path, envelope: &Envelope) {
    let line = match serde_json::to_string(envelope) {
        Ok(line) => line,
        Err(e) => {
            warn!(error = %e, "unserializable event");
            return;
        }
    };
    if let Err(e) = writeln!(file, "{line}") {
        warn!(path = %events_path.display(), error = %e, "failed to append event");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
