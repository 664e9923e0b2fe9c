// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OS process-group termination helpers.
//!
//! Used when shutdown or a forced reset leaves agent processes that the
//! agent service could not stop: SIGTERM the group, give it a moment, then
//! SIGKILL whatever is left.

use crate::error::AgentError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

/// Delay between the SIGTERM and the SIGKILL escalation.
pub const KILL_ESCALATION_DELAY: Duration = Duration::from_secs(2);

/// Last-resort process termination, behind a trait so callers can be
/// exercised without signalling anything real.
#[async_trait]
pub trait ProcessReaper: Send + Sync + 'static {
    async fn terminate_group(&self, pgid: i32) -> Result<(), AgentError>;
}

/// The production reaper: SIGTERM the group, wait, SIGKILL.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupReaper;

#[async_trait]
impl ProcessReaper for GroupReaper {
    async fn terminate_group(&self, pgid: i32) -> Result<(), AgentError> {
        terminate_process_group(pgid).await
    }
}

/// Terminate a process group: SIGTERM, wait, SIGKILL.
///
/// Returns Ok when the group is gone by the time the escalation finishes
/// (including the case where it never existed).
#[cfg(unix)]
pub async fn terminate_process_group(pgid: i32) -> Result<(), AgentError> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let group = Pid::from_raw(pgid);

    match killpg(group, Signal::SIGTERM) {
        Ok(()) => info!(pgid, "sent SIGTERM to process group"),
        // ESRCH: the group is already gone, nothing to do.
        Err(nix::errno::Errno::ESRCH) => return Ok(()),
        Err(e) => {
            return Err(AgentError::Terminate { pgid, reason: format!("SIGTERM failed: {e}") })
        }
    }

    tokio::time::sleep(KILL_ESCALATION_DELAY).await;

    match killpg(group, Signal::SIGKILL) {
        Ok(()) => {
            warn!(pgid, "process group survived SIGTERM, escalated to SIGKILL");
            Ok(())
        }
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(AgentError::Terminate { pgid, reason: format!("SIGKILL failed: {e}") }),
    }
}

#[cfg(not(unix))]
pub async fn terminate_process_group(pgid: i32) -> Result<(), AgentError> {
    Err(AgentError::Terminate { pgid, reason: "process groups unsupported on this platform".into() })
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
