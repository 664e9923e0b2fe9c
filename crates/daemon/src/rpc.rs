// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-manager RPC client.
//!
//! Line-delimited JSON over a Unix socket: one `{method, params}` request
//! per connection, one `{ok, error?, result?}` response. The manager owns
//! long-running runs; `wait_for_run` long-polls on its side, so every call
//! here is a short-lived connection.

use async_trait::async_trait;
use drover_agent::{AgentError, AgentService, Run, RunEvent, StartRun};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub struct SocketAgentClient {
    socket_path: PathBuf,
}

#[derive(Serialize)]
struct RpcRequest<'a, P: Serialize> {
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    ok: bool,
    #[serde(default)]
    error: String,
    result: Option<R>,
}

impl SocketAgentClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, AgentError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| AgentError::Unavailable(format!("{}: {e}", self.socket_path.display())))?;

        let mut line = serde_json::to_string(&RpcRequest { method, params })
            .map_err(|e| AgentError::Rpc(e.to_string()))?;
        line.push('\n');
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| AgentError::Rpc(format!("{method}: {e}")))?;

        let mut reader = BufReader::new(stream);
        let mut response = String::new();
        reader
            .read_line(&mut response)
            .await
            .map_err(|e| AgentError::Rpc(format!("{method}: {e}")))?;

        let response: RpcResponse<R> = serde_json::from_str(&response)
            .map_err(|e| AgentError::Rpc(format!("{method}: bad response: {e}")))?;
        if !response.ok {
            if response.error.contains("not found") {
                return Err(AgentError::RunNotFound(response.error));
            }
            return Err(AgentError::Rpc(format!("{method}: {}", response.error)));
        }
        response.result.ok_or_else(|| AgentError::Rpc(format!("{method}: empty result")))
    }
}

#[derive(Deserialize)]
struct RunIdResult {
    run_id: String,
}

#[derive(Deserialize)]
struct TagsResult {
    tags: Vec<String>,
}

#[derive(Deserialize)]
struct PgidResult {
    pgid: Option<i32>,
}

#[async_trait]
impl AgentService for SocketAgentClient {
    async fn is_available(&self) -> bool {
        self.call::<_, serde_json::Value>("ping", json!({})).await.is_ok()
    }

    async fn execute_task_async(&self, req: StartRun) -> Result<String, AgentError> {
        let result: RunIdResult = self
            .call(
                "execute_task_async",
                json!({
                    "task_id": req.task_id,
                    "prompt": req.prompt,
                    "timeout_secs": req.timeout_secs,
                    "tag": req.tag,
                }),
            )
            .await?;
        Ok(result.run_id)
    }

    async fn wait_for_run(&self, run_id: &str) -> Result<Run, AgentError> {
        self.call("wait_for_run", json!({ "run_id": run_id })).await
    }

    async fn get_run_events(
        &self,
        run_id: &str,
        after_seq: u64,
    ) -> Result<Vec<RunEvent>, AgentError> {
        self.call("get_run_events", json!({ "run_id": run_id, "after_seq": after_seq })).await
    }

    async fn stop_run(&self, run_id: &str) -> Result<(), AgentError> {
        let _: serde_json::Value = self.call("stop_run", json!({ "run_id": run_id })).await?;
        Ok(())
    }

    async fn run_pgid(&self, run_id: &str) -> Result<Option<i32>, AgentError> {
        let result: PgidResult = self.call("get_run_pgid", json!({ "run_id": run_id })).await?;
        Ok(result.pgid)
    }

    async fn list_agent_tags(&self, prefix: &str) -> Result<Vec<String>, AgentError> {
        let result: TagsResult = self.call("list_agent_tags", json!({ "prefix": prefix })).await?;
        Ok(result.tags)
    }
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
