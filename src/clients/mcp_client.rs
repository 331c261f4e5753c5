//! Client side of the stdio tool protocol (JSON-RPC 2.0, one message per line).

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, SchedulerError};
use crate::models::tool::{ToolCallResult, ToolInfo};
use crate::service::tool_session::ToolSession;

const PROTOCOL_VERSION: &str = "2024-11-05";

struct McpIo {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

/// A tool server running as a child process.
///
/// A write cut short (usually by a caller's timeout) leaves a partial line on the
/// server's stdin, so the session refuses further requests after that.
pub struct McpSession {
    io: Mutex<McpIo>,
    child: Mutex<Child>,
    closed: AtomicBool,
    write_interrupted: AtomicBool,
}

impl McpSession {
    /// Spawns the server and performs the `initialize` handshake.
    pub async fn connect(command: &str, args: &[String]) -> Result<Self> {
        info!(command, ?args, "starting tool server");
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SchedulerError::Session(format!("failed to spawn {}: {}", command, e)))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SchedulerError::Session("tool server has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SchedulerError::Session("tool server has no stdout".to_string()))?;

        let session = Self {
            io: Mutex::new(McpIo {
                stdin,
                stdout: BufReader::new(stdout),
                next_id: 0,
            }),
            child: Mutex::new(child),
            closed: AtomicBool::new(false),
            write_interrupted: AtomicBool::new(false),
        };

        let init = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION") }
        });
        if let Err(err) = session.request("initialize", init).await {
            session.shutdown().await;
            return Err(err);
        }
        session.notify("notifications/initialized").await?;
        info!("tool server initialized");
        Ok(session)
    }

    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut child = self.child.lock().await;
        if let Err(err) = child.kill().await {
            warn!(error = %err, "failed to stop tool server");
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let mut guard = self.io.lock().await;
        self.ensure_usable()?;
        let io = &mut *guard;
        io.next_id += 1;
        let id = io.next_id;
        debug!(id, method, "tool server request");
        write_guarded(
            &mut io.stdin,
            &json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }),
            &self.write_interrupted,
        )
        .await?;
        read_response(&mut io.stdout, id).await
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let mut io = self.io.lock().await;
        self.ensure_usable()?;
        write_guarded(
            &mut io.stdin,
            &json!({ "jsonrpc": "2.0", "method": method }),
            &self.write_interrupted,
        )
        .await
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SchedulerError::Session("tool server has been shut down".to_string()));
        }
        ensure_stream_intact(&self.write_interrupted)
    }
}

#[async_trait]
impl ToolSession for McpSession {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let mut page = self.request("tools/list", params).await?;
            let raw_tools = page
                .get_mut("tools")
                .map(Value::take)
                .unwrap_or_else(|| Value::Array(Vec::new()));
            let listed: Vec<ToolInfo> = serde_json::from_value(raw_tools)
                .map_err(|e| SchedulerError::Session(format!("malformed tools/list result: {}", e)))?;
            tools.extend(listed);
            cursor = page
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                return Ok(tools);
            }
        }
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult> {
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        serde_json::from_value(result)
            .map_err(|e| SchedulerError::Session(format!("malformed tools/call result: {}", e)))
    }

    fn is_active(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && !self.write_interrupted.load(Ordering::SeqCst)
    }
}

// The flag is cleared only once the whole line is flushed; a dropped future leaves it set.
async fn write_guarded<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Value,
    interrupted: &AtomicBool,
) -> Result<()> {
    interrupted.store(true, Ordering::SeqCst);
    write_message(writer, message).await?;
    interrupted.store(false, Ordering::SeqCst);
    Ok(())
}

fn ensure_stream_intact(interrupted: &AtomicBool) -> Result<()> {
    if interrupted.load(Ordering::SeqCst) {
        return Err(SchedulerError::Session(
            "tool server stream is out of sync after an interrupted write".to_string(),
        ));
    }
    Ok(())
}

async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) -> Result<()> {
    let mut line = serde_json::to_string(message)
        .map_err(|e| SchedulerError::Session(format!("failed to encode message: {}", e)))?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| SchedulerError::Session(format!("write to tool server failed: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| SchedulerError::Session(format!("flush to tool server failed: {}", e)))
}

// Skips notifications, server-initiated requests and unrelated lines until the reply to `id`.
async fn read_response<R: AsyncBufRead + Unpin>(reader: &mut R, id: u64) -> Result<Value> {
    loop {
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| SchedulerError::Session(format!("read from tool server failed: {}", e)))?;
        if read == 0 {
            return Err(SchedulerError::Session("tool server closed its output".to_string()));
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let message: Value = match serde_json::from_str(trimmed) {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, line = trimmed, "ignoring non-JSON line");
                continue;
            }
        };
        if message.get("method").is_some() || message.get("id").and_then(Value::as_u64) != Some(id) {
            debug!(%message, "skipping unrelated message");
            continue;
        }
        if let Some(error) = message.get("error") {
            let text = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            return Err(SchedulerError::Session(format!("JSON-RPC error {}: {}", code, text)));
        }
        return Ok(message.get("result").cloned().unwrap_or(Value::Null));
    }
}
