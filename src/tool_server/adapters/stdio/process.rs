//! Child-process connection speaking newline-delimited JSON-RPC.

use super::protocol::{IncomingMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::tool_server::{
    domain::{ServerDescriptor, ToolServerName},
    ports::{TransportError, TransportResult},
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type PendingResponses = Arc<Mutex<HashMap<u64, oneshot::Sender<IncomingMessage>>>>;
type SharedWriter = Arc<AsyncMutex<Option<ChildStdin>>>;

/// Running tool-server process and its request routing.
///
/// Requests are written one JSON object per line to the child's stdin; a
/// background task reads stdout, routes responses to waiting callers by id,
/// and answers requests the server sends back. The child is killed when the connection is dropped without `close`.
pub struct StdioConnection {
    server: ToolServerName,
    child: AsyncMutex<Option<Child>>,
    writer: SharedWriter,
    pending: PendingResponses,
    next_id: AtomicU64,
    alive: Arc<AtomicBool>,
    reader_task: JoinHandle<()>,
}

impl StdioConnection {
    /// Launches the process described by `descriptor`.
    pub(super) fn spawn(descriptor: &ServerDescriptor) -> TransportResult<Self> {
        let server = descriptor.name().clone();
        info!(
            server = %server,
            command = descriptor.command(),
            args = ?descriptor.args(),
            "spawning tool server"
        );

        let mut child = Command::new(descriptor.command())
            .args(descriptor.args())
            .envs(descriptor.env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| TransportError::Spawn {
                command: descriptor.command().to_owned(),
                reason: err.to_string(),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let pending: PendingResponses = Arc::default();
        let writer: SharedWriter = Arc::new(AsyncMutex::new(Some(stdin)));
        let alive = Arc::new(AtomicBool::new(true));
        let reader_task = tokio::spawn(route_responses(
            server.clone(),
            stdout,
            Arc::clone(&writer),
            Arc::clone(&pending),
            Arc::clone(&alive),
        ));
        tokio::spawn(drain_stderr(server.clone(), stderr));

        Ok(Self {
            server,
            child: AsyncMutex::new(Some(child)),
            writer,
            pending,
            next_id: AtomicU64::new(1),
            alive,
            reader_task,
        })
    }

    /// Returns the server this process serves.
    #[must_use]
    pub const fn server(&self) -> &ToolServerName {
        &self.server
    }

    /// Sends a request and waits up to `timeout` for its response.
    pub(super) async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> TransportResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        let registration = PendingRegistration::insert(&self.pending, id, sender);

        self.write_line(&JsonRpcRequest::new(id, method, params))
            .await?;

        let response = match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(TransportError::Closed),
            Err(_) => {
                return Err(TransportError::Timeout {
                    method: method.to_owned(),
                    timeout,
                });
            }
        };
        drop(registration);

        response.into_result()
    }

    /// Sends a notification; no response is expected.
    pub(super) async fn notify(&self, method: &str) -> TransportResult<()> {
        self.write_line(&JsonRpcNotification::new(method)).await
    }

    async fn write_line(&self, message: &impl Serialize) -> TransportResult<()> {
        write_frame(&self.writer, message).await
    }

    /// Reports whether the process is running and its stdout is open.
    pub(super) async fn is_alive(&self) -> bool {
        if !self.alive.load(Ordering::Acquire) {
            return false;
        }

        let mut child = self.child.lock().await;
        child
            .as_mut()
            .is_some_and(|process| matches!(process.try_wait(), Ok(None)))
    }

    /// Closes stdin, waits up to `grace` for the process to exit, then kills
    /// it. Closing twice is a no-op.
    pub(super) async fn shutdown(&self, grace: Duration) -> TransportResult<()> {
        self.alive.store(false, Ordering::Release);
        drop(self.writer.lock().await.take());

        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };
        self.reader_task.abort();

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(server = %self.server, %status, "tool server exited");
                Ok(())
            }
            Ok(Err(err)) => Err(TransportError::runtime(err)),
            Err(_) => {
                debug!(server = %self.server, "tool server ignored stdin close; killing");
                child.kill().await.map_err(TransportError::runtime)
            }
        }
    }
}

impl fmt::Debug for StdioConnection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StdioConnection")
            .field("server", &self.server)
            .field("alive", &self.alive.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl Drop for StdioConnection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

/// Removes a pending response slot when the request finishes or is cancelled.
struct PendingRegistration<'a> {
    pending: &'a PendingResponses,
    id: u64,
}

impl<'a> PendingRegistration<'a> {
    fn insert(
        pending: &'a PendingResponses,
        id: u64,
        sender: oneshot::Sender<IncomingMessage>,
    ) -> Self {
        pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sender);
        Self { pending, id }
    }
}

impl Drop for PendingRegistration<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

async fn write_frame(
    writer: &AsyncMutex<Option<ChildStdin>>,
    message: &impl Serialize,
) -> TransportResult<()> {
    let mut frame =
        serde_json::to_vec(message).map_err(|err| TransportError::Protocol(err.to_string()))?;
    frame.push(b'\n');

    let mut writer = writer.lock().await;
    let stdin = writer.as_mut().ok_or(TransportError::Closed)?;
    stdin.write_all(&frame).await.map_err(write_error)?;
    stdin.flush().await.map_err(write_error)
}

async fn route_responses(
    server: ToolServerName,
    stdout: impl AsyncRead + Unpin,
    writer: SharedWriter,
    pending: PendingResponses,
    alive: Arc<AtomicBool>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(reply) = dispatch_line(&server, &line, &pending) else {
                    continue;
                };
                if let Err(err) = write_frame(&writer, &reply).await {
                    warn!(server = %server, error = %err, "failed to answer server request");
                }
            }
            Ok(None) => {
                info!(server = %server, "tool server closed stdout");
                break;
            }
            Err(err) => {
                warn!(server = %server, error = %err, "failed to read tool server stdout");
                break;
            }
        }
    }

    alive.store(false, Ordering::Release);
    // Dropping the senders wakes every waiter with a closed-connection error.
    pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

/// Routes one stdout line; returns the reply owed to a server request.
fn dispatch_line(
    server: &ToolServerName,
    line: &str,
    pending: &PendingResponses,
) -> Option<JsonRpcResponse> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let message: IncomingMessage = match serde_json::from_str(trimmed) {
        Ok(message) => message,
        Err(err) => {
            warn!(server = %server, error = %err, "discarding malformed tool server output");
            return None;
        }
    };

    let Some(id) = message.response_id() else {
        debug!(server = %server, method = ?message.method, "handling server-initiated message");
        return message.reply();
    };

    let waiter = pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id);
    match waiter {
        Some(sender) => {
            if sender.send(message).is_err() {
                debug!(server = %server, id, "response arrived after caller gave up");
            }
        }
        None => debug!(server = %server, id, "response for unknown request id"),
    }
    None
}

async fn drain_stderr(server: ToolServerName, stderr: impl AsyncRead + Unpin) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            debug!(server = %server, stderr = trimmed, "tool server stderr");
        }
    }
}

fn missing_pipe(name: &str) -> TransportError {
    TransportError::runtime(io::Error::other(format!("child {name} pipe unavailable")))
}

fn write_error(err: io::Error) -> TransportError {
    if err.kind() == io::ErrorKind::BrokenPipe {
        TransportError::Closed
    } else {
        TransportError::runtime(err)
    }
}
