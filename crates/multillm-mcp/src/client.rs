use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};

use crate::error::McpError;
use crate::framing::{FrameReader, FrameWriter};
use crate::protocol::{
    METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, McpToolDescriptor, McpToolResult,
    Notification, Request, Response, parse_tools,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_CLIENT_NAME: &str = "multillm-mcp-client";
pub const DEFAULT_CLIENT_VERSION: &str = "0.1.0";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Frames buffered between the stdout reader task and the session
const INBOX_CAPACITY: usize = 64;

/// How to start and talk to one stdio MCP server
#[derive(Debug, Clone)]
pub struct McpClientOptions {
    /// Executable, started directly without a shell
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Layered over the inherited environment
    pub env: IndexMap<String, String>,
    /// Bound on each `initialize`, `tools/list` and `tools/call`
    pub request_timeout: Duration,
    pub client_name: String,
    pub client_version: String,
    pub protocol_version: String,
}

impl McpClientOptions {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            env: IndexMap::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client_name: DEFAULT_CLIENT_NAME.to_owned(),
            client_version: DEFAULT_CLIENT_VERSION.to_owned(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_owned(),
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Tool discovery and invocation against one MCP server
#[async_trait]
pub trait McpClient: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<McpToolDescriptor>, McpError>;

    /// Invoke `name`; `arguments` must be a JSON object (`null` means none)
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<McpToolResult, McpError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

struct Session {
    state: State,
    child: Child,
    writer: FrameWriter<ChildStdin>,
    inbox: mpsc::Receiver<Result<Vec<u8>, McpError>>,
    next_id: u64,
    /// Set while a frame is being written; still set on entry means the
    /// previous writer was dropped mid-frame
    writing: bool,
    tasks: Vec<JoinHandle<()>>,
}

/// MCP client speaking to a child process over stdin/stdout
///
/// The handshake runs lazily on the first call. Requests are serialized: one
/// lock covers the whole request/response cycle, so at most one request is
/// outstanding on the connection. Dropping a call future abandons that call;
/// if it was dropped while writing, the connection is closed.
pub struct StdioMcpClient {
    options: McpClientOptions,
    /// Known without the session lock, so shutdown can kill a server that an
    /// in-flight request is still waiting on
    pid: Option<u32>,
    shutting_down: AtomicBool,
    session: Mutex<Session>,
}

impl StdioMcpClient {
    /// Start the server process
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(options: McpClientOptions) -> Result<Self, McpError> {
        let mut command = Command::new(&options.command);
        command
            .args(&options.args)
            .envs(&options.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &options.cwd {
            command.current_dir(cwd);
        }
        #[cfg(unix)]
        command.process_group(0);

        let spawn_error = |source| McpError::Spawn {
            command: options.command.clone(),
            source,
        };
        let mut child = command.spawn().map_err(spawn_error)?;

        let (Some(stdin), Some(stdout), Some(stderr)) = (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(spawn_error(std::io::Error::other("child stdio was not captured")));
        };

        let (tx, inbox) = mpsc::channel(INBOX_CAPACITY);
        let tasks = vec![
            tokio::spawn(pump_frames(stdout, tx)),
            tokio::spawn(drain_stderr(stderr, options.command.clone())),
        ];

        let pid = child.id();
        tracing::debug!(server = %options.command, pid = ?pid, "MCP server started");

        Ok(Self {
            pid,
            shutting_down: AtomicBool::new(false),
            session: Mutex::new(Session {
                state: State::Uninitialized,
                child,
                writer: FrameWriter::new(stdin),
                inbox,
                next_id: 1,
                writing: false,
                tasks,
            }),
            options,
        })
    }

    pub const fn options(&self) -> &McpClientOptions {
        &self.options
    }

    /// Terminate the server and wait for it to exit
    ///
    /// Safe to call repeatedly, before any request, or after the server has
    /// already exited. On unix the server is killed before taking the session
    /// lock, so a request in flight fails with
    /// [`McpError::ConnectionClosed`] instead of running to its timeout.
    pub async fn shutdown(&self) {
        if !self.shutting_down.swap(true, Ordering::SeqCst) {
            self.interrupt();
        }

        let mut session = self.session.lock().await;
        session.state = State::Closed;

        kill_tree(&mut session.child);
        if let Err(e) = session.child.wait().await {
            tracing::debug!(server = %self.options.command, error = %e, "waiting for MCP server failed");
        }
        for task in session.tasks.drain(..) {
            task.abort();
        }
    }

    /// Kill the server's process group without waiting for the session lock
    fn interrupt(&self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid
            && !kill_group(pid)
        {
            tracing::debug!(server = %self.options.command, pid, "MCP server already gone");
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let mut session = self.session.lock().await;
        if session.writing || self.shutting_down.load(Ordering::SeqCst) {
            session.state = State::Closed;
        }

        self.ensure_ready(&mut session).await?;
        let response = session.run(method, params, self.options.request_timeout).await?;
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn ensure_ready(&self, session: &mut Session) -> Result<(), McpError> {
        match session.state {
            State::Ready => return Ok(()),
            State::Closed => return Err(McpError::Closed),
            // Initializing here means an earlier handshake was abandoned
            State::Uninitialized | State::Initializing => {}
        }

        session.state = State::Initializing;
        let params = json!({
            "protocolVersion": self.options.protocol_version,
            "capabilities": {},
            "clientInfo": {
                "name": self.options.client_name,
                "version": self.options.client_version,
            },
        });

        let response = match session.run(METHOD_INITIALIZE, params, self.options.request_timeout).await {
            Ok(response) => response,
            Err(e @ McpError::Timeout { .. }) => {
                if session.state == State::Initializing {
                    session.state = State::Uninitialized;
                }
                return Err(e);
            }
            Err(e) => {
                session.state = State::Closed;
                return Err(e);
            }
        };

        let Some(result) = response.result else {
            session.state = State::Closed;
            return Err(McpError::Handshake("missing result payload".to_owned()));
        };

        let deadline = Instant::now() + self.options.request_timeout;
        if let Err(e) = session
            .send(&Notification::new(METHOD_INITIALIZED), METHOD_INITIALIZED, deadline, self.options.request_timeout)
            .await
        {
            session.state = State::Closed;
            return Err(e);
        }

        session.state = State::Ready;
        tracing::info!(
            server = %self.options.command,
            protocol_version = result.get("protocolVersion").and_then(serde_json::Value::as_str).unwrap_or_default(),
            "MCP session initialized"
        );
        Ok(())
    }
}

#[async_trait]
impl McpClient for StdioMcpClient {
    async fn list_tools(&self) -> Result<Vec<McpToolDescriptor>, McpError> {
        let result = self.request(METHOD_TOOLS_LIST, json!({})).await?;
        Ok(parse_tools(&result)?)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<McpToolResult, McpError> {
        let arguments = match arguments {
            Value::Null => json!({}),
            Value::Object(_) => arguments,
            other => {
                return Err(McpError::InvalidArguments(format!(
                    "expected a JSON object, got {other}"
                )));
            }
        };

        let result = self
            .request(METHOD_TOOLS_CALL, json!({ "name": name, "arguments": arguments }))
            .await?;
        Ok(McpToolResult::from_result(name, result))
    }
}

impl Drop for StdioMcpClient {
    fn drop(&mut self) {
        let session = self.session.get_mut();
        if session.state != State::Closed {
            kill_tree(&mut session.child);
        }
        for task in session.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Session {
    /// One request/response exchange; errors that break the connection
    /// close the session
    async fn run(&mut self, method: &str, params: Value, timeout: Duration) -> Result<Response, McpError> {
        let outcome = self.exchange(method, params, timeout).await;
        if let Err(e) = &outcome
            && e.is_fatal_to_connection()
        {
            self.state = State::Closed;
        }
        outcome
    }

    async fn exchange(&mut self, method: &str, params: Value, timeout: Duration) -> Result<Response, McpError> {
        let deadline = Instant::now() + timeout;
        let id = self.next_id;
        self.next_id += 1;

        self.send(&Request::new(id, method, params), method, deadline, timeout)
            .await?;
        tracing::debug!(method, id, "MCP request sent");

        loop {
            let frame = match timeout_at(deadline, self.inbox.recv()).await {
                Ok(Some(frame)) => frame?,
                Ok(None) => return Err(McpError::ConnectionClosed),
                Err(_) => return Err(timed_out(method, timeout)),
            };

            let response: Response = serde_json::from_slice(&frame)?;
            if !response.answers(id) {
                tracing::trace!(method, id, received = ?response.id, "skipping unrelated MCP message");
                continue;
            }

            return match response.error {
                Some(error) => Err(McpError::Rpc {
                    method: method.to_owned(),
                    error,
                }),
                None => Ok(response),
            };
        }
    }

    async fn send<T: Serialize + Sync>(
        &mut self,
        message: &T,
        method: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<(), McpError> {
        self.writing = true;
        if let Ok(written) = timeout_at(deadline, self.writer.write_json(message)).await {
            self.writing = false;
            written
        } else {
            // A partial frame is on the wire
            self.state = State::Closed;
            Err(timed_out(method, timeout))
        }
    }
}

fn timed_out(method: &str, timeout: Duration) -> McpError {
    McpError::Timeout {
        method: method.to_owned(),
        timeout,
    }
}

/// Forward decoded stdout frames until the stream ends or breaks
async fn pump_frames(stdout: ChildStdout, tx: mpsc::Sender<Result<Vec<u8>, McpError>>) {
    let mut reader = FrameReader::new(stdout);
    loop {
        let frame = reader.read_frame().await;
        let done = frame.is_err();
        if tx.send(frame).await.is_err() || done {
            break;
        }
    }
}

async fn drain_stderr(stderr: ChildStderr, server: String) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(server = %server, "{line}");
    }
}

/// Kill the server and everything in its process group, if still running
fn kill_tree(child: &mut Child) {
    if matches!(child.try_wait(), Ok(Some(_))) {
        return;
    }

    #[cfg(unix)]
    if let Some(pid) = child.id()
        && kill_group(pid)
    {
        return;
    }

    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "failed to kill MCP server");
    }
}

/// SIGKILL the process group led by `pid`
#[cfg(unix)]
fn kill_group(pid: u32) -> bool {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    i32::try_from(pid).is_ok_and(|pid| killpg(Pid::from_raw(pid), Signal::SIGKILL).is_ok())
}
