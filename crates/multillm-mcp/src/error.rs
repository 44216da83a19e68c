use std::io;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// MCP subsystem errors
///
/// Every variant is fatal to the call that produced it; the client never
/// retries on its own.
#[derive(Debug, Error)]
pub enum McpError {
    /// Server process could not be started
    #[error("failed to start MCP server `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Malformed Content-Length header block
    #[error("invalid frame: {0}")]
    Framing(String),

    /// Peer closed its output before a complete frame arrived
    #[error("MCP server closed the connection")]
    ConnectionClosed,

    /// Peer answered with a JSON-RPC `error` member, kept verbatim
    #[error("MCP request `{method}` failed: {error}")]
    Rpc { method: String, error: Value },

    /// `initialize` did not produce a usable result
    #[error("MCP initialize failed: {0}")]
    Handshake(String),

    /// Request exceeded the per-request timeout
    #[error("MCP request `{method}` timed out after {}ms", .timeout.as_millis())]
    Timeout { method: String, timeout: Duration },

    /// Tool arguments are not a JSON object
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// Client was shut down or its connection is no longer usable
    #[error("MCP client is closed")]
    Closed,

    /// Requested server does not exist in configuration
    #[error("server not found: {server}")]
    ServerNotFound { server: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Stable machine-readable category
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "spawn",
            Self::Framing(_) => "framing",
            Self::ConnectionClosed => "connection_closed",
            Self::Rpc { .. } => "rpc",
            Self::Handshake(_) => "handshake",
            Self::Timeout { .. } => "timeout",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::Closed => "closed",
            Self::ServerNotFound { .. } => "not_found",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    /// Whether the connection can no longer carry requests after this error
    pub const fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            Self::Framing(_) | Self::ConnectionClosed | Self::Handshake(_) | Self::Closed | Self::Io(_)
        )
    }
}
