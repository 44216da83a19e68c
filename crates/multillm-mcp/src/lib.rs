//! MCP client over stdio
//!
//! Starts an MCP server as a child process and speaks JSON-RPC 2.0 to it
//! using Content-Length framing: lazy `initialize` handshake, tool discovery
//! through `tools/list` and invocation through `tools/call`.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod client;
mod error;
pub mod framing;
pub mod protocol;
mod registry;

pub use client::{
    DEFAULT_CLIENT_NAME, DEFAULT_CLIENT_VERSION, DEFAULT_PROTOCOL_VERSION, DEFAULT_REQUEST_TIMEOUT, McpClient,
    McpClientOptions, StdioMcpClient,
};
pub use error::McpError;
pub use framing::{FrameReader, FrameWriter};
pub use protocol::{McpToolDescriptor, McpToolResult};
pub use registry::McpServerRegistry;
