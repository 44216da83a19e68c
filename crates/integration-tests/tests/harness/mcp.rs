//! Helpers for driving the `mock-mcp-server` binary

use std::time::Duration;

use multillm_mcp::{McpClientOptions, StdioMcpClient};

/// Options pointing at the mock server built alongside these tests
pub fn mock_server() -> McpClientOptions {
    McpClientOptions::new(env!("CARGO_BIN_EXE_mock-mcp-server")).request_timeout(Duration::from_secs(10))
}

/// Mock server with one behaviour switch turned on
pub fn mock_server_with(flag: &str) -> McpClientOptions {
    mock_server().env(flag, "1")
}

pub fn spawn(options: McpClientOptions) -> StdioMcpClient {
    StdioMcpClient::spawn(options).expect("mock server starts")
}
