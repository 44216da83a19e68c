//! Configuration for the multillm workspace
//!
//! A single TOML file with `[llm]`, `[mcp]` and `[telemetry]` sections.
//! Values may reference environment variables as `{{ env.VAR }}`.

#![allow(clippy::must_use_candidate)]

mod env;
pub mod llm;
mod loader;
pub mod mcp;
pub mod telemetry;

use serde::Deserialize;

pub use llm::*;
pub use mcp::*;
pub use telemetry::*;

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    /// MCP server definitions
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
