use std::path::PathBuf;

use indexmap::IndexMap;
use multillm_mcp::{
    DEFAULT_CLIENT_NAME, DEFAULT_CLIENT_VERSION, DEFAULT_PROTOCOL_VERSION, McpClientOptions, McpServerRegistry,
};
use serde::Deserialize;

use crate::llm::parse_duration;

/// Top-level MCP configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct McpConfig {
    /// Stdio MCP servers keyed by name
    #[serde(default)]
    pub servers: IndexMap<String, McpServerConfig>,
}

impl McpConfig {
    /// Registry of every configured server
    pub fn registry(&self) -> anyhow::Result<McpServerRegistry> {
        self.servers
            .iter()
            .map(|(name, server)| {
                let options = McpClientOptions::try_from(server)
                    .map_err(|e| anyhow::anyhow!("MCP server '{name}': {e}"))?;
                Ok((name.clone(), options))
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .map(McpServerRegistry::new)
    }
}

/// One stdio MCP server
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct McpServerConfig {
    /// Executable to start; arguments go in `args`, no shell is involved
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the server process
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Variables added to the inherited environment
    #[serde(default)]
    pub env: IndexMap<String, String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_client_version")]
    pub client_version: String,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
}

fn default_request_timeout() -> String {
    "15s".to_owned()
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_owned()
}

fn default_client_version() -> String {
    DEFAULT_CLIENT_VERSION.to_owned()
}

fn default_protocol_version() -> String {
    DEFAULT_PROTOCOL_VERSION.to_owned()
}

impl TryFrom<&McpServerConfig> for McpClientOptions {
    type Error = anyhow::Error;

    fn try_from(config: &McpServerConfig) -> anyhow::Result<Self> {
        if config.command.trim().is_empty() {
            anyhow::bail!("command must not be empty");
        }

        Ok(Self {
            command: config.command.clone(),
            args: config.args.clone(),
            cwd: config.cwd.clone(),
            env: config.env.clone(),
            request_timeout: parse_duration("request_timeout", &config.request_timeout)?,
            client_name: config.client_name.clone(),
            client_version: config.client_version.clone(),
            protocol_version: config.protocol_version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn server_defaults() {
        let config: McpConfig = toml::from_str(
            r#"
            [servers.demo]
            command = "mcp-demo"
            "#,
        )
        .unwrap();

        let options = McpClientOptions::try_from(&config.servers["demo"]).unwrap();
        assert_eq!(options.request_timeout, Duration::from_secs(15));
        assert_eq!(options.client_name, "multillm-mcp-client");
        assert_eq!(options.protocol_version, "2024-11-05");
        assert!(options.args.is_empty() && options.env.is_empty() && options.cwd.is_none());
    }

    #[test]
    fn full_server_definition() {
        let config: McpConfig = toml::from_str(
            r#"
            [servers.files]
            command = "node"
            args = ["server.js", "--root", "/srv"]
            cwd = "/opt/files"
            env = { LOG_LEVEL = "debug" }
            request_timeout = "3s"
            client_name = "ops"
            client_version = "2.1.0"
            protocol_version = "2025-03-26"
            "#,
        )
        .unwrap();

        let registry = config.registry().unwrap();
        let options = registry.options("files").unwrap();
        assert_eq!(options.args, ["server.js", "--root", "/srv"]);
        assert_eq!(options.cwd.as_deref(), Some(std::path::Path::new("/opt/files")));
        assert_eq!(options.env["LOG_LEVEL"], "debug");
        assert_eq!(options.request_timeout, Duration::from_secs(3));
        assert_eq!(options.client_version, "2.1.0");
    }

    #[test]
    fn blank_command_is_rejected() {
        let config: McpConfig = toml::from_str("[servers.bad]\ncommand = \"  \"").unwrap();
        let err = config.registry().unwrap_err();
        assert!(err.to_string().contains("'bad'"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<McpConfig>("[servers.x]\ncommand = \"a\"\nshell = true").is_err());
    }
}
