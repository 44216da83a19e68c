use indexmap::IndexMap;

use crate::client::{McpClientOptions, StdioMcpClient};
use crate::error::McpError;

/// Named MCP server definitions
///
/// Clients are created on demand; each call to [`client`](Self::client)
/// starts a fresh server process owned by the returned client.
#[derive(Debug, Clone, Default)]
pub struct McpServerRegistry {
    servers: IndexMap<String, McpClientOptions>,
}

impl McpServerRegistry {
    pub fn new(servers: impl IntoIterator<Item = (String, McpClientOptions)>) -> Self {
        Self {
            servers: servers.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn with_server(mut self, name: impl Into<String>, options: McpClientOptions) -> Self {
        self.servers.insert(name.into(), options);
        self
    }

    /// Configured server names, in definition order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    pub fn options(&self, name: &str) -> Result<&McpClientOptions, McpError> {
        self.servers.get(name).ok_or_else(|| McpError::ServerNotFound {
            server: name.to_owned(),
        })
    }

    /// Start the server registered as `name`
    pub fn client(&self, name: &str) -> Result<StdioMcpClient, McpError> {
        let options = self.options(name)?;
        tracing::debug!(server = name, command = %options.command, "starting MCP server");
        StdioMcpClient::spawn(options.clone())
    }
}
