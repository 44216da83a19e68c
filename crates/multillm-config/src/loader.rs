use std::path::Path;

use multillm_core::ResilienceOptions;
use multillm_mcp::McpClientOptions;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// resolved, the TOML is invalid, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let config = Self::parse(&raw)?;
        tracing::debug!(path = %path.display(), mcp_servers = config.mcp.servers.len(), "configuration loaded");

        Ok(config)
    }

    /// Parse and validate configuration text
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`], minus file access
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if a duration does not parse, the backoff bounds are
    /// inverted, the concurrency limit is zero, or an MCP command is empty
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_llm_config()?;
        self.validate_mcp_config()?;
        Ok(())
    }

    fn validate_llm_config(&self) -> anyhow::Result<()> {
        ResilienceOptions::try_from(&self.llm.resilience)?;
        Ok(())
    }

    fn validate_mcp_config(&self) -> anyhow::Result<()> {
        for (name, server) in &self.mcp.servers {
            McpClientOptions::try_from(server).map_err(|e| anyhow::anyhow!("MCP server '{name}': {e}"))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::LogFormat;

    const SAMPLE: &str = r#"
[llm.resilience]
max_retries = 3
request_timeout = "{{ env.MULTILLM_TEST_TIMEOUT | default("20s") }}"

[mcp.servers.demo]
command = "{{ env.MULTILLM_TEST_SERVER }}"
args = ["--stdio"]

[telemetry]
log_filter = "multillm=debug"
format = "json"
"#;

    #[test]
    fn loads_file_with_env_expansion() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        temp_env::with_vars(
            [
                ("MULTILLM_TEST_SERVER", Some("mcp-demo")),
                ("MULTILLM_TEST_TIMEOUT", None),
            ],
            || {
                let config = Config::load(file.path()).unwrap();

                let options = ResilienceOptions::try_from(&config.llm.resilience).unwrap();
                assert_eq!(options.max_retries, 3);
                assert_eq!(options.request_timeout, Some(Duration::from_secs(20)));

                assert_eq!(config.mcp.servers["demo"].command, "mcp-demo");
                assert_eq!(config.telemetry.format, LogFormat::Json);
                assert_eq!(config.telemetry.log_filter.as_deref(), Some("multillm=debug"));
            },
        );
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.mcp.servers.is_empty());
        assert_eq!(config.telemetry.format, LogFormat::Text);
        assert_eq!(config.llm.resilience.max_retries, 2);
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn validation_errors_surface_from_parse() {
        let err = Config::parse("[llm.resilience]\nmax_concurrent_requests = 0").unwrap_err();
        assert!(err.to_string().contains("max_concurrent_requests"));

        let err = Config::parse("[mcp.servers.empty]\ncommand = \"\"").unwrap_err();
        assert!(err.to_string().contains("'empty'"));

        let err = Config::parse("[llm.resilience]\ninitial_backoff = \"later\"").unwrap_err();
        assert!(err.to_string().contains("initial_backoff"));
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let err = Config::parse("[server]\nport = 1").unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }
}
