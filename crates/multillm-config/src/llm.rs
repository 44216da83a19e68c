use std::time::Duration;

use multillm_core::ResilienceOptions;
use serde::Deserialize;

/// LLM client configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Retry, admission and pacing policy shared by all providers
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

/// Resilience policy; durations are strings such as `"200ms"` or `"15s"`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResilienceConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff: String,
    #[serde(default = "default_max_backoff")]
    pub max_backoff: String,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
    /// Deadline for each attempt; unbounded when absent
    #[serde(default)]
    pub request_timeout: Option<String>,
    /// Unbounded when absent
    #[serde(default)]
    pub max_concurrent_requests: Option<usize>,
    #[serde(default)]
    pub min_delay_between_requests: Option<String>,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            jitter: default_jitter(),
            request_timeout: None,
            max_concurrent_requests: None,
            min_delay_between_requests: None,
        }
    }
}

const fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff() -> String {
    "200ms".to_owned()
}

fn default_max_backoff() -> String {
    "2s".to_owned()
}

const fn default_jitter() -> bool {
    true
}

impl TryFrom<&ResilienceConfig> for ResilienceOptions {
    type Error = anyhow::Error;

    fn try_from(config: &ResilienceConfig) -> anyhow::Result<Self> {
        let initial_backoff = parse_duration("initial_backoff", &config.initial_backoff)?;
        let max_backoff = parse_duration("max_backoff", &config.max_backoff)?;
        if max_backoff < initial_backoff {
            anyhow::bail!("llm.resilience.max_backoff must not be shorter than initial_backoff");
        }

        let max_concurrent_requests = match config.max_concurrent_requests {
            Some(0) => anyhow::bail!("llm.resilience.max_concurrent_requests must be greater than 0"),
            Some(limit) => limit,
            None => usize::MAX,
        };

        Ok(Self {
            max_retries: config.max_retries,
            initial_backoff,
            max_backoff,
            jitter: config.jitter,
            request_timeout: config
                .request_timeout
                .as_deref()
                .map(|s| parse_duration("request_timeout", s))
                .transpose()?,
            max_concurrent_requests,
            min_delay_between_requests: config
                .min_delay_between_requests
                .as_deref()
                .map(|s| parse_duration("min_delay_between_requests", s))
                .transpose()?,
            ..Self::default()
        })
    }
}

pub(crate) fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} '{value}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let options = ResilienceOptions::try_from(&ResilienceConfig::default()).unwrap();
        let library = ResilienceOptions::default();

        assert_eq!(options.max_retries, library.max_retries);
        assert_eq!(options.initial_backoff, library.initial_backoff);
        assert_eq!(options.max_backoff, library.max_backoff);
        assert_eq!(options.max_concurrent_requests, usize::MAX);
        assert!(options.request_timeout.is_none());
    }

    #[test]
    fn converts_duration_strings() {
        let config: ResilienceConfig = toml::from_str(
            r#"
            max_retries = 4
            initial_backoff = "50ms"
            max_backoff = "1s"
            jitter = false
            request_timeout = "30s"
            max_concurrent_requests = 8
            min_delay_between_requests = "250ms"
            "#,
        )
        .unwrap();

        let options = ResilienceOptions::try_from(&config).unwrap();
        assert_eq!(options.max_retries, 4);
        assert_eq!(options.initial_backoff, Duration::from_millis(50));
        assert_eq!(options.max_backoff, Duration::from_secs(1));
        assert!(!options.jitter);
        assert_eq!(options.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.max_concurrent_requests, 8);
        assert_eq!(options.min_delay_between_requests, Some(Duration::from_millis(250)));
    }

    #[test]
    fn rejects_inconsistent_values() {
        let inverted = ResilienceConfig {
            initial_backoff: "5s".into(),
            max_backoff: "1s".into(),
            ..ResilienceConfig::default()
        };
        let err = ResilienceOptions::try_from(&inverted).unwrap_err();
        assert!(err.to_string().contains("max_backoff"));

        let closed_gate = ResilienceConfig {
            max_concurrent_requests: Some(0),
            ..ResilienceConfig::default()
        };
        assert!(ResilienceOptions::try_from(&closed_gate).is_err());

        let garbage = ResilienceConfig {
            request_timeout: Some("soon".into()),
            ..ResilienceConfig::default()
        };
        let err = ResilienceOptions::try_from(&garbage).unwrap_err();
        assert!(err.to_string().contains("request_timeout"));
    }
}
