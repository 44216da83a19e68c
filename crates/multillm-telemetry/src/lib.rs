//! Logging setup for multillm binaries
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and a `fmt`
//! layer writing either human-readable text or JSON lines to stderr.

#![allow(clippy::must_use_candidate)]

use multillm_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::EnvFilter;

/// Pick the active filter directives
///
/// `RUST_LOG` wins over the configured `log_filter`, which wins over
/// `default_filter`. Unparsable directives fall back to `info`.
pub fn build_filter(config: Option<&TelemetryConfig>, default_filter: &str) -> EnvFilter {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| config.and_then(|c| c.log_filter.clone()))
        .unwrap_or_else(|| default_filter.to_owned());

    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging from configuration
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: Option<&TelemetryConfig>, default_filter: &str) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = build_filter(config, default_filter);
    let format = config.map(|c| c.format).unwrap_or_default();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Text => registry.with(fmt_layer).try_init(),
        LogFormat::Json => registry.with(fmt_layer.json()).try_init(),
    };

    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(filter: Option<&str>) -> TelemetryConfig {
        TelemetryConfig {
            log_filter: filter.map(str::to_owned),
            format: LogFormat::Text,
        }
    }

    #[test]
    fn rust_log_overrides_configuration() {
        temp_env::with_var("RUST_LOG", Some("multillm_mcp=trace"), || {
            let filter = build_filter(Some(&config(Some("warn"))), "info");
            assert_eq!(filter.to_string(), "multillm_mcp=trace");
        });
    }

    #[test]
    fn configured_filter_beats_default() {
        temp_env::with_var_unset("RUST_LOG", || {
            assert_eq!(build_filter(Some(&config(Some("warn"))), "info").to_string(), "warn");
            assert_eq!(build_filter(Some(&config(None)), "debug").to_string(), "debug");
            assert_eq!(build_filter(None, "error").to_string(), "error");
        });
    }

    #[test]
    fn invalid_directives_fall_back_to_info() {
        temp_env::with_var_unset("RUST_LOG", || {
            assert_eq!(build_filter(Some(&config(Some("multillm=loud"))), "warn").to_string(), "info");
        });
    }
}
