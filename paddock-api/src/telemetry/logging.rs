//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "paddock_api=debug,paddock_ingest=info,tower_http=info,info";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Explicit filter directives; `None` falls back to `RUST_LOG`, then
    /// [`DEFAULT_FILTER`].
    pub filter: Option<String>,
}

impl LogConfig {
    /// `PADDOCK_LOG_FORMAT=json` switches to JSON lines.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = match lookup("PADDOCK_LOG_FORMAT") {
            Some(value) if value.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        Self {
            format,
            filter: lookup("RUST_LOG").filter(|f| !f.trim().is_empty()),
        }
    }
}

/// Install the global tracing subscriber. Call once at startup.
pub fn init_tracing(config: &LogConfig) -> ApiResult<()> {
    let env_filter = match &config.filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| ApiError::invalid_input(format!("Invalid RUST_LOG: {}", e)))?,
        None => EnvFilter::new(DEFAULT_FILTER),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(format = ?config.format, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format_selected() {
        let config = LogConfig::from_lookup(|key| match key {
            "PADDOCK_LOG_FORMAT" => Some("JSON".to_string()),
            _ => None,
        });
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_defaults_to_pretty() {
        let config = LogConfig::from_lookup(|key| match key {
            "RUST_LOG" => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.filter.as_deref(), Some("debug"));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
