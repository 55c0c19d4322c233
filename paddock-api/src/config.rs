//! API Configuration Module
//!
//! Bind address and CORS settings, loaded from environment variables with
//! defaults suited to local development.

use std::net::SocketAddr;

use crate::error::{ApiError, ApiResult};

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Interface to bind (`PADDOCK_API_BIND`).
    pub bind_host: String,

    /// Port to bind (`PORT`, then `PADDOCK_API_PORT`).
    pub port: String,

    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    /// Example: "https://paddock.run,https://app.paddock.run"
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: "3000".to_string(),
            cors_origins: Vec::new(),
            cors_max_age_secs: 86400,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// - `PADDOCK_API_BIND`: interface (default: 0.0.0.0)
    /// - `PORT` / `PADDOCK_API_PORT`: port (default: 3000)
    /// - `PADDOCK_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `PADDOCK_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cors_origins = lookup("PADDOCK_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            bind_host: lookup("PADDOCK_API_BIND").unwrap_or(defaults.bind_host),
            port: lookup("PORT")
                .or_else(|| lookup("PADDOCK_API_PORT"))
                .unwrap_or(defaults.port),
            cors_origins,
            cors_max_age_secs: lookup("PADDOCK_CORS_MAX_AGE_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cors_max_age_secs),
        }
    }

    /// Resolve the socket address to listen on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let port = self.port.parse::<u16>().map_err(|_| {
            ApiError::invalid_input(format!("Invalid port value: {}", self.port))
        })?;

        let addr = format!("{}:{}", self.bind_host, port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.paddock.run
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern));
                }
            }
            false
        })
    }
}
