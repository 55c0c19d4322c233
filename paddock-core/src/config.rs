//! Configuration types

use crate::{ConfigError, DriverNumber, PaddockResult, Season, SessionKey};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound on concurrent session workers during population.
pub const MAX_FANOUT_CONCURRENCY: usize = 64;

/// Default telemetry provider endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://api.openf1.org/v1";

/// Retry configuration for provider fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per fetch, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for every further retry.
    pub initial_backoff: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// Whole multipliers use integer arithmetic. Overflow saturates at
    /// `Duration::MAX`.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = f64::from(self.backoff_multiplier);

        if multiplier.fract() == 0.0 && (1.0..=f64::from(u32::MAX)).contains(&multiplier) {
            return (multiplier as u32)
                .checked_pow(exponent)
                .and_then(|factor| self.initial_backoff.checked_mul(factor))
                .unwrap_or(Duration::MAX);
        }

        let factor = multiplier.powi(i32::try_from(exponent).unwrap_or(i32::MAX));
        Duration::try_from_secs_f64(self.initial_backoff.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }
}

/// One roster source: the session whose driver list is read, and the car
/// numbers kept from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSource {
    pub session_key: SessionKey,
    pub driver_numbers: Vec<DriverNumber>,
}

/// Which row store engine backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Persistent LMDB environment under `data_dir`.
    Lmdb,
    /// Process memory; repopulated on every start.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lmdb" => Ok(StoreBackend::Lmdb),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::InvalidValue {
                field: "PADDOCK_STORE".to_string(),
                value: other.to_string(),
                reason: "expected 'lmdb' or 'memory'".to_string(),
            }),
        }
    }
}

/// Row store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
    pub lmdb_map_size_mb: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Lmdb,
            data_dir: PathBuf::from("paddock-data"),
            lmdb_map_size_mb: 512,
        }
    }
}

/// Master configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddockConfig {
    // Provider
    pub provider_url: String,
    pub request_timeout: Duration,
    pub retry: RetryConfig,

    // What to cache
    pub season: Season,
    pub session_name: String,
    pub roster: Vec<RosterSource>,

    // Population fan-out
    pub fanout_concurrency: usize,
    pub insert_chunk_size: usize,

    pub store: StoreConfig,
}

impl Default for PaddockConfig {
    fn default() -> Self {
        Self {
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            season: 2024,
            session_name: "Race".to_string(),
            roster: default_roster(),
            fanout_concurrency: 5,
            insert_chunk_size: 1000,
            store: StoreConfig::default(),
        }
    }
}

/// Full-season grid from the opening round plus the mid-season replacements.
pub fn default_roster() -> Vec<RosterSource> {
    let numbers = |ns: &[u32]| ns.iter().copied().map(DriverNumber).collect();
    vec![
        RosterSource {
            session_key: SessionKey(9574),
            driver_numbers: numbers(&[
                1, 2, 3, 4, 10, 11, 14, 16, 18, 20, 22, 23, 24, 27, 31, 44, 55, 63, 77, 81,
            ]),
        },
        RosterSource {
            session_key: SessionKey(9636),
            driver_numbers: numbers(&[30, 50, 43]),
        },
    ]
}

impl PaddockConfig {
    /// Create PaddockConfig from environment variables, falling back to the
    /// defaults for anything unset.
    ///
    /// Environment variables:
    /// - `PADDOCK_PROVIDER_URL`: Provider base URL (default: OpenF1 v1)
    /// - `PADDOCK_SEASON`: Season year (default: 2024)
    /// - `PADDOCK_SESSION_NAME`: Session name to cache (default: "Race")
    /// - `PADDOCK_ROSTER`: `session:n,n,n;session:n,n` roster override
    /// - `PADDOCK_FETCH_ATTEMPTS`: Attempts per fetch (default: 3)
    /// - `PADDOCK_FETCH_BACKOFF_MS`: Initial backoff (default: 1000)
    /// - `PADDOCK_FETCH_TIMEOUT_SECS`: Per-request timeout (default: 30)
    /// - `PADDOCK_FANOUT_CONCURRENCY`: Sessions fetched at once (default: 5)
    /// - `PADDOCK_INSERT_CHUNK`: Rows per insert batch (default: 1000)
    /// - `PADDOCK_STORE`: "lmdb" or "memory" (default: lmdb)
    /// - `PADDOCK_DATA_DIR`: LMDB directory (default: ./paddock-data)
    /// - `PADDOCK_LMDB_MAP_MB`: LMDB map size (default: 512)
    pub fn from_env() -> PaddockResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> PaddockResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let roster = match parse("PADDOCK_ROSTER") {
            Some(raw) => parse_roster(&raw)?,
            None => defaults.roster,
        };

        let config = Self {
            provider_url: parse("PADDOCK_PROVIDER_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.provider_url),
            request_timeout: Duration::from_secs(parse_or(
                parse("PADDOCK_FETCH_TIMEOUT_SECS"),
                "PADDOCK_FETCH_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            retry: RetryConfig {
                max_attempts: parse_or(
                    parse("PADDOCK_FETCH_ATTEMPTS"),
                    "PADDOCK_FETCH_ATTEMPTS",
                    defaults.retry.max_attempts,
                )?,
                initial_backoff: Duration::from_millis(parse_or(
                    parse("PADDOCK_FETCH_BACKOFF_MS"),
                    "PADDOCK_FETCH_BACKOFF_MS",
                    defaults.retry.initial_backoff.as_millis() as u64,
                )?),
                backoff_multiplier: defaults.retry.backoff_multiplier,
            },
            season: parse_or(parse("PADDOCK_SEASON"), "PADDOCK_SEASON", defaults.season)?,
            session_name: parse("PADDOCK_SESSION_NAME").unwrap_or(defaults.session_name),
            roster,
            fanout_concurrency: parse_or(
                parse("PADDOCK_FANOUT_CONCURRENCY"),
                "PADDOCK_FANOUT_CONCURRENCY",
                defaults.fanout_concurrency,
            )?,
            insert_chunk_size: parse_or(
                parse("PADDOCK_INSERT_CHUNK"),
                "PADDOCK_INSERT_CHUNK",
                defaults.insert_chunk_size,
            )?,
            store: StoreConfig {
                backend: match parse("PADDOCK_STORE") {
                    Some(raw) => raw.parse()?,
                    None => defaults.store.backend,
                },
                data_dir: parse("PADDOCK_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.store.data_dir),
                lmdb_map_size_mb: parse_or(
                    parse("PADDOCK_LMDB_MAP_MB"),
                    "PADDOCK_LMDB_MAP_MB",
                    defaults.store.lmdb_map_size_mb,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - provider_url is an http(s) URL
    /// - at least one fetch attempt
    /// - fan-out concurrency is between 1 and [`MAX_FANOUT_CONCURRENCY`]
    /// - insert chunk size is positive
    /// - season is a plausible championship year
    pub fn validate(&self) -> PaddockResult<()> {
        if !(self.provider_url.starts_with("http://") || self.provider_url.starts_with("https://"))
        {
            return Err(invalid("provider_url", &self.provider_url, "must be an http(s) URL"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", 0, "must be at least 1"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(invalid(
                "retry.backoff_multiplier",
                self.retry.backoff_multiplier,
                "must be >= 1.0",
            ));
        }
        if self.fanout_concurrency == 0 {
            return Err(invalid("fanout_concurrency", 0, "must be at least 1"));
        }
        if self.fanout_concurrency > MAX_FANOUT_CONCURRENCY {
            return Err(invalid(
                "fanout_concurrency",
                self.fanout_concurrency,
                "must be at most 64",
            ));
        }
        if self.insert_chunk_size == 0 {
            return Err(invalid("insert_chunk_size", 0, "must be at least 1"));
        }
        if !(1950..=2100).contains(&self.season) {
            return Err(invalid("season", self.season, "must be between 1950 and 2100"));
        }
        if self.session_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "session_name".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> crate::PaddockError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn parse_or<T: FromStr>(raw: Option<String>, field: &str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            reason: "not a valid number".to_string(),
        }),
    }
}

/// Parse `9574:1,2,3;9636:30,50` into roster sources.
pub fn parse_roster(raw: &str) -> Result<Vec<RosterSource>, ConfigError> {
    let bad = |reason: &str| ConfigError::InvalidValue {
        field: "PADDOCK_ROSTER".to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    raw.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (session, numbers) = part
                .split_once(':')
                .ok_or_else(|| bad("expected session:numbers"))?;
            let session_key = session
                .parse::<SessionKey>()
                .map_err(|_| bad("session key is not a number"))?;
            let driver_numbers = numbers
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| n.parse::<DriverNumber>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| bad("driver number is not a number"))?;
            Ok(RosterSource {
                session_key,
                driver_numbers,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PaddockError;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PaddockConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.fanout_concurrency, 5);
        assert_eq!(config.insert_chunk_size, 1000);
        assert_eq!(config.roster.len(), 2);
        assert_eq!(config.roster[0].driver_numbers.len(), 20);
    }

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryConfig {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        };
        assert_eq!(retry.backoff_after(1), Duration::from_millis(100));
        assert_eq!(retry.backoff_after(2), Duration::from_millis(200));
        assert_eq!(retry.backoff_after(3), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let retry = RetryConfig {
            max_attempts: 200,
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        };
        assert_eq!(retry.backoff_after(100), Duration::MAX);

        let fractional = RetryConfig {
            backoff_multiplier: 1.5,
            ..retry
        };
        assert_eq!(fractional.backoff_after(5000), Duration::MAX);
    }

    #[test]
    fn test_backoff_fractional_multiplier() {
        let retry = RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 1.5,
        };
        assert_eq!(retry.backoff_after(1), Duration::from_millis(100));
        let second = retry.backoff_after(2);
        let expected = Duration::from_millis(150);
        let drift = if second > expected { second - expected } else { expected - second };
        assert!(drift < Duration::from_micros(1), "got {:?}", second);
    }

    #[test]
    fn test_fanout_concurrency_upper_bound() {
        let config = PaddockConfig {
            fanout_concurrency: MAX_FANOUT_CONCURRENCY,
            ..PaddockConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = PaddockConfig {
            fanout_concurrency: MAX_FANOUT_CONCURRENCY + 1,
            ..PaddockConfig::default()
        };
        assert!(matches!(config.validate(), Err(PaddockError::Config(_))));
    }

    #[test]
    fn test_from_lookup_overrides() -> PaddockResult<()> {
        let config = PaddockConfig::from_lookup(lookup_from(&[
            ("PADDOCK_PROVIDER_URL", "http://localhost:9000/v1/"),
            ("PADDOCK_SEASON", "2023"),
            ("PADDOCK_FETCH_ATTEMPTS", "5"),
            ("PADDOCK_STORE", "memory"),
            ("PADDOCK_ROSTER", "100:1,44; 200:16"),
        ]))?;
        assert_eq!(config.provider_url, "http://localhost:9000/v1");
        assert_eq!(config.season, 2023);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(
            config.roster,
            vec![
                RosterSource {
                    session_key: SessionKey(100),
                    driver_numbers: vec![DriverNumber(1), DriverNumber(44)],
                },
                RosterSource {
                    session_key: SessionKey(200),
                    driver_numbers: vec![DriverNumber(16)],
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = PaddockConfig::from_lookup(lookup_from(&[("PADDOCK_FANOUT_CONCURRENCY", "many")]));
        assert!(matches!(result, Err(PaddockError::Config(_))));

        let result = PaddockConfig::from_lookup(lookup_from(&[("PADDOCK_FANOUT_CONCURRENCY", "0")]));
        assert!(matches!(result, Err(PaddockError::Config(_))));

        let result = PaddockConfig::from_lookup(lookup_from(&[("PADDOCK_STORE", "redis")]));
        assert!(matches!(result, Err(PaddockError::Config(_))));
    }

    #[test]
    fn test_parse_roster_errors() {
        assert!(parse_roster("9574").is_err());
        assert!(parse_roster("abc:1,2").is_err());
        assert!(parse_roster("9574:1,x").is_err());
        assert_eq!(parse_roster("").map(|r| r.len()), Ok(0));
    }
}
