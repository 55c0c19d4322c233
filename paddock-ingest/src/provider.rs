//! OpenF1 read endpoints.

use std::sync::Arc;

use paddock_core::{
    Driver, FetchError, Lap, PaddockConfig, Position, Season, Session, SessionKey,
};
use reqwest::Url;

use crate::fetch::{Fetcher, HttpTransport, Transport};
use crate::observer::IngestObserver;

/// Typed client over the provider's four read endpoints.
#[derive(Debug, Clone)]
pub struct OpenF1Client {
    fetcher: Fetcher,
    base_url: String,
}

impl OpenF1Client {
    pub fn new(fetcher: Fetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client over an explicit transport, with retry settings from config.
    pub fn with_transport(transport: Arc<dyn Transport>, config: &PaddockConfig) -> Self {
        Self::new(
            Fetcher::new(transport, config.retry.clone()),
            config.provider_url.clone(),
        )
    }

    /// HTTP client built from configuration.
    pub fn from_config(
        config: &PaddockConfig,
        observer: Arc<dyn IngestObserver>,
    ) -> Result<Self, paddock_core::ConfigError> {
        let transport = HttpTransport::new(config.request_timeout)?;
        let fetcher = Fetcher::new(Arc::new(transport), config.retry.clone()).with_observer(observer);
        Ok(Self::new(fetcher, config.provider_url.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String, FetchError> {
        let raw = format!("{}/{}", self.base_url, endpoint);
        Url::parse_with_params(&raw, params)
            .map(String::from)
            .map_err(|e| FetchError::Transport {
                url: raw,
                reason: format!("invalid URL: {}", e),
            })
    }

    pub fn drivers_url(&self, session_key: SessionKey) -> Result<String, FetchError> {
        self.url("drivers", &[("session_key", session_key.to_string())])
    }

    pub fn sessions_url(&self, session_name: &str, year: Season) -> Result<String, FetchError> {
        self.url(
            "sessions",
            &[
                ("session_name", session_name.to_string()),
                ("year", year.to_string()),
            ],
        )
    }

    pub fn positions_url(&self, session_key: SessionKey) -> Result<String, FetchError> {
        self.url("position", &[("session_key", session_key.to_string())])
    }

    pub fn laps_url(&self, session_key: SessionKey) -> Result<String, FetchError> {
        self.url("laps", &[("session_key", session_key.to_string())])
    }

    /// Every driver entered in a session.
    pub async fn drivers_by_session(&self, session_key: SessionKey) -> Result<Vec<Driver>, FetchError> {
        let url = self.drivers_url(session_key)?;
        self.fetcher.fetch_json(&url).await
    }

    /// Sessions with the given name in one season.
    pub async fn sessions_by_name_and_year(
        &self,
        session_name: &str,
        year: Season,
    ) -> Result<Vec<Session>, FetchError> {
        let url = self.sessions_url(session_name, year)?;
        self.fetcher.fetch_json(&url).await
    }

    /// Position snapshots of a session, rekeyed to `session_key`.
    pub async fn positions_by_session(
        &self,
        session_key: SessionKey,
    ) -> Result<Vec<Position>, FetchError> {
        let url = self.positions_url(session_key)?;
        let mut rows: Vec<Position> = self.fetcher.fetch_json(&url).await?;
        for row in &mut rows {
            row.session_key = session_key;
        }
        Ok(rows)
    }

    /// Laps of a session, rekeyed to `session_key`.
    pub async fn laps_by_session(&self, session_key: SessionKey) -> Result<Vec<Lap>, FetchError> {
        let url = self.laps_url(session_key)?;
        let mut rows: Vec<Lap> = self.fetcher.fetch_json(&url).await?;
        for row in &mut rows {
            row.session_key = session_key;
        }
        Ok(rows)
    }
}
