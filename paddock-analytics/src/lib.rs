//! Paddock Analytics - Aggregations over Cached Telemetry
//!
//! The engine only reads the Store. Every view is recomputed on demand from
//! raw rows:
//! - driver career summaries and per-session results
//! - session classification with fastest lap and top speed
//! - season leaderboards
//! - listings and data coverage

pub mod coverage;
pub mod driver;
pub mod season;
pub mod session;
pub mod standings;
pub mod views;

pub use views::*;

use std::sync::Arc;

use paddock_core::{Driver, PaddockResult, Season, Session};
use paddock_storage::{DriverField, Query, Store};

/// Read-only aggregation engine.
pub struct Analytics<S: Store> {
    store: Arc<S>,
    season: Season,
}

// Manual impl: `S` itself need not be Clone.
impl<S: Store> Clone for Analytics<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            season: self.season,
        }
    }
}

impl<S: Store> Analytics<S> {
    /// Create an engine whose season summary covers `season`.
    pub fn new(store: Arc<S>, season: Season) -> Self {
        Self { store, season }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn season(&self) -> Season {
        self.season
    }

    /// All drivers ordered by driver number.
    pub async fn list_drivers(&self) -> PaddockResult<Vec<Driver>> {
        self.store
            .select(&Query::<Driver>::all().asc(DriverField::DriverNumber))
            .await
    }

    /// All sessions in Store order.
    pub async fn list_sessions(&self) -> PaddockResult<Vec<Session>> {
        self.store.select(&Query::<Session>::all()).await
    }
}
