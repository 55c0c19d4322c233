//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use paddock_analytics::Analytics;
use paddock_core::Season;
use paddock_storage::AnyStore;

/// State handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub analytics: Analytics<AnyStore>,
    pub start_time: Instant,
}

impl AppState {
    /// State over `store`, summarizing `season`.
    pub fn new(store: Arc<AnyStore>, season: Season) -> Self {
        Self {
            analytics: Analytics::new(store, season),
            start_time: Instant::now(),
        }
    }

    pub fn store(&self) -> &Arc<AnyStore> {
        self.analytics.store()
    }
}
