//! Hooks that let the host process count ingestion events.

use paddock_core::Table;

/// Outcome of one fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptOutcome {
    Success,
    Transport,
    Status,
    Invalid,
}

impl AttemptOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Transport => "transport_error",
            AttemptOutcome::Status => "http_error",
            AttemptOutcome::Invalid => "invalid_payload",
        }
    }
}

/// Receives ingestion events. Both methods default to doing nothing.
pub trait IngestObserver: Send + Sync {
    /// One fetch attempt finished. `endpoint` is the last path segment of the
    /// requested URL (`laps`, `sessions`, ...).
    fn fetch_attempt(&self, _endpoint: &str, _outcome: AttemptOutcome) {}

    /// A batch of rows was committed to the store.
    fn rows_inserted(&self, _table: Table, _rows: usize) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl IngestObserver for NoopObserver {}

/// Metric label for a URL: the last path segment, without the query string.
pub fn endpoint_label(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}
