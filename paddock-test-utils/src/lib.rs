//! Paddock Test Utilities
//!
//! Centralized test infrastructure for the Paddock workspace:
//! - Scripted transport standing in for the telemetry provider
//! - Transport wrapper that measures request concurrency
//! - Store wrapper that counts and fails insert batches
//! - Proptest generators for row types
//! - A small reference grid of drivers, sessions, positions and laps
//! - Custom assertions

// Re-export store engines from their source crate
pub use paddock_storage::{LmdbStore, MemoryStore};

// Re-export core types for convenience
pub use paddock_core::{
    ConfigError, Driver, DriverNumber, FetchError, Lap, PaddockConfig, PaddockError,
    PaddockResult, Position, RetryConfig, RosterSource, Session, SessionKey, StorageError,
    StoreBackend, Table, Timestamp,
};

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use paddock_ingest::{Transport, TransportResponse};
use paddock_storage::{FieldValue, Query, Record, Store};
use serde::Serialize;

// ============================================================================
// SCRIPTED TRANSPORT
// ============================================================================

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Scripted {
    Response(TransportResponse),
    /// Connection-level failure.
    Fail(String),
}

impl Scripted {
    pub fn json<T: Serialize + ?Sized>(rows: &T) -> Self {
        Scripted::Response(TransportResponse::ok(json_bytes(rows)))
    }

    pub fn status(status: u16) -> Self {
        Scripted::Response(TransportResponse {
            status,
            body: Vec::new(),
        })
    }

    pub fn body(body: &str) -> Self {
        Scripted::Response(TransportResponse::ok(body.as_bytes().to_vec()))
    }

    pub fn fail(reason: &str) -> Self {
        Scripted::Fail(reason.to_string())
    }
}

#[derive(Debug)]
struct Route {
    pattern: String,
    replies: VecDeque<Scripted>,
}

/// Transport that replays scripted replies and records every requested URL.
///
/// Routes match when their pattern is a substring of the URL; the first
/// matching route wins. A route replays its replies in order and repeats the
/// last one forever. Unrouted URLs get HTTP 404.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `pattern` to a sequence of replies.
    pub fn script(self, pattern: &str, replies: Vec<Scripted>) -> Self {
        self.routes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Route {
                pattern: pattern.to_string(),
                replies: replies.into(),
            });
        self
    }

    /// Route `pattern` to a JSON body, every time.
    pub fn respond_json<T: Serialize + ?Sized>(self, pattern: &str, rows: &T) -> Self {
        self.script(pattern, vec![Scripted::json(rows)])
    }

    /// Every URL requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Number of requests whose URL contains `pattern`.
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|url| url.contains(pattern))
            .count()
    }

    fn next_reply(&self, url: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock().unwrap_or_else(|p| p.into_inner());
        let route = routes.iter_mut().find(|r| url.contains(&r.pattern))?;
        if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, FetchError> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(url.to_string());

        match self.next_reply(url) {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Fail(reason)) => Err(FetchError::Transport {
                url: url.to_string(),
                reason,
            }),
            None => Ok(TransportResponse {
                status: 404,
                body: Vec::new(),
            }),
        }
    }
}

/// Transport wrapper that holds every request open for a fixed delay and
/// records the highest number of requests in flight at once.
#[derive(Debug)]
pub struct TrackingTransport<T: Transport> {
    inner: T,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl<T: Transport> TrackingTransport<T> {
    pub fn new(inner: T, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Most requests observed in flight simultaneously.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for TrackingTransport<T> {
    async fn get(&self, url: &str) -> Result<TransportResponse, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        let result = self.inner.get(url).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Serialize rows the way the provider sends them.
pub fn json_bytes<T: Serialize + ?Sized>(rows: &T) -> Vec<u8> {
    serde_json::to_vec(rows).unwrap_or_default()
}

// ============================================================================
// INSTRUMENTED STORE
// ============================================================================

/// Store wrapper that counts insert batches and fails chosen ones.
///
/// Batch indices are zero-based and count every `insert_batch` call across
/// all tables.
#[derive(Debug)]
pub struct InstrumentedStore<S: Store> {
    inner: S,
    batches: AtomicUsize,
    failing: HashSet<usize>,
}

impl<S: Store> InstrumentedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            batches: AtomicUsize::new(0),
            failing: HashSet::new(),
        }
    }

    /// Fail the insert batch with this index.
    pub fn fail_batch(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for InstrumentedStore<S> {
    async fn insert_batch<R: Record>(&self, rows: &[R]) -> PaddockResult<usize> {
        let index = self.batches.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&index) {
            return Err(StorageError::InsertFailed {
                table: R::table(),
                reason: format!("injected failure on batch {}", index),
            }
            .into());
        }
        self.inner.insert_batch(rows).await
    }

    async fn count<R: Record>(&self) -> PaddockResult<usize> {
        self.inner.count::<R>().await
    }

    async fn select<R: Record>(&self, query: &Query<R>) -> PaddockResult<Vec<R>> {
        self.inner.select(query).await
    }

    async fn count_by<R: Record>(
        &self,
        query: &Query<R>,
        field: R::Field,
    ) -> PaddockResult<Vec<(FieldValue, usize)>> {
        self.inner.count_by(query, field).await
    }

    fn engine_name(&self) -> &'static str {
        self.inner.engine_name()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Paddock row types.

    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    /// Generate a timestamp within the 2024 season.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (0i64..(300 * 24 * 3600)).prop_map(|offset| {
            let base = Utc
                .with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
                .single()
                .unwrap_or_default();
            base + chrono::Duration::seconds(offset)
        })
    }

    /// Generate a lap duration, including the zero and missing sentinels.
    pub fn arb_lap_duration() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![
            1 => Just(None),
            1 => Just(Some(0.0)),
            6 => (60.0f64..130.0).prop_map(Some),
        ]
    }

    /// Generate a speed trap reading, including sentinels.
    pub fn arb_speed() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![
            1 => Just(None),
            1 => Just(Some(0.0)),
            6 => (200.0f64..350.0).prop_map(Some),
        ]
    }

    /// Generate a lap in the given session by one of `drivers`.
    pub fn arb_lap(session_key: SessionKey, drivers: Vec<DriverNumber>) -> impl Strategy<Value = Lap> {
        (
            proptest::sample::select(drivers),
            1i32..70,
            arb_lap_duration(),
            arb_speed(),
        )
            .prop_map(move |(driver, lap_number, duration, speed)| {
                fixtures::lap(session_key.get(), driver.get(), lap_number, duration, speed)
            })
    }

    /// Generate a position snapshot in the given session by one of `drivers`.
    pub fn arb_position(
        session_key: SessionKey,
        drivers: Vec<DriverNumber>,
    ) -> impl Strategy<Value = Position> {
        (proptest::sample::select(drivers), 1i32..21, arb_timestamp()).prop_map(
            move |(driver, position, date)| Position {
                session_key,
                driver_number: driver,
                position,
                date,
            },
        )
    }

}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built rows and a reference grid.
    //!
    //! The grid has four drivers (1, 4, 16, 44) and three 2024 races:
    //!
    //! | session | final order      | fastest lap   |
    //! |---------|------------------|---------------|
    //! | 100     | 1, 16, 4, 44     | 1 (92.5 s)    |
    //! | 200     | 1, 4, 44, 16     | 4 (89.9 s)    |
    //! | 300     | 16, 4, 1         | 1 (80.1 s)    |
    //!
    //! Driver 44 has no laps at all and no position in session 300.

    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn season_start() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 2, 15, 0, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn driver(number: u32, first: &str, last: &str, team: &str, country: &str) -> Driver {
        Driver {
            driver_number: DriverNumber(number),
            first_name: first.to_string(),
            last_name: last.to_string(),
            name_acronym: last.chars().take(3).collect::<String>().to_uppercase(),
            team_name: team.to_string(),
            country_code: country.to_string(),
        }
    }

    /// A 2024 race `round` weeks after the season opener.
    pub fn session(key: u32, country: &str, circuit: &str, round: i64) -> Session {
        Session {
            session_key: SessionKey(key),
            session_name: "Race".to_string(),
            session_type: "Race".to_string(),
            location: circuit.to_string(),
            country_name: country.to_string(),
            year: 2024,
            circuit_short_name: circuit.to_string(),
            date_start: season_start() + Duration::weeks(round),
        }
    }

    /// A position snapshot `minute` minutes into the session.
    pub fn position(session: u32, driver: u32, position: i32, minute: i64) -> Position {
        Position {
            session_key: SessionKey(session),
            driver_number: DriverNumber(driver),
            position,
            date: season_start() + Duration::minutes(minute),
        }
    }

    pub fn lap(
        session: u32,
        driver: u32,
        lap_number: i32,
        duration: Option<f64>,
        speed: Option<f64>,
    ) -> Lap {
        let sector = duration.map(|d| (d / 3.0 * 1000.0).round() / 1000.0);
        Lap {
            session_key: SessionKey(session),
            driver_number: DriverNumber(driver),
            lap_number,
            lap_duration: duration,
            duration_sector_1: sector,
            duration_sector_2: sector,
            duration_sector_3: sector,
            st_speed: speed,
            date_start: None,
        }
    }

    /// Rows of the reference grid.
    #[derive(Debug, Clone)]
    pub struct Grid {
        pub drivers: Vec<Driver>,
        pub sessions: Vec<Session>,
        pub positions: Vec<Position>,
        pub laps: Vec<Lap>,
    }

    pub fn grid() -> Grid {
        Grid {
            drivers: vec![
                driver(44, "Lewis", "Hamilton", "Mercedes", "GBR"),
                driver(1, "Max", "Verstappen", "Red Bull Racing", "NED"),
                driver(16, "Charles", "Leclerc", "Ferrari", "MON"),
                driver(4, "Lando", "Norris", "McLaren", "GBR"),
            ],
            sessions: vec![
                session(100, "Bahrain", "Sakhir", 0),
                session(200, "Saudi Arabia", "Jeddah", 1),
                session(300, "Australia", "Melbourne", 3),
            ],
            positions: vec![
                // 100: early snapshot, then the final order
                position(100, 44, 1, 1),
                position(100, 1, 2, 1),
                position(100, 16, 3, 1),
                position(100, 4, 4, 1),
                position(100, 1, 1, 50),
                position(100, 16, 2, 50),
                position(100, 4, 3, 50),
                position(100, 44, 4, 50),
                // 200
                position(200, 1, 1, 10),
                position(200, 4, 2, 10),
                position(200, 44, 3, 10),
                position(200, 16, 4, 10),
                // 300
                position(300, 16, 1, 5),
                position(300, 4, 2, 5),
                position(300, 1, 3, 5),
            ],
            laps: vec![
                lap(100, 1, 1, Some(95.0), Some(318.0)),
                lap(100, 1, 2, Some(92.5), Some(320.0)),
                lap(100, 16, 2, Some(93.1), Some(315.0)),
                lap(100, 4, 1, Some(0.0), Some(0.0)),
                lap(100, 4, 2, Some(94.0), Some(312.0)),
                lap(200, 1, 1, Some(90.2), Some(330.0)),
                lap(200, 4, 1, Some(89.9), Some(325.0)),
                lap(200, 16, 1, Some(91.0), None),
                lap(300, 16, 1, Some(80.5), Some(305.0)),
                lap(300, 1, 1, Some(80.1), Some(310.0)),
                lap(300, 4, 1, None, Some(299.0)),
            ],
        }
    }

    /// Insert every row of `grid` into `store`.
    pub async fn seed<S: Store>(store: &S, grid: &Grid) -> PaddockResult<()> {
        store.insert_batch(&grid.drivers).await?;
        store.insert_batch(&grid.sessions).await?;
        store.insert_batch(&grid.positions).await?;
        store.insert_batch(&grid.laps).await?;
        Ok(())
    }

    /// Memory store holding the reference grid.
    pub async fn grid_store() -> PaddockResult<Arc<MemoryStore>> {
        let store = Arc::new(MemoryStore::new());
        seed(&*store, &grid()).await?;
        Ok(store)
    }

    /// Configuration for tests: memory store, no backoff, tiny roster.
    pub fn test_config() -> PaddockConfig {
        PaddockConfig {
            provider_url: "http://provider.test/v1".to_string(),
            retry: RetryConfig {
                max_attempts: 3,
                initial_backoff: std::time::Duration::ZERO,
                backoff_multiplier: 2.0,
            },
            roster: vec![
                RosterSource {
                    session_key: SessionKey(9574),
                    driver_numbers: vec![DriverNumber(1), DriverNumber(16), DriverNumber(44)],
                },
                RosterSource {
                    session_key: SessionKey(9636),
                    driver_numbers: vec![DriverNumber(4), DriverNumber(1)],
                },
            ],
            store: paddock_core::StoreConfig {
                backend: StoreBackend::Memory,
                ..Default::default()
            },
            ..PaddockConfig::default()
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for Paddock results.

    use super::*;

    /// Assert that a PaddockResult is a NotFound error for `table`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &PaddockResult<T>, table: Table) {
        match result {
            Err(PaddockError::NotFound { table: t, .. }) => {
                assert_eq!(*t, table, "Wrong table in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", table, other),
        }
    }

    /// Assert that a PaddockResult is a Storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &PaddockResult<T>) {
        match result {
            Err(PaddockError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that counts never increase along a leaderboard.
    #[track_caller]
    pub fn assert_sorted_desc(counts: &[usize]) {
        for pair in counts.windows(2) {
            assert!(
                pair[0] >= pair[1],
                "Leaderboard not sorted descending: {:?}",
                counts
            );
        }
    }

    /// Assert that every row carries the given session key.
    #[track_caller]
    pub fn assert_session_keys<R, F>(rows: &[R], key: SessionKey, session_of: F)
    where
        F: Fn(&R) -> SessionKey,
    {
        for (index, row) in rows.iter().enumerate() {
            assert_eq!(session_of(row), key, "row {} has wrong session key", index);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
