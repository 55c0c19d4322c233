//! One-shot cache population.
//!
//! Each dataset is populated only while its table is empty. Order is fixed:
//! drivers, sessions, then positions and laps fanned out across sessions.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use paddock_core::{
    Driver, DriverNumber, FetchError, Lap, PaddockConfig, PopulateError, Position, RosterSource,
    Season, Session, SessionKey, Table, MAX_FANOUT_CONCURRENCY,
};
use paddock_storage::{Query, Record, Store};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::observer::{IngestObserver, NoopObserver};
use crate::provider::OpenF1Client;

// ============================================================================
// REPORT
// ============================================================================

/// Outcome of populating one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetReport {
    /// Table already held rows; nothing was fetched.
    pub skipped: bool,
    pub rows_fetched: usize,
    pub rows_inserted: usize,
    /// Row ranges (into the fetched rows) whose insert failed.
    pub failed_chunks: Vec<Range<usize>>,
}

/// Summary of a `populate()` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationReport {
    pub drivers: DatasetReport,
    /// Roster numbers that the provider did not return.
    pub missing_drivers: Vec<DriverNumber>,
    /// Roster sessions whose driver fetch failed.
    pub failed_roster_sessions: Vec<SessionKey>,
    pub sessions: DatasetReport,
    pub positions: DatasetReport,
    pub laps: DatasetReport,
    /// Sessions whose position or lap fetch failed.
    pub failed_sessions: Vec<SessionKey>,
}

impl PopulationReport {
    /// Nothing was fetched for any dataset.
    pub fn all_skipped(&self) -> bool {
        self.drivers.skipped
            && self.sessions.skipped
            && self.positions.skipped
            && self.laps.skipped
    }
}

// ============================================================================
// CONTROLLER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Wanted {
    positions: bool,
    laps: bool,
}

/// Telemetry fetched by one session worker.
#[derive(Debug)]
struct SessionTelemetry {
    session_key: SessionKey,
    positions: Option<Result<Vec<Position>, FetchError>>,
    laps: Option<Result<Vec<Lap>, FetchError>>,
}

/// Populates empty tables from the provider.
pub struct PopulationController<S: Store> {
    store: Arc<S>,
    client: Arc<OpenF1Client>,
    observer: Arc<dyn IngestObserver>,
    roster: Vec<RosterSource>,
    season: Season,
    session_name: String,
    concurrency: usize,
    chunk_size: usize,
}

impl<S: Store> PopulationController<S> {
    pub fn new(store: Arc<S>, client: OpenF1Client, config: &PaddockConfig) -> Self {
        Self {
            store,
            client: Arc::new(client),
            observer: Arc::new(NoopObserver),
            roster: config.roster.clone(),
            season: config.season,
            session_name: config.session_name.clone(),
            concurrency: config.fanout_concurrency.clamp(1, MAX_FANOUT_CONCURRENCY),
            chunk_size: config.insert_chunk_size.max(1),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn IngestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run every population step.
    ///
    /// # Errors
    ///
    /// - `NoSessions` when the sessions table is empty and the provider
    ///   returns no sessions (or fails)
    /// - `Storage` when a table count or the sessions insert fails
    ///
    /// Every other failure is logged and recorded in the report.
    pub async fn populate(&self) -> Result<PopulationReport, PopulateError> {
        let mut report = PopulationReport::default();

        self.populate_drivers(&mut report).await?;
        self.populate_sessions(&mut report).await?;
        self.populate_telemetry(&mut report).await?;

        info!(
            drivers = report.drivers.rows_inserted,
            sessions = report.sessions.rows_inserted,
            positions = report.positions.rows_inserted,
            laps = report.laps.rows_inserted,
            failed_sessions = report.failed_sessions.len(),
            missing_drivers = report.missing_drivers.len(),
            "population finished"
        );
        Ok(report)
    }

    async fn is_populated<R: Record>(&self) -> Result<bool, PopulateError> {
        Ok(self.store.count::<R>().await? > 0)
    }

    /// Drivers from the configured roster, one insert batch.
    pub async fn populate_drivers(&self, report: &mut PopulationReport) -> Result<(), PopulateError> {
        if self.is_populated::<Driver>().await? {
            info!("drivers already cached, skipping");
            report.drivers.skipped = true;
            return Ok(());
        }

        let mut retained: Vec<Driver> = Vec::new();
        let mut seen: HashSet<DriverNumber> = HashSet::new();

        for source in &self.roster {
            let fetched = match self.client.drivers_by_session(source.session_key).await {
                Ok(drivers) => drivers,
                Err(e) => {
                    warn!(session_key = %source.session_key, error = %e, "roster fetch failed, skipping session");
                    report.failed_roster_sessions.push(source.session_key);
                    continue;
                }
            };

            let wanted: HashSet<DriverNumber> = source.driver_numbers.iter().copied().collect();
            let returned: HashSet<DriverNumber> =
                fetched.iter().map(|d| d.driver_number).collect();

            for number in &source.driver_numbers {
                if !returned.contains(number) {
                    warn!(session_key = %source.session_key, driver_number = %number, "roster driver not returned by provider");
                    report.missing_drivers.push(*number);
                }
            }

            for driver in fetched {
                if wanted.contains(&driver.driver_number) && seen.insert(driver.driver_number) {
                    retained.push(driver);
                }
            }
        }

        report.drivers.rows_fetched = retained.len();
        if retained.is_empty() {
            warn!("no roster drivers retained");
            return Ok(());
        }

        let single_batch = retained.len();
        let (inserted, failed) = self.insert_chunked(&retained, single_batch).await;
        report.drivers.rows_inserted = inserted;
        report.drivers.failed_chunks = failed;
        info!(rows = inserted, "drivers cached");
        Ok(())
    }

    /// Sessions of the configured name and season. Empty results abort.
    pub async fn populate_sessions(&self, report: &mut PopulationReport) -> Result<(), PopulateError> {
        if self.is_populated::<Session>().await? {
            info!("sessions already cached, skipping");
            report.sessions.skipped = true;
            return Ok(());
        }

        let no_sessions = |cause| PopulateError::NoSessions {
            season: self.season,
            session_name: self.session_name.clone(),
            cause,
        };

        let sessions = match self
            .client
            .sessions_by_name_and_year(&self.session_name, self.season)
            .await
        {
            Ok(sessions) if !sessions.is_empty() => sessions,
            Ok(_) => {
                error!(season = self.season, "provider returned no sessions");
                return Err(no_sessions(None));
            }
            Err(e) => {
                error!(season = self.season, error = %e, "session fetch failed");
                return Err(no_sessions(Some(e)));
            }
        };

        report.sessions.rows_fetched = sessions.len();
        let inserted = self.store.insert_batch(&sessions).await?;
        self.observer.rows_inserted(Table::Sessions, inserted);
        report.sessions.rows_inserted = inserted;
        info!(rows = inserted, season = self.season, "sessions cached");
        Ok(())
    }

    /// Positions and laps for every cached session.
    pub async fn populate_telemetry(&self, report: &mut PopulationReport) -> Result<(), PopulateError> {
        let wanted = Wanted {
            positions: !self.is_populated::<Position>().await?,
            laps: !self.is_populated::<Lap>().await?,
        };
        report.positions.skipped = !wanted.positions;
        report.laps.skipped = !wanted.laps;

        if !wanted.positions && !wanted.laps {
            info!("positions and laps already cached, skipping");
            return Ok(());
        }

        let sessions = self.store.select(&Query::<Session>::all()).await?;
        info!(
            sessions = sessions.len(),
            concurrency = self.concurrency,
            positions = wanted.positions,
            laps = wanted.laps,
            "fetching session telemetry"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::unbounded_channel::<SessionTelemetry>();
        let mut workers = JoinSet::new();

        for session in &sessions {
            let session_key = session.session_key;
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();

            workers.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        warn!(session_key = %session_key, error = %e, "fan-out semaphore closed");
                        return;
                    }
                };

                let telemetry = fetch_session(&client, session_key, wanted).await;
                // Receiver lives until every sender is gone.
                let _ = tx.send(telemetry);
            });
        }
        drop(tx);

        let mut positions: Vec<Position> = Vec::new();
        let mut laps: Vec<Lap> = Vec::new();
        let mut failed: Vec<SessionKey> = Vec::new();

        while let Some(batch) = rx.recv().await {
            let key = batch.session_key;
            let mut session_failed = false;

            if let Some(result) = batch.positions {
                match result {
                    Ok(rows) => {
                        info!(session_key = %key, rows = rows.len(), "positions fetched");
                        positions.extend(rows);
                    }
                    Err(e) => {
                        warn!(session_key = %key, error = %e, "positions fetch failed, skipping");
                        session_failed = true;
                    }
                }
            }
            if let Some(result) = batch.laps {
                match result {
                    Ok(rows) => {
                        info!(session_key = %key, rows = rows.len(), "laps fetched");
                        laps.extend(rows);
                    }
                    Err(e) => {
                        warn!(session_key = %key, error = %e, "laps fetch failed, skipping");
                        session_failed = true;
                    }
                }
            }
            if session_failed {
                failed.push(key);
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "session worker did not complete");
            }
        }

        failed.sort_unstable();
        report.failed_sessions = failed;

        if wanted.positions {
            report.positions.rows_fetched = positions.len();
            let (inserted, failed_chunks) = self.insert_chunked(&positions, self.chunk_size).await;
            report.positions.rows_inserted = inserted;
            report.positions.failed_chunks = failed_chunks;
        }
        if wanted.laps {
            report.laps.rows_fetched = laps.len();
            let (inserted, failed_chunks) = self.insert_chunked(&laps, self.chunk_size).await;
            report.laps.rows_inserted = inserted;
            report.laps.failed_chunks = failed_chunks;
        }
        Ok(())
    }

    /// Insert rows in chunks. A failed chunk is logged and does not undo
    /// earlier chunks.
    async fn insert_chunked<R: Record>(
        &self,
        rows: &[R],
        chunk_size: usize,
    ) -> (usize, Vec<Range<usize>>) {
        let table = R::table();
        let mut inserted = 0;
        let mut failed = Vec::new();

        for (index, chunk) in rows.chunks(chunk_size.max(1)).enumerate() {
            let start = index * chunk_size.max(1);
            let range = start..start + chunk.len();
            match self.store.insert_batch(chunk).await {
                Ok(written) => {
                    inserted += written;
                    self.observer.rows_inserted(table, written);
                }
                Err(e) => {
                    error!(
                        table = %table,
                        start = range.start,
                        end = range.end,
                        error = %e,
                        "insert chunk failed"
                    );
                    failed.push(range);
                }
            }
        }

        if !rows.is_empty() {
            info!(table = %table, rows = inserted, total = rows.len(), "rows inserted");
        }
        (inserted, failed)
    }
}

async fn fetch_session(client: &OpenF1Client, session_key: SessionKey, wanted: Wanted) -> SessionTelemetry {
    let positions = if wanted.positions {
        Some(client.positions_by_session(session_key).await)
    } else {
        None
    };
    let laps = if wanted.laps {
        Some(client.laps_by_session(session_key).await)
    } else {
        None
    };
    SessionTelemetry {
        session_key,
        positions,
        laps,
    }
}
