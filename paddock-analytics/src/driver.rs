//! Driver career detail and position history.

use std::collections::HashMap;

use paddock_core::{
    Driver, DriverNumber, Lap, PaddockError, PaddockResult, Position, Session, SessionKey, Table,
};
use paddock_storage::{DriverField, PositionField, Query, SessionField, Store};
use tracing::debug;

use crate::standings::{fastest_lap, final_positions, laps_by_session};
use crate::views::{
    DriverDetail, DriverPositionEntry, DriverPositions, DriverSessionResult, PerformanceSummary,
};
use crate::Analytics;

impl<S: Store> Analytics<S> {
    /// Resolve a driver from a path identifier.
    ///
    /// A numeric identifier is tried as a driver number first, then as a
    /// 1-based index into the unordered driver listing. Anything else is
    /// `NotFound`.
    pub async fn resolve_driver(&self, id: &str) -> PaddockResult<Driver> {
        let not_found = || PaddockError::not_found(Table::Drivers, id);
        let number: u32 = id.trim().parse().map_err(|_| not_found())?;

        let by_number = self
            .store
            .first(&Query::<Driver>::all().eq(DriverField::DriverNumber, number))
            .await?;
        if let Some(driver) = by_number {
            return Ok(driver);
        }

        // Index fallback into Store order.
        let index = (number as usize).checked_sub(1).ok_or_else(not_found)?;
        let drivers = self.store.select(&Query::<Driver>::all()).await?;
        drivers.into_iter().nth(index).ok_or_else(not_found)
    }

    /// Career summary and per-session results of one driver.
    pub async fn driver_detail(&self, id: &str) -> PaddockResult<DriverDetail> {
        let driver = self.resolve_driver(id).await?;
        let number = driver.driver_number;

        let sessions = self
            .store
            .select(&Query::<Session>::all().asc(SessionField::DateStart))
            .await?;
        let positions = self
            .store
            .select(&Query::<Position>::all().eq(PositionField::DriverNumber, number))
            .await?;
        // Every lap is needed to find each session's fastest lap owner.
        let laps = self.store.select(&Query::<Lap>::all()).await?;
        let laps = laps_by_session(&laps);

        let mut by_session: HashMap<SessionKey, Vec<&Position>> = HashMap::new();
        for row in &positions {
            by_session.entry(row.session_key).or_default().push(row);
        }

        let mut race_results = Vec::new();
        for session in &sessions {
            let Some(rows) = by_session.get(&session.session_key) else {
                continue;
            };
            let Some(final_row) = final_positions(rows.iter().copied()).into_iter().next() else {
                continue;
            };

            let session_laps = laps.get(&session.session_key).map(Vec::as_slice).unwrap_or(&[]);
            let best = fastest_lap(
                session_laps
                    .iter()
                    .copied()
                    .filter(|lap| lap.driver_number == number),
            );
            let session_fastest = fastest_lap(session_laps.iter().copied());

            let best_lap_duration = best.and_then(Lap::timed_duration).unwrap_or(0.0);
            let max_speed = best.and_then(Lap::measured_speed).unwrap_or(0.0);
            let fastest = best_lap_duration > 0.0
                && session_fastest.map(|l| l.driver_number) == Some(number);

            race_results.push(DriverSessionResult {
                session_key: session.session_key,
                circuit_short_name: session.circuit_short_name.clone(),
                race: session.race_name(),
                date_start: session.date_start,
                position: final_row.position,
                fastest_lap: fastest,
                max_speed,
                best_lap_duration,
            });
        }

        let performance_summary = PerformanceSummary {
            wins: race_results.iter().filter(|r| r.position == 1).count(),
            top_3_finishes: race_results.iter().filter(|r| r.position <= 3).count(),
            classified_sessions: race_results.len(),
            max_speed: race_results
                .iter()
                .map(|r| r.max_speed)
                .fold(0.0, f64::max),
        };

        debug!(
            driver_number = %number,
            sessions = race_results.len(),
            wins = performance_summary.wins,
            "Driver detail computed"
        );

        Ok(DriverDetail {
            full_name: driver.full_name(),
            driver,
            performance_summary,
            race_results,
        })
    }

    /// Position history of a driver across cached sessions, chronological.
    ///
    /// Lookup is by driver number only.
    pub async fn driver_positions(&self, number: DriverNumber) -> PaddockResult<DriverPositions> {
        let exists = self
            .store
            .first(&Query::<Driver>::all().eq(DriverField::DriverNumber, number))
            .await?
            .is_some();
        if !exists {
            return Err(PaddockError::not_found(Table::Drivers, number));
        }

        let sessions = self.store.select(&Query::<Session>::all()).await?;
        let mut session_index: HashMap<SessionKey, &Session> = HashMap::new();
        for session in &sessions {
            session_index.entry(session.session_key).or_insert(session);
        }

        let rows = self
            .store
            .select(
                &Query::<Position>::all()
                    .eq(PositionField::DriverNumber, number)
                    .asc(PositionField::Date),
            )
            .await?;

        let positions: Vec<DriverPositionEntry> = rows
            .iter()
            .filter_map(|row| {
                let session = session_index.get(&row.session_key)?;
                Some(DriverPositionEntry {
                    session_key: row.session_key,
                    circuit_short_name: session.circuit_short_name.clone(),
                    race: session.race_name(),
                    position: row.position,
                    date: row.date,
                })
            })
            .collect();

        Ok(DriverPositions {
            driver_number: number,
            positions,
        })
    }
}
