//! Session classification with fastest lap and top speed.

use paddock_core::{Driver, Lap, PaddockError, PaddockResult, Position, Session, SessionKey, Table};
use paddock_storage::{LapField, PositionField, Query, SessionField, Store};
use tracing::{debug, warn};

use crate::standings::{classification, driver_index, fastest_lap, top_speed_lap};
use crate::views::{ClassificationEntry, FastestLap, SessionDetail, TopSpeed};
use crate::Analytics;

/// Entries shown before the last-place finisher.
const PODIUM: usize = 3;

impl<S: Store> Analytics<S> {
    /// Final classification, fastest lap and top speed of one session.
    pub async fn session_detail(&self, key: SessionKey) -> PaddockResult<SessionDetail> {
        let session = self
            .store
            .first(&Query::<Session>::all().eq(SessionField::SessionKey, key))
            .await?
            .ok_or_else(|| PaddockError::not_found(Table::Sessions, key))?;

        let positions = self
            .store
            .select(&Query::<Position>::all().eq(PositionField::SessionKey, key))
            .await?;
        let laps = self
            .store
            .select(&Query::<Lap>::all().eq(LapField::SessionKey, key))
            .await?;
        let drivers = self.store.select(&Query::<Driver>::all()).await?;
        let drivers = driver_index(&drivers);

        let classified = classification(&positions);
        let mut results = Vec::new();
        for row in classified.iter().take(PODIUM) {
            match drivers.get(&row.driver_number) {
                Some(driver) => results.push(entry(row, driver, false)),
                None => warn!(
                    session_key = %key,
                    driver_number = %row.driver_number,
                    "Classified driver missing from cache"
                ),
            }
        }

        if let Some(last) = classified.last() {
            let shown = classified
                .iter()
                .take(PODIUM)
                .any(|p| p.driver_number == last.driver_number);
            if !shown {
                match drivers.get(&last.driver_number) {
                    Some(driver) => results.push(entry(last, driver, true)),
                    None => warn!(
                        session_key = %key,
                        driver_number = %last.driver_number,
                        "Last-place driver missing from cache"
                    ),
                }
            }
        }

        let fastest_lap = fastest_lap(&laps).map(|lap| FastestLap {
            driver_number: lap.driver_number,
            driver: drivers.get(&lap.driver_number).map(|d| d.full_name()),
            lap_number: lap.lap_number,
            total_time: lap.lap_duration.unwrap_or_default(),
            sector_1: lap.duration_sector_1,
            sector_2: lap.duration_sector_2,
            sector_3: lap.duration_sector_3,
        });
        let max_speed = top_speed_lap(&laps).map(|lap| TopSpeed {
            driver_number: lap.driver_number,
            driver: drivers.get(&lap.driver_number).map(|d| d.full_name()),
            lap_number: lap.lap_number,
            speed_kmh: lap.st_speed.unwrap_or_default(),
        });

        debug!(
            session_key = %key,
            classified = classified.len(),
            laps = laps.len(),
            "Session detail computed"
        );

        Ok(SessionDetail {
            session_key: session.session_key,
            country_name: session.country_name,
            date_start: session.date_start,
            year: session.year,
            circuit_short_name: session.circuit_short_name,
            results,
            fastest_lap,
            max_speed,
        })
    }
}

fn entry(row: &Position, driver: &Driver, last_place: bool) -> ClassificationEntry {
    ClassificationEntry {
        position: row.position,
        driver_number: row.driver_number,
        driver: driver.full_name(),
        team: driver.team_name.clone(),
        country: driver.country_code.clone(),
        last_place,
    }
}
