//! Season leaderboards.

use std::collections::HashMap;

use paddock_core::{Driver, DriverNumber, Lap, PaddockResult, Position, Session, SessionKey};
use paddock_storage::{Query, SessionField, Store};
use tracing::debug;

use crate::standings::{
    driver_index, fastest_lap, final_positions, laps_by_session, tally, top_counts,
};
use crate::views::{LeaderboardEntry, SeasonSummary};
use crate::Analytics;

const LEADERBOARD_SIZE: usize = 3;

impl<S: Store> Analytics<S> {
    /// Top-3 leaderboards of the configured season.
    pub async fn season_summary(&self) -> PaddockResult<SeasonSummary> {
        let sessions = self
            .store
            .select(&Query::<Session>::all().eq(SessionField::Year, self.season))
            .await?;
        let positions = self.store.select(&Query::<Position>::all()).await?;
        let laps = self.store.select(&Query::<Lap>::all()).await?;
        let drivers = self.store.select(&Query::<Driver>::all()).await?;
        let drivers = driver_index(&drivers);

        let mut by_session: HashMap<SessionKey, Vec<&Position>> = HashMap::new();
        for row in &positions {
            by_session.entry(row.session_key).or_default().push(row);
        }
        let laps = laps_by_session(&laps);

        let mut winners: Vec<DriverNumber> = Vec::new();
        let mut fastest: Vec<DriverNumber> = Vec::new();
        for session in &sessions {
            if let Some(rows) = by_session.get(&session.session_key) {
                winners.extend(
                    final_positions(rows.iter().copied())
                        .into_iter()
                        .filter(|p| p.position == 1)
                        .map(|p| p.driver_number),
                );
            }
            if let Some(session_laps) = laps.get(&session.session_key) {
                if let Some(lap) = fastest_lap(session_laps.iter().copied()) {
                    fastest.push(lap.driver_number);
                }
            }
        }

        let board = |numbers: &[DriverNumber]| -> Vec<LeaderboardEntry> {
            top_counts(tally(numbers.iter().copied()), LEADERBOARD_SIZE)
                .into_iter()
                .enumerate()
                .map(|(i, (number, count))| {
                    LeaderboardEntry::new(i + 1, number, drivers.get(&number).copied(), count)
                })
                .collect()
        };

        debug!(
            season = self.season,
            sessions = sessions.len(),
            "Season summary computed"
        );

        Ok(SeasonSummary {
            season: self.season,
            sessions: sessions.len(),
            top_3_winners: board(&winners),
            top_3_fastest_laps: board(&fastest),
            // No qualifying data is cached; poles mirror wins.
            top_3_pole_positions: board(&winners),
        })
    }
}
