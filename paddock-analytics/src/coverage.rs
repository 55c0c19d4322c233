//! Per-session row counts, exposing partial population.

use std::collections::HashMap;

use paddock_core::{Driver, Lap, PaddockResult, Position, Session, SessionKey};
use paddock_storage::{FieldValue, LapField, PositionField, Query, Store};

use crate::views::{DataCoverage, SessionCoverage};
use crate::Analytics;

fn counts_by_session(groups: Vec<(FieldValue, usize)>) -> HashMap<SessionKey, usize> {
    groups
        .into_iter()
        .filter_map(|(value, count)| {
            let key = u32::try_from(value.as_i64()?).ok()?;
            Some((SessionKey(key), count))
        })
        .collect()
}

impl<S: Store> Analytics<S> {
    /// Position and lap counts for every cached session.
    pub async fn data_coverage(&self) -> PaddockResult<DataCoverage> {
        let drivers = self.store.count::<Driver>().await?;
        let sessions = self.store.select(&Query::<Session>::all()).await?;
        let positions = counts_by_session(
            self.store
                .count_by(&Query::<Position>::all(), PositionField::SessionKey)
                .await?,
        );
        let laps = counts_by_session(
            self.store
                .count_by(&Query::<Lap>::all(), LapField::SessionKey)
                .await?,
        );

        let sessions: Vec<SessionCoverage> = sessions
            .iter()
            .map(|session| SessionCoverage {
                session_key: session.session_key,
                race: session.race_name(),
                positions: positions.get(&session.session_key).copied().unwrap_or(0),
                laps: laps.get(&session.session_key).copied().unwrap_or(0),
            })
            .collect();
        let incomplete = sessions
            .iter()
            .filter(|s| !s.is_complete())
            .map(|s| s.session_key)
            .collect();

        Ok(DataCoverage {
            drivers,
            sessions,
            incomplete,
        })
    }
}
