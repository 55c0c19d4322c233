//! In-process row store.

use std::any::Any;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use paddock_core::{PaddockResult, StorageError, Table};

use crate::{Query, Record, Store};

type Row = Box<dyn Any + Send + Sync>;

/// Insertion-ordered in-memory store.
///
/// Rows are kept as their concrete record type, so reads never go through
/// serialization. Used by tests and by `PADDOCK_STORE=memory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every row of every table.
    pub fn clear(&self) -> PaddockResult<()> {
        self.tables
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .clear();
        Ok(())
    }

    fn collect<R: Record>(&self) -> PaddockResult<Vec<R>> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        let Some(rows) = tables.get(&R::table()) else {
            return Ok(Vec::new());
        };
        rows.iter()
            .map(|row| {
                row.downcast_ref::<R>().cloned().ok_or_else(|| {
                    StorageError::Corrupt {
                        table: R::table(),
                        reason: format!("row is not a {}", std::any::type_name::<R>()),
                    }
                    .into()
                })
            })
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_batch<R: Record>(&self, rows: &[R]) -> PaddockResult<usize> {
        let mut tables = self.tables.write().map_err(|_| StorageError::LockPoisoned)?;
        let table = tables.entry(R::table()).or_default();
        table.reserve(rows.len());
        table.extend(rows.iter().map(|row| Box::new(row.clone()) as Row));
        Ok(rows.len())
    }

    async fn count<R: Record>(&self) -> PaddockResult<usize> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(tables.get(&R::table()).map_or(0, Vec::len))
    }

    async fn select<R: Record>(&self, query: &Query<R>) -> PaddockResult<Vec<R>> {
        Ok(query.apply(self.collect::<R>()?))
    }

    fn engine_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DriverField, FieldValue, PositionField};
    use chrono::{TimeZone, Utc};
    use paddock_core::{Driver, DriverNumber, Position, SessionKey};

    fn driver(number: u32, last: &str) -> Driver {
        Driver {
            driver_number: DriverNumber(number),
            first_name: "Test".to_string(),
            last_name: last.to_string(),
            name_acronym: String::new(),
            team_name: "Team".to_string(),
            country_code: String::new(),
        }
    }

    fn position(session: u32, driver: u32, pos: i32, minute: u32) -> Position {
        Position {
            session_key: SessionKey(session),
            driver_number: DriverNumber(driver),
            position: pos,
            date: Utc
                .with_ymd_and_hms(2024, 3, 2, 15, minute, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[tokio::test]
    async fn test_insert_count_and_select_in_insertion_order() {
        let store = MemoryStore::new();
        assert_eq!(store.count::<Driver>().await.expect("count"), 0);

        let written = store
            .insert_batch(&[driver(44, "Hamilton"), driver(1, "Verstappen")])
            .await
            .expect("insert should succeed");
        assert_eq!(written, 2);
        assert_eq!(store.count::<Driver>().await.expect("count"), 2);
        assert_eq!(store.count::<Position>().await.expect("count"), 0);

        let all = store.select(&Query::<Driver>::all()).await.expect("select");
        assert_eq!(all[0].last_name, "Hamilton");
        assert_eq!(all[1].last_name, "Verstappen");
    }

    #[tokio::test]
    async fn test_first_with_ordering() {
        let store = MemoryStore::new();
        store
            .insert_batch(&[
                position(1, 44, 3, 1),
                position(1, 44, 2, 30),
                position(1, 1, 1, 45),
                position(1, 44, 5, 10),
            ])
            .await
            .expect("insert should succeed");

        let latest = store
            .first(
                &Query::<Position>::all()
                    .eq(PositionField::SessionKey, SessionKey(1))
                    .eq(PositionField::DriverNumber, DriverNumber(44))
                    .desc(PositionField::Date),
            )
            .await
            .expect("first should succeed");
        assert_eq!(latest.map(|p| p.position), Some(2));

        let none = store
            .first(&Query::<Driver>::all().eq(DriverField::DriverNumber, 99u32))
            .await
            .expect("first should succeed");
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_count_by_groups() {
        let store = MemoryStore::new();
        store
            .insert_batch(&[
                position(9, 1, 1, 1),
                position(8, 1, 1, 1),
                position(9, 2, 2, 1),
            ])
            .await
            .expect("insert should succeed");
        let groups = store
            .count_by(&Query::<Position>::all(), PositionField::SessionKey)
            .await
            .expect("count_by should succeed");
        assert_eq!(groups, vec![(FieldValue::Int(9), 2), (FieldValue::Int(8), 1)]);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::new();
        store
            .insert_batch(&[driver(4, "Norris")])
            .await
            .expect("insert should succeed");
        store.clear().expect("clear should succeed");
        assert_eq!(store.count::<Driver>().await.expect("count"), 0);
    }
}
