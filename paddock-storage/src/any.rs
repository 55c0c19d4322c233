//! Runtime-selected store engine.

use async_trait::async_trait;
use paddock_core::{PaddockResult, StoreBackend, StoreConfig};
use tracing::info;

use crate::{FieldValue, LmdbStore, MemoryStore, Query, Record, Store};

/// Either engine, chosen from configuration at startup.
#[derive(Debug)]
pub enum AnyStore {
    Memory(MemoryStore),
    Lmdb(LmdbStore),
}

impl AnyStore {
    /// Open the engine named by `config.backend`.
    pub fn open(config: &StoreConfig) -> PaddockResult<Self> {
        match config.backend {
            StoreBackend::Memory => {
                info!("Using in-memory store");
                Ok(AnyStore::Memory(MemoryStore::new()))
            }
            StoreBackend::Lmdb => {
                let store = LmdbStore::open(&config.data_dir, config.lmdb_map_size_mb)?;
                info!(path = %config.data_dir.display(), "Opened LMDB store");
                Ok(AnyStore::Lmdb(store))
            }
        }
    }
}

impl From<MemoryStore> for AnyStore {
    fn from(store: MemoryStore) -> Self {
        AnyStore::Memory(store)
    }
}

impl From<LmdbStore> for AnyStore {
    fn from(store: LmdbStore) -> Self {
        AnyStore::Lmdb(store)
    }
}

#[async_trait]
impl Store for AnyStore {
    async fn insert_batch<R: Record>(&self, rows: &[R]) -> PaddockResult<usize> {
        match self {
            AnyStore::Memory(s) => s.insert_batch(rows).await,
            AnyStore::Lmdb(s) => s.insert_batch(rows).await,
        }
    }

    async fn count<R: Record>(&self) -> PaddockResult<usize> {
        match self {
            AnyStore::Memory(s) => s.count::<R>().await,
            AnyStore::Lmdb(s) => s.count::<R>().await,
        }
    }

    async fn select<R: Record>(&self, query: &Query<R>) -> PaddockResult<Vec<R>> {
        match self {
            AnyStore::Memory(s) => s.select(query).await,
            AnyStore::Lmdb(s) => s.select(query).await,
        }
    }

    async fn count_by<R: Record>(
        &self,
        query: &Query<R>,
        field: R::Field,
    ) -> PaddockResult<Vec<(FieldValue, usize)>> {
        match self {
            AnyStore::Memory(s) => s.count_by(query, field).await,
            AnyStore::Lmdb(s) => s.count_by(query, field).await,
        }
    }

    fn engine_name(&self) -> &'static str {
        match self {
            AnyStore::Memory(s) => s.engine_name(),
            AnyStore::Lmdb(s) => s.engine_name(),
        }
    }
}
