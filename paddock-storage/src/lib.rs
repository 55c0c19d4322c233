//! Paddock Storage - Row Store Trait and Engines
//!
//! Defines the [`Store`] abstraction the ingestion and aggregation layers
//! talk to, plus two engines:
//! - [`MemoryStore`]: process-local, insertion ordered
//! - [`LmdbStore`]: persistent, one LMDB database per table
//!
//! [`AnyStore`] picks one of them from configuration at startup.

pub mod any;
pub mod lmdb;
pub mod memory;
pub mod query;
pub mod records;

pub use any::AnyStore;
pub use lmdb::{LmdbStore, LmdbStoreError};
pub use memory::MemoryStore;
pub use query::{group_count, Direction, FieldValue, Predicate, Query};
pub use records::{DriverField, LapField, PositionField, SessionField};

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use paddock_core::{PaddockResult, Table};
use serde::{de::DeserializeOwned, Serialize};

// ============================================================================
// RECORD TRAIT
// ============================================================================

/// A row type that can be stored and queried.
///
/// - `table()` must return the same table for every instance
/// - `field()` must be a pure projection of the row
pub trait Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Typed column selector.
    type Field: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Table the row lives in.
    fn table() -> Table;

    /// Project one column.
    fn field(&self, field: Self::Field) -> FieldValue;
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Row store used by population and aggregation.
///
/// Rows are returned in insertion order unless the query orders them;
/// ordering is stable, so ties keep insertion order.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Append rows to their table. Returns the number of rows written.
    /// A batch is atomic: on error none of its rows are visible.
    async fn insert_batch<R: Record>(&self, rows: &[R]) -> PaddockResult<usize>;

    /// Number of rows in the record's table.
    async fn count<R: Record>(&self) -> PaddockResult<usize>;

    /// Rows matching the query.
    async fn select<R: Record>(&self, query: &Query<R>) -> PaddockResult<Vec<R>>;

    /// First row matching the query, after ordering.
    async fn first<R: Record>(&self, query: &Query<R>) -> PaddockResult<Option<R>> {
        let limited = query.clone().limit(1);
        Ok(self.select(&limited).await?.into_iter().next())
    }

    /// Count matching rows grouped by one field, in order of first appearance.
    async fn count_by<R: Record>(
        &self,
        query: &Query<R>,
        field: R::Field,
    ) -> PaddockResult<Vec<(FieldValue, usize)>> {
        let rows = self.select(query).await?;
        Ok(group_count(&rows, field))
    }

    /// Short engine name for logs and health output.
    fn engine_name(&self) -> &'static str;
}

#[async_trait]
impl<S: Store> Store for Arc<S> {
    async fn insert_batch<R: Record>(&self, rows: &[R]) -> PaddockResult<usize> {
        (**self).insert_batch(rows).await
    }

    async fn count<R: Record>(&self) -> PaddockResult<usize> {
        (**self).count::<R>().await
    }

    async fn select<R: Record>(&self, query: &Query<R>) -> PaddockResult<Vec<R>> {
        (**self).select(query).await
    }

    async fn first<R: Record>(&self, query: &Query<R>) -> PaddockResult<Option<R>> {
        (**self).first(query).await
    }

    async fn count_by<R: Record>(
        &self,
        query: &Query<R>,
        field: R::Field,
    ) -> PaddockResult<Vec<(FieldValue, usize)>> {
        (**self).count_by(query, field).await
    }

    fn engine_name(&self) -> &'static str {
        (**self).engine_name()
    }
}
