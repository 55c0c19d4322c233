//! LMDB-backed row store.
//!
//! Uses the heed crate (Rust bindings for LMDB). Each [`Table`] gets its own
//! named database inside one environment.
//!
//! # Layout
//!
//! - Key: 8-byte big-endian append sequence, so cursor order is insertion order
//! - Value: the row as JSON
//!
//! One `insert_batch` call is one write transaction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn};
use paddock_core::{PaddockError, PaddockResult, StorageError, Table};
use tracing::debug;

use crate::{Query, Record, Store};

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment at {path}: {reason}")]
    EnvOpen { path: PathBuf, reason: String },

    /// Failed to open a table database within the environment.
    #[error("Failed to open database {table}: {reason}")]
    DbOpen { table: Table, reason: String },

    /// Transaction error.
    #[error("Transaction error on {table}: {reason}")]
    Transaction { table: Table, reason: String },

    /// Serialization error.
    #[error("Serialization error on {table}: {reason}")]
    Serialization { table: Table, reason: String },

    /// Deserialization error.
    #[error("Deserialization error on {table}: {reason}")]
    Deserialization { table: Table, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for PaddockError {
    fn from(e: LmdbStoreError) -> Self {
        let storage = match e {
            LmdbStoreError::Serialization { table, reason } => {
                StorageError::InsertFailed { table, reason }
            }
            LmdbStoreError::Transaction { table, reason } => StorageError::Engine {
                reason: format!("{} transaction: {}", table, reason),
            },
            LmdbStoreError::Deserialization { table, reason } => {
                StorageError::Corrupt { table, reason }
            }
            other => StorageError::Engine {
                reason: other.to_string(),
            },
        };
        PaddockError::Storage(storage)
    }
}

/// Persistent row store on LMDB.
///
/// # Example
///
/// ```ignore
/// use paddock_storage::{LmdbStore, Query, Store};
/// use paddock_core::Driver;
///
/// let store = LmdbStore::open("/var/lib/paddock", 512)?;
/// store.insert_batch(&drivers).await?;
/// let all = store.select(&Query::<Driver>::all()).await?;
/// ```
pub struct LmdbStore {
    env: Env,
    dbs: HashMap<Table, Database<Bytes, Bytes>>,
    path: PathBuf,
}

impl std::fmt::Debug for LmdbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbStore").field("path", &self.path).finish()
    }
}

impl LmdbStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the environment in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - A table database cannot be created
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment directory is owned by this process; no
        // other handle truncates or remaps the files while it is open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(Table::ALL.len() as u32)
                .open(&path)
        }
        .map_err(|e| LmdbStoreError::EnvOpen {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let mut dbs = HashMap::new();
        for table in Table::ALL {
            let mut wtxn = env.write_txn().map_err(|e| LmdbStoreError::Transaction {
                table,
                reason: e.to_string(),
            })?;
            let db: Database<Bytes, Bytes> = env
                .create_database(&mut wtxn, Some(table.as_str()))
                .map_err(|e| LmdbStoreError::DbOpen {
                    table,
                    reason: e.to_string(),
                })?;
            wtxn.commit().map_err(|e| LmdbStoreError::Transaction {
                table,
                reason: e.to_string(),
            })?;
            dbs.insert(table, db);
        }

        debug!(path = %path.display(), max_size_mb, "opened LMDB store");
        Ok(Self { env, dbs, path })
    }

    /// Directory holding the environment.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn db(&self, table: Table) -> Result<Database<Bytes, Bytes>, LmdbStoreError> {
        self.dbs
            .get(&table)
            .copied()
            .ok_or_else(|| LmdbStoreError::DbOpen {
                table,
                reason: "database not opened".to_string(),
            })
    }

    fn read_txn(&self, table: Table) -> Result<RoTxn<'_>, LmdbStoreError> {
        self.env.read_txn().map_err(|e| LmdbStoreError::Transaction {
            table,
            reason: e.to_string(),
        })
    }

    /// Decode every row of a table in key order.
    fn scan<R: Record>(&self) -> Result<Vec<R>, LmdbStoreError> {
        let table = R::table();
        let db = self.db(table)?;
        let rtxn = self.read_txn(table)?;
        let iter = db.iter(&rtxn).map_err(|e| LmdbStoreError::Transaction {
            table,
            reason: e.to_string(),
        })?;

        let mut rows = Vec::new();
        for entry in iter {
            let (_, bytes) = entry.map_err(|e| LmdbStoreError::Transaction {
                table,
                reason: e.to_string(),
            })?;
            let row: R =
                serde_json::from_slice(bytes).map_err(|e| LmdbStoreError::Deserialization {
                    table,
                    reason: e.to_string(),
                })?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn append<R: Record>(&self, rows: &[R]) -> Result<usize, LmdbStoreError> {
        let table = R::table();
        let db = self.db(table)?;
        let txn_err = |e: heed::Error| LmdbStoreError::Transaction {
            table,
            reason: e.to_string(),
        };

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        let mut next = match db.last(&wtxn).map_err(txn_err)? {
            Some((key, _)) => decode_key(key).map_or(0, |k| k + 1),
            None => 0,
        };

        for row in rows {
            let value = serde_json::to_vec(row).map_err(|e| LmdbStoreError::Serialization {
                table,
                reason: e.to_string(),
            })?;
            db.put(&mut wtxn, &next.to_be_bytes(), &value)
                .map_err(txn_err)?;
            next += 1;
        }

        wtxn.commit().map_err(txn_err)?;
        Ok(rows.len())
    }
}

fn decode_key(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

#[async_trait]
impl Store for LmdbStore {
    async fn insert_batch<R: Record>(&self, rows: &[R]) -> PaddockResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        Ok(self.append(rows)?)
    }

    async fn count<R: Record>(&self) -> PaddockResult<usize> {
        let table = R::table();
        let db = self.db(table)?;
        let rtxn = self.read_txn(table)?;
        let len = db.len(&rtxn).map_err(|e| LmdbStoreError::Transaction {
            table,
            reason: e.to_string(),
        })?;
        Ok(len as usize)
    }

    async fn select<R: Record>(&self, query: &Query<R>) -> PaddockResult<Vec<R>> {
        Ok(query.apply(self.scan::<R>()?))
    }

    fn engine_name(&self) -> &'static str {
        "lmdb"
    }
}
