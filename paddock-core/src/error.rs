//! Error types for Paddock operations

use crate::{Season, Table};
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Insert into {table:?} failed: {reason}")]
    InsertFailed { table: Table, reason: String },

    #[error("Row in {table:?} could not be decoded: {reason}")]
    Corrupt { table: Table, reason: String },

    #[error("Storage engine error: {reason}")]
    Engine { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Payload validation failures. Retried exactly like network failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Response body is empty")]
    EmptyBody,

    #[error("Response is not well-formed JSON: {reason}")]
    Malformed { reason: String },

    #[error("Response decoded to an empty {kind}")]
    EmptyCollection { kind: &'static str },

    #[error("Response is a JSON {kind}, expected an array or object")]
    NotACollection { kind: &'static str },
}

/// Remote fetch errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid payload from {url}: {source}")]
    Invalid {
        url: String,
        #[source]
        source: ValidationError,
    },

    #[error("Giving up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },

    #[error("Payload from {url} does not match the expected rows: {reason}")]
    Decode { url: String, reason: String },
}

impl FetchError {
    /// The innermost cause, unwrapping `Exhausted`.
    pub fn last_cause(&self) -> &FetchError {
        match self {
            FetchError::Exhausted { last, .. } => last.last_cause(),
            other => other,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },
}

/// Startup population errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PopulateError {
    #[error("No '{session_name}' sessions available for season {season}")]
    NoSessions {
        season: Season,
        session_name: String,
        cause: Option<FetchError>,
    },

    #[error("Store failure during population: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for PopulateError {
    fn from(e: StorageError) -> Self {
        PopulateError::Storage(e)
    }
}

impl From<PaddockError> for PopulateError {
    fn from(e: PaddockError) -> Self {
        match e {
            PaddockError::Storage(storage) => PopulateError::Storage(storage),
            other => PopulateError::Storage(StorageError::Engine {
                reason: other.to_string(),
            }),
        }
    }
}

/// Master error type for all Paddock errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PaddockError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Population error: {0}")]
    Populate(#[from] PopulateError),

    #[error("{table:?} row {id} not found")]
    NotFound { table: Table, id: String },
}

impl PaddockError {
    pub fn not_found(table: Table, id: impl ToString) -> Self {
        PaddockError::NotFound {
            table,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PaddockError::NotFound { .. })
    }
}

/// Result type alias for Paddock operations.
pub type PaddockResult<T> = Result<T, PaddockError>;

// =============================================================================
// TESTS
// =============================================================================
