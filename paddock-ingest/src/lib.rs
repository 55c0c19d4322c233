//! Paddock Ingest - Telemetry Fetching and Cache Population
//!
//! - [`Fetcher`]: retrying, validating GET over a pluggable [`Transport`]
//! - [`OpenF1Client`]: typed access to the provider's read endpoints
//! - [`PopulationController`]: fills empty tables once at startup

pub mod fetch;
pub mod observer;
pub mod populate;
pub mod provider;

pub use fetch::{
    classify, Classified, Fetcher, HttpTransport, Payload, Transport, TransportResponse,
};
pub use observer::{endpoint_label, AttemptOutcome, IngestObserver, NoopObserver};
pub use populate::{DatasetReport, PopulationController, PopulationReport};
pub use provider::OpenF1Client;
