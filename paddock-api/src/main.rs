//! Paddock API Server Entry Point
//!
//! Loads configuration, opens the store, populates any empty tables from
//! the provider, then serves the query API until Ctrl-C.

use std::sync::Arc;

use paddock_api::telemetry::{init_tracing, LogConfig, PrometheusObserver, METRICS};
use paddock_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState};
use paddock_core::{Driver, Lap, PaddockConfig, Position, Session, Table};
use paddock_ingest::{OpenF1Client, PopulationController};
use paddock_storage::{AnyStore, Store};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&LogConfig::from_env())?;

    let config = PaddockConfig::from_env()?;
    config.validate()?;

    let store = Arc::new(AnyStore::open(&config.store)?);
    tracing::info!(
        engine = store.engine_name(),
        season = config.season,
        session_name = %config.session_name,
        "Store opened"
    );

    let observer = Arc::new(PrometheusObserver);
    let client = OpenF1Client::from_config(&config, observer.clone())
        .map_err(|e| ApiError::internal_error(format!("Failed to build provider client: {}", e)))?;

    let report = PopulationController::new(store.clone(), client, &config)
        .with_observer(observer)
        .populate()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Startup population failed");
            ApiError::service_unavailable(e.to_string())
        })?;

    if report.all_skipped() {
        tracing::info!("Cache already populated, no provider requests made");
    }
    if !report.failed_sessions.is_empty() {
        tracing::warn!(sessions = ?report.failed_sessions, "Some sessions are missing telemetry");
    }

    record_cached_rows(&store).await?;

    let state = AppState::new(store, config.season);
    let api_config = ApiConfig::from_env();
    let app = create_api_router(state, &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting Paddock API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

async fn record_cached_rows(store: &AnyStore) -> ApiResult<()> {
    let counts = [
        (Table::Drivers, store.count::<Driver>().await?),
        (Table::Sessions, store.count::<Session>().await?),
        (Table::Positions, store.count::<Position>().await?),
        (Table::Laps, store.count::<Lap>().await?),
    ];

    for (table, rows) in counts {
        tracing::info!(table = %table, rows, "Cached rows");
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.set_cached_rows(table, rows);
        }
    }
    Ok(())
}
