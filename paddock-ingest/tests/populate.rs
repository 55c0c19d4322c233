//! Population controller behavior against a scripted provider.

use std::sync::Arc;
use std::time::Duration;

use paddock_core::{Driver, DriverNumber, Lap, PopulateError, Position, Session, SessionKey};
use paddock_ingest::{OpenF1Client, PopulationController};
use paddock_storage::{MemoryStore, PositionField, Query, Store};
use paddock_test_utils::assertions::assert_session_keys;
use paddock_test_utils::fixtures::{self, test_config};
use paddock_test_utils::{InstrumentedStore, Scripted, ScriptedTransport, TrackingTransport};

fn roster_9574() -> Vec<Driver> {
    vec![
        fixtures::driver(1, "Max", "Verstappen", "Red Bull Racing", "NED"),
        fixtures::driver(16, "Charles", "Leclerc", "Ferrari", "MON"),
        fixtures::driver(44, "Lewis", "Hamilton", "Mercedes", "GBR"),
        fixtures::driver(81, "Oscar", "Piastri", "McLaren", "AUS"),
    ]
}

fn roster_9636() -> Vec<Driver> {
    vec![
        fixtures::driver(4, "Lando", "Norris", "McLaren", "GBR"),
        fixtures::driver(1, "Max", "Verstappen", "Red Bull Racing", "NED"),
    ]
}

/// Positions and laps as the provider would send them, with a foreign
/// session key so rekeying is observable.
fn telemetry_routes(transport: ScriptedTransport, key: u32) -> ScriptedTransport {
    let positions = vec![
        fixtures::position(999, 1, 2, 1),
        fixtures::position(999, 1, 1, 40),
    ];
    let laps = vec![
        fixtures::lap(999, 1, 1, Some(91.0), Some(320.0)),
        fixtures::lap(999, 16, 1, Some(92.0), Some(318.0)),
    ];
    transport
        .respond_json(&format!("/position?session_key={}", key), &positions)
        .respond_json(&format!("/laps?session_key={}", key), &laps)
}

fn full_provider() -> ScriptedTransport {
    let grid = fixtures::grid();
    let transport = ScriptedTransport::new()
        .respond_json("/drivers?session_key=9574", &roster_9574())
        .respond_json("/drivers?session_key=9636", &roster_9636())
        .respond_json("/sessions?session_name=Race&year=2024", &grid.sessions);
    let transport = telemetry_routes(transport, 100);
    let transport = telemetry_routes(transport, 200);
    telemetry_routes(transport, 300)
}

fn controller<S: Store>(
    store: Arc<S>,
    transport: Arc<ScriptedTransport>,
) -> PopulationController<S> {
    let config = test_config();
    let client = OpenF1Client::with_transport(transport, &config);
    PopulationController::new(store, client, &config)
}

#[tokio::test]
async fn test_populates_every_dataset_in_order() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(full_provider());

    let report = controller(store.clone(), transport.clone())
        .populate()
        .await
        .expect("population should succeed");

    // Roster filtering: 81 dropped, 1 not inserted twice.
    let drivers = store.select(&Query::<Driver>::all()).await.expect("select");
    let numbers: Vec<u32> = drivers.iter().map(|d| d.driver_number.get()).collect();
    assert_eq!(numbers, vec![1, 16, 44, 4]);
    assert!(report.missing_drivers.is_empty());

    assert_eq!(store.count::<Session>().await.ok(), Some(3));
    assert_eq!(report.positions.rows_inserted, 6);
    assert_eq!(report.laps.rows_inserted, 6);
    assert!(report.failed_sessions.is_empty());

    let calls = transport.calls();
    assert!(calls[0].contains("/drivers?session_key=9574"));
    assert!(calls[1].contains("/drivers?session_key=9636"));
    assert!(calls[2].contains("/sessions?"));
}

#[tokio::test]
async fn test_session_keys_are_rewritten_to_queried_key() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(full_provider());

    controller(store.clone(), transport)
        .populate()
        .await
        .expect("population should succeed");

    for key in [100, 200, 300] {
        let positions = store
            .select(&Query::<Position>::all().eq(PositionField::SessionKey, SessionKey(key)))
            .await
            .expect("select");
        assert_eq!(positions.len(), 2);
        assert_session_keys(&positions, SessionKey(key), |p| p.session_key);
    }
    let laps = store.select(&Query::<Lap>::all()).await.expect("select");
    assert!(laps.iter().all(|l| l.session_key != SessionKey(999)));
}

#[tokio::test]
async fn test_second_run_makes_no_network_calls() {
    let store = Arc::new(MemoryStore::new());
    controller(store.clone(), Arc::new(full_provider()))
        .populate()
        .await
        .expect("first population should succeed");

    let transport = Arc::new(full_provider());
    let report = controller(store.clone(), transport.clone())
        .populate()
        .await
        .expect("second population should succeed");

    assert_eq!(transport.call_count(), 0);
    assert!(report.all_skipped());
    assert_eq!(store.count::<Position>().await.ok(), Some(6));
}

#[tokio::test]
async fn test_no_sessions_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond_json("/drivers?session_key=9574", &roster_9574())
            .respond_json("/drivers?session_key=9636", &roster_9636())
            .script("/sessions", vec![Scripted::body("[]")]),
    );

    let result = controller(store.clone(), transport.clone()).populate().await;

    match result {
        Err(PopulateError::NoSessions { season, cause, .. }) => {
            assert_eq!(season, 2024);
            assert!(cause.is_some());
        }
        other => panic!("Expected NoSessions, got: {:?}", other),
    }
    // Empty arrays are retried like any other failure.
    assert_eq!(transport.calls_matching("/sessions"), 3);
    assert_eq!(store.count::<Session>().await.ok(), Some(0));
    assert_eq!(transport.calls_matching("/position"), 0);
}

#[tokio::test]
async fn test_failed_session_does_not_block_siblings() {
    let store = Arc::new(MemoryStore::new());
    let grid = fixtures::grid();
    let transport = ScriptedTransport::new()
        .respond_json("/drivers?session_key=9574", &roster_9574())
        .respond_json("/drivers?session_key=9636", &roster_9636())
        .respond_json("/sessions?", &grid.sessions)
        .script("/position?session_key=200", vec![Scripted::status(500)]);
    let transport = telemetry_routes(transport, 100);
    let transport = telemetry_routes(transport, 200);
    let transport = Arc::new(telemetry_routes(transport, 300));

    let report = controller(store.clone(), transport.clone())
        .populate()
        .await
        .expect("population should succeed");

    assert_eq!(report.failed_sessions, vec![SessionKey(200)]);
    assert_eq!(report.positions.rows_inserted, 4);
    // Laps of the failed session still arrive.
    assert_eq!(report.laps.rows_inserted, 6);
    assert_eq!(transport.calls_matching("/position?session_key=200"), 3);
}

#[tokio::test]
async fn test_missing_roster_drivers_are_reported() {
    let store = Arc::new(MemoryStore::new());
    let grid = fixtures::grid();
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond_json("/drivers?session_key=9574", &roster_9574()[..1])
            .script("/drivers?session_key=9636", vec![Scripted::fail("timeout")])
            .respond_json("/sessions?", &grid.sessions),
    );

    let report = controller(store.clone(), transport)
        .populate()
        .await
        .expect("population should succeed");

    assert_eq!(report.drivers.rows_inserted, 1);
    assert_eq!(report.missing_drivers, vec![DriverNumber(16), DriverNumber(44)]);
    assert_eq!(report.failed_roster_sessions, vec![SessionKey(9636)]);
    // Telemetry is unrouted, every session fails but population completes.
    assert_eq!(report.failed_sessions.len(), 3);
}

async fn seeded_for_positions() -> MemoryStore {
    let store = MemoryStore::new();
    let grid = fixtures::grid();
    store.insert_batch(&grid.drivers).await.expect("seed drivers");
    store.insert_batch(&grid.sessions[..1]).await.expect("seed sessions");
    store.insert_batch(&grid.laps[..1]).await.expect("seed laps");
    store
}

fn bulk_positions(count: usize) -> Vec<Position> {
    (0..count)
        .map(|i| fixtures::position(100, 1, (i % 20) as i32 + 1, i as i64))
        .collect()
}

#[tokio::test]
async fn test_inserts_in_chunks_of_configured_size() {
    let store = Arc::new(InstrumentedStore::new(seeded_for_positions().await));
    let transport = Arc::new(
        ScriptedTransport::new().respond_json("/position?session_key=100", &bulk_positions(2500)),
    );

    let report = controller(store.clone(), transport.clone())
        .populate()
        .await
        .expect("population should succeed");

    assert!(report.drivers.skipped && report.sessions.skipped && report.laps.skipped);
    assert!(!report.positions.skipped);
    assert_eq!(store.batch_count(), 3);
    assert_eq!(report.positions.rows_inserted, 2500);
    // Laps were already cached, so only positions were requested.
    assert_eq!(transport.calls_matching("/laps"), 0);
}

#[tokio::test]
async fn test_failed_chunk_keeps_earlier_chunks() {
    let store = Arc::new(InstrumentedStore::new(seeded_for_positions().await).fail_batch(1));
    let transport = Arc::new(
        ScriptedTransport::new().respond_json("/position?session_key=100", &bulk_positions(2500)),
    );

    let report = controller(store.clone(), transport)
        .populate()
        .await
        .expect("population should succeed");

    assert_eq!(report.positions.rows_inserted, 1500);
    assert_eq!(report.positions.failed_chunks, vec![1000..2000]);
    assert_eq!(store.count::<Position>().await.ok(), Some(1500));
}

#[tokio::test(start_paused = true)]
async fn test_session_fetches_respect_concurrency_limit() {
    let config = test_config();
    let store = MemoryStore::new();
    store
        .insert_batch(&fixtures::grid().drivers)
        .await
        .expect("seed drivers");
    let sessions: Vec<Session> = (0..12)
        .map(|i| fixtures::session(1000 + i, "Bahrain", "Sakhir", i64::from(i) + 1))
        .collect();
    store.insert_batch(&sessions).await.expect("seed sessions");

    let scripted = ScriptedTransport::new()
        .respond_json("/position?session_key=", &[fixtures::position(999, 1, 1, 1)])
        .respond_json(
            "/laps?session_key=",
            &[fixtures::lap(999, 1, 1, Some(91.0), Some(320.0))],
        );
    let transport = Arc::new(TrackingTransport::new(scripted, Duration::from_millis(30)));
    let client = OpenF1Client::with_transport(transport.clone(), &config);

    let report = PopulationController::new(Arc::new(store), client, &config)
        .populate()
        .await
        .expect("population should succeed");

    assert!(report.failed_sessions.is_empty());
    assert_eq!(report.positions.rows_inserted, 12);
    assert_eq!(transport.inner().call_count(), 24);
    let peak = transport.peak_in_flight();
    assert!(peak <= config.fanout_concurrency, "peak {} above limit", peak);
    assert!(peak > 1, "session fetches never overlapped");
}
