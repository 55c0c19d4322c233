//! Retry and validation behavior of the Fetcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use paddock_core::{Driver, FetchError, RetryConfig, Table, ValidationError};
use paddock_ingest::{AttemptOutcome, Fetcher, IngestObserver};
use paddock_test_utils::{Scripted, ScriptedTransport};

const URL: &str = "http://provider.test/v1/laps?session_key=1";

fn retry(max_attempts: u32, backoff: Duration) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff: backoff,
        backoff_multiplier: 2.0,
    }
}

fn fetcher(transport: &Arc<ScriptedTransport>, config: RetryConfig) -> Fetcher {
    Fetcher::new(transport.clone(), config)
}

#[tokio::test]
async fn test_succeeds_on_third_attempt() {
    let transport = Arc::new(ScriptedTransport::new().script(
        "/laps",
        vec![
            Scripted::fail("connection reset"),
            Scripted::status(502),
            Scripted::body(r#"[{"lap_number": 1}]"#),
        ],
    ));

    let body = fetcher(&transport, retry(3, Duration::ZERO))
        .fetch(URL)
        .await
        .expect("third attempt should succeed");

    assert_eq!(body, br#"[{"lap_number": 1}]"#.to_vec());
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn test_exhausts_after_max_attempts() {
    let transport = Arc::new(ScriptedTransport::new().script("/laps", vec![Scripted::status(503)]));

    let err = fetcher(&transport, retry(3, Duration::ZERO))
        .fetch(URL)
        .await
        .expect_err("every attempt fails");

    assert_eq!(transport.call_count(), 3);
    match err {
        FetchError::Exhausted { attempts, last, .. } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, FetchError::Status { status: 503, .. }));
        }
        other => panic!("Expected Exhausted, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_collection_is_retried() {
    let transport = Arc::new(ScriptedTransport::new().script(
        "/laps",
        vec![Scripted::body("[]"), Scripted::body("{}"), Scripted::body("[{}]")],
    ));

    let result = fetcher(&transport, retry(3, Duration::ZERO)).fetch(URL).await;

    assert!(result.is_ok());
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn test_malformed_body_reports_last_cause() {
    let transport =
        Arc::new(ScriptedTransport::new().script("/laps", vec![Scripted::body("<html>busy</html>")]));

    let err = fetcher(&transport, retry(2, Duration::ZERO))
        .fetch(URL)
        .await
        .expect_err("html is not json");

    assert_eq!(transport.call_count(), 2);
    assert!(matches!(
        err.last_cause(),
        FetchError::Invalid {
            source: ValidationError::Malformed { .. },
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_and_skips_final_sleep() {
    let transport = Arc::new(ScriptedTransport::new().script("/laps", vec![Scripted::status(500)]));
    let started = tokio::time::Instant::now();

    let result = fetcher(&transport, retry(3, Duration::from_secs(1)))
        .fetch(URL)
        .await;

    assert!(result.is_err());
    // 1s after the first failure, 2s after the second, nothing after the third.
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

#[tokio::test]
async fn test_decode_mismatch_is_not_retried() {
    let transport = Arc::new(
        ScriptedTransport::new().script("/drivers", vec![Scripted::body(r#"[{"team_name": "x"}]"#)]),
    );

    let result: Result<Vec<Driver>, FetchError> = fetcher(&transport, retry(3, Duration::ZERO))
        .fetch_json("http://provider.test/v1/drivers?session_key=1")
        .await;

    assert!(matches!(result, Err(FetchError::Decode { .. })));
    assert_eq!(transport.call_count(), 1);
}

#[derive(Default)]
struct CountingObserver {
    successes: AtomicUsize,
    failures: AtomicUsize,
}

impl IngestObserver for CountingObserver {
    fn fetch_attempt(&self, endpoint: &str, outcome: AttemptOutcome) {
        assert_eq!(endpoint, "laps");
        match outcome {
            AttemptOutcome::Success => self.successes.fetch_add(1, Ordering::SeqCst),
            _ => self.failures.fetch_add(1, Ordering::SeqCst),
        };
    }

    fn rows_inserted(&self, _table: Table, _rows: usize) {}
}

#[tokio::test]
async fn test_observer_sees_every_attempt() {
    let transport = Arc::new(ScriptedTransport::new().script(
        "/laps",
        vec![Scripted::status(500), Scripted::body("[1]")],
    ));
    let observer = Arc::new(CountingObserver::default());

    let result = fetcher(&transport, retry(3, Duration::ZERO))
        .with_observer(observer.clone())
        .fetch(URL)
        .await;

    assert!(result.is_ok());
    assert_eq!(observer.successes.load(Ordering::SeqCst), 1);
    assert_eq!(observer.failures.load(Ordering::SeqCst), 1);
}
