//! Integration tests for the renewal loop.
//!
//! These drive `Renewer::run` end to end against mock collaborators:
//! a fixed credential source, a recording login runtime, and a counting
//! readiness notifier.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ecr_agent::error::AgentError;
use ecr_agent::fetcher::{Credential, StaticSource};
use ecr_agent::login::RecordingRuntime;
use ecr_agent::notify::CountingNotifier;
use ecr_agent::renewer::Renewer;
use tokio::sync::watch;

const MARGIN: Duration = Duration::from_secs(3600);
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn credential(endpoint: &str, expires_in_secs: i64) -> Credential {
    Credential {
        principal: "AWS".to_string(),
        secret: format!("token-for-{endpoint}"),
        endpoint: endpoint.to_string(),
        expires_at: Utc::now() + chrono::Duration::seconds(expires_in_secs),
        raw_token: "raw".to_string(),
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn loop_renews_once_then_waits_until_shutdown() {
    let runtime = Arc::new(RecordingRuntime::new());
    let notifier = Arc::new(CountingNotifier::new());
    let renewer = Renewer::new(
        Arc::new(StaticSource::new(vec![
            credential("e1.example.com", 3 * 3600),
            credential("e2.example.com", 5 * 3600),
        ])),
        runtime.clone(),
        notifier.clone(),
        MARGIN,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { renewer.run(shutdown_rx).await });

    // First cycle completes, then the loop sleeps until ~2h before expiry.
    assert!(wait_for(|| notifier.count() == 1).await);
    assert_eq!(runtime.endpoints(), vec!["e1.example.com", "e2.example.com"]);

    shutdown_tx.send(true).unwrap();
    let result = tokio::time::timeout(TEST_TIMEOUT, handle).await;
    assert!(result.unwrap().unwrap().is_ok());

    // Shutdown landed during the sleep: still exactly one cycle.
    assert_eq!(notifier.count(), 1);
    assert_eq!(runtime.endpoints().len(), 2);
}

#[tokio::test]
async fn credentials_expiring_within_the_margin_renew_immediately() {
    let runtime = Arc::new(RecordingRuntime::new());
    let notifier = Arc::new(CountingNotifier::new());
    let renewer = Renewer::new(
        Arc::new(StaticSource::new(vec![credential("e1.example.com", 1800)])),
        runtime.clone(),
        notifier.clone(),
        MARGIN,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { renewer.run(shutdown_rx).await });

    // The computed sleep clamps to zero, so cycles follow back to back.
    assert!(wait_for(|| notifier.count() >= 2).await);

    shutdown_tx.send(true).unwrap();
    let result = tokio::time::timeout(TEST_TIMEOUT, handle).await;
    assert!(result.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn fetch_failure_ends_the_loop() {
    let renewer = Renewer::new(
        Arc::new(StaticSource::failing()),
        Arc::new(RecordingRuntime::new()),
        Arc::new(CountingNotifier::new()),
        MARGIN,
    );

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let err = tokio::time::timeout(TEST_TIMEOUT, renewer.run(shutdown_rx))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, AgentError::MalformedToken { .. }));
}

#[tokio::test]
async fn login_failure_ends_the_loop() {
    let notifier = Arc::new(CountingNotifier::new());
    let renewer = Renewer::new(
        Arc::new(StaticSource::new(vec![credential("e1.example.com", 3 * 3600)])),
        Arc::new(RecordingRuntime::failing()),
        notifier.clone(),
        MARGIN,
    );

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let err = tokio::time::timeout(TEST_TIMEOUT, renewer.run(shutdown_rx))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, AgentError::Login { .. }));

    // The cycle aborted before readiness was signaled.
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn empty_batch_ends_the_loop_instead_of_sleeping() {
    let renewer = Renewer::new(
        Arc::new(StaticSource::new(Vec::new())),
        Arc::new(RecordingRuntime::new()),
        Arc::new(CountingNotifier::new()),
        MARGIN,
    );

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let err = tokio::time::timeout(TEST_TIMEOUT, renewer.run(shutdown_rx))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, AgentError::EmptyBatch));
}
