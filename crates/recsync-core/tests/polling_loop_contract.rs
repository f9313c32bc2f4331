//! Contract Test: Polling Loop
//!
//! This test verifies the sequential driver around the Syncer.
//!
//! Constraints verified:
//! - A failed IP lookup skips the cycle and the loop keeps going
//! - A failed write stops the loop and is returned
//! - A steady address costs no provider calls after the first cycle
//! - The loop terminates on the shutdown signal
//!
//! If this test fails, someone has added retry logic to the loop or made
//! write failures non-fatal.

mod common;

use common::*;
use recsync_core::{Poller, PollerConfig, PollerEvent};
use std::net::IpAddr;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;

const POLL: Duration = Duration::from_secs(5);

fn drain(rx: &mut mpsc::Receiver<PollerEvent>) -> Vec<PollerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn write_failure_stops_the_loop() {
    let ip = IpAddr::from([5, 6, 7, 8]);
    let store = MockRecordStore::with_a_record("1.2.3.4");
    store.set_edit_behavior(EditBehavior::Reject);
    let syncer = syncer_over(&store, POLL);

    let (mut poller, mut event_rx) =
        Poller::new(Box::new(ScriptedIpSource::fixed(ip)), syncer, PollerConfig::new(POLL))
            .expect("poller construction succeeds");

    let (_shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let result = poller.run_with_shutdown(Some(shutdown_rx)).await;

    let err = result.expect_err("Write failure must stop the loop");
    assert!(err.is_transport());
    assert_eq!(store.edit_call_count(), 1, "No retry of the failed write");

    let events = drain(&mut event_rx);
    assert!(matches!(events.first(), Some(PollerEvent::Started { .. })));
    assert!(events.contains(&PollerEvent::IpObserved { ip }));
    assert!(events
        .iter()
        .any(|e| matches!(e, PollerEvent::SyncFailed { .. })));
    assert!(matches!(events.last(), Some(PollerEvent::Stopped { .. })));
}

#[tokio::test(start_paused = true)]
async fn ip_lookup_failure_skips_the_cycle() {
    let ip = IpAddr::from([5, 6, 7, 8]);
    let source = ScriptedIpSource::new(vec![Err("timed out".to_string()), Ok(ip)]);
    let lookups = source.call_counter();

    let store = MockRecordStore::with_a_record("1.2.3.4");
    store.set_edit_behavior(EditBehavior::Reject);
    let syncer = syncer_over(&store, POLL);

    let (mut poller, mut event_rx) =
        Poller::new(Box::new(source), syncer, PollerConfig::new(POLL))
            .expect("poller construction succeeds");

    let (_shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let result = poller.run_with_shutdown(Some(shutdown_rx)).await;

    assert!(result.is_err());
    assert_eq!(lookups.load(Ordering::SeqCst), 2);
    assert_eq!(
        store.calls().len(),
        2,
        "Failed lookup cycle makes no provider calls; second cycle lists then edits"
    );

    let events = drain(&mut event_rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, PollerEvent::IpLookupFailed { .. })));
}

#[tokio::test(start_paused = true)]
async fn steady_address_is_free_after_first_cycle() {
    let ip = IpAddr::from([1, 2, 3, 4]);
    let store = MockRecordStore::with_a_record("1.2.3.4");
    let syncer = syncer_over(&store, POLL);

    let (mut poller, mut event_rx) =
        Poller::new(Box::new(ScriptedIpSource::fixed(ip)), syncer, PollerConfig::new(POLL))
            .expect("poller construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = tokio::spawn(async move {
        let result = poller.run_with_shutdown(Some(shutdown_rx)).await;
        (result, poller)
    });

    // Several cycles
    tokio::time::sleep(POLL * 4 + Duration::from_secs(1)).await;

    shutdown_tx.send(()).expect("shutdown signal send succeeds");
    let (result, poller) = handle.await.expect("poller task completes");
    assert!(result.is_ok(), "Poller should shut down cleanly: {:?}", result);

    // The empty cache differs from the address on the first cycle only
    assert_eq!(store.list_call_count(), 1);
    assert_eq!(store.edit_call_count(), 1);
    assert_eq!(poller.syncer().cached_record().data, "1.2.3.4");

    let events = drain(&mut event_rx);
    let in_sync = events
        .iter()
        .filter(|e| matches!(e, PollerEvent::InSync { .. }))
        .count();
    assert!(in_sync >= 3, "Expected at least 3 quiet cycles, got {}", in_sync);
    assert_eq!(
        events.last(),
        Some(&PollerEvent::Stopped {
            reason: "Shutdown signal".to_string()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_terminates_poller() {
    let store = MockRecordStore::with_a_record("1.2.3.4");
    let syncer = syncer_over(&store, POLL);

    let (mut poller, _event_rx) = Poller::new(
        Box::new(ScriptedIpSource::new(vec![Err("offline".to_string())])),
        syncer,
        PollerConfig::new(POLL),
    )
    .expect("poller construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = tokio::spawn(async move { poller.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    shutdown_tx.send(()).expect("shutdown signal send succeeds");

    let result = tokio::time::timeout(Duration::from_secs(30), handle).await;
    assert!(result.is_ok(), "Poller should terminate within the timeout");

    let poller_result = result.unwrap().unwrap();
    assert!(poller_result.is_ok());
    assert_eq!(store.calls().len(), 0, "Offline source never reaches the provider");
}

#[tokio::test]
async fn zero_interval_is_rejected() {
    let store = MockRecordStore::with_a_record("1.2.3.4");
    let syncer = syncer_over(&store, POLL);

    let result = Poller::new(
        Box::new(ScriptedIpSource::fixed(IpAddr::from([1, 2, 3, 4]))),
        syncer,
        PollerConfig::new(Duration::ZERO),
    );

    assert!(result.is_err());
}
