// NAT tracker behavior: classification, refresh retention, close semantics.
// Private address resolution needs a non-loopback interface; environments
// without one skip the tracker tests (same pattern as optional services).

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ProbeStep, ScriptedProbe};
use hostmon::error::MonitorError;
use hostmon::models::NatType;
use hostmon::nat::{NatOptions, NatTracker, RawMapping};

const SERVER: &str = "discovery.example.net:3478";

fn fast_refresh() -> NatOptions {
    NatOptions {
        check_interval: Duration::from_secs(1),
    }
}

async fn start(
    probe: Arc<ScriptedProbe>,
    options: NatOptions,
) -> Option<Result<NatTracker, MonitorError>> {
    match NatTracker::start(probe, SERVER.to_string(), options).await {
        Err(MonitorError::NoPrivateAddress) => None, // Skip when no usable interface
        other => Some(other),
    }
}

async fn advance_one_refresh() {
    tokio::time::sleep(Duration::from_millis(1050)).await;
}

#[tokio::test(start_paused = true)]
async fn tracker_reports_classified_type_and_addresses() {
    let probe = Arc::new(ScriptedProbe::new(vec![ProbeStep::Report(
        RawMapping::FullCone,
        "203.0.113.7",
    )]));
    let Some(result) = start(probe, NatOptions::default()).await else {
        return;
    };
    let tracker = result.unwrap();

    assert_eq!(tracker.nat_type(), NatType::FullCone);
    assert_eq!(tracker.public_addr(), "203.0.113.7");
    assert!(!tracker.private_addr().is_empty());
}

#[tokio::test(start_paused = true)]
async fn refresh_failure_retains_previous_state() {
    let probe = Arc::new(ScriptedProbe::new(vec![
        ProbeStep::Report(RawMapping::FullCone, "203.0.113.7"),
        ProbeStep::Fail("probe timed out"),
        ProbeStep::Report(RawMapping::Symmetric, "198.51.100.4"),
    ]));
    let Some(result) = start(probe.clone(), fast_refresh()).await else {
        return;
    };
    let tracker = result.unwrap();

    advance_one_refresh().await;
    assert_eq!(tracker.nat_type(), NatType::FullCone);
    assert_eq!(tracker.public_addr(), "203.0.113.7");
    assert!(probe.calls() >= 2, "refresh must have run");

    // The failed refresh must not have killed the loop.
    advance_one_refresh().await;
    assert_eq!(tracker.nat_type(), NatType::Symmetric);
    assert_eq!(tracker.public_addr(), "198.51.100.4");
}

#[tokio::test(start_paused = true)]
async fn refresh_with_unmapped_raw_keeps_classification() {
    let probe = Arc::new(ScriptedProbe::new(vec![
        ProbeStep::Report(RawMapping::FullCone, "203.0.113.7"),
        ProbeStep::Report(RawMapping::Blocked, "203.0.113.9"),
    ]));
    let Some(result) = start(probe, fast_refresh()).await else {
        return;
    };
    let tracker = result.unwrap();

    advance_one_refresh().await;
    assert_eq!(
        tracker.nat_type(),
        NatType::FullCone,
        "unmapped raw result leaves the classification alone"
    );
    assert_eq!(
        tracker.public_addr(),
        "203.0.113.9",
        "the probe answered, so its public address is taken"
    );
}

#[tokio::test(start_paused = true)]
async fn construction_fails_on_probe_error() {
    let probe = Arc::new(ScriptedProbe::new(vec![ProbeStep::Fail("unreachable")]));
    let Some(result) = start(probe, NatOptions::default()).await else {
        return;
    };
    match result {
        Err(MonitorError::Probe(_)) => {}
        Err(e) => panic!("expected probe error, got {e:?}"),
        Ok(_) => panic!("expected probe error, got a running tracker"),
    }
}

#[tokio::test(start_paused = true)]
async fn construction_fails_on_unmapped_raw_result() {
    let probe = Arc::new(ScriptedProbe::new(vec![ProbeStep::Report(
        RawMapping::Inconclusive,
        "",
    )]));
    let Some(result) = start(probe, NatOptions::default()).await else {
        return;
    };
    match result {
        Err(MonitorError::Classification { .. }) => {}
        Err(e) => panic!("expected classification error, got {e:?}"),
        Ok(_) => panic!("expected classification error, got a running tracker"),
    }
}

#[tokio::test(start_paused = true)]
async fn close_stops_refreshes_and_double_close_errors() {
    let probe = Arc::new(ScriptedProbe::new(vec![
        ProbeStep::Report(RawMapping::FullCone, "203.0.113.7"),
        ProbeStep::Report(RawMapping::Symmetric, "198.51.100.4"),
    ]));
    let Some(result) = start(probe.clone(), fast_refresh()).await else {
        return;
    };
    let mut tracker = result.unwrap();

    tracker.close().unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(tracker.nat_type(), NatType::FullCone);
    assert_eq!(probe.calls(), 1, "no refresh after close");
    assert!(matches!(tracker.close(), Err(MonitorError::AlreadyClosed)));
}
