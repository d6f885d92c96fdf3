//! End-to-end tests for the x-center Thing handler over mocked collaborators.

use std::sync::Arc;
use std::time::Duration;

use kermi_common::{ThingStatus, ThingStatusDetail, ThingStatusInfo, parse_config};
use kermi_thing_framework::mock::{
    MockBridge, MockEndpoint, MockInterface, RecordingReadingSink, RecordingStatusSink,
};
use kermi_thing_framework::{BridgeHandle, ChannelError, ThingHandler};
use kermi_xcenter::config::XcenterConfig;
use kermi_xcenter::handler::XcenterThingHandler;

// Default register map: state @ 100, power @ 120, work hours @ 150,
// pv @ 200, alarm @ 250.
const STATE: u16 = 100;
const POWER: u16 = 120;
const PV: u16 = 200;
const ALARM: u16 = 250;

fn config(pv_enabled: bool) -> XcenterConfig {
    let json = format!(
        r#"{{
            name: "xcenter01",
            connection: {{ type: "tcp", host: "192.168.1.10" }},
            pv_enabled: {},
        }}"#,
        pv_enabled
    );
    let config: XcenterConfig = parse_config(&json).unwrap();
    config.validate().unwrap();
    config
}

struct Fixture {
    channel: Arc<MockInterface>,
    bridge: Arc<MockBridge>,
    status: Arc<RecordingStatusSink>,
    readings: Arc<RecordingReadingSink>,
    handler: Arc<XcenterThingHandler>,
}

fn fixture_with_channel(pv_enabled: bool, channel: Arc<MockInterface>) -> Fixture {
    let bridge = MockBridge::new("Heat pump");
    bridge.set_endpoint(MockEndpoint::new(1, channel.clone()));

    let status = RecordingStatusSink::new();
    let readings = RecordingReadingSink::new();
    let handler = XcenterThingHandler::new(
        Some(config(pv_enabled)),
        Some(bridge.clone() as Arc<dyn BridgeHandle>),
        status.clone(),
        readings.clone(),
    );

    Fixture {
        channel,
        bridge,
        status,
        readings,
        handler,
    }
}

fn fixture(pv_enabled: bool) -> Fixture {
    fixture_with_channel(pv_enabled, MockInterface::new())
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within timeout");
}

#[tokio::test]
async fn initialize_registers_polls_and_reports_online() {
    let f = fixture(false);

    f.handler.initialize();
    wait_until(|| f.channel.active_polls() == 4).await;

    // still initializing until the state and alarm polls answer
    assert_eq!(f.status.last().unwrap().status, ThingStatus::Unknown);

    f.channel.fire(STATE, Ok(vec![2]));
    f.channel.fire(ALARM, Ok(vec![0]));

    assert_eq!(f.status.last().unwrap().status, ThingStatus::Online);
}

#[tokio::test]
async fn readings_flow_to_the_sink() {
    let f = fixture(false);

    f.handler.initialize();
    wait_until(|| f.channel.active_polls() == 4).await;

    f.channel.fire(POWER, Ok(vec![1500, 0, 0, 0]));

    let readings = f.readings.readings();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].metric, "combined_power");
    assert_eq!(readings[0].device, "xcenter01");
    assert_eq!(readings[0].unit.as_deref(), Some("W"));
}

#[tokio::test]
async fn state_failure_reports_state_read_error() {
    let f = fixture(false);

    f.handler.initialize();
    wait_until(|| f.channel.active_polls() == 4).await;

    f.channel.fire(STATE, Err(ChannelError::Timeout(1000)));
    f.channel.fire(ALARM, Ok(vec![0]));

    let last = f.status.last().unwrap();
    assert_eq!(last.status, ThingStatus::Offline);
    assert_eq!(last.detail, ThingStatusDetail::CommunicationError);
    assert_eq!(last.message.as_deref(), Some("State read error"));
}

#[tokio::test]
async fn alarm_failure_reports_data_read_error() {
    let f = fixture(false);

    f.handler.initialize();
    wait_until(|| f.channel.active_polls() == 4).await;

    f.channel.fire(STATE, Ok(vec![2]));
    f.channel.fire(ALARM, Err(ChannelError::Read("gone".to_string())));

    let last = f.status.last().unwrap();
    assert_eq!(last.status, ThingStatus::Offline);
    assert_eq!(last.message.as_deref(), Some("Data read error"));
}

#[tokio::test]
async fn informational_failures_do_not_flip_the_verdict() {
    let f = fixture(false);

    f.handler.initialize();
    wait_until(|| f.channel.active_polls() == 4).await;

    f.channel.fire(STATE, Ok(vec![2]));
    f.channel.fire(ALARM, Ok(vec![0]));
    f.channel.fire(POWER, Err(ChannelError::Timeout(1000)));

    assert_eq!(f.status.last().unwrap().status, ThingStatus::Online);
}

#[tokio::test]
async fn pv_group_is_polled_when_enabled() {
    let f = fixture(true);

    f.handler.initialize();
    wait_until(|| f.channel.active_polls() == 5).await;

    f.channel.fire(PV, Ok(vec![620, 0]));

    let readings = f.readings.readings();
    assert!(readings.iter().any(|r| r.metric == "pv_power"));
}

#[tokio::test]
async fn offline_bridge_is_reported_with_detail() {
    let f = fixture(false);
    f.bridge.set_status(ThingStatus::Offline);

    f.handler.initialize();
    wait_until(|| {
        f.status
            .last()
            .is_some_and(|info| info.status == ThingStatus::Offline)
    })
    .await;

    let last = f.status.last().unwrap();
    assert_eq!(last.detail, ThingStatusDetail::BridgeOffline);
    assert_eq!(last.message.as_deref(), Some("Bridge 'Heat pump' is offline"));
    assert_eq!(f.channel.active_polls(), 0);
}

#[tokio::test]
async fn missing_configuration_is_reported() {
    let bridge = MockBridge::new("Heat pump");
    let status = RecordingStatusSink::new();
    let handler = XcenterThingHandler::new(
        None,
        Some(bridge as Arc<dyn BridgeHandle>),
        status.clone(),
        RecordingReadingSink::new(),
    );

    handler.initialize();

    let last = status.last().unwrap();
    assert_eq!(last.status, ThingStatus::Offline);
    assert_eq!(last.detail, ThingStatusDetail::ConfigurationError);
}

#[tokio::test]
async fn failed_registration_leaves_no_polls_behind() {
    let f = fixture_with_channel(false, MockInterface::failing_from(2));

    f.handler.initialize();
    wait_until(|| {
        f.status
            .last()
            .is_some_and(|info| info.status == ThingStatus::Offline)
    })
    .await;

    let last = f.status.last().unwrap();
    assert_eq!(last.detail, ThingStatusDetail::CommunicationError);
    assert_eq!(f.channel.active_polls(), 0);
    assert_eq!(f.channel.registration_attempts(), 3);
}

#[tokio::test]
async fn dispose_deregisters_everything_and_is_idempotent() {
    let f = fixture(false);

    f.handler.initialize();
    wait_until(|| f.channel.active_polls() == 4).await;

    f.handler.dispose();
    assert_eq!(f.channel.active_polls(), 0);

    // stopping twice is safe
    f.handler.dispose();
    assert_eq!(f.channel.active_polls(), 0);
}

#[tokio::test]
async fn dispose_racing_initialization_leaks_nothing() {
    let f = fixture(false);

    f.handler.initialize();
    f.handler.dispose();

    // let the in-flight startup task finish; whatever it registered must be
    // rolled back again
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(f.channel.active_polls(), 0);
}

#[tokio::test]
async fn bridge_status_changes_drive_reconnect() {
    let f = fixture(false);

    f.handler.initialize();
    wait_until(|| f.channel.active_polls() == 4).await;

    // bridge drops out
    f.bridge.set_status(ThingStatus::Offline);
    f.handler
        .bridge_status_changed(ThingStatusInfo::offline(ThingStatusDetail::None, "gone"));

    assert_eq!(f.channel.active_polls(), 0);
    let last = f.status.last().unwrap();
    assert_eq!(last.detail, ThingStatusDetail::BridgeOffline);
    assert_eq!(last.message.as_deref(), Some("Bridge 'Heat pump' is offline"));

    // bridge recovers; a fresh resolution registers the polls again
    f.bridge.set_status(ThingStatus::Online);
    f.handler.bridge_status_changed(ThingStatusInfo::online());
    wait_until(|| f.channel.active_polls() == 4).await;

    f.channel.fire(STATE, Ok(vec![2]));
    f.channel.fire(ALARM, Ok(vec![0]));
    assert_eq!(f.status.last().unwrap().status, ThingStatus::Online);
}

#[tokio::test]
async fn bridge_online_after_dispose_is_ignored() {
    let f = fixture(false);

    f.handler.initialize();
    wait_until(|| f.channel.active_polls() == 4).await;

    f.handler.dispose();
    f.handler.bridge_status_changed(ThingStatusInfo::online());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(f.channel.active_polls(), 0);
}
