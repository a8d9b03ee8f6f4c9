//! Integration tests for the MQTT ⇄ serial bridge, including an
//! end-to-end run against a live `Controller` over mock serial links.

use std::time::Duration;

use serde_json::{json, Value};

use plantpoint::app::events::AppEvent;
use plantpoint::app::service::Controller;
use plantpoint::bridge::queue::{SerialTxQueue, SERIAL_TX_DEPTH};
use plantpoint::bridge::reconnect::{ReconnectAction, ReconnectPolicy};
use plantpoint::bridge::{Bridge, EnvValue, Rejection};
use plantpoint::config::{BridgeConfig, ControllerConfig};

use crate::mock_hw::{MockLink, MockPins, MockPubSub, Published, RecordingSink};

fn switch_payload(name: &str, value: Value) -> Vec<u8> {
    json!({"pattern": format!("switch/{name}"), "data": {"name": name, "value": value}})
        .to_string()
        .into_bytes()
}

// ── Session setup ─────────────────────────────────────────────

#[test]
fn connect_announces_online_then_subscribes() {
    let queue = SerialTxQueue::new();
    let bridge = Bridge::new(BridgeConfig::default(), &queue);
    let mut broker = MockPubSub::online();

    bridge.on_connected(&mut broker).unwrap();

    assert_eq!(
        broker.published,
        vec![Published {
            topic: "status/mpino_bridge".into(),
            payload: Value::String("online".into()),
            retain: true,
        }]
    );
    assert_eq!(broker.subscriptions, vec!["switch/+".to_string()]);
}

#[test]
fn connect_fails_cleanly_when_offline() {
    let queue = SerialTxQueue::new();
    let bridge = Bridge::new(BridgeConfig::default(), &queue);
    let mut broker = MockPubSub::offline();
    assert!(bridge.on_connected(&mut broker).is_err());
    assert!(broker.subscriptions.is_empty());
}

// ── MQTT → serial ─────────────────────────────────────────────

#[test]
fn switch_message_becomes_serial_line() {
    let queue = SerialTxQueue::new();
    let bridge = Bridge::new(BridgeConfig::default(), &queue);
    let mut link = MockLink::new();
    let mut sink = RecordingSink::new();

    bridge
        .on_topic_message("switch/fan", &switch_payload("fan", json!(true)), &mut sink)
        .unwrap();
    assert_eq!(bridge.drain_tx(&mut link), 1);

    assert_eq!(link.take_json(), vec![json!({"cmd":"switch","dev":"fan","val":true})]);
    assert!(matches!(
        sink.last(),
        Some(AppEvent::BridgeForwarded { name, on: true }) if name.as_str() == "fan"
    ));
}

#[test]
fn invalid_switch_messages_are_dropped() {
    let queue = SerialTxQueue::new();
    let bridge = Bridge::new(BridgeConfig::default(), &queue);
    let mut sink = RecordingSink::new();

    let cases: [(&[u8], Rejection); 5] = [
        (b"not json", Rejection::NotAnObject),
        (br#"{"data":{"name":"fan","value":true}}"#, Rejection::MissingPattern),
        (
            br#"{"pattern":"current/fan","data":{"name":"fan","value":true}}"#,
            Rejection::NotASwitchPattern,
        ),
        (
            br#"{"pattern":"switch/fan","data":{"name":"fan","value":"on"}}"#,
            Rejection::ValueNotBool,
        ),
        (
            br#"{"pattern":"switch/fan","data":{"name":7,"value":true}}"#,
            Rejection::NameNotString,
        ),
    ];
    for (payload, expected) in cases {
        assert_eq!(
            bridge.on_topic_message("switch/fan", payload, &mut sink),
            Err(expected)
        );
    }

    let mut link = MockLink::new();
    assert_eq!(bridge.drain_tx(&mut link), 0);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::BridgeDropped(_))),
        cases.len()
    );
}

#[test]
fn full_queue_drops_new_lines() {
    let queue = SerialTxQueue::new();
    let bridge = Bridge::new(BridgeConfig::default(), &queue);
    let mut sink = RecordingSink::new();
    let payload = switch_payload("fan", json!(true));

    for _ in 0..SERIAL_TX_DEPTH {
        bridge.on_topic_message("switch/fan", &payload, &mut sink).unwrap();
    }
    assert_eq!(
        bridge.on_topic_message("switch/fan", &payload, &mut sink),
        Err(Rejection::QueueFull)
    );

    let mut link = MockLink::new();
    assert_eq!(bridge.drain_tx(&mut link), SERIAL_TX_DEPTH);
    // Space again after the drain.
    assert!(bridge.on_topic_message("switch/fan", &payload, &mut sink).is_ok());
}

// ── Serial → MQTT ─────────────────────────────────────────────

#[test]
fn current_frames_are_published_in_envelopes() {
    let queue = SerialTxQueue::new();
    let mut bridge = Bridge::new(BridgeConfig::default(), &queue);
    let mut link = MockLink::new();
    let mut broker = MockPubSub::online();
    let mut sink = RecordingSink::new();

    link.inject_line(r#"{"cmd":"current","dev":"fan","val":true}"#);
    link.inject_line(r#"{"cmd":"current","dev":"soil","val":812}"#);
    bridge.poll_serial(&mut link, &mut broker, &mut sink);

    let payloads: Vec<(String, Value)> = broker
        .published
        .iter()
        .map(|p| (p.topic.clone(), p.payload.clone()))
        .collect();
    assert_eq!(
        payloads,
        vec![
            (
                "current".to_string(),
                json!({"pattern":"current/fan","data":{"name":"fan","value":true}})
            ),
            (
                "current".to_string(),
                json!({"pattern":"current/soil","data":{"name":"soil","value":812}})
            ),
        ]
    );
    assert!(broker.published.iter().all(|p| !p.retain));
}

#[test]
fn per_device_topics_use_the_pattern_as_topic() {
    let queue = SerialTxQueue::new();
    let config = BridgeConfig {
        per_device_topics: true,
        ..BridgeConfig::default()
    };
    let mut bridge = Bridge::new(config, &queue);
    let mut broker = MockPubSub::online();
    let mut sink = RecordingSink::new();

    bridge.on_serial_line(
        br#"{"cmd":"current","dev":"soil","val":640}"#,
        &mut broker,
        &mut sink,
    );
    assert_eq!(broker.published[0].topic, "current/soil");
}

#[test]
fn environment_samples_publish_under_their_own_prefix() {
    let queue = SerialTxQueue::new();
    let mut bridge = Bridge::new(BridgeConfig::default(), &queue);
    let mut link = MockLink::new();
    let mut broker = MockPubSub::online();
    let mut sink = RecordingSink::new();

    link.inject_line(r#"{"cmd":"environment","dev":"PH","val":"6.52"}"#);
    link.inject_line(r#"{"cmd":"environment","dev":"humidity","val":61.5}"#);
    link.inject_line(r#"{"cmd":"environment","dev":"ec","val":true}"#);
    bridge.poll_serial(&mut link, &mut broker, &mut sink);

    let payloads: Vec<(String, Value)> = broker
        .published
        .iter()
        .map(|p| (p.topic.clone(), p.payload.clone()))
        .collect();
    assert_eq!(
        payloads,
        vec![
            (
                "environment/ph".to_string(),
                json!({"pattern":"environment/ph","data":{"name":"ph","value":"6.52"}})
            ),
            (
                "environment/humidity".to_string(),
                json!({"pattern":"environment/humidity","data":{"name":"humidity","value":61.5}})
            ),
        ]
    );
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::EnvironmentPublished { .. })),
        2
    );
    assert_eq!(
        sink.last(),
        Some(&AppEvent::BridgeDropped("environment without val"))
    );
}

#[test]
fn environment_prefix_is_configurable() {
    let queue = SerialTxQueue::new();
    let config = BridgeConfig {
        environment_prefix: "rig1/env".into(),
        ..BridgeConfig::default()
    };
    let bridge = Bridge::new(config, &queue);
    let mut broker = MockPubSub::online();
    let mut sink = RecordingSink::new();

    bridge
        .publish_environment(
            "water_temperature",
            &EnvValue::Number(21.4),
            &mut broker,
            &mut sink,
        )
        .unwrap();
    assert_eq!(broker.published[0].topic, "rig1/env/water_temperature");
    assert_eq!(
        broker.published[0].payload,
        json!({"pattern":"rig1/env/water_temperature","data":{"name":"water_temperature","value":21.4}})
    );

    let mut offline = MockPubSub::offline();
    assert!(bridge
        .publish_environment("ph", &EnvValue::Text("7.0".into()), &mut offline, &mut sink)
        .is_err());
}

#[test]
fn switch_echoes_track_last_state() {
    let queue = SerialTxQueue::new();
    let mut bridge = Bridge::new(BridgeConfig::default(), &queue);
    let mut broker = MockPubSub::online();
    let mut sink = RecordingSink::new();

    assert_eq!(bridge.last_state("fan"), None);
    bridge.on_serial_line(br#"{"cmd":"switch","dev":"fan","val":true}"#, &mut broker, &mut sink);
    assert_eq!(bridge.last_state("fan"), Some(true));
    bridge.on_serial_line(br#"{"cmd":"switch","dev":"fan","val":false}"#, &mut broker, &mut sink);
    assert_eq!(bridge.last_state("fan"), Some(false));
    assert!(broker.published.is_empty());
}

#[test]
fn unusable_serial_lines_publish_nothing() {
    let queue = SerialTxQueue::new();
    let mut bridge = Bridge::new(BridgeConfig::default(), &queue);
    let mut broker = MockPubSub::online();
    let mut sink = RecordingSink::new();

    let lines: [&[u8]; 5] = [
        b"garbage",
        br#"{"cmd":"current","val":true}"#,
        br#"{"cmd":"current","dev":"fan","val":"x"}"#,
        br#"{"status":"ok","count":2}"#,
        br#"{"cmd":"init_complete","status":"ready"}"#,
    ];
    for line in lines {
        bridge.on_serial_line(line, &mut broker, &mut sink);
    }
    assert!(broker.published.is_empty());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::BridgeDropped(_))), 3);
}

#[test]
fn offline_broker_drops_telemetry() {
    let queue = SerialTxQueue::new();
    let mut bridge = Bridge::new(BridgeConfig::default(), &queue);
    let mut broker = MockPubSub::offline();
    let mut sink = RecordingSink::new();

    bridge.on_serial_line(br#"{"cmd":"current","dev":"fan","val":true}"#, &mut broker, &mut sink);
    assert_eq!(sink.last(), Some(&AppEvent::BridgeDropped("publish failed")));
}

// ── Reconnect ─────────────────────────────────────────────────

#[test]
fn default_policy_backs_off_then_restarts() {
    let mut policy = ReconnectPolicy::from_config(&BridgeConfig::default());
    let delays: Vec<ReconnectAction> = (0..9).map(|_| policy.on_failure()).collect();
    assert_eq!(delays[0], ReconnectAction::RetryAfter(Duration::from_secs(2)));
    assert_eq!(delays[5], ReconnectAction::RetryAfter(Duration::from_secs(60)));
    assert_eq!(policy.on_failure(), ReconnectAction::Restart);
}

// ── End to end ────────────────────────────────────────────────

/// Move everything `sender` wrote into `receiver`'s input.
fn deliver(sender: &mut MockLink, receiver: &mut MockLink) {
    let bytes = std::mem::take(&mut sender.tx);
    receiver.inject(&bytes);
}

#[test]
fn broker_switch_reaches_relay_and_telemetry_returns() {
    let queue = SerialTxQueue::new();
    let mut bridge = Bridge::new(BridgeConfig::default(), &queue);
    let mut broker = MockPubSub::online();
    let mut bridge_sink = RecordingSink::new();

    let mut controller = Controller::new(&ControllerConfig::default(), 0);
    let mut pins = MockPins::new();
    let mut mpino_sink = RecordingSink::new();

    // One mock per direction of the wire.
    let mut to_mpino = MockLink::new();
    let mut from_mpino = MockLink::new();

    // Host configures the controller directly over its link.
    to_mpino.inject_line(r#"{"cmd":"config","devices":[{"name":"fan","relay":5,"sensor":6}]}"#);
    controller.poll(&mut to_mpino, &mut pins, &mut mpino_sink);
    to_mpino.tx.clear();

    // Broker asks for the fan; bridge queues and writes the line.
    bridge
        .on_topic_message("switch/fan", &switch_payload("fan", json!(true)), &mut bridge_sink)
        .unwrap();
    let mut bridge_tx = MockLink::new();
    bridge.drain_tx(&mut bridge_tx);
    deliver(&mut bridge_tx, &mut to_mpino);

    controller.poll(&mut to_mpino, &mut pins, &mut mpino_sink);
    assert_eq!(pins.writes(), vec![(5, true)]);

    // Feedback contact closes; the scan reports it and the bridge publishes.
    pins.digital.insert(6, true);
    let mut mpino_tx = MockLink::new();
    controller.tick(2000, &mut pins, &mut mpino_tx, &mut mpino_sink);
    deliver(&mut mpino_tx, &mut from_mpino);
    bridge.poll_serial(&mut from_mpino, &mut broker, &mut bridge_sink);

    assert_eq!(
        broker.published.last().map(|p| p.payload.clone()),
        Some(json!({"pattern":"current/fan","data":{"name":"fan","value":true}}))
    );
}
