//! Integration tests for the controller pipeline:
//! serial bytes → LineAssembler → dispatch → registry / pins → reply line.

use serde_json::{json, Value};

use plantpoint::app::events::AppEvent;
use plantpoint::app::service::Controller;
use plantpoint::config::{CapacityPolicy, ControllerConfig};
use plantpoint::error::ProtocolError;

use crate::mock_hw::{MockLink, MockPins, PinCall, RecordingSink};

const INTERVAL: u32 = 2000;

struct Rig {
    controller: Controller,
    link: MockLink,
    pins: MockPins,
    sink: RecordingSink,
}

impl Rig {
    fn with_policy(policy: CapacityPolicy) -> Self {
        let config = ControllerConfig {
            telemetry_interval_ms: INTERVAL,
            capacity_policy: policy,
            ..ControllerConfig::default()
        };
        Self {
            controller: Controller::new(&config, 0),
            link: MockLink::new(),
            pins: MockPins::new(),
            sink: RecordingSink::new(),
        }
    }

    fn new() -> Self {
        Self::with_policy(CapacityPolicy::Truncate)
    }

    /// Send one line and return the single reply.
    fn send(&mut self, line: &str) -> Value {
        self.link.inject_line(line);
        let handled = self
            .controller
            .poll(&mut self.link, &mut self.pins, &mut self.sink);
        assert_eq!(handled, 1, "exactly one frame for {line}");
        let mut replies = self.link.take_json();
        assert_eq!(replies.len(), 1, "exactly one reply for {line}");
        replies.remove(0)
    }

    fn tick(&mut self, now_ms: u32) -> Vec<Value> {
        self.controller
            .tick(now_ms, &mut self.pins, &mut self.link, &mut self.sink);
        self.link.take_json()
    }

    fn configure_fan_and_soil(&mut self) {
        let reply = self.send(
            r#"{"cmd":"config","devices":[{"name":"fan","relay":5,"sensor":6},{"name":"soil","type":"sensor","sensor":7}]}"#,
        );
        assert_eq!(reply, json!({"status":"ok","count":2}));
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_announces_init_complete() {
    let mut rig = Rig::new();
    rig.controller.start(&mut rig.link, &mut rig.sink);
    assert_eq!(
        rig.link.take_json(),
        vec![json!({"cmd":"init_complete","status":"ready"})]
    );
    assert_eq!(rig.sink.last(), Some(&AppEvent::Started));
}

// ── Bulk configuration ────────────────────────────────────────

#[test]
fn overlong_names_are_refused_not_truncated() {
    let mut rig = Rig::new();
    let long = "greenhouse_north_irrigation_pump_1";

    let reply = rig.send(&format!(
        r#"{{"cmd":"config","devices":[{{"name":"{long}","relay":4,"sensor":5}},{{"name":"greenhouse_north_irrigation_pump_2","relay":6}},{{"name":"fan","relay":7}}]}}"#
    ));
    assert_eq!(reply, json!({"status":"ok","count":1,"dropped":2}));
    assert_eq!(
        rig.sink.last(),
        Some(&AppEvent::Configured {
            applied: 1,
            dropped: 0,
            duplicates: 0,
            rejected: 2,
        })
    );

    let reply = rig.send(&format!(
        r#"{{"cmd":"config_device","index":1,"name":"{long}","relay":4,"current":5}}"#
    ));
    assert_eq!(
        reply,
        json!({"status":"error","message":format!("name too long (max 32 bytes): {long}")})
    );

    // Nothing under a cut-down name answers either.
    let reply = rig.send(&format!(r#"{{"cmd":"switch","dev":"{}","val":true}}"#, &long[..32]));
    assert_eq!(
        reply,
        json!({"status":"error","message":format!("unknown device: {}", &long[..32])})
    );
    assert!(rig.pins.writes().is_empty());
}

#[test]
fn bulk_config_sets_up_pins() {
    let mut rig = Rig::new();
    rig.configure_fan_and_soil();

    assert_eq!(
        rig.pins.calls,
        vec![
            PinCall::Output { pin: 5, high: false },
            PinCall::Input { pin: 6, pull_up: true },
            PinCall::Input { pin: 7, pull_up: false },
        ]
    );
    let registry = rig.controller.registry();
    assert_eq!(registry.len(), 2);
    assert!(registry.find("fan").unwrap().is_machine());
    assert!(!registry.find("soil").unwrap().is_machine());
}

#[test]
fn bulk_config_replaces_previous_table() {
    let mut rig = Rig::new();
    rig.configure_fan_and_soil();
    let reply = rig.send(r#"{"cmd":"config","devices":[{"name":"light","relay":9}]}"#);
    assert_eq!(reply["count"], 1);
    assert!(rig.controller.registry().find("fan").is_none());
    assert!(rig.controller.registry().find("light").is_some());
}

fn twelve_devices() -> String {
    let devices: Vec<Value> = (0..12)
        .map(|i| json!({"name": format!("d{i}"), "relay": i + 1}))
        .collect();
    json!({"cmd":"config","devices":devices}).to_string()
}

#[test]
fn overflow_truncates_under_default_policy() {
    let mut rig = Rig::new();
    let reply = rig.send(&twelve_devices());
    assert_eq!(reply, json!({"status":"ok","count":10,"dropped":2}));
    assert_eq!(rig.controller.registry().len(), 10);
    assert!(rig.controller.registry().find("d10").is_none());
}

#[test]
fn overflow_is_an_error_under_reject_policy() {
    let mut rig = Rig::with_policy(CapacityPolicy::Reject);
    let reply = rig.send(&twelve_devices());
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["message"], "too many devices (max 10)");
    // What fit stays applied.
    assert_eq!(rig.controller.registry().len(), 10);
    assert_eq!(
        rig.sink.last(),
        Some(&AppEvent::Rejected(ProtocolError::TooManyDevices))
    );
}

#[test]
fn config_without_devices_is_rejected() {
    let mut rig = Rig::new();
    let reply = rig.send(r#"{"cmd":"config"}"#);
    assert_eq!(reply, json!({"status":"error","message":"missing devices array"}));
}

// ── Streamed configuration ────────────────────────────────────

#[test]
fn streamed_config_builds_registry_slot_by_slot() {
    let mut rig = Rig::new();
    rig.configure_fan_and_soil();

    let reply = rig.send(r#"{"cmd":"config_start"}"#);
    assert_eq!(reply, json!({"status":"ok","message":"config_started"}));
    assert!(rig.controller.registry().is_empty());

    let reply = rig.send(r#"{"cmd":"config_device","index":0,"name":"pump","relay":3,"current":4}"#);
    assert_eq!(reply, json!({"status":"ok","device":"pump","index":0}));
    let reply = rig.send(r#"{"cmd":"config_device","index":2,"name":"lamp","relay":8}"#);
    assert_eq!(reply["index"], 2);

    let reply = rig.send(r#"{"cmd":"config_end"}"#);
    assert_eq!(reply, json!({"status":"ok","count":3}));

    let registry = rig.controller.registry();
    assert_eq!(registry.find("pump").unwrap().sense(), Some(4));
    assert_eq!(registry.get(1).unwrap().name(), "");
}

#[test]
fn config_device_rejects_bad_indices() {
    let mut rig = Rig::new();
    for index in ["-1", "10", "99"] {
        let frame = format!(r#"{{"cmd":"config_device","index":{index},"name":"x","relay":2}}"#);
        let reply = rig.send(&frame);
        assert_eq!(
            reply,
            json!({"status":"error","message":"index out of range"}),
            "index {index}"
        );
    }
    assert!(rig.controller.registry().is_empty());
}

#[test]
fn config_device_rejects_duplicate_name_in_other_slot() {
    let mut rig = Rig::new();
    rig.send(r#"{"cmd":"config_device","index":0,"name":"fan","relay":2}"#);
    let reply = rig.send(r#"{"cmd":"config_device","index":1,"name":"fan","relay":3}"#);
    assert_eq!(reply["status"], "error");
    // Rewriting the same slot is fine.
    let reply = rig.send(r#"{"cmd":"config_device","index":0,"name":"fan","relay":4}"#);
    assert_eq!(reply["status"], "ok");
    assert_eq!(rig.controller.registry().find("fan").unwrap().relay(), Some(4));
}

// ── Switching ─────────────────────────────────────────────────

#[test]
fn switch_drives_the_relay() {
    let mut rig = Rig::new();
    rig.configure_fan_and_soil();

    let reply = rig.send(r#"{"cmd":"switch","dev":"fan","val":true}"#);
    assert_eq!(reply, json!({"status":"ok","device":"fan","value":true}));
    assert_eq!(rig.pins.writes(), vec![(5, true)]);

    rig.send(r#"{"cmd":"switch","dev":"fan","val":false}"#);
    assert_eq!(rig.pins.writes(), vec![(5, true), (5, false)]);
}

#[test]
fn switch_unknown_device_touches_nothing() {
    let mut rig = Rig::new();
    rig.configure_fan_and_soil();
    let reply = rig.send(r#"{"cmd":"switch","dev":"Fan","val":true}"#);
    assert_eq!(reply, json!({"status":"error","message":"unknown device: Fan"}));
    assert!(rig.pins.writes().is_empty());
}

#[test]
fn switch_on_sensor_is_refused() {
    let mut rig = Rig::new();
    rig.configure_fan_and_soil();
    let reply = rig.send(r#"{"cmd":"switch","dev":"soil","val":true}"#);
    assert_eq!(reply, json!({"status":"error","message":"not a machine: soil"}));
    assert!(rig.pins.writes().is_empty());
}

// ── Malformed input ───────────────────────────────────────────

#[test]
fn malformed_frames_get_error_replies() {
    let mut rig = Rig::new();
    rig.configure_fan_and_soil();

    assert_eq!(
        rig.send("hello"),
        json!({"status":"error","message":"unsupported format"})
    );
    assert_eq!(
        rig.send(r#"{"val":true}"#),
        json!({"status":"error","message":"missing cmd"})
    );
    assert_eq!(
        rig.send(r#"{"cmd":"reboot"}"#),
        json!({"status":"error","message":"unknown command: reboot"})
    );
    let reply = rig.send(r#"{"cmd":"switch","dev":"fan""#);
    assert!(reply["message"].as_str().unwrap().starts_with("parse error"));

    // Registry untouched by all of the above.
    assert_eq!(rig.controller.registry().len(), 2);
    assert!(rig.pins.writes().is_empty());
}

#[test]
fn blank_lines_are_ignored() {
    let mut rig = Rig::new();
    rig.link.inject(b"\r\n\n\r");
    let handled = rig.controller.poll(&mut rig.link, &mut rig.pins, &mut rig.sink);
    assert_eq!(handled, 0);
    assert!(rig.link.tx.is_empty());
}

#[test]
fn frames_split_across_reads_are_reassembled() {
    let mut rig = Rig::new();
    rig.configure_fan_and_soil();
    rig.link.chunk = 3;
    rig.link
        .inject(b"{\"cmd\":\"switch\",\"dev\":\"fan\",\"val\":true}\r\n{\"cmd\":\"config_end\"}\n");
    let handled = rig.controller.poll(&mut rig.link, &mut rig.pins, &mut rig.sink);
    assert_eq!(handled, 2);
    let replies = rig.link.take_json();
    assert_eq!(replies[0]["value"], true);
    assert_eq!(replies[1]["count"], 2);
    assert_eq!(rig.controller.frames_handled(), 3);
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_reports_only_changes() {
    let mut rig = Rig::new();
    rig.configure_fan_and_soil();
    rig.pins.digital.insert(6, true);
    rig.pins.analog.insert(7, 812);

    assert!(rig.tick(INTERVAL - 1).is_empty(), "interval not elapsed");

    let first = rig.tick(INTERVAL);
    assert_eq!(
        first,
        vec![
            json!({"cmd":"current","dev":"fan","val":true}),
            json!({"cmd":"current","dev":"soil","val":812}),
        ]
    );
    assert_eq!(rig.sink.last(), Some(&AppEvent::TelemetrySent { count: 2 }));

    assert!(rig.tick(2 * INTERVAL).is_empty(), "nothing changed");

    rig.pins.analog.insert(7, 790);
    assert_eq!(
        rig.tick(3 * INTERVAL),
        vec![json!({"cmd":"current","dev":"soil","val":790})]
    );
}

#[test]
fn failed_telemetry_is_resent_next_scan() {
    let mut rig = Rig::new();
    rig.configure_fan_and_soil();
    rig.pins.digital.insert(6, true);

    rig.link.fail_writes = true;
    assert!(rig.tick(INTERVAL).is_empty());

    rig.link.fail_writes = false;
    let frames = rig.tick(2 * INTERVAL);
    assert!(frames.contains(&json!({"cmd":"current","dev":"fan","val":true})));
}

#[test]
fn reconfiguring_forgets_reported_values() {
    let mut rig = Rig::new();
    rig.configure_fan_and_soil();
    rig.pins.digital.insert(6, true);
    assert_eq!(rig.tick(INTERVAL).len(), 2);

    rig.configure_fan_and_soil();
    assert_eq!(rig.tick(2 * INTERVAL).len(), 2, "fresh registry reports again");
}
