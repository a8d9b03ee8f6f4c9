//! Integration tests for the pump-control variant: text commands on the
//! link, relay state, flow windows and volume reset.

use plantpoint::app::events::AppEvent;
use plantpoint::config::FlowConfig;
use plantpoint::pump::PumpController;
use plantpoint::sensors::flow::{EdgeCounter, PolledEdgeDetector};

use crate::mock_hw::{MockLink, MockRelayPin, RecordingSink};

fn pulses(counter: &EdgeCounter, n: u32) {
    for _ in 0..n {
        counter.record_edge();
    }
}

#[test]
fn relay_starts_released() {
    let mut pin = MockRelayPin::default();
    let counter = EdgeCounter::new();
    let pump = PumpController::new(&mut pin, &counter, &FlowConfig::default(), 0);
    assert!(!pump.is_pump_on());
    drop(pump);
    assert!(!pin.high);
}

#[test]
fn on_off_commands_switch_the_relay() {
    let mut pin = MockRelayPin::default();
    let counter = EdgeCounter::new();
    let mut link = MockLink::new();
    let mut sink = RecordingSink::new();
    let mut pump = PumpController::new(&mut pin, &counter, &FlowConfig::default(), 0);

    link.inject(b"on\r\n");
    pump.poll(&mut link, &mut sink);
    assert!(pump.is_pump_on());

    link.inject(b"  OFF \n");
    pump.poll(&mut link, &mut sink);
    assert!(!pump.is_pump_on());

    assert_eq!(
        sink.events,
        vec![AppEvent::PumpSwitched(true), AppEvent::PumpSwitched(false)]
    );
    // No replies on the text protocol.
    assert!(link.tx.is_empty());
}

#[test]
fn long_command_burst_is_handled_in_order() {
    let mut pin = MockRelayPin::default();
    let counter = EdgeCounter::new();
    let mut link = MockLink::new();
    let mut sink = RecordingSink::new();
    let mut pump = PumpController::new(&mut pin, &counter, &FlowConfig::default(), 0);

    let mut burst = b"ON\n".repeat(12);
    burst.extend_from_slice(b"OFF\n");
    link.inject(&burst);
    pump.poll(&mut link, &mut sink);

    assert!(!pump.is_pump_on());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::PumpSwitched(true))), 12);
    assert_eq!(sink.last(), Some(&AppEvent::PumpSwitched(false)));
}

#[test]
fn unknown_words_are_ignored() {
    let mut pin = MockRelayPin::default();
    let counter = EdgeCounter::new();
    let mut link = MockLink::new();
    let mut sink = RecordingSink::new();
    let mut pump = PumpController::new(&mut pin, &counter, &FlowConfig::default(), 0);

    link.inject(b"START\n{\"cmd\":\"switch\"}\nONN\n");
    pump.poll(&mut link, &mut sink);
    assert!(!pump.is_pump_on());
    assert!(sink.events.is_empty());
}

#[test]
fn flow_window_reports_rate_and_volume() {
    let mut pin = MockRelayPin::default();
    let counter = EdgeCounter::new();
    let mut sink = RecordingSink::new();
    let config = FlowConfig::default();
    let mut pump = PumpController::new(&mut pin, &counter, &config, 0);

    // 86 Hz for one second = 1 L/min at the default K.
    pulses(&counter, 86);
    assert!(pump.tick(500, &mut sink).is_none());
    let reading = pump.tick(1000, &mut sink).expect("window closed");
    assert_eq!(reading.pulses, 86);
    assert_eq!(reading.elapsed_ms, 1000);
    assert!((reading.flow_lpm - 1.0).abs() < 1e-4);
    assert!((reading.total_litres - 86.0 / 5160.0).abs() < 1e-6);
    assert_eq!(sink.last(), Some(&AppEvent::FlowWindow(reading)));

    // Idle window: rate drops to zero, volume holds.
    let idle = pump.tick(2000, &mut sink).expect("window closed");
    assert_eq!(idle.pulses, 0);
    assert_eq!(idle.flow_lpm, 0.0);
    assert_eq!(idle.total_litres, reading.total_litres);
}

#[test]
fn reset_zeroes_volume_but_keeps_relay() {
    let mut pin = MockRelayPin::default();
    let counter = EdgeCounter::new();
    let mut link = MockLink::new();
    let mut sink = RecordingSink::new();
    let mut pump = PumpController::new(&mut pin, &counter, &FlowConfig::default(), 0);

    link.inject(b"ON\n");
    pump.poll(&mut link, &mut sink);
    pulses(&counter, 5160);
    pump.tick(1000, &mut sink);
    assert!((pump.total_litres() - 1.0).abs() < 1e-4);

    pulses(&counter, 100);
    link.inject(b"reset\n");
    pump.poll(&mut link, &mut sink);
    assert_eq!(pump.total_litres(), 0.0);
    assert!(pump.is_pump_on());
    assert_eq!(sink.last(), Some(&AppEvent::VolumeReset));

    // In-flight edges were discarded with the total.
    let next = pump.tick(2000, &mut sink).expect("window closed");
    assert_eq!(next.pulses, 0);
}

#[test]
fn polled_detector_feeds_the_meter() {
    let mut pin = MockRelayPin::default();
    let counter = EdgeCounter::new();
    let mut sink = RecordingSink::new();
    let mut pump = PumpController::new(&mut pin, &counter, &FlowConfig::default(), 0);
    let mut detector = PolledEdgeDetector::new(false);

    for _ in 0..43 {
        detector.sample(true, &counter);
        detector.sample(false, &counter);
    }
    let reading = pump.tick(1000, &mut sink).expect("window closed");
    assert_eq!(reading.pulses, 43);
    assert!((reading.flow_lpm - 0.5).abs() < 1e-4);
}
