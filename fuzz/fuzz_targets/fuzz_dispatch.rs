//! Fuzz target: `dispatch`
//!
//! Feeds arbitrary frames through decode and execution against a
//! registry.  Every frame must get exactly one reply, the registry must
//! stay within capacity, and error replies must carry a message.
//!
//! cargo fuzz run fuzz_dispatch

#![no_main]

use libfuzzer_sys::fuzz_target;
use plantpoint::app::ports::PinPort;
use plantpoint::config::CapacityPolicy;
use plantpoint::protocol::dispatch;
use plantpoint::registry::{Pin, Registry, MAX_DEVICES};

struct NoPins;

impl PinPort for NoPins {
    fn configure_output(&mut self, _pin: Pin, _high: bool) {}
    fn configure_input(&mut self, _pin: Pin, _pull_up: bool) {}
    fn write(&mut self, _pin: Pin, _high: bool) {}
    fn read_digital(&mut self, _pin: Pin) -> bool {
        false
    }
    fn read_analog(&mut self, _pin: Pin) -> u16 {
        0
    }
}

fuzz_target!(|data: &[u8]| {
    let mut registry = Registry::new();
    let policy = if data.first().is_some_and(|b| b & 1 == 1) {
        CapacityPolicy::Reject
    } else {
        CapacityPolicy::Truncate
    };

    let done = dispatch(data, &mut registry, &mut NoPins, policy);

    assert!(registry.len() <= MAX_DEVICES);
    if !done.reply.is_ok() {
        assert!(done.reply.message.is_some(), "error reply without message");
    }
    let _ = serde_json::to_vec(&done.reply).expect("reply always encodes");
});
