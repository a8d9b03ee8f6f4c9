//! Fuzz target: `LineAssembler::feed`
//!
//! Drives arbitrary byte sequences into the line assembler and asserts
//! that it never panics, never yields an empty or oversized frame, and
//! accepts bytes cleanly again after a reset.
//!
//! cargo fuzz run fuzz_line_assembler

#![no_main]

use libfuzzer_sys::fuzz_target;
use plantpoint::protocol::codec::{LineAssembler, LINE_CAPACITY};

fuzz_target!(|data: &[u8]| {
    let mut asm = LineAssembler::<LINE_CAPACITY>::new();

    asm.feed(data, |frame| {
        assert!(!frame.is_empty(), "assembler must not yield empty frames");
        assert!(frame.len() <= LINE_CAPACITY, "frame exceeds LINE_CAPACITY");
        assert!(
            !frame.contains(&b'\n') && !frame.contains(&b'\r'),
            "terminator leaked into frame"
        );
    });

    asm.reset();
    assert_eq!(asm.pending(), 0);
    asm.feed(data, |_| {});
});
