//! Fuzz target: `BusAdapter::decode`
//!
//! Builds arbitrary frames (id, format, RTR, up to 64 data bytes) and
//! asserts that decoding never panics and that accepted frames are
//! addressed to this node and fit the configured payload size.
//!
//! cargo fuzz run fuzz_frame_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use propwire::BusConfig;
use propwire::rpc::{BusAdapter, CanFrame};

fuzz_target!(|data: &[u8]| {
    if data.len() < 5 {
        return;
    }
    let id = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let flags = data[4];
    let body = &data[5..data.len().min(5 + 64)];

    let adapter = BusAdapter::new(BusConfig::default()).expect("valid config");
    let Some(frame) = CanFrame::data(id, flags & 1 != 0, body) else {
        return;
    };
    let frame = CanFrame {
        rtr: flags & 2 != 0,
        ..frame
    };

    if let Some(req) = adapter.decode(&frame) {
        assert_eq!(adapter.arbitration_id(req.id), frame.id);
        assert!(req.payload.len() <= adapter.config().max_payload);
    }
});
