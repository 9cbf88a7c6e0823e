//! Fuzz target: `DispatchTable::handle`
//!
//! First byte picks the endpoint id and the RTR flag; the rest is the
//! request payload. Asserts that the handler never panics, never answers
//! an error with bytes, and only answers reads with exactly the bound
//! value's width.
//!
//! cargo fuzz run fuzz_request_handler

#![no_main]

use libfuzzer_sys::fuzz_target;
use propwire::BusConfig;
use propwire::rpc::{DispatchTable, Outcome, Registry, Request};

#[derive(Default)]
struct Device {
    a: u8,
    b: i16,
    c: f32,
    d: f64,
    e: bool,
}

fn table() -> DispatchTable<Device> {
    let config = BusConfig {
        max_payload: 64,
        ..BusConfig::default()
    };
    let mut reg = Registry::new(config).expect("valid config");
    reg.read_write("a", |d: &Device| d.a, |d: &mut Device, v| d.a = v)
        .expect("a");
    reg.read_write("b", |d: &Device| d.b, |d: &mut Device, v| d.b = v)
        .expect("b");
    reg.read_only("c", |d: &Device| d.c).expect("c");
    reg.write_only("d", |d: &mut Device, v: f64| d.d = v)
        .expect("d");
    reg.read_write("e", |d: &Device| d.e, |d: &mut Device, v| d.e = v)
        .expect("e");
    reg.function("f", |d: &mut Device, (x, y, z): (u8, f32, u64)| {
        d.c = y;
        d.a = x;
        z
    })
    .expect("f");
    reg.function("g", |d: &mut Device, (): ()| d.e = !d.e)
        .expect("g");
    reg.seal().expect("seal")
}

fuzz_target!(|data: &[u8]| {
    let Some((&head, payload)) = data.split_first() else {
        return;
    };
    let table = table();
    let mut dev = Device::default();
    let req = Request {
        id: u16::from(head & 0x0f),
        rtr: head & 0x80 != 0,
        payload,
    };

    match table.handle(&mut dev, &req) {
        Outcome::Read(p) => {
            let d = table.resolve(req.id).expect("read from a bound id");
            assert_eq!(p.len(), d.response_size());
        }
        Outcome::Write => assert!(table.resolve(req.id).is_some()),
        Outcome::Error(_) => {}
    }
});
