//! End-to-end request handling against the mock device binding.

use propwire::rpc::codec::WireValue;
use propwire::rpc::{Outcome, Request, Status};
use propwire::{BusConfig, ErrorKind};

use crate::mock_device::{DeviceCall, MockDevice, bind, ids};

fn encode<T: WireValue>(v: T) -> Vec<u8> {
    let mut buf = vec![0u8; T::SIZE];
    v.encode(&mut buf);
    buf
}

#[test]
fn float_write_then_read() {
    let table = bind(BusConfig::default());
    let mut dev = MockDevice::new();
    assert_eq!(dev.bandwidth, 0.0);

    let out = table.handle(&mut dev, &Request::write(ids::BANDWIDTH, &encode(12.5f32)));
    assert_eq!(out, Outcome::Write);
    assert_eq!(dev.bandwidth, 12.5);

    let out = table.handle(&mut dev, &Request::read(ids::BANDWIDTH));
    assert_eq!(out.status(), Status::Read);
    assert_eq!(out.payload(), encode(12.5f32).as_slice());
    assert_eq!(out.payload_len(), 4);
}

#[test]
fn unknown_id_is_reported() {
    let table = bind(BusConfig::default());
    let mut dev = MockDevice::new();
    let out = table.handle(&mut dev, &Request::read(999));
    assert_eq!(out, Outcome::Error(ErrorKind::UnknownProperty));
    assert!(dev.calls.is_empty());
}

#[test]
fn read_of_write_only_is_not_supported() {
    let table = bind(BusConfig::default());
    let mut dev = MockDevice::new();
    let out = table.handle(&mut dev, &Request::read(ids::SETPOINT));
    assert_eq!(out, Outcome::Error(ErrorKind::OperationNotSupported));
    assert_eq!(out.payload_len(), 0);
}

#[test]
fn short_write_never_reaches_setter() {
    let table = bind(BusConfig::default());
    let mut dev = MockDevice::new();
    let out = table.handle(&mut dev, &Request::write(ids::SETPOINT, &[1, 2, 3]));
    assert_eq!(out, Outcome::Error(ErrorKind::MalformedPayload));
    assert!(dev.calls.is_empty());
    assert_eq!(dev.setpoint, 0);
}

#[test]
fn write_of_read_only_leaves_value() {
    let table = bind(BusConfig::default());
    let mut dev = MockDevice::new();
    let out = table.handle(&mut dev, &Request::write(ids::VBUS, &encode(5.0f32)));
    assert_eq!(out, Outcome::Error(ErrorKind::OperationNotSupported));
    assert_eq!(dev.vbus, 24.0);
}

#[test]
fn rtr_wins_over_payload() {
    let table = bind(BusConfig::default());
    let mut dev = MockDevice::new();
    let req = Request {
        id: ids::BANDWIDTH,
        rtr: true,
        payload: &encode(1.0f32),
    };
    assert_eq!(
        table.handle(&mut dev, &req),
        Outcome::Error(ErrorKind::MalformedRequest)
    );
    assert!(dev.calls.is_empty());
}

#[test]
fn void_function_runs_on_rtr() {
    let table = bind(BusConfig::default());
    let mut dev = MockDevice::new();
    assert_eq!(table.handle(&mut dev, &Request::read(ids::CALIBRATE)), Outcome::Write);
    assert_eq!(dev.last_call(), Some(&DeviceCall::Calibrate));
}

#[test]
fn function_arguments_are_unpacked_in_order() {
    let table = bind(BusConfig::default());
    let mut dev = MockDevice::new();

    let mut args = encode(3.25f32);
    args.push(10);
    let out = table.handle(&mut dev, &Request::write(ids::MOVE_TO, &args));
    assert_eq!(out.payload(), &[1u8]);
    assert_eq!(dev.last_call(), Some(&DeviceCall::Move(3.25, 10)));

    let out = table.handle(&mut dev, &Request::read(ids::POSITION));
    assert_eq!(out.payload(), encode(3.25f32).as_slice());
}

#[test]
fn function_with_arguments_rejects_rtr() {
    let table = bind(BusConfig::default());
    let mut dev = MockDevice::new();
    assert_eq!(
        table.handle(&mut dev, &Request::read(ids::MOVE_TO)),
        Outcome::Error(ErrorKind::OperationNotSupported)
    );
    assert!(dev.calls.is_empty());
}

#[test]
fn function_with_wrong_argument_length_is_malformed() {
    let table = bind(BusConfig::default());
    let mut dev = MockDevice::new();
    assert_eq!(
        table.handle(&mut dev, &Request::write(ids::MOVE_TO, &encode(1.0f32))),
        Outcome::Error(ErrorKind::MalformedPayload)
    );
    assert!(dev.calls.is_empty());
}

#[test]
fn errors_map_to_distinct_codes() {
    let table = bind(BusConfig::default());
    let mut dev = MockDevice::new();
    let codes: Vec<u8> = [
        Request::read(999),
        Request::read(ids::SETPOINT),
        Request::write(ids::SETPOINT, &[0]),
        Request::write(ids::SETPOINT, &[]),
    ]
    .iter()
    .filter_map(|req| table.handle(&mut dev, req).error())
    .map(ErrorKind::code)
    .collect();
    assert_eq!(codes, vec![1, 2, 3, 4]);
}
