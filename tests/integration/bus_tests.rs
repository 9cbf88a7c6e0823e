//! Frames in, frames out: the bus adapter driving the mock binding.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use propwire::BusConfig;
use propwire::rpc::channels::{QueueBus, RX_DEPTH, TX_DEPTH};
use propwire::rpc::{BusAdapter, CanFrame};

use crate::mock_device::{BusOff, DeviceCall, MockBus, MockDevice, bind, ids};

static RX: Channel<CriticalSectionRawMutex, CanFrame, RX_DEPTH> = Channel::new();
static TX: Channel<CriticalSectionRawMutex, CanFrame, TX_DEPTH> = Channel::new();

fn data(adapter: &BusAdapter, endpoint: u16, bytes: &[u8]) -> CanFrame {
    let c = adapter.config();
    CanFrame::data(adapter.arbitration_id(endpoint), c.extended_ids, bytes).unwrap()
}

fn remote(adapter: &BusAdapter, endpoint: u16) -> CanFrame {
    CanFrame::remote(adapter.arbitration_id(endpoint), adapter.config().extended_ids)
}

#[test]
fn write_read_sequence_over_bus() {
    let config = BusConfig::default();
    let adapter = BusAdapter::new(config.clone()).unwrap();
    let table = bind(config);
    let mut dev = MockDevice::new();
    let mut bus = MockBus::default();

    bus.inbound
        .push_back(data(&adapter, ids::BANDWIDTH, &12.5f32.to_ne_bytes()));
    bus.inbound.push_back(remote(&adapter, ids::BANDWIDTH));
    bus.inbound.push_back(remote(&adapter, ids::SETPOINT));
    bus.inbound.push_back(remote(&adapter, 40));

    assert_eq!(adapter.poll(&mut bus, &table, &mut dev), Ok(4));
    assert_eq!(dev.calls, vec![DeviceCall::SetBandwidth(12.5)]);

    // Only the successful read is answered.
    assert_eq!(bus.sent.len(), 1);
    let resp = &bus.sent[0];
    assert_eq!(resp.id, adapter.arbitration_id(ids::BANDWIDTH));
    assert!(!resp.rtr);
    assert_eq!(resp.data.as_slice(), &12.5f32.to_ne_bytes());
}

#[test]
fn other_nodes_traffic_is_ignored() {
    let config = BusConfig::default();
    let adapter = BusAdapter::new(config.clone()).unwrap();
    let other = BusAdapter::new(BusConfig {
        node_id: 2,
        ..config.clone()
    })
    .unwrap();
    let table = bind(config);
    let mut dev = MockDevice::new();
    let mut bus = MockBus::default();

    bus.inbound.push_back(remote(&other, ids::VBUS));
    bus.inbound
        .push_back(data(&other, ids::SETPOINT, &7u32.to_ne_bytes()));

    assert_eq!(adapter.poll(&mut bus, &table, &mut dev), Ok(2));
    assert!(bus.sent.is_empty());
    assert!(dev.calls.is_empty());
}

#[test]
fn extended_ids_carry_wider_endpoint_field() {
    let config = BusConfig {
        node_id: 0x42,
        extended_ids: true,
        endpoint_bits: 12,
        max_payload: 64,
        first_endpoint_id: 1,
    };
    let adapter = BusAdapter::new(config.clone()).unwrap();
    let table = bind(config);
    let mut dev = MockDevice::new();

    let resp = adapter
        .dispatch(&table, &mut dev, &remote(&adapter, ids::VBUS))
        .unwrap();
    assert!(resp.extended);
    assert_eq!(resp.id, (0x42 << 12) | u32::from(ids::VBUS));
    assert_eq!(resp.data.as_slice(), &24.0f32.to_ne_bytes());
}

#[test]
fn transmit_failure_stops_poll() {
    let config = BusConfig::default();
    let adapter = BusAdapter::new(config.clone()).unwrap();
    let table = bind(config);
    let mut dev = MockDevice::new();
    let mut bus = MockBus {
        fail_after: Some(0),
        ..MockBus::default()
    };
    bus.inbound.push_back(remote(&adapter, ids::VBUS));
    bus.inbound.push_back(remote(&adapter, ids::VBUS));

    assert_eq!(adapter.poll(&mut bus, &table, &mut dev), Err(BusOff));
    assert_eq!(bus.inbound.len(), 1);
}

#[test]
fn static_channels_bridge_driver_and_loop() {
    let config = BusConfig::default();
    let adapter = BusAdapter::new(config.clone()).unwrap();
    let table = bind(config);
    let mut dev = MockDevice::new();

    // Driver side: push what arrived on the wire.
    RX.try_send(data(&adapter, ids::SETPOINT, &500u32.to_ne_bytes()))
        .unwrap();
    RX.try_send(remote(&adapter, ids::CALIBRATE)).unwrap();
    RX.try_send(remote(&adapter, ids::VBUS)).unwrap();

    let mut bus = QueueBus::new(&RX, &TX);
    assert_eq!(adapter.poll(&mut bus, &table, &mut dev), Ok(3));

    assert_eq!(dev.setpoint, 500);
    assert_eq!(dev.last_call(), Some(&DeviceCall::Calibrate));

    let resp = TX.try_receive().unwrap();
    assert_eq!(resp.data.as_slice(), &24.0f32.to_ne_bytes());
    assert!(TX.try_receive().is_err());
}
