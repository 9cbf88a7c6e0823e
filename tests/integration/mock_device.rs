//! Mock device and bus for integration tests.
//!
//! The device records every accessor call so tests can assert on the full
//! history without touching real motor state.

use std::collections::VecDeque;

use propwire::rpc::table::DEFAULT_CAPACITY;
use propwire::rpc::{Access, Accessors, CanBus, CanFrame, DispatchTable, Registry};
use propwire::BusConfig;

// ── Accessor call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    SetSetpoint(u32),
    SetBandwidth(f32),
    Calibrate,
    Move(f32, u8),
}

// ── MockDevice ────────────────────────────────────────────────

pub struct MockDevice {
    pub setpoint: u32,
    pub bandwidth: f32,
    pub vbus: f32,
    pub position: f32,
    pub calls: Vec<DeviceCall>,
}

#[allow(dead_code)]
impl MockDevice {
    pub fn new() -> Self {
        Self {
            setpoint: 0,
            bandwidth: 0.0,
            vbus: 24.0,
            position: 0.0,
            calls: Vec::new(),
        }
    }

    pub fn last_call(&self) -> Option<&DeviceCall> {
        self.calls.last()
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Endpoint ids of [`bind`].
pub mod ids {
    pub const SETPOINT: u16 = 1;
    pub const BANDWIDTH: u16 = 2;
    pub const VBUS: u16 = 3;
    pub const CALIBRATE: u16 = 4;
    pub const MOVE_TO: u16 = 5;
    pub const POSITION: u16 = 6;
}

/// Bind the mock device:
///
/// | id | name                  | kind              |
/// |----|-----------------------|-------------------|
/// | 1  | controller.setpoint   | u32, write-only   |
/// | 2  | encoder.bandwidth     | f32, read-write   |
/// | 3  | system.vbus           | f32, read-only    |
/// | 4  | motor.calibrate()     | void              |
/// | 5  | motor.move_to(f32,u8) | -> bool           |
/// | 6  | encoder.position      | f32, read-only    |
pub fn bind(config: BusConfig) -> DispatchTable<MockDevice> {
    let mut reg = Registry::<MockDevice, DEFAULT_CAPACITY>::new(config).unwrap();
    reg.register(
        ids::SETPOINT,
        "controller.setpoint",
        Access::WriteOnly,
        4,
        Accessors::new().setter(|d: &mut MockDevice, v: u32| {
            d.calls.push(DeviceCall::SetSetpoint(v));
            d.setpoint = v;
        }),
    )
    .unwrap();
    reg.register(
        ids::BANDWIDTH,
        "encoder.bandwidth",
        Access::ReadWrite,
        4,
        Accessors::new()
            .getter(|d: &MockDevice| d.bandwidth)
            .setter(|d: &mut MockDevice, v: f32| {
                d.calls.push(DeviceCall::SetBandwidth(v));
                d.bandwidth = v;
            }),
    )
    .unwrap();
    reg.read_only("system.vbus", |d: &MockDevice| d.vbus).unwrap();
    {
        let mut motor = reg.scope("motor");
        motor
            .function("calibrate", |d: &mut MockDevice, (): ()| {
                d.calls.push(DeviceCall::Calibrate);
            })
            .unwrap();
        motor
            .function("move_to", |d: &mut MockDevice, (pos, speed): (f32, u8)| {
                d.calls.push(DeviceCall::Move(pos, speed));
                if speed == 0 {
                    return false;
                }
                d.position = pos;
                true
            })
            .unwrap();
    }
    reg.read_only("encoder.position", |d: &MockDevice| d.position)
        .unwrap();
    reg.seal().unwrap()
}

// ── MockBus ───────────────────────────────────────────────────

/// Records every transmitted frame; replays queued frames on receive.
#[derive(Default)]
pub struct MockBus {
    pub inbound: VecDeque<CanFrame>,
    pub sent: Vec<CanFrame>,
    /// Fail every transmit after this many frames.
    pub fail_after: Option<usize>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct BusOff;

impl CanBus for MockBus {
    type Error = BusOff;

    fn receive(&mut self) -> Result<Option<CanFrame>, BusOff> {
        Ok(self.inbound.pop_front())
    }

    fn transmit(&mut self, frame: &CanFrame) -> Result<(), BusOff> {
        if self.fail_after.is_some_and(|n| self.sent.len() >= n) {
            return Err(BusOff);
        }
        self.sent.push(frame.clone());
        Ok(())
    }
}
