//! Propwire loopback — host entry point.
//!
//! Builds a small motor-controller binding, seals it, prints its
//! description and protocol hash, then pushes a scripted set of frames
//! through a channel-backed bus and prints every response.
//!
//! ```text
//!  script ──▶ rx channel ──▶ BusAdapter::poll ──▶ tx channel ──▶ stdout
//! ```
//!
//! Usage: `propwire-loopback [config.json]`

#![deny(unused_must_use)]

use anyhow::{Context, Result};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use log::info;

use propwire::BusConfig;
use propwire::rpc::channels::{QueueBus, RX_DEPTH, TX_DEPTH};
use propwire::rpc::{Access, Accessors, BusAdapter, CanFrame, DispatchTable, Registry};

// ── Device model ──────────────────────────────────────────────

#[derive(Debug)]
struct Motor {
    state: u8,
    resistance: f32,
    inductance: f32,
    calibrated: bool,
}

#[derive(Debug)]
struct Encoder {
    pos_estimate: f32,
    bandwidth: f32,
}

#[derive(Debug)]
struct Device {
    serial_number: u32,
    vbus: f32,
    errors: u8,
    motor: Motor,
    encoder: Encoder,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            serial_number: 0x00C0_FFEE,
            vbus: 24.0,
            errors: 0,
            motor: Motor {
                state: 0,
                resistance: 0.0,
                inductance: 0.0,
                calibrated: false,
            },
            encoder: Encoder {
                pos_estimate: 0.0,
                bandwidth: 1500.0,
            },
        }
    }
}

fn bind(config: BusConfig) -> Result<DispatchTable<Device>> {
    let mut reg = Registry::new(config)?;

    {
        let mut system = reg.scope("system");
        system.read_only("sn", |d: &Device| d.serial_number)?;
        let vbus = system.read_only("vbus", |d: &Device| d.vbus)?;
        system.annotate(vbus, "Bus voltage", Some("V"))?;
        system.bitmask(
            "errors",
            Access::ReadOnly,
            &["overcurrent", "undervoltage", "overtemp"],
            Accessors::new().getter(|d: &Device| d.errors),
        )?;
    }
    {
        let mut motor = reg.scope("motor");
        motor.enumeration(
            "state",
            Access::ReadWrite,
            &["idle", "calibrating", "closed_loop"],
            Accessors::new()
                .getter(|d: &Device| d.motor.state)
                .setter(|d: &mut Device, v: u8| d.motor.state = v),
        )?;
        let r = motor.read_write(
            "R",
            |d: &Device| d.motor.resistance,
            |d: &mut Device, v| d.motor.resistance = v,
        )?;
        motor.annotate(r, "Phase resistance", Some("ohm"))?;
        let l = motor.read_write(
            "L",
            |d: &Device| d.motor.inductance,
            |d: &mut Device, v| d.motor.inductance = v,
        )?;
        motor.annotate(l, "Phase inductance", Some("H"))?;
        motor.function("calibrate", |d: &mut Device, (): ()| {
            d.motor.resistance = 0.12;
            d.motor.inductance = 4.5e-5;
            d.motor.calibrated = true;
            d.motor.calibrated
        })?;
    }
    {
        let mut encoder = reg.scope("encoder");
        encoder.read_only("pos_estimate", |d: &Device| d.encoder.pos_estimate)?;
        encoder.read_write(
            "bandwidth",
            |d: &Device| d.encoder.bandwidth,
            |d: &mut Device, v| d.encoder.bandwidth = v,
        )?;
    }

    Ok(reg.seal()?)
}

fn load_config() -> Result<BusConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(BusConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let config: BusConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
    config.validate()?;
    info!("Config loaded from {}", path);
    Ok(config)
}

fn endpoint(table: &DispatchTable<Device>, name: &str) -> Result<u16> {
    table
        .resolve_name(name)
        .map(|d| d.id())
        .with_context(|| format!("no endpoint named {name}"))
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Propwire loopback v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Bind and seal ──────────────────────────────────────
    let config = load_config()?;
    let table = bind(config.clone())?;
    let adapter = BusAdapter::new(config)?;

    println!("{}", serde_json::to_string_pretty(&table.describe())?);
    println!("protocol hash: 0x{:08x}", table.protocol_hash());

    // ── 3. Scripted traffic ───────────────────────────────────
    let extended = adapter.config().extended_ids;
    let frame_for = |name: &str, data: Option<&[u8]>| -> Result<CanFrame> {
        let id = adapter.arbitration_id(endpoint(&table, name)?);
        match data {
            None => Ok(CanFrame::remote(id, extended)),
            Some(bytes) => CanFrame::data(id, extended, bytes).context("frame too large"),
        }
    };

    let script = [
        frame_for("system.sn", None)?,
        frame_for("system.vbus", None)?,
        frame_for("encoder.bandwidth", Some(&2500.0f32.to_ne_bytes()[..]))?,
        frame_for("encoder.bandwidth", None)?,
        frame_for("system.vbus", Some(&1.0f32.to_ne_bytes()[..]))?,
        frame_for("motor.state", Some(&[2u8][..]))?,
        frame_for("motor.calibrate", None)?,
        frame_for("motor.R", None)?,
        CanFrame::remote(adapter.arbitration_id(63), extended),
    ];

    let rx: Channel<NoopRawMutex, CanFrame, RX_DEPTH> = Channel::new();
    let tx: Channel<NoopRawMutex, CanFrame, TX_DEPTH> = Channel::new();
    for frame in script {
        rx.try_send(frame)
            .map_err(|_| anyhow::anyhow!("rx queue full"))?;
    }

    let mut device = Device::default();
    let mut bus = QueueBus::new(&rx, &tx);
    let handled = adapter
        .poll(&mut bus, &table, &mut device)
        .map_err(|e| anyhow::anyhow!("bus error: {e}"))?;
    info!("Handled {} frames", handled);

    // ── 4. Responses ──────────────────────────────────────────
    while let Ok(frame) = tx.try_receive() {
        let name = adapter
            .split_id(frame.id)
            .and_then(|(_, ep)| table.resolve(ep))
            .map_or("?", |d| d.name());
        println!("0x{:03x} {:<20} {:02x?}", frame.id, name, frame.data.as_slice());
    }
    println!("final state: {:?}", device);

    Ok(())
}
