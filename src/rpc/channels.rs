//! Channel-backed bus.
//!
//! Uses `embassy-sync` bounded channels to bridge the receive context
//! (an ISR or driver task that owns the CAN peripheral) with the loop
//! that owns the dispatch table. Neither side allocates.
//!
//! ```text
//! ┌──────────────┐  CanFrame (rx)  ┌──────────────┐
//! │  CAN driver  │───────────────▶│  BusAdapter   │
//! │  (ISR/task)  │◀───────────────│  poll loop    │
//! └──────────────┘  CanFrame (tx)  └──────────────┘
//! ```
//!
//! Channels are declared by the caller, as statics with
//! `CriticalSectionRawMutex` when the driver runs in interrupt context, or
//! as locals with `NoopRawMutex` when everything shares one thread.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

use super::bus::{CanBus, CanFrame};

/// Channel depth for received (inbound) frames.
pub const RX_DEPTH: usize = 16;

/// Channel depth for transmitted (outbound) frames.
pub const TX_DEPTH: usize = 16;

/// Transmit queue overflowed; the frame was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull;

impl core::fmt::Display for QueueFull {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("transmit queue full")
    }
}

/// [`CanBus`] over a pair of channels.
pub struct QueueBus<'a, M: RawMutex, const RX: usize = RX_DEPTH, const TX: usize = TX_DEPTH> {
    rx: &'a Channel<M, CanFrame, RX>,
    tx: &'a Channel<M, CanFrame, TX>,
}

impl<'a, M: RawMutex, const RX: usize, const TX: usize> QueueBus<'a, M, RX, TX> {
    pub fn new(rx: &'a Channel<M, CanFrame, RX>, tx: &'a Channel<M, CanFrame, TX>) -> Self {
        Self { rx, tx }
    }
}

impl<M: RawMutex, const RX: usize, const TX: usize> CanBus for QueueBus<'_, M, RX, TX> {
    type Error = QueueFull;

    fn receive(&mut self) -> Result<Option<CanFrame>, QueueFull> {
        Ok(self.rx.try_receive().ok())
    }

    fn transmit(&mut self, frame: &CanFrame) -> Result<(), QueueFull> {
        self.tx.try_send(frame.clone()).map_err(|_| QueueFull)
    }
}
