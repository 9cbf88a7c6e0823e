//! Bus edge — CAN frames in, CAN frames out.
//!
//! The adapter owns nothing but addressing. Each arbitration id carries the
//! node address in its high bits and the endpoint id in its low
//! `endpoint_bits`:
//!
//! ```text
//!  10                  6 5                 0      (11-bit, default split)
//! ┌─────────────────────┬───────────────────┐
//! │       node_id       │    endpoint id    │
//! └─────────────────────┴───────────────────┘
//! ```
//!
//! Frames for other nodes, frames of the wrong id format, and frames whose
//! data exceeds `max_payload` are dropped without a response. A `Read`
//! outcome is answered with a data frame on the request's own arbitration
//! id; `Write` and `Error` outcomes are silent on the wire.
//!
//! Concrete implementations of [`CanBus`]:
//! - [`NullBus`] (nothing attached)
//! - [`super::channels::QueueBus`] (frames exchanged over `embassy-sync` channels)

use log::{debug, trace};

use super::descriptor::EndpointId;
use super::handler::{Outcome, Request};
use super::table::DispatchTable;
use crate::config::{BusConfig, MAX_PAYLOAD_CAPACITY};
use crate::error::Result;

/// Data field of one frame.
pub type FrameData = heapless::Vec<u8, MAX_PAYLOAD_CAPACITY>;

/// One CAN (or CAN FD) frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    /// Arbitration id (11 or 29 significant bits).
    pub id: u32,
    /// 29-bit extended id format.
    pub extended: bool,
    /// Remote transmission request.
    pub rtr: bool,
    pub data: FrameData,
}

impl CanFrame {
    /// Remote frame with no data.
    pub fn remote(id: u32, extended: bool) -> Self {
        Self {
            id,
            extended,
            rtr: true,
            data: FrameData::new(),
        }
    }

    /// Data frame. Returns `None` if `data` exceeds the frame capacity.
    pub fn data(id: u32, extended: bool, data: &[u8]) -> Option<Self> {
        Some(Self {
            id,
            extended,
            rtr: false,
            data: FrameData::from_slice(data).ok()?,
        })
    }
}

/// Frame-oriented bus driver.
pub trait CanBus {
    /// Error type for this bus.
    type Error: core::fmt::Debug;

    /// Take the next pending frame, or `None` when nothing is waiting.
    /// Never blocks.
    fn receive(&mut self) -> core::result::Result<Option<CanFrame>, Self::Error>;

    /// Queue `frame` for transmission.
    fn transmit(&mut self, frame: &CanFrame) -> core::result::Result<(), Self::Error>;
}

/// A bus that never receives and discards every transmission.
pub struct NullBus;

impl CanBus for NullBus {
    type Error = ();

    fn receive(&mut self) -> core::result::Result<Option<CanFrame>, ()> {
        Ok(None)
    }

    fn transmit(&mut self, _frame: &CanFrame) -> core::result::Result<(), ()> {
        Ok(())
    }
}

/// Maps frames to requests and outcomes back to frames for one node.
#[derive(Debug, Clone)]
pub struct BusAdapter {
    config: BusConfig,
}

impl BusAdapter {
    pub fn new(config: BusConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Arbitration id addressing `endpoint` on this node.
    pub fn arbitration_id(&self, endpoint: EndpointId) -> u32 {
        (u32::from(self.config.node_id) << self.config.endpoint_bits)
            | (u32::from(endpoint) & self.config.max_endpoint_id())
    }

    /// Split an arbitration id into `(node_id, endpoint id)`. `None` if the
    /// node field does not fit a node address.
    pub fn split_id(&self, id: u32) -> Option<(u8, EndpointId)> {
        let bits = self.config.endpoint_bits;
        let node = u8::try_from(id >> bits).ok()?;
        let endpoint = EndpointId::try_from(id & self.config.max_endpoint_id()).ok()?;
        Some((node, endpoint))
    }

    /// Turn a frame addressed to this node into a request.
    pub fn decode<'f>(&self, frame: &'f CanFrame) -> Option<Request<'f>> {
        if frame.extended != self.config.extended_ids {
            trace!("RPC: dropping frame 0x{:x}: id format mismatch", frame.id);
            return None;
        }
        if frame.id >> self.config.id_bits() != 0 {
            trace!("RPC: dropping frame 0x{:x}: id too wide", frame.id);
            return None;
        }
        let (node, endpoint) = self.split_id(frame.id)?;
        if node != self.config.node_id {
            return None;
        }
        if frame.data.len() > self.config.max_payload {
            debug!(
                "RPC[{}]: dropping {} B frame (max {})",
                endpoint,
                frame.data.len(),
                self.config.max_payload
            );
            return None;
        }
        Some(Request {
            id: endpoint,
            rtr: frame.rtr,
            payload: &frame.data,
        })
    }

    /// Response frame for `outcome`, if any is owed.
    pub fn encode(&self, endpoint: EndpointId, outcome: &Outcome) -> Option<CanFrame> {
        match outcome {
            Outcome::Read(payload) => CanFrame::data(
                self.arbitration_id(endpoint),
                self.config.extended_ids,
                payload,
            ),
            Outcome::Write | Outcome::Error(_) => None,
        }
    }

    /// Handle one frame end to end. Returns the response frame, if any.
    pub fn dispatch<C, const N: usize>(
        &self,
        table: &DispatchTable<C, N>,
        ctx: &mut C,
        frame: &CanFrame,
    ) -> Option<CanFrame> {
        let req = self.decode(frame)?;
        let outcome = table.handle(ctx, &req);
        self.encode(req.id, &outcome)
    }

    /// Drain every pending frame from `bus`, answering as needed.
    /// Returns the number of frames received.
    pub fn poll<B: CanBus, C, const N: usize>(
        &self,
        bus: &mut B,
        table: &DispatchTable<C, N>,
        ctx: &mut C,
    ) -> core::result::Result<usize, B::Error> {
        let mut received = 0;
        while let Some(frame) = bus.receive()? {
            received += 1;
            if let Some(response) = self.dispatch(table, ctx, &frame) {
                bus.transmit(&response)?;
            }
        }
        Ok(received)
    }
}
