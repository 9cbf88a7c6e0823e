//! Remote property access over CAN.
//!
//! Device attributes and functions are bound once at startup to numeric
//! endpoint ids. Peers then read, write and call them with single frames.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        RPC Stack                             │
//! │                                                              │
//! │  ┌──────────┐   ┌────────────┐   ┌──────────┐   ┌─────────┐ │
//! │  │  CanBus  │──▶│ BusAdapter │──▶│ Dispatch │──▶│ Handler │ │
//! │  │ (trait)  │   │ (id split) │   │  Table   │   │ (rules) │ │
//! │  └──────────┘   └────────────┘   └──────────┘   └─────────┘ │
//! │       ▲               │                              │      │
//! │       │               ▼                              ▼      │
//! │       └────────── response frame ◀──── Outcome + codec      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod bus;
pub mod channels;
pub mod codec;
pub mod descriptor;
pub mod handler;
pub mod table;

pub use bus::{BusAdapter, CanBus, CanFrame, NullBus};
pub use codec::{DataType, WireValue};
pub use descriptor::{
    Access, Accessors, Descriptor, Encoding, EndpointId, EndpointInfo, Function,
};
pub use handler::{Outcome, Request, Status};
pub use table::{DispatchTable, Registry};
