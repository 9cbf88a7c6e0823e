//! Request handler — turns one decoded bus request into one [`Outcome`].
//!
//! Every request passes through the same decision ladder:
//!
//! 1. **Resolve** — unknown id → `UnknownProperty`.
//! 2. **RTR** — the authoritative read signal. A payload alongside it is
//!    `MalformedRequest`; otherwise read (or call a zero-argument function).
//! 3. **Data frame with payload** — write (or call with arguments). The
//!    length must equal the descriptor's wire size *before* anything is
//!    decoded.
//! 4. **Data frame without payload** — neither read nor write →
//!    `MalformedRequest`.
//!
//! The handler never retries, never blocks, and never touches a byte
//! outside `[0, wire_size)` of the request payload.

use core::fmt;

use log::{debug, warn};

use super::descriptor::{Access, Accessor, Binding, Descriptor, EndpointId, Invoker};
use super::table::DispatchTable;
use crate::config::MAX_PAYLOAD_CAPACITY;
use crate::error::ErrorKind;

// ───────────────────────────────────────────────────────────────
// Request
// ───────────────────────────────────────────────────────────────

/// One decoded bus request. Lives only while it is being handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub id: EndpointId,
    /// Remote transmission request: the peer asks for a value.
    pub rtr: bool,
    pub payload: &'a [u8],
}

impl<'a> Request<'a> {
    /// RTR frame: read an attribute or call a zero-argument function.
    pub const fn read(id: EndpointId) -> Self {
        Self {
            id,
            rtr: true,
            payload: &[],
        }
    }

    /// Data frame: write an attribute or call a function with arguments.
    pub const fn write(id: EndpointId, payload: &'a [u8]) -> Self {
        Self {
            id,
            rtr: false,
            payload,
        }
    }

    pub const fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

// ───────────────────────────────────────────────────────────────
// Outcome
// ───────────────────────────────────────────────────────────────

/// Response bytes of a successful read, sized exactly to the value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    bytes: [u8; MAX_PAYLOAD_CAPACITY],
    len: usize,
}

impl Payload {
    /// Zero-filled payload of `len` bytes (clamped to capacity).
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: [0; MAX_PAYLOAD_CAPACITY],
            len: len.min(MAX_PAYLOAD_CAPACITY),
        }
    }

    /// Copy `data` into a payload; `None` if it exceeds
    /// [`MAX_PAYLOAD_CAPACITY`].
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        if data.len() > MAX_PAYLOAD_CAPACITY {
            return None;
        }
        let mut payload = Self::zeroed(data.len());
        payload.bytes[..data.len()].copy_from_slice(data);
        Some(payload)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl core::ops::Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.as_slice()).finish()
    }
}

/// Result of handling one request, handed back to the bus adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A value was produced.
    Read(Payload),
    /// A value was applied (or a void function ran). Nothing to send back.
    Write,
    /// The request was rejected.
    Error(ErrorKind),
}

/// Bare status byte for adapters that cannot carry the full outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Read = 1,
    Write = 2,
    Error = 3,
}

impl Outcome {
    pub fn status(&self) -> Status {
        match self {
            Self::Read(_) => Status::Read,
            Self::Write => Status::Write,
            Self::Error(_) => Status::Error,
        }
    }

    /// Response bytes; empty unless this is a `Read`.
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Read(p) => p.as_slice(),
            Self::Write | Self::Error(_) => &[],
        }
    }

    pub fn payload_len(&self) -> usize {
        self.payload().len()
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            Self::Error(kind) => Some(*kind),
            _ => None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Handling
// ───────────────────────────────────────────────────────────────

/// Handle `req` against an already-resolved descriptor (or none).
pub fn handle_request<C>(
    descriptor: Option<&Descriptor<C>>,
    ctx: &mut C,
    req: &Request<'_>,
) -> Outcome {
    let Some(descriptor) = descriptor else {
        return reject(req, ErrorKind::UnknownProperty);
    };

    if req.rtr && !req.payload.is_empty() {
        return reject(req, ErrorKind::MalformedRequest);
    }
    if !req.rtr && req.payload.is_empty() {
        return reject(req, ErrorKind::MalformedRequest);
    }

    let outcome = match descriptor.binding() {
        Binding::Attribute { access, accessor } => {
            handle_attribute(*access, &**accessor, ctx, req)
        }
        Binding::Function(invoker) => handle_call(&**invoker, ctx, req),
    };

    match &outcome {
        Outcome::Error(kind) => {
            warn!("RPC[{}] {}: {}", req.id, descriptor.name(), kind);
        }
        Outcome::Read(p) => debug!("RPC[{}] {}: read {} B", req.id, descriptor.name(), p.len()),
        Outcome::Write => debug!("RPC[{}] {}: write", req.id, descriptor.name()),
    }
    outcome
}

fn handle_attribute<C>(
    access: Access,
    accessor: &dyn Accessor<C>,
    ctx: &mut C,
    req: &Request<'_>,
) -> Outcome {
    let size = accessor.dtype().size();

    if req.rtr {
        if !access.can_read() {
            return Outcome::Error(ErrorKind::OperationNotSupported);
        }
        let mut payload = Payload::zeroed(size);
        if !accessor.encode_current(ctx, payload.as_mut_slice()) {
            return Outcome::Error(ErrorKind::OperationNotSupported);
        }
        return Outcome::Read(payload);
    }

    if !access.can_write() {
        return Outcome::Error(ErrorKind::OperationNotSupported);
    }
    if req.payload.len() != size {
        return Outcome::Error(ErrorKind::MalformedPayload);
    }
    if !accessor.decode_and_apply(ctx, &req.payload[..size]) {
        return Outcome::Error(ErrorKind::OperationNotSupported);
    }
    Outcome::Write
}

fn handle_call<C>(invoker: &dyn Invoker<C>, ctx: &mut C, req: &Request<'_>) -> Outcome {
    let arg_size = invoker.arg_size();

    if req.rtr && arg_size != 0 {
        return Outcome::Error(ErrorKind::OperationNotSupported);
    }
    if !req.rtr && req.payload.len() != arg_size {
        return Outcome::Error(ErrorKind::MalformedPayload);
    }

    let ret = invoker.return_type();
    let mut payload = Payload::zeroed(ret.size());
    invoker.invoke(ctx, &req.payload[..arg_size], payload.as_mut_slice());

    if ret.is_void() {
        Outcome::Write
    } else {
        Outcome::Read(payload)
    }
}

fn reject(req: &Request<'_>, kind: ErrorKind) -> Outcome {
    warn!("RPC[{}]: {} (rtr={}, len={})", req.id, kind, req.rtr, req.payload.len());
    Outcome::Error(kind)
}

impl<C, const N: usize> DispatchTable<C, N> {
    /// Resolve `req.id` and handle the request against the device context.
    pub fn handle(&self, ctx: &mut C, req: &Request<'_>) -> Outcome {
        handle_request(self.resolve(req.id), ctx, req)
    }
}
