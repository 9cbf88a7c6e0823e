//! Unified error types for the property protocol.
//!
//! Two families, kept apart on purpose:
//!
//! - [`RegistryError`] happens while the dispatch table is being built and
//!   aborts startup. A half-registered table is never handed to the bus.
//! - [`ErrorKind`] happens per request. It is reported back to the peer
//!   inside an [`Outcome`](crate::rpc::handler::Outcome) and never unwinds.
//!
//! All variants are `Copy` so they travel through the request path without
//! allocation.

use core::fmt;

use crate::rpc::descriptor::EndpointId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible initialisation step funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Building the dispatch table failed.
    Registry(RegistryError),
    /// Bus configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Registration errors (fatal at startup)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Another descriptor already owns this endpoint id.
    DuplicateId(EndpointId),
    /// Another descriptor already owns this full name.
    DuplicateName(EndpointId),
    /// The access mode allows reads but no getter was supplied.
    MissingGetter(EndpointId),
    /// The access mode allows writes but no setter was supplied.
    MissingSetter(EndpointId),
    /// A getter was supplied for a write-only property.
    UnexpectedGetter(EndpointId),
    /// A setter was supplied for a read-only property.
    UnexpectedSetter(EndpointId),
    /// Declared wire size differs from the native size of the bound type.
    WireSizeMismatch {
        id: EndpointId,
        declared: usize,
        native: usize,
    },
    /// Value, argument pack or return value does not fit one bus frame.
    WireSizeTooLarge {
        id: EndpointId,
        size: usize,
        max: usize,
    },
    /// Endpoint id does not fit the arbitration-id bits reserved for it.
    /// Wider than [`EndpointId`] so auto-assignment can report the id that
    /// ran past `u16::MAX`.
    IdOutOfRange(u32),
    /// Name is empty, too long, or has a segment that is not an identifier.
    InvalidName(EndpointId),
    /// Enum options or bitmask flags are empty, too many, too long,
    /// duplicated, or not identifiers.
    InvalidLabels(EndpointId),
    /// Summary or unit does not fit its fixed-capacity string.
    MetadataTooLong(EndpointId),
    /// No registered endpoint has this id.
    UnknownEndpoint(EndpointId),
    /// The fixed-capacity table has no free slot.
    TableFull(EndpointId),
    /// The endpoint description could not be encoded for the protocol hash.
    DescriptionEncoding,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "duplicate endpoint id {id}"),
            Self::DuplicateName(id) => write!(f, "duplicate name for endpoint {id}"),
            Self::MissingGetter(id) => write!(f, "endpoint {id}: readable but no getter"),
            Self::MissingSetter(id) => write!(f, "endpoint {id}: writable but no setter"),
            Self::UnexpectedGetter(id) => write!(f, "endpoint {id}: write-only but has a getter"),
            Self::UnexpectedSetter(id) => write!(f, "endpoint {id}: read-only but has a setter"),
            Self::WireSizeMismatch {
                id,
                declared,
                native,
            } => write!(
                f,
                "endpoint {id}: wire size {declared} != native size {native}"
            ),
            Self::WireSizeTooLarge { id, size, max } => {
                write!(f, "endpoint {id}: {size} bytes exceeds frame payload {max}")
            }
            Self::IdOutOfRange(id) => write!(f, "endpoint id {id} out of range"),
            Self::InvalidName(id) => write!(f, "endpoint {id}: invalid name"),
            Self::InvalidLabels(id) => write!(f, "endpoint {id}: invalid option/flag names"),
            Self::MetadataTooLong(id) => write!(f, "endpoint {id}: summary or unit too long"),
            Self::UnknownEndpoint(id) => write!(f, "no endpoint with id {id}"),
            Self::TableFull(id) => write!(f, "table full, cannot add endpoint {id}"),
            Self::DescriptionEncoding => write!(f, "endpoint description could not be encoded"),
        }
    }
}

impl core::error::Error for RegistryError {}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Per-request errors (reported to the peer)
// ---------------------------------------------------------------------------

/// Why a single request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// No descriptor has the requested id.
    UnknownProperty = 1,
    /// Read on a write-only property, write on a read-only one, or an RTR
    /// call of a function that needs arguments.
    OperationNotSupported = 2,
    /// Write payload length differs from the descriptor's wire size.
    MalformedPayload = 3,
    /// Neither a read nor a write: empty data frame, or RTR with payload.
    MalformedRequest = 4,
}

impl ErrorKind {
    /// Stable byte for adapters that report a bare status.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProperty => write!(f, "unknown property"),
            Self::OperationNotSupported => write!(f, "operation not supported"),
            Self::MalformedPayload => write!(f, "malformed payload"),
            Self::MalformedRequest => write!(f, "malformed request"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
