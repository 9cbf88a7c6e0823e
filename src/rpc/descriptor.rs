//! Endpoint descriptors: static metadata plus type-erased accessors.
//!
//! Each endpoint is either an **attribute** (a value with a getter and/or
//! setter) or a **function** (an argument pack in, an optional scalar out).
//! The native type is fixed at registration, then erased behind
//! [`Accessor`] / [`Invoker`] so one table can hold `f32`, `u32`, `bool`
//! and friends side by side.
//!
//! Accessors never capture device state directly. They receive the device
//! context `C` from the caller on every request:
//!
//! ```text
//!   getter: Fn(&C) -> T          setter: Fn(&mut C, T)
//!   function: Fn(&mut C, Args) -> R
//! ```

use serde::{Deserialize, Serialize};

use super::codec::{ArgPack, DataType, ReturnValue, WireValue};
use crate::error::RegistryError;

/// Endpoint identifier carried in the arbitration id.
pub type EndpointId = u16;

/// Longest dotted name an endpoint may carry.
pub const MAX_NAME_LEN: usize = 48;

/// Dotted endpoint name, e.g. `motor.R`.
pub type Name = heapless::String<MAX_NAME_LEN>;

/// Most arguments a remote function may take.
pub const MAX_ARGS: usize = 3;

/// Longest one-line endpoint summary.
pub const MAX_SUMMARY_LEN: usize = 64;

/// Longest unit string (`"ohm"`, `"rad/s"`).
pub const MAX_UNIT_LEN: usize = 16;

/// Longest enum option or bitmask flag name.
pub const MAX_LABEL_LEN: usize = 16;

/// Most options an enum attribute may name.
pub const MAX_OPTIONS: usize = 16;

/// Most flags a bitmask attribute may name: one per bit of its `u8`.
pub const MAX_FLAGS: usize = 8;

pub type Summary = heapless::String<MAX_SUMMARY_LEN>;
pub type Unit = heapless::String<MAX_UNIT_LEN>;
pub type Label = heapless::String<MAX_LABEL_LEN>;
pub type Labels = heapless::Vec<Label, MAX_OPTIONS>;

// ── Access mode ───────────────────────────────────────────────

/// Which operations an attribute accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub const fn can_read(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub const fn can_write(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// Attribute or function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointKind {
    Attribute,
    Function,
}

/// How peers interpret an attribute's value.
///
/// Enums and bitmasks travel as a plain `u8`: option `i` is value `i`,
/// flag `i` is bit `i`. Decoding stays total; naming is metadata only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    Scalar,
    Enum(Labels),
    Bitmask(Labels),
}

// ── Attribute accessors ───────────────────────────────────────

pub type Getter<C, T> = Box<dyn Fn(&C) -> T + Send + Sync>;
pub type Setter<C, T> = Box<dyn Fn(&mut C, T) + Send + Sync>;

/// Optional getter and setter for one attribute of native type `T`.
pub struct Accessors<C, T> {
    getter: Option<Getter<C, T>>,
    setter: Option<Setter<C, T>>,
}

impl<C, T> Default for Accessors<C, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, T> Accessors<C, T> {
    /// No accessors yet.
    pub fn new() -> Self {
        Self {
            getter: None,
            setter: None,
        }
    }

    pub fn getter(mut self, f: impl Fn(&C) -> T + Send + Sync + 'static) -> Self {
        self.getter = Some(Box::new(f));
        self
    }

    pub fn setter(mut self, f: impl Fn(&mut C, T) + Send + Sync + 'static) -> Self {
        self.setter = Some(Box::new(f));
        self
    }

    pub fn has_getter(&self) -> bool {
        self.getter.is_some()
    }

    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }
}

/// Type-erased attribute: encode the current value, or decode and apply one.
pub trait Accessor<C>: Send + Sync {
    fn dtype(&self) -> DataType;

    /// Run the getter and write its wire image into `out[..size]`.
    /// Returns `false` when there is no getter.
    fn encode_current(&self, ctx: &C, out: &mut [u8]) -> bool;

    /// Decode `bytes[..size]` and hand the value to the setter.
    /// Returns `false` when there is no setter.
    fn decode_and_apply(&self, ctx: &mut C, bytes: &[u8]) -> bool;
}

impl<C, T: WireValue> Accessor<C> for Accessors<C, T> {
    fn dtype(&self) -> DataType {
        T::DTYPE
    }

    fn encode_current(&self, ctx: &C, out: &mut [u8]) -> bool {
        let Some(get) = &self.getter else {
            return false;
        };
        get(ctx).encode(out);
        true
    }

    fn decode_and_apply(&self, ctx: &mut C, bytes: &[u8]) -> bool {
        let Some(set) = &self.setter else {
            return false;
        };
        set(ctx, T::decode(bytes));
        true
    }
}

// ── Function invokers ─────────────────────────────────────────

/// Type-erased remote function.
pub trait Invoker<C>: Send + Sync {
    fn arg_types(&self) -> &'static [DataType];
    fn arg_size(&self) -> usize;
    fn return_type(&self) -> DataType;

    /// Decode `args`, call, and encode the result into `out[..return size]`.
    fn invoke(&self, ctx: &mut C, args: &[u8], out: &mut [u8]);
}

/// A native function bound as an endpoint.
pub struct Function<C, A, R> {
    call: Box<dyn Fn(&mut C, A) -> R + Send + Sync>,
}

impl<C, A, R> Function<C, A, R> {
    pub fn new(f: impl Fn(&mut C, A) -> R + Send + Sync + 'static) -> Self {
        Self { call: Box::new(f) }
    }
}

impl<C, A: ArgPack, R: ReturnValue> Invoker<C> for Function<C, A, R> {
    fn arg_types(&self) -> &'static [DataType] {
        A::DTYPES
    }

    fn arg_size(&self) -> usize {
        A::SIZE
    }

    fn return_type(&self) -> DataType {
        R::RETURN_TYPE
    }

    fn invoke(&self, ctx: &mut C, args: &[u8], out: &mut [u8]) {
        (self.call)(ctx, A::decode(args)).encode_return(out);
    }
}

// ── Descriptor ────────────────────────────────────────────────

/// What an endpoint is bound to.
pub enum Binding<C> {
    Attribute {
        access: Access,
        accessor: Box<dyn Accessor<C>>,
    },
    Function(Box<dyn Invoker<C>>),
}

/// Static metadata and accessor bindings for one endpoint.
pub struct Descriptor<C> {
    id: EndpointId,
    name: Name,
    summary: Option<Summary>,
    unit: Option<Unit>,
    encoding: Encoding,
    binding: Binding<C>,
}

impl<C: 'static> Descriptor<C> {
    /// Build an attribute descriptor, checking that the accessors match
    /// `access` and that `wire_size` is the native size of `T`.
    pub fn attribute<T: WireValue + 'static>(
        id: EndpointId,
        name: &str,
        access: Access,
        wire_size: usize,
        accessors: Accessors<C, T>,
    ) -> Result<Self, RegistryError> {
        let name = parse_name(id, name)?;

        if wire_size != T::SIZE {
            return Err(RegistryError::WireSizeMismatch {
                id,
                declared: wire_size,
                native: T::SIZE,
            });
        }

        match (access.can_read(), accessors.has_getter()) {
            (true, false) => return Err(RegistryError::MissingGetter(id)),
            (false, true) => return Err(RegistryError::UnexpectedGetter(id)),
            _ => {}
        }
        match (access.can_write(), accessors.has_setter()) {
            (true, false) => return Err(RegistryError::MissingSetter(id)),
            (false, true) => return Err(RegistryError::UnexpectedSetter(id)),
            _ => {}
        }

        Ok(Self {
            id,
            name,
            summary: None,
            unit: None,
            encoding: Encoding::Scalar,
            binding: Binding::Attribute {
                access,
                accessor: Box::new(accessors),
            },
        })
    }

    /// Build a function descriptor.
    pub fn function<A, R>(
        id: EndpointId,
        name: &str,
        function: Function<C, A, R>,
    ) -> Result<Self, RegistryError>
    where
        A: ArgPack + 'static,
        R: ReturnValue + 'static,
    {
        Ok(Self {
            id,
            name: parse_name(id, name)?,
            summary: None,
            unit: None,
            encoding: Encoding::Scalar,
            binding: Binding::Function(Box::new(function)),
        })
    }

    /// Enum attribute over a `u8`: `options[i]` names value `i`.
    pub fn enumeration(
        id: EndpointId,
        name: &str,
        access: Access,
        options: &[&str],
        accessors: Accessors<C, u8>,
    ) -> Result<Self, RegistryError> {
        let labels = parse_labels(id, options, MAX_OPTIONS)?;
        let mut descriptor = Self::attribute(id, name, access, 1, accessors)?;
        descriptor.encoding = Encoding::Enum(labels);
        Ok(descriptor)
    }

    /// Bitmask attribute over a `u8`: `flags[i]` names bit `i`.
    pub fn bitmask(
        id: EndpointId,
        name: &str,
        access: Access,
        flags: &[&str],
        accessors: Accessors<C, u8>,
    ) -> Result<Self, RegistryError> {
        let labels = parse_labels(id, flags, MAX_FLAGS)?;
        let mut descriptor = Self::attribute(id, name, access, 1, accessors)?;
        descriptor.encoding = Encoding::Bitmask(labels);
        Ok(descriptor)
    }
}

impl<C> Descriptor<C> {
    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> &Binding<C> {
        &self.binding
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    /// Attach a one-line summary and an optional unit.
    pub fn set_meta(&mut self, summary: &str, unit: Option<&str>) -> Result<(), RegistryError> {
        let too_long = RegistryError::MetadataTooLong(self.id);
        let summary = Summary::try_from(summary).map_err(|()| too_long)?;
        let unit = unit
            .map(Unit::try_from)
            .transpose()
            .map_err(|()| too_long)?;
        self.summary = Some(summary);
        self.unit = unit;
        Ok(())
    }

    pub fn kind(&self) -> EndpointKind {
        match self.binding {
            Binding::Attribute { .. } => EndpointKind::Attribute,
            Binding::Function(_) => EndpointKind::Function,
        }
    }

    /// Access mode; `None` for functions.
    pub fn access(&self) -> Option<Access> {
        match &self.binding {
            Binding::Attribute { access, .. } => Some(*access),
            Binding::Function(_) => None,
        }
    }

    /// Value type of an attribute, return type of a function.
    pub fn dtype(&self) -> DataType {
        match &self.binding {
            Binding::Attribute { accessor, .. } => accessor.dtype(),
            Binding::Function(f) => f.return_type(),
        }
    }

    /// Bytes a write request must carry: the value for an attribute, the
    /// argument pack for a function.
    pub fn wire_size(&self) -> usize {
        match &self.binding {
            Binding::Attribute { accessor, .. } => accessor.dtype().size(),
            Binding::Function(f) => f.arg_size(),
        }
    }

    /// Bytes a successful read or call produces.
    pub fn response_size(&self) -> usize {
        self.dtype().size()
    }

    /// Serializable summary of this endpoint.
    pub fn info(&self) -> EndpointInfo {
        let mut args = heapless::Vec::new();
        if let Binding::Function(f) = &self.binding {
            for dtype in f.arg_types().iter().take(MAX_ARGS) {
                let _ = args.push(*dtype);
            }
        }
        EndpointInfo {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind(),
            access: self.access(),
            dtype: self.dtype(),
            args,
            summary: self.summary.clone(),
            unit: self.unit.clone(),
            encoding: self.encoding.clone(),
        }
    }
}

impl<C> core::fmt::Debug for Descriptor<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Descriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("access", &self.access())
            .field("dtype", &self.dtype())
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// Peer-facing description of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub id: EndpointId,
    pub name: Name,
    pub kind: EndpointKind,
    pub access: Option<Access>,
    pub dtype: DataType,
    pub args: heapless::Vec<DataType, MAX_ARGS>,
    pub summary: Option<Summary>,
    pub unit: Option<Unit>,
    pub encoding: Encoding,
}

// ── Names ─────────────────────────────────────────────────────

fn valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate a dotted name: identifier segments joined by `.`.
pub fn parse_name(id: EndpointId, name: &str) -> Result<Name, RegistryError> {
    if name.is_empty() || !name.split('.').all(valid_segment) {
        return Err(RegistryError::InvalidName(id));
    }
    let mut out = Name::new();
    out.push_str(name)
        .map_err(|()| RegistryError::InvalidName(id))?;
    Ok(out)
}

/// Validate enum option or bitmask flag names: identifiers, unique, at
/// most `max` of them.
fn parse_labels(id: EndpointId, names: &[&str], max: usize) -> Result<Labels, RegistryError> {
    let invalid = RegistryError::InvalidLabels(id);
    if names.is_empty() || names.len() > max {
        return Err(invalid);
    }
    let mut labels = Labels::new();
    for name in names {
        if !valid_segment(name) || labels.iter().any(|l| l.as_str() == *name) {
            return Err(invalid);
        }
        let label = Label::try_from(*name).map_err(|()| invalid)?;
        labels.push(label).map_err(|_| invalid)?;
    }
    Ok(labels)
}
