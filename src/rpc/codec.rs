//! Fixed-width wire codec.
//!
//! Every value travels as a raw copy of its native in-memory bytes:
//! ```text
//! ┌──────────────────────────────┐
//! │ value bytes (SIZE B, native) │   no header, no padding
//! └──────────────────────────────┘
//! ```
//!
//! Byte order is the machine's native order. Both ends of the bus are
//! assumed to agree on it; nothing here negotiates.
//!
//! `decode` trusts its caller: the slice must hold at least `SIZE` bytes.
//! The request handler checks lengths before it ever reaches this module.

use serde::{Deserialize, Serialize};

/// Wire-level type tag of an endpoint value or argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    Void = 0,
    Bool = 1,
    U8 = 2,
    I8 = 3,
    U16 = 4,
    I16 = 5,
    U32 = 6,
    I32 = 7,
    U64 = 8,
    I64 = 9,
    F32 = 10,
    F64 = 11,
}

impl DataType {
    /// Encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Void => 0,
            Self::Bool | Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Short lowercase name used in descriptions and logs.
    pub const fn nickname(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::U8 => "uint8",
            Self::I8 => "int8",
            Self::U16 => "uint16",
            Self::I16 => "int16",
            Self::U32 => "uint32",
            Self::I32 => "int32",
            Self::U64 => "uint64",
            Self::I64 => "int64",
            Self::F32 => "float",
            Self::F64 => "double",
        }
    }

    pub const fn is_void(self) -> bool {
        matches!(self, Self::Void)
    }
}

/// A native scalar with a fixed-width wire image.
pub trait WireValue: Copy {
    /// Exact number of bytes on the wire.
    const SIZE: usize;
    /// Type tag reported in endpoint descriptions.
    const DTYPE: DataType;

    /// Write the wire image into `out[..SIZE]`.
    fn encode(self, out: &mut [u8]);

    /// Read a value from `bytes[..SIZE]`.
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_wire_value {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl WireValue for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();
                const DTYPE: DataType = DataType::$dtype;

                #[inline]
                fn encode(self, out: &mut [u8]) {
                    out[..Self::SIZE].copy_from_slice(&self.to_ne_bytes());
                }

                #[inline]
                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_ne_bytes(raw)
                }
            }
        )*
    };
}

impl_wire_value! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

impl WireValue for bool {
    const SIZE: usize = 1;
    const DTYPE: DataType = DataType::Bool;

    #[inline]
    fn encode(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    /// Any non-zero byte reads as `true`.
    #[inline]
    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

// ── Argument packs ────────────────────────────────────────────

/// Ordered arguments of a remote function, packed back to back.
pub trait ArgPack: Sized {
    /// Sum of the argument sizes.
    const SIZE: usize;
    /// Argument types in declaration order.
    const DTYPES: &'static [DataType];

    fn decode(bytes: &[u8]) -> Self;
    fn encode(self, out: &mut [u8]);
}

impl ArgPack for () {
    const SIZE: usize = 0;
    const DTYPES: &'static [DataType] = &[];

    fn decode(_bytes: &[u8]) -> Self {}

    fn encode(self, _out: &mut [u8]) {}
}

macro_rules! impl_arg_pack {
    ($($ty:ident $var:ident),+) => {
        impl<$($ty: WireValue),+> ArgPack for ($($ty,)+) {
            const SIZE: usize = 0 $(+ <$ty as WireValue>::SIZE)+;
            const DTYPES: &'static [DataType] = &[$(<$ty as WireValue>::DTYPE),+];

            #[allow(unused_assignments)]
            fn decode(bytes: &[u8]) -> Self {
                let mut offset = 0;
                $(
                    let $var = <$ty as WireValue>::decode(&bytes[offset..]);
                    offset += <$ty as WireValue>::SIZE;
                )+
                ($($var,)+)
            }

            #[allow(unused_assignments)]
            fn encode(self, out: &mut [u8]) {
                let ($($var,)+) = self;
                let mut offset = 0;
                $(
                    WireValue::encode($var, &mut out[offset..]);
                    offset += <$ty as WireValue>::SIZE;
                )+
            }
        }
    };
}

impl_arg_pack!(A a);
impl_arg_pack!(A a, B b);
impl_arg_pack!(A a, B b, C c);

/// Return value of a remote function: a scalar or nothing.
pub trait ReturnValue {
    /// Bytes the encoded result occupies (0 for void).
    const WIDTH: usize;
    const RETURN_TYPE: DataType;

    fn encode_return(self, out: &mut [u8]);
}

impl ReturnValue for () {
    const WIDTH: usize = 0;
    const RETURN_TYPE: DataType = DataType::Void;

    fn encode_return(self, _out: &mut [u8]) {}
}

impl<T: WireValue> ReturnValue for T {
    const WIDTH: usize = T::SIZE;
    const RETURN_TYPE: DataType = T::DTYPE;

    fn encode_return(self, out: &mut [u8]) {
        self.encode(out);
    }
}
