//! Fixed-width numeric and boolean codec.
//!
//! This is the only place the [`ByteOrder`] is consulted. Numbers go through
//! `byteorder`'s [`ReadBytesExt`]/[`WriteBytesExt`]; booleans are a single
//! byte, `0` or `1` on write, any non-zero byte reads back as `true`.
//!
//! `usize` and `isize` have no fixed width of their own, so they are always
//! carried as 8-byte `u64`/`i64` on the wire.

use std::io::{Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::order::ByteOrder;
use crate::shape::Width;

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width number the primitive codec can read and write.
///
/// Sealed; implemented for every integer and float type.
pub trait Number: sealed::Sealed + Copy {
    /// Bytes this number occupies on the wire.
    const WIDTH: Width;

    fn write_to(self, writer: &mut dyn Write, order: ByteOrder) -> Result<()>;

    fn read_from(reader: &mut dyn Read, order: ByteOrder) -> Result<Self>;
}

macro_rules! impl_single_byte {
    ($ty:ty, $write:ident, $read:ident) => {
        impl sealed::Sealed for $ty {}

        impl Number for $ty {
            const WIDTH: Width = Width::W1;

            fn write_to(self, writer: &mut dyn Write, _order: ByteOrder) -> Result<()> {
                writer.$write(self)?;
                Ok(())
            }

            fn read_from(reader: &mut dyn Read, _order: ByteOrder) -> Result<Self> {
                reader.$read().map_err(|e| Error::from_read(e, 1))
            }
        }
    };
}

macro_rules! impl_ordered {
    ($ty:ty, $width:expr, $write:ident, $read:ident) => {
        impl sealed::Sealed for $ty {}

        impl Number for $ty {
            const WIDTH: Width = $width;

            fn write_to(self, writer: &mut dyn Write, order: ByteOrder) -> Result<()> {
                match order {
                    ByteOrder::Big => writer.$write::<BigEndian>(self)?,
                    ByteOrder::Little => writer.$write::<LittleEndian>(self)?,
                }
                Ok(())
            }

            fn read_from(reader: &mut dyn Read, order: ByteOrder) -> Result<Self> {
                match order {
                    ByteOrder::Big => reader.$read::<BigEndian>(),
                    ByteOrder::Little => reader.$read::<LittleEndian>(),
                }
                .map_err(|e| Error::from_read(e, Self::WIDTH.bytes()))
            }
        }
    };
}

impl_single_byte!(u8, write_u8, read_u8);
impl_single_byte!(i8, write_i8, read_i8);
impl_ordered!(u16, Width::W2, write_u16, read_u16);
impl_ordered!(i16, Width::W2, write_i16, read_i16);
impl_ordered!(u32, Width::W4, write_u32, read_u32);
impl_ordered!(i32, Width::W4, write_i32, read_i32);
impl_ordered!(u64, Width::W8, write_u64, read_u64);
impl_ordered!(i64, Width::W8, write_i64, read_i64);
impl_ordered!(u128, Width::W16, write_u128, read_u128);
impl_ordered!(i128, Width::W16, write_i128, read_i128);
impl_ordered!(f32, Width::W4, write_f32, read_f32);
impl_ordered!(f64, Width::W8, write_f64, read_f64);

/// A primitive value read out of a field for encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    F32(f32),
    F64(f64),
}

impl Primitive {
    /// The value as a signed 128-bit integer.
    ///
    /// `None` for non-integers and for `u128` values above `i128::MAX`.
    pub fn as_integer(self) -> Option<i128> {
        Some(match self {
            Self::I8(v) => v.into(),
            Self::I16(v) => v.into(),
            Self::I32(v) => v.into(),
            Self::I64(v) => v.into(),
            Self::I128(v) => v,
            Self::U8(v) => v.into(),
            Self::U16(v) => v.into(),
            Self::U32(v) => v.into(),
            Self::U64(v) => v.into(),
            Self::U128(v) => i128::try_from(v).ok()?,
            Self::Bool(_) | Self::F32(_) | Self::F64(_) => return None,
        })
    }
}

/// A mutable primitive slot to decode into.
#[derive(Debug)]
pub enum PrimitiveMut<'a> {
    Bool(&'a mut bool),
    I8(&'a mut i8),
    I16(&'a mut i16),
    I32(&'a mut i32),
    I64(&'a mut i64),
    I128(&'a mut i128),
    Isize(&'a mut isize),
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    U64(&'a mut u64),
    U128(&'a mut u128),
    Usize(&'a mut usize),
    F32(&'a mut f32),
    F64(&'a mut f64),
}

pub(crate) fn write_primitive(
    writer: &mut dyn Write,
    order: ByteOrder,
    value: Primitive,
) -> Result<()> {
    match value {
        Primitive::Bool(v) => u8::from(v).write_to(writer, order),
        Primitive::I8(v) => v.write_to(writer, order),
        Primitive::I16(v) => v.write_to(writer, order),
        Primitive::I32(v) => v.write_to(writer, order),
        Primitive::I64(v) => v.write_to(writer, order),
        Primitive::I128(v) => v.write_to(writer, order),
        Primitive::U8(v) => v.write_to(writer, order),
        Primitive::U16(v) => v.write_to(writer, order),
        Primitive::U32(v) => v.write_to(writer, order),
        Primitive::U64(v) => v.write_to(writer, order),
        Primitive::U128(v) => v.write_to(writer, order),
        Primitive::F32(v) => v.write_to(writer, order),
        Primitive::F64(v) => v.write_to(writer, order),
    }
}

pub(crate) fn read_primitive(
    reader: &mut dyn Read,
    order: ByteOrder,
    slot: PrimitiveMut<'_>,
) -> Result<()> {
    match slot {
        PrimitiveMut::Bool(v) => *v = u8::read_from(reader, order)? != 0,
        PrimitiveMut::I8(v) => *v = Number::read_from(reader, order)?,
        PrimitiveMut::I16(v) => *v = Number::read_from(reader, order)?,
        PrimitiveMut::I32(v) => *v = Number::read_from(reader, order)?,
        PrimitiveMut::I64(v) => *v = Number::read_from(reader, order)?,
        PrimitiveMut::I128(v) => *v = Number::read_from(reader, order)?,
        PrimitiveMut::Isize(v) => {
            let wide = i64::read_from(reader, order)?;
            *v = isize::try_from(wide).map_err(|_| Error::InvalidLength {
                value: wide.into(),
            })?;
        }
        PrimitiveMut::U8(v) => *v = Number::read_from(reader, order)?,
        PrimitiveMut::U16(v) => *v = Number::read_from(reader, order)?,
        PrimitiveMut::U32(v) => *v = Number::read_from(reader, order)?,
        PrimitiveMut::U64(v) => *v = Number::read_from(reader, order)?,
        PrimitiveMut::U128(v) => *v = Number::read_from(reader, order)?,
        PrimitiveMut::Usize(v) => {
            let wide = u64::read_from(reader, order)?;
            *v = usize::try_from(wide).map_err(|_| Error::InvalidLength {
                value: wide.into(),
            })?;
        }
        PrimitiveMut::F32(v) => *v = Number::read_from(reader, order)?,
        PrimitiveMut::F64(v) => *v = Number::read_from(reader, order)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_is_one_byte() {
        let mut out = Vec::new();
        write_primitive(&mut out, ByteOrder::Big, Primitive::Bool(true)).unwrap();
        write_primitive(&mut out, ByteOrder::Big, Primitive::Bool(false)).unwrap();
        assert_eq!(out, [1, 0]);
    }

    #[test]
    fn test_nonzero_byte_reads_as_true() {
        let mut flag = false;
        read_primitive(&mut &[7u8][..], ByteOrder::Big, PrimitiveMut::Bool(&mut flag)).unwrap();
        assert!(flag);
    }

    #[test]
    fn test_usize_is_eight_bytes() {
        let mut out = Vec::new();
        write_primitive(&mut out, ByteOrder::Little, Primitive::U64(5)).unwrap();
        assert_eq!(out.len(), 8);

        let mut len = 0usize;
        read_primitive(&mut &out[..], ByteOrder::Little, PrimitiveMut::Usize(&mut len)).unwrap();
        assert_eq!(len, 5);
    }

    #[test]
    fn test_short_read_is_truncation() {
        let mut value = 0u32;
        let err = read_primitive(&mut &[0u8, 1][..], ByteOrder::Big, PrimitiveMut::U32(&mut value))
            .unwrap_err();
        assert!(matches!(err, Error::Truncated { needed: 4, .. }));
    }

    #[test]
    fn test_integer_view() {
        assert_eq!(Primitive::I16(-2).as_integer(), Some(-2));
        assert_eq!(Primitive::U64(u64::MAX).as_integer(), Some(u64::MAX as i128));
        assert_eq!(Primitive::F32(1.0).as_integer(), None);
        assert_eq!(Primitive::Bool(true).as_integer(), None);
        assert_eq!(Primitive::U128(u128::MAX).as_integer(), None);
    }
}
