//! Caller-selected byte order.

use std::io::{Read, Write};

use crate::error::Result;
use crate::primitive::Number;

/// The byte order applied to every multi-byte number in one encode or decode call.
///
/// The order is never written to the wire and never checked on decode: decoding
/// with the opposite order yields byte-swapped values, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Most-significant byte first.
    Big,
    /// Least-significant byte first.
    Little,
}

impl ByteOrder {
    /// The byte order of the target architecture.
    pub const fn native() -> Self {
        #[cfg(target_endian = "big")]
        let order = Self::Big;

        #[cfg(target_endian = "little")]
        let order = Self::Little;

        order
    }

    /// Writes one number in this byte order.
    ///
    /// Intended for [`CustomCodec`](crate::CustomCodec) implementations that
    /// lay out their own bytes.
    pub fn write<N: Number>(self, writer: &mut dyn Write, value: N) -> Result<()> {
        value.write_to(writer, self)
    }

    /// Reads one number in this byte order.
    pub fn read<N: Number>(self, reader: &mut dyn Read) -> Result<N> {
        N::read_from(reader, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_respects_order() {
        let mut big = Vec::new();
        ByteOrder::Big.write(&mut big, 0x0102_0304u32).unwrap();
        assert_eq!(big, [1, 2, 3, 4]);

        let mut little = Vec::new();
        ByteOrder::Little.write(&mut little, 0x0102_0304u32).unwrap();
        assert_eq!(little, [4, 3, 2, 1]);
    }

    #[test]
    fn test_read_float() {
        let bytes = 124.5f64.to_be_bytes();
        let value: f64 = ByteOrder::Big.read(&mut &bytes[..]).unwrap();
        assert_eq!(value, 124.5);
    }
}
