//! Escape hatch for types that lay out their own bytes.
//!
//! A type opts out of default traversal by implementing [`CustomCodec`] and
//! deriving [`Binary`](crate::Binary) with the `custom` container attribute:
//!
//! ```ignore
//! #[derive(Default, Binary)]
//! #[sbin(custom)]
//! struct VarU32(u32);
//!
//! impl CustomCodec for VarU32 {
//!     fn encode(&self, writer: &mut dyn Write, order: ByteOrder) -> sbin::Result<()> {
//!         // ...
//!     }
//!
//!     fn decode(&mut self, reader: &mut dyn Read, order: ByteOrder) -> sbin::Result<()> {
//!         // ...
//!     }
//! }
//! ```
//!
//! The codec then replaces default traversal wherever the type occurs: at
//! the top level, as a struct field, as a sequence element or behind an
//! `Option`. The engine never inspects what it wrote or how much it read,
//! and errors it returns pass through unchanged.

use std::io::{Read, Write};

use crate::error::Result;
use crate::order::ByteOrder;

/// Custom encode/decode hooks for a type.
pub trait CustomCodec {
    /// Writes the value. The byte order is the caller's, for the whole call.
    fn encode(&self, writer: &mut dyn Write, order: ByteOrder) -> Result<()>;

    /// Reads the value in place, consuming exactly the bytes `encode` wrote.
    fn decode(&mut self, reader: &mut dyn Read, order: ByteOrder) -> Result<()>;
}
