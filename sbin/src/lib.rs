//! # sbin
//!
//! Binary struct codec with declaration-order layout and designator-driven
//! field lengths.
//!
//! A struct deriving [`Binary`] is written as the plain concatenation of its
//! fields, in declaration order, with the caller's [`ByteOrder`] applied to
//! every multi-byte number. There is no framing of any kind: strings, byte
//! buffers and vectors carry no length prefix. Instead, an integer field
//! annotated with `#[sbin(len_of = "...")]` supplies the element count of a
//! later field when decoding.
//!
//! ```ignore
//! use sbin::{Binary, ByteOrder};
//!
//! #[derive(Debug, Default, PartialEq, Binary)]
//! struct Frame {
//!     #[sbin(len_of = "payload")]
//!     size: u32,
//!     payload: Vec<u8>,
//! }
//!
//! let frame = Frame { size: 5, payload: vec![0, 1, 2, 3, 4] };
//! let bytes = sbin::to_bytes(&frame, ByteOrder::Big)?;
//! assert_eq!(bytes, [0, 0, 0, 5, 0, 1, 2, 3, 4]);
//! assert_eq!(sbin::from_bytes::<Frame>(&bytes, ByteOrder::Big)?, frame);
//! ```
//!
//! ## Core Types
//!
//! - [`Binary`]: reflection trait implemented by `#[derive(Binary)]`
//! - [`Shape`] / [`shape_of`]: static, cached wire layout of a type
//! - [`Encoder`] / [`Decoder`]: stream-bound encode and in-place decode
//! - [`CustomCodec`]: escape hatch for types with their own layout
//! - [`Config`]: unsupported-type policy and length limits
//!
//! ## Field annotations
//!
//! | Attribute | Effect |
//! |---|---|
//! | `#[sbin(skip)]` | the field is never written or read |
//! | `#[sbin(len_of = "name")]` | the decoded value is the element count of the later field `name` |
//! | `#[sbin(custom)]` (on the type) | the type's [`CustomCodec`] replaces default traversal |
//!
//! Fields whose names start with `_` are private to the type and skipped
//! like `#[sbin(skip)]` fields.
//!
//! ## Optional fields
//!
//! `Option<T>` has no presence marker on the wire. `None` is written as
//! `T::default()`, and decoding always produces `Some`, so a round trip turns
//! `None` into `Some(T::default())`.

extern crate self as sbin;

mod binary;
mod config;
mod custom;
mod decode;
mod encode;
mod error;
mod length;
mod order;
mod primitive;
mod shape;

pub use binary::{Aggregate, Binary, Optional, Sequence, View, ViewMut};
pub use config::{Config, UnsupportedPolicy};
pub use custom::CustomCodec;
pub use decode::{Decoder, from_bytes, from_bytes_into};
pub use encode::{Encoder, to_bytes};
pub use error::{Error, Result};
pub use length::{LengthTable, element_count};
pub use order::ByteOrder;
pub use primitive::{Number, Primitive, PrimitiveMut};
pub use sbin_macro::Binary;
pub use shape::{AggregateShape, Annotation, Field, FieldInfo, Shape, Width, shape_of};

/// Support items for `#[derive(Binary)]`. Not public API.
#[doc(hidden)]
pub mod __private {
    /// Integer types that can carry a `len_of` element count.
    #[diagnostic::on_unimplemented(
        message = "`{Self}` cannot be a length designator",
        label = "`len_of` fields must be integers"
    )]
    pub trait Designator {}

    macro_rules! designators {
        ($($ty:ty),*) => {
            $(impl Designator for $ty {})*
        };
    }

    designators!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

    /// Types whose element count comes from a designator.
    #[diagnostic::on_unimplemented(
        message = "`{Self}` has a fixed size and cannot be the target of `len_of`",
        label = "`len_of` targets must be `String`, `Vec<T>` or an `Option`/`Box` of one"
    )]
    pub trait LengthTarget {}

    impl LengthTarget for String {}
    impl<T> LengthTarget for Vec<T> {}
    impl<T: LengthTarget> LengthTarget for Option<T> {}
    impl<T: LengthTarget> LengthTarget for Box<T> {}

    pub const fn assert_designator<T: Designator>() {}
    pub const fn assert_length_target<T: LengthTarget>() {}
}
