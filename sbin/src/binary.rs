//! The [`Binary`] reflection trait and its implementations for std types.
//!
//! Every value the engine touches is seen through a [`View`] (for encoding)
//! or a [`ViewMut`] (for decoding in place). The view tells the engine which
//! traversal applies; the type's [`Shape`] describes the same layout
//! statically and is what gets cached and validated.
//!
//! Structs get their implementation from `#[derive(Binary)]`, which also
//! implements [`Aggregate`] to expose fields by declaration index.

use std::any::{Any, TypeId};
use std::marker::PhantomData;

use crate::custom::CustomCodec;
use crate::error::Result;
use crate::primitive::{Primitive, PrimitiveMut};
use crate::shape::{FieldInfo, Shape, Width};

/// A type the codec can lay out on the wire.
pub trait Binary: 'static {
    /// Derives the static wire shape of the type.
    ///
    /// Called once per type by [`shape_of`](crate::shape_of); the result is cached.
    fn shape() -> Shape
    where
        Self: Sized;

    /// Read-only view of the value for encoding.
    fn view(&self) -> View<'_>;

    /// Mutable view of the value for decoding in place.
    fn view_mut(&mut self) -> ViewMut<'_>;
}

/// How the encoder sees a value.
pub enum View<'a> {
    Primitive(Primitive),
    Text(&'a str),
    Bytes(&'a [u8]),
    Sequence(&'a dyn Sequence),
    Aggregate(&'a dyn Aggregate),
    Optional(&'a dyn Optional),
    Custom(&'a dyn CustomCodec),
    Unsupported(&'static str),
}

/// How the decoder sees a value.
pub enum ViewMut<'a> {
    Primitive(PrimitiveMut<'a>),
    Text(&'a mut String),
    Bytes(&'a mut Vec<u8>),
    /// Fixed-size byte array, read in one go.
    ByteArray(&'a mut [u8]),
    Sequence(&'a mut dyn Sequence),
    Aggregate(&'a mut dyn Aggregate),
    Optional(&'a mut dyn Optional),
    Custom(&'a mut dyn CustomCodec),
    Unsupported(&'static str),
}

/// Field-level reflection for structs, generated by `#[derive(Binary)]`.
pub trait Aggregate {
    /// Type name used in error paths.
    fn aggregate_name(&self) -> &'static str;

    /// All declared fields in declaration order, including skipped ones.
    fn field_infos(&self) -> &'static [FieldInfo];

    /// The field at declaration `index`, or `None` if it never reaches the wire.
    fn field(&self, index: usize) -> Option<&dyn Binary>;

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Binary>;
}

/// Element access for arrays and vectors.
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Some` for fixed-size arrays, which never need a designator.
    fn fixed_len(&self) -> Option<usize>;

    fn element(&self, index: usize) -> Option<&dyn Binary>;

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Binary>;

    /// Removes all elements. A no-op for fixed-size arrays.
    fn clear(&mut self);

    /// Reserves room for `additional` more elements. Only a hint.
    fn reserve(&mut self, _additional: usize) {}

    /// Appends a zero-valued element and returns it to be decoded into.
    ///
    /// Returns `None` for fixed-size arrays, which cannot grow.
    fn push_default(&mut self) -> Option<&mut dyn Binary>;
}

/// An optional referent. Absence is never written: it encodes as the zero value.
pub trait Optional {
    /// Calls `visit` with the referent, or with a zero value if there is none.
    fn visit_or_zero(&self, visit: &mut dyn FnMut(&dyn Binary) -> Result<()>) -> Result<()>;

    /// Replaces the value with a fresh zero-valued referent and returns it.
    fn fresh(&mut self) -> &mut dyn Binary;
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

macro_rules! impl_primitive {
    ($ty:ty, $shape:expr, $variant:ident) => {
        impl Binary for $ty {
            fn shape() -> Shape {
                $shape
            }

            fn view(&self) -> View<'_> {
                View::Primitive(Primitive::$variant(*self))
            }

            fn view_mut(&mut self) -> ViewMut<'_> {
                ViewMut::Primitive(PrimitiveMut::$variant(self))
            }
        }
    };
}

impl_primitive!(bool, Shape::Bool, Bool);
impl_primitive!(i8, Shape::Int(Width::W1), I8);
impl_primitive!(i16, Shape::Int(Width::W2), I16);
impl_primitive!(i32, Shape::Int(Width::W4), I32);
impl_primitive!(i64, Shape::Int(Width::W8), I64);
impl_primitive!(i128, Shape::Int(Width::W16), I128);
impl_primitive!(u8, Shape::UInt(Width::W1), U8);
impl_primitive!(u16, Shape::UInt(Width::W2), U16);
impl_primitive!(u32, Shape::UInt(Width::W4), U32);
impl_primitive!(u64, Shape::UInt(Width::W8), U64);
impl_primitive!(u128, Shape::UInt(Width::W16), U128);
impl_primitive!(f32, Shape::Float(Width::W4), F32);
impl_primitive!(f64, Shape::Float(Width::W8), F64);

// Pointer-sized integers travel as 8 bytes regardless of the target.

impl Binary for usize {
    fn shape() -> Shape {
        Shape::UInt(Width::W8)
    }

    fn view(&self) -> View<'_> {
        View::Primitive(Primitive::U64(*self as u64))
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Primitive(PrimitiveMut::Usize(self))
    }
}

impl Binary for isize {
    fn shape() -> Shape {
        Shape::Int(Width::W8)
    }

    fn view(&self) -> View<'_> {
        View::Primitive(Primitive::I64(*self as i64))
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Primitive(PrimitiveMut::Isize(self))
    }
}

// ---------------------------------------------------------------------------
// Text and sequences
// ---------------------------------------------------------------------------

impl Binary for String {
    fn shape() -> Shape {
        Shape::Text
    }

    fn view(&self) -> View<'_> {
        View::Text(self)
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Text(self)
    }
}

fn is_byte<T: 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<u8>()
}

impl<T: Binary + Default> Binary for Vec<T> {
    fn shape() -> Shape {
        if is_byte::<T>() {
            Shape::Bytes
        } else {
            Shape::Sequence {
                element: Box::new(T::shape()),
                len: None,
            }
        }
    }

    fn view(&self) -> View<'_> {
        match (self as &dyn Any).downcast_ref::<Vec<u8>>() {
            Some(bytes) => View::Bytes(bytes),
            None => View::Sequence(self),
        }
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        if !is_byte::<T>() {
            return ViewMut::Sequence(self);
        }
        match (self as &mut dyn Any).downcast_mut::<Vec<u8>>() {
            Some(bytes) => ViewMut::Bytes(bytes),
            None => ViewMut::Unsupported(std::any::type_name::<Self>()),
        }
    }
}

impl<T: Binary + Default> Sequence for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn fixed_len(&self) -> Option<usize> {
        None
    }

    fn element(&self, index: usize) -> Option<&dyn Binary> {
        self.get(index).map(|item| item as &dyn Binary)
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Binary> {
        self.get_mut(index).map(|item| item as &mut dyn Binary)
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn reserve(&mut self, additional: usize) {
        Vec::reserve(self, additional);
    }

    fn push_default(&mut self) -> Option<&mut dyn Binary> {
        self.push(T::default());
        self.last_mut().map(|item| item as &mut dyn Binary)
    }
}

impl<T: Binary, const N: usize> Binary for [T; N] {
    fn shape() -> Shape {
        Shape::Sequence {
            element: Box::new(T::shape()),
            len: Some(N),
        }
    }

    fn view(&self) -> View<'_> {
        match (self as &dyn Any).downcast_ref::<[u8; N]>() {
            Some(bytes) => View::Bytes(bytes),
            None => View::Sequence(self),
        }
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        if !is_byte::<T>() {
            return ViewMut::Sequence(self);
        }
        match (self as &mut dyn Any).downcast_mut::<[u8; N]>() {
            Some(bytes) => ViewMut::ByteArray(bytes),
            None => ViewMut::Unsupported(std::any::type_name::<Self>()),
        }
    }
}

impl<T: Binary, const N: usize> Sequence for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn fixed_len(&self) -> Option<usize> {
        Some(N)
    }

    fn element(&self, index: usize) -> Option<&dyn Binary> {
        self.get(index).map(|item| item as &dyn Binary)
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Binary> {
        self.get_mut(index).map(|item| item as &mut dyn Binary)
    }

    fn clear(&mut self) {}

    fn push_default(&mut self) -> Option<&mut dyn Binary> {
        None
    }
}

// ---------------------------------------------------------------------------
// Optional and boxed referents
// ---------------------------------------------------------------------------

impl<T: Binary + Default> Binary for Option<T> {
    fn shape() -> Shape {
        Shape::Optional(Box::new(T::shape()))
    }

    fn view(&self) -> View<'_> {
        View::Optional(self)
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Optional(self)
    }
}

impl<T: Binary + Default> Optional for Option<T> {
    fn visit_or_zero(&self, visit: &mut dyn FnMut(&dyn Binary) -> Result<()>) -> Result<()> {
        match self {
            Some(referent) => visit(referent),
            None => visit(&T::default()),
        }
    }

    fn fresh(&mut self) -> &mut dyn Binary {
        self.insert(T::default())
    }
}

/// Boxes are transparent: a `Box<T>` has exactly the layout of `T`.
impl<T: Binary> Binary for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn view(&self) -> View<'_> {
        (**self).view()
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        (**self).view_mut()
    }
}

// ---------------------------------------------------------------------------
// Unsupported
// ---------------------------------------------------------------------------

impl Binary for () {
    fn shape() -> Shape {
        Shape::Unsupported { type_name: "()" }
    }

    fn view(&self) -> View<'_> {
        View::Unsupported("()")
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Unsupported("()")
    }
}

impl<T: ?Sized + 'static> Binary for PhantomData<T> {
    fn shape() -> Shape {
        Shape::Unsupported {
            type_name: std::any::type_name::<Self>(),
        }
    }

    fn view(&self) -> View<'_> {
        View::Unsupported(std::any::type_name::<Self>())
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Unsupported(std::any::type_name::<Self>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_vec_is_bytes() {
        assert_eq!(Vec::<u8>::shape(), Shape::Bytes);
        let bytes = vec![1u8, 2, 3];
        assert!(matches!(bytes.view(), View::Bytes([1, 2, 3])));
    }

    #[test]
    fn test_other_vec_is_sequence() {
        assert_eq!(
            Vec::<u16>::shape(),
            Shape::Sequence {
                element: Box::new(Shape::UInt(Width::W2)),
                len: None
            }
        );
        let mut values = vec![1u16, 2];
        assert!(matches!(values.view(), View::Sequence(seq) if seq.len() == 2));
        assert!(matches!(values.view_mut(), ViewMut::Sequence(_)));
    }

    #[test]
    fn test_byte_array_is_read_in_bulk() {
        let mut array = [0u8; 4];
        assert!(matches!(array.view_mut(), ViewMut::ByteArray(slot) if slot.len() == 4));
        assert_eq!(
            <[u8; 4]>::shape(),
            Shape::Sequence {
                element: Box::new(Shape::UInt(Width::W1)),
                len: Some(4)
            }
        );
    }

    #[test]
    fn test_vec_grows_one_element_at_a_time() {
        let mut values = vec![7u32, 8, 9];
        Sequence::clear(&mut values);
        assert!(values.is_empty());

        let slot = values.push_default().unwrap();
        assert!(matches!(slot.view_mut(), ViewMut::Primitive(PrimitiveMut::U32(zero)) if *zero == 0));
        assert_eq!(values, [0]);
    }

    #[test]
    fn test_array_cannot_grow() {
        let mut values = [1u16, 2];
        Sequence::clear(&mut values);
        assert!(values.push_default().is_none());
        assert_eq!(values, [1, 2]);
    }

    #[test]
    fn test_option_fresh_is_present_and_zeroed() {
        let mut value: Option<u64> = None;
        let _ = value.fresh();
        assert_eq!(value, Some(0));

        let mut value = Some(5u64);
        let _ = value.fresh();
        assert_eq!(value, Some(0));
    }

    #[test]
    fn test_box_is_transparent() {
        assert_eq!(Box::<i32>::shape(), Shape::Int(Width::W4));
        let boxed = Box::new(3i32);
        assert!(matches!(boxed.view(), View::Primitive(Primitive::I32(3))));
    }

    #[test]
    fn test_usize_is_normalised() {
        assert_eq!(usize::shape(), Shape::UInt(Width::W8));
        assert!(matches!(7usize.view(), View::Primitive(Primitive::U64(7))));
    }
}
