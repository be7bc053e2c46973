//! Wire shapes and the per-type shape cache.
//!
//! A [`Shape`] is the closed classification of how a type is laid out on the
//! wire. It is derived once per type through [`Binary::shape`] and cached by
//! [`shape_of`]; the traversal engine consults it before the first byte of a
//! call is written or read.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use crate::binary::Binary;
use crate::error::{Error, Result};

/// Byte width of a fixed-size number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    W1,
    W2,
    W4,
    W8,
    W16,
}

impl Width {
    pub const fn bytes(self) -> usize {
        match self {
            Self::W1 => 1,
            Self::W2 => 2,
            Self::W4 => 4,
            Self::W8 => 8,
            Self::W16 => 16,
        }
    }
}

/// How a type is traversed and laid out on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Bool,
    Int(Width),
    UInt(Width),
    Float(Width),
    /// UTF-8 text, length supplied by a designator.
    Text,
    /// Raw bytes, length supplied by a designator.
    Bytes,
    /// Element sequence. `len` is `Some` for fixed-size arrays.
    Sequence { element: Box<Shape>, len: Option<usize> },
    Aggregate(AggregateShape),
    /// Optional referent; absence is encoded as the referent's zero value.
    Optional(Box<Shape>),
    /// Layout owned by a [`CustomCodec`](crate::CustomCodec).
    Custom { type_name: &'static str },
    /// No binary representation; contributes zero bytes.
    Unsupported { type_name: &'static str },
}

impl Shape {
    /// Returns `true` for shapes whose element count must come from a designator.
    pub fn is_variable_length(&self) -> bool {
        match self {
            Self::Text | Self::Bytes | Self::Sequence { len: None, .. } => true,
            Self::Optional(referent) => referent.is_variable_length(),
            _ => false,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_) | Self::UInt(_))
    }

    /// Exact number of wire bytes, if every value of the type has the same size.
    ///
    /// Custom and variable-length shapes have no static size.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Bool => Some(1),
            Self::Int(width) | Self::UInt(width) | Self::Float(width) => Some(width.bytes()),
            Self::Text | Self::Bytes | Self::Custom { .. } => None,
            Self::Sequence { element, len } => element.fixed_size()?.checked_mul((*len)?),
            Self::Aggregate(aggregate) => aggregate
                .wire_fields()
                .try_fold(0usize, |sum, field| sum.checked_add(field.shape.as_ref()?.fixed_size()?)),
            Self::Optional(referent) => referent.fixed_size(),
            Self::Unsupported { .. } => Some(0),
        }
    }

    /// Returns `true` if this shape or any nested shape is [`Shape::Unsupported`].
    pub fn contains_unsupported(&self) -> bool {
        self.first_unsupported().is_some()
    }

    /// Name of the first unsupported type found in declaration order.
    pub fn first_unsupported(&self) -> Option<&'static str> {
        match self {
            Self::Unsupported { type_name } => Some(*type_name),
            Self::Sequence { element, .. } => element.first_unsupported(),
            Self::Optional(referent) => referent.first_unsupported(),
            Self::Aggregate(aggregate) => aggregate
                .wire_fields()
                .find_map(|field| field.shape.as_ref()?.first_unsupported()),
            _ => None,
        }
    }

    /// Checks annotation rules for this shape and everything nested in it.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Aggregate(aggregate) => aggregate.validate(),
            Self::Sequence { element, .. } => element.validate(),
            Self::Optional(referent) => referent.validate(),
            _ => Ok(()),
        }
    }
}

/// Per-field annotation attached with `#[sbin(...)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    None,
    /// `#[sbin(skip)]`: the field never reaches the wire.
    Exclude,
    /// `#[sbin(len_of = "...")]`: the decoded value is the element count of
    /// the field at `target` (a declaration index).
    LengthOf { target: usize },
}

/// Static reflection data for one aggregate field.
///
/// Field identifiers are declaration indices; they double as the keys of the
/// decode-time [`LengthTable`](crate::LengthTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: &'static str,
    pub index: usize,
    /// `false` for `_`-prefixed fields, which are never encoded.
    pub exported: bool,
    pub annotation: Annotation,
}

impl FieldInfo {
    pub const fn new(name: &'static str, index: usize) -> Self {
        Self {
            name,
            index,
            exported: true,
            annotation: Annotation::None,
        }
    }

    pub const fn private(mut self) -> Self {
        self.exported = false;
        self
    }

    pub const fn excluded(mut self) -> Self {
        self.annotation = Annotation::Exclude;
        self
    }

    pub const fn length_of(mut self, target: usize) -> Self {
        self.annotation = Annotation::LengthOf { target };
        self
    }

    /// Returns `true` if the field occupies bytes on the wire.
    pub const fn on_wire(&self) -> bool {
        self.exported && !matches!(self.annotation, Annotation::Exclude)
    }
}

/// A field together with its shape. `shape` is `None` for fields that never
/// reach the wire, whose types need not be [`Binary`] at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub info: FieldInfo,
    pub shape: Option<Shape>,
}

/// Ordered fields of a struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateShape {
    pub name: &'static str,
    pub fields: Vec<Field>,
}

impl AggregateShape {
    pub fn new(name: &'static str, fields: Vec<Field>) -> Self {
        Self { name, fields }
    }

    /// Fields that occupy bytes, in wire order.
    pub fn wire_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| field.info.on_wire())
    }

    fn invalid(&self, reason: String) -> Error {
        Error::InvalidShape {
            type_name: self.name,
            reason,
        }
    }

    fn validate(&self) -> Result<()> {
        let mut designated = vec![None::<&'static str>; self.fields.len()];

        for (position, field) in self.fields.iter().enumerate() {
            if field.info.index != position {
                return Err(self.invalid(format!(
                    "field `{}` declared at {position} reports index {}",
                    field.info.name, field.info.index
                )));
            }

            if !field.info.on_wire() {
                continue;
            }
            let Some(shape) = &field.shape else {
                return Err(self.invalid(format!(
                    "field `{}` is on the wire but has no shape",
                    field.info.name
                )));
            };
            shape
                .validate()
                .map_err(|e| e.in_field(self.name, field.info.name))?;

            let Annotation::LengthOf { target } = field.info.annotation else {
                continue;
            };
            let designator = field.info.name;
            if !shape.is_integer() {
                return Err(self.invalid(format!(
                    "length designator `{designator}` is not an integer"
                )));
            }
            let Some(target_field) = self.fields.get(target) else {
                return Err(self.invalid(format!(
                    "length designator `{designator}` names a field that does not exist"
                )));
            };
            let target_name = target_field.info.name;
            if target <= position {
                return Err(self.invalid(format!(
                    "length designator `{designator}` must precede `{target_name}`"
                )));
            }
            if !target_field.info.on_wire() {
                return Err(self.invalid(format!(
                    "length designator `{designator}` names `{target_name}`, which is not encoded"
                )));
            }
            if !target_field
                .shape
                .as_ref()
                .is_some_and(Shape::is_variable_length)
            {
                return Err(self.invalid(format!(
                    "`{target_name}` has a fixed size and cannot take a length from `{designator}`"
                )));
            }
            if let Some(previous) = designated[target].replace(designator) {
                return Err(self.invalid(format!(
                    "`{target_name}` has two length designators: `{previous}` and `{designator}`"
                )));
            }
        }
        Ok(())
    }
}

static SHAPES: LazyLock<RwLock<HashMap<TypeId, Arc<Shape>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Returns the validated shape of `T`, deriving and caching it on first use.
///
/// Invalid shapes are reported every time and never cached. A shape that
/// contains [`Shape::Unsupported`] is logged once, when it is first cached.
pub fn shape_of<T: Binary>() -> Result<Arc<Shape>> {
    let id = TypeId::of::<T>();
    if let Some(shape) = SHAPES.read().get(&id) {
        return Ok(Arc::clone(shape));
    }

    let shape = T::shape();
    shape.validate()?;
    if let Some(unsupported) = shape.first_unsupported() {
        log::warn!(
            "{} contains `{unsupported}`, which is skipped on the wire",
            std::any::type_name::<T>()
        );
    }

    let mut shapes = SHAPES.write();
    Ok(Arc::clone(shapes.entry(id).or_insert_with(|| Arc::new(shape))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &'static str, index: usize, shape: Shape) -> Field {
        Field {
            info: FieldInfo::new(name, index),
            shape: Some(shape),
        }
    }

    fn sized_payload() -> AggregateShape {
        AggregateShape::new(
            "Frame",
            vec![
                Field {
                    info: FieldInfo::new("size", 0).length_of(1),
                    shape: Some(Shape::UInt(Width::W4)),
                },
                field("payload", 1, Shape::Bytes),
            ],
        )
    }

    #[test]
    fn test_fixed_size_of_static_layout() {
        let shape = Shape::Aggregate(AggregateShape::new(
            "Point",
            vec![
                field("x", 0, Shape::Float(Width::W8)),
                field("flags", 1, Shape::Sequence {
                    element: Box::new(Shape::UInt(Width::W1)),
                    len: Some(4),
                }),
                Field {
                    info: FieldInfo::new("cache", 2).excluded(),
                    shape: None,
                },
            ],
        ));
        assert_eq!(shape.fixed_size(), Some(12));
    }

    #[test]
    fn test_variable_length_has_no_fixed_size() {
        let shape = Shape::Aggregate(sized_payload());
        assert_eq!(shape.fixed_size(), None);
        assert!(Shape::Optional(Box::new(Shape::Text)).is_variable_length());
        assert!(
            !Shape::Sequence {
                element: Box::new(Shape::Bool),
                len: Some(2)
            }
            .is_variable_length()
        );
    }

    #[test]
    fn test_valid_designator() {
        assert!(Shape::Aggregate(sized_payload()).validate().is_ok());
    }

    #[test]
    fn test_designator_after_target_is_rejected() {
        let shape = Shape::Aggregate(AggregateShape::new(
            "Frame",
            vec![
                field("payload", 0, Shape::Bytes),
                Field {
                    info: FieldInfo::new("size", 1).length_of(0),
                    shape: Some(Shape::UInt(Width::W4)),
                },
            ],
        ));
        let err = shape.validate().unwrap_err();
        assert!(err.to_string().contains("must precede `payload`"), "{err}");
    }

    #[test]
    fn test_two_designators_for_one_target_are_rejected() {
        let mut aggregate = sized_payload();
        aggregate.fields.insert(1, Field {
            info: FieldInfo::new("size_again", 1).length_of(2),
            shape: Some(Shape::UInt(Width::W2)),
        });
        aggregate.fields[0].info = FieldInfo::new("size", 0).length_of(2);
        aggregate.fields[2].info.index = 2;

        let err = Shape::Aggregate(aggregate).validate().unwrap_err();
        assert!(err.to_string().contains("two length designators"), "{err}");
    }

    #[test]
    fn test_missing_target_and_fixed_target_are_rejected() {
        let mut aggregate = sized_payload();
        aggregate.fields[0].info = FieldInfo::new("size", 0).length_of(7);
        assert!(Shape::Aggregate(aggregate).validate().is_err());

        let mut aggregate = sized_payload();
        aggregate.fields[1].shape = Some(Shape::UInt(Width::W8));
        assert!(Shape::Aggregate(aggregate).validate().is_err());
    }

    #[test]
    fn test_non_integer_designator_is_rejected() {
        let mut aggregate = sized_payload();
        aggregate.fields[0].shape = Some(Shape::Float(Width::W4));
        assert!(Shape::Aggregate(aggregate).validate().is_err());
    }

    #[test]
    fn test_first_unsupported_skips_excluded_fields() {
        let aggregate = AggregateShape::new(
            "Holder",
            vec![
                Field {
                    info: FieldInfo::new("hidden", 0).excluded(),
                    shape: Some(Shape::Unsupported { type_name: "Hidden" }),
                },
                field("marker", 1, Shape::Unsupported { type_name: "()" }),
            ],
        );
        assert_eq!(Shape::Aggregate(aggregate).first_unsupported(), Some("()"));
    }

    #[test]
    fn test_shape_of_is_cached() {
        let first = shape_of::<u32>().unwrap();
        let second = shape_of::<u32>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, Shape::UInt(Width::W4));
    }
}
