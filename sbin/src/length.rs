//! Decode-time length resolution.

use crate::error::{Error, Result};
use crate::primitive::Primitive;

/// Element counts resolved so far within one aggregate instance.
///
/// A table lives exactly as long as the decode of one struct value: nested
/// structs and sibling elements of a sequence each get their own. Entries are
/// keyed by field declaration index and written by `len_of` designators.
#[derive(Debug, Clone, Default)]
pub struct LengthTable {
    lengths: Vec<Option<usize>>,
}

impl LengthTable {
    /// Creates an empty table for an aggregate with `field_count` fields.
    pub fn new(field_count: usize) -> Self {
        Self {
            lengths: vec![None; field_count],
        }
    }

    /// The resolved count for `field`, if a designator has supplied one.
    pub fn get(&self, field: usize) -> Option<usize> {
        self.lengths.get(field).copied().flatten()
    }

    pub fn set(&mut self, field: usize, count: usize) {
        if field >= self.lengths.len() {
            self.lengths.resize(field + 1, None);
        }
        self.lengths[field] = Some(count);
    }
}

/// Converts a decoded designator value into an element count.
///
/// Negative values and values beyond `usize::MAX` are rejected rather than
/// clamped, as are non-integer primitives.
pub fn element_count(value: Primitive) -> Result<usize> {
    if let Primitive::U128(raw) = value {
        return usize::try_from(raw).map_err(|_| Error::LengthOverflow { value: raw });
    }
    let Some(raw) = value.as_integer() else {
        return Err(Error::InvalidShape {
            type_name: "length designator",
            reason: format!("{value:?} is not an integer"),
        });
    };
    usize::try_from(raw).map_err(|_| Error::InvalidLength { value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_field_has_no_length() {
        let table = LengthTable::new(3);
        assert_eq!(table.get(1), None);
        assert_eq!(table.get(10), None);
    }

    #[test]
    fn test_zero_is_a_resolved_length() {
        let mut table = LengthTable::new(2);
        table.set(1, 0);
        assert_eq!(table.get(1), Some(0));
    }

    #[test]
    fn test_set_beyond_initial_size() {
        let mut table = LengthTable::default();
        table.set(4, 9);
        assert_eq!(table.get(4), Some(9));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn test_element_count_conversion() {
        assert_eq!(element_count(Primitive::U32(5)).unwrap(), 5);
        assert_eq!(element_count(Primitive::I8(0)).unwrap(), 0);
        assert!(matches!(
            element_count(Primitive::I32(-1)),
            Err(Error::InvalidLength { value: -1 })
        ));
        assert!(element_count(Primitive::F64(2.0)).is_err());
    }

    #[test]
    fn test_huge_unsigned_count_keeps_its_value() {
        assert!(matches!(
            element_count(Primitive::U128(u128::MAX)),
            Err(Error::LengthOverflow { value: u128::MAX })
        ));
        assert_eq!(element_count(Primitive::U128(3)).unwrap(), 3);
    }
}
