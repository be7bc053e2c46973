//! Decode direction of the traversal engine.
//!
//! Decoding mutates an existing value in place. Struct fields are visited in
//! declaration order with a fresh [`LengthTable`] per struct instance: when a
//! `len_of` designator has been read, its value is recorded under the target
//! field's index and handed down when that field is reached.

use std::io::Read;

use crate::binary::{Aggregate, Binary, Sequence, View, ViewMut};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::length::{LengthTable, element_count};
use crate::order::ByteOrder;
use crate::primitive::read_primitive;
use crate::shape::{Annotation, shape_of};

/// Reads values from one underlying stream.
///
/// `decode` may be called repeatedly; each call consumes exactly the bytes of
/// one value and leaves the rest of the stream untouched.
pub struct Decoder<R> {
    reader: R,
    config: Config,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, Config::default())
    }

    pub fn with_config(reader: R, config: Config) -> Self {
        Self { reader, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Decodes into `target` using `order` for every multi-byte number.
    ///
    /// There is no rollback: on error, bytes consumed for earlier fields stay
    /// consumed and `target` may be partially overwritten.
    pub fn decode<T: Binary>(&mut self, target: &mut T, order: ByteOrder) -> Result<()> {
        let shape = shape_of::<T>()?;
        self.config.admit(&shape)?;
        log::trace!("decoding {} ({order:?})", std::any::type_name::<T>());

        let mut walk = DecodeWalk {
            reader: &mut self.reader,
            order,
            config: self.config,
        };
        walk.value(target, None)
    }
}

/// Decodes a `T` from the start of `bytes`. Trailing bytes are ignored.
pub fn from_bytes<T: Binary + Default>(bytes: &[u8], order: ByteOrder) -> Result<T> {
    let mut value = T::default();
    from_bytes_into(bytes, &mut value, order)?;
    Ok(value)
}

/// Decodes into an existing value from the start of `bytes`.
pub fn from_bytes_into<T: Binary>(bytes: &[u8], target: &mut T, order: ByteOrder) -> Result<()> {
    Decoder::new(bytes).decode(target, order)
}

/// Upper bound on elements reserved up front for a designator-sized sequence.
const PREALLOCATE_ELEMENTS: usize = 1024;

struct DecodeWalk<'r> {
    reader: &'r mut dyn Read,
    order: ByteOrder,
    config: Config,
}

impl DecodeWalk<'_> {
    /// Decodes one value. `inherited` is the length a designator supplied for
    /// this value, if any.
    fn value(&mut self, target: &mut dyn Binary, inherited: Option<usize>) -> Result<()> {
        match target.view_mut() {
            ViewMut::Custom(codec) => codec.decode(self.reader, self.order),
            ViewMut::Primitive(slot) => read_primitive(self.reader, self.order, slot),
            ViewMut::Text(text) => {
                *text = String::from_utf8(self.read_variable(inherited)?)?;
                Ok(())
            }
            ViewMut::Bytes(bytes) => {
                *bytes = self.read_variable(inherited)?;
                Ok(())
            }
            ViewMut::ByteArray(array) => {
                let needed = array.len();
                self.reader
                    .read_exact(array)
                    .map_err(|e| Error::from_read(e, needed))
            }
            ViewMut::Sequence(sequence) => self.sequence(sequence, inherited),
            ViewMut::Aggregate(aggregate) => self.aggregate(aggregate),
            // Always present after decoding, whatever was there before.
            ViewMut::Optional(optional) => self.value(optional.fresh(), inherited),
            ViewMut::Unsupported(type_name) => {
                log::trace!("skipping unsupported `{type_name}`");
                Ok(())
            }
        }
    }

    fn resolve(&self, inherited: Option<usize>) -> Result<usize> {
        let len = inherited.ok_or(Error::UnresolvedLength)?;
        self.config.admit_length(len)
    }

    /// Reads exactly the resolved number of bytes.
    ///
    /// The buffer grows with the data actually read, so a corrupt designator
    /// cannot force a huge allocation before the stream runs dry.
    fn read_variable(&mut self, inherited: Option<usize>) -> Result<Vec<u8>> {
        let len = self.resolve(inherited)?;
        let mut buf = Vec::new();
        if len == 0 {
            return Ok(buf);
        }
        (&mut *self.reader)
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| Error::from_read(e, len))?;
        if buf.len() < len {
            return Err(Error::truncated(len));
        }
        Ok(buf)
    }

    fn sequence(&mut self, sequence: &mut dyn Sequence, inherited: Option<usize>) -> Result<()> {
        if let Some(len) = sequence.fixed_len() {
            for index in 0..len {
                if let Some(element) = sequence.element_mut(index) {
                    self.value(element, None).map_err(|e| e.in_element(index))?;
                }
            }
            return Ok(());
        }

        // Elements are appended as they decode, so memory follows the input
        // actually read rather than the designator value.
        let len = self.resolve(inherited)?;
        sequence.clear();
        sequence.reserve(len.min(PREALLOCATE_ELEMENTS));
        for index in 0..len {
            let element = sequence.push_default().ok_or_else(|| Error::InvalidShape {
                type_name: "sequence",
                reason: "variable-length sequence cannot grow".to_string(),
            })?;
            self.value(element, None).map_err(|e| e.in_element(index))?;
        }
        Ok(())
    }

    fn aggregate(&mut self, aggregate: &mut dyn Aggregate) -> Result<()> {
        let name = aggregate.aggregate_name();
        let infos = aggregate.field_infos();
        let mut lengths = LengthTable::new(infos.len());

        for info in infos.iter().filter(|info| info.on_wire()) {
            let field = aggregate
                .field_mut(info.index)
                .ok_or_else(|| Error::missing_field(name, info.name))?;
            self.value(field, lengths.get(info.index))
                .map_err(|e| e.in_field(name, info.name))?;

            if let Annotation::LengthOf { target } = info.annotation {
                let count = match field.view() {
                    View::Primitive(value) => element_count(value),
                    _ => Err(Error::InvalidShape {
                        type_name: name,
                        reason: format!("length designator `{}` is not an integer", info.name),
                    }),
                }
                .map_err(|e| e.in_field(name, info.name))?;
                log::trace!("{name}.{} sets length {count} for field #{target}", info.name);
                lengths.set(target, count);
            }
        }
        Ok(())
    }
}
