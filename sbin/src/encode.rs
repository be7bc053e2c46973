//! Encode direction of the traversal engine.

use std::io::Write;

use crate::binary::{Aggregate, Binary, Sequence, View};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::order::ByteOrder;
use crate::primitive::write_primitive;
use crate::shape::shape_of;

/// Writes values to one underlying stream.
///
/// No framing is added: each call appends exactly the bytes of the value, so
/// several values can be written back to back and read with matching
/// [`Decoder::decode`](crate::Decoder::decode) calls.
pub struct Encoder<W> {
    writer: W,
    config: Config,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, Config::default())
    }

    pub fn with_config(writer: W, config: Config) -> Self {
        Self { writer, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encodes `value` using `order` for every multi-byte number.
    ///
    /// On error, bytes already written for earlier fields stay in the stream.
    pub fn encode<T: Binary>(&mut self, value: &T, order: ByteOrder) -> Result<()> {
        let shape = shape_of::<T>()?;
        self.config.admit(&shape)?;
        log::trace!("encoding {} ({order:?})", std::any::type_name::<T>());
        encode_value(value, &mut self.writer, order)
    }
}

/// Encodes `value` into a fresh buffer.
pub fn to_bytes<T: Binary>(value: &T, order: ByteOrder) -> Result<Vec<u8>> {
    let capacity = shape_of::<T>()?.fixed_size().unwrap_or(0);
    let mut encoder = Encoder::new(Vec::with_capacity(capacity));
    encoder.encode(value, order)?;
    Ok(encoder.into_inner())
}

pub(crate) fn encode_value(
    value: &dyn Binary,
    writer: &mut dyn Write,
    order: ByteOrder,
) -> Result<()> {
    match value.view() {
        View::Custom(codec) => codec.encode(writer, order),
        View::Primitive(primitive) => write_primitive(writer, order, primitive),
        // Length travels in a sibling designator, never in-band.
        View::Text(text) => write_raw(writer, text.as_bytes()),
        View::Bytes(bytes) => write_raw(writer, bytes),
        View::Sequence(sequence) => encode_sequence(sequence, writer, order),
        View::Aggregate(aggregate) => encode_aggregate(aggregate, writer, order),
        View::Optional(optional) => {
            optional
                .visit_or_zero(&mut |referent: &dyn Binary| encode_value(referent, writer, order))
        }
        View::Unsupported(type_name) => {
            log::trace!("skipping unsupported `{type_name}`");
            Ok(())
        }
    }
}

fn write_raw(writer: &mut dyn Write, bytes: &[u8]) -> Result<()> {
    writer.write_all(bytes)?;
    Ok(())
}

fn encode_sequence(
    sequence: &dyn Sequence,
    writer: &mut dyn Write,
    order: ByteOrder,
) -> Result<()> {
    for index in 0..sequence.len() {
        if let Some(element) = sequence.element(index) {
            encode_value(element, writer, order).map_err(|e| e.in_element(index))?;
        }
    }
    Ok(())
}

fn encode_aggregate(
    aggregate: &dyn Aggregate,
    writer: &mut dyn Write,
    order: ByteOrder,
) -> Result<()> {
    let name = aggregate.aggregate_name();
    for info in aggregate.field_infos().iter().filter(|info| info.on_wire()) {
        let field = aggregate
            .field(info.index)
            .ok_or_else(|| Error::missing_field(name, info.name))?;
        encode_value(field, writer, order).map_err(|e| e.in_field(name, info.name))?;
    }
    Ok(())
}
