//! Error types for encoding and decoding.

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Errors that can occur while encoding or decoding a value.
///
/// Failures inside an aggregate are wrapped in [`Error::Field`] (and
/// [`Error::Element`] for sequence items) at every level they pass through,
/// so the rendered message reads like a path:
/// `field Request.header: field Header.payload: length of variable-size value is unresolved`.
#[derive(Error, Debug)]
pub enum Error {
    /// A variable-length value was reached without a preceding `len_of` designator.
    #[error("length of variable-size value is unresolved")]
    UnresolvedLength,

    /// The source ended before the `needed` bytes of a value could be read.
    #[error("truncated input, needed {needed} bytes: {source}")]
    Truncated {
        needed: usize,
        #[source]
        source: io::Error,
    },

    /// A designator held a value that is not a valid element count.
    #[error("invalid length value {value}")]
    InvalidLength { value: i128 },

    /// An unsigned designator held a count beyond the address space.
    #[error("length {value} does not fit in memory")]
    LengthOverflow { value: u128 },

    /// A resolved length exceeded [`Config::max_length`](crate::Config::max_length).
    #[error("length {len} exceeds configured limit {max}")]
    LengthLimit { len: usize, max: usize },

    /// Decoded text was not valid UTF-8.
    #[error("invalid UTF-8 text: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),

    /// A type's shape violates the annotation rules.
    #[error("invalid shape for {type_name}: {reason}")]
    InvalidShape {
        type_name: &'static str,
        reason: String,
    },

    /// An unsupported value was met while unsupported shapes are rejected.
    #[error("type {type_name} has no binary representation")]
    Unsupported { type_name: &'static str },

    /// Error reported by a [`CustomCodec`](crate::CustomCodec) implementation.
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),

    /// Underlying stream failure other than end of input.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Failure inside a named field of an aggregate.
    #[error("field {aggregate}.{field}: {inner}")]
    Field {
        aggregate: &'static str,
        field: &'static str,
        inner: Box<Error>,
    },

    /// Failure inside one element of a sequence.
    #[error("element {index}: {inner}")]
    Element { index: usize, inner: Box<Error> },
}

impl Error {
    /// Wraps any error type as a custom codec failure.
    pub fn custom<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Custom(err.into())
    }

    /// Maps a read failure, turning end of input into [`Error::Truncated`].
    pub(crate) fn from_read(err: io::Error, needed: usize) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated {
                needed,
                source: err,
            }
        } else {
            Self::Io(err)
        }
    }

    pub(crate) fn truncated(needed: usize) -> Self {
        Self::Truncated {
            needed,
            source: io::ErrorKind::UnexpectedEof.into(),
        }
    }

    /// An on-wire field whose accessor returned nothing.
    pub(crate) fn missing_field(aggregate: &'static str, field: &'static str) -> Self {
        Self::InvalidShape {
            type_name: aggregate,
            reason: format!("field `{field}` is on the wire but has no accessor"),
        }
    }

    pub(crate) fn in_field(self, aggregate: &'static str, field: &'static str) -> Self {
        Self::Field {
            aggregate,
            field,
            inner: Box::new(self),
        }
    }

    pub(crate) fn in_element(self, index: usize) -> Self {
        Self::Element {
            index,
            inner: Box::new(self),
        }
    }

    /// Returns the innermost error, stripping field and element context.
    pub fn root(&self) -> &Error {
        match self {
            Self::Field { inner, .. } | Self::Element { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// Renders the field/element context as a path, e.g. `Request.header.payload[2]`.
    ///
    /// Returns an empty string for errors raised outside any aggregate.
    pub fn path(&self) -> String {
        let mut path = String::new();
        let mut current = self;
        loop {
            match current {
                Self::Field {
                    aggregate,
                    field,
                    inner,
                } => {
                    if path.is_empty() {
                        path.push_str(aggregate);
                    }
                    path.push('.');
                    path.push_str(field);
                    current = &**inner;
                }
                Self::Element { index, inner } => {
                    path.push_str(&format!("[{index}]"));
                    current = &**inner;
                }
                _ => return path,
            }
        }
    }
}

/// Convenient alias for codec results.
pub type Result<T> = std::result::Result<T, Error>;
