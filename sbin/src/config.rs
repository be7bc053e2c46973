//! Encoder and decoder configuration.

use crate::error::{Error, Result};
use crate::shape::Shape;

/// What to do with values whose shape is [`Shape::Unsupported`](crate::Shape::Unsupported).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsupportedPolicy {
    /// Write nothing, read nothing, leave the destination untouched.
    #[default]
    Skip,
    /// Fail with [`Error::Unsupported`](crate::Error::Unsupported) before any byte moves.
    Reject,
}

/// Options shared by [`Encoder`](crate::Encoder) and [`Decoder`](crate::Decoder).
///
/// The byte order is deliberately not part of the config: it is passed with
/// every encode and decode call.
///
/// ```ignore
/// let config = Config::new()
///     .with_unsupported(UnsupportedPolicy::Reject)
///     .with_max_length(64 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub unsupported: UnsupportedPolicy,
    /// Upper bound for any designator-supplied length on decode.
    pub max_length: Option<usize>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unsupported(mut self, policy: UnsupportedPolicy) -> Self {
        self.unsupported = policy;
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Checks a top-level shape against the unsupported policy.
    pub(crate) fn admit(&self, shape: &Shape) -> Result<()> {
        match (self.unsupported, shape.first_unsupported()) {
            (UnsupportedPolicy::Reject, Some(type_name)) => Err(Error::Unsupported { type_name }),
            _ => Ok(()),
        }
    }

    /// Checks a designator-supplied length against `max_length`.
    pub(crate) fn admit_length(&self, len: usize) -> Result<usize> {
        match self.max_length {
            Some(max) if len > max => Err(Error::LengthLimit { len, max }),
            _ => Ok(len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_lenient_and_unbounded() {
        let config = Config::new();
        assert_eq!(config.unsupported, UnsupportedPolicy::Skip);
        assert_eq!(config.max_length, None);
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .with_unsupported(UnsupportedPolicy::Reject)
            .with_max_length(16);
        assert_eq!(config.unsupported, UnsupportedPolicy::Reject);
        assert_eq!(config.max_length, Some(16));
    }

    #[test]
    fn test_reject_policy_names_the_type() {
        let shape = Shape::Unsupported { type_name: "()" };
        assert!(Config::new().admit(&shape).is_ok());

        let strict = Config::new().with_unsupported(UnsupportedPolicy::Reject);
        assert!(matches!(
            strict.admit(&shape),
            Err(Error::Unsupported { type_name: "()" })
        ));
    }

    #[test]
    fn test_length_limit() {
        let config = Config::new().with_max_length(4);
        assert_eq!(config.admit_length(4).unwrap(), 4);
        assert!(matches!(
            config.admit_length(5),
            Err(Error::LengthLimit { len: 5, max: 4 })
        ));
    }
}
