//! Error types for nnkern

use crate::layout::TensorFormat;
use thiserror::Error;

/// Result type alias using nnkern's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the checked slice API
///
/// The raw pointer API never returns errors; its preconditions are
/// debug-asserted instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A buffer length does not match the length implied by the shape
    #[error("Shape mismatch for '{arg}': expected {expected} elements, got {got}")]
    ShapeMismatch {
        /// The argument name
        arg: &'static str,
        /// Length implied by the shape parameters
        expected: usize,
        /// Actual slice length
        got: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Channel count incompatible with the declared tensor format
    #[error("Format {format:?} cannot hold {channels} channels")]
    InvalidFormat {
        /// The declared format
        format: TensorFormat,
        /// The channel count
        channels: usize,
    },

    /// An n-ary operation received too few inputs
    #[error("Operation '{op}' needs at least {min} inputs, got {got}")]
    TooFewInputs {
        /// The operation name
        op: &'static str,
        /// Minimum number of inputs
        min: usize,
        /// Inputs supplied
        got: usize,
    },
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(arg: &'static str, expected: usize, got: usize) -> Self {
        Self::ShapeMismatch { arg, expected, got }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::shape_mismatch("dst", 12, 10);
        assert_eq!(
            err.to_string(),
            "Shape mismatch for 'dst': expected 12 elements, got 10"
        );

        let err = Error::invalid_argument("lower", "must not exceed upper");
        assert_eq!(
            err.to_string(),
            "Invalid argument 'lower': must not exceed upper"
        );

        let err = Error::TooFewInputs {
            op: "eltwise",
            min: 2,
            got: 1,
        };
        assert!(err.to_string().contains("at least 2"));
    }
}
