//! Error types for the brotli buffer operations.
//!
//! Every failure an operation can produce is one of two kinds:
//! - [`ErrorKind::InvalidInputType`]: the primary argument was not a byte buffer
//! - [`ErrorKind::Codec`]: the codec rejected the parameters or the stream
//!
//! Both are delivered through the completion callback, never returned from
//! the dispatching call itself.

use std::fmt;
use thiserror::Error;

/// Result type alias for buffer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors delivered to a completion callback.
#[derive(Debug, Error)]
pub enum Error {
    /// The input was not a byte buffer; the codec was never invoked.
    #[error("input must be a byte buffer, got {found}")]
    InvalidInputType {
        /// Type name of the rejected value
        found: &'static str,
    },

    /// The codec failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInputType { .. } => ErrorKind::InvalidInputType,
            Self::Codec(_) => ErrorKind::Codec,
        }
    }

    /// The underlying codec error, if any.
    pub fn as_codec(&self) -> Option<&CodecError> {
        match self {
            Self::Codec(e) => Some(e),
            Self::InvalidInputType { .. } => None,
        }
    }
}

/// Error classification for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Primary argument was not a byte buffer
    InvalidInputType = 6001,
    /// Native codec failure
    Codec = 9001,
}

impl ErrorKind {
    /// Get the numeric code
    pub fn code(&self) -> u32 {
        *self as u32
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Failures raised by a [`Codec`](crate::Codec) implementation.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An encoder parameter is outside the range the codec accepts
    #[error("invalid {name}: {value} (expected {expected})")]
    InvalidParameter {
        /// Parameter name as it appears in the options
        name: &'static str,
        /// Rejected value
        value: i64,
        /// Human-readable accepted range
        expected: &'static str,
    },

    /// The input is not a valid compressed stream
    #[error("corrupt or truncated stream: {0}")]
    Corrupt(String),

    /// IO error raised while driving the codec
    #[error("codec IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The codec panicked on a worker thread
    #[error("codec panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        assert_eq!(ErrorKind::InvalidInputType.to_string(), "E6001");
        assert_eq!(ErrorKind::Codec.to_string(), "E9001");
    }

    #[test]
    fn test_codec_error_is_transparent() {
        let err = Error::from(CodecError::Corrupt("bad header".into()));
        assert_eq!(err.kind(), ErrorKind::Codec);
        assert_eq!(err.to_string(), "corrupt or truncated stream: bad header");
        assert!(err.as_codec().is_some());
    }

    #[test]
    fn test_invalid_input_message() {
        let err = Error::InvalidInputType { found: "string" };
        assert_eq!(err.kind(), ErrorKind::InvalidInputType);
        assert!(err.to_string().contains("string"));
        assert!(err.as_codec().is_none());
    }
}
