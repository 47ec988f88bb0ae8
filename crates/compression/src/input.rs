//! Boundary argument for the buffer operations.

use crate::{Error, Result};
use bytes::Bytes;
use serde_json::Value;

/// The first argument of `compress` / `decompress`, before validation.
///
/// Only [`Input::Buffer`] ever reaches a codec. Anything else is carried
/// as a JSON value so callers bridging from dynamically typed hosts can
/// hand it over unchanged and receive `InvalidInputType` back.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// A concrete byte buffer
    Buffer(Bytes),
    /// Any other value
    Other(Value),
}

impl Input {
    /// Map to the buffer, or to `InvalidInputType` for anything else.
    pub fn validate(self) -> Result<Bytes> {
        let found = self.type_name();
        match self {
            Self::Buffer(bytes) => Ok(bytes),
            Self::Other(_) => Err(Error::InvalidInputType { found }),
        }
    }

    /// Type name used in diagnostics and `InvalidInputType`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Buffer(_) => "buffer",
            Self::Other(value) => json_type_name(value),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<Bytes> for Input {
    fn from(bytes: Bytes) -> Self {
        Self::Buffer(bytes)
    }
}

impl From<Vec<u8>> for Input {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffer(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Input {
    fn from(bytes: &[u8]) -> Self {
        Self::Buffer(Bytes::copy_from_slice(bytes))
    }
}

impl<const N: usize> From<[u8; N]> for Input {
    fn from(bytes: [u8; N]) -> Self {
        Self::Buffer(Bytes::copy_from_slice(&bytes))
    }
}

impl<const N: usize> From<&[u8; N]> for Input {
    fn from(bytes: &[u8; N]) -> Self {
        Self::Buffer(Bytes::copy_from_slice(bytes))
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Self::Other(value)
    }
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Self::Other(Value::String(s.to_owned()))
    }
}

impl From<String> for Input {
    fn from(s: String) -> Self {
        Self::Other(Value::String(s))
    }
}

impl From<()> for Input {
    fn from((): ()) -> Self {
        Self::Other(Value::Null)
    }
}

macro_rules! other_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Input {
                fn from(v: $t) -> Self {
                    Self::Other(Value::from(v))
                }
            }
        )*
    };
}

other_from!(bool, i32, i64, u32, u64, f64);
