//! Compression options and their resolution from loosely typed values.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Content hint passed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// No assumptions about the input
    Generic = 0,
    /// UTF-8 text
    Text = 1,
    /// WOFF 2.0 font data
    Font = 2,
}

impl Mode {
    /// Parse a mode name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "generic" => Some(Self::Generic),
            "text" => Some(Self::Text),
            "font" => Some(Self::Font),
            _ => None,
        }
    }

    /// Map a raw mode value, if it names a known mode.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(Self::Generic),
            1 => Some(Self::Text),
            2 => Some(Self::Font),
            _ => None,
        }
    }
}

/// Options for a compress call.
///
/// Unset fields fall back to the codec defaults. Values are carried as
/// given; range checks belong to the codec, which reports them as
/// [`CodecError::InvalidParameter`](crate::CodecError::InvalidParameter).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    /// Compression effort, 0 (fastest) to 11 (densest)
    pub quality: Option<i64>,
    /// Content hint, see [`Mode`]
    #[serde(deserialize_with = "deserialize_mode")]
    pub mode: Option<i64>,
    /// Base-2 logarithm of the sliding window size
    pub lgwin: Option<i64>,
    /// Base-2 logarithm of the input block size, 0 selects automatically
    pub lgblock: Option<i64>,
}

impl CompressionOptions {
    /// Options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the quality.
    #[must_use]
    pub fn quality(mut self, quality: i64) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Set the content mode.
    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode as i64);
        self
    }

    /// Set the window size.
    #[must_use]
    pub fn lgwin(mut self, lgwin: i64) -> Self {
        self.lgwin = Some(lgwin);
        self
    }

    /// Set the block size.
    #[must_use]
    pub fn lgblock(mut self, lgblock: i64) -> Self {
        self.lgblock = Some(lgblock);
        self
    }

    /// Resolve options from a loosely typed value.
    ///
    /// Missing, `null` and non-object values mean "no options". Unknown keys
    /// are ignored, and a known key holding the wrong type is treated as
    /// absent. Never fails.
    pub fn resolve(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            return Self::default();
        };

        Self {
            quality: map.get("quality").and_then(integer),
            mode: map.get("mode").and_then(|v| match v {
                Value::String(name) => Mode::from_name(name).map(|m| m as i64),
                other => integer(other),
            }),
            lgwin: map.get("lgwin").and_then(integer),
            lgblock: map.get("lgblock").and_then(integer),
        }
    }

    /// Fill unset fields from `defaults`.
    #[must_use]
    pub fn or(self, defaults: &Self) -> Self {
        Self {
            quality: self.quality.or(defaults.quality),
            mode: self.mode.or(defaults.mode),
            lgwin: self.lgwin.or(defaults.lgwin),
            lgblock: self.lgblock.or(defaults.lgblock),
        }
    }
}

impl From<&Value> for CompressionOptions {
    fn from(value: &Value) -> Self {
        Self::resolve(Some(value))
    }
}

impl From<Option<Value>> for CompressionOptions {
    fn from(value: Option<Value>) -> Self {
        Self::resolve(value.as_ref())
    }
}

/// Integral JSON numbers only; `3.0` counts, `3.5` does not.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

fn deserialize_mode<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Raw(i64),
        Name(String),
    }

    match Option::<Repr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Repr::Raw(raw)) => Ok(Some(raw)),
        Some(Repr::Name(name)) => Mode::from_name(&name)
            .map(|m| Some(m as i64))
            .ok_or_else(|| serde::de::Error::custom(format!("unknown mode: {name}"))),
    }
}
