//! Typed parameter and attribute values.

use serde::{Deserialize, Serialize};
use std::fmt;
use tilepack_common::LogicVec;

/// The value of a cell parameter or attribute.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ParamValue {
    /// An integer value.
    Int(i64),
    /// A bit-vector value, such as a truth table.
    Bits(LogicVec),
    /// An enumerated or free-form string value.
    Str(String),
}

impl ParamValue {
    /// Parses a textual value: `0b...` as a binary bit-vector, `0x...` as a
    /// hex bit-vector, anything else as a string.
    pub fn parse(text: &str) -> Self {
        let bits = if let Some(bin) = text.strip_prefix("0b") {
            LogicVec::from_binary_str(bin)
        } else if let Some(hex) = text.strip_prefix("0x") {
            LogicVec::from_hex_str(hex)
        } else {
            None
        };
        match bits {
            Some(bits) if bits.width() > 0 => ParamValue::Bits(bits),
            _ => ParamValue::Str(text.to_string()),
        }
    }

    /// Returns the integer value, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a bit-vector of the given width.
    ///
    /// `Int` values are truncated or zero-extended; `Bits` values must already
    /// have exactly `width` bits. `Str` values have no bit-vector form.
    pub fn to_bits(&self, width: u32) -> Option<LogicVec> {
        match self {
            ParamValue::Int(v) => Some(LogicVec::from_u64(*v as u64, width)),
            ParamValue::Bits(bits) if bits.width() == width => Some(bits.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Bits(bits) => write!(f, "0b{bits}"),
            ParamValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<LogicVec> for ParamValue {
    fn from(bits: LogicVec) -> Self {
        ParamValue::Bits(bits)
    }
}
