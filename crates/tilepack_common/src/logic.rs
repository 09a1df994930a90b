//! Single truth-table bits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One bit of a truth table or bit-vector parameter.
///
/// Synthesized tables are usually fully defined, but parameters read from a
/// netlist may carry `X` or `Z`, and packing must carry those through untouched.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Logic {
    /// Low.
    Zero = 0,
    /// High.
    One = 1,
    /// Unknown.
    X = 2,
    /// High impedance.
    Z = 3,
}

impl Logic {
    /// Parses `0`, `1`, `x`/`X` or `z`/`Z`.
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c.to_ascii_uppercase() {
            '0' => Logic::Zero,
            '1' => Logic::One,
            'X' => Logic::X,
            'Z' => Logic::Z,
            _ => return None,
        })
    }

    /// `One` for `true`, `Zero` for `false`.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Decodes the low two bits of `code` using the `#[repr(u8)]` discriminants.
    pub(crate) fn from_code(code: u64) -> Self {
        match code & 0b11 {
            0 => Logic::Zero,
            1 => Logic::One,
            2 => Logic::X,
            _ => Logic::Z,
        }
    }

    /// `Some(bool)` for `Zero`/`One`, `None` for `X`/`Z`.
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Logic::Zero => Some(false),
            Logic::One => Some(true),
            Logic::X | Logic::Z => None,
        }
    }

    /// The character [`from_char`](Self::from_char) accepts for this value.
    pub fn as_char(self) -> char {
        ['0', '1', 'X', 'Z'][self as usize]
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
