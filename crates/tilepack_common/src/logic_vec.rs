//! Truth tables and other bit-vector parameters.

use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;

const BITS_PER_VALUE: u32 = 2;
const VALUES_PER_WORD: u32 = u64::BITS / BITS_PER_VALUE;

/// A fixed-width vector of [`Logic`] values, two bits each.
///
/// Index 0 is the least significant bit. For a LUT initialization vector, bit
/// `i` is the output for the input combination whose binary value is `i`, so
/// a LUT4 table has width 16 and `0x8000` is a four-input AND.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    width: u32,
    words: Vec<u64>,
}

impl LogicVec {
    /// `width` zeros.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            words: vec![0; width.div_ceil(VALUES_PER_WORD) as usize],
        }
    }

    /// Number of values.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Word index and bit shift of value `index`. Panics past the width.
    fn slot(&self, index: u32) -> (usize, u32) {
        assert!(index < self.width, "bit {index} outside a {}-bit vector", self.width);
        (
            (index / VALUES_PER_WORD) as usize,
            (index % VALUES_PER_WORD) * BITS_PER_VALUE,
        )
    }

    /// Value at `index`. Panics if `index >= width()`.
    pub fn get(&self, index: u32) -> Logic {
        let (word, shift) = self.slot(index);
        Logic::from_code(self.words[word] >> shift)
    }

    /// Overwrites the value at `index`. Panics if `index >= width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        let (word, shift) = self.slot(index);
        let cleared = self.words[word] & !(0b11 << shift);
        self.words[word] = cleared | ((value as u64) << shift);
    }

    /// The low `width` bits of `value`; bits past 64 are zero.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in (0..width.min(64)).filter(|i| value >> i & 1 == 1) {
            v.set(i, Logic::One);
        }
        v
    }

    /// The vector as an integer, if it is at most 64 bits wide and fully defined.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        (0..self.width).try_fold(0u64, |acc, i| {
            self.get(i).to_bool().map(|b| acc | (u64::from(b) << i))
        })
    }

    /// Parses binary digits (and `X`/`Z`), most significant first.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let mut v = Self::new(s.len() as u32);
        for (i, c) in s.chars().rev().enumerate() {
            v.set(i as u32, Logic::from_char(c)?);
        }
        Some(v)
    }

    /// Parses hex digits, most significant first, four bits per digit.
    pub fn from_hex_str(s: &str) -> Option<Self> {
        let mut v = Self::new(s.len() as u32 * 4);
        for (digit, c) in s.chars().rev().enumerate() {
            let nibble = c.to_digit(16)?;
            for bit in 0..4 {
                v.set(digit as u32 * 4 + bit, Logic::from_bool(nibble >> bit & 1 == 1));
            }
        }
        Some(v)
    }
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (0..self.width)
            .rev()
            .try_for_each(|i| write!(f, "{}", self.get(i)))
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicVec({self})")
    }
}
