//! Four-valued 4-bit signal values.
//!
//! A [`Signal`] carries four bits, each of which is LOW, HIGH or UNDEFINED.
//! Internally it is a value nibble plus a defined-mask nibble: a bit whose mask
//! bit is clear is undefined, and its value bit is ignored by equality,
//! hashing and formatting.
//!
//! ```
//! use modsim_core::{Bit, Signal};
//!
//! let s: Signal = "1x01".parse().unwrap();
//! assert_eq!(s.bit(3), Bit::High);
//! assert_eq!(s.bit(2), Bit::Undefined);
//! assert_eq!(s.resolve_pull(Signal::from_uint(0b0100)).to_uint(), 0b1101);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const NIBBLE: u8 = 0xF;

/// The state of a single signal bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bit {
    /// Driven low.
    Low,
    /// Driven high.
    High,
    /// Not driven.
    Undefined,
}

impl Bit {
    /// `High` for `true`, `Low` for `false`.
    #[inline]
    pub fn from_bool(b: bool) -> Self {
        if b { Bit::High } else { Bit::Low }
    }

    /// Returns `true` unless the bit is undefined.
    #[inline]
    pub fn is_defined(self) -> bool {
        self != Bit::Undefined
    }

    /// Combines two bits that land on the same wire.
    ///
    /// An undefined bit yields to the other one. Two defined bits are ORed,
    /// so a LOW/HIGH conflict resolves to HIGH instead of being reported.
    #[inline]
    pub fn merge(a: Bit, b: Bit) -> Bit {
        match (a, b) {
            (Bit::Undefined, other) | (other, Bit::Undefined) => other,
            (Bit::High, _) | (_, Bit::High) => Bit::High,
            _ => Bit::Low,
        }
    }

    fn to_char(self) -> char {
        match self {
            Bit::Low => '0',
            Bit::High => '1',
            Bit::Undefined => 'x',
        }
    }
}

/// A 4-bit value with a per-bit defined mask.
///
/// `Signal` is a plain `Copy` value: every port read and write copies it.
#[derive(Clone, Copy, Default)]
pub struct Signal {
    value: u8,
    mask: u8,
}

impl Signal {
    /// A signal with every bit undefined.
    #[inline]
    pub const fn undefined() -> Self {
        Self { value: 0, mask: 0 }
    }

    /// Low four bits of `n`, all defined.
    #[inline]
    pub const fn from_uint(n: u32) -> Self {
        Self {
            value: (n as u8) & NIBBLE,
            mask: NIBBLE,
        }
    }

    /// Signed encoding: bits 0-2 from `n & 7`, bit 3 is the sign.
    #[inline]
    pub const fn from_int(n: i32) -> Self {
        let low = (n & 7) as u8;
        let sign = if n < 0 { 0b1000 } else { 0 };
        Self {
            value: low | sign,
            mask: NIBBLE,
        }
    }

    /// Builds a fully defined signal from booleans, most significant first.
    pub const fn from_bools(b3: bool, b2: bool, b1: bool, b0: bool) -> Self {
        Self {
            value: (b3 as u8) << 3 | (b2 as u8) << 2 | (b1 as u8) << 1 | b0 as u8,
            mask: NIBBLE,
        }
    }

    /// Builds a signal from four bits, most significant first.
    pub fn new(b3: Bit, b2: Bit, b1: Bit, b0: Bit) -> Self {
        Self::from_bits([b0, b1, b2, b3])
    }

    /// Builds a signal from bits indexed by position (`bits[0]` is bit 0).
    pub fn from_bits(bits: [Bit; 4]) -> Self {
        let mut s = Self::undefined();
        for (i, b) in bits.into_iter().enumerate() {
            s.set_bit(i, b);
        }
        s
    }

    /// Raw constructor. Value bits outside `mask` are dropped.
    #[inline]
    pub const fn from_raw(value: u8, mask: u8) -> Self {
        let mask = mask & NIBBLE;
        Self {
            value: value & mask,
            mask,
        }
    }

    /// The value nibble. Undefined bits read as 0.
    #[inline]
    pub fn value(self) -> u8 {
        self.value & self.mask
    }

    /// The defined-mask nibble.
    #[inline]
    pub fn mask(self) -> u8 {
        self.mask
    }

    /// State of bit `i` (0 = least significant).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    pub fn bit(self, i: usize) -> Bit {
        assert!(i < 4, "bit index {i} out of range");
        if self.mask & (1 << i) == 0 {
            Bit::Undefined
        } else if self.value & (1 << i) == 0 {
            Bit::Low
        } else {
            Bit::High
        }
    }

    /// All four bits, `bits()[0]` being bit 0.
    pub fn bits(self) -> [Bit; 4] {
        [self.bit(0), self.bit(1), self.bit(2), self.bit(3)]
    }

    /// `true` if bit `i` is defined and HIGH.
    #[inline]
    pub fn is_high(self, i: usize) -> bool {
        self.bit(i) == Bit::High
    }

    /// Sets bit `i`. `Bit::Undefined` clears its defined flag.
    pub fn set_bit(&mut self, i: usize, b: Bit) {
        assert!(i < 4, "bit index {i} out of range");
        let m = 1u8 << i;
        match b {
            Bit::Undefined => {
                self.mask &= !m;
                self.value &= !m;
            }
            Bit::Low => {
                self.mask |= m;
                self.value &= !m;
            }
            Bit::High => {
                self.mask |= m;
                self.value |= m;
            }
        }
    }

    /// Copy of `self` with bit `i` set to `b`.
    #[must_use]
    pub fn with_bit(mut self, i: usize, b: Bit) -> Self {
        self.set_bit(i, b);
        self
    }

    /// Overwrites bit `i` with `b` unless `b` is undefined.
    pub fn resolve_bit(&mut self, i: usize, b: Bit) {
        if b.is_defined() {
            self.set_bit(i, b);
        }
    }

    /// Fills every undefined bit from `pull`; the result is fully defined.
    ///
    /// Bits left undefined in `pull` read as LOW.
    #[must_use]
    pub fn resolve_pull(self, pull: Signal) -> Self {
        let value = (self.value & self.mask) | (!self.mask & pull.value & pull.mask);
        Self {
            value: value & NIBBLE,
            mask: NIBBLE,
        }
    }

    /// Unsigned interpretation of the value nibble, ignoring the mask.
    #[inline]
    pub fn to_uint(self) -> u32 {
        u32::from(self.value & self.mask)
    }

    /// `true` when all four bits are defined.
    #[inline]
    pub fn is_defined(self) -> bool {
        self.mask == NIBBLE
    }

    /// `true` when at least one bit is defined.
    #[inline]
    pub fn any_defined(self) -> bool {
        self.mask != 0
    }

    /// A fully defined signal of four copies of `b` (undefined stays undefined).
    pub fn splat(b: Bit) -> Self {
        Self::from_bits([b; 4])
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.mask == other.mask && (self.value & self.mask) == (other.value & other.mask)
    }
}

impl Eq for Signal {}

impl Hash for Signal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mask.hash(state);
        (self.value & self.mask).hash(state);
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..4).rev() {
            write!(f, "{}", self.bit(i).to_char())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal({self})")
    }
}

/// Error returned when parsing a [`Signal`] from text fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid signal literal {0:?}: expected 4 characters of 0, 1 or x")]
pub struct ParseSignalError(pub String);

impl FromStr for Signal {
    type Err = ParseSignalError;

    /// Parses the `Display` form: four characters, most significant first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.trim().chars().collect();
        if chars.len() != 4 {
            return Err(ParseSignalError(s.to_string()));
        }
        let mut out = Signal::undefined();
        for (pos, c) in chars.iter().enumerate() {
            let b = match c {
                '0' => Bit::Low,
                '1' => Bit::High,
                'x' | 'X' => Bit::Undefined,
                _ => return Err(ParseSignalError(s.to_string())),
            };
            out.set_bit(3 - pos, b);
        }
        Ok(out)
    }
}
