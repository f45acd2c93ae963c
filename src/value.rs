//! Typed cell values and the missing-value kinds of the PX data section.
//!
//! A cell is either a present number or one of seven "missing" kinds. In the
//! file a missing cell is written as a quoted run of dots, where the dot count
//! selects the kind, or as a quoted dash for [`DataValueType::Nill`]. The
//! numbering below is part of the file format and must not change.

use bigdecimal::BigDecimal;
use std::fmt;
use std::ops::{Add, Mul};

/// Kind of a cell value. `Exists` is the only kind that carries a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum DataValueType {
    #[default]
    Exists = 0,
    /// `"."`
    Missing = 1,
    /// `".."`
    CanNotRepresent = 2,
    /// `"..."`
    Confidential = 3,
    /// `"...."`
    NotAcquired = 4,
    /// `"....."`
    NotAsked = 5,
    /// `"......"`
    Empty = 6,
    /// `"-"`
    Nill = 7,
}

/// All missing kinds in code order.
pub const MISSING_KINDS: [DataValueType; 7] = [
    DataValueType::Missing,
    DataValueType::CanNotRepresent,
    DataValueType::Confidential,
    DataValueType::NotAcquired,
    DataValueType::NotAsked,
    DataValueType::Empty,
    DataValueType::Nill,
];

impl DataValueType {
    /// Map a quoted dot count (1..=6) to its missing kind.
    #[inline]
    pub fn from_dot_count(dots: usize) -> Option<Self> {
        match dots {
            1 => Some(Self::Missing),
            2 => Some(Self::CanNotRepresent),
            3 => Some(Self::Confidential),
            4 => Some(Self::NotAcquired),
            5 => Some(Self::NotAsked),
            6 => Some(Self::Empty),
            _ => None,
        }
    }

    /// The numeric code of this kind.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_missing(self) -> bool {
        self != Self::Exists
    }

    /// The quoted symbol used for this kind in a data section.
    ///
    /// `Exists` has no symbol and returns an empty string.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Exists => "",
            Self::Missing => "\".\"",
            Self::CanNotRepresent => "\"..\"",
            Self::Confidential => "\"...\"",
            Self::NotAcquired => "\"....\"",
            Self::NotAsked => "\".....\"",
            Self::Empty => "\"......\"",
            Self::Nill => "\"-\"",
        }
    }
}

/// A double-precision cell value tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DoubleDataValue {
    pub value: f64,
    pub kind: DataValueType,
}

impl DoubleDataValue {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            kind: DataValueType::Exists,
        }
    }

    /// A missing value of the given kind. The magnitude is zero.
    pub fn missing(kind: DataValueType) -> Self {
        Self { value: 0.0, kind }
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.kind == DataValueType::Exists
    }

    fn combine(self, rhs: Self, op: impl FnOnce(f64, f64) -> f64) -> Self {
        if self.is_present() && rhs.is_present() {
            Self::new(op(self.value, rhs.value))
        } else {
            Self::missing(self.kind.max(rhs.kind))
        }
    }
}

impl From<f64> for DoubleDataValue {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for DoubleDataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_present() {
            write!(f, "{}", self.value)
        } else {
            f.write_str(self.kind.symbol())
        }
    }
}

/// An arbitrary-precision decimal cell value tagged with its kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecimalDataValue {
    pub value: BigDecimal,
    pub kind: DataValueType,
}

impl DecimalDataValue {
    pub fn new(value: BigDecimal) -> Self {
        Self {
            value,
            kind: DataValueType::Exists,
        }
    }

    pub fn missing(kind: DataValueType) -> Self {
        Self {
            value: BigDecimal::from(0),
            kind,
        }
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.kind == DataValueType::Exists
    }

    fn combine(self, rhs: Self, op: impl FnOnce(BigDecimal, BigDecimal) -> BigDecimal) -> Self {
        if self.is_present() && rhs.is_present() {
            Self::new(op(self.value, rhs.value))
        } else {
            Self::missing(self.kind.max(rhs.kind))
        }
    }
}

impl fmt::Display for DecimalDataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_present() {
            write!(f, "{}", self.value)
        } else {
            f.write_str(self.kind.symbol())
        }
    }
}

// Missing dominates: any missing operand yields a missing result of the larger kind.
impl Add for DoubleDataValue {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.combine(rhs, |a, b| a + b)
    }
}

impl Mul for DoubleDataValue {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.combine(rhs, |a, b| a * b)
    }
}

impl Add for DecimalDataValue {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.combine(rhs, |a, b| a + b)
    }
}

impl Mul for DecimalDataValue {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.combine(rhs, |a, b| a * b)
    }
}

/// Values that can be summed or multiplied into a new dimension value.
pub trait Numeric: Clone + Add<Output = Self> + Mul<Output = Self> {
    /// Additive identity.
    fn zero() -> Self;
    /// Multiplicative identity.
    fn one() -> Self;
}

impl Numeric for f64 {
    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
}

impl Numeric for DoubleDataValue {
    fn zero() -> Self {
        Self::new(0.0)
    }
    fn one() -> Self {
        Self::new(1.0)
    }
}

impl Numeric for DecimalDataValue {
    fn zero() -> Self {
        Self::new(BigDecimal::from(0))
    }
    fn one() -> Self {
        Self::new(BigDecimal::from(1))
    }
}

/// Caller-chosen raw `f64` sentinels for each missing kind.
///
/// Used by the unsafe-double decoding path so hot numeric loops can work on
/// plain `f64` buffers without a tagged value type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissingValueEncodings {
    encodings: [f64; 7],
}

impl Default for MissingValueEncodings {
    fn default() -> Self {
        Self::nan_payloads()
    }
}

impl MissingValueEncodings {
    /// Build a table from one sentinel per missing kind, in code order
    /// (`Missing` first, `Nill` last).
    pub fn new(encodings: [f64; 7]) -> Self {
        Self { encodings }
    }

    /// Distinct quiet NaNs whose payload is the missing kind code.
    pub fn nan_payloads() -> Self {
        let mut encodings = [0.0; 7];
        for (slot, kind) in encodings.iter_mut().zip(MISSING_KINDS) {
            *slot = f64::from_bits(0x7FF8_0000_0000_0000 | kind.code() as u64);
        }
        Self { encodings }
    }

    /// Sentinel for `kind`. `Exists` has no sentinel and yields NaN.
    #[inline]
    pub fn get(&self, kind: DataValueType) -> f64 {
        match kind {
            DataValueType::Exists => f64::NAN,
            k => self.encodings[k.code() as usize - 1],
        }
    }

    /// Reverse lookup comparing bit patterns, so NaN payloads are distinguished.
    pub fn kind_of(&self, value: f64) -> DataValueType {
        let bits = value.to_bits();
        MISSING_KINDS
            .iter()
            .zip(self.encodings.iter())
            .find(|(_, e)| e.to_bits() == bits)
            .map(|(k, _)| *k)
            .unwrap_or(DataValueType::Exists)
    }
}
