//! Zero-allocation cell value parsing.
//!
//! Two families of parsers live here:
//!
//! - **Validating** parsers (`parse_*`) take raw token bytes, try the standard
//!   numeric parse first and fall back to the quoted missing-value grammar.
//!   Anything else is an [`PxError::InvalidToken`].
//! - **Fast** parsers (`fast_*`) skip all error handling. They only accept a
//!   [`RecognizedToken`], which can only be produced by [`recognize_token`],
//!   so the character-set precondition is checked once by the type system
//!   rather than trusted.
//!
//! Tokens are expected to be delimiter-trimmed: no surrounding whitespace.

use crate::error::{PxError, Result};
use crate::value::{DataValueType, DecimalDataValue, DoubleDataValue, MissingValueEncodings};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::str::FromStr;

/// Exactly representable powers of ten.
const POW10: [f64; 23] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
    1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];

/// Most significant digits accumulated in a `u64` without overflow.
const MAX_FAST_DIGITS: usize = 19;

/// Largest mantissa an `f64` holds exactly.
const MAX_EXACT_MANTISSA: u64 = 1 << 53;

/// Most decimal digits accumulated in an `i128` without overflow.
const MAX_FAST_DECIMAL_DIGITS: usize = 38;

/// A token known to match `-?[0-9]*\.?[0-9]*` with at least one digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericToken<'a> {
    bytes: &'a [u8],
}

/// A cell token that passed [`recognize_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizedToken<'a> {
    Number(NumericToken<'a>),
    Missing(DataValueType),
}

#[inline(always)]
fn split_sign(bytes: &[u8]) -> (bool, &[u8]) {
    match bytes {
        [b'-', rest @ ..] => (true, rest),
        _ => (false, bytes),
    }
}

impl<'a> NumericToken<'a> {
    /// Check the character set: optional leading `-`, digits, at most one `.`.
    #[inline]
    pub fn recognize(bytes: &'a [u8]) -> Option<Self> {
        let (_, digits) = split_sign(bytes);
        let mut seen_dot = false;
        let mut seen_digit = false;
        for &b in digits {
            match b {
                b'0'..=b'9' => seen_digit = true,
                b'.' if !seen_dot => seen_dot = true,
                _ => return None,
            }
        }
        seen_digit.then_some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Accumulate the digits into an `f64`.
    ///
    /// The single division is correctly rounded only while both the mantissa
    /// and the power of ten are exact. Longer mantissas, or more fraction
    /// digits than have an exact power of ten, fall back to the standard
    /// library parser.
    #[inline]
    pub fn to_f64(&self) -> f64 {
        let (negative, digits) = split_sign(self.bytes);
        let mut mantissa: u64 = 0;
        let mut count = 0usize;
        let mut frac = 0usize;
        let mut after_dot = false;
        for &b in digits {
            if b == b'.' {
                after_dot = true;
                continue;
            }
            mantissa = mantissa
                .wrapping_mul(10)
                .wrapping_add(b.wrapping_sub(b'0') as u64);
            count += 1;
            if after_dot {
                frac += 1;
            }
        }
        if count > MAX_FAST_DIGITS || mantissa > MAX_EXACT_MANTISSA || frac >= POW10.len() {
            return std::str::from_utf8(self.bytes)
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(f64::NAN);
        }
        let v = mantissa as f64 / POW10[frac];
        if negative {
            -v
        } else {
            v
        }
    }

    /// Accumulate the digits into a decimal with the token's own scale.
    ///
    /// The mantissa is accumulated in an `i128`; tokens with more than 38
    /// digits build a `BigInt` from the digit bytes instead.
    #[inline]
    pub fn to_decimal(&self) -> BigDecimal {
        let (negative, digits) = split_sign(self.bytes);
        if digits.len() > MAX_FAST_DECIMAL_DIGITS {
            return Self::to_decimal_wide(negative, digits);
        }
        let mut mantissa: i128 = 0;
        let mut scale: i64 = 0;
        let mut after_dot = false;
        for &b in digits {
            if b == b'.' {
                after_dot = true;
                continue;
            }
            mantissa = mantissa
                .wrapping_mul(10)
                .wrapping_add(b.wrapping_sub(b'0') as i128);
            if after_dot {
                scale += 1;
            }
        }
        if negative {
            mantissa = mantissa.wrapping_neg();
        }
        BigDecimal::new(BigInt::from(mantissa), scale)
    }

    #[cold]
    fn to_decimal_wide(negative: bool, digits: &[u8]) -> BigDecimal {
        let scale = digits
            .iter()
            .position(|&b| b == b'.')
            .map_or(0, |dot| digits.len() - dot - 1) as i64;
        let plain: Vec<u8> = digits.iter().copied().filter(|&b| b != b'.').collect();
        // `recognize` guarantees at least one digit and nothing but digits here.
        let magnitude = BigInt::parse_bytes(&plain, 10).unwrap_or_default();
        BigDecimal::new(if negative { -magnitude } else { magnitude }, scale)
    }
}

/// Recognise a quoted missing-value token.
///
/// The token must be 3 to 8 bytes long, start and end with `"`, and contain
/// either a single `-` ([`DataValueType::Nill`]) or 1 to 6 dots.
#[inline]
pub fn parse_missing_token(bytes: &[u8]) -> Option<DataValueType> {
    if !(3..=8).contains(&bytes.len()) || bytes[0] != b'"' || bytes[bytes.len() - 1] != b'"' {
        return None;
    }
    let interior = &bytes[1..bytes.len() - 1];
    if interior == b"-" {
        return Some(DataValueType::Nill);
    }
    if interior.iter().all(|&b| b == b'.') {
        return DataValueType::from_dot_count(interior.len());
    }
    None
}

/// Classify a token as a plain number or a missing-value symbol.
///
/// Returns `None` for anything else, including numbers in exponent notation,
/// which the validating parsers still accept.
#[inline]
pub fn recognize_token(bytes: &[u8]) -> Option<RecognizedToken<'_>> {
    match bytes.first() {
        Some(b'"') => parse_missing_token(bytes).map(RecognizedToken::Missing),
        Some(_) => NumericToken::recognize(bytes).map(RecognizedToken::Number),
        None => None,
    }
}

/// Fast tagged-double decode of a recognised token.
#[inline]
pub fn fast_double_data_value(token: RecognizedToken<'_>) -> DoubleDataValue {
    match token {
        RecognizedToken::Number(n) => DoubleDataValue::new(n.to_f64()),
        RecognizedToken::Missing(kind) => DoubleDataValue::missing(kind),
    }
}

/// Fast decimal decode of a recognised token.
#[inline]
pub fn fast_decimal_data_value(token: RecognizedToken<'_>) -> DecimalDataValue {
    match token {
        RecognizedToken::Number(n) => DecimalDataValue::new(n.to_decimal()),
        RecognizedToken::Missing(kind) => DecimalDataValue::missing(kind),
    }
}

/// Fast raw-double decode; missing kinds become the caller's sentinels.
#[inline]
pub fn fast_unsafe_double(token: RecognizedToken<'_>, missing: &MissingValueEncodings) -> f64 {
    match token {
        RecognizedToken::Number(n) => n.to_f64(),
        RecognizedToken::Missing(kind) => missing.get(kind),
    }
}

fn invalid_token(bytes: &[u8]) -> PxError {
    PxError::InvalidToken(String::from_utf8_lossy(bytes).into_owned())
}

fn parse_standard<T: FromStr>(bytes: &[u8]) -> Option<T> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Parse a token into a tagged double, validating everything.
pub fn parse_double_data_value(bytes: &[u8]) -> Result<DoubleDataValue> {
    if let Some(v) = parse_standard::<f64>(bytes) {
        return Ok(DoubleDataValue::new(v));
    }
    parse_missing_token(bytes)
        .map(DoubleDataValue::missing)
        .ok_or_else(|| invalid_token(bytes))
}

/// Parse a token into a tagged decimal, validating everything.
pub fn parse_decimal_data_value(bytes: &[u8]) -> Result<DecimalDataValue> {
    if let Some(v) = parse_standard::<BigDecimal>(bytes) {
        return Ok(DecimalDataValue::new(v));
    }
    parse_missing_token(bytes)
        .map(DecimalDataValue::missing)
        .ok_or_else(|| invalid_token(bytes))
}

/// Parse a token into a raw double, mapping missing kinds through `missing`.
pub fn parse_unsafe_double(bytes: &[u8], missing: &MissingValueEncodings) -> Result<f64> {
    if let Some(v) = parse_standard::<f64>(bytes) {
        return Ok(v);
    }
    parse_missing_token(bytes)
        .map(|kind| missing.get(kind))
        .ok_or_else(|| invalid_token(bytes))
}

/// Decodes one cell token into the reader's destination type.
///
/// Recognised tokens go through the fast path, everything else through the
/// validating parser so that unusual but legal numbers still decode.
pub trait CellDecoder {
    type Output;

    fn decode(&self, token: &[u8]) -> Result<Self::Output>;
}

/// Decodes into [`DoubleDataValue`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleDecoder;

/// Decodes into [`DecimalDataValue`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalDecoder;

/// Decodes into raw `f64` with missing kinds mapped to sentinels.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsafeDoubleDecoder {
    pub missing: MissingValueEncodings,
}

impl UnsafeDoubleDecoder {
    pub fn new(missing: MissingValueEncodings) -> Self {
        Self { missing }
    }
}

impl CellDecoder for DoubleDecoder {
    type Output = DoubleDataValue;

    #[inline]
    fn decode(&self, token: &[u8]) -> Result<DoubleDataValue> {
        match recognize_token(token) {
            Some(t) => Ok(fast_double_data_value(t)),
            None => parse_double_data_value(token),
        }
    }
}

impl CellDecoder for DecimalDecoder {
    type Output = DecimalDataValue;

    #[inline]
    fn decode(&self, token: &[u8]) -> Result<DecimalDataValue> {
        match recognize_token(token) {
            Some(t) => Ok(fast_decimal_data_value(t)),
            None => parse_decimal_data_value(token),
        }
    }
}

impl CellDecoder for UnsafeDoubleDecoder {
    type Output = f64;

    #[inline]
    fn decode(&self, token: &[u8]) -> Result<f64> {
        match recognize_token(token) {
            Some(t) => Ok(fast_unsafe_double(t, &self.missing)),
            None => parse_unsafe_double(token, &self.missing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dot_counts() {
        for dots in 1..=6 {
            let token = format!("\"{}\"", ".".repeat(dots));
            let kind = parse_missing_token(token.as_bytes()).unwrap();
            assert_eq!(kind.code() as usize, dots);

            let v = parse_double_data_value(token.as_bytes()).unwrap();
            assert_eq!(v.kind, kind);
            assert_eq!(v.value, 0.0);
        }
        assert_eq!(parse_missing_token(b"\"-\""), Some(DataValueType::Nill));
    }

    #[test]
    fn test_missing_rejects_bad_shapes() {
        assert_eq!(parse_missing_token(b"\"\""), None);
        assert_eq!(parse_missing_token(b"\".......\""), None);
        assert_eq!(parse_missing_token(b"\"..x\""), None);
        assert_eq!(parse_missing_token(b"\"--\""), None);
        assert_eq!(parse_missing_token(b"..."), None);
        assert_eq!(parse_missing_token(b"\"...."), None);
    }

    #[test]
    fn test_recognize_numeric() {
        assert!(NumericToken::recognize(b"123").is_some());
        assert!(NumericToken::recognize(b"-12.5").is_some());
        assert!(NumericToken::recognize(b".5").is_some());
        assert!(NumericToken::recognize(b"-").is_none());
        assert!(NumericToken::recognize(b".").is_none());
        assert!(NumericToken::recognize(b"1.2.3").is_none());
        assert!(NumericToken::recognize(b"1e5").is_none());
        assert!(NumericToken::recognize(b"--1").is_none());
        assert!(NumericToken::recognize(b"").is_none());
    }

    #[test]
    fn test_fast_matches_standard_parse() {
        let samples: [&[u8]; 11] = [
            b"0",
            b"1",
            b"-1",
            b"123.25",
            b"-0.5",
            b"1000000",
            b"3.14159",
            b"12345678901234567890123",
            b"9007199254.740993",
            b"-90071992547409.93",
            b"9007199254740993",
        ];
        for s in samples {
            let token = NumericToken::recognize(s).unwrap();
            let expected: f64 = std::str::from_utf8(s).unwrap().parse().unwrap();
            assert_eq!(token.to_f64(), expected, "token {:?}", s);
        }
    }

    #[test]
    fn test_fast_decimal() {
        let token = NumericToken::recognize(b"-12.50").unwrap();
        assert_eq!(token.to_decimal(), BigDecimal::from_str("-12.50").unwrap());
        let token = NumericToken::recognize(b"7").unwrap();
        assert_eq!(token.to_decimal(), BigDecimal::from(7));
    }

    #[test]
    fn test_fast_decimal_wide_tokens_are_exact() {
        for s in [
            "1234567890123456789012345678901234567890",
            "-1234567890123456789012345678901234567.890123",
            "0.000000000000000000000000000000000000000001",
            "99999999999999999999999999999999999999",
        ] {
            let token = NumericToken::recognize(s.as_bytes()).unwrap();
            let expected = BigDecimal::from_str(s).unwrap();
            assert_eq!(token.to_decimal(), expected, "token {}", s);
        }
    }

    #[test]
    fn test_validating_parsers() {
        assert_eq!(
            parse_double_data_value(b"42.5").unwrap(),
            DoubleDataValue::new(42.5)
        );
        assert_eq!(parse_double_data_value(b"1e3").unwrap().value, 1000.0);
        assert!(matches!(
            parse_double_data_value(b"abc"),
            Err(PxError::InvalidToken(_))
        ));
        assert!(parse_double_data_value(b"\"..x\"").is_err());

        let d = parse_decimal_data_value(b"0.1").unwrap();
        assert_eq!(d.value, BigDecimal::from_str("0.1").unwrap());
        assert_eq!(
            parse_decimal_data_value(b"\"-\"").unwrap().kind,
            DataValueType::Nill
        );
        assert!(parse_decimal_data_value(b"1,5").is_err());
    }

    #[test]
    fn test_unsafe_double() {
        let enc = MissingValueEncodings::new([-1.0, -2.0, -3.0, -4.0, -5.0, -6.0, -7.0]);
        assert_eq!(parse_unsafe_double(b"\"..\"", &enc).unwrap(), -2.0);
        assert_eq!(parse_unsafe_double(b"\"-\"", &enc).unwrap(), -7.0);
        assert_eq!(parse_unsafe_double(b"8", &enc).unwrap(), 8.0);
        assert!(parse_unsafe_double(b"x", &enc).is_err());

        let decoder = UnsafeDoubleDecoder::new(enc);
        assert_eq!(decoder.decode(b"\".....\"").unwrap(), -5.0);
        assert_eq!(decoder.decode(b"-2.25").unwrap(), -2.25);
    }

    #[test]
    fn test_decoders_fall_back_to_validating() {
        assert_eq!(DoubleDecoder.decode(b"2.5E2").unwrap().value, 250.0);
        assert_eq!(
            DoubleDecoder.decode(b"\"...\"").unwrap().kind,
            DataValueType::Confidential
        );
        assert!(DoubleDecoder.decode(b"\"?\"").is_err());
        assert_eq!(
            DecimalDecoder.decode(b"-3.75").unwrap().value,
            BigDecimal::from_str("-3.75").unwrap()
        );
    }
}
