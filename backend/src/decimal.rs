//! Decimal literals and decimal rendering of dyadic values.

use std::f64::consts::LOG10_2;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::Zero;

use crate::BackendError;
use crate::dyadic::{Dyadic, round_ratio};

/// Literals whose written exponent exceeds this are rejected.
pub const MAX_DECIMAL_EXPONENT: i64 = 1_000_000;

/// A parsed decimal literal `[+-]digits[.digits][(e|E)[+-]digits]`.
///
/// Keeps the digit counts the precision estimate needs: how many digits sit
/// before the point, how many of the leading digits are zeros and the written
/// exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalLiteral {
    negative: bool,
    digits: BigUint,
    integer_digits: usize,
    fraction_digits: usize,
    leading_zeros: usize,
    exponent: i64,
}

/// Result of rounding a literal to a binary precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDecimal {
    pub value: Dyadic,
    /// `Some(k)` when the value was rounded, with error at most `2^k`.
    pub error_exponent: Option<i64>,
}

impl DecimalLiteral {
    pub fn parse(input: &str) -> Result<Self, BackendError> {
        let malformed = || BackendError::MalformedLiteral(input.to_owned());
        let text = input.trim();
        let (negative, rest) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let integer_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (integer, rest) = rest.split_at(integer_len);
        let (fraction, rest) = match rest.strip_prefix('.') {
            Some(after_point) => {
                let fraction_len = after_point.bytes().take_while(u8::is_ascii_digit).count();
                after_point.split_at(fraction_len)
            }
            None => ("", rest),
        };
        if integer.is_empty() && fraction.is_empty() {
            return Err(malformed());
        }

        let exponent = match rest.as_bytes().first() {
            None => 0,
            Some(b'e' | b'E') => {
                let written = &rest[1..];
                let unsigned = written.strip_prefix(['+', '-']).unwrap_or(written);
                if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(malformed());
                }
                let exponent: i64 = written
                    .parse()
                    .map_err(|_| BackendError::ExponentOutOfRange(input.to_owned()))?;
                if exponent.abs() > MAX_DECIMAL_EXPONENT {
                    return Err(BackendError::ExponentOutOfRange(input.to_owned()));
                }
                exponent
            }
            Some(_) => return Err(malformed()),
        };

        let mut leading_zeros = integer.bytes().take_while(|&b| b == b'0').count();
        if leading_zeros == integer.len() {
            leading_zeros += fraction.bytes().take_while(|&b| b == b'0').count();
        }
        let all_digits: String = integer.chars().chain(fraction.chars()).collect();
        let digits = all_digits
            .parse::<BigUint>()
            .map_err(|_| malformed())?;

        Ok(Self {
            negative,
            digits,
            integer_digits: integer.len(),
            fraction_digits: fraction.len(),
            leading_zeros,
            exponent,
        })
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.digits.is_zero()
    }

    /// Significant bits needed so that rounding leaves an error of at most
    /// `2^precision`.
    ///
    /// `(g + k - z + 1) * log2(10)` estimates the binary size of the value from
    /// the written exponent `g`, the position of the point `k` and the leading
    /// zeros `z`.
    #[must_use]
    pub fn required_bits(&self, precision: i32) -> u32 {
        let total = self.integer_digits + self.fraction_digits;
        let bits = if self.leading_zeros < total {
            let magnitude = self.exponent + self.integer_digits as i64 - 1
                - self.leading_zeros as i64
                + 1;
            (magnitude * 10 + 2) / 3 + 1 - i64::from(precision)
        } else {
            1
        };
        (bits + 1).clamp(10, i64::from(u32::MAX)) as u32
    }

    /// Rounds to `bits` significant bits, to nearest.
    #[must_use]
    pub fn to_dyadic(&self, bits: u32) -> ParsedDecimal {
        if self.is_zero() {
            return ParsedDecimal {
                value: Dyadic::zero(),
                error_exponent: None,
            };
        }
        let power = self.exponent - self.fraction_digits as i64;
        let ten = BigUint::from(10_u32);
        let (numerator, denominator) = if power >= 0 {
            (&self.digits * ten.pow(power as u32), BigUint::from(1_u32))
        } else {
            (self.digits.clone(), ten.pow((-power) as u32))
        };
        let unit = numerator.bits() as i64 - denominator.bits() as i64 - i64::from(bits);
        let (quotient, exact) = round_ratio(&numerator, &denominator, unit);
        let magnitude = BigInt::from(quotient);
        let mantissa = if self.negative { -magnitude } else { magnitude };
        ParsedDecimal {
            value: Dyadic::new(mantissa, unit),
            error_exponent: (!exact).then_some(unit - 1),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

impl Dyadic {
    /// `|self| * 10^power`, rounded to the nearest integer.
    fn scaled_decimal(&self, power: i64) -> BigUint {
        let ten = BigUint::from(10_u32);
        let mut numerator = self.mantissa().magnitude().clone();
        let mut denominator = BigUint::from(1_u32);
        if power >= 0 {
            numerator *= ten.pow(power as u32);
        } else {
            denominator *= ten.pow((-power) as u32);
        }
        if self.exponent() >= 0 {
            numerator <<= self.exponent() as u64;
        } else {
            denominator <<= (-self.exponent()) as u64;
        }
        let (mut quotient, remainder) = numerator.div_rem(&denominator);
        if remainder * 2_u32 >= denominator {
            quotient += 1_u32;
        }
        quotient
    }

    /// Fixed-point rendering with exactly `fraction_digits` digits after the
    /// point, rounded to nearest.
    #[must_use]
    pub fn to_fixed(&self, fraction_digits: usize) -> String {
        let scaled = self.scaled_decimal(fraction_digits as i64);
        let mut digits = scaled.to_string();
        if digits.len() <= fraction_digits {
            digits = format!("{}{digits}", "0".repeat(fraction_digits + 1 - digits.len()));
        }
        let sign = if self.is_negative() && !scaled.is_zero() {
            "-"
        } else {
            ""
        };
        if fraction_digits == 0 {
            return format!("{sign}{digits}");
        }
        let (integer, fraction) = digits.split_at(digits.len() - fraction_digits);
        format!("{sign}{integer}.{fraction}")
    }

    /// Scientific rendering `d.ddd…e±k` with `significant` digits.
    #[must_use]
    pub fn to_scientific(&self, significant: usize) -> String {
        if self.is_zero() {
            return "0".to_owned();
        }
        let significant = significant.max(1);
        let lower = BigUint::from(10_u32).pow(significant as u32 - 1);
        let upper = &lower * 10_u32;
        let mut exponent = ((self.bit_size() - 1) as f64 * LOG10_2).floor() as i64;
        let mut scaled = self.scaled_decimal(significant as i64 - 1 - exponent);
        for _ in 0..4 {
            if scaled >= upper {
                exponent += 1;
            } else if scaled < lower {
                exponent -= 1;
            } else {
                break;
            }
            scaled = self.scaled_decimal(significant as i64 - 1 - exponent);
        }
        let digits = scaled.to_string();
        let sign = if self.is_negative() { "-" } else { "" };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{sign}{first}e{exponent}")
        } else {
            format!("{sign}{first}.{rest}e{exponent}")
        }
    }
}
