//! Dyadic numbers `mantissa * 2^exponent` with precision-parameterized
//! arithmetic.
//!
//! Operations that cannot be exact take a target precision `p` and return a
//! result within `2^p` of the exact value. Everything else (negation,
//! shifting, comparison, exact add/sub/mul) is exact.

use std::cmp::Ordering;
use std::ops::Neg;

use exact_types::{ErrorBound, Reiterate};
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::BackendError;

/// Bits of the mantissa kept when deriving an [`ErrorBound`] magnitude.
const MAGNITUDE_BITS: u64 = 120;

/// An exact binary fraction.
///
/// The representation is canonical: the mantissa is odd, or zero with a zero
/// exponent, so derived equality is numeric equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Dyadic {
    mantissa: BigInt,
    exponent: i64,
}

impl Dyadic {
    #[must_use]
    pub fn new(mantissa: BigInt, exponent: i64) -> Self {
        match mantissa.trailing_zeros() {
            None => Self::zero(),
            Some(0) => Self { mantissa, exponent },
            Some(zeros) => Self {
                mantissa: mantissa >> zeros,
                exponent: exponent + zeros as i64,
            },
        }
    }

    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn one() -> Self {
        Self::from(1_i64)
    }

    /// Exact conversion; `None` for infinities and NaN.
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value == 0.0 {
            return Some(Self::zero());
        }
        let bits = value.to_bits();
        let biased = ((bits >> 52) & 0x7ff) as i64;
        let fraction = bits & ((1_u64 << 52) - 1);
        let (mantissa, exponent) = if biased == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1 << 52), biased - 1075)
        };
        let mantissa = BigInt::from(mantissa);
        let mantissa = if value < 0.0 { -mantissa } else { mantissa };
        Some(Self::new(mantissa, exponent))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    #[must_use]
    pub const fn exponent(&self) -> i64 {
        self.exponent
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    /// -1, 0 or 1.
    #[must_use]
    pub fn signum(&self) -> i32 {
        match self.mantissa.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    #[must_use]
    pub fn abs(&self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent,
        }
    }

    /// `k` such that `2^(k-1) <= |self| < 2^k`; `i64::MIN` for zero.
    #[must_use]
    pub fn bit_size(&self) -> i64 {
        if self.is_zero() {
            return i64::MIN;
        }
        self.mantissa.bits() as i64 + self.exponent
    }

    /// Upper bound of `|self|`.
    pub fn magnitude_upper(&self) -> Result<ErrorBound, Reiterate> {
        if self.is_zero() {
            return Ok(ErrorBound::exact_zero());
        }
        let bits = self.mantissa.bits();
        let magnitude = self.mantissa.magnitude();
        if bits <= MAGNITUDE_BITS {
            let top = magnitude.to_u128().unwrap_or(u128::MAX);
            return ErrorBound::rounded_up(top, self.exponent);
        }
        let dropped = bits - MAGNITUDE_BITS;
        let top = (magnitude >> dropped).to_u128().unwrap_or(u128::MAX - 1) + 1;
        ErrorBound::rounded_up(top, self.exponent + dropped as i64)
    }

    /// Lower bound of `|self|`.
    pub fn magnitude_lower(&self) -> Result<ErrorBound, Reiterate> {
        if self.is_zero() {
            return Ok(ErrorBound::exact_zero());
        }
        let bits = self.mantissa.bits();
        let dropped = bits.saturating_sub(MAGNITUDE_BITS);
        let top = (self.mantissa.magnitude() >> dropped).to_u128().unwrap_or(0);
        ErrorBound::rounded_down(top, self.exponent + dropped as i64)
    }

    // ========================================================================
    // Exact operations
    // ========================================================================

    /// `self * 2^shift`.
    #[must_use]
    pub fn shift(&self, shift: i64) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        Self {
            mantissa: self.mantissa.clone(),
            exponent: self.exponent + shift,
        }
    }

    #[must_use]
    pub fn add_exact(&self, other: &Self) -> Self {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let exponent = self.exponent.min(other.exponent);
        let lhs = &self.mantissa << (self.exponent - exponent) as u64;
        let rhs = &other.mantissa << (other.exponent - exponent) as u64;
        Self::new(lhs + rhs, exponent)
    }

    #[must_use]
    pub fn sub_exact(&self, other: &Self) -> Self {
        self.add_exact(&-other)
    }

    #[must_use]
    pub fn mul_exact(&self, other: &Self) -> Self {
        Self::new(
            &self.mantissa * &other.mantissa,
            self.exponent + other.exponent,
        )
    }

    // ========================================================================
    // Rounded operations
    // ========================================================================

    /// Nearest multiple of `2^(precision - 1)`; error at most `2^(precision - 2)`.
    #[must_use]
    pub fn round(&self, precision: i64) -> Self {
        let unit = precision - 1;
        if self.exponent >= unit {
            return self.clone();
        }
        let drop = (unit - self.exponent) as u64;
        let half = BigInt::from(1) << (drop - 1);
        Self::new((&self.mantissa + half) >> drop, unit)
    }

    /// `self + other` within `2^precision`.
    #[must_use]
    pub fn add(&self, other: &Self, precision: i32) -> Self {
        let precision = i64::from(precision);
        self.round(precision - 1)
            .add_exact(&other.round(precision - 1))
            .round(precision)
    }

    /// `self - other` within `2^precision`.
    #[must_use]
    pub fn sub(&self, other: &Self, precision: i32) -> Self {
        self.add(&-other, precision)
    }

    /// `self * other` within `2^precision`.
    #[must_use]
    pub fn mul(&self, other: &Self, precision: i32) -> Self {
        self.mul_exact(other).round(i64::from(precision))
    }

    /// `self^2` within `2^precision`.
    #[must_use]
    pub fn square(&self, precision: i32) -> Self {
        self.mul(self, precision)
    }

    /// `self / divisor` within `2^precision`, truncated toward zero.
    pub fn div(&self, divisor: &Self, precision: i32) -> Result<Self, BackendError> {
        if divisor.is_zero() {
            return Err(BackendError::DivisionByZero);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        let unit = i64::from(precision) - 1;
        let shift = self.exponent - divisor.exponent - unit;
        let (numerator, denominator) = if shift >= 0 {
            (&self.mantissa << shift as u64, divisor.mantissa.clone())
        } else {
            (self.mantissa.clone(), &divisor.mantissa << (-shift) as u64)
        };
        Ok(Self::new(numerator / denominator, unit))
    }

    /// `sqrt(self)` within `2^precision`, truncated.
    pub fn sqrt(&self, precision: i32) -> Result<Self, BackendError> {
        if self.is_negative() {
            return Err(BackendError::NegativeSquareRoot);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        let unit = i64::from(precision) - 1;
        let shift = self.exponent - 2 * unit;
        let magnitude = self.mantissa.magnitude();
        let radicand: BigUint = if shift >= 0 {
            magnitude << shift as u64
        } else {
            magnitude >> (-shift) as u64
        };
        Ok(Self::new(BigInt::from(radicand.sqrt()), unit))
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Nearest double, saturating to infinity or zero.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        let bits = self.mantissa.bits();
        let dropped = bits.saturating_sub(64);
        let top = (self.mantissa.magnitude() >> dropped).to_u64().unwrap_or(u64::MAX);
        let magnitude = scale_f64(top as f64, self.exponent + dropped as i64);
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Integer part, rounding toward zero.
    #[must_use]
    pub fn trunc(&self) -> BigInt {
        if self.exponent >= 0 {
            return &self.mantissa << self.exponent as u64;
        }
        let magnitude = BigInt::from(self.mantissa.magnitude().clone()) >> (-self.exponent) as u64;
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Largest integer not above `self`.
    #[must_use]
    pub fn floor(&self) -> BigInt {
        if self.exponent >= 0 {
            &self.mantissa << self.exponent as u64
        } else {
            &self.mantissa >> (-self.exponent) as u64
        }
    }

    /// Compares `|self|` with `|other|`.
    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        match self.bit_size().cmp(&other.bit_size()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        let exponent = self.exponent.min(other.exponent);
        let lhs = self.mantissa.magnitude() << (self.exponent - exponent) as u64;
        let rhs = other.mantissa.magnitude() << (other.exponent - exponent) as u64;
        lhs.cmp(&rhs)
    }
}

/// `value * 2^exponent` without intermediate overflow of the power.
fn scale_f64(mut value: f64, mut exponent: i64) -> f64 {
    while exponent > 1000 && value.is_finite() {
        value *= 2_f64.powi(1000);
        exponent -= 1000;
    }
    while exponent < -1000 && value != 0.0 {
        value *= 2_f64.powi(-1000);
        exponent += 1000;
    }
    value * 2_f64.powi(exponent.clamp(-1100, 1100) as i32)
}

impl Ord for Dyadic {
    fn cmp(&self, other: &Self) -> Ordering {
        let sign = self.signum();
        match sign.cmp(&other.signum()) {
            Ordering::Equal if sign == 0 => Ordering::Equal,
            Ordering::Equal if sign > 0 => self.cmp_magnitude(other),
            Ordering::Equal => self.cmp_magnitude(other).reverse(),
            unequal => unequal,
        }
    }
}

impl PartialOrd for Dyadic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Neg for Dyadic {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }
}

impl Neg for &Dyadic {
    type Output = Dyadic;

    fn neg(self) -> Dyadic {
        Dyadic {
            mantissa: -&self.mantissa,
            exponent: self.exponent,
        }
    }
}

impl From<i64> for Dyadic {
    fn from(value: i64) -> Self {
        Self::new(BigInt::from(value), 0)
    }
}

impl From<i32> for Dyadic {
    fn from(value: i32) -> Self {
        Self::from(i64::from(value))
    }
}

impl From<BigInt> for Dyadic {
    fn from(value: BigInt) -> Self {
        Self::new(value, 0)
    }
}

/// Exact rational `numerator / denominator` rounded to the nearest multiple of
/// `2^unit`. Returns the value and whether it was exact.
pub(crate) fn round_ratio(
    numerator: &BigUint,
    denominator: &BigUint,
    unit: i64,
) -> (BigUint, bool) {
    let (numerator, denominator) = if unit <= 0 {
        (numerator << (-unit) as u64, denominator.clone())
    } else {
        (numerator.clone(), denominator << unit as u64)
    };
    let (mut quotient, remainder) = numerator.div_rem(&denominator);
    let exact = remainder.is_zero();
    if remainder * 2_u32 >= denominator {
        quotient += 1_u32;
    }
    (quotient, exact)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn dyadic(mantissa: i64, exponent: i64) -> Dyadic {
        Dyadic::new(BigInt::from(mantissa), exponent)
    }

    /// `|a - b| <= 2^precision`.
    fn within(a: &Dyadic, b: &Dyadic, precision: i64) -> bool {
        a.sub_exact(b).abs() <= Dyadic::one().shift(precision)
    }

    #[test]
    fn representation_is_canonical() {
        assert_eq!(dyadic(12, 0), dyadic(3, 2));
        assert_eq!(dyadic(0, 17), Dyadic::zero());
        assert_eq!(dyadic(12, 0).exponent(), 2);
    }

    #[test]
    fn from_f64_is_exact() {
        assert_eq!(Dyadic::from_f64(0.375), Some(dyadic(3, -3)));
        assert_eq!(Dyadic::from_f64(-2.0), Some(dyadic(-1, 1)));
        assert_eq!(Dyadic::from_f64(f64::INFINITY), None);
        let tiny = Dyadic::from_f64(5e-324).unwrap();
        assert_eq!(tiny, dyadic(1, -1074));
        assert_eq!(tiny.to_f64(), 5e-324);
    }

    #[test]
    fn ordering_handles_signs_and_magnitudes() {
        let mut values = vec![dyadic(3, 0), dyadic(-5, -1), Dyadic::zero(), dyadic(1, 10)];
        values.sort();
        assert_eq!(
            values,
            vec![dyadic(-5, -1), Dyadic::zero(), dyadic(3, 0), dyadic(1, 10)]
        );
        assert!(dyadic(-1, 0) < dyadic(-1, -1));
    }

    #[test]
    fn division_is_within_precision() {
        let third = Dyadic::one().div(&dyadic(3, 0), -60).unwrap();
        let back = third.mul_exact(&dyadic(3, 0));
        assert!(within(&back, &Dyadic::one(), -58));
        assert_eq!(
            Dyadic::one().div(&Dyadic::zero(), -10),
            Err(BackendError::DivisionByZero)
        );
    }

    #[test]
    fn sqrt_of_two_squares_back() {
        let root = dyadic(2, 0).sqrt(-80).unwrap();
        assert!(within(&root.mul_exact(&root), &dyadic(2, 0), -78));
        assert_eq!(
            dyadic(-2, 0).sqrt(-10),
            Err(BackendError::NegativeSquareRoot)
        );
    }

    #[test]
    fn magnitude_bounds_bracket_value() {
        let value = Dyadic::new(BigInt::from(3).pow(200), -100);
        let upper = value.magnitude_upper().unwrap();
        let lower = value.magnitude_lower().unwrap();
        assert!(ErrorBound::less_sound(lower, upper));
        assert!(i64::from(upper.log2_ceil()) >= value.bit_size() - 1);
        assert!(i64::from(lower.log2_ceil()) <= value.bit_size());
    }

    #[test]
    fn truncation_and_floor_differ_for_negatives() {
        let value = dyadic(-7, -1);
        assert_eq!(value.trunc(), BigInt::from(-3));
        assert_eq!(value.floor(), BigInt::from(-4));
        assert_eq!(dyadic(7, -1).trunc(), BigInt::from(3));
    }

    proptest! {
        #[test]
        fn rounded_arithmetic_respects_precision(
            a in any::<i64>(),
            ea in -80_i64..80,
            b in any::<i64>(),
            eb in -80_i64..80,
            precision in -120_i32..10,
        ) {
            let (x, y) = (dyadic(a, ea), dyadic(b, eb));
            let p = i64::from(precision);
            prop_assert!(within(&x.add(&y, precision), &x.add_exact(&y), p));
            prop_assert!(within(&x.sub(&y, precision), &x.sub_exact(&y), p));
            prop_assert!(within(&x.mul(&y, precision), &x.mul_exact(&y), p));
            if !y.is_zero() {
                let quotient = x.div(&y, precision).unwrap();
                // |q*y - x| <= 2^p * |y|
                let residual = quotient.mul_exact(&y).sub_exact(&x).abs();
                prop_assert!(residual <= y.abs().shift(p));
            }
        }
    }
}
