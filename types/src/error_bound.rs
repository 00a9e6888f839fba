//! Normalized upper bounds on absolute errors.
//!
//! An [`ErrorBound`] is `mantissa * 2^exponent` with a 32-bit mantissa kept in
//! a canonical window. Every operation rounds in the direction that keeps the
//! bound sound: results never under-report the exact value they stand for
//! (or never over-report it, for the explicitly `floor` variants used in
//! denominators).

use std::cmp::Ordering;
use std::fmt;

use crate::signal::Reiterate;

/// Canonical mantissas are below this value.
pub const MAX_MANTISSA: u32 = 1 << GUARD_BITS;
/// Canonical nonzero mantissas are at least this value.
pub const MIN_MANTISSA: u32 = 1 << (GUARD_BITS - BIT_RANGE);
/// Exponents below this clamp to [`MIN_EXPONENT`].
pub const EXP_MIN: i32 = -1_000_000_000;
/// Exponents at or above this are unrepresentable and trigger a retry.
pub const EXP_MAX: i32 = 1_000_000_000;
/// Exponent of the exact zero bound and of clamped tiny bounds.
pub const MIN_EXPONENT: i32 = EXP_MIN + 32;

const GUARD_BITS: u32 = 29;
const DIFF_BITS: u32 = 3;
const BIT_RANGE: u32 = 8;

/// A nonnegative bound `mantissa * 2^exponent`.
///
/// Values produced by the public constructors and operations are always
/// normalized: the mantissa is zero or lies in `[MIN_MANTISSA, MAX_MANTISSA)`.
/// The only way to hold an unnormalized value is [`ErrorBound::raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorBound {
    mantissa: u32,
    exponent: i32,
}

impl Default for ErrorBound {
    fn default() -> Self {
        Self::exact_zero()
    }
}

impl ErrorBound {
    // ========================================================================
    // Construction
    // ========================================================================

    /// The bound of an exact value.
    #[must_use]
    pub const fn exact_zero() -> Self {
        Self {
            mantissa: 0,
            exponent: MIN_EXPONENT,
        }
    }

    /// Unnormalized bound, used to feed [`ErrorBound::normalize`].
    #[must_use]
    pub const fn raw(mantissa: u32, exponent: i32) -> Self {
        Self { mantissa, exponent }
    }

    /// Normalized bound `>= mantissa * 2^exponent`.
    pub fn new(mantissa: u32, exponent: i32) -> Result<Self, Reiterate> {
        Self::rounded_up(u128::from(mantissa), i64::from(exponent))
    }

    /// Exactly `2^exponent`.
    pub fn power_of_two(exponent: i32) -> Result<Self, Reiterate> {
        Self::rounded_up(1, i64::from(exponent))
    }

    /// Smallest normalized bound `>= mantissa * 2^exponent`.
    pub fn rounded_up(mantissa: u128, exponent: i64) -> Result<Self, Reiterate> {
        if mantissa == 0 {
            return Ok(Self::exact_zero());
        }
        let (mut m, mut e) = (mantissa, exponent);
        while m >= u128::from(MAX_MANTISSA) {
            m = (m >> DIFF_BITS) + 1;
            e += i64::from(DIFF_BITS);
        }
        while m < u128::from(MIN_MANTISSA) {
            m <<= BIT_RANGE;
            e -= i64::from(BIT_RANGE);
        }
        if e < i64::from(EXP_MIN) {
            e = i64::from(MIN_EXPONENT);
        }
        if e >= i64::from(EXP_MAX) {
            return Err(Reiterate::next_step());
        }
        Ok(Self {
            mantissa: m as u32,
            exponent: e as i32,
        })
    }

    /// Largest normalized bound `<= mantissa * 2^exponent`.
    ///
    /// Tiny values flush to zero instead of clamping upward.
    pub fn rounded_down(mantissa: u128, exponent: i64) -> Result<Self, Reiterate> {
        if mantissa == 0 {
            return Ok(Self::exact_zero());
        }
        let (mut m, mut e) = (mantissa, exponent);
        while m >= u128::from(MAX_MANTISSA) {
            m >>= DIFF_BITS;
            e += i64::from(DIFF_BITS);
        }
        while m < u128::from(MIN_MANTISSA) {
            m <<= BIT_RANGE;
            e -= i64::from(BIT_RANGE);
        }
        if e < i64::from(EXP_MIN) {
            return Ok(Self::exact_zero());
        }
        if e >= i64::from(EXP_MAX) {
            return Err(Reiterate::next_step());
        }
        Ok(Self {
            mantissa: m as u32,
            exponent: e as i32,
        })
    }

    /// Smallest bound `>= |value|` for a finite double.
    pub fn from_f64_ceil(value: f64) -> Result<Self, Reiterate> {
        if !value.is_finite() {
            return Err(Reiterate::next_step());
        }
        if value == 0.0 {
            return Ok(Self::exact_zero());
        }
        let bits = value.abs().to_bits();
        let biased = ((bits >> 52) & 0x7ff) as i64;
        let fraction = bits & ((1_u64 << 52) - 1);
        let (mantissa, exponent) = if biased == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1 << 52), biased - 1075)
        };
        Self::rounded_up(u128::from(mantissa), exponent)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub const fn mantissa(self) -> u32 {
        self.mantissa
    }

    #[must_use]
    pub const fn exponent(self) -> i32 {
        self.exponent
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.mantissa == 0
    }

    /// Nearest double; for diagnostics only.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        let first = self.exponent / 2;
        f64::from(self.mantissa) * 2_f64.powi(first) * 2_f64.powi(self.exponent - first)
    }

    /// Smallest `k` with `self <= 2^k`.
    #[must_use]
    pub fn log2_ceil(self) -> i32 {
        if self.is_zero() {
            return MIN_EXPONENT;
        }
        let bits = 32 - self.mantissa.leading_zeros() as i32;
        if self.mantissa.is_power_of_two() {
            self.exponent + bits - 1
        } else {
            self.exponent + bits
        }
    }

    /// Largest `k` with `2^k <= self`.
    #[must_use]
    pub fn log2_floor(self) -> i32 {
        if self.is_zero() {
            return MIN_EXPONENT;
        }
        self.exponent + 31 - self.mantissa.leading_zeros() as i32
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// Brings the mantissa into the canonical window.
    pub fn normalize(self) -> Result<Self, Reiterate> {
        Self::rounded_up(u128::from(self.mantissa), i64::from(self.exponent))
    }

    /// Upper bound of `self + other`.
    pub fn add(self, other: Self) -> Result<Self, Reiterate> {
        if other.is_zero() {
            return self.normalize();
        }
        if self.is_zero() {
            return other.normalize();
        }
        let (big, small) = if self.exponent >= other.exponent {
            (self, other)
        } else {
            (other, self)
        };
        let diff = i64::from(big.exponent) - i64::from(small.exponent);
        let mantissa =
            u128::from(big.mantissa) + scale_down(small.mantissa, diff) + 1;
        Self::rounded_up(mantissa, i64::from(big.exponent))
    }

    /// Upper bound of `self + 2^exponent`.
    pub fn add_power_of_two(self, exponent: i32) -> Result<Self, Reiterate> {
        self.add(Self::power_of_two(exponent)?)
    }

    /// Upper bound of `self * other`.
    pub fn multiply(self, other: Self) -> Result<Self, Reiterate> {
        if self.is_zero() || other.is_zero() {
            return Ok(Self::exact_zero());
        }
        let product = u128::from(self.mantissa) * u128::from(other.mantissa) + 1;
        Self::rounded_up(
            product,
            i64::from(self.exponent) + i64::from(other.exponent),
        )
    }

    /// `self * 2^shift`.
    pub fn shift(self, shift: i32) -> Result<Self, Reiterate> {
        if self.is_zero() {
            return Ok(self);
        }
        Self::rounded_up(
            u128::from(self.mantissa),
            i64::from(self.exponent) + i64::from(shift),
        )
    }

    /// Upper bound of `self / 2`.
    #[must_use]
    pub fn half(self) -> Self {
        if self.is_zero() {
            return self;
        }
        Self {
            mantissa: self.mantissa,
            exponent: (self.exponent - 1).max(MIN_EXPONENT),
        }
    }

    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if Self::less_sound(self, other) {
            other
        } else {
            self
        }
    }

    /// Upper bound of `self / other`. A zero divisor cannot be bounded and
    /// requests a retry.
    pub fn div_ceil(self, other: Self) -> Result<Self, Reiterate> {
        if self.is_zero() {
            return Ok(self);
        }
        if other.is_zero() {
            return Err(Reiterate::next_step());
        }
        let quotient = (u128::from(self.mantissa) << 64) / u128::from(other.mantissa) + 1;
        Self::rounded_up(
            quotient,
            i64::from(self.exponent) - i64::from(other.exponent) - 64,
        )
    }

    /// Upper bound of `sqrt(self)`.
    pub fn sqrt_ceil(self) -> Result<Self, Reiterate> {
        let (radicand, exponent) = self.even_split();
        let mut root = radicand.isqrt();
        if root * root < radicand {
            root += 1;
        }
        Self::rounded_up(root, exponent / 2)
    }

    /// Lower bound of `sqrt(self)`.
    pub fn sqrt_floor(self) -> Result<Self, Reiterate> {
        let (radicand, exponent) = self.even_split();
        Self::rounded_down(radicand.isqrt(), exponent / 2)
    }

    /// Lower bound of `self - other`, or `None` when the difference is not
    /// provably positive.
    pub fn sub_floor(self, other: Self) -> Result<Option<Self>, Reiterate> {
        if !Self::less_sound(other, self) {
            return Ok(None);
        }
        if other.is_zero() {
            return Ok(Some(self));
        }
        let diff = i64::from(self.exponent) - i64::from(other.exponent);
        let difference = if diff >= 64 {
            Self::rounded_down(u128::from(self.mantissa) - 1, i64::from(self.exponent))?
        } else if diff >= 0 {
            let minuend = u128::from(self.mantissa) << diff;
            Self::rounded_down(
                minuend - u128::from(other.mantissa),
                i64::from(other.exponent),
            )?
        } else {
            let subtrahend = u128::from(other.mantissa) << -diff;
            Self::rounded_down(
                u128::from(self.mantissa) - subtrahend,
                i64::from(self.exponent),
            )?
        };
        Ok((!difference.is_zero()).then_some(difference))
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    /// `x < y`, decided exactly.
    ///
    /// Callers may only rely on the answer when `x` and `y` are clearly
    /// ordered; exactness is a property of this implementation.
    #[must_use]
    pub fn less_sound(x: Self, y: Self) -> bool {
        Self::compare(x, y) == Ordering::Less
    }

    fn compare(x: Self, y: Self) -> Ordering {
        match (x.is_zero(), y.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        let diff = i64::from(x.exponent) - i64::from(y.exponent);
        if diff >= 40 {
            return Ordering::Greater;
        }
        if diff <= -40 {
            return Ordering::Less;
        }
        let (lhs, rhs) = if diff >= 0 {
            (u128::from(x.mantissa) << diff, u128::from(y.mantissa))
        } else {
            (u128::from(x.mantissa), u128::from(y.mantissa) << -diff)
        };
        lhs.cmp(&rhs)
    }

    /// Mantissa scaled up by 64 bits with an even exponent, ready for an
    /// integer square root.
    fn even_split(self) -> (u128, i64) {
        if self.is_zero() {
            return (0, i64::from(MIN_EXPONENT));
        }
        let mut mantissa = u128::from(self.mantissa) << 64;
        let mut exponent = i64::from(self.exponent) - 64;
        if exponent % 2 != 0 {
            mantissa <<= 1;
            exponent -= 1;
        }
        (mantissa, exponent)
    }
}

/// `w >> shift`, or zero once the shift moves every bit out of range.
fn scale_down(w: u32, shift: i64) -> u128 {
    if shift <= i64::from(GUARD_BITS) {
        u128::from(w >> shift)
    } else {
        0
    }
}

impl fmt::Display for ErrorBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "0")
        } else {
            write!(f, "{}*2^({})", self.mantissa, self.exponent)
        }
    }
}
