//! Real numbers with a double-interval fast path.
//!
//! A [`Real`] starts out as a pair of doubles bracketing its value and moves
//! to an arbitrary-precision ball (dyadic center plus [`ErrorBound`]) once the
//! doubles are no longer good enough:
//!
//! - a fast result leaves the finite double range,
//! - it is combined with an operand that was already promoted,
//! - it is created while the context asks for more than double precision.
//!
//! Promotion never goes back. Every fallible operation returns an
//! [`Outcome`]; a [`Reiterate`](exact_types::Reiterate) means the value
//! cannot be decided at the current precision and the enclosing driver or
//! limit should try again.
//!
//! # Operators
//!
//! `+ - * /` are implemented on `&Real` and `Real` with
//! `Output = Outcome<Real>`; negation is infallible.

mod compare;
mod convert;
mod fast;
mod promoted;
mod root;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

use exact_backend::{DecimalLiteral, Dyadic};
use exact_types::{ErrorBound, Interrupt, LazyBool, NumericError, Outcome};
use num_bigint::BigInt;

pub use self::convert::DecimalForm;
use self::fast::Interval;
use self::promoted::{Ball, backend_error};
use crate::context;

/// `value` clamped into the `i32` range.
pub(crate) fn saturating_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[derive(Debug, Clone)]
pub struct Real {
    repr: Repr,
}

#[derive(Debug, Clone)]
enum Repr {
    Fast(Interval),
    Promoted(Ball),
}

// ============================================================================
// Construction
// ============================================================================

impl Real {
    const fn fast(interval: Interval) -> Self {
        Self {
            repr: Repr::Fast(interval),
        }
    }

    const fn promoted(ball: Ball) -> Self {
        Self {
            repr: Repr::Promoted(ball),
        }
    }

    /// Exact `center` when the context wants promoted values, else the
    /// double interval.
    fn exact_or_fast(center: impl FnOnce() -> Dyadic, interval: Interval) -> Self {
        if context::highlevel()
            && let Ok(ball) = Ball::exact(center())
        {
            return Self::promoted(ball);
        }
        Self::fast(interval)
    }

    /// Exact conversion of a finite double.
    pub fn from_f64(value: f64) -> Outcome<Self> {
        let Some(center) = Dyadic::from_f64(value) else {
            return Err(NumericError::ConversionFromNonFinite {
                value: value.to_string(),
            }
            .into());
        };
        if context::highlevel() {
            return Ok(Self::promoted(Ball::exact(center)?));
        }
        Ok(Self::fast(Interval::point(value)))
    }

    pub fn from_dyadic(value: Dyadic) -> Outcome<Self> {
        Ok(Self::promoted(Ball::exact(value)?))
    }

    pub fn from_bigint(value: &BigInt) -> Outcome<Self> {
        Self::from_dyadic(Dyadic::from(value.clone()))
    }

    /// `numerator / denominator`.
    pub fn ratio(numerator: i64, denominator: i64) -> Outcome<Self> {
        &Self::from(numerator) / &Self::from(denominator)
    }

    /// The ball `center ± radius`.
    pub fn from_ball(center: Dyadic, radius: ErrorBound) -> Outcome<Self> {
        Ok(Self::promoted(Ball::new(center, radius)?))
    }

    /// Parses a decimal literal, rounding it as finely as the current
    /// precision demands.
    pub fn parse(text: &str) -> Outcome<Self> {
        let literal = DecimalLiteral::parse(text).map_err(backend_error)?;
        let parsed = literal.to_dyadic(literal.required_bits(context::actual_precision()));
        let error = match parsed.error_exponent {
            Some(exponent) => ErrorBound::power_of_two(saturating_i32(exponent))?,
            None => ErrorBound::exact_zero(),
        };
        Self::from_ball(parsed.value, error)
    }
}

impl From<i32> for Real {
    fn from(value: i32) -> Self {
        Self::exact_or_fast(|| Dyadic::from(value), Interval::point(f64::from(value)))
    }
}

impl From<i64> for Real {
    fn from(value: i64) -> Self {
        let nearest = value as f64;
        // every double in the i64 range, and 2^63, converts exactly to i128
        let interval = match (nearest as i128).cmp(&i128::from(value)) {
            Ordering::Less => Interval::new(nearest, nearest.next_up()),
            Ordering::Greater => Interval::new(nearest.next_down(), nearest),
            Ordering::Equal => Interval::point(nearest),
        };
        Self::exact_or_fast(|| Dyadic::from(value), interval)
    }
}

impl FromStr for Real {
    type Err = Interrupt;

    fn from_str(text: &str) -> Outcome<Self> {
        Self::parse(text)
    }
}

// ============================================================================
// Queries
// ============================================================================

impl Real {
    #[must_use]
    pub const fn is_promoted(&self) -> bool {
        matches!(self.repr, Repr::Promoted(_))
    }

    fn ball(&self) -> Outcome<Cow<'_, Ball>> {
        match &self.repr {
            Repr::Fast(interval) => Ok(Cow::Owned(Ball::from_interval(*interval)?)),
            Repr::Promoted(ball) => Ok(Cow::Borrowed(ball)),
        }
    }

    /// The same value on the arbitrary-precision path.
    pub fn promote(&self) -> Outcome<Self> {
        Ok(Self::promoted(self.ball()?.into_owned()))
    }

    /// Radius of the value's ball.
    pub fn error(&self) -> Outcome<ErrorBound> {
        Ok(self.ball()?.error())
    }

    /// Upper bound of the magnitude of the ball's center.
    pub fn magnitude(&self) -> Outcome<ErrorBound> {
        Ok(self.ball()?.magnitude())
    }

    /// Center and radius.
    pub fn to_formal_ball(&self) -> Outcome<(Dyadic, ErrorBound)> {
        let ball = self.ball()?;
        Ok((ball.center().clone(), ball.error()))
    }

    /// Replaces the radius, keeping the center.
    pub fn set_error(&mut self, error: ErrorBound) -> Outcome<()> {
        let ball = self.ball()?.with_error(error);
        *self = Self::promoted(ball);
        Ok(())
    }

    /// Widens the radius by `error`.
    pub fn add_error(&mut self, error: ErrorBound) -> Outcome<()> {
        let widened = self.error()?.add(error)?;
        self.set_error(widened)
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

impl Real {
    fn binary(
        &self,
        other: &Self,
        fast: impl FnOnce(Interval, Interval) -> Option<Interval>,
        promoted: impl FnOnce(&Ball, &Ball) -> Outcome<Ball>,
    ) -> Outcome<Self> {
        if let (Repr::Fast(x), Repr::Fast(y)) = (&self.repr, &other.repr)
            && let Some(result) = fast(*x, *y)
        {
            if result.is_finite() {
                return Ok(Self::fast(result));
            }
            tracing::trace!("double interval overflowed, promoting");
        }
        let (x, y) = (self.ball()?, other.ball()?);
        Ok(Self::promoted(promoted(&*x, &*y)?))
    }

    fn unary(
        &self,
        fast: impl FnOnce(Interval) -> Outcome<Option<Interval>>,
        promoted: impl FnOnce(&Ball) -> Outcome<Ball>,
    ) -> Outcome<Self> {
        if let Repr::Fast(x) = &self.repr
            && let Some(result) = fast(*x)?
            && result.is_finite()
        {
            return Ok(Self::fast(result));
        }
        let x = self.ball()?;
        Ok(Self::promoted(promoted(&*x)?))
    }

    #[must_use]
    pub fn abs(&self) -> Self {
        match &self.repr {
            Repr::Fast(interval) => Self::fast(interval.abs()),
            Repr::Promoted(ball) => Self::promoted(ball.abs()),
        }
    }

    pub fn square(&self) -> Outcome<Self> {
        self.unary(|x| Ok(Some(x.square())), Ball::square)
    }

    /// `self * 2^shift`.
    pub fn scale(&self, shift: i32) -> Outcome<Self> {
        self.unary(|x| Ok(x.scale(shift)), |ball| ball.scale(shift))
    }

    pub fn sqrt(&self) -> Outcome<Self> {
        self.unary(|x| Ok(Some(x.sqrt()?)), Ball::sqrt)
    }

    pub fn add_int(&self, value: i32) -> Outcome<Self> {
        self + &Self::from(value)
    }

    pub fn mul_int(&self, value: i32) -> Outcome<Self> {
        self * &Self::from(value)
    }

    pub fn div_int(&self, value: i32) -> Outcome<Self> {
        self / &Self::from(value)
    }

    /// `self^exponent` by repeated squaring; negative exponents invert.
    pub fn powi(&self, exponent: i32) -> Outcome<Self> {
        let mut remaining = exponent.unsigned_abs();
        let mut base = self.clone();
        let mut result = Self::from(1);
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = (&result * &base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.square()?;
            }
        }
        if exponent < 0 {
            return &Self::from(1) / &result;
        }
        Ok(result)
    }

    pub fn maximum(&self, other: &Self) -> Outcome<Self> {
        match self.lt(other)? {
            LazyBool::True => Ok(other.clone()),
            LazyBool::False => Ok(self.clone()),
            LazyBool::Unknown => {
                let spread = (self - other)?.abs();
                ((self + other)? + spread)?.scale(-1)
            }
        }
    }

    pub fn minimum(&self, other: &Self) -> Outcome<Self> {
        match self.lt(other)? {
            LazyBool::True => Ok(self.clone()),
            LazyBool::False => Ok(other.clone()),
            LazyBool::Unknown => {
                let spread = (self - other)?.abs();
                ((self + other)? - spread)?.scale(-1)
            }
        }
    }

    /// `self - n * divisor` for the integer `n` nearest to `self / divisor`.
    ///
    /// Multi-valued when the quotient is close to a half-integer.
    pub fn modulo(&self, divisor: &Self) -> Outcome<Self> {
        let quotient = (self / divisor)?.to_integer()?;
        self - &(&Self::from_bigint(&quotient)? * divisor)?
    }
}

impl Add for &Real {
    type Output = Outcome<Real>;

    fn add(self, rhs: &Real) -> Outcome<Real> {
        self.binary(rhs, |x, y| Some(x.add(y)), Ball::add)
    }
}

impl Sub for &Real {
    type Output = Outcome<Real>;

    fn sub(self, rhs: &Real) -> Outcome<Real> {
        self.binary(rhs, |x, y| Some(x.sub(y)), Ball::sub)
    }
}

impl Mul for &Real {
    type Output = Outcome<Real>;

    fn mul(self, rhs: &Real) -> Outcome<Real> {
        self.binary(rhs, |x, y| Some(x.mul(y)), Ball::mul)
    }
}

impl Div for &Real {
    type Output = Outcome<Real>;

    fn div(self, rhs: &Real) -> Outcome<Real> {
        self.binary(rhs, Interval::div, Ball::div)
    }
}

macro_rules! forward_owned {
    ($($op:ident $method:ident),* $(,)?) => {$(
        impl $op for Real {
            type Output = Outcome<Real>;

            fn $method(self, rhs: Real) -> Outcome<Real> {
                $op::$method(&self, &rhs)
            }
        }

        impl $op<&Real> for Real {
            type Output = Outcome<Real>;

            fn $method(self, rhs: &Real) -> Outcome<Real> {
                $op::$method(&self, rhs)
            }
        }
    )*};
}

forward_owned!(Add add, Sub sub, Mul mul, Div div);

impl Neg for &Real {
    type Output = Real;

    fn neg(self) -> Real {
        match &self.repr {
            Repr::Fast(interval) => Real::fast(interval.neg()),
            Repr::Promoted(ball) => Real::promoted(ball.neg()),
        }
    }
}

impl Neg for Real {
    type Output = Real;

    fn neg(self) -> Real {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::SQRT_2;

    use proptest::prelude::*;

    use super::*;
    use crate::context::Stiff;

    fn contains(x: &Real, value: f64) -> bool {
        let (center, error) = x.to_formal_ball().unwrap();
        let slack = 4.0 * f64::EPSILON * value.abs();
        (center.to_f64() - value).abs() <= error.to_f64() + slack
    }

    #[test]
    fn small_values_start_on_the_fast_path() {
        let x = Real::from(3);
        assert!(!x.is_promoted());
        let y = (&x / &Real::from(7)).unwrap();
        assert!(!y.is_promoted());
        assert!(contains(&y, 3.0 / 7.0));
    }

    #[test]
    fn finer_contexts_create_promoted_values() {
        let _stiff = Stiff::absolute(3);
        assert!(Real::from(3).is_promoted());
        assert!(Real::from_f64(0.5).unwrap().is_promoted());
    }

    #[test]
    fn overflow_promotes() {
        let huge = Real::from_f64(f64::MAX).unwrap();
        let doubled = (&huge + &huge).unwrap();
        assert!(doubled.is_promoted());
        let (center, _) = doubled.to_formal_ball().unwrap();
        assert_eq!(center, Dyadic::from_f64(f64::MAX).unwrap().shift(1));
    }

    #[test]
    fn promoted_operands_promote_the_result() {
        let x = Real::from(2).promote().unwrap();
        let sum = (&x + &Real::from(1)).unwrap();
        assert!(sum.is_promoted());
        assert!(contains(&sum, 3.0));
    }

    #[test]
    fn large_integers_are_enclosed() {
        let value = i64::MAX - 1;
        let x = Real::from(value);
        let (center, error) = x.to_formal_ball().unwrap();
        let distance = center.sub_exact(&Dyadic::from(value)).abs();
        assert!(distance <= promoted::bound_value(error));
    }

    #[test]
    fn non_finite_doubles_are_rejected() {
        assert!(matches!(
            Real::from_f64(f64::NAN),
            Err(Interrupt::Numeric(NumericError::ConversionFromNonFinite { .. }))
        ));
    }

    #[test]
    fn division_by_exact_zero_is_retried() {
        let zero = (&Real::from(1) - &Real::from(1)).unwrap();
        assert_eq!(
            (&Real::from(1) / &zero).unwrap_err(),
            Interrupt::reiterate(0)
        );
    }

    #[test]
    fn parsed_literals_carry_their_rounding_error() {
        let tenth: Real = "0.1".parse().unwrap();
        assert!(tenth.is_promoted());
        assert!(contains(&tenth, 0.1));
        assert!(tenth.error().unwrap().log2_ceil() <= context::actual_precision());
        assert!(matches!(
            Real::parse("1.2.3"),
            Err(Interrupt::Numeric(NumericError::MalformedLiteral { .. }))
        ));
    }

    #[test]
    fn errors_can_be_set_and_widened() {
        let mut x = Real::from(1);
        x.add_error(ErrorBound::power_of_two(-10).unwrap()).unwrap();
        assert!(x.is_promoted());
        assert_eq!(x.error().unwrap().log2_ceil(), -10);
        x.set_error(ErrorBound::exact_zero()).unwrap();
        assert!(x.error().unwrap().is_zero());
    }

    #[test]
    fn powers_and_extrema() {
        let two = Real::from(2);
        assert!(contains(&two.powi(10).unwrap(), 1024.0));
        assert!(contains(&two.powi(-3).unwrap(), 0.125));
        assert!(contains(&two.powi(0).unwrap(), 1.0));
        let three = Real::from(3);
        assert!(contains(&two.maximum(&three).unwrap(), 3.0));
        assert!(contains(&two.minimum(&three).unwrap(), 2.0));
        let mut fuzzy = Real::from(2);
        fuzzy.add_error(ErrorBound::power_of_two(2).unwrap()).unwrap();
        let top = fuzzy.maximum(&three).unwrap();
        assert!(contains(&top, 3.0));
    }

    #[test]
    fn modulo_reduces_to_the_nearest_multiple() {
        let x = Real::from(17);
        let rest = x.modulo(&Real::from(5)).unwrap();
        assert!(contains(&rest, 2.0));
        let rest = Real::from(-7).modulo(&Real::from(3)).unwrap();
        assert!(contains(&rest, -1.0));
    }

    #[test]
    fn sqrt_on_both_paths() {
        let fast = Real::from(2).sqrt().unwrap();
        assert!(!fast.is_promoted());
        assert!(contains(&fast, SQRT_2));
        let promoted = Real::from(2).promote().unwrap().sqrt().unwrap();
        assert!(contains(&promoted, SQRT_2));
        assert_eq!(
            Real::from(-4).sqrt().unwrap_err(),
            Interrupt::Numeric(NumericError::NegativeSquareRoot)
        );
    }

    #[test]
    fn thirds_agree_with_and_without_promotion() {
        let third = Real::ratio(1, 3).unwrap();
        let sum = ((&third + &third).unwrap() + &third).unwrap();
        let promoted_third = third.promote().unwrap();
        let promoted_sum =
            ((&promoted_third + &promoted_third).unwrap() + &promoted_third).unwrap();
        let one = Real::from(1);
        for value in [&sum, &promoted_sum] {
            assert!(contains(value, 1.0));
            assert_eq!((value - &one).unwrap().bound(-50).unwrap(), LazyBool::True);
        }
    }

    /// Whether the ball of `x` contains `p / q`, checked exactly as
    /// `|center * q - p| <= error * |q|`.
    fn encloses_ratio(x: &Real, p: &Dyadic, q: &Dyadic) -> bool {
        let (center, error) = x.to_formal_ball().unwrap();
        let slack = center.mul_exact(q).sub_exact(p).abs();
        slack <= promoted::bound_value(error).mul_exact(&q.abs())
    }

    proptest! {
        #[test]
        fn fast_and_promoted_paths_enclose_the_exact_result(
            n1 in -1_000_000_i64..1_000_000,
            d1 in 1_i64..1000,
            n2 in 1_i64..1_000_000,
            d2 in 1_i64..1000,
        ) {
            let x = Real::ratio(n1, d1).unwrap();
            let y = Real::ratio(n2, d2).unwrap();
            let promoted_x = x.promote().unwrap();

            let [n1, d1, n2, d2] = [n1, d1, n2, d2].map(Dyadic::from);
            let left = n1.mul_exact(&d2);
            let right = n2.mul_exact(&d1);
            let denominator = d1.mul_exact(&d2);
            for (fast, promoted, p, q) in [
                (&x + &y, &promoted_x + &y, left.add_exact(&right), denominator.clone()),
                (&x - &y, &promoted_x - &y, left.sub_exact(&right), denominator.clone()),
                (&x * &y, &promoted_x * &y, n1.mul_exact(&n2), denominator),
                (&x / &y, &promoted_x / &y, left, right),
            ] {
                let (fast, promoted) = (fast.unwrap(), promoted.unwrap());
                prop_assert!(!fast.is_promoted());
                prop_assert!(promoted.is_promoted());
                prop_assert!(encloses_ratio(&fast, &p, &q));
                prop_assert!(encloses_ratio(&promoted, &p, &q));
            }
        }
    }
}
