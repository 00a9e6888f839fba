//! Arbitrary-precision balls: a dyadic center with a sound error radius.
//!
//! Every operation picks a local working precision from the operand bounds
//! and the active [`PrecisionPolicy`], asks the backend for a center at that
//! precision and adds `2^local` to the propagated error whenever the backend
//! had to round.

use exact_backend::{BackendError, Dyadic};
use exact_types::{ErrorBound, Interrupt, LazyBool, NumericError, Outcome, PrecisionPolicy};
use num_bigint::BigInt;

use super::fast::Interval;
use crate::context;

/// Extra bits the relative policy keeps below the magnitude of a result.
const RELATIVE_GUARD_BITS: i64 = 80;

pub(crate) fn backend_error(err: BackendError) -> Interrupt {
    match err {
        BackendError::DivisionByZero => NumericError::DivisionByZero.into(),
        BackendError::NegativeSquareRoot => NumericError::NegativeSquareRoot.into(),
        BackendError::MalformedLiteral(literal) => {
            NumericError::MalformedLiteral { literal }.into()
        }
        BackendError::ExponentOutOfRange(literal) => {
            NumericError::LiteralExponentOutOfRange { literal }.into()
        }
    }
}

/// `bound` as an exact dyadic.
pub(crate) fn bound_value(bound: ErrorBound) -> Dyadic {
    Dyadic::new(BigInt::from(bound.mantissa()), i64::from(bound.exponent()))
}

/// Precision for a result of size about `2^magnitude_log2` whose propagated
/// error is about `2^error_log2`.
fn local_precision(magnitude_log2: i64, error_log2: i32) -> i32 {
    let actual = i64::from(context::actual_precision());
    let floor = match context::policy() {
        PrecisionPolicy::Absolute => actual,
        PrecisionPolicy::Relative => magnitude_log2 - RELATIVE_GUARD_BITS + actual,
    };
    floor
        .max(i64::from(error_log2))
        .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Rounding to `precision` leaves `value` unchanged.
fn representable(value: &Dyadic, precision: i32) -> bool {
    value.is_zero() || value.exponent() >= i64::from(precision) - 1
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Ball {
    center: Dyadic,
    error: ErrorBound,
    /// Upper bound of `|center|`.
    magnitude: ErrorBound,
}

impl Ball {
    pub(crate) fn new(center: Dyadic, error: ErrorBound) -> Outcome<Self> {
        let magnitude = center.magnitude_upper()?;
        Ok(Self {
            center,
            error,
            magnitude,
        })
    }

    pub(crate) fn exact(center: Dyadic) -> Outcome<Self> {
        Self::new(center, ErrorBound::exact_zero())
    }

    /// Smallest ball containing a double interval.
    pub(crate) fn from_interval(interval: Interval) -> Outcome<Self> {
        let (Some(lower), Some(upper)) = (
            Dyadic::from_f64(interval.lower()),
            Dyadic::from_f64(interval.upper()),
        ) else {
            return Err(NumericError::ConversionFromNonFinite {
                value: format!("[{}, {}]", interval.lower(), interval.upper()),
            }
            .into());
        };
        let center = lower.add_exact(&upper).shift(-1);
        let radius = upper.sub_exact(&lower).shift(-1).magnitude_upper()?;
        Self::new(center, radius)
    }

    pub(crate) const fn center(&self) -> &Dyadic {
        &self.center
    }

    pub(crate) const fn error(&self) -> ErrorBound {
        self.error
    }

    pub(crate) const fn magnitude(&self) -> ErrorBound {
        self.magnitude
    }

    pub(crate) fn with_error(&self, error: ErrorBound) -> Self {
        Self {
            error,
            ..self.clone()
        }
    }

    /// Upper bound of `|x|` over the whole ball.
    pub(crate) fn upper_magnitude(&self) -> Outcome<ErrorBound> {
        Ok(self.magnitude.add(self.error)?)
    }

    /// Lower bound of `|x|` over the whole ball, `None` when the ball
    /// touches zero.
    pub(crate) fn lower_magnitude(&self) -> Outcome<Option<ErrorBound>> {
        Ok(self.center.magnitude_lower()?.sub_floor(self.error)?)
    }

    pub(crate) fn is_exact(&self) -> bool {
        self.error.is_zero()
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    pub(crate) fn neg(&self) -> Self {
        Self {
            center: -&self.center,
            error: self.error,
            magnitude: self.magnitude,
        }
    }

    pub(crate) fn abs(&self) -> Self {
        if self.center.is_negative() {
            self.neg()
        } else {
            self.clone()
        }
    }

    pub(crate) fn add(&self, other: &Self) -> Outcome<Self> {
        let error = self.error.add(other.error)?;
        let magnitude = i64::from(self.magnitude.log2_ceil().max(other.magnitude.log2_ceil()));
        let local = local_precision(magnitude, error.log2_ceil());
        if representable(&self.center, local) && representable(&other.center, local) {
            return Self::new(self.center.add_exact(&other.center), error);
        }
        Self::new(
            self.center.add(&other.center, local),
            error.add_power_of_two(local)?,
        )
    }

    pub(crate) fn sub(&self, other: &Self) -> Outcome<Self> {
        self.add(&other.neg())
    }

    pub(crate) fn mul(&self, other: &Self) -> Outcome<Self> {
        let error = self
            .magnitude
            .multiply(other.error)?
            .add(other.magnitude.add(other.error)?.multiply(self.error)?)?;
        let magnitude =
            i64::from(self.magnitude.log2_ceil()) + i64::from(other.magnitude.log2_ceil());
        let local = local_precision(magnitude, error.log2_ceil());
        Self::rounded(self.center.mul_exact(&other.center), error, local)
    }

    pub(crate) fn square(&self) -> Outcome<Self> {
        let error = self
            .magnitude
            .multiply(self.error)?
            .shift(1)?
            .add(self.error.multiply(self.error)?)?;
        let magnitude = 2 * i64::from(self.magnitude.log2_ceil());
        let local = local_precision(magnitude, error.log2_ceil());
        Self::rounded(self.center.mul_exact(&self.center), error, local)
    }

    fn rounded(exact: Dyadic, error: ErrorBound, local: i32) -> Outcome<Self> {
        if representable(&exact, local) {
            return Self::new(exact, error);
        }
        Self::new(exact.round(i64::from(local)), error.add_power_of_two(local)?)
    }

    pub(crate) fn div(&self, divisor: &Self) -> Outcome<Self> {
        if !ErrorBound::less_sound(divisor.error, divisor.magnitude.half()) {
            tracing::trace!(
                error_mantissa = divisor.error.mantissa(),
                error_exponent = divisor.error.exponent(),
                precision = context::actual_precision(),
                "divisor not provably nonzero"
            );
            return Err(Interrupt::reiterate(0));
        }
        let center_low = divisor.center.magnitude_lower()?;
        let Some(low) = center_low.sub_floor(divisor.error)? else {
            return Err(Interrupt::reiterate(0));
        };
        let error = self
            .magnitude
            .multiply(divisor.error)?
            .add(divisor.magnitude.multiply(self.error)?)?
            .div_ceil(low)?
            .div_ceil(center_low)?;
        let magnitude =
            i64::from(self.magnitude.log2_ceil()) - i64::from(center_low.log2_floor());
        let local = local_precision(magnitude, error.log2_ceil());
        let quotient = self
            .center
            .div(&divisor.center, local)
            .map_err(backend_error)?;
        if self.center.is_zero() {
            return Self::new(quotient, error);
        }
        Self::new(quotient, error.add_power_of_two(local)?)
    }

    pub(crate) fn sqrt(&self) -> Outcome<Self> {
        let low = self.center.magnitude_lower()?;
        if self.center.is_zero() || !ErrorBound::less_sound(self.error.shift(2)?, low) {
            if self.center.is_negative() && ErrorBound::less_sound(self.error, low) {
                return Err(NumericError::NegativeSquareRoot.into());
            }
            // |x| <= |center| + error <= 5 * error
            let radius = self.error.sqrt_ceil()?.multiply(ErrorBound::new(3, 0)?)?;
            return Self::new(Dyadic::zero(), radius);
        }
        if self.center.is_negative() {
            return Err(NumericError::NegativeSquareRoot.into());
        }
        let Some(lower) = low.sub_floor(self.error)? else {
            return Err(Interrupt::reiterate(0));
        };
        let error = self.error.div_ceil(lower.sqrt_floor()?.shift(1)?)?;
        let magnitude = i64::from(low.log2_floor() / 2);
        let local = local_precision(magnitude, error.log2_ceil());
        let root = self.center.sqrt(local).map_err(backend_error)?;
        Self::new(root, error.add_power_of_two(local)?)
    }

    /// `self * 2^shift`, exactly.
    pub(crate) fn scale(&self, shift: i32) -> Outcome<Self> {
        Self::new(
            self.center.shift(i64::from(shift)),
            self.error.shift(shift)?,
        )
    }

    /// `self < other`, decided only when the difference clearly exceeds its
    /// error.
    pub(crate) fn lt(&self, other: &Self) -> Outcome<LazyBool> {
        let difference = other.sub(self)?;
        if difference.is_exact()
            || ErrorBound::less_sound(difference.error, difference.center.magnitude_lower()?)
        {
            return Ok((difference.center.signum() > 0).into());
        }
        Ok(LazyBool::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use exact_types::Reiterate;
    use proptest::prelude::*;

    use super::*;
    use crate::context::{PrecisionMode, Stiff};

    fn ball(center: f64, error: f64) -> Ball {
        Ball::new(
            Dyadic::from_f64(center).unwrap(),
            ErrorBound::from_f64_ceil(error).unwrap(),
        )
        .unwrap()
    }

    fn bounds(ball: &Ball) -> (f64, f64) {
        let center = ball.center().to_f64();
        let error = ball.error().to_f64();
        (center - error, center + error)
    }

    #[test]
    fn exact_sums_and_products_stay_exact() {
        let x = Ball::exact(Dyadic::from(3_i64)).unwrap();
        let y = Ball::exact(Dyadic::from(5_i64)).unwrap();
        let sum = x.add(&y).unwrap();
        assert!(sum.is_exact());
        assert_eq!(sum.center(), &Dyadic::from(8_i64));
        let product = x.mul(&y).unwrap();
        assert!(product.is_exact());
        assert_eq!(product.center(), &Dyadic::from(15_i64));
    }

    #[test]
    fn inexact_division_carries_rounding_error() {
        let one = Ball::exact(Dyadic::one()).unwrap();
        let three = Ball::exact(Dyadic::from(3_i64)).unwrap();
        let third = one.div(&three).unwrap();
        assert!(!third.is_exact());
        let (low, high) = bounds(&third);
        assert!(low <= 1.0 / 3.0 && 1.0 / 3.0 <= high);
        assert!(third.error().log2_ceil() <= context::actual_precision());
    }

    #[test]
    fn division_by_exact_zero_asks_for_more_precision() {
        let one = Ball::exact(Dyadic::one()).unwrap();
        let zero = Ball::exact(Dyadic::zero()).unwrap();
        assert_eq!(one.div(&zero), Err(Interrupt::Reiterate(Reiterate::new(0))));
    }

    #[test]
    fn division_by_an_uncertain_divisor_asks_for_more_precision() {
        let one = Ball::exact(Dyadic::one()).unwrap();
        let fuzzy = ball(1e-10, 1e-9);
        assert_eq!(one.div(&fuzzy), Err(Interrupt::Reiterate(Reiterate::new(0))));
    }

    #[test]
    fn sqrt_near_zero_is_a_ball_around_zero() {
        let fuzzy = ball(-1e-12, 1e-10);
        let root = fuzzy.sqrt().unwrap();
        assert!(root.center().is_zero());
        assert!(root.error().to_f64() >= (1.1e-10_f64).sqrt());
    }

    #[test]
    fn sqrt_of_a_clearly_negative_ball_fails() {
        assert_eq!(
            ball(-2.0, 0.5).sqrt(),
            Err(Interrupt::Numeric(NumericError::NegativeSquareRoot))
        );
    }

    #[test]
    fn absolute_policy_ignores_the_magnitude() {
        let big = Ball::exact(Dyadic::one().shift(200)).unwrap();
        let three = Ball::exact(Dyadic::from(3_i64)).unwrap();
        let relative = big.div(&three).unwrap();
        let absolute = {
            let _mode = PrecisionMode::enter(PrecisionPolicy::Absolute);
            big.div(&three).unwrap()
        };
        assert!(absolute.error().log2_ceil() <= context::actual_precision() + 1);
        assert!(relative.error().log2_ceil() > absolute.error().log2_ceil());
    }

    #[test]
    fn comparison_needs_a_clear_gap() {
        let one = Ball::exact(Dyadic::one()).unwrap();
        let near = ball(1.0, 1e-3);
        assert_eq!(one.lt(&near).unwrap(), LazyBool::Unknown);
        let two = Ball::exact(Dyadic::from(2_i64)).unwrap();
        assert_eq!(one.lt(&two).unwrap(), LazyBool::True);
        assert_eq!(two.lt(&one).unwrap(), LazyBool::False);
        assert_eq!(one.lt(&one).unwrap(), LazyBool::False);
    }

    #[test]
    fn intervals_convert_to_enclosing_balls() {
        let interval = Interval::point(0.25).add(Interval::point(0.5));
        let converted = Ball::from_interval(interval).unwrap();
        assert!(converted.is_exact());
        assert_eq!(converted.center().to_f64(), 0.75);
    }

    fn contains(ball: &Ball, value: f64) -> bool {
        let (low, high) = bounds(ball);
        let slack = 4.0 * f64::EPSILON * value.abs().max(1e-300);
        low - slack <= value && value <= high + slack
    }

    proptest! {
        #[test]
        fn arithmetic_is_sound(
            a in -1e6_f64..1e6,
            b in -1e6_f64..1e6,
            ea in 0.0_f64..1e-3,
            eb in 0.0_f64..1e-3,
            step in 1_usize..40,
        ) {
            let _stiff = Stiff::absolute(step);
            let x = ball(a, ea);
            let y = ball(b, eb);
            let sum = x.add(&y).unwrap();
            prop_assert!(contains(&sum, a + b));
            prop_assert!(contains(&sum, (a + ea) + (b - eb)));
            let difference = x.sub(&y).unwrap();
            prop_assert!(contains(&difference, (a - ea) - (b - eb)));
            let product = x.mul(&y).unwrap();
            prop_assert!(contains(&product, (a + ea) * (b + eb)));
            prop_assert!(contains(&product, (a - ea) * (b + eb)));
            if let Ok(quotient) = x.div(&y) {
                prop_assert!(contains(&quotient, (a + ea) / (b - eb)));
                prop_assert!(contains(&quotient, (a - ea) / (b + eb)));
            }
        }
    }
}
