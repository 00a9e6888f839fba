//! n-th roots, computed through the continuous limit.

use exact_backend::Dyadic;
use exact_types::{ErrorBound, Interrupt, NumericError, Outcome};
use num_bigint::{BigInt, BigUint};

use super::Real;
use super::promoted::bound_value;
use crate::limit::limit_with;

/// Bits kept in the lower root bound used for the slope estimate.
const SLOPE_BITS: i64 = 64;

/// `floor(value^(1/degree) / 2^unit)` for a nonnegative `value`.
fn root_floor(value: &Dyadic, degree: u32, unit: i64) -> BigUint {
    let shift = value.exponent() - i64::from(degree) * unit;
    let magnitude = value.mantissa().magnitude();
    let radicand = if shift >= 0 {
        magnitude << shift as u64
    } else {
        magnitude >> (-shift) as u64
    };
    radicand.nth_root(degree)
}

/// Root of the center of `x` to within `2^(precision-1)`, with the argument
/// error propagated through the slope of the root at the ball's low end.
fn root_approx(precision: i32, x: &Real, degree: u32) -> Outcome<Real> {
    let (center, error) = x.to_formal_ball()?;
    let unit = i64::from(precision) - 1;
    let center_low = center.magnitude_lower()?;

    if !ErrorBound::less_sound(error, center_low) {
        let reach = center.abs().add_exact(&bound_value(error));
        let radius = Dyadic::new(BigInt::from(root_floor(&reach, degree, unit) + 1_u32), unit);
        return Real::from_ball(Dyadic::zero(), radius.magnitude_upper()?);
    }
    if center.is_negative() && degree % 2 == 0 {
        return Err(NumericError::NegativeEvenRoot { degree }.into());
    }
    let Some(lower) = center_low.sub_floor(error)? else {
        return Err(Interrupt::reiterate(0));
    };

    // |root(x) - root(c)| <= e / (n * root(lower)^(n-1))
    let lower = bound_value(lower);
    let lower_unit = lower.bit_size() / i64::from(degree) - SLOPE_BITS;
    let lower_root = Dyadic::new(
        BigInt::from(root_floor(&lower, degree, lower_unit)),
        lower_unit,
    );
    let mut slope = Dyadic::from(i64::from(degree));
    for _ in 1..degree {
        slope = slope.mul_exact(&lower_root);
    }
    let propagated = error.div_ceil(slope.magnitude_lower()?)?;

    let root = Dyadic::new(BigInt::from(root_floor(&center.abs(), degree, unit)), unit);
    let root = if center.is_negative() { -root } else { root };
    Real::from_ball(root, propagated)
}

impl Real {
    /// Real `degree`-th root; odd degrees accept negative arguments.
    pub fn root(&self, degree: u32) -> Outcome<Self> {
        match degree {
            0 => Err(NumericError::InvalidRootDegree { degree }.into()),
            1 => Ok(self.clone()),
            2 => self.sqrt(),
            _ => limit_with(|precision, x: &Self| root_approx(precision, x, degree), self),
        }
    }
}
