//! Multi-valued conversions.
//!
//! Each conversion may answer differently at different precisions, so every
//! answer goes through the multi-value cache: inside a driver invocation a
//! retried computation sees the same approximation, size or integer it saw
//! the first time.

use std::f64::consts::LOG10_2;

use exact_backend::Dyadic;
use exact_types::{ErrorBound, Interrupt, NumericError, Outcome};
use num_bigint::BigInt;

use super::{Real, saturating_i32};
use crate::cache::cached;
use crate::context::SingleValued;
use crate::lazy::resolve;

/// Values below `2^SUBNORMAL_LIMIT` convert to a zero double.
const SUBNORMAL_LIMIT: i32 = -1150;

/// Layout of [`Real::to_decimal_string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalForm {
    /// Fixed point, absolute precision derived from the width.
    Absolute,
    /// Scientific, precision relative to the size of the value.
    Relative,
    /// The digits the current error allows, never retried.
    Show,
}

/// Bits of precision a field of `width` characters can show.
fn width_bits(width: usize) -> i32 {
    saturating_i32((width.saturating_sub(8) as i64).saturating_mul(10) / 3)
}

impl Real {
    /// A dyadic within `2^precision` of the value.
    pub fn approx(&self, precision: i32) -> Outcome<Dyadic> {
        cached(|| {
            let ball = self.ball()?;
            let allowed = ErrorBound::power_of_two(precision.saturating_sub(1))?;
            if ErrorBound::less_sound(allowed, ball.error()) {
                tracing::trace!(
                    precision,
                    error_mantissa = ball.error().mantissa(),
                    error_exponent = ball.error().exponent(),
                    "approximation too coarse"
                );
                return Err(Interrupt::reiterate(
                    precision
                        .saturating_sub(1)
                        .saturating_sub(ball.error().log2_ceil()),
                ));
            }
            Ok(ball.center().round(i64::from(precision) - 1))
        })
    }

    /// `k` with `2^(k-2) <= |self| < 2^k`.
    ///
    /// An exact zero has no size; a value whose ball touches zero asks for
    /// more precision.
    pub fn size(&self) -> Outcome<i32> {
        cached(|| {
            let ball = self.ball()?;
            let upper = ball.upper_magnitude()?;
            if upper.is_zero() {
                return Err(NumericError::SizeOfZero.into());
            }
            let size = upper.log2_floor() + 1;
            let quarter = ErrorBound::power_of_two(size - 2)?;
            match ball.lower_magnitude()? {
                Some(lower) if !ErrorBound::less_sound(lower, quarter) => Ok(size),
                _ => {
                    tracing::trace!(size, "value too close to zero for its size");
                    Err(Interrupt::reiterate(0))
                }
            }
        })
    }

    /// `k` with `|self| < 2^k`.
    pub fn upper_bound(&self) -> Outcome<i32> {
        cached(|| Ok(self.ball()?.upper_magnitude()?.log2_floor().saturating_add(1)))
    }

    /// An integer within `1/2 + 1/16` of the value.
    pub fn to_integer(&self) -> Outcome<BigInt> {
        cached(|| {
            let ball = self.ball()?;
            if ErrorBound::less_sound(ErrorBound::power_of_two(-4)?, ball.error()) {
                return Err(Interrupt::reiterate(-4 - ball.error().log2_ceil()));
            }
            let half = Dyadic::new(BigInt::from(1), -1);
            let shifted = if ball.center().is_negative() {
                ball.center().sub_exact(&half)
            } else {
                ball.center().add_exact(&half)
            };
            Ok(shifted.trunc())
        })
    }

    /// Nearest double to within `bits` bits relative to the value.
    pub fn to_f64(&self, bits: u32) -> Outcome<f64> {
        if resolve(self.bound(SUBNORMAL_LIMIT)?)? {
            return Ok(0.0);
        }
        let bits = i32::try_from(bits).unwrap_or(i32::MAX);
        let precision = self.size()?.saturating_sub(bits).saturating_sub(2);
        Ok(self.approx(precision)?.to_f64())
    }

    /// Decimal rendering in a field of about `width` characters.
    pub fn to_decimal_string(&self, width: usize, form: DecimalForm) -> Outcome<String> {
        let width = width.max(9);
        match form {
            DecimalForm::Absolute => cached(|| {
                let precision = -width_bits(width);
                let ball = self.ball()?;
                if ErrorBound::less_sound(ErrorBound::power_of_two(precision)?, ball.error()) {
                    return Err(Interrupt::reiterate(precision - ball.error().log2_ceil()));
                }
                Ok(ball.center().to_fixed(width - 8))
            }),
            DecimalForm::Relative => cached(|| {
                let ball = self.ball()?;
                if ball.center().is_zero() && ball.is_exact() {
                    return Ok("0".to_owned());
                }
                let size = {
                    let _single = SingleValued::enter();
                    self.size()?
                };
                let precision = size.saturating_sub(2).saturating_sub(width_bits(width));
                if ErrorBound::less_sound(ErrorBound::power_of_two(precision)?, ball.error()) {
                    return Err(Interrupt::reiterate(precision - ball.error().log2_ceil()));
                }
                Ok(ball.center().to_scientific(width - 8))
            }),
            DecimalForm::Show => {
                let ball = self.ball()?;
                if ball.is_exact() {
                    return Ok(ball.center().to_scientific(width - 8));
                }
                let known = ball
                    .center()
                    .bit_size()
                    .saturating_sub(i64::from(ball.error().log2_ceil()));
                let digits = (known as f64 * LOG10_2).floor() as i64;
                Ok(ball
                    .center()
                    .to_scientific(digits.clamp(1, (width - 8) as i64) as usize))
            }
        }
    }
}
