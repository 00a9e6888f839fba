//! Mathematical constants, computed lazily per thread.
//!
//! Each constant remembers the working precision it was computed at and is
//! reused while no finer precision is demanded.

use std::cell::RefCell;
use std::thread::LocalKey;

use exact_types::{Interrupt, Outcome};

use crate::context::{self, Stiff};
use crate::limit::limit;
use crate::real::Real;

/// Rounds of the quartic iteration; each one quadruples the correct digits.
const MAX_BORWEIN_ROUNDS: i32 = 40;
const MAX_AGM_ROUNDS: usize = 64;
const MAX_SERIES_TERMS: i32 = 1 << 16;

type Slot = RefCell<Option<(Real, i32)>>;

thread_local! {
    static PI: Slot = const { RefCell::new(None) };
    static LN2: Slot = const { RefCell::new(None) };
    static EULER: Slot = const { RefCell::new(None) };
}

fn memoized<F>(slot: &'static LocalKey<Slot>, compute: F) -> Outcome<Real>
where
    F: FnOnce() -> Outcome<Real>,
{
    let precision = context::actual_precision();
    let stored = slot.with(|cell| {
        cell.borrow()
            .as_ref()
            .filter(|(_, computed_at)| *computed_at <= precision)
            .map(|(value, _)| value.clone())
    });
    if let Some(value) = stored {
        return Ok(value);
    }
    let value = compute()?;
    tracing::trace!(precision, "constant computed");
    slot.with(|cell| *cell.borrow_mut() = Some((value.clone(), precision)));
    Ok(value)
}

// ============================================================================
// pi
// ============================================================================

/// `1/pi` to within `2^precision`, by the quartic Borwein iteration.
fn reciprocal_pi(precision: i32) -> Outcome<Real> {
    let one = Real::from(1);
    let root2 = Real::from(2).sqrt()?;
    let mut y = root2.add_int(-1)?;
    let mut a = (Real::from(6) - root2.mul_int(4)?)?;
    let tolerance = precision / 4 - 8;

    for round in 0..MAX_BORWEIN_ROUNDS {
        let y4 = y.square()?.square()?;
        let r = (&one - &y4)?.sqrt()?.sqrt()?;
        let next_y = ((&one - &r)? / (&one + &r)?)?;

        let grown = next_y.add_int(1)?.square()?.square()?;
        let quadratic = (next_y.add_int(1)? + next_y.square()?)?;
        let correction = (&next_y * &quadratic)?.scale(2 * round + 3)?;
        let next_a = ((&a * &grown)? - correction)?;

        let step = (&next_a - &a)?;
        a = next_a;
        y = next_y;
        if step.bound(tolerance)?.is_true() {
            return Ok(a);
        }
    }
    tracing::trace!(precision, "borwein iteration did not settle");
    Err(Interrupt::reiterate(0))
}

/// The ratio of a circle's circumference to its diameter.
pub fn pi() -> Outcome<Real> {
    memoized(&PI, || {
        let _finer = Stiff::next_step();
        let reciprocal = limit(reciprocal_pi)?;
        Real::from(1) / reciprocal
    })
}

// ============================================================================
// ln 2
// ============================================================================

/// `ln(2)/pi` to within `2^precision`.
///
/// For large `x`, `ln x = pi / (2 * agm(1, 4/x))` up to a relative error
/// below `x^-2`; with `x = 2^n` this isolates `ln 2`.
fn ln2_over_pi(precision: i32) -> Outcome<Real> {
    let n = 8_i32.saturating_sub(precision / 2);
    let tolerance = precision.saturating_sub(8);

    let mut a = Real::from(1);
    let mut b = Real::from(1).scale(2_i32.saturating_sub(n))?;
    let mut settled = false;
    for _ in 0..MAX_AGM_ROUNDS {
        let mean = (&a + &b)?.scale(-1)?;
        b = (&a * &b)?.sqrt()?;
        a = mean;
        if (&a - &b)?.bound(tolerance)?.is_true() {
            settled = true;
            break;
        }
    }
    if !settled {
        tracing::trace!(precision, "arithmetic-geometric mean did not settle");
        return Err(Interrupt::reiterate(0));
    }
    Real::from(1) / a.mul_int(n.saturating_mul(2))?
}

/// The natural logarithm of 2.
pub fn ln2() -> Outcome<Real> {
    memoized(&LN2, || {
        let _finer = Stiff::next_step();
        let scaled = limit(ln2_over_pi)?;
        &pi()? * &scaled
    })
}

// ============================================================================
// e
// ============================================================================

/// `sum 1/k!` truncated once a term drops below `2^(precision-1)`; the
/// remaining tail is smaller than that term.
fn euler_series(precision: i32) -> Outcome<Real> {
    let tolerance = precision.saturating_sub(1);
    let mut sum = Real::from(1);
    let mut term = Real::from(1);
    for k in 1..MAX_SERIES_TERMS {
        term = term.div_int(k)?;
        if term.bound(tolerance)?.is_true() {
            return Ok(sum);
        }
        sum = (&sum + &term)?;
    }
    tracing::trace!(precision, "exponential series did not settle");
    Err(Interrupt::reiterate(0))
}

/// Euler's number.
pub fn euler() -> Outcome<Real> {
    memoized(&EULER, || limit(euler_series))
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{E, LN_2, PI};

    use exact_types::LazyBool;

    use super::*;

    fn close_to(x: &Real, expected: f64) -> bool {
        (x.to_f64(50).unwrap() - expected).abs() < 1e-14
    }

    #[test]
    fn pi_matches_the_double() {
        assert!(close_to(&pi().unwrap(), PI));
    }

    #[test]
    fn ln2_matches_the_double() {
        assert!(close_to(&ln2().unwrap(), LN_2));
    }

    #[test]
    fn euler_matches_the_double() {
        assert!(close_to(&euler().unwrap(), E));
    }

    #[test]
    fn constants_carry_a_small_error() {
        let value = pi().unwrap();
        assert!(value.error().unwrap().log2_ceil() <= -40);
        let four = Real::from(4);
        assert_eq!(value.lt(&four).unwrap(), LazyBool::True);
    }

    #[test]
    fn finer_demands_recompute() {
        let coarse = pi().unwrap();
        let _stiff = Stiff::at_least(-200);
        let fine = pi().unwrap();
        assert!(fine.error().unwrap().log2_ceil() < coarse.error().unwrap().log2_ceil());
        assert!(fine.error().unwrap().log2_ceil() <= -190);
    }
}
