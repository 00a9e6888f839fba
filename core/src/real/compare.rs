//! Comparisons producing [`LazyBool`].
//!
//! Strict and non-strict orderings coincide on reals: equality is never
//! decidable from finite approximations, so `le` answers exactly like `lt`.

use exact_types::{ErrorBound, LazyBool, Outcome};

use super::{Real, Repr};

impl Real {
    /// `self < other`; `Unknown` while the two overlap.
    pub fn lt(&self, other: &Self) -> Outcome<LazyBool> {
        if let (Repr::Fast(x), Repr::Fast(y)) = (&self.repr, &other.repr) {
            return Ok(x.lt(*y));
        }
        self.ball()?.lt(&*other.ball()?)
    }

    pub fn le(&self, other: &Self) -> Outcome<LazyBool> {
        self.lt(other)
    }

    pub fn gt(&self, other: &Self) -> Outcome<LazyBool> {
        other.lt(self)
    }

    pub fn ge(&self, other: &Self) -> Outcome<LazyBool> {
        other.lt(self)
    }

    /// `False` once the values are provably different, `True` only for two
    /// exact and identical values.
    pub fn eq_lazy(&self, other: &Self) -> Outcome<LazyBool> {
        if let (Repr::Fast(x), Repr::Fast(y)) = (&self.repr, &other.repr) {
            if x.is_exact() && y.is_exact() {
                return Ok((x.lower() == y.lower()).into());
            }
            let apart = x.lt(*y).is_true() || y.lt(*x).is_true();
            return Ok(if apart {
                LazyBool::False
            } else {
                LazyBool::Unknown
            });
        }
        let (x, y) = (self.ball()?, other.ball()?);
        if x.is_exact() && y.is_exact() {
            return Ok((x.center() == y.center()).into());
        }
        if x.lt(&y)?.is_true() || y.lt(&x)?.is_true() {
            return Ok(LazyBool::False);
        }
        Ok(LazyBool::Unknown)
    }

    pub fn ne_lazy(&self, other: &Self) -> Outcome<LazyBool> {
        Ok(!self.eq_lazy(other)?)
    }

    /// `|self - other| < 2^exponent`, see [`Real::bound`].
    pub fn approx_eq(&self, other: &Self, exponent: i32) -> Outcome<LazyBool> {
        (self - other)?.bound(exponent)
    }

    /// Multi-valued magnitude test.
    ///
    /// `True` guarantees `|self| < 2^exponent` and `False` guarantees
    /// `|self| >= 2^(exponent - 1)`; in between either answer would be
    /// correct and `Unknown` asks for more precision.
    pub fn bound(&self, exponent: i32) -> Outcome<LazyBool> {
        let ball = self.ball()?;
        if ErrorBound::less_sound(ball.upper_magnitude()?, ErrorBound::power_of_two(exponent)?) {
            return Ok(LazyBool::True);
        }
        let half = ErrorBound::power_of_two(exponent.saturating_sub(1))?;
        if let Some(lower) = ball.lower_magnitude()?
            && !ErrorBound::less_sound(lower, half)
        {
            return Ok(LazyBool::False);
        }
        Ok(LazyBool::Unknown)
    }

    /// Multi-valued sign test.
    ///
    /// `True` guarantees `self > -2^exponent` and `False` guarantees
    /// `self < 2^exponent`.
    pub fn positive(&self, exponent: i32) -> Outcome<LazyBool> {
        let ball = self.ball()?;
        // the center's sign is the value's sign once |center| - error > 0
        let separated = ball.lower_magnitude()?.is_some();
        let tolerance = ErrorBound::power_of_two(exponent)?;
        if !separated && ErrorBound::less_sound(tolerance, ball.error()) {
            return Ok(LazyBool::Unknown);
        }
        Ok((ball.center().signum() > 0).into())
    }
}
