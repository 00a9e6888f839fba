//! Limit operators: search the precision schedule for a good enough
//! approximation.
//!
//! Each operator evaluates a caller-supplied approximation `f(p)` that is
//! within `2^p` of the true result whenever it succeeds (and may ask for more
//! precision otherwise), runs it inside a [`LimitComputation`] scope and
//! attaches a sound error to what it returns.
//!
//! | Operator | Argument error | Search |
//! |---|---|---|
//! | [`limit`] | none | refine the step until `f` succeeds |
//! | [`limit_with`] | carried by `f` | demanded step, then a coarse-to-fine sweep |
//! | [`limit_lip`] | `e(x) * 2^lip` | refine until `f` is within `2^p` |
//! | [`limit_mv`] | carried by `f` | like `limit_with`, with a recorded choice |
//!
//! Nothing inside a limit is recorded in the multi-value cache.

use exact_types::{ErrorBound, Interrupt, LazyBool, MIN_EXPONENT, Outcome};

use crate::cache::{get_cached, modify_cached, put_cached};
use crate::context::{self, LimitComputation, SingleValued};
use crate::real::Real;

/// First step of the sweep of [`limit_with`].
const SWEEP_START: usize = 1;
/// Steps between two attempts of the sweep.
const SWEEP_STRIDE: usize = 4;
/// Steps added after a failed attempt of [`limit`] and [`limit_lip`].
const REFINE_STEPS: usize = 2;

// ============================================================================
// Traits
// ============================================================================

/// Results a limit can attach an error to.
pub trait LimitValue: Sized {
    /// Largest error of any component.
    fn limit_error(&self) -> Outcome<ErrorBound>;

    /// Widens the error of every component by `extra`.
    fn add_limit_error(&mut self, extra: ErrorBound) -> Outcome<()>;
}

impl LimitValue for Real {
    fn limit_error(&self) -> Outcome<ErrorBound> {
        self.error()
    }

    fn add_limit_error(&mut self, extra: ErrorBound) -> Outcome<()> {
        self.add_error(extra)
    }
}

impl LimitValue for Vec<Real> {
    fn limit_error(&self) -> Outcome<ErrorBound> {
        self.iter().try_fold(ErrorBound::exact_zero(), |largest, value| {
            Ok(largest.max(value.error()?))
        })
    }

    fn add_limit_error(&mut self, extra: ErrorBound) -> Outcome<()> {
        self.iter_mut().try_for_each(|value| value.add_error(extra))
    }
}

/// Arguments of a continuous limit.
pub trait Continuous {
    /// Smallest `k` with every argument error at most `2^k`.
    fn error_exponent(&self) -> Outcome<i32>;
}

impl Continuous for Real {
    fn error_exponent(&self) -> Outcome<i32> {
        Ok(self.error()?.log2_ceil())
    }
}

impl<T: Continuous + ?Sized> Continuous for &T {
    fn error_exponent(&self) -> Outcome<i32> {
        (**self).error_exponent()
    }
}

impl<T: Continuous> Continuous for [T] {
    fn error_exponent(&self) -> Outcome<i32> {
        self.iter().try_fold(MIN_EXPONENT, |largest, value| {
            Ok(largest.max(value.error_exponent()?))
        })
    }
}

impl<T: Continuous> Continuous for Vec<T> {
    fn error_exponent(&self) -> Outcome<i32> {
        self.as_slice().error_exponent()
    }
}

impl<A: Continuous, B: Continuous> Continuous for (A, B) {
    fn error_exponent(&self) -> Outcome<i32> {
        Ok(self.0.error_exponent()?.max(self.1.error_exponent()?))
    }
}

impl<A: Continuous, B: Continuous, C: Continuous> Continuous for (A, B, C) {
    fn error_exponent(&self) -> Outcome<i32> {
        Ok(self
            .0
            .error_exponent()?
            .max(self.1.error_exponent()?)
            .max(self.2.error_exponent()?))
    }
}

// ============================================================================
// Discrete limit
// ============================================================================

/// Evaluates `f` at the demanded precision, refining the working precision
/// of its body until it succeeds.
pub fn limit<T, F>(mut f: F) -> Outcome<T>
where
    T: LimitValue,
    F: FnMut(i32) -> Outcome<T>,
{
    let env = LimitComputation::enter(1);
    let precision = env.saved_precision();
    loop {
        match f(precision) {
            Ok(mut value) => {
                value.add_limit_error(ErrorBound::power_of_two(precision)?)?;
                return Ok(value);
            }
            Err(Interrupt::Reiterate(_)) => {
                if context::at_last_step() {
                    return Err(Interrupt::reiterate(0));
                }
                env.inc_step(REFINE_STEPS);
                tracing::trace!(
                    precision,
                    step = context::step(),
                    "limit attempt failed, refining"
                );
            }
            Err(err) => return Err(err),
        }
    }
}

// ============================================================================
// Continuous limit
// ============================================================================

struct Candidate<T> {
    value: T,
    precision: i32,
    error: ErrorBound,
}

fn attempt<T, A, F>(f: &mut F, args: &A) -> Outcome<Candidate<T>>
where
    T: LimitValue,
    A: ?Sized,
    F: FnMut(i32, &A) -> Outcome<T>,
{
    let precision = context::actual_precision();
    let value = f(precision, args)?;
    let error = value.limit_error()?.add_power_of_two(precision)?;
    Ok(Candidate {
        value,
        precision,
        error,
    })
}

/// Limit of a function that is continuous in `args`.
///
/// `f(p, args)` returns an approximation within `2^p` of the result for the
/// arguments' centers, carrying the propagated argument error itself. The
/// demanded step is tried first. If it fails, or its error is dominated by
/// something other than the arguments, the schedule is swept coarse to fine
/// from step 1, keeping the smallest error. The sweep ends at the demanded
/// step, at the arguments' error floor, or at the first failure after a
/// success.
pub fn limit_with<T, A, F>(mut f: F, args: &A) -> Outcome<T>
where
    T: LimitValue,
    A: Continuous + ?Sized,
    F: FnMut(i32, &A) -> Outcome<T>,
{
    let args_exponent = args.error_exponent()?;
    let env = LimitComputation::enter(0);
    let schedule = context::schedule();
    let saved_step = env.saved_step();
    let coarser = schedule.precision(saved_step.saturating_sub(1));
    // no attempt can get much below the arguments' own error
    let floor = args_exponent.saturating_add(1);

    let mut best: Option<Candidate<T>> = None;
    let mut element = saved_step;
    let mut sweeping = false;
    loop {
        context::set_step(element);
        match attempt(&mut f, args) {
            Ok(candidate) => {
                let exponent = candidate.error.log2_ceil();
                if !sweeping {
                    if exponent <= coarser || exponent <= args_exponent {
                        best = Some(candidate);
                        break;
                    }
                    tracing::trace!(
                        precision = candidate.precision,
                        error_exponent = exponent,
                        "limit error too large, sweeping the schedule"
                    );
                    sweeping = true;
                    element = SWEEP_START;
                }
                let improves = best
                    .as_ref()
                    .is_none_or(|best| ErrorBound::less_sound(candidate.error, best.error));
                if improves {
                    best = Some(candidate);
                }
                let settled = best
                    .as_ref()
                    .is_some_and(|best| best.error.log2_ceil() <= floor);
                if element >= saved_step || settled {
                    break;
                }
            }
            Err(Interrupt::Reiterate(_)) => {
                if best.is_some() {
                    break;
                }
                if sweeping {
                    return Err(Interrupt::reiterate(0));
                }
                tracing::trace!(step = element, "limit attempt failed, sweeping the schedule");
                sweeping = true;
                element = SWEEP_START;
                continue;
            }
            Err(err) => return Err(err),
        }
        element += SWEEP_STRIDE;
        if element > schedule.last_step() {
            break;
        }
    }

    let Some(Candidate {
        mut value,
        precision,
        ..
    }) = best
    else {
        return Err(Interrupt::reiterate(0));
    };
    value.add_limit_error(ErrorBound::power_of_two(precision)?)?;
    Ok(value)
}

/// [`limit_with`] for a function that refines a multi-valued integer choice.
///
/// `f(p, &mut choice, args)` may update `choice`; the final value is recorded
/// so that retries of the enclosing driver start from it.
pub fn limit_mv<T, A, F>(mut f: F, args: &A) -> Outcome<T>
where
    T: LimitValue,
    A: Continuous + ?Sized,
    F: FnMut(i32, &mut i32, &A) -> Outcome<T>,
{
    let mut choice = match get_cached::<i32>() {
        Some(choice) => choice,
        None => {
            put_cached(0_i32);
            0
        }
    };
    let result = limit_with(|precision, args: &A| f(precision, &mut choice, args), args);
    modify_cached(choice);
    result
}

// ============================================================================
// Lipschitz limits
// ============================================================================

/// Evaluates `f` at the exact center of `x` and adds `e(x) * 2^lip`.
///
/// `on_domain(x)` must be provably true, otherwise more precision is
/// requested.
pub fn limit_lip<F, D>(mut f: F, lip: i32, on_domain: D, x: &Real) -> Outcome<Real>
where
    F: FnMut(i32, &Real) -> Outcome<Real>,
    D: FnOnce(&Real) -> Outcome<LazyBool>,
{
    let (center, argument) = exactify(x, on_domain)?;
    let env = LimitComputation::enter(0);
    let target = env.saved_precision();
    let mut value = loop {
        match f(target, &center) {
            Ok(value) => {
                if value.error()?.log2_ceil() <= target {
                    break value;
                }
            }
            Err(Interrupt::Reiterate(_)) => {}
            Err(err) => return Err(err),
        }
        if context::at_last_step() {
            return Err(Interrupt::reiterate(0));
        }
        env.inc_step(REFINE_STEPS);
        tracing::trace!(
            precision = target,
            step = context::step(),
            "lipschitz attempt too coarse, refining"
        );
    };
    value.add_error(argument.shift(lip)?.add_power_of_two(target)?)?;
    Ok(value)
}

/// [`limit_lip`] with the Lipschitz exponent computed from `x`.
pub fn limit_lip_with<F, L>(f: F, lip_bound: L, x: &Real) -> Outcome<Real>
where
    F: FnMut(i32, &Real) -> Outcome<Real>,
    L: FnOnce(&Real) -> Outcome<i32>,
{
    let lip = {
        let _single = SingleValued::enter();
        lip_bound(x)?
    };
    limit_lip(f, lip, |_| Ok(LazyBool::True), x)
}

/// Single evaluation of `f` at the exact center of `x` with error
/// propagation `e(x) * 2^lip`.
pub fn lipschitz<F, D>(f: F, lip: i32, on_domain: D, x: &Real) -> Outcome<Real>
where
    F: FnOnce(&Real) -> Outcome<Real>,
    D: FnOnce(&Real) -> Outcome<LazyBool>,
{
    let (center, argument) = exactify(x, on_domain)?;
    let mut value = {
        let _single = SingleValued::enter();
        f(&center)?
    };
    value.add_error(argument.shift(lip)?)?;
    Ok(value)
}

/// Checks the domain and splits `x` into its exact center and its error.
fn exactify<D>(x: &Real, on_domain: D) -> Outcome<(Real, ErrorBound)>
where
    D: FnOnce(&Real) -> Outcome<LazyBool>,
{
    if !on_domain(x)?.is_true() {
        tracing::trace!("argument not provably inside the domain");
        return Err(Interrupt::reiterate(0));
    }
    let (center, error) = x.to_formal_ball()?;
    Ok((Real::from_dyadic(center)?, error))
}
