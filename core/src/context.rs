//! Per-thread precision context.
//!
//! Every thread carries a small state record: the precision policy, the limit
//! nesting depth and the current step into the process-wide
//! [`PrecisionSchedule`]. The state is only changed through guards that
//! restore the previous value on drop, so an early `?` return unwinds the
//! context exactly like a normal exit.
//!
//! ```text
//! RetryDriver::run
//!   RunScope (step = start_step, policy = Relative, inlimit = 0)
//!     Stiff / SingleValued / PrecisionMode / LimitComputation
//!       ...nested, strictly LIFO
//! ```

use std::cell::Cell;
use std::ops::Deref;
use std::sync::OnceLock;

use exact_types::{PrecisionPolicy, PrecisionSchedule, ScheduleParams};
use thiserror::Error;

// ============================================================================
// Process-wide schedule
// ============================================================================

struct InstalledSchedule {
    params: ScheduleParams,
    schedule: PrecisionSchedule,
}

static SCHEDULE: OnceLock<InstalledSchedule> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Error)]
#[error("precision schedule already installed with {installed:?}, cannot switch to {requested:?}")]
pub struct ScheduleConflict {
    pub installed: ScheduleParams,
    pub requested: ScheduleParams,
}

/// The process-wide schedule, built from the default parameters on first use
/// unless [`install_schedule`] ran earlier.
pub fn schedule() -> &'static PrecisionSchedule {
    &SCHEDULE
        .get_or_init(|| InstalledSchedule::new(ScheduleParams::default()))
        .schedule
}

/// Installs the schedule built from `params`.
///
/// The schedule is immutable once built. Installing the same parameters again
/// is a no-op; different parameters are a [`ScheduleConflict`].
pub fn install_schedule(
    params: ScheduleParams,
) -> Result<&'static PrecisionSchedule, ScheduleConflict> {
    let installed = SCHEDULE.get_or_init(|| InstalledSchedule::new(params));
    if installed.params == params {
        Ok(&installed.schedule)
    } else {
        Err(ScheduleConflict {
            installed: installed.params,
            requested: params,
        })
    }
}

impl InstalledSchedule {
    fn new(params: ScheduleParams) -> Self {
        tracing::debug!(
            start = params.start(),
            increment = params.increment(),
            factor = params.factor(),
            "building precision schedule"
        );
        Self {
            params,
            schedule: PrecisionSchedule::new(&params),
        }
    }
}

// ============================================================================
// Thread state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct State {
    policy: PrecisionPolicy,
    inlimit: u32,
    step: usize,
}

impl State {
    const ROOT: Self = Self {
        policy: PrecisionPolicy::Relative,
        inlimit: 0,
        step: 1,
    };
}

thread_local! {
    static STATE: Cell<State> = const { Cell::new(State::ROOT) };
}

fn state() -> State {
    STATE.with(Cell::get)
}

fn update(change: impl FnOnce(&mut State)) {
    STATE.with(|cell| {
        let mut state = cell.get();
        change(&mut state);
        cell.set(state);
    });
}

/// Current step index into the schedule.
#[must_use]
pub fn step() -> usize {
    state().step
}

/// Precision exponent of the current step: results are expected to be
/// accurate to `2^actual_precision()`.
#[must_use]
pub fn actual_precision() -> i32 {
    schedule().precision(step())
}

#[must_use]
pub fn policy() -> PrecisionPolicy {
    state().policy
}

/// Depth of nested single-valued scopes. Caching is off while it is nonzero.
#[must_use]
pub fn inlimit() -> u32 {
    state().inlimit
}

/// True once the context asks for more than double precision; new values
/// are then created on the arbitrary-precision path.
#[must_use]
pub fn highlevel() -> bool {
    step() > 1
}

#[must_use]
pub fn at_last_step() -> bool {
    step() >= schedule().last_step()
}

pub(crate) fn set_step(step: usize) {
    let step = schedule().clamp_step(i64::try_from(step).unwrap_or(i64::MAX));
    update(|state| state.step = step);
}

// ============================================================================
// Guards
// ============================================================================

/// Scoped change of the working precision.
///
/// The new step is clamped to `[1, last_step]`; the previous step comes back
/// when the guard drops.
#[derive(Debug)]
#[must_use = "the precision is restored as soon as the guard drops"]
pub struct Stiff {
    saved_step: usize,
}

impl Stiff {
    fn enter(step: i64) -> Self {
        let saved_step = self::step();
        set_step(schedule().clamp_step(step));
        Self { saved_step }
    }

    /// Moves `delta` steps from the current one (positive is finer).
    pub fn relative(delta: i64) -> Self {
        Self::enter(step() as i64 + delta)
    }

    pub fn absolute(step: usize) -> Self {
        Self::enter(i64::try_from(step).unwrap_or(i64::MAX))
    }

    pub fn next_step() -> Self {
        Self::relative(1)
    }

    /// Halves the step index, for side computations that tolerate a coarser
    /// precision.
    pub fn relaxed() -> Self {
        Self::enter((step() as i64 + 1) / 2)
    }

    /// Refines the precision to at least `2^precision`; never coarsens.
    pub fn at_least(precision: i32) -> Self {
        let wanted = schedule().step_for(precision).max(step());
        Self::enter(wanted as i64)
    }

    #[must_use]
    pub const fn saved_step(&self) -> usize {
        self.saved_step
    }

    /// Precision that was active when the guard was created.
    #[must_use]
    pub fn saved_precision(&self) -> i32 {
        schedule().precision(self.saved_step)
    }

    /// Precision `delta` steps away from the saved one.
    #[must_use]
    pub fn saved_precision_at(&self, delta: i64) -> i32 {
        schedule().precision(schedule().clamp_step(self.saved_step as i64 + delta))
    }

    /// Refines the current step by `steps` while the guard is alive.
    pub fn inc_step(&self, steps: usize) {
        set_step(step().saturating_add(steps));
    }
}

impl Drop for Stiff {
    fn drop(&mut self) {
        set_step(self.saved_step);
    }
}

/// Marks a region whose result does not depend on multi-valued choices.
///
/// Inside it, cached decisions are neither recorded nor replayed.
#[derive(Debug)]
#[must_use = "the region ends as soon as the guard drops"]
pub struct SingleValued {
    _private: (),
}

impl SingleValued {
    pub fn enter() -> Self {
        update(|state| state.inlimit += 1);
        Self { _private: () }
    }
}

impl Drop for SingleValued {
    fn drop(&mut self) {
        update(|state| state.inlimit = state.inlimit.saturating_sub(1));
    }
}

/// [`Stiff`] and [`SingleValued`] together: the scope of one limit operator.
#[derive(Debug)]
#[must_use = "the limit scope ends as soon as the guard drops"]
pub struct LimitComputation {
    stiff: Stiff,
    _single: SingleValued,
}

impl LimitComputation {
    pub fn enter(delta: i64) -> Self {
        Self {
            _single: SingleValued::enter(),
            stiff: Stiff::relative(delta),
        }
    }
}

impl Deref for LimitComputation {
    type Target = Stiff;

    fn deref(&self) -> &Stiff {
        &self.stiff
    }
}

/// Scoped override of the precision policy.
#[derive(Debug)]
#[must_use = "the policy is restored as soon as the guard drops"]
pub struct PrecisionMode {
    saved: PrecisionPolicy,
}

impl PrecisionMode {
    pub fn enter(policy: PrecisionPolicy) -> Self {
        let saved = self::policy();
        update(|state| state.policy = policy);
        Self { saved }
    }
}

impl Drop for PrecisionMode {
    fn drop(&mut self) {
        let saved = self.saved;
        update(|state| state.policy = saved);
    }
}

/// Whole-context scope of one driver invocation.
pub(crate) struct RunScope {
    saved: State,
}

impl RunScope {
    pub(crate) fn enter(start_step: usize) -> Self {
        let saved = state();
        STATE.with(|cell| {
            cell.set(State {
                policy: PrecisionPolicy::Relative,
                inlimit: 0,
                step: schedule().clamp_step(start_step as i64),
            });
        });
        Self { saved }
    }
}

impl Drop for RunScope {
    fn drop(&mut self) {
        let saved = self.saved;
        STATE.with(|cell| cell.set(saved));
    }
}
