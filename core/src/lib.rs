//! Exact real arithmetic.
//!
//! A [`Real`] is a number together with a guaranteed error bound. Decisions
//! that cannot be made at the current working precision (is `x < y` when the
//! two overlap?) surface as an [`Interrupt::Reiterate`], and the
//! [`RetryDriver`] reruns the whole computation at a finer precision until
//! every decision is settled.
//!
//! ```no_run
//! use exact_core::{Real, resolve, run};
//!
//! let bigger = run(|| {
//!     let root = Real::from(2).sqrt()?;
//!     resolve(root.gt(&Real::ratio(141, 100)?)?)
//! });
//! assert_eq!(bigger, Ok(true));
//! ```
//!
//! Multi-valued decisions ([`resolve`], [`choose`], [`Real::approx`] and
//! friends) are recorded per invocation so a retry takes the same branches
//! as the attempt before it.

mod cache;
mod constants;
mod context;
mod driver;
mod lazy;
mod limit;
mod real;

pub use cache::{Cacheable, cached, get_cached, modify_cached, put_cached};
pub use constants::{euler, ln2, pi};
pub use context::{
    LimitComputation, PrecisionMode, ScheduleConflict, SingleValued, Stiff, actual_precision,
    at_last_step, highlevel, inlimit, install_schedule, policy, schedule, step,
};
pub use driver::{ExecError, RetryDriver, RunStats, SetupError, run};
pub use exact_backend::Dyadic;
pub use exact_types::{
    DriverSettings, ErrorBound, Interrupt, LazyBool, NumericError, Outcome, PrecisionPolicy,
    PrecisionSchedule, Reiterate, ScheduleParams,
};
pub use lazy::{check, choose, resolve};
pub use limit::{
    Continuous, LimitValue, limit, limit_lip, limit_lip_with, limit_mv, limit_with, lipschitz,
};
pub use real::{DecimalForm, Real};
