//! Core domain types for exact real arithmetic.
//!
//! This crate contains pure types with no IO and no global state: error
//! bounds, three-valued comparison results, the retry/numeric signals that
//! flow through every fallible operation, and the precision schedule.

mod error_bound;
mod lazy_bool;
mod schedule;
mod signal;

pub use error_bound::{
    EXP_MAX, EXP_MIN, ErrorBound, MAX_MANTISSA, MIN_EXPONENT, MIN_MANTISSA,
};
pub use lazy_bool::LazyBool;
pub use schedule::{
    DriverSettings, PrecisionPolicy, PrecisionSchedule, ScheduleError, ScheduleParams,
};
pub use signal::{Interrupt, NumericError, Outcome, Reiterate};
