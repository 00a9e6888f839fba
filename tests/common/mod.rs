//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use exact_core::{DriverSettings, Outcome, Real, RetryDriver};

/// A driver that gives up after `attempts` tries.
pub fn bounded_driver(attempts: u32) -> RetryDriver {
    RetryDriver::new(DriverSettings::default().with_max_iterations(Some(attempts)))
}

/// A driver whose first attempt already runs at `step`.
pub fn driver_starting_at(step: usize) -> RetryDriver {
    let defaults = DriverSettings::default();
    let settings = DriverSettings::new(
        step,
        defaults.prec_skip(),
        defaults.step_increment(),
        defaults.max_iterations(),
    )
    .expect("valid driver settings");
    RetryDriver::new(settings)
}

/// `sqrt(2)`, a value the double path can only bracket.
pub fn sqrt2() -> Outcome<Real> {
    Real::from(2).sqrt()
}

/// `sqrt(2) * sqrt(2) - 2`: zero, but never exactly known to be.
pub fn vanishing() -> Outcome<Real> {
    let root = sqrt2()?;
    (&root * &root)? - Real::from(2)
}
