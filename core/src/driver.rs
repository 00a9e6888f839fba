//! Retry driver: runs a computation until it succeeds at some precision.
//!
//! # Escalation Policy
//!
//! - Start at `start_step` (default 1) with the Relative policy
//! - On [`Reiterate`]: advance `step_increment` steps (default 4) at a time,
//!   at most `prec_skip` times (default 5), until the precision reaches the
//!   current precision plus the requested delta
//! - On [`NumericError`]: stop, never retried
//! - Optional `max_iterations` bound; retrying at the last schedule step is
//!   [`ExecError::PrecisionExhausted`]
//!
//! Multi-value caches are rewound before every attempt, so decisions taken
//! in earlier attempts are replayed in the same order.

use exact_config::{ConfigError, ExactConfig};
use exact_types::{DriverSettings, Interrupt, NumericError, Outcome, Reiterate};
use thiserror::Error;

use crate::cache::CacheScope;
use crate::context::{self, RunScope, ScheduleConflict};

/// Why a driver invocation produced no value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error(transparent)]
    Numeric(#[from] NumericError),
    #[error("gave up after {attempts} attempts at precision 2^({precision})")]
    IterationLimit { attempts: u32, precision: i32 },
    #[error("retry requested at the finest precision 2^({precision})")]
    PrecisionExhausted { precision: i32 },
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schedule(#[from] ScheduleConflict),
}

/// What a successful invocation cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub attempts: u32,
    pub final_step: usize,
    pub final_precision: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RetryDriver {
    settings: DriverSettings,
}

impl RetryDriver {
    #[must_use]
    pub const fn new(settings: DriverSettings) -> Self {
        Self { settings }
    }

    /// Builds a driver from configuration, installing the configured
    /// precision schedule for the whole process.
    pub fn from_config(config: &ExactConfig) -> Result<Self, SetupError> {
        context::install_schedule(config.schedule_params()?)?;
        Ok(Self::new(config.driver_settings()?))
    }

    #[must_use]
    pub const fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Runs `compute` until it returns a value or a fatal error.
    pub fn run<T, F>(&self, compute: F) -> Result<T, ExecError>
    where
        F: FnMut() -> Outcome<T>,
    {
        self.run_with_stats(compute).map(|(value, _)| value)
    }

    pub fn run_with_stats<T, F>(&self, mut compute: F) -> Result<(T, RunStats), ExecError>
    where
        F: FnMut() -> Outcome<T>,
    {
        let schedule = context::schedule();
        let caches = CacheScope::enter();
        let _context = RunScope::enter(self.settings.start_step());
        tracing::debug!(
            step = context::step(),
            precision = context::actual_precision(),
            "starting exact computation"
        );

        let mut attempts = 0_u32;
        loop {
            attempts += 1;
            caches.rewind();

            match compute() {
                Ok(value) => {
                    let stats = RunStats {
                        attempts,
                        final_step: context::step(),
                        final_precision: context::actual_precision(),
                    };
                    tracing::debug!(
                        attempts,
                        step = stats.final_step,
                        precision = stats.final_precision,
                        "exact computation finished"
                    );
                    return Ok((value, stats));
                }
                Err(Interrupt::Numeric(err)) => {
                    tracing::debug!(attempts, error = %err, "exact computation failed");
                    return Err(err.into());
                }
                Err(Interrupt::Reiterate(signal)) => {
                    let precision = context::actual_precision();
                    if let Some(max) = self.settings.max_iterations()
                        && attempts >= max
                    {
                        tracing::debug!(attempts, precision, "iteration limit reached");
                        return Err(ExecError::IterationLimit {
                            attempts,
                            precision,
                        });
                    }
                    if context::at_last_step() {
                        return Err(ExecError::PrecisionExhausted { precision });
                    }
                    let step = self.escalate(signal);
                    tracing::debug!(
                        attempt = attempts,
                        step,
                        precision = schedule.precision(step),
                        delta = signal.precision_delta,
                        "increasing precision bound"
                    );
                }
            }
        }
    }

    /// Moves the context to the step the next attempt runs at.
    fn escalate(&self, signal: Reiterate) -> usize {
        let schedule = context::schedule();
        let target = i64::from(context::actual_precision()) + i64::from(signal.precision_delta);
        let mut step = context::step();
        let mut skips = 0;
        loop {
            skips += 1;
            step = schedule.clamp_step((step + self.settings.step_increment()) as i64);
            if i64::from(schedule.precision(step)) <= target
                || skips >= self.settings.prec_skip()
                || step == schedule.last_step()
            {
                break;
            }
        }
        context::set_step(step);
        step
    }
}

/// Runs `compute` with the default driver settings.
pub fn run<T, F>(compute: F) -> Result<T, ExecError>
where
    F: FnMut() -> Outcome<T>,
{
    RetryDriver::default().run(compute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{get_cached, put_cached};

    #[test]
    fn first_success_is_returned() {
        let (value, stats) = RetryDriver::default()
            .run_with_stats(|| Ok(context::actual_precision()))
            .unwrap();
        assert_eq!(value, context::schedule().precision(1));
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.final_step, 1);
    }

    #[test]
    fn retries_escalate_until_precise_enough() {
        let (precision, stats) = RetryDriver::default()
            .run_with_stats(|| {
                let precision = context::actual_precision();
                if precision > -200 {
                    return Err(Interrupt::reiterate(0));
                }
                Ok(precision)
            })
            .unwrap();
        assert!(precision <= -200);
        assert!(stats.attempts > 1);
        assert_eq!(stats.final_precision, precision);
    }

    #[test]
    fn delta_hint_skips_steps() {
        let (_, hinted) = RetryDriver::default()
            .run_with_stats(|| {
                let precision = context::actual_precision();
                if precision > -400 {
                    return Err(Interrupt::reiterate(-400 - precision));
                }
                Ok(())
            })
            .unwrap();
        let (_, unhinted) = RetryDriver::default()
            .run_with_stats(|| {
                if context::actual_precision() > -400 {
                    return Err(Interrupt::reiterate(0));
                }
                Ok(())
            })
            .unwrap();
        assert!(hinted.attempts < unhinted.attempts);
    }

    #[test]
    fn numeric_errors_are_not_retried() {
        let mut attempts = 0;
        let result: Result<(), _> = run(|| {
            attempts += 1;
            Err(NumericError::SizeOfZero.into())
        });
        assert_eq!(result, Err(ExecError::Numeric(NumericError::SizeOfZero)));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn iteration_limit_stops_endless_retries() {
        let settings = DriverSettings::default().with_max_iterations(Some(3));
        let result: Result<(), _> =
            RetryDriver::new(settings).run(|| Err(Interrupt::reiterate(0)));
        assert!(matches!(
            result,
            Err(ExecError::IterationLimit { attempts: 3, .. })
        ));
    }

    #[test]
    fn exhausting_the_schedule_is_reported() {
        let result: Result<(), _> = run(|| Err(Interrupt::reiterate(0)));
        assert_eq!(
            result,
            Err(ExecError::PrecisionExhausted {
                precision: context::schedule().precision(context::schedule().last_step()),
            })
        );
    }

    #[test]
    fn context_is_restored_after_a_run() {
        let before = context::step();
        let _ = run(|| {
            if context::actual_precision() > -100 {
                return Err(Interrupt::reiterate(0));
            }
            Ok(())
        });
        assert_eq!(context::step(), before);
    }

    #[test]
    fn cached_decisions_replay_across_attempts() {
        let mut first_seen = None;
        let value = run(|| {
            let value = get_cached::<i64>().unwrap_or_else(|| {
                let fresh = i64::from(context::actual_precision());
                put_cached(fresh);
                fresh
            });
            first_seen.get_or_insert(value);
            if context::actual_precision() > -150 {
                return Err(Interrupt::reiterate(0));
            }
            Ok(value)
        })
        .unwrap();
        assert_eq!(Some(value), first_seen);
    }

    #[test]
    fn nested_runs_keep_their_own_context() {
        let outer = run(|| {
            let outer_step = context::step();
            let inner = run(|| Ok(context::step())).unwrap();
            assert_eq!(context::step(), outer_step);
            Ok(inner)
        })
        .unwrap();
        assert_eq!(outer, 1);
    }
}
