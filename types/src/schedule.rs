//! Precision policy and the step schedule of working precisions.

use thiserror::Error;

/// How operations on promoted values pick their local working precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecisionPolicy {
    /// Round every result to the process precision, regardless of magnitude.
    Absolute,
    /// Round relative to the magnitude of the operands.
    #[default]
    Relative,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("starting precision must be negative (got {0})")]
    StartNotNegative(i32),
    #[error("precision increment must be negative (got {0})")]
    IncrementNotNegative(i32),
    #[error("precision growth factor must be a finite number above 1 (got {0})")]
    FactorTooSmall(f64),
    #[error("prec_skip must be at least 1")]
    ZeroPrecSkip,
    #[error("step_increment must be at least 1")]
    ZeroStepIncrement,
    #[error("start_step must lie in 1..{max} (got {step})")]
    StartStepOutOfRange { step: usize, max: usize },
}

/// Validated parameters of a [`PrecisionSchedule`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleParams {
    start: i32,
    increment: i32,
    factor: f64,
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self {
            start: -50,
            increment: -20,
            factor: 1.25,
        }
    }
}

impl ScheduleParams {
    pub fn new(start: i32, increment: i32, factor: f64) -> Result<Self, ScheduleError> {
        if start >= 0 {
            return Err(ScheduleError::StartNotNegative(start));
        }
        if increment >= 0 {
            return Err(ScheduleError::IncrementNotNegative(increment));
        }
        if !factor.is_finite() || factor <= 1.0 {
            return Err(ScheduleError::FactorTooSmall(factor));
        }
        Ok(Self {
            start,
            increment,
            factor,
        })
    }

    #[must_use]
    pub const fn start(&self) -> i32 {
        self.start
    }

    #[must_use]
    pub const fn increment(&self) -> i32 {
        self.increment
    }

    #[must_use]
    pub const fn factor(&self) -> f64 {
        self.factor
    }
}

/// Escalation parameters of a retry driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    start_step: usize,
    prec_skip: u32,
    step_increment: usize,
    max_iterations: Option<u32>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            start_step: 1,
            prec_skip: 5,
            step_increment: 4,
            max_iterations: None,
        }
    }
}

impl DriverSettings {
    pub fn new(
        start_step: usize,
        prec_skip: u32,
        step_increment: usize,
        max_iterations: Option<u32>,
    ) -> Result<Self, ScheduleError> {
        if !(1..PrecisionSchedule::STEPS).contains(&start_step) {
            return Err(ScheduleError::StartStepOutOfRange {
                step: start_step,
                max: PrecisionSchedule::STEPS,
            });
        }
        if prec_skip == 0 {
            return Err(ScheduleError::ZeroPrecSkip);
        }
        if step_increment == 0 {
            return Err(ScheduleError::ZeroStepIncrement);
        }
        Ok(Self {
            start_step,
            prec_skip,
            step_increment,
            max_iterations,
        })
    }

    /// Step a fresh invocation starts at.
    #[must_use]
    pub const fn start_step(&self) -> usize {
        self.start_step
    }

    /// Most step increments applied for one retry.
    #[must_use]
    pub const fn prec_skip(&self) -> u32 {
        self.prec_skip
    }

    /// Steps advanced per increment.
    #[must_use]
    pub const fn step_increment(&self) -> usize {
        self.step_increment
    }

    /// Attempts after which the driver gives up; `None` retries forever.
    #[must_use]
    pub const fn max_iterations(&self) -> Option<u32> {
        self.max_iterations
    }

    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: Option<u32>) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Monotone table of precision exponents indexed by step.
///
/// Step 0 is the "no precision" sentinel, step 1 is the starting precision
/// (the one the double-interval fast path is good for), and every later step
/// is at least as fine as the one before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecisionSchedule {
    steps: Vec<i32>,
}

impl PrecisionSchedule {
    pub const STEPS: usize = 512;
    /// Precision exponent of step 0.
    pub const COARSEST: i32 = 2_100_000_000;
    /// No step is finer than this, so `2^precision` stays representable.
    pub const FINEST: i32 = -900_000_000;

    #[must_use]
    pub fn new(params: &ScheduleParams) -> Self {
        let mut steps = Vec::with_capacity(Self::STEPS);
        steps.push(Self::COARSEST);
        steps.push(params.start);
        let factor = params.factor.sqrt().sqrt();
        let mut increment = i64::from(params.increment);
        for _ in 2..Self::STEPS {
            let previous = steps[steps.len() - 1];
            let candidate = (i64::from(params.start) + increment).max(i64::from(Self::FINEST));
            let precision = if candidate >= i64::from(previous) {
                previous
            } else {
                candidate as i32
            };
            steps.push(precision);
            increment = ((increment as f64 * factor) as i64 + i64::from(params.increment))
                .max(i64::from(Self::FINEST));
        }
        Self { steps }
    }

    /// Precision exponent at `step`, clamped to the last step.
    #[must_use]
    pub fn precision(&self, step: usize) -> i32 {
        self.steps[step.min(self.last_step())]
    }

    #[must_use]
    pub fn last_step(&self) -> usize {
        self.steps.len() - 1
    }

    /// Clamps a step index into `[1, last_step]`.
    #[must_use]
    pub fn clamp_step(&self, step: i64) -> usize {
        step.clamp(1, self.last_step() as i64) as usize
    }

    /// First step whose precision is at least as fine as `precision`.
    #[must_use]
    pub fn step_for(&self, precision: i32) -> usize {
        (1..self.steps.len())
            .find(|&step| self.steps[step] <= precision)
            .unwrap_or(self.last_step())
    }
}

impl Default for PrecisionSchedule {
    fn default() -> Self {
        Self::new(&ScheduleParams::default())
    }
}
