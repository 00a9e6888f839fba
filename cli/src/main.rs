//! Exact CLI - prints constants and sample computations to any number of
//! digits.
//!
//! ```text
//! exact pi 100          pi with 100 decimals
//! exact e 50            Euler's number
//! exact ln2 50          natural logarithm of 2
//! exact sqrt2 50        square root of 2
//! exact root 10 3 40    cube root of 10
//! exact logistic 200    logistic map x <- 3.75 x (1 - x), 200 steps from 0.5
//! ```
//!
//! Configuration comes from `$EXACT_CONFIG` or `~/.exact/config.toml`;
//! `RUST_LOG=exact_core=debug` shows every precision increase on stderr.

use std::env;
use std::error::Error;
use std::io::stderr;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use exact_config::ExactConfig;
use exact_core::{DecimalForm, Outcome, Real, RetryDriver, RunStats, euler, ln2, pi};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_DIGITS: usize = 50;
const DEFAULT_STEPS: u32 = 100;
/// Field width of the logistic map result.
const LOGISTIC_WIDTH: usize = 40;

const USAGE: &str = "usage: exact <pi|e|ln2|sqrt2> [digits]
       exact root <value> <degree> [digits]
       exact logistic [steps]";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_default();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(stderr))
        .with(env_filter)
        .init();
}

enum Command {
    Constant { name: String, digits: usize },
    Root { value: i64, degree: u32, digits: usize },
    Logistic { steps: u32 },
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            bail!("{USAGE}");
        };
        match name.as_str() {
            "pi" | "e" | "ln2" | "sqrt2" => Ok(Self::Constant {
                name: name.clone(),
                digits: optional(rest.first(), DEFAULT_DIGITS)?,
            }),
            "root" => {
                let [value, degree, rest @ ..] = rest else {
                    bail!("{USAGE}");
                };
                Ok(Self::Root {
                    value: value.parse().context("root value must be an integer")?,
                    degree: degree.parse().context("root degree must be a positive integer")?,
                    digits: optional(rest.first(), DEFAULT_DIGITS)?,
                })
            }
            "logistic" => Ok(Self::Logistic {
                steps: optional(rest.first(), DEFAULT_STEPS)?,
            }),
            other => bail!("unknown command `{other}`\n{USAGE}"),
        }
    }
}

fn optional<T>(arg: Option<&String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
{
    match arg {
        Some(text) => text
            .parse()
            .with_context(|| format!("`{text}` is not a valid count")),
        None => Ok(default),
    }
}

fn constant(name: &str) -> Outcome<Real> {
    match name {
        "pi" => pi(),
        "e" => euler(),
        "ln2" => ln2(),
        _ => Real::from(2).sqrt(),
    }
}

/// Fixed-point rendering with `digits` decimals.
fn fixed(value: &Real, digits: usize) -> Outcome<String> {
    value.to_decimal_string(digits + 8, DecimalForm::Absolute)
}

fn logistic(steps: u32) -> Outcome<String> {
    let mut x = Real::ratio(1, 2)?;
    let rate = Real::ratio(15, 4)?;
    for _ in 0..steps {
        let rest = (Real::from(1) - &x)?;
        x = ((&rate * &x)? * rest)?;
    }
    x.to_decimal_string(LOGISTIC_WIDTH, DecimalForm::Relative)
}

fn execute(driver: &RetryDriver, command: &Command) -> Result<(String, RunStats)> {
    let outcome = match command {
        Command::Constant { name, digits } => {
            driver.run_with_stats(|| fixed(&constant(name)?, *digits))
        }
        Command::Root {
            value,
            degree,
            digits,
        } => driver.run_with_stats(|| fixed(&Real::from(*value).root(*degree)?, *digits)),
        Command::Logistic { steps } => driver.run_with_stats(|| logistic(*steps)),
    };
    Ok(outcome?)
}

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let config = ExactConfig::load()?.unwrap_or_default();
    let driver = RetryDriver::from_config(&config)?;

    let (text, stats) = execute(&driver, &command)?;
    tracing::info!(
        attempts = stats.attempts,
        step = stats.final_step,
        precision = stats.final_precision,
        "computation finished"
    );
    println!("{text}");
    Ok(())
}
