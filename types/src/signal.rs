//! Control signals raised by real-number operations.
//!
//! Every fallible operation returns [`Outcome`]. The error side is either a
//! request to re-run the computation at a finer precision ([`Reiterate`]) or a
//! fatal [`NumericError`] that no amount of precision can fix.

use thiserror::Error;

/// Request to abandon the current attempt and run again at a finer precision.
///
/// `precision_delta` is a hint for how many bits (as a change of the precision
/// exponent, usually negative) the caller expects to be missing. Zero means
/// "no estimate, just take the next step".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("insufficient precision (requested delta {precision_delta})")]
pub struct Reiterate {
    pub precision_delta: i32,
}

impl Reiterate {
    #[must_use]
    pub const fn new(precision_delta: i32) -> Self {
        Self { precision_delta }
    }

    /// Retry without a precision estimate.
    #[must_use]
    pub const fn next_step() -> Self {
        Self { precision_delta: 0 }
    }
}

/// Domain errors. These abort a driver invocation and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumericError {
    #[error("cannot convert a non-finite double ({value}) to a real")]
    ConversionFromNonFinite { value: String },
    #[error("the size of an exact zero is undefined")]
    SizeOfZero,
    #[error("square root of a negative number")]
    NegativeSquareRoot,
    #[error("root of degree {degree} of a negative number")]
    NegativeEvenRoot { degree: u32 },
    #[error("root of degree {degree} is undefined")]
    InvalidRootDegree { degree: u32 },
    #[error("division of a value by an exact zero")]
    DivisionByZero,
    #[error("malformed decimal literal {literal:?}")]
    MalformedLiteral { literal: String },
    #[error("decimal exponent out of range in {literal:?}")]
    LiteralExponentOutOfRange { literal: String },
}

/// Error side of every real-number operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Interrupt {
    #[error(transparent)]
    Reiterate(#[from] Reiterate),
    #[error(transparent)]
    Numeric(#[from] NumericError),
}

impl Interrupt {
    /// Shorthand for `Err(Interrupt::Reiterate(..))` at call sites.
    #[must_use]
    pub const fn reiterate(precision_delta: i32) -> Self {
        Self::Reiterate(Reiterate::new(precision_delta))
    }

    #[must_use]
    pub const fn is_reiterate(&self) -> bool {
        matches!(self, Self::Reiterate(_))
    }
}

pub type Outcome<T> = Result<T, Interrupt>;
