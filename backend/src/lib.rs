//! Arbitrary-precision backend for promoted reals.
//!
//! Values are [`Dyadic`] numbers over `num-bigint` integers. Inexact
//! operations take an absolute target precision and stay within `2^p` of the
//! exact result; the real-number layer adds that slack to its error bounds.

mod decimal;
mod dyadic;

use thiserror::Error;

pub use decimal::{DecimalLiteral, MAX_DECIMAL_EXPONENT, ParsedDecimal};
pub use dyadic::Dyadic;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("square root of a negative number")]
    NegativeSquareRoot,
    #[error("malformed decimal literal {0:?}")]
    MalformedLiteral(String),
    #[error("decimal exponent out of range in {0:?}")]
    ExponentOutOfRange(String),
}
