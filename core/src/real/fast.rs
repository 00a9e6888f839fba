//! Double-precision interval arithmetic.
//!
//! An [`Interval`] stores `lower_pos` and `upper_neg` for the interval
//! `[lower_pos, -upper_neg]`. Both fields are rounded toward minus infinity,
//! which rounds the upper end outward as well, so a single rounding direction
//! serves both ends.
//!
//! Round-toward-minus-infinity is emulated per operation: each primitive is
//! computed in round-to-nearest and an exact residual (TwoSum or a fused
//! multiply-add) tells whether the nearest result landed above the true
//! value, in which case it steps one ulp down. In the range where residuals
//! underflow the step is taken unconditionally.

use exact_types::{LazyBool, NumericError};

/// Below this magnitude residuals may underflow.
const TINY: f64 = 1e-280;

fn add_down(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if !sum.is_finite() {
        return sum;
    }
    let b_part = sum - a;
    let residual = (a - (sum - b_part)) + (b - b_part);
    if residual < 0.0 { sum.next_down() } else { sum }
}

fn mul_down(a: f64, b: f64) -> f64 {
    if a == 0.0 || b == 0.0 {
        return 0.0;
    }
    let product = a * b;
    if !product.is_finite() {
        return product;
    }
    if product.abs() < TINY || a.mul_add(b, -product) < 0.0 {
        product.next_down()
    } else {
        product
    }
}

fn div_down(a: f64, b: f64) -> f64 {
    if a == 0.0 {
        return 0.0;
    }
    let quotient = a / b;
    if !quotient.is_finite() {
        return quotient;
    }
    if quotient.abs() < TINY || a.abs() < TINY {
        return quotient.next_down();
    }
    // a - q*b has the sign of (a/b - q) times the sign of b
    let residual = (-quotient).mul_add(b, a);
    if residual != 0.0 && (residual < 0.0) != (b < 0.0) {
        quotient.next_down()
    } else {
        quotient
    }
}

fn sqrt_down(a: f64) -> f64 {
    let root = a.sqrt();
    if root == 0.0 {
        return 0.0;
    }
    if a < TINY || (-root).mul_add(root, a) < 0.0 {
        root.next_down().max(0.0)
    } else {
        root
    }
}

fn sqrt_up(a: f64) -> f64 {
    let root = a.sqrt();
    if a == 0.0 {
        return 0.0;
    }
    if a < TINY || (-root).mul_add(root, a) > 0.0 {
        root.next_up()
    } else {
        root
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignClass {
    NonNegative,
    NonPositive,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Interval {
    lower_pos: f64,
    upper_neg: f64,
}

impl Interval {
    pub(crate) fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower_pos: lower,
            upper_neg: -upper,
        }
    }

    pub(crate) fn point(value: f64) -> Self {
        Self {
            lower_pos: value,
            upper_neg: -value,
        }
    }

    pub(crate) const fn lower(self) -> f64 {
        self.lower_pos
    }

    pub(crate) fn upper(self) -> f64 {
        -self.upper_neg
    }

    pub(crate) fn is_finite(self) -> bool {
        self.lower_pos.is_finite() && self.upper_neg.is_finite()
    }

    fn class(self) -> SignClass {
        if self.lower() >= 0.0 {
            SignClass::NonNegative
        } else if self.upper() <= 0.0 {
            SignClass::NonPositive
        } else {
            SignClass::Mixed
        }
    }

    /// Interval with lower end `lo.0 * lo.1` and upper end `hi.0 * hi.1`.
    fn product_span(lo: (f64, f64), hi: (f64, f64)) -> Self {
        Self {
            lower_pos: mul_down(lo.0, lo.1),
            upper_neg: mul_down(-hi.0, hi.1),
        }
    }

    /// Interval with lower end `lo.0 / lo.1` and upper end `hi.0 / hi.1`.
    fn quotient_span(lo: (f64, f64), hi: (f64, f64)) -> Self {
        Self {
            lower_pos: div_down(lo.0, lo.1),
            upper_neg: div_down(-hi.0, hi.1),
        }
    }

    pub(crate) fn neg(self) -> Self {
        Self {
            lower_pos: self.upper_neg,
            upper_neg: self.lower_pos,
        }
    }

    pub(crate) fn add(self, other: Self) -> Self {
        Self {
            lower_pos: add_down(self.lower_pos, other.lower_pos),
            upper_neg: add_down(self.upper_neg, other.upper_neg),
        }
    }

    pub(crate) fn sub(self, other: Self) -> Self {
        self.add(other.neg())
    }

    pub(crate) fn mul(self, other: Self) -> Self {
        let (a, b) = (self.lower(), self.upper());
        let (c, d) = (other.lower(), other.upper());
        match (self.class(), other.class()) {
            (SignClass::NonNegative, SignClass::NonNegative) => Self::product_span((a, c), (b, d)),
            (SignClass::NonNegative, SignClass::NonPositive) => Self::product_span((b, c), (a, d)),
            (SignClass::NonNegative, SignClass::Mixed) => Self::product_span((b, c), (b, d)),
            (SignClass::NonPositive, SignClass::NonNegative) => Self::product_span((a, d), (b, c)),
            (SignClass::NonPositive, SignClass::NonPositive) => Self::product_span((b, d), (a, c)),
            (SignClass::NonPositive, SignClass::Mixed) => Self::product_span((a, d), (a, c)),
            (SignClass::Mixed, SignClass::NonNegative) => Self::product_span((a, d), (b, d)),
            (SignClass::Mixed, SignClass::NonPositive) => Self::product_span((b, c), (a, c)),
            (SignClass::Mixed, SignClass::Mixed) => Self {
                lower_pos: mul_down(a, d).min(mul_down(b, c)),
                upper_neg: mul_down(-a, c).min(mul_down(-b, d)),
            },
        }
    }

    /// `None` when the divisor interval contains zero.
    pub(crate) fn div(self, other: Self) -> Option<Self> {
        let (a, b) = (self.lower(), self.upper());
        let (c, d) = (other.lower(), other.upper());
        let quotient = if c > 0.0 {
            match self.class() {
                SignClass::NonNegative => Self::quotient_span((a, d), (b, c)),
                SignClass::NonPositive => Self::quotient_span((a, c), (b, d)),
                SignClass::Mixed => Self::quotient_span((a, c), (b, c)),
            }
        } else if d < 0.0 {
            match self.class() {
                SignClass::NonNegative => Self::quotient_span((b, d), (a, c)),
                SignClass::NonPositive => Self::quotient_span((b, c), (a, d)),
                SignClass::Mixed => Self::quotient_span((b, d), (a, d)),
            }
        } else {
            return None;
        };
        Some(quotient)
    }

    pub(crate) fn square(self) -> Self {
        let (a, b) = (self.lower(), self.upper());
        match self.class() {
            SignClass::NonNegative => Self::product_span((a, a), (b, b)),
            SignClass::NonPositive => Self::product_span((b, b), (a, a)),
            SignClass::Mixed => Self {
                lower_pos: 0.0,
                upper_neg: mul_down(-a, a).min(mul_down(-b, b)),
            },
        }
    }

    pub(crate) fn abs(self) -> Self {
        match self.class() {
            SignClass::NonNegative => self,
            SignClass::NonPositive => self.neg(),
            SignClass::Mixed => Self {
                lower_pos: 0.0,
                upper_neg: self.lower_pos.min(self.upper_neg),
            },
        }
    }

    pub(crate) fn sqrt(self) -> Result<Self, NumericError> {
        let (a, b) = (self.lower(), self.upper());
        if b < 0.0 {
            return Err(NumericError::NegativeSquareRoot);
        }
        let lower_pos = if a <= 0.0 { 0.0 } else { sqrt_down(a) };
        Ok(Self {
            lower_pos,
            upper_neg: -sqrt_up(b),
        })
    }

    /// `self * 2^shift`, or `None` when scaling would round.
    pub(crate) fn scale(self, shift: i32) -> Option<Self> {
        if !(-1000..=1000).contains(&shift) {
            return None;
        }
        let factor = 2_f64.powi(shift);
        let scaled = Self {
            lower_pos: self.lower_pos * factor,
            upper_neg: self.upper_neg * factor,
        };
        let exact = scaled.is_finite()
            && scaled.lower_pos / factor == self.lower_pos
            && scaled.upper_neg / factor == self.upper_neg;
        exact.then_some(scaled)
    }

    /// `self < other`.
    pub(crate) fn lt(self, other: Self) -> LazyBool {
        if self.upper() < other.lower() {
            LazyBool::True
        } else if self.lower() >= other.upper() {
            LazyBool::False
        } else {
            LazyBool::Unknown
        }
    }

    /// Both ends coincide.
    pub(crate) fn is_exact(self) -> bool {
        self.lower() == self.upper()
    }
}
