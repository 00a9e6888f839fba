//! End-to-end computations through the retry driver.

use exact_core::{ExecError, LazyBool, Real, Stiff, pi, resolve, run};

use crate::common::{bounded_driver, sqrt2, vanishing};

const PI_30: &str = "3.14159265358979323846264338327";

#[test]
fn pi_agrees_with_a_thirty_digit_reference() {
    let agrees = run(|| {
        let _stiff = Stiff::at_least(-100);
        let value = pi()?;
        let reference = Real::parse(PI_30)?;
        resolve(value.approx_eq(&reference, -95)?)
    });
    assert_eq!(agrees, Ok(true));

    let error = run(|| {
        let _stiff = Stiff::at_least(-100);
        pi()?.error()
    })
    .unwrap();
    assert!(error.log2_ceil() <= -95, "error 2^{}", error.log2_ceil());
}

#[test]
fn logistic_map_keeps_its_error_small() {
    let x = run(|| {
        let _stiff = Stiff::at_least(-60);
        let rate = Real::ratio(15, 4)?;
        let mut x = Real::ratio(1, 2)?;
        for _ in 0..20 {
            let rest = (Real::from(1) - &x)?;
            x = ((&rate * &x)? * rest)?;
        }
        Ok(x)
    })
    .unwrap();
    let error = x.error().unwrap();
    assert!(error.log2_ceil() < -20, "error 2^{}", error.log2_ceil());
    assert_eq!(x.gt(&Real::from(0)).unwrap(), LazyBool::True);
    assert_eq!(x.lt(&Real::from(1)).unwrap(), LazyBool::True);
}

#[test]
fn square_of_sqrt2_is_approximately_two() {
    for exponent in [-10, -50, -100, -200] {
        let (close, equal) = run(|| {
            let root = sqrt2()?;
            let square = (&root * &root)?;
            let two = Real::from(2);
            Ok((
                resolve(square.approx_eq(&two, exponent)?)?,
                square.eq_lazy(&two)?,
            ))
        })
        .unwrap();
        assert!(close, "not within 2^{exponent}");
        assert_ne!(equal, LazyBool::False);
    }
}

#[test]
fn decimal_tenth_times_ten_is_one() {
    let close = run(|| {
        let tenth = Real::parse("0.1")?;
        let product = tenth.mul_int(10)?;
        resolve(product.approx_eq(&Real::from(1), -60)?)
    });
    assert_eq!(close, Ok(true));
}

#[test]
fn division_by_an_exact_zero_is_retried_until_the_limit() {
    let result = bounded_driver(12).run(|| Real::from(1) / (Real::from(1) - Real::from(1))?);
    match result.unwrap_err() {
        ExecError::IterationLimit { attempts, .. } => assert_eq!(attempts, 12),
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn division_by_a_vanishing_value_never_succeeds() {
    let result = bounded_driver(12).run(|| Real::from(1) / vanishing()?);
    match result.unwrap_err() {
        ExecError::IterationLimit { attempts, .. } => assert_eq!(attempts, 12),
        other => panic!("unexpected {other}"),
    }
}
