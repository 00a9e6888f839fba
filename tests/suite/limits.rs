//! Limit operators and promotion, driven end to end.

use exact_core::{
    ErrorBound, Interrupt, LazyBool, Outcome, Real, Stiff, limit, limit_lip, limit_mv, limit_with,
    resolve, run, schedule,
};

/// `1 ± 2^-20`.
fn fuzzy_one() -> Outcome<Real> {
    let mut x = Real::from(1);
    x.add_error(ErrorBound::power_of_two(-20)?)?;
    Ok(x)
}

#[test]
fn discrete_limit_converges_to_the_demanded_precision() {
    let value = run(|| {
        let _stiff = Stiff::at_least(-40);
        limit(|precision| Real::from_dyadic(Real::ratio(1, 3)?.approx(precision)?))
    })
    .unwrap();

    let error = value.error().unwrap();
    assert!(error.log2_ceil() <= -40, "error 2^{}", error.log2_ceil());
    let third = Real::ratio(1, 3).unwrap();
    assert_ne!(value.eq_lazy(&third).unwrap(), LazyBool::False);
    assert_eq!(value.approx_eq(&third, -39).unwrap(), LazyBool::True);
}

#[test]
fn promotion_is_transparent() {
    for promote_early in [false, true] {
        let close = run(|| {
            let third = Real::ratio(1, 3)?;
            let third = if promote_early { third.promote()? } else { third };
            let sum = ((&third + &third)? + &third)?;
            resolve(sum.approx_eq(&Real::from(1), -50)?)
        });
        assert_eq!(close, Ok(true), "promote_early = {promote_early}");
    }
}

#[test]
fn cube_roots_inside_the_driver() {
    let close = run(|| {
        let root = Real::from(10).root(3)?;
        let cube = root.powi(3)?;
        resolve(cube.approx_eq(&Real::from(10), -80)?)
    });
    assert_eq!(close, Ok(true));
}

#[test]
fn continuous_limit_over_an_inexact_argument() {
    let close = run(|| {
        let x = Real::ratio(2, 3)?;
        let doubled = limit_with(|_, x: &Real| x.mul_int(3), &x)?;
        resolve(doubled.approx_eq(&Real::from(2), -60)?)
    });
    assert_eq!(close, Ok(true));
}

#[test]
fn lipschitz_limit_inside_the_driver() {
    let close = run(|| {
        let x = Real::ratio(1, 7)?;
        let scaled = limit_lip(
            |_, center: &Real| center.mul_int(7),
            3,
            |x: &Real| x.positive(-20),
            &x,
        )?;
        resolve(scaled.approx_eq(&Real::from(1), -60)?)
    });
    assert_eq!(close, Ok(true));
}

#[test]
fn continuous_limit_after_a_failure_settles_at_the_argument_error() {
    let mut precisions = Vec::new();
    let value = run(|| {
        let _stiff = Stiff::absolute(6);
        let x = fuzzy_one()?;
        limit_with(
            |precision, x: &Real| {
                precisions.push(precision);
                if precisions.len() == 1 {
                    return Err(Interrupt::reiterate(0));
                }
                x.mul_int(2)
            },
            &x,
        )
    })
    .unwrap();

    assert_eq!(precisions.len(), 2);
    assert_eq!(precisions.iter().min(), Some(&schedule().precision(6)));
    assert_eq!(precisions[1], schedule().precision(1));
    assert!(value.error().unwrap().log2_ceil() <= -17);
    assert_eq!(value.approx_eq(&Real::from(2), -16).unwrap(), LazyBool::True);
}

#[test]
fn multi_valued_limit_after_a_failure_settles_at_the_argument_error() {
    let mut precisions = Vec::new();
    let mut choices = Vec::new();
    let value = run(|| {
        let _stiff = Stiff::absolute(6);
        let x = fuzzy_one()?;
        limit_mv(
            |precision, choice: &mut i32, x: &Real| {
                precisions.push(precision);
                choices.push(*choice);
                *choice += 1;
                if precisions.len() == 1 {
                    return Err(Interrupt::reiterate(0));
                }
                x.mul_int(3)
            },
            &x,
        )
    })
    .unwrap();

    assert_eq!(precisions, [schedule().precision(6), schedule().precision(1)]);
    assert_eq!(choices, [0, 1]);
    assert_eq!(value.approx_eq(&Real::from(3), -15).unwrap(), LazyBool::True);
}

#[test]
fn cube_root_of_a_small_inexact_argument_stops_sweeping() {
    // the slope near zero makes every attempt as coarse as the argument allows
    let root = run(|| {
        let _stiff = Stiff::absolute(6);
        let mut x = Real::ratio(1, 1 << 30)?;
        x.add_error(ErrorBound::power_of_two(-50)?)?;
        x.root(3)
    })
    .unwrap();

    let error = root.error().unwrap().log2_ceil();
    assert!((-33..=-29).contains(&error), "error 2^{error}");
    let expected = Real::ratio(1, 1 << 10).unwrap();
    assert_eq!(root.approx_eq(&expected, -28).unwrap(), LazyBool::True);
}
