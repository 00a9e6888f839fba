//! Multi-valued decisions replay identically across driver retries.

use exact_core::{Dyadic, Interrupt, LazyBool, Real, check, choose, limit_mv, run};

use crate::common::{driver_starting_at, vanishing};

#[test]
fn a_forced_retry_replays_every_decision() {
    let mut attempts = 0;
    let mut seen: Vec<(LazyBool, Dyadic, i32, Option<usize>)> = Vec::new();
    let result = run(|| {
        attempts += 1;
        let tiny = vanishing()?;
        let third = Real::ratio(1, 3)?;

        let decided = check(tiny.bound(-60)?)?;
        let approx = third.approx(-30)?;
        let size = third.size()?;
        let branch = choose(&[tiny.positive(-200)?, LazyBool::True])?;
        seen.push((decided, approx, size, branch));

        if attempts == 1 {
            return Err(Interrupt::reiterate(0));
        }
        Ok(decided)
    });

    assert_eq!(attempts, 2);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], seen[1]);
    // decided at double precision, where the zero was still fuzzy
    assert_eq!(result, Ok(LazyBool::Unknown));
}

#[test]
fn fresh_invocations_decide_again() {
    let coarse = run(|| check(vanishing()?.bound(-60)?)).unwrap();
    let fine = driver_starting_at(12)
        .run(|| check(vanishing()?.bound(-60)?))
        .unwrap();
    assert_eq!(coarse, LazyBool::Unknown);
    assert_eq!(fine, LazyBool::True);
}

#[test]
fn multi_valued_limits_replay_the_refined_choice() {
    let mut attempts = 0;
    let mut starts = Vec::new();
    let value = run(|| {
        attempts += 1;
        let x = Real::from(3);
        let value = limit_mv(
            |_, choice: &mut i32, x: &Real| {
                starts.push(*choice);
                *choice += 1;
                x.mul_int(2)
            },
            &x,
        )?;
        if attempts == 1 {
            return Err(Interrupt::reiterate(0));
        }
        Ok(value)
    })
    .unwrap();

    assert_eq!(starts, vec![0, 1]);
    assert_eq!(
        value.approx_eq(&Real::from(6), -40).unwrap(),
        LazyBool::True
    );
}
