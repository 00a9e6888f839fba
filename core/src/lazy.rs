//! Turning [`LazyBool`] answers into control flow.
//!
//! All three functions record their result, so a retried driver attempt
//! branches exactly like the attempt that first made the decision.

use exact_types::{Interrupt, LazyBool, Outcome};

use crate::cache::cached;

/// Definite value of `value`; `Unknown` asks for more precision.
pub fn resolve(value: LazyBool) -> Outcome<bool> {
    cached(|| {
        value.definite().ok_or_else(|| {
            tracing::trace!("comparison undecided at this precision");
            Interrupt::reiterate(0)
        })
    })
}

/// Index of the first `True` option, `None` when every option is `False`.
///
/// Any `True` wins even when earlier options are `Unknown`; with no `True`
/// and at least one `Unknown` the choice asks for more precision.
pub fn choose(options: &[LazyBool]) -> Outcome<Option<usize>> {
    let choice = cached(|| {
        if let Some(index) = options.iter().position(|option| option.is_true()) {
            return Ok(index + 1);
        }
        if options.iter().all(|option| option.is_false()) {
            return Ok(0);
        }
        Err(Interrupt::reiterate(0))
    })?;
    Ok(choice.checked_sub(1))
}

/// Records the tri-state value itself, without forcing it.
pub fn check(value: LazyBool) -> Outcome<LazyBool> {
    cached(|| Ok(value.to_code())).map(LazyBool::from_code)
}
