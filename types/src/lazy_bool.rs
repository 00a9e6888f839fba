//! Three-valued comparison results.

use std::ops::{BitAnd, BitOr, Not};

/// Outcome of a comparison that may not be decidable at the current precision.
///
/// Combines with Kleene logic: `Unknown & False == False`,
/// `Unknown | True == True`, everything else involving `Unknown` stays
/// `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LazyBool {
    True,
    False,
    Unknown,
}

impl LazyBool {
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::False)
    }

    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// The definite value, if any.
    #[must_use]
    pub const fn definite(self) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::False => Some(false),
            Self::Unknown => None,
        }
    }

    /// Compact encoding used when the value is recorded for replay.
    #[must_use]
    pub const fn to_code(self) -> i32 {
        match self {
            Self::False => 0,
            Self::True => 1,
            Self::Unknown => 2,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::False,
            1 => Self::True,
            _ => Self::Unknown,
        }
    }
}

impl From<bool> for LazyBool {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl Not for LazyBool {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }
}

impl BitAnd for LazyBool {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, Self::True) => Self::True,
            _ => Self::Unknown,
        }
    }
}

impl BitOr for LazyBool {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [LazyBool; 3] = [LazyBool::True, LazyBool::False, LazyBool::Unknown];

    #[test]
    fn unknown_is_absorbed_by_dominant_values() {
        assert_eq!(LazyBool::Unknown & LazyBool::False, LazyBool::False);
        assert_eq!(LazyBool::Unknown | LazyBool::True, LazyBool::True);
        assert_eq!(LazyBool::Unknown & LazyBool::True, LazyBool::Unknown);
        assert_eq!(LazyBool::Unknown | LazyBool::False, LazyBool::Unknown);
    }

    #[test]
    fn de_morgan_holds_for_every_pair() {
        for a in ALL {
            for b in ALL {
                assert_eq!(!(a & b), !a | !b);
                assert_eq!(!(a | b), !a & !b);
            }
        }
    }

    #[test]
    fn code_round_trips() {
        for value in ALL {
            assert_eq!(LazyBool::from_code(value.to_code()), value);
        }
    }

    #[test]
    fn definite_values_match_bool() {
        assert_eq!(LazyBool::from(true).definite(), Some(true));
        assert_eq!(LazyBool::from(false).definite(), Some(false));
        assert_eq!(LazyBool::Unknown.definite(), None);
    }
}
