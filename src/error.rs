//! Error types for [`AvlMap`](crate::AvlMap).
//!
//! Lookups report absence through `Option`/`bool`. The types here cover the
//! two cases that are genuine failures: replacing the value of a key that is
//! not in the map, and a tree that fails its structural self-check.

use std::fmt;

/// Returned by [`AvlMap::replace`](crate::AvlMap::replace) when the key is
/// not present.
///
/// # Examples
///
/// ```rust
/// use avl_dictionary::{AvlMap, KeyNotFoundError};
///
/// let mut map: AvlMap<i32, &str> = AvlMap::new();
/// assert_eq!(map.replace(&1, "one"), Err(KeyNotFoundError));
/// assert_eq!(format!("{}", KeyNotFoundError), "key not found");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyNotFoundError;

impl fmt::Display for KeyNotFoundError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "key not found")
    }
}

impl std::error::Error for KeyNotFoundError {}

/// A structural invariant that [`AvlMap::validate`](crate::AvlMap::validate)
/// found broken.
///
/// A map built only through its public API never produces one of these
/// unless its comparator is inconsistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantViolation {
    /// The in-order entry at `position` does not compare greater than the
    /// entry before it.
    OutOfOrder {
        /// Zero-based in-order index of the offending entry.
        position: usize,
    },
    /// A node's subtree heights differ by more than one.
    Unbalanced {
        /// Left height minus right height at the offending node.
        balance_factor: isize,
    },
    /// A node's cached height disagrees with the height of its subtree.
    StaleHeight {
        /// The height stored in the node.
        cached: usize,
        /// The height recomputed from its children.
        actual: usize,
    },
    /// The cached entry count disagrees with the number of nodes.
    LengthMismatch {
        /// The length stored in the map.
        cached: usize,
        /// The number of nodes counted by traversal.
        actual: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrder { position } => {
                write!(formatter, "entry at in-order position {position} is out of order")
            }
            Self::Unbalanced { balance_factor } => {
                write!(formatter, "node has balance factor {balance_factor}")
            }
            Self::StaleHeight { cached, actual } => {
                write!(formatter, "node caches height {cached} but its subtree has height {actual}")
            }
            Self::LengthMismatch { cached, actual } => {
                write!(formatter, "map caches length {cached} but holds {actual} entries")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_key_not_found_display() {
        assert_eq!(format!("{KeyNotFoundError}"), "key not found");
    }

    #[rstest]
    #[case(InvariantViolation::OutOfOrder { position: 3 }, "entry at in-order position 3 is out of order")]
    #[case(InvariantViolation::Unbalanced { balance_factor: -2 }, "node has balance factor -2")]
    #[case(
        InvariantViolation::StaleHeight { cached: 2, actual: 3 },
        "node caches height 2 but its subtree has height 3"
    )]
    #[case(
        InvariantViolation::LengthMismatch { cached: 5, actual: 4 },
        "map caches length 5 but holds 4 entries"
    )]
    fn test_invariant_violation_display(#[case] violation: InvariantViolation, #[case] expected: &str) {
        assert_eq!(violation.to_string(), expected);
    }

    #[rstest]
    fn test_errors_are_std_errors() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&KeyNotFoundError);
        assert_error(&InvariantViolation::OutOfOrder { position: 0 });
    }
}
