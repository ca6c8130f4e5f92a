//! Key ordering for [`AvlMap`](crate::AvlMap).
//!
//! Every map carries a comparator that supplies the three-way comparison
//! used to place and find keys. [`NaturalOrder`] defers to [`Ord`] and is the
//! default; any `Fn(&K, &K) -> Ordering` closure can be used instead.
//!
//! # Contract
//!
//! A comparator must describe a total order that stays the same for the
//! lifetime of the map. An inconsistent comparator does not cause memory
//! unsafety or panics inside the tree engine, but the resulting tree shape
//! and lookup results are unspecified.
//!
//! # Examples
//!
//! ```rust
//! use avl_dictionary::AvlMap;
//!
//! let mut map = AvlMap::with_comparator(|left: &i32, right: &i32| right.cmp(left));
//! map.insert(1, "one");
//! map.insert(3, "three");
//! map.insert(2, "two");
//!
//! let keys: Vec<&i32> = map.keys().collect();
//! assert_eq!(keys, vec![&3, &2, &1]);
//! ```

use std::cmp::Ordering;

/// A three-way comparison over keys of type `Q`.
///
/// `Q` is the type probed with. For [`NaturalOrder`] it may be any borrowed
/// form of the key (`str` for `String` keys, for example); closure
/// comparators only accept the key type itself.
pub trait Comparator<Q: ?Sized> {
    /// Compares `left` with `right`.
    fn compare(&self, left: &Q, right: &Q) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NaturalOrder;

impl<Q: Ord + ?Sized> Comparator<Q> for NaturalOrder {
    #[inline]
    fn compare(&self, left: &Q, right: &Q) -> Ordering {
        left.cmp(right)
    }
}

impl<K, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        self(left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 2, Ordering::Less)]
    #[case(2, 2, Ordering::Equal)]
    #[case(3, 2, Ordering::Greater)]
    fn test_natural_order_matches_ord(#[case] left: i32, #[case] right: i32, #[case] expected: Ordering) {
        assert_eq!(NaturalOrder.compare(&left, &right), expected);
    }

    #[rstest]
    fn test_natural_order_accepts_unsized_borrowed_forms() {
        assert_eq!(Comparator::<str>::compare(&NaturalOrder, "apple", "banana"), Ordering::Less);
    }

    #[rstest]
    fn test_closure_is_a_comparator() {
        let by_length = |left: &String, right: &String| left.len().cmp(&right.len());
        assert_eq!(
            by_length.compare(&"ccc".to_string(), &"a".to_string()),
            Ordering::Greater
        );
    }
}
