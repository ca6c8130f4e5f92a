//! # avl-dictionary
//!
//! An ordered dictionary backed by a height-balanced (AVL) binary search
//! tree.
//!
//! ## Overview
//!
//! [`AvlMap`] maps unique keys to values and keeps them sorted under a
//! caller-supplied [`Comparator`] ([`NaturalOrder`] by default). After every
//! insertion and removal the tree is rebalanced with the four classic AVL
//! rotations, so lookups, insertions and removals are O(log N).
//!
//! - O(log N) `get`, `insert`, `remove`
//! - O(1) `len`
//! - Lazy in-order iteration over entries, keys and values
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize`/`Deserialize` for [`AvlMap`]
//! - `tracing`: emit `tracing` events for rotations and failed validation
//! - `full`: enable all features
//!
//! ## Example
//!
//! ```rust
//! use avl_dictionary::AvlMap;
//!
//! let mut map = AvlMap::new();
//! for key in [10, 20, 30] {
//!     map.insert(key, key * 10);
//! }
//!
//! assert_eq!(map.get(&20), Some(&200));
//! assert_eq!(map.height(), 2);
//!
//! let keys: Vec<&i32> = map.keys().collect();
//! assert_eq!(keys, vec![&10, &20, &30]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Emits a `tracing` event at the given level when the `tracing` feature is
/// enabled, and nothing otherwise.
macro_rules! trace_event {
    ($level:ident, $($argument:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::$level!($($argument)+);
    };
}

mod compare;
mod error;
mod iter;
mod map;
mod node;

pub use compare::Comparator;
pub use compare::NaturalOrder;
pub use error::InvariantViolation;
pub use error::KeyNotFoundError;
pub use iter::AvlMapIntoIterator;
pub use iter::AvlMapIterMut;
pub use iter::AvlMapIterator;
pub use map::AvlMap;
