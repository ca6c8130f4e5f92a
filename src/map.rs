//! Ordered dictionary based on an AVL tree.
//!
//! This module provides [`AvlMap`], a mutable ordered map whose entries live
//! in a height-balanced binary search tree.
//!
//! # Overview
//!
//! - O(log N) `get`, `insert`, `remove`
//! - O(log N) `first_key_value` / `last_key_value`
//! - O(1) `len` and `is_empty`
//! - O(N) in-order iteration, lazy and restartable
//!
//! # Examples
//!
//! ```rust
//! use avl_dictionary::AvlMap;
//!
//! let mut map = AvlMap::new();
//! map.insert(3, "three");
//! map.insert(1, "one");
//! map.insert(2, "two");
//!
//! // Entries are always in sorted order
//! let keys: Vec<&i32> = map.keys().collect();
//! assert_eq!(keys, vec![&1, &2, &3]);
//!
//! assert!(map.delete(&2));
//! assert!(!map.contains_key(&2));
//! ```
//!
//! # Internal Structure
//!
//! The tree maintains the following invariants after every operation:
//! 1. Every key in a node's left subtree compares less than the node's key,
//!    every key in its right subtree compares greater
//! 2. The heights of a node's two subtrees differ by at most one
//! 3. No two nodes hold keys that compare equal
//!
//! [`AvlMap::validate`] checks all three.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

use crate::compare::{Comparator, NaturalOrder};
use crate::error::{InvariantViolation, KeyNotFoundError};
use crate::iter::{AvlMapIntoIterator, AvlMapIterMut, AvlMapIterator};
use crate::node::{Link, Node};

// =============================================================================
// AvlMap Definition
// =============================================================================

/// An ordered map based on an AVL tree.
///
/// Keys are kept sorted under the map's comparator `C`, which defaults to
/// [`NaturalOrder`]. Inserting a key that is already present replaces its
/// value in place.
///
/// # Time Complexity
///
/// | Operation         | Complexity |
/// |-------------------|------------|
/// | `new`             | O(1)       |
/// | `get`             | O(log N)   |
/// | `insert`          | O(log N)   |
/// | `remove`          | O(log N)   |
/// | `contains_key`    | O(log N)   |
/// | `first`/`last`    | O(log N)   |
/// | `len`/`is_empty`  | O(1)       |
/// | `iter`            | O(N)       |
/// | `validate`        | O(N)       |
///
/// # Concurrency
///
/// The map does no locking. It is `Send`/`Sync` whenever its keys, values and
/// comparator are, and shared access across threads is safe, but mutation
/// from several threads needs external synchronisation such as a `Mutex`
/// around the whole map.
///
/// # Examples
///
/// ```rust
/// use avl_dictionary::AvlMap;
///
/// let mut map = AvlMap::singleton(42, "answer");
/// assert_eq!(map.get(&42), Some(&"answer"));
///
/// assert_eq!(map.insert(42, "still the answer"), Some("answer"));
/// assert_eq!(map.len(), 1);
/// ```
#[derive(Clone)]
pub struct AvlMap<K, V, C = NaturalOrder> {
    /// Root node of the tree
    root: Link<K, V>,
    /// Number of entries
    length: usize,
    /// Ordering used for every key comparison
    comparator: C,
}

impl<K, V> AvlMap<K, V> {
    /// Creates a new empty map ordered by `K`'s [`Ord`] implementation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let map: AvlMap<i32, String> = AvlMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K: Ord, V> AvlMap<K, V> {
    /// Creates a map containing a single key-value pair.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let map = AvlMap::singleton(1, "one");
    /// assert_eq!(map.len(), 1);
    /// assert_eq!(map.get(&1), Some(&"one"));
    /// ```
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        let mut map = Self::new();
        map.insert(key, value);
        map
    }
}

impl<K, V, C> AvlMap<K, V, C> {
    /// Creates a new empty map ordered by `comparator`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let mut map = AvlMap::with_comparator(|left: &&str, right: &&str| {
    ///     left.len().cmp(&right.len()).then_with(|| left.cmp(right))
    /// });
    /// map.insert("ccc", 3);
    /// map.insert("a", 1);
    /// map.insert("bb", 2);
    ///
    /// let keys: Vec<&&str> = map.keys().collect();
    /// assert_eq!(keys, vec![&"a", &"bb", &"ccc"]);
    /// ```
    #[inline]
    #[must_use]
    pub const fn with_comparator(comparator: C) -> Self {
        Self {
            root: None,
            length: 0,
            comparator,
        }
    }

    /// Returns the comparator that orders this map.
    #[inline]
    pub const fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Returns the number of entries in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the height of the tree: 0 when empty, 1 for a single entry.
    ///
    /// For N entries the height never exceeds about 1.44 log2(N + 2).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let map: AvlMap<i32, ()> = (0..7).map(|key| (key, ())).collect();
    /// assert_eq!(map.height(), 3);
    /// ```
    #[must_use]
    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, |node| usize::from(node.height))
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.root = None;
        self.length = 0;
    }

    /// Returns the entry with the smallest key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let map: AvlMap<i32, &str> = [(3, "three"), (1, "one"), (2, "two")].into_iter().collect();
    /// assert_eq!(map.first_key_value(), Some((&1, &"one")));
    /// assert_eq!(map.last_key_value(), Some((&3, &"three")));
    /// ```
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.root
            .as_deref()
            .map(Node::leftmost)
            .map(|node| (&node.key, &node.value))
    }

    /// Returns the entry with the largest key.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.root
            .as_deref()
            .map(Node::rightmost)
            .map(|node| (&node.key, &node.value))
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Returns an iterator over entries in ascending key order.
    ///
    /// Each call starts a fresh walk from the smallest key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let map: AvlMap<i32, &str> = [(2, "two"), (1, "one")].into_iter().collect();
    ///
    /// let entries: Vec<(&i32, &&str)> = map.iter().collect();
    /// assert_eq!(entries, vec![(&1, &"one"), (&2, &"two")]);
    /// ```
    pub fn iter(&self) -> AvlMapIterator<'_, K, V> {
        AvlMapIterator::new(self.root.as_deref(), self.length)
    }

    /// Returns an iterator over entries in ascending key order, with mutable
    /// access to the values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let mut map: AvlMap<i32, i32> = [(1, 10), (2, 20)].into_iter().collect();
    /// for (_, value) in map.iter_mut() {
    ///     *value += 1;
    /// }
    /// assert_eq!(map.get(&2), Some(&21));
    /// ```
    pub fn iter_mut(&mut self) -> AvlMapIterMut<'_, K, V> {
        AvlMapIterMut::new(self.root.as_deref_mut(), self.length)
    }

    /// Returns an iterator over keys in ascending order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let map: AvlMap<i32, &str> = [(3, "c"), (1, "a"), (2, "b")].into_iter().collect();
    /// let keys: Vec<&i32> = map.keys().collect();
    /// assert_eq!(keys, vec![&1, &2, &3]);
    /// ```
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values in ascending key order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let map: AvlMap<i32, i32> = [(1, 10), (2, 20), (3, 30)].into_iter().collect();
    /// let sum: i32 = map.values().sum();
    /// assert_eq!(sum, 60);
    /// ```
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Returns an iterator over mutable values in ascending key order.
    pub fn values_mut(&mut self) -> impl ExactSizeIterator<Item = &mut V> {
        self.iter_mut().map(|(_, value)| value)
    }

    /// Consumes the map, yielding its keys in ascending order.
    pub fn into_keys(self) -> impl ExactSizeIterator<Item = K> {
        self.into_iter().map(|(key, _)| key)
    }

    /// Consumes the map, yielding its values in ascending key order.
    pub fn into_values(self) -> impl ExactSizeIterator<Item = V> {
        self.into_iter().map(|(_, value)| value)
    }

    /// Clones entries in ascending key order into `destination`, starting at
    /// `destination[offset]`.
    ///
    /// Copies as many entries as fit and returns how many were copied. An
    /// `offset` at or past the end of `destination` copies nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let map: AvlMap<i32, char> = [(1, 'a'), (2, 'b'), (3, 'c')].into_iter().collect();
    /// let mut buffer = [(0, '-'); 3];
    ///
    /// assert_eq!(map.copy_to(&mut buffer, 1), 2);
    /// assert_eq!(buffer, [(0, '-'), (1, 'a'), (2, 'b')]);
    /// ```
    pub fn copy_to(&self, destination: &mut [(K, V)], offset: usize) -> usize
    where
        K: Clone,
        V: Clone,
    {
        let Some(slots) = destination.get_mut(offset..) else {
            return 0;
        };
        let mut copied = 0;
        for (slot, (key, value)) in slots.iter_mut().zip(self.iter()) {
            *slot = (key.clone(), value.clone());
            copied += 1;
        }
        copied
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, provided the
    /// comparator can compare that form.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert("hello".to_string(), 42);
    ///
    /// // Can use &str to look up String keys
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        Node::find(self.root.as_deref(), key, &self.comparator).map(|node| &node.value)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        Node::find(self.root.as_deref(), key, &self.comparator).map(|node| (&node.key, &node.value))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let mut map = AvlMap::singleton(1, 10);
    /// if let Some(value) = map.get_mut(&1) {
    ///     *value *= 2;
    /// }
    /// assert_eq!(map.get(&1), Some(&20));
    /// ```
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        Node::find_mut(self.root.as_deref_mut(), key, &self.comparator).map(|node| &mut node.value)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.get(key).is_some()
    }

    /// Returns `true` if `key` is present and maps to a value equal to
    /// `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let map = AvlMap::singleton(1, "one");
    /// assert!(map.contains_entry(&1, &"one"));
    /// assert!(!map.contains_entry(&1, &"uno"));
    /// assert!(!map.contains_entry(&2, &"one"));
    /// ```
    pub fn contains_entry<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
        V: PartialEq,
    {
        self.get(key).is_some_and(|stored| stored == value)
    }

    /// Returns a clone of the value for `key`, or `V::default()` when the key
    /// is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let map = AvlMap::singleton("apples", 3);
    /// assert_eq!(map.get_or_default("apples"), 3);
    /// assert_eq!(map.get_or_default("pears"), 0);
    /// ```
    pub fn get_or_default<Q>(&self, key: &Q) -> V
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
        V: Clone + Default,
    {
        self.get(key).cloned().unwrap_or_default()
    }

    /// Returns the value for `key`, or `default` when the key is absent.
    pub fn get_or<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.get(key).unwrap_or(default)
    }

    /// Replaces the value of an existing key and returns the old value.
    ///
    /// Unlike [`insert`](Self::insert), this never adds an entry.
    ///
    /// # Errors
    ///
    /// Returns [`KeyNotFoundError`] if the key is not present; the map is left
    /// unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::{AvlMap, KeyNotFoundError};
    ///
    /// let mut map = AvlMap::singleton(1, "one");
    /// assert_eq!(map.replace(&1, "ONE"), Ok("one"));
    /// assert_eq!(map.replace(&2, "two"), Err(KeyNotFoundError));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn replace<Q>(&mut self, key: &Q, value: V) -> Result<V, KeyNotFoundError>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.get_mut(key)
            .map(|slot| mem::replace(slot, value))
            .ok_or(KeyNotFoundError)
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Removes a key from the map, returning the stored key and value.
    ///
    /// # Complexity
    ///
    /// O(log N)
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let (root, removed) = Node::remove(self.root.take(), key, &self.comparator);
        self.root = root;
        if removed.is_some() {
            self.length -= 1;
        }
        removed
    }

    /// Removes a key from the map, returning its value.
    ///
    /// Removing an absent key leaves the map unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let mut map: AvlMap<i32, &str> = [(1, "one"), (2, "two")].into_iter().collect();
    /// assert_eq!(map.remove(&1), Some("one"));
    /// assert_eq!(map.remove(&1), None);
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the map, returning whether it was present.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        self.remove_entry(key).is_some()
    }
}

impl<K, V, C: Comparator<K>> AvlMap<K, V, C> {
    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contains the key, the value is replaced in place,
    /// the stored key is kept, and the old value is returned.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// assert_eq!(map.insert(1, "one"), None);
    /// assert_eq!(map.insert(1, "ONE"), Some("one"));
    /// assert_eq!(map.get(&1), Some(&"ONE"));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (root, replaced) = Node::insert(self.root.take(), key, value, &self.comparator);
        self.root = Some(root);
        if replaced.is_none() {
            self.length += 1;
        }
        replaced
    }

    /// Keeps only the entries for which `predicate` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let mut map: AvlMap<i32, i32> = (0..8).map(|key| (key, key * 10)).collect();
    /// map.retain(|key, _| key % 2 == 0);
    ///
    /// let keys: Vec<&i32> = map.keys().collect();
    /// assert_eq!(keys, vec![&0, &2, &4, &6]);
    /// ```
    pub fn retain<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let entries = AvlMapIntoIterator::new(self.root.take(), mem::take(&mut self.length));
        for (key, mut value) in entries {
            if predicate(&key, &mut value) {
                self.insert(key, value);
            }
        }
    }

    /// Checks the structural invariants of the tree.
    ///
    /// Verifies strict key order under the comparator, the AVL balance
    /// condition at every node, every cached subtree height and the cached
    /// length. Runs in O(N).
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found. A map used only
    /// through this API with a consistent comparator always validates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_dictionary::AvlMap;
    ///
    /// let map: AvlMap<i32, ()> = (0..100).map(|key| (key, ())).collect();
    /// assert!(map.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let checked = self.check_invariants();
        #[cfg(feature = "tracing")]
        if let Err(violation) = &checked {
            tracing::debug!(%violation, length = self.length, "tree failed validation");
        }
        checked
    }

    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let (_, actual) = self.root.as_deref().map_or(Ok((0, 0)), Node::verify_shape)?;
        if actual != self.length {
            return Err(InvariantViolation::LengthMismatch {
                cached: self.length,
                actual,
            });
        }
        self.keys()
            .zip(self.keys().skip(1))
            .position(|(previous, next)| self.comparator.compare(previous, next) != Ordering::Less)
            .map_or(Ok(()), |index| {
                Err(InvariantViolation::OutOfOrder { position: index + 1 })
            })
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V, C: Default> Default for AvlMap<K, V, C> {
    #[inline]
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, V, C: Comparator<K> + Default> FromIterator<(K, V)> for AvlMap<K, V, C> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, C: Comparator<K>> Extend<(K, V)> for AvlMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, C> IntoIterator for AvlMap<K, V, C> {
    type Item = (K, V);
    type IntoIter = AvlMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        AvlMapIntoIterator::new(self.root, self.length)
    }
}

impl<'a, K, V, C> IntoIterator for &'a AvlMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = AvlMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, C> IntoIterator for &'a mut AvlMap<K, V, C> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = AvlMapIterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Two maps are equal when they hold equal entries in the same order.
impl<K: PartialEq, V: PartialEq, C> PartialEq for AvlMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C> Eq for AvlMap<K, V, C> {}

/// Hashes the length, then each entry in key order, so equal maps hash
/// equally regardless of insertion order or tree shape.
impl<K: Hash, V: Hash, C> Hash for AvlMap<K, V, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for (key, value) in self {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for AvlMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display, C> fmt::Display for AvlMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for (key, value) in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
    }
}

static_assertions::assert_impl_all!(AvlMap<i32, String>: Send, Sync, Clone, Default);
static_assertions::assert_not_impl_any!(AvlMap<std::rc::Rc<i32>, i32>: Send, Sync);

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V, C> serde::Serialize for AvlMap<K, V, C>
where
    K: serde::Serialize,
    V: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.length))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct AvlMapVisitor<K, V, C> {
    marker: std::marker::PhantomData<fn() -> AvlMap<K, V, C>>,
}

#[cfg(feature = "serde")]
impl<'de, K, V, C> serde::de::Visitor<'de> for AvlMapVisitor<K, V, C>
where
    K: serde::Deserialize<'de>,
    V: serde::Deserialize<'de>,
    C: Comparator<K> + Default,
{
    type Value = AvlMap<K, V, C>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = AvlMap::default();
        while let Some((key, value)) = access.next_entry()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, C> serde::Deserialize<'de> for AvlMap<K, V, C>
where
    K: serde::Deserialize<'de>,
    V: serde::Deserialize<'de>,
    C: Comparator<K> + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(AvlMapVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn map_of(keys: &[i32]) -> AvlMap<i32, i32> {
        keys.iter().map(|&key| (key, key * 10)).collect()
    }

    /// Root key with its direct children.
    fn root_shape(map: &AvlMap<i32, i32>) -> Option<(i32, Option<i32>, Option<i32>)> {
        map.root.as_deref().map(|node| {
            (
                node.key,
                node.left.as_ref().map(|node| node.key),
                node.right.as_ref().map(|node| node.key),
            )
        })
    }

    // =========================================================================
    // Display Tests
    // =========================================================================

    #[rstest]
    fn test_display_empty_map() {
        let map: AvlMap<i32, String> = AvlMap::new();
        assert_eq!(format!("{map}"), "{}");
    }

    #[rstest]
    fn test_display_multiple_elements_sorted() {
        let map: AvlMap<i32, &str> = [(3, "three"), (1, "one"), (2, "two")].into_iter().collect();
        assert_eq!(format!("{map}"), "{1: one, 2: two, 3: three}");
        assert_eq!(format!("{map:?}"), r#"{1: "one", 2: "two", 3: "three"}"#);
    }

    // =========================================================================
    // Rotation Scenario Tests
    // =========================================================================

    #[rstest]
    fn test_ascending_inserts_rotate_left_at_root() {
        let map = map_of(&[10, 20, 30]);
        assert_eq!(root_shape(&map), Some((20, Some(10), Some(30))));
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![10, 20, 30]);
    }

    #[rstest]
    fn test_zigzag_inserts_double_rotate_at_root() {
        let map = map_of(&[30, 10, 20]);
        assert_eq!(root_shape(&map), Some((20, Some(10), Some(30))));
    }

    #[rstest]
    fn test_delete_node_with_two_children_keeps_successor_in_place() {
        let mut map = map_of(&[5, 3, 8, 1, 4, 7, 9]);
        assert!(map.delete(&3));

        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 4, 5, 7, 8, 9]);
        assert_eq!(root_shape(&map), Some((5, Some(4), Some(8))));
        assert_eq!(map.get(&4), Some(&40));
        assert_eq!(map.validate(), Ok(()));
    }

    #[rstest]
    fn test_delete_absent_key_leaves_shape_unchanged() {
        let mut map = map_of(&[5, 3, 8, 1, 4, 7, 9]);
        let before = map.clone();

        assert!(!map.delete(&6));
        assert_eq!(root_shape(&map), root_shape(&before));
        assert_eq!(map, before);
        assert_eq!(map.height(), before.height());
    }

    #[rstest]
    fn test_duplicate_insert_keeps_shape_and_length() {
        let mut map = map_of(&[2, 1, 3]);
        assert_eq!(map.insert(1, 100), Some(10));
        assert_eq!(map.len(), 3);
        assert_eq!(root_shape(&map), Some((2, Some(1), Some(3))));
        assert_eq!(map.get(&1), Some(&100));
    }

    // =========================================================================
    // Lookup Tests
    // =========================================================================

    #[rstest]
    fn test_lookups_on_empty_map() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        assert_eq!(map.get(&1), None);
        assert_eq!(map.get_mut(&1), None);
        assert!(!map.contains_key(&1));
        assert_eq!(map.get_or_default(&1), 0);
        assert_eq!(map.first_key_value(), None);
        assert_eq!(map.replace(&1, 5), Err(KeyNotFoundError));
        assert_eq!(map.remove(&1), None);
        assert_eq!(map.height(), 0);
    }

    #[rstest]
    fn test_get_key_value_returns_stored_key() {
        let map = map_of(&[1, 2]);
        assert_eq!(map.get_key_value(&2), Some((&2, &20)));
    }

    #[rstest]
    fn test_get_or_falls_back() {
        let map = map_of(&[1]);
        let fallback = -1;
        assert_eq!(map.get_or(&1, &fallback), &10);
        assert_eq!(map.get_or(&2, &fallback), &-1);
    }

    // =========================================================================
    // Copy Tests
    // =========================================================================

    #[rstest]
    #[case::fits(5, 0, vec![(1, 10), (2, 20), (3, 30), (0, 0), (0, 0)], 3)]
    #[case::truncated(2, 0, vec![(1, 10), (2, 20)], 2)]
    #[case::offset_truncated(3, 2, vec![(0, 0), (0, 0), (1, 10)], 1)]
    #[case::offset_at_end(2, 2, vec![(0, 0), (0, 0)], 0)]
    #[case::offset_past_end(2, 9, vec![(0, 0), (0, 0)], 0)]
    fn test_copy_to(
        #[case] capacity: usize,
        #[case] offset: usize,
        #[case] expected: Vec<(i32, i32)>,
        #[case] expected_copied: usize,
    ) {
        let map = map_of(&[3, 1, 2]);
        let mut buffer = vec![(0, 0); capacity];
        assert_eq!(map.copy_to(&mut buffer, offset), expected_copied);
        assert_eq!(buffer, expected);
    }

    // =========================================================================
    // Mutation Tests
    // =========================================================================

    #[rstest]
    fn test_clear_empties_map() {
        let mut map = map_of(&[1, 2, 3]);
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.iter().next(), None);
        map.insert(4, 40);
        assert_eq!(map.len(), 1);
    }

    #[rstest]
    fn test_retain_rebuilds_balanced_tree() {
        let mut map = map_of(&(0..64).collect::<Vec<_>>());
        map.retain(|key, value| {
            *value += 1;
            key % 3 == 0
        });

        assert_eq!(map.len(), 22);
        assert_eq!(map.get(&3), Some(&31));
        assert!(!map.contains_key(&4));
        assert_eq!(map.validate(), Ok(()));
    }

    #[rstest]
    fn test_remove_entry_returns_stored_key() {
        let mut map: AvlMap<String, i32> = AvlMap::new();
        map.insert("key".to_string(), 1);
        assert_eq!(map.remove_entry("key"), Some(("key".to_string(), 1)));
        assert!(map.is_empty());
    }

    #[rstest]
    fn test_values_mut_and_into_values() {
        let mut map = map_of(&[2, 1]);
        map.values_mut().for_each(|value| *value = -*value);
        assert_eq!(map.into_values().collect::<Vec<_>>(), vec![-10, -20]);
    }

    // =========================================================================
    // Comparator Tests
    // =========================================================================

    #[rstest]
    fn test_custom_comparator_orders_and_finds() {
        let mut map = AvlMap::with_comparator(|left: &i32, right: &i32| right.cmp(left));
        map.extend([(1, 'a'), (3, 'c'), (2, 'b'), (5, 'e'), (4, 'd')]);

        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![5, 4, 3, 2, 1]);
        assert_eq!(map.get(&3), Some(&'c'));
        assert_eq!(map.first_key_value(), Some((&5, &'e')));
        assert!(map.delete(&5));
        assert_eq!(map.validate(), Ok(()));
    }

    // =========================================================================
    // Validation Tests
    // =========================================================================

    #[rstest]
    fn test_validate_detects_length_mismatch() {
        let mut map = map_of(&[1, 2, 3]);
        map.length = 4;
        assert_eq!(
            map.validate(),
            Err(InvariantViolation::LengthMismatch { cached: 4, actual: 3 })
        );
    }

    #[rstest]
    fn test_validate_detects_out_of_order_keys() {
        let mut map = map_of(&[1, 2, 3]);
        if let Some(root) = map.root.as_deref_mut() {
            root.key = 7;
        }
        assert_eq!(map.validate(), Err(InvariantViolation::OutOfOrder { position: 2 }));
    }

    #[rstest]
    fn test_validate_detects_stale_height() {
        let mut map = map_of(&[1, 2, 3]);
        if let Some(left) = map.root.as_deref_mut().and_then(|root| root.left.as_deref_mut()) {
            left.height = 3;
        }
        assert_eq!(
            map.validate(),
            Err(InvariantViolation::StaleHeight { cached: 3, actual: 1 })
        );
    }

    // =========================================================================
    // Equality and Hash Tests
    // =========================================================================

    #[rstest]
    fn test_equality_ignores_insertion_order_and_shape() {
        let ascending = map_of(&[1, 2, 3, 4, 5, 6, 7]);
        let scrambled = map_of(&[4, 7, 1, 6, 2, 5, 3]);
        assert_eq!(ascending, scrambled);

        let mut removed = map_of(&[1, 2, 3, 4, 5, 6, 7, 8]);
        removed.remove(&8);
        assert_eq!(ascending, removed);
        assert_ne!(ascending, map_of(&[1, 2, 3]));
    }

    #[rstest]
    fn test_equal_maps_hash_equally() {
        use std::collections::hash_map::DefaultHasher;

        let hash_of = |map: &AvlMap<i32, i32>| {
            let mut hasher = DefaultHasher::new();
            map.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash_of(&map_of(&[3, 1, 2])), hash_of(&map_of(&[1, 2, 3])));
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_serialize_empty() {
        let map: AvlMap<String, i32> = AvlMap::new();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, "{}");
    }

    #[rstest]
    fn test_serialize_in_key_order() {
        let map: AvlMap<String, i32> = [("c", 3), ("a", 1), ("b", 2)]
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"a":1,"b":2,"c":3}"#);
    }

    #[rstest]
    fn test_deserialize_builds_balanced_map() {
        let json = r#"{"d":4,"b":2,"a":1,"c":3,"e":5}"#;
        let map: AvlMap<String, i32> = serde_json::from_str(json).unwrap();
        assert_eq!(map.len(), 5);
        assert_eq!(map.get("c"), Some(&3));
        assert_eq!(map.validate(), Ok(()));
    }

    #[rstest]
    fn test_deserialize_overwrites_duplicate_keys() {
        let json = r#"{"a":1,"a":2}"#;
        let map: AvlMap<String, i32> = serde_json::from_str(json).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), Some(&2));
    }

    #[rstest]
    fn test_roundtrip_large() {
        let map: AvlMap<i32, i32> = (0..500).map(|key| (key, key * key)).collect();
        let json = serde_json::to_string(&map).unwrap();
        let restored: AvlMap<i32, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, restored);
    }
}
