//! In-order iterators over an [`AvlMap`](crate::AvlMap).
//!
//! All three iterators walk the tree lazily with an explicit stack: push
//! the left spine, pop a node, yield it, then push the left spine of its
//! right subtree. The stack never holds more than `height` entries; it lives
//! inline for any tree shorter than [`INLINE_DEPTH`].

use std::fmt;
use std::iter::FusedIterator;

use smallvec::SmallVec;

use crate::node::{Link, Node};

/// Stack slots kept inline. An AVL tree of this height holds millions of
/// entries.
const INLINE_DEPTH: usize = 32;

// =============================================================================
// Shared Iterator
// =============================================================================

/// An iterator over the entries of an [`AvlMap`](crate::AvlMap) in ascending
/// key order.
///
/// Created by [`AvlMap::iter`](crate::AvlMap::iter).
pub struct AvlMapIterator<'a, K, V> {
    stack: SmallVec<[&'a Node<K, V>; INLINE_DEPTH]>,
    remaining: usize,
}

impl<'a, K, V> AvlMapIterator<'a, K, V> {
    pub(crate) fn new(root: Option<&'a Node<K, V>>, length: usize) -> Self {
        let mut iterator = Self {
            stack: SmallVec::new(),
            remaining: length,
        };
        iterator.push_left_spine(root);
        iterator
    }

    fn push_left_spine(&mut self, mut link: Option<&'a Node<K, V>>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = node.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for AvlMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for AvlMapIterator<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for AvlMapIterator<'_, K, V> {}

impl<K, V> Clone for AvlMapIterator<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlMapIterator<'_, K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.clone()).finish()
    }
}

// =============================================================================
// Mutable Iterator
// =============================================================================

/// A pending node: its key, its value, and the right subtree still to visit.
type PendingMut<'a, K, V> = (&'a K, &'a mut V, Option<&'a mut Node<K, V>>);

/// An iterator over the entries of an [`AvlMap`](crate::AvlMap) in ascending
/// key order, with mutable access to the values.
///
/// Created by [`AvlMap::iter_mut`](crate::AvlMap::iter_mut).
pub struct AvlMapIterMut<'a, K, V> {
    stack: SmallVec<[PendingMut<'a, K, V>; INLINE_DEPTH]>,
    remaining: usize,
}

impl<'a, K, V> AvlMapIterMut<'a, K, V> {
    pub(crate) fn new(root: Option<&'a mut Node<K, V>>, length: usize) -> Self {
        let mut iterator = Self {
            stack: SmallVec::new(),
            remaining: length,
        };
        iterator.push_left_spine(root);
        iterator
    }

    fn push_left_spine(&mut self, mut link: Option<&'a mut Node<K, V>>) {
        while let Some(node) = link {
            let Node {
                key,
                value,
                left,
                right,
                ..
            } = node;
            self.stack.push((&*key, value, right.as_deref_mut()));
            link = left.as_deref_mut();
        }
    }
}

impl<'a, K, V> Iterator for AvlMapIterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value, right) = self.stack.pop()?;
        self.push_left_spine(right);
        self.remaining = self.remaining.saturating_sub(1);
        Some((key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for AvlMapIterMut<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for AvlMapIterMut<'_, K, V> {}

// =============================================================================
// Owning Iterator
// =============================================================================

/// An owning iterator over the entries of an [`AvlMap`](crate::AvlMap) in
/// ascending key order.
///
/// Created by [`AvlMap::into_iter`](crate::AvlMap). Entries not yet yielded
/// are dropped with the iterator.
pub struct AvlMapIntoIterator<K, V> {
    stack: SmallVec<[Box<Node<K, V>>; INLINE_DEPTH]>,
    remaining: usize,
}

impl<K, V> AvlMapIntoIterator<K, V> {
    pub(crate) fn new(root: Link<K, V>, length: usize) -> Self {
        let mut iterator = Self {
            stack: SmallVec::new(),
            remaining: length,
        };
        iterator.push_left_spine(root);
        iterator
    }

    fn push_left_spine(&mut self, mut link: Link<K, V>) {
        while let Some(mut node) = link {
            link = node.left.take();
            self.stack.push(node);
        }
    }
}

impl<K, V> Iterator for AvlMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let Node {
            key, value, right, ..
        } = *node;
        self.push_left_spine(right);
        self.remaining = self.remaining.saturating_sub(1);
        Some((key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for AvlMapIntoIterator<K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for AvlMapIntoIterator<K, V> {}

// =============================================================================
// Tests
// =============================================================================
