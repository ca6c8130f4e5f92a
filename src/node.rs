//! The AVL tree engine.
//!
//! Every structural operation takes a subtree by value and hands back the
//! root of its replacement, which the caller writes into the parent's child
//! slot. Rebalancing happens on the way back up, so after any insert or
//! removal each node on the mutated path satisfies
//! `|height(left) - height(right)| <= 1`.
//!
//! Heights are cached in each node and refreshed whenever a node's children
//! change. [`Node::verify_shape`] recomputes them from scratch.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::mem;

use crate::compare::Comparator;
use crate::error::InvariantViolation;

/// An owning link to a subtree. `None` is the empty tree.
pub(crate) type Link<K, V> = Option<Box<Node<K, V>>>;

// =============================================================================
// Node Definition
// =============================================================================

/// A single entry of the tree together with its two subtrees.
#[derive(Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    /// Height of the subtree rooted here; a leaf has height 1.
    pub(crate) height: u8,
    pub(crate) left: Link<K, V>,
    pub(crate) right: Link<K, V>,
}

/// The restructuring chosen by [`Node::rotation_case`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rotation {
    /// Left-heavy with a left-leaning or balanced left child: rotate right.
    LeftLeft,
    /// Left-heavy with a right-leaning left child: rotate the child left,
    /// then the node right.
    LeftRight,
    /// Right-heavy with a right-leaning or balanced right child: rotate left.
    RightRight,
    /// Right-heavy with a left-leaning right child: rotate the child right,
    /// then the node left.
    RightLeft,
}

/// Height of a possibly empty subtree.
#[inline]
pub(crate) fn height<K, V>(link: &Link<K, V>) -> u8 {
    link.as_ref().map_or(0, |node| node.height)
}

impl<K, V> Node<K, V> {
    /// Creates a detached leaf.
    pub(crate) fn leaf(key: K, value: V) -> Box<Self> {
        Box::new(Self {
            key,
            value,
            height: 1,
            left: None,
            right: None,
        })
    }

    /// Left subtree height minus right subtree height.
    #[inline]
    pub(crate) fn balance_factor(&self) -> isize {
        isize::from(height(&self.left)) - isize::from(height(&self.right))
    }

    /// Recomputes the cached height from the children's cached heights.
    #[inline]
    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    // =========================================================================
    // Rotations
    // =========================================================================

    /// Promotes the right child. A node without a right child is returned
    /// unchanged.
    pub(crate) fn rotate_left(mut node: Box<Self>) -> Box<Self> {
        let Some(mut pivot) = node.right.take() else {
            return node;
        };
        node.right = pivot.left.take();
        node.update_height();
        pivot.left = Some(node);
        pivot.update_height();
        pivot
    }

    /// Promotes the left child. A node without a left child is returned
    /// unchanged.
    pub(crate) fn rotate_right(mut node: Box<Self>) -> Box<Self> {
        let Some(mut pivot) = node.left.take() else {
            return node;
        };
        node.left = pivot.right.take();
        node.update_height();
        pivot.right = Some(node);
        pivot.update_height();
        pivot
    }

    /// Picks the rotation that restores balance here, if one is needed.
    ///
    /// A heavy child with balance factor 0 selects the single rotation. That
    /// situation only arises after a removal.
    pub(crate) fn rotation_case(&self) -> Option<Rotation> {
        let balance_factor = self.balance_factor();
        if balance_factor > 1 {
            let left = self.left.as_deref()?;
            if height(&left.left) >= height(&left.right) {
                Some(Rotation::LeftLeft)
            } else {
                Some(Rotation::LeftRight)
            }
        } else if balance_factor < -1 {
            let right = self.right.as_deref()?;
            if height(&right.right) >= height(&right.left) {
                Some(Rotation::RightRight)
            } else {
                Some(Rotation::RightLeft)
            }
        } else {
            None
        }
    }

    /// Refreshes the height of `node` and rotates if it has become
    /// unbalanced. Returns the new subtree root.
    pub(crate) fn rebalance(mut node: Box<Self>) -> Box<Self> {
        node.update_height();
        let Some(rotation) = node.rotation_case() else {
            return node;
        };
        trace_event!(
            trace,
            ?rotation,
            height = node.height,
            balance_factor = node.balance_factor(),
            "rotating subtree"
        );
        let root = match rotation {
            Rotation::LeftLeft => Self::rotate_right(node),
            Rotation::LeftRight => {
                node.left = node.left.take().map(Self::rotate_left);
                Self::rotate_right(node)
            }
            Rotation::RightRight => Self::rotate_left(node),
            Rotation::RightLeft => {
                node.right = node.right.take().map(Self::rotate_right);
                Self::rotate_left(node)
            }
        };
        debug_assert!(root.balance_factor().abs() <= 1);
        root
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Inserts `key` into the subtree at `link`.
    ///
    /// Returns the new subtree root and, if the key was already present, the
    /// value it held before being overwritten. An existing key keeps its node
    /// and the tree shape does not change.
    pub(crate) fn insert<C>(link: Link<K, V>, key: K, value: V, comparator: &C) -> (Box<Self>, Option<V>)
    where
        C: Comparator<K>,
    {
        let Some(mut node) = link else {
            return (Self::leaf(key, value), None);
        };
        match comparator.compare(&key, &node.key) {
            Ordering::Less => {
                let (left, replaced) = Self::insert(node.left.take(), key, value, comparator);
                node.left = Some(left);
                (Self::rebalance(node), replaced)
            }
            Ordering::Greater => {
                let (right, replaced) = Self::insert(node.right.take(), key, value, comparator);
                node.right = Some(right);
                (Self::rebalance(node), replaced)
            }
            Ordering::Equal => {
                let previous = mem::replace(&mut node.value, value);
                (node, Some(previous))
            }
        }
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Removes `key` from the subtree at `link`.
    ///
    /// Returns the new subtree root and the removed entry. When the key is
    /// absent the subtree comes back untouched.
    ///
    /// A node with a right subtree takes over the entry of its in-order
    /// successor, whose own node is then unlinked from the right subtree.
    /// A node without one is replaced by its left child.
    pub(crate) fn remove<Q, C>(link: Link<K, V>, key: &Q, comparator: &C) -> (Link<K, V>, Option<(K, V)>)
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        let Some(mut node) = link else {
            return (None, None);
        };
        match comparator.compare(key, node.key.borrow()) {
            Ordering::Less => {
                let (left, removed) = Self::remove(node.left.take(), key, comparator);
                node.left = left;
                if removed.is_none() {
                    return (Some(node), None);
                }
                (Some(Self::rebalance(node)), removed)
            }
            Ordering::Greater => {
                let (right, removed) = Self::remove(node.right.take(), key, comparator);
                node.right = right;
                if removed.is_none() {
                    return (Some(node), None);
                }
                (Some(Self::rebalance(node)), removed)
            }
            Ordering::Equal => match node.right.take() {
                Some(right) => {
                    let (right, (successor_key, successor_value)) = Self::remove_min(right);
                    node.right = right;
                    let key = mem::replace(&mut node.key, successor_key);
                    let value = mem::replace(&mut node.value, successor_value);
                    (Some(Self::rebalance(node)), Some((key, value)))
                }
                None => {
                    let Self { key, value, left, .. } = *node;
                    (left, Some((key, value)))
                }
            },
        }
    }

    /// Unlinks the left-most node of a non-empty subtree.
    ///
    /// Returns the rebalanced remainder and the detached entry.
    pub(crate) fn remove_min(mut node: Box<Self>) -> (Link<K, V>, (K, V)) {
        match node.left.take() {
            Some(left) => {
                let (left, minimum) = Self::remove_min(left);
                node.left = left;
                (Some(Self::rebalance(node)), minimum)
            }
            None => {
                let Self { key, value, right, .. } = *node;
                (right, (key, value))
            }
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Finds the node holding `key`.
    pub(crate) fn find<'a, Q, C>(mut link: Option<&'a Self>, key: &Q, comparator: &C) -> Option<&'a Self>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        while let Some(node) = link {
            link = match comparator.compare(key, node.key.borrow()) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => return Some(node),
            };
        }
        None
    }

    /// Finds the node holding `key`, mutably.
    pub(crate) fn find_mut<'a, Q, C>(mut link: Option<&'a mut Self>, key: &Q, comparator: &C) -> Option<&'a mut Self>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Comparator<Q>,
    {
        while let Some(node) = link {
            link = match comparator.compare(key, node.key.borrow()) {
                Ordering::Less => node.left.as_deref_mut(),
                Ordering::Greater => node.right.as_deref_mut(),
                Ordering::Equal => return Some(node),
            };
        }
        None
    }

    /// The left-most node of a subtree.
    pub(crate) fn leftmost(mut node: &Self) -> &Self {
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        node
    }

    /// The right-most node of a subtree.
    pub(crate) fn rightmost(mut node: &Self) -> &Self {
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        node
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Recomputes the height of this subtree from scratch and checks every
    /// cached height and balance factor on the way.
    ///
    /// Returns `(height, node_count)`.
    pub(crate) fn verify_shape(&self) -> Result<(usize, usize), InvariantViolation> {
        let (left_height, left_count) = self.left.as_deref().map_or(Ok((0, 0)), Self::verify_shape)?;
        let (right_height, right_count) = self.right.as_deref().map_or(Ok((0, 0)), Self::verify_shape)?;

        let actual = 1 + left_height.max(right_height);
        if usize::from(self.height) != actual {
            return Err(InvariantViolation::StaleHeight {
                cached: usize::from(self.height),
                actual,
            });
        }
        if left_height.abs_diff(right_height) > 1 {
            #[allow(clippy::cast_possible_wrap)]
            let balance_factor = left_height as isize - right_height as isize;
            return Err(InvariantViolation::Unbalanced { balance_factor });
        }
        Ok((actual, left_count + right_count + 1))
    }
}

// =============================================================================
// Tests
// =============================================================================
