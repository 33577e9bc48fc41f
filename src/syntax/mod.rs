//! Tree accessors used by fold providers and the signature codec.
//!
//! Folding never touches a concrete tree type directly. Everything goes through
//! [`SyntaxTree`], which is implemented for `tree_sitter::Tree` and for the
//! hand-built [`ArenaTree`].

pub mod arena;
pub mod tree;

pub use arena::{ArenaTree, NodeId};

use std::fmt;

/// Represents a half-open byte range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// `other` lies completely inside `self` (equal ranges contain each other)
    pub fn contains_range(&self, other: &ByteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Offset inside the half-open range
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Offset inside the range or touching its end
    pub fn contains_offset_inclusive(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Ranges share at least one byte
    pub fn intersects_strict(&self, other: &ByteRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Ranges touch or share bytes (used for caret-line checks)
    pub fn intersects(&self, other: &ByteRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Partial overlap: the ranges intersect but neither contains the other.
    ///
    /// Duplicates and proper nesting are not conflicts.
    pub fn conflicts_with(&self, other: &ByteRange) -> bool {
        if self == other {
            return false;
        }
        if self.contains_range(other) || other.contains_range(self) {
            return false;
        }
        self.intersects_strict(other)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl From<std::ops::Range<usize>> for ByteRange {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Read-only access to a syntax tree.
///
/// Node handles are cheap copies whose equality means "same node of this
/// tree snapshot"; they carry no identity across re-parses.
pub trait SyntaxTree {
    type Node<'a>: Copy + Eq + fmt::Debug
    where
        Self: 'a;

    fn root(&self) -> Self::Node<'_>;

    fn text_range<'a>(&'a self, node: Self::Node<'a>) -> ByteRange;

    fn kind<'a>(&'a self, node: Self::Node<'a>) -> &'a str;

    fn parent<'a>(&'a self, node: Self::Node<'a>) -> Option<Self::Node<'a>>;

    fn first_child<'a>(&'a self, node: Self::Node<'a>) -> Option<Self::Node<'a>>;

    fn next_sibling<'a>(&'a self, node: Self::Node<'a>) -> Option<Self::Node<'a>>;

    /// Smallest node whose range covers `offset`, the leaf at that offset.
    fn node_at(&self, offset: usize) -> Option<Self::Node<'_>>;
}

/// Count the ancestors of `node` that span exactly the same range.
///
/// Ancestor ranges only grow towards the root, so the coincident ones form an
/// unbroken chain directly above the node.
pub fn coincident_ancestor_count<'a, T: SyntaxTree + ?Sized>(
    tree: &'a T,
    node: T::Node<'a>,
) -> usize {
    let range = tree.text_range(node);
    let mut count = 0;
    let mut current = tree.parent(node);
    while let Some(ancestor) = current {
        if tree.text_range(ancestor) != range {
            break;
        }
        count += 1;
        current = tree.parent(ancestor);
    }
    count
}

/// Visit `node` and all of its descendants in document order.
pub fn walk_preorder<'a, T: SyntaxTree + ?Sized>(
    tree: &'a T,
    node: T::Node<'a>,
    visit: &mut impl FnMut(T::Node<'a>),
) {
    visit(node);
    let mut child = tree.first_child(node);
    while let Some(current) = child {
        walk_preorder(tree, current, visit);
        child = tree.next_sibling(current);
    }
}

/// Walk up from the leaf at `range.start` to the deepest node spanning exactly `range`.
pub fn deepest_node_with_range<T: SyntaxTree + ?Sized>(
    tree: &T,
    range: ByteRange,
) -> Option<T::Node<'_>> {
    let mut node = tree.node_at(range.start)?;
    loop {
        let current = tree.text_range(node);
        if current.start != range.start || current.end >= range.end {
            break;
        }
        node = tree.parent(node)?;
    }
    (tree.text_range(node) == range).then_some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::identical((0, 10), (0, 10), false)]
    #[case::nested((0, 10), (2, 5), false)]
    #[case::containing((2, 5), (0, 10), false)]
    #[case::disjoint((0, 5), (5, 10), false)]
    #[case::partial_right((0, 20), (10, 30), true)]
    #[case::partial_left((10, 30), (0, 20), true)]
    fn conflicts_with_detects_only_partial_overlap(
        #[case] a: (usize, usize),
        #[case] b: (usize, usize),
        #[case] expected: bool,
    ) {
        let a = ByteRange::new(a.0, a.1);
        let b = ByteRange::new(b.0, b.1);
        assert_eq!(a.conflicts_with(&b), expected);
        assert_eq!(b.conflicts_with(&a), expected);
    }

    #[test]
    fn coincident_ancestors_stop_at_first_wider_parent() {
        let mut tree = ArenaTree::new("source_file", ByteRange::new(0, 100));
        let block = tree.push_child(tree.root_id(), "block", ByteRange::new(10, 40));
        let inner = tree.push_child(block, "statement", ByteRange::new(10, 40));
        let leaf = tree.push_child(inner, "identifier", ByteRange::new(10, 40));

        assert_eq!(coincident_ancestor_count(&tree, leaf), 2);
        assert_eq!(coincident_ancestor_count(&tree, inner), 1);
        assert_eq!(coincident_ancestor_count(&tree, block), 0);
    }

    #[test]
    fn deepest_node_with_range_widens_from_leaf() {
        let mut tree = ArenaTree::new("source_file", ByteRange::new(0, 100));
        let block = tree.push_child(tree.root_id(), "block", ByteRange::new(10, 40));
        let _open = tree.push_child(block, "{", ByteRange::new(10, 11));
        let _close = tree.push_child(block, "}", ByteRange::new(39, 40));

        assert_eq!(deepest_node_with_range(&tree, ByteRange::new(10, 40)), Some(block));
        assert_eq!(deepest_node_with_range(&tree, ByteRange::new(10, 30)), None);
    }
}
