//! Owned syntax tree built by hand.
//!
//! Useful for languages whose folds come from something other than
//! tree-sitter (outline models, line-based scanners) and for exercising the
//! signature codec against precisely shaped trees.

use super::{ByteRange, SyntaxTree};

/// Index of a node inside an [`ArenaTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct ArenaNode {
    kind: String,
    range: ByteRange,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ArenaTree {
    nodes: Vec<ArenaNode>,
    root: NodeId,
}

impl ArenaTree {
    /// Create a tree with a single root node
    pub fn new(kind: impl Into<String>, range: ByteRange) -> Self {
        Self {
            nodes: vec![ArenaNode {
                kind: kind.into(),
                range,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Append a child under `parent`, keeping siblings ordered by start offset
    pub fn push_child(
        &mut self,
        parent: NodeId,
        kind: impl Into<String>,
        range: ByteRange,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ArenaNode {
            kind: kind.into(),
            range,
            parent: Some(parent),
            children: Vec::new(),
        });

        let nodes = &self.nodes;
        let siblings = &self.nodes[parent.0].children;
        let position =
            siblings.partition_point(|sibling| nodes[sibling.0].range.start <= range.start);
        self.nodes[parent.0].children.insert(position, id);
        id
    }

    /// Insert a new node between `node` and its parent, spanning the same range.
    ///
    /// Wrapping the root makes the wrapper the new root.
    pub fn wrap(&mut self, node: NodeId, kind: impl Into<String>) -> NodeId {
        let wrapper = NodeId(self.nodes.len());
        let parent = self.nodes[node.0].parent;
        self.nodes.push(ArenaNode {
            kind: kind.into(),
            range: self.nodes[node.0].range,
            parent,
            children: vec![node],
        });
        self.nodes[node.0].parent = Some(wrapper);

        match parent {
            Some(parent) => {
                for child in &mut self.nodes[parent.0].children {
                    if *child == node {
                        *child = wrapper;
                    }
                }
            }
            None => self.root = wrapper,
        }
        wrapper
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl SyntaxTree for ArenaTree {
    type Node<'a> = NodeId;

    fn root(&self) -> NodeId {
        self.root
    }

    fn text_range<'a>(&'a self, node: NodeId) -> ByteRange {
        self.nodes[node.0].range
    }

    fn kind<'a>(&'a self, node: NodeId) -> &'a str {
        &self.nodes[node.0].kind
    }

    fn parent<'a>(&'a self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn first_child<'a>(&'a self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].children.first().copied()
    }

    fn next_sibling<'a>(&'a self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent?;
        let siblings = &self.nodes[parent.0].children;
        let position = siblings.iter().position(|sibling| *sibling == node)?;
        siblings.get(position + 1).copied()
    }

    fn node_at(&self, offset: usize) -> Option<NodeId> {
        let root_range = self.nodes[self.root.0].range;
        if !root_range.contains_offset_inclusive(offset) {
            return None;
        }

        let mut current = self.root;
        'descend: loop {
            for child in &self.nodes[current.0].children {
                if self.nodes[child.0].range.contains_offset(offset) {
                    current = *child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }
}
