use tree_sitter::{Node, Tree};

use super::{ByteRange, SyntaxTree};

/// Convert tree-sitter Node to a byte range
pub fn node_to_range(node: Node) -> ByteRange {
    ByteRange::new(node.start_byte(), node.end_byte())
}

impl SyntaxTree for Tree {
    type Node<'a> = Node<'a>;

    fn root(&self) -> Node<'_> {
        self.root_node()
    }

    fn text_range<'a>(&'a self, node: Node<'a>) -> ByteRange {
        node_to_range(node)
    }

    fn kind<'a>(&'a self, node: Node<'a>) -> &'a str {
        node.kind()
    }

    fn parent<'a>(&'a self, node: Node<'a>) -> Option<Node<'a>> {
        node.parent()
    }

    fn first_child<'a>(&'a self, node: Node<'a>) -> Option<Node<'a>> {
        node.child(0)
    }

    fn next_sibling<'a>(&'a self, node: Node<'a>) -> Option<Node<'a>> {
        node.next_sibling()
    }

    fn node_at(&self, offset: usize) -> Option<Node<'_>> {
        let root = self.root_node();
        if offset > root.end_byte() {
            return None;
        }
        // A one-byte probe picks the token starting at `offset`, not the one ending there
        let end = (offset + 1).min(root.end_byte()).max(offset);
        root.descendant_for_byte_range(offset, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{coincident_ancestor_count, deepest_node_with_range};
    use tree_sitter::Parser;

    fn parse_rust(text: &str) -> Tree {
        let language = tree_sitter_rust::LANGUAGE.into();
        let mut parser = Parser::new();
        parser.set_language(&language).expect("set rust");
        parser.parse(text, None).expect("parse rust")
    }

    #[test]
    fn node_at_returns_leaf_starting_at_offset() {
        let text = "fn main() { let x = 1; }";
        let tree = parse_rust(text);

        let leaf = tree.node_at(3).expect("leaf at offset 3");
        assert_eq!(tree.kind(leaf), "identifier");
        assert_eq!(tree.text_range(leaf), ByteRange::new(3, 7));
    }

    #[test]
    fn node_at_prefers_token_starting_at_offset() {
        let text = "fn main(){}";
        let tree = parse_rust(text);

        let leaf = tree.node_at(9).expect("leaf at offset 9");
        assert_eq!(tree.kind(leaf), "{");
    }

    #[test]
    fn deepest_node_with_range_finds_block() {
        let text = "fn main() { let x = 1; }";
        let tree = parse_rust(text);
        let block_start = text.find('{').unwrap();

        let block = deepest_node_with_range(&tree, ByteRange::new(block_start, text.len()))
            .expect("block node");
        assert_eq!(tree.kind(block), "block");
        assert_eq!(coincident_ancestor_count(&tree, block), 0);
    }
}
