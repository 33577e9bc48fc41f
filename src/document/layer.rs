use crate::syntax::{ByteRange, SyntaxTree};

/// A single language layer within a document
#[derive(Debug, Clone)]
pub struct LanguageLayer<T> {
    pub language_id: String,
    pub tree: T,
    /// Byte ranges where this layer applies; empty for the root layer
    pub ranges: Vec<ByteRange>,
}

impl<T: SyntaxTree> LanguageLayer<T> {
    /// Create a root layer (covers entire document)
    pub fn root(language_id: impl Into<String>, tree: T) -> Self {
        Self {
            language_id: language_id.into(),
            tree,
            ranges: vec![],
        }
    }

    /// Create an injection layer with specific ranges.
    ///
    /// The tree must be parsed against the whole document text (included
    /// ranges), so its offsets are document offsets.
    pub fn injection(language_id: impl Into<String>, tree: T, ranges: Vec<ByteRange>) -> Self {
        Self {
            language_id: language_id.into(),
            tree,
            ranges,
        }
    }

    /// Check if this is a root layer
    pub fn is_root(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Check if a byte offset is within this layer's ranges
    pub fn contains_offset(&self, byte_offset: usize) -> bool {
        if self.is_root() {
            true
        } else {
            self.ranges
                .iter()
                .any(|range| range.contains_offset(byte_offset))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ArenaTree;

    #[test]
    fn root_layer_contains_all_offsets() {
        let tree = ArenaTree::new("document", ByteRange::new(0, 10));
        let layer = LanguageLayer::root("markdown", tree);

        assert!(layer.is_root());
        assert!(layer.contains_offset(0));
        assert!(layer.contains_offset(100));
    }

    #[test]
    fn injection_layer_contains_only_its_ranges() {
        let tree = ArenaTree::new("chunk", ByteRange::new(10, 20));
        let layer = LanguageLayer::injection("lua", tree, vec![ByteRange::new(10, 20)]);

        assert!(!layer.is_root());
        assert!(layer.contains_offset(10));
        assert!(layer.contains_offset(19));
        assert!(!layer.contains_offset(20));
        assert!(!layer.contains_offset(5));
    }
}
