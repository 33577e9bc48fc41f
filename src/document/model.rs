use std::collections::BTreeSet;

use super::coordinates::LineMap;
use super::layer::LanguageLayer;
use crate::syntax::SyntaxTree;

/// Immutable snapshot of a parsed document: text, version stamp and one
/// syntax tree per language layer.
///
/// Fold computation runs against a snapshot; a newer edit produces a new
/// snapshot rather than mutating this one.
pub struct FoldDocument<T> {
    text: String,
    version: u64,
    /// `layers[0]` is the root layer of the base language
    layers: Vec<LanguageLayer<T>>,
    line_map: LineMap,
}

impl<T: SyntaxTree> FoldDocument<T> {
    /// Create a document snapshot with only the base language layer
    pub fn new(text: impl Into<String>, version: u64, base: LanguageLayer<T>) -> Self {
        let text = text.into();
        let line_map = LineMap::new(&text);
        Self {
            text,
            version,
            layers: vec![base],
            line_map,
        }
    }

    /// Add an injected language layer
    pub fn with_injection(mut self, layer: LanguageLayer<T>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Get the text content
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Document length in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Get the document version
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn base_language(&self) -> &str {
        &self.layers[0].language_id
    }

    pub fn base_layer(&self) -> &LanguageLayer<T> {
        &self.layers[0]
    }

    /// Injected layers in insertion order
    pub fn injected_layers(&self) -> &[LanguageLayer<T>] {
        &self.layers[1..]
    }

    pub fn layers(&self) -> &[LanguageLayer<T>] {
        &self.layers
    }

    /// All layers of one language (injections may produce several)
    pub fn layers_for<'a>(
        &'a self,
        language_id: &'a str,
    ) -> impl Iterator<Item = &'a LanguageLayer<T>> + 'a {
        self.layers
            .iter()
            .filter(move |layer| layer.language_id == language_id)
    }

    /// Languages present in the document: the base language first, then the
    /// others ordered by language id.
    pub fn languages(&self) -> Vec<&str> {
        let base = self.base_language();
        let others: BTreeSet<&str> = self
            .layers
            .iter()
            .map(|layer| layer.language_id.as_str())
            .filter(|language| *language != base)
            .collect();

        std::iter::once(base).chain(others).collect()
    }

    pub fn line_map(&self) -> &LineMap {
        &self.line_map
    }
}
