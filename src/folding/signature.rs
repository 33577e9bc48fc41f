//! Relocatable node signatures.
//!
//! A re-parse produces fresh node objects, so a fold region cannot keep a
//! reference to its owner. It keeps a signature instead: a short string that
//! locates "the same" node in a later tree snapshot by offsets alone.
//!
//! Two formats exist:
//!
//! - `e#<start>,<end>,<index>`: the node spanning exactly `[start, end)`,
//!   `index` counting the ancestors that span the same range.
//! - `k#<kind>#<start>,<end>`: the node of the given kind within the chain of
//!   nodes spanning exactly `[start, end)`.
//!
//! Decoding never fails loudly. A signature that cannot be resolved means
//! "could not relocate" and the caller treats the region as unmatched.

use std::collections::HashSet;
use std::fmt::{self, Write};
use thiserror::Error;

use crate::config::LanguageFoldingConfig;
use crate::document::FoldDocument;
use crate::syntax::{ByteRange, SyntaxTree, coincident_ancestor_count, deepest_node_with_range};

const GENERIC_PREFIX: &str = "e#";
const KIND_PREFIX: &str = "k#";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("unknown signature prefix in {0:?}")]
    UnknownPrefix(String),

    #[error("malformed signature {signature:?}: {reason}")]
    Malformed {
        signature: String,
        reason: &'static str,
    },
}

/// A signature split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedSignature {
    Generic { range: ByteRange, index: usize },
    Kind { kind: String, range: ByteRange },
}

impl ParsedSignature {
    pub fn range(&self) -> ByteRange {
        match self {
            ParsedSignature::Generic { range, .. } | ParsedSignature::Kind { range, .. } => *range,
        }
    }
}

impl fmt::Display for ParsedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedSignature::Generic { range, index } => write!(
                f,
                "{GENERIC_PREFIX}{},{},{}",
                range.start, range.end, index
            ),
            ParsedSignature::Kind { kind, range } => {
                write!(f, "{KIND_PREFIX}{kind}#{},{}", range.start, range.end)
            }
        }
    }
}

/// Split a signature string into its parts
pub fn parse_signature(signature: &str) -> Result<ParsedSignature, SignatureError> {
    let malformed = |reason| SignatureError::Malformed {
        signature: signature.to_string(),
        reason,
    };

    if let Some(body) = signature.strip_prefix(GENERIC_PREFIX) {
        let mut parts = body.split(',');
        let mut next_number = |what| {
            parts
                .next()
                .and_then(|part| part.parse::<usize>().ok())
                .ok_or_else(|| malformed(what))
        };
        let start = next_number("invalid start offset")?;
        let end = next_number("invalid end offset")?;
        let index = next_number("invalid ancestor index")?;
        if parts.next().is_some() {
            return Err(malformed("trailing fields"));
        }
        if end < start {
            return Err(malformed("end before start"));
        }
        return Ok(ParsedSignature::Generic {
            range: ByteRange::new(start, end),
            index,
        });
    }

    if let Some(body) = signature.strip_prefix(KIND_PREFIX) {
        // Kinds may contain '#', offsets never do
        let (kind, offsets) = body
            .rsplit_once('#')
            .ok_or_else(|| malformed("missing offsets"))?;
        if kind.is_empty() {
            return Err(malformed("empty kind"));
        }
        let (start, end) = offsets
            .split_once(',')
            .ok_or_else(|| malformed("missing end offset"))?;
        let start = start
            .parse::<usize>()
            .map_err(|_| malformed("invalid start offset"))?;
        let end = end
            .parse::<usize>()
            .map_err(|_| malformed("invalid end offset"))?;
        if end < start {
            return Err(malformed("end before start"));
        }
        return Ok(ParsedSignature::Kind {
            kind: kind.to_string(),
            range: ByteRange::new(start, end),
        });
    }

    Err(SignatureError::UnknownPrefix(signature.to_string()))
}

fn note(trace: &mut Option<&mut String>, args: fmt::Arguments<'_>) {
    if let Some(buffer) = trace.as_deref_mut() {
        let _ = buffer.write_fmt(args);
        buffer.push('\n');
    }
}

/// Offset and ancestor-index encoding, applicable to any node.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericSignatureStrategy;

impl GenericSignatureStrategy {
    pub fn encode<'a, T: SyntaxTree + ?Sized>(
        &self,
        tree: &'a T,
        node: T::Node<'a>,
    ) -> Option<String> {
        let range = tree.text_range(node);
        if range.is_empty() {
            return None;
        }
        let index = coincident_ancestor_count(tree, node);
        Some(ParsedSignature::Generic { range, index }.to_string())
    }

    pub fn decode<'a, T: SyntaxTree + ?Sized>(
        &self,
        tree: &'a T,
        range: ByteRange,
        index: usize,
        trace: &mut Option<&mut String>,
    ) -> Option<T::Node<'a>> {
        let Some(mut node) = deepest_node_with_range(tree, range) else {
            note(trace, format_args!("no node spans exactly {range}"));
            return None;
        };

        let index_from_root = coincident_ancestor_count(tree, node);
        note(
            trace,
            format_args!(
                "widened to {} {range}, index from root {index_from_root}",
                tree.kind(node)
            ),
        );

        if index > index_from_root {
            for step in 0..index - index_from_root {
                let child = tree
                    .first_child(node)
                    .filter(|child| tree.text_range(*child) == range);
                let Some(child) = child else {
                    note(trace, format_args!("descend step {step} has no coincident child"));
                    return None;
                };
                node = child;
            }
        } else {
            for step in 0..index_from_root - index {
                let Some(parent) = tree.parent(node) else {
                    note(trace, format_args!("ascend step {step} reached the root"));
                    return None;
                };
                node = parent;
            }
        }

        note(trace, format_args!("resolved to {}", tree.kind(node)));
        Some(node)
    }
}

/// Kind-qualified encoding for a configured set of node kinds.
///
/// Survives the insertion of wrapper nodes with the same span, which shifts
/// the generic index.
#[derive(Debug, Clone, Default)]
pub struct KindSignatureStrategy {
    kinds: HashSet<String>,
}

impl KindSignatureStrategy {
    pub fn new(kinds: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn encode<'a, T: SyntaxTree + ?Sized>(
        &self,
        tree: &'a T,
        node: T::Node<'a>,
    ) -> Option<String> {
        let kind = tree.kind(node);
        if !self.kinds.contains(kind) {
            return None;
        }
        let range = tree.text_range(node);
        if range.is_empty() {
            return None;
        }

        // The kind must pick out this node: the lowest node of that kind in
        // the coincident chain is the one decode will find.
        let mut trace = None;
        let found = Self::find_kind(tree, kind, range, &mut trace)?;
        if found != node {
            return None;
        }
        Some(
            ParsedSignature::Kind {
                kind: kind.to_string(),
                range,
            }
            .to_string(),
        )
    }

    pub fn decode<'a, T: SyntaxTree + ?Sized>(
        &self,
        tree: &'a T,
        kind: &str,
        range: ByteRange,
        trace: &mut Option<&mut String>,
    ) -> Option<T::Node<'a>> {
        Self::find_kind(tree, kind, range, trace)
    }

    fn find_kind<'a, T: SyntaxTree + ?Sized>(
        tree: &'a T,
        kind: &str,
        range: ByteRange,
        trace: &mut Option<&mut String>,
    ) -> Option<T::Node<'a>> {
        let Some(mut node) = deepest_node_with_range(tree, range) else {
            note(trace, format_args!("no node spans exactly {range}"));
            return None;
        };
        loop {
            if tree.kind(node) == kind {
                note(trace, format_args!("found {kind} at {range}"));
                return Some(node);
            }
            match tree.parent(node) {
                Some(parent) if tree.text_range(parent) == range => node = parent,
                _ => {
                    note(trace, format_args!("no {kind} spans exactly {range}"));
                    return None;
                }
            }
        }
    }
}

/// One entry of a codec's ordered strategy list
#[derive(Debug, Clone)]
pub enum SignatureStrategy {
    Kind(KindSignatureStrategy),
    Generic(GenericSignatureStrategy),
}

impl SignatureStrategy {
    fn encode<'a, T: SyntaxTree + ?Sized>(
        &self,
        tree: &'a T,
        node: T::Node<'a>,
    ) -> Option<String> {
        match self {
            SignatureStrategy::Kind(strategy) => strategy.encode(tree, node),
            SignatureStrategy::Generic(strategy) => strategy.encode(tree, node),
        }
    }

    fn decode<'a, T: SyntaxTree + ?Sized>(
        &self,
        tree: &'a T,
        signature: &ParsedSignature,
        trace: &mut Option<&mut String>,
    ) -> Option<T::Node<'a>> {
        match (self, signature) {
            (SignatureStrategy::Kind(strategy), ParsedSignature::Kind { kind, range }) => {
                strategy.decode(tree, kind, *range, trace)
            }
            (SignatureStrategy::Generic(strategy), ParsedSignature::Generic { range, index }) => {
                strategy.decode(tree, *range, *index, trace)
            }
            _ => None,
        }
    }
}

/// Ordered list of signature strategies; the first one producing a result wins.
#[derive(Debug, Clone)]
pub struct SignatureCodec {
    strategies: Vec<SignatureStrategy>,
    validate: bool,
}

impl Default for SignatureCodec {
    fn default() -> Self {
        Self::generic()
    }
}

impl SignatureCodec {
    pub fn new(strategies: Vec<SignatureStrategy>) -> Self {
        Self {
            strategies,
            validate: false,
        }
    }

    /// Codec with only the generic strategy
    pub fn generic() -> Self {
        Self::new(vec![SignatureStrategy::Generic(GenericSignatureStrategy)])
    }

    /// Codec able to decode signatures of every built-in strategy
    pub fn all_strategies() -> Self {
        Self::new(vec![
            SignatureStrategy::Kind(KindSignatureStrategy::default()),
            SignatureStrategy::Generic(GenericSignatureStrategy),
        ])
    }

    /// Codec for one language: kind-qualified signatures for the configured
    /// kinds, generic ones for everything else.
    pub fn for_language(config: &LanguageFoldingConfig) -> Self {
        let mut strategies = Vec::with_capacity(2);
        if let Some(kinds) = config.signature_kinds.as_ref().filter(|kinds| !kinds.is_empty()) {
            strategies.push(SignatureStrategy::Kind(KindSignatureStrategy::new(
                kinds.iter().cloned(),
            )));
        }
        strategies.push(SignatureStrategy::Generic(GenericSignatureStrategy));
        Self::new(strategies)
    }

    /// Decode every encoded signature again and log mismatches
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn encode<'a, T: SyntaxTree + ?Sized>(
        &self,
        tree: &'a T,
        node: T::Node<'a>,
    ) -> Option<String> {
        let signature = self
            .strategies
            .iter()
            .find_map(|strategy| strategy.encode(tree, node))?;

        if self.validate {
            self.validate_round_trip(tree, node, &signature);
        }
        Some(signature)
    }

    pub fn decode<'a, T: SyntaxTree + ?Sized>(
        &self,
        tree: &'a T,
        signature: &str,
        mut trace: Option<&mut String>,
    ) -> Option<T::Node<'a>> {
        let parsed = match parse_signature(signature) {
            Ok(parsed) => parsed,
            Err(err) => {
                note(&mut trace, format_args!("{err}"));
                log::debug!(target: "orikomi::signature", "{}", err);
                return None;
            }
        };

        let node = self
            .strategies
            .iter()
            .find_map(|strategy| strategy.decode(tree, &parsed, &mut trace));
        if node.is_none() {
            log::trace!(
                target: "orikomi::signature",
                "Could not relocate {}",
                signature
            );
        }
        node
    }

    /// Decode against a whole document: the base layer first, then every
    /// injected layer covering the signature's start offset.
    ///
    /// Returns the language of the layer that resolved the node.
    pub fn decode_in_document<'a, T: SyntaxTree>(
        &self,
        document: &'a FoldDocument<T>,
        signature: &str,
    ) -> Option<(&'a str, T::Node<'a>)> {
        let start = parse_signature(signature).ok()?.range().start;

        let base = document.base_layer();
        if let Some(node) = self.decode(&base.tree, signature, None) {
            return Some((base.language_id.as_str(), node));
        }

        document
            .injected_layers()
            .iter()
            .filter(|layer| layer.contains_offset(start))
            .find_map(|layer| {
                self.decode(&layer.tree, signature, None)
                    .map(|node| (layer.language_id.as_str(), node))
            })
    }

    fn validate_round_trip<'a, T: SyntaxTree + ?Sized>(
        &self,
        tree: &'a T,
        node: T::Node<'a>,
        signature: &str,
    ) {
        let mut trace = String::new();
        let decoded = self.decode(tree, signature, Some(&mut trace));
        if decoded != Some(node) {
            log::warn!(
                target: "orikomi::signature",
                "Signature {} of {} {} decodes to {:?}; trace:\n{}",
                signature,
                tree.kind(node),
                tree.text_range(node),
                decoded.map(|decoded| tree.kind(decoded)),
                trace
            );
        }
    }
}

/// Encode `node` with the generic strategy
pub fn encode_signature<'a, T: SyntaxTree + ?Sized>(
    tree: &'a T,
    node: T::Node<'a>,
) -> Option<String> {
    GenericSignatureStrategy.encode(tree, node)
}

/// Resolve a signature produced by any built-in strategy
pub fn decode_signature<'a, T: SyntaxTree + ?Sized>(
    tree: &'a T,
    signature: &str,
) -> Option<T::Node<'a>> {
    SignatureCodec::all_strategies().decode(tree, signature, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LanguageLayer;
    use crate::syntax::{ArenaTree, NodeId};
    use rstest::rstest;

    /// source_file [0,200) > function [90,160) > block [100,150) > "{" [100,101)
    fn block_tree() -> (ArenaTree, NodeId) {
        let mut tree = ArenaTree::new("source_file", ByteRange::new(0, 200));
        let function = tree.push_child(tree.root_id(), "function", ByteRange::new(90, 160));
        let block = tree.push_child(function, "block", ByteRange::new(100, 150));
        tree.push_child(block, "{", ByteRange::new(100, 101));
        tree.push_child(block, "}", ByteRange::new(149, 150));
        (tree, block)
    }

    #[test]
    fn generic_round_trip_without_coincident_ancestors() {
        let (tree, block) = block_tree();

        let signature = encode_signature(&tree, block).unwrap();

        assert_eq!(signature, "e#100,150,0");
        assert_eq!(decode_signature(&tree, &signature), Some(block));
    }

    #[test]
    fn wrapping_node_takes_over_original_signature() {
        let (mut tree, block) = block_tree();
        let signature = encode_signature(&tree, block).unwrap();

        let wrapper = tree.wrap(block, "expression_statement");

        assert_eq!(encode_signature(&tree, block).as_deref(), Some("e#100,150,1"));
        assert_eq!(decode_signature(&tree, &signature), Some(wrapper));
        assert_eq!(decode_signature(&tree, "e#100,150,1"), Some(block));
    }

    #[test]
    fn decode_fails_when_no_node_spans_range() {
        let (tree, _) = block_tree();
        let mut trace = String::new();

        let node = SignatureCodec::generic().decode(&tree, "e#100,140,0", Some(&mut trace));

        assert_eq!(node, None);
        assert!(trace.contains("no node spans exactly"), "trace: {trace}");
    }

    #[test]
    fn decode_fails_when_index_exceeds_chain() {
        let (tree, _) = block_tree();
        assert_eq!(decode_signature(&tree, "e#100,150,3"), None);
    }

    #[test]
    fn empty_node_has_no_signature() {
        let mut tree = ArenaTree::new("source_file", ByteRange::new(0, 10));
        let empty = tree.push_child(tree.root_id(), "missing", ByteRange::new(4, 4));
        assert_eq!(encode_signature(&tree, empty), None);
    }

    #[test]
    fn kind_strategy_survives_wrapper_insertion() {
        let (mut tree, block) = block_tree();
        let codec = SignatureCodec::new(vec![
            SignatureStrategy::Kind(KindSignatureStrategy::new(["block"])),
            SignatureStrategy::Generic(GenericSignatureStrategy),
        ]);

        let signature = codec.encode(&tree, block).unwrap();
        assert_eq!(signature, "k#block#100,150");

        tree.wrap(block, "expression_statement");
        assert_eq!(codec.decode(&tree, &signature, None), Some(block));
    }

    #[test]
    fn validating_codec_encodes_nested_same_kind_nodes() {
        // block [100,150) wrapped by another block with the same span
        let (mut tree, block) = block_tree();
        let outer = tree.wrap(block, "block");
        let codec = SignatureCodec::new(vec![
            SignatureStrategy::Kind(KindSignatureStrategy::new(["block"])),
            SignatureStrategy::Generic(GenericSignatureStrategy),
        ])
        .with_validation(true);

        let inner_signature = codec.encode(&tree, block).unwrap();
        let outer_signature = codec.encode(&tree, outer).unwrap();

        assert_eq!(inner_signature, "k#block#100,150");
        assert_eq!(outer_signature, "e#100,150,0");
        assert_eq!(codec.decode(&tree, &inner_signature, None), Some(block));
        assert_eq!(codec.decode(&tree, &outer_signature, None), Some(outer));
    }

    #[test]
    fn kind_strategy_defers_to_generic_for_other_kinds() {
        let (tree, block) = block_tree();
        let function = tree.parent(block).unwrap();
        let codec = SignatureCodec::for_language(&LanguageFoldingConfig {
            signature_kinds: Some(vec!["block".to_string()]),
            ..Default::default()
        });

        assert_eq!(codec.encode(&tree, function).as_deref(), Some("e#90,160,0"));
        assert_eq!(codec.encode(&tree, block).as_deref(), Some("k#block#100,150"));
    }

    #[rstest]
    #[case::generic("e#1,5,2", Ok(ParsedSignature::Generic { range: ByteRange::new(1, 5), index: 2 }))]
    #[case::kind_with_hash("k#a#b#3,9", Ok(ParsedSignature::Kind { kind: "a#b".to_string(), range: ByteRange::new(3, 9) }))]
    #[case::unknown("x#1,2,0", Err(SignatureError::UnknownPrefix("x#1,2,0".to_string())))]
    #[case::reversed("e#9,3,0", Err(SignatureError::Malformed { signature: "e#9,3,0".to_string(), reason: "end before start" }))]
    #[case::missing_index("e#1,5", Err(SignatureError::Malformed { signature: "e#1,5".to_string(), reason: "invalid ancestor index" }))]
    fn parse_signature_cases(
        #[case] input: &str,
        #[case] expected: Result<ParsedSignature, SignatureError>,
    ) {
        assert_eq!(parse_signature(input), expected);
    }

    #[test]
    fn decode_in_document_probes_injected_layers() {
        let base = ArenaTree::new("document", ByteRange::new(0, 200));
        let (injected, block) = block_tree();
        let document = FoldDocument::new("x".repeat(200), 1, LanguageLayer::root("markdown", base))
            .with_injection(LanguageLayer::injection(
                "rust",
                injected,
                vec![ByteRange::new(90, 160)],
            ));

        let (language, node) = SignatureCodec::generic()
            .decode_in_document(&document, "e#100,150,0")
            .unwrap();

        assert_eq!(language, "rust");
        assert_eq!(node, block);
    }
}
