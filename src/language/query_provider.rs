//! Fold provider driven by a tree-sitter `folds.scm` query.
//!
//! Nodes captured as `@fold` become candidates; `@fold.collapsed` marks
//! candidates that start collapsed regardless of configuration.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tree_sitter::{Language, Node, Query, QueryCursor, StreamingIterator, Tree};

use super::provider::{LanguageFoldProvider, ProviderError};
use crate::config::LanguageFoldingConfig;
use crate::error::{FoldingError, FoldingResult};
use crate::folding::candidate::FoldCandidate;
use crate::syntax::tree::node_to_range;

const FOLD_CAPTURE: &str = "fold";
const COLLAPSED_FOLD_CAPTURE: &str = "fold.collapsed";

/// Deepest match start visited in quick mode
const QUICK_MAX_START_DEPTH: u32 = 3;

const DEFAULT_MIN_LINES: usize = 2;

pub struct QueryFoldProvider {
    query: Query,
    fold_capture: Option<u32>,
    collapsed_capture: Option<u32>,
    min_lines: usize,
    placeholders: HashMap<String, String>,
    collapse_by_default: HashSet<String>,
}

impl std::fmt::Debug for QueryFoldProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryFoldProvider")
            .field("patterns", &self.query.pattern_count())
            .field("min_lines", &self.min_lines)
            .finish()
    }
}

impl QueryFoldProvider {
    /// Compile `source` as the folds query for `language`
    pub fn new(
        language: &Language,
        source: &str,
        config: &LanguageFoldingConfig,
    ) -> FoldingResult<Self> {
        let query = Query::new(language, source)
            .map_err(|e| FoldingError::query(format!("Failed to compile folds query: {e}")))?;

        let capture_index = |name: &str| {
            query
                .capture_names()
                .iter()
                .position(|capture| *capture == name)
                .map(|index| index as u32)
        };
        let fold_capture = capture_index(FOLD_CAPTURE);
        let collapsed_capture = capture_index(COLLAPSED_FOLD_CAPTURE);
        if fold_capture.is_none() && collapsed_capture.is_none() {
            return Err(FoldingError::query(format!(
                "Folds query has no @{FOLD_CAPTURE} capture"
            )));
        }

        Ok(Self {
            query,
            fold_capture,
            collapsed_capture,
            min_lines: config.min_lines.unwrap_or(DEFAULT_MIN_LINES),
            placeholders: config.placeholders.clone().unwrap_or_default(),
            collapse_by_default: config
                .collapse_by_default
                .iter()
                .flatten()
                .cloned()
                .collect(),
        })
    }

    /// Build a provider from the query file named in `config.folds`.
    ///
    /// Returns `Ok(None)` when the language has no folds query configured.
    pub fn from_config(
        language: &Language,
        config: &LanguageFoldingConfig,
    ) -> FoldingResult<Option<Self>> {
        let Some(path) = config.folds.as_deref() else {
            return Ok(None);
        };
        let source = load_query_file(Path::new(path))?;
        Self::new(language, &source, config).map(Some)
    }

    fn placeholder_for(&self, node: Node<'_>, text: &str) -> Option<String> {
        if let Some(placeholder) = self.placeholders.get(node.kind()) {
            return Some(placeholder.clone());
        }
        let first = text.get(node.start_byte()..)?.chars().next()?;
        bracket_placeholder(first).map(str::to_string)
    }
}

/// Placeholder for spans opened by a bracket
pub fn bracket_placeholder(open: char) -> Option<&'static str> {
    match open {
        '{' => Some("{...}"),
        '[' => Some("[...]"),
        '(' => Some("(...)"),
        _ => None,
    }
}

/// Read a query file
pub fn load_query_file(path: &Path) -> FoldingResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        log::warn!(
            target: "orikomi::aggregator",
            "Failed to read query file {}: {}",
            path.display(),
            e
        );
        FoldingError::from(e)
    })
}

impl LanguageFoldProvider<Tree> for QueryFoldProvider {
    fn build_candidates<'t>(
        &self,
        _tree: &'t Tree,
        root: Node<'t>,
        text: &str,
        quick: bool,
    ) -> Vec<FoldCandidate<Node<'t>>> {
        let mut cursor = QueryCursor::new();
        if quick {
            cursor.set_max_start_depth(Some(QUICK_MAX_START_DEPTH));
        }

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut matches = cursor.matches(&self.query, root, text.as_bytes());
        while let Some(match_) = matches.next() {
            for capture in match_.captures {
                let collapsed = Some(capture.index) == self.collapsed_capture;
                if !collapsed && Some(capture.index) != self.fold_capture {
                    continue;
                }

                let node = capture.node;
                let range = node_to_range(node);
                if range.is_empty() || !seen.insert(range) {
                    continue;
                }
                let lines = node.end_position().row - node.start_position().row + 1;
                if lines < self.min_lines {
                    continue;
                }

                let mut candidate = FoldCandidate::new(node, range);
                if let Some(placeholder) = self.placeholder_for(node, text) {
                    candidate = candidate.with_placeholder(placeholder);
                }
                if collapsed {
                    candidate = candidate.collapsed_by_default(true);
                }
                candidates.push(candidate);
            }
        }

        candidates.sort_by_key(|candidate| (candidate.range.start, Reverse(candidate.range.end)));
        candidates
    }

    fn collapsed_by_default<'t>(
        &self,
        _tree: &'t Tree,
        candidate: &FoldCandidate<Node<'t>>,
    ) -> Result<bool, ProviderError> {
        Ok(self.collapse_by_default.contains(candidate.owner.kind()))
    }
}
