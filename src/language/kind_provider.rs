//! Fold provider that folds nodes by kind.
//!
//! Works on any [`SyntaxTree`], which makes it the provider of choice for
//! hand-built trees.

use std::collections::{HashMap, HashSet};

use super::provider::{LanguageFoldProvider, ProviderError};
use crate::folding::candidate::FoldCandidate;
use crate::syntax::SyntaxTree;

/// Nesting depth explored in quick mode
const QUICK_MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct KindFoldProvider {
    /// Foldable kinds and their placeholder
    kinds: HashMap<String, Option<String>>,
    collapsed_kinds: HashSet<String>,
    min_lines: usize,
}

impl KindFoldProvider {
    pub fn new() -> Self {
        Self {
            min_lines: 1,
            ..Default::default()
        }
    }

    pub fn fold_kind(mut self, kind: impl Into<String>, placeholder: Option<&str>) -> Self {
        self.kinds
            .insert(kind.into(), placeholder.map(str::to_string));
        self
    }

    pub fn collapse_kind(mut self, kind: impl Into<String>) -> Self {
        self.collapsed_kinds.insert(kind.into());
        self
    }

    pub fn min_lines(mut self, min_lines: usize) -> Self {
        self.min_lines = min_lines;
        self
    }

    fn collect<'t, T: SyntaxTree>(
        &self,
        tree: &'t T,
        node: T::Node<'t>,
        text: &str,
        depth: usize,
        max_depth: Option<usize>,
        out: &mut Vec<FoldCandidate<T::Node<'t>>>,
    ) {
        if let Some(placeholder) = self.kinds.get(tree.kind(node)) {
            let range = tree.text_range(node);
            let lines = text
                .get(range.start..range.end)
                .map(|span| span.matches('\n').count() + 1)
                .unwrap_or(0);
            if !range.is_empty() && lines >= self.min_lines {
                let mut candidate = FoldCandidate::new(node, range);
                if let Some(placeholder) = placeholder {
                    candidate = candidate.with_placeholder(placeholder.clone());
                }
                out.push(candidate);
            }
        }

        if max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        let mut child = tree.first_child(node);
        while let Some(current) = child {
            self.collect(tree, current, text, depth + 1, max_depth, out);
            child = tree.next_sibling(current);
        }
    }
}

impl<T: SyntaxTree> LanguageFoldProvider<T> for KindFoldProvider {
    fn build_candidates<'t>(
        &self,
        tree: &'t T,
        root: T::Node<'t>,
        text: &str,
        quick: bool,
    ) -> Vec<FoldCandidate<T::Node<'t>>> {
        let mut candidates = Vec::new();
        let max_depth = quick.then_some(QUICK_MAX_DEPTH);
        self.collect(tree, root, text, 0, max_depth, &mut candidates);
        candidates
    }

    fn collapsed_by_default<'t>(
        &self,
        tree: &'t T,
        candidate: &FoldCandidate<T::Node<'t>>,
    ) -> Result<bool, ProviderError> {
        Ok(self.collapsed_kinds.contains(tree.kind(candidate.owner)))
    }
}
