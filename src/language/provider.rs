use thiserror::Error;

use crate::folding::candidate::FoldCandidate;
use crate::syntax::SyntaxTree;

/// Failures a fold provider may report for a single question
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Background indexing is in progress; the answer is not available yet
    #[error("index not ready")]
    IndexNotReady,

    #[error("provider failed: {0}")]
    Failed(String),
}

/// Per-language source of fold candidates.
///
/// Providers see one language layer at a time: `root` is the root of that
/// layer's tree and `text` the full document text, so every range they
/// produce is a document offset.
pub trait LanguageFoldProvider<T: SyntaxTree>: Send + Sync {
    /// Propose collapsible spans below `root`.
    ///
    /// With `quick` set the provider may return a cheaper, less complete list.
    fn build_candidates<'t>(
        &self,
        tree: &'t T,
        root: T::Node<'t>,
        text: &str,
        quick: bool,
    ) -> Vec<FoldCandidate<T::Node<'t>>>;

    /// Whether a candidate without an explicit override starts collapsed
    fn collapsed_by_default<'t>(
        &self,
        tree: &'t T,
        candidate: &FoldCandidate<T::Node<'t>>,
    ) -> Result<bool, ProviderError>;
}
