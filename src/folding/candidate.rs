use std::fmt;
use std::sync::Arc;

use super::dependency::ModificationTracker;
use super::region::FoldingGroup;
use crate::syntax::ByteRange;

/// A collapsible span proposed by a language provider.
///
/// `owner` is the syntax node the span was computed from; it is only valid for
/// the tree snapshot the provider ran against.
#[derive(Clone)]
pub struct FoldCandidate<N> {
    pub range: ByteRange,
    /// `None` means the configured default placeholder
    pub placeholder_text: Option<String>,
    pub group: Option<FoldingGroup>,
    pub non_expandable: bool,
    /// Overrides the provider's `collapsed_by_default` answer
    pub collapsed_by_default: Option<bool>,
    /// The region may be dropped even while collapsed
    pub can_be_removed_when_collapsed: bool,
    pub owner: N,
    pub dependencies: Vec<Arc<dyn ModificationTracker>>,
}

impl<N: fmt::Debug> fmt::Debug for FoldCandidate<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FoldCandidate")
            .field("range", &self.range)
            .field("placeholder_text", &self.placeholder_text)
            .field("group", &self.group)
            .field("non_expandable", &self.non_expandable)
            .field("collapsed_by_default", &self.collapsed_by_default)
            .field("owner", &self.owner)
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}

impl<N> FoldCandidate<N> {
    pub fn new(owner: N, range: ByteRange) -> Self {
        Self {
            range,
            placeholder_text: None,
            group: None,
            non_expandable: false,
            collapsed_by_default: None,
            can_be_removed_when_collapsed: false,
            owner,
            dependencies: Vec::new(),
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder_text = Some(placeholder.into());
        self
    }

    pub fn in_group(mut self, group: FoldingGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn non_expandable(mut self) -> Self {
        self.non_expandable = true;
        self
    }

    pub fn collapsed_by_default(mut self, collapsed: bool) -> Self {
        self.collapsed_by_default = Some(collapsed);
        self
    }

    pub fn removable_when_collapsed(mut self) -> Self {
        self.can_be_removed_when_collapsed = true;
        self
    }

    pub fn depends_on(mut self, tracker: Arc<dyn ModificationTracker>) -> Self {
        self.dependencies.push(tracker);
        self
    }

    /// Placeholder to display, falling back to `default` when none was given
    pub fn placeholder_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.placeholder_text.as_deref().unwrap_or(default)
    }
}
