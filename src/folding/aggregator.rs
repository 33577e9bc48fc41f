//! Merging fold candidates of every language in a document.
//!
//! Languages are visited base first, then by language id. Each provider sees
//! only its own layers. When several languages contribute, a candidate that
//! partially overlaps a range accepted for an earlier language is rejected,
//! so the result never contains conflicting ranges across languages.

use rust_lapper::{Interval, Lapper};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::candidate::FoldCandidate;
use super::dependency::{TrackedDependency, observe_all};
use super::region::RegionInfo;
use super::signature::SignatureCodec;
use crate::config::WorkspaceFoldingSettings;
use crate::document::{FoldDocument, LanguageLayer};
use crate::language::{FoldProviderRegistry, LanguageFoldProvider, ProviderError};
use crate::syntax::{ByteRange, SyntaxTree};

/// The computation was superseded before it finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("fold computation cancelled")]
pub struct Cancelled;

/// Result of one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub infos: Vec<RegionInfo>,
    /// Dependencies declared by the candidates, observed during the pass
    pub dependencies: Vec<TrackedDependency>,
}

/// Accepted ranges of the languages visited so far.
struct ConflictTracker {
    index: Lapper<usize, usize>,
    pending: Vec<Interval<usize, usize>>,
}

impl ConflictTracker {
    fn new() -> Self {
        Self {
            index: Lapper::new(Vec::new()),
            pending: Vec::new(),
        }
    }

    /// Range accepted for an earlier language that partially overlaps `range`
    fn conflict(&self, range: ByteRange) -> Option<ByteRange> {
        self.index
            .find(range.start, range.end)
            .map(|interval| ByteRange::new(interval.start, interval.stop))
            .find(|accepted| accepted.conflicts_with(&range))
    }

    fn accept(&mut self, range: ByteRange, language_index: usize) {
        self.pending.push(Interval {
            start: range.start,
            stop: range.end,
            val: language_index,
        });
    }

    /// Make this language's ranges visible to the languages after it
    fn finish_language(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut intervals: Vec<_> = self.index.iter().cloned().collect();
        intervals.append(&mut self.pending);
        self.index = Lapper::new(intervals);
    }
}

pub struct FoldAggregator<T: SyntaxTree> {
    registry: Arc<FoldProviderRegistry<T>>,
    settings: Arc<WorkspaceFoldingSettings>,
}

impl<T: SyntaxTree> FoldAggregator<T> {
    pub fn new(
        registry: Arc<FoldProviderRegistry<T>>,
        settings: Arc<WorkspaceFoldingSettings>,
    ) -> Self {
        Self { registry, settings }
    }

    /// Build the conflict-free region info list for `document`.
    ///
    /// `cancel` is checked after every language.
    pub fn aggregate(
        &self,
        document: &FoldDocument<T>,
        quick: bool,
        cancel: &CancellationToken,
    ) -> Result<Aggregation, Cancelled> {
        let languages = document.languages();
        let mut tracker = (languages.len() > 1).then(ConflictTracker::new);
        let mut accepted: HashMap<ByteRange, usize> = HashMap::new();
        let mut aggregation = Aggregation::default();

        for (language_index, language) in languages.iter().enumerate() {
            let Some(provider) = self.registry.get(language) else {
                log::trace!(
                    target: "orikomi::aggregator",
                    "No fold provider for {}",
                    language
                );
                Self::checkpoint(cancel, language)?;
                continue;
            };

            let config = self.settings.language(language);
            let codec =
                SignatureCodec::for_language(&config).with_validation(self.settings.validate_signatures);

            for layer in document.layers_for(language) {
                let candidates =
                    provider.build_candidates(&layer.tree, layer.tree.root(), document.text(), quick);

                aggregation
                    .dependencies
                    .extend(observe_all(candidates.iter().flat_map(|c| &c.dependencies)));

                for candidate in candidates {
                    if !self.in_bounds(document, language, candidate.range) {
                        continue;
                    }

                    if let Some(&existing) = accepted.get(&candidate.range) {
                        log::trace!(
                            target: "orikomi::aggregator",
                            "{} candidate {} duplicates {} region",
                            language,
                            candidate.range,
                            aggregation.infos[existing].language
                        );
                        continue;
                    }

                    if let Some(conflict) = tracker
                        .as_ref()
                        .and_then(|tracker| tracker.conflict(candidate.range))
                    {
                        log::debug!(
                            target: "orikomi::aggregator",
                            "Rejected {} candidate {}: overlaps accepted {}",
                            language,
                            candidate.range,
                            conflict
                        );
                        continue;
                    }

                    if let Some(tracker) = tracker.as_mut() {
                        tracker.accept(candidate.range, language_index);
                    }
                    accepted.insert(candidate.range, aggregation.infos.len());

                    let info = self.region_info(language, layer, provider.as_ref(), &codec, candidate);
                    aggregation.infos.push(info);
                }
            }

            if let Some(tracker) = tracker.as_mut() {
                tracker.finish_language();
            }

            Self::checkpoint(cancel, language)?;
        }

        Ok(aggregation)
    }

    fn checkpoint(cancel: &CancellationToken, language: &str) -> Result<(), Cancelled> {
        if cancel.is_cancelled() {
            log::debug!(
                target: "orikomi::aggregator",
                "Aggregation cancelled after {}",
                language
            );
            return Err(Cancelled);
        }
        Ok(())
    }

    fn in_bounds(&self, document: &FoldDocument<T>, language: &str, range: ByteRange) -> bool {
        if range.is_empty() || range.end > document.len() {
            log::error!(
                target: "orikomi::aggregator",
                "Dropped invalid fold candidate from {}: range {} in document of length {}",
                language,
                range,
                document.len()
            );
            return false;
        }
        true
    }

    fn region_info<'t>(
        &self,
        language: &str,
        layer: &'t LanguageLayer<T>,
        provider: &dyn LanguageFoldProvider<T>,
        codec: &SignatureCodec,
        candidate: FoldCandidate<T::Node<'t>>,
    ) -> RegionInfo {
        let collapsed_by_default = match candidate.collapsed_by_default {
            Some(collapsed) => collapsed,
            None => match provider.collapsed_by_default(&layer.tree, &candidate) {
                Ok(collapsed) => collapsed,
                Err(ProviderError::IndexNotReady) => {
                    log::debug!(
                        target: "orikomi::aggregator",
                        "Index not ready for {} candidate {}; assuming expanded",
                        language,
                        candidate.range
                    );
                    false
                }
                Err(err) => {
                    log::warn!(
                        target: "orikomi::aggregator",
                        "{} provider could not resolve default state of {}: {}",
                        language,
                        candidate.range,
                        err
                    );
                    false
                }
            },
        };

        RegionInfo {
            range: candidate.range,
            placeholder: candidate
                .placeholder_or(&self.settings.default_placeholder)
                .to_string(),
            group: candidate.group,
            non_expandable: candidate.non_expandable,
            can_be_removed_when_collapsed: candidate.can_be_removed_when_collapsed,
            language: language.to_string(),
            signature: codec.encode(&layer.tree, candidate.owner),
            collapsed_by_default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folding::dependency::SimpleModificationTracker;
    use crate::syntax::{ArenaTree, NodeId};

    /// Proposes one candidate per listed range, owned by the node spanning it
    struct FixedProvider {
        regions: Vec<(ByteRange, &'static str)>,
        index_ready: bool,
        dependency: Option<Arc<SimpleModificationTracker>>,
    }

    impl FixedProvider {
        fn new(regions: Vec<(ByteRange, &'static str)>) -> Self {
            Self {
                regions,
                index_ready: true,
                dependency: None,
            }
        }
    }

    impl LanguageFoldProvider<ArenaTree> for FixedProvider {
        fn build_candidates<'t>(
            &self,
            tree: &'t ArenaTree,
            root: NodeId,
            _text: &str,
            _quick: bool,
        ) -> Vec<FoldCandidate<NodeId>> {
            self.regions
                .iter()
                .map(|(range, placeholder)| {
                    let owner = crate::syntax::deepest_node_with_range(tree, *range).unwrap_or(root);
                    let mut candidate = FoldCandidate::new(owner, *range).with_placeholder(*placeholder);
                    if let Some(dependency) = &self.dependency {
                        candidate = candidate.depends_on(dependency.clone());
                    }
                    candidate
                })
                .collect()
        }

        fn collapsed_by_default<'t>(
            &self,
            _tree: &'t ArenaTree,
            candidate: &FoldCandidate<NodeId>,
        ) -> Result<bool, ProviderError> {
            if !self.index_ready {
                return Err(ProviderError::IndexNotReady);
            }
            Ok(candidate.placeholder_text.as_deref() == Some("B"))
        }
    }

    fn tree_with(ranges: &[ByteRange]) -> ArenaTree {
        let mut tree = ArenaTree::new("root", ByteRange::new(0, 100));
        for range in ranges {
            tree.push_child(tree.root_id(), "node", *range);
        }
        tree
    }

    fn aggregate(
        document: &FoldDocument<ArenaTree>,
        registry: FoldProviderRegistry<ArenaTree>,
    ) -> Aggregation {
        FoldAggregator::new(Arc::new(registry), Arc::new(WorkspaceFoldingSettings::default()))
            .aggregate(document, false, &CancellationToken::new())
            .unwrap()
    }

    fn ranges(aggregation: &Aggregation) -> Vec<ByteRange> {
        aggregation.infos.iter().map(|info| info.range).collect()
    }

    #[test]
    fn earlier_language_wins_partial_overlap() {
        let document = FoldDocument::new(
            "x".repeat(100),
            1,
            LanguageLayer::root("a", tree_with(&[ByteRange::new(0, 20)])),
        )
        .with_injection(LanguageLayer::injection(
            "b",
            tree_with(&[ByteRange::new(10, 30)]),
            vec![ByteRange::new(10, 30)],
        ));
        let registry = FoldProviderRegistry::new();
        registry.register("a", Arc::new(FixedProvider::new(vec![(ByteRange::new(0, 20), "{...}")])));
        registry.register("b", Arc::new(FixedProvider::new(vec![(ByteRange::new(10, 30), "{...}")])));

        let aggregation = aggregate(&document, registry);

        assert_eq!(ranges(&aggregation), vec![ByteRange::new(0, 20)]);
    }

    #[test]
    fn duplicates_merge_and_nesting_is_accepted() {
        let document = FoldDocument::new(
            "x".repeat(100),
            1,
            LanguageLayer::root("base", tree_with(&[ByteRange::new(0, 50)])),
        )
        .with_injection(LanguageLayer::injection(
            "extra",
            tree_with(&[ByteRange::new(0, 50), ByteRange::new(60, 70)]),
            vec![ByteRange::new(0, 100)],
        ));
        let registry = FoldProviderRegistry::new();
        registry.register("base", Arc::new(FixedProvider::new(vec![(ByteRange::new(0, 50), "A")])));
        registry.register(
            "extra",
            Arc::new(FixedProvider::new(vec![
                (ByteRange::new(0, 50), "A"),
                (ByteRange::new(10, 20), "inner"),
            ])),
        );

        let aggregation = aggregate(&document, registry);

        assert_eq!(
            ranges(&aggregation),
            vec![ByteRange::new(0, 50), ByteRange::new(10, 20)]
        );
        assert_eq!(aggregation.infos[0].language, "base");
        assert_eq!(aggregation.infos[1].language, "extra");
    }

    #[test]
    fn out_of_bounds_and_empty_candidates_are_dropped() {
        let document = FoldDocument::new("x".repeat(40), 1, LanguageLayer::root("a", tree_with(&[])));
        let registry = FoldProviderRegistry::new();
        registry.register(
            "a",
            Arc::new(FixedProvider::new(vec![
                (ByteRange::new(0, 10), "ok"),
                (ByteRange::new(5, 5), "empty"),
                (ByteRange::new(30, 60), "past end"),
            ])),
        );

        let aggregation = aggregate(&document, registry);

        assert_eq!(ranges(&aggregation), vec![ByteRange::new(0, 10)]);
    }

    #[test]
    fn index_not_ready_resolves_to_expanded() {
        let document = FoldDocument::new("x".repeat(100), 1, LanguageLayer::root("a", tree_with(&[])));
        let mut provider = FixedProvider::new(vec![(ByteRange::new(0, 10), "B")]);
        provider.index_ready = false;
        let registry = FoldProviderRegistry::new();
        registry.register("a", Arc::new(provider));

        let aggregation = aggregate(&document, registry);

        assert!(!aggregation.infos[0].collapsed_by_default);
    }

    #[test]
    fn infos_carry_signature_placeholder_and_dependencies() {
        let tracker = Arc::new(SimpleModificationTracker::new());
        let document = FoldDocument::new(
            "x".repeat(100),
            1,
            LanguageLayer::root("a", tree_with(&[ByteRange::new(10, 40)])),
        );
        let mut provider = FixedProvider::new(vec![(ByteRange::new(10, 40), "B")]);
        provider.dependency = Some(tracker.clone());
        let registry = FoldProviderRegistry::new();
        registry.register("a", Arc::new(provider));

        let aggregation = aggregate(&document, registry);
        let info = &aggregation.infos[0];

        assert_eq!(info.signature.as_deref(), Some("e#10,40,0"));
        assert_eq!(info.placeholder, "B");
        assert!(info.collapsed_by_default);
        assert_eq!(aggregation.dependencies.len(), 1);
        tracker.inc_modification_count();
        assert!(!aggregation.dependencies[0].is_up_to_date());
    }

    #[test]
    fn cancellation_stops_after_current_language() {
        let document = FoldDocument::new("x".repeat(100), 1, LanguageLayer::root("a", tree_with(&[])));
        let registry = FoldProviderRegistry::new();
        registry.register("a", Arc::new(FixedProvider::new(vec![(ByteRange::new(0, 10), "{...}")])));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = FoldAggregator::new(Arc::new(registry), Arc::new(WorkspaceFoldingSettings::default()))
            .aggregate(&document, false, &cancel);

        assert_eq!(result.unwrap_err(), Cancelled);
    }

    #[test]
    fn language_without_provider_is_a_cancellation_point() {
        let document = FoldDocument::new("x".repeat(100), 1, LanguageLayer::root("plain", tree_with(&[])));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = FoldAggregator::new(
            Arc::new(FoldProviderRegistry::new()),
            Arc::new(WorkspaceFoldingSettings::default()),
        )
        .aggregate(&document, false, &cancel);

        assert_eq!(result.unwrap_err(), Cancelled);
    }
}
