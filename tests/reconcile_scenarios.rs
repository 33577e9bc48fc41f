//! Reconciliation scenarios over hand-built trees, exercised through the
//! public API.

use std::sync::Arc;

use orikomi::config::{FoldingSettings, LanguageFoldingConfig, SettingsManager, WorkspaceFoldingSettings};
use orikomi::document::{FoldDocument, LanguageLayer};
use orikomi::folding::{
    ApplyDefaultStateMode, FoldAggregator, FoldCandidate, FoldingGroup, FoldingView,
    ReconcileOptions, ReconcileOutcome, RegionStore,
};
use orikomi::language::{
    FoldProviderRegistry, KindFoldProvider, LanguageFoldProvider, ProviderError,
};
use orikomi::syntax::{ArenaTree, ByteRange, NodeId, SyntaxTree, deepest_node_with_range};
use tokio_util::sync::CancellationToken;

/// Proposes fixed spans; spans with placeholder "B" start collapsed
struct SpanProvider {
    spans: Vec<(ByteRange, &'static str)>,
    group: Option<FoldingGroup>,
}

impl SpanProvider {
    fn new(spans: Vec<(ByteRange, &'static str)>) -> Self {
        Self { spans, group: None }
    }
}

impl LanguageFoldProvider<ArenaTree> for SpanProvider {
    fn build_candidates<'t>(
        &self,
        tree: &'t ArenaTree,
        root: NodeId,
        _text: &str,
        _quick: bool,
    ) -> Vec<FoldCandidate<NodeId>> {
        self.spans
            .iter()
            .map(|(range, placeholder)| {
                let owner = deepest_node_with_range(tree, *range).unwrap_or(root);
                let candidate = FoldCandidate::new(owner, *range).with_placeholder(*placeholder);
                match self.group {
                    Some(group) => candidate.in_group(group),
                    None => candidate,
                }
            })
            .collect()
    }

    fn collapsed_by_default<'t>(
        &self,
        _tree: &'t ArenaTree,
        candidate: &FoldCandidate<NodeId>,
    ) -> Result<bool, ProviderError> {
        Ok(candidate.placeholder_text.as_deref() == Some("B"))
    }
}

fn tree_with(len: usize, ranges: &[ByteRange]) -> ArenaTree {
    let mut tree = ArenaTree::new("root", ByteRange::new(0, len));
    for range in ranges {
        tree.push_child(tree.root_id(), "node", *range);
    }
    tree
}

fn base_extra_document(version: u64) -> FoldDocument<ArenaTree> {
    FoldDocument::new(
        "x".repeat(100),
        version,
        LanguageLayer::root(
            "base",
            tree_with(100, &[ByteRange::new(0, 50), ByteRange::new(60, 90)]),
        ),
    )
    .with_injection(LanguageLayer::injection(
        "extra",
        tree_with(100, &[ByteRange::new(0, 50), ByteRange::new(55, 65)]),
        vec![ByteRange::new(0, 100)],
    ))
}

fn base_extra_registry() -> Arc<FoldProviderRegistry<ArenaTree>> {
    let registry = FoldProviderRegistry::new();
    registry.register(
        "base",
        Arc::new(SpanProvider::new(vec![
            (ByteRange::new(0, 50), "A"),
            (ByteRange::new(60, 90), "B"),
        ])),
    );
    registry.register(
        "extra",
        Arc::new(SpanProvider::new(vec![
            (ByteRange::new(0, 50), "A"),
            (ByteRange::new(55, 65), "C"),
        ])),
    );
    Arc::new(registry)
}

#[test]
fn aggregation_merges_duplicates_and_rejects_cross_language_overlap() {
    let aggregator = FoldAggregator::new(
        base_extra_registry(),
        Arc::new(WorkspaceFoldingSettings::default()),
    );

    let aggregation = aggregator
        .aggregate(&base_extra_document(1), false, &CancellationToken::new())
        .expect("not cancelled");

    let proposed: Vec<(ByteRange, &str)> = aggregation
        .infos
        .iter()
        .map(|info| (info.range, info.placeholder.as_str()))
        .collect();
    assert_eq!(
        proposed,
        vec![(ByteRange::new(0, 50), "A"), (ByteRange::new(60, 90), "B")]
    );
}

#[test]
fn end_to_end_first_pass_then_incremental_pass() {
    let view = FoldingView::in_memory(
        base_extra_registry(),
        Arc::new(SettingsManager::default()),
        100,
        1,
    );
    let document = base_extra_document(1);

    let first = view.reconcile(&document, ApplyDefaultStateMode::Always, true);
    let ReconcileOutcome::Applied(summary) = first else {
        panic!("expected Applied, got {first:?}");
    };
    assert_eq!(summary.added, 2);
    let regions = view.regions();
    assert_eq!(
        regions
            .iter()
            .map(|region| (region.range, region.expanded))
            .collect::<Vec<_>>(),
        vec![(ByteRange::new(0, 50), true), (ByteRange::new(60, 90), false)]
    );

    // User collapses A and expands B
    assert!(view.set_expanded(regions[0].id, false));
    assert!(view.set_expanded(regions[1].id, true));
    let toggled = view.regions();

    let second = view.reconcile(&document, ApplyDefaultStateMode::Never, true);
    let ReconcileOutcome::Applied(summary) = second else {
        panic!("expected Applied, got {second:?}");
    };
    assert_eq!((summary.removed, summary.added, summary.kept), (0, 0, 2));
    assert_eq!(view.regions(), toggled);
}

#[test]
fn repeated_never_passes_are_idempotent() {
    let view = FoldingView::in_memory(
        base_extra_registry(),
        Arc::new(SettingsManager::default()),
        100,
        1,
    );
    let document = base_extra_document(1);
    let options = ReconcileOptions::new(ApplyDefaultStateMode::Never, false);

    view.reconcile_with(&document, options);
    let first = view.regions();
    let outcome = view.reconcile_with(&document, options);

    assert_eq!(outcome, ReconcileOutcome::UpToDate);
    assert_eq!(view.regions(), first);
}

#[test]
fn partially_matched_group_is_replaced_as_a_whole() {
    let group = FoldingGroup::new();
    let document = FoldDocument::new(
        "x".repeat(40),
        1,
        LanguageLayer::root("base", tree_with(40, &[])),
    );
    let registry = FoldProviderRegistry::new();
    registry.register(
        "base",
        Arc::new(SpanProvider {
            spans: vec![(ByteRange::new(0, 5), "{...}"), (ByteRange::new(20, 25), "{...}")],
            group: Some(group),
        }),
    );
    let registry = Arc::new(registry);
    let settings = Arc::new(SettingsManager::default());
    let view = FoldingView::in_memory(Arc::clone(&registry), Arc::clone(&settings), 40, 1);
    view.reconcile(&document, ApplyDefaultStateMode::Always, false);
    let before = view.regions();
    assert_eq!(before.len(), 2);

    // The provider now proposes only the first member
    registry.register(
        "base",
        Arc::new(SpanProvider {
            spans: vec![(ByteRange::new(0, 5), "{...}")],
            group: Some(group),
        }),
    );
    settings.apply_settings(WorkspaceFoldingSettings::default());
    view.reconcile(&document, ApplyDefaultStateMode::Never, false);

    let after = view.regions();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].range, ByteRange::new(0, 5));
    assert!(
        before.iter().all(|old| old.id != after[0].id),
        "the surviving member must not be kept alone"
    );
}

#[test]
fn superseded_snapshot_does_not_commit_after_edit() {
    let view = FoldingView::in_memory(
        base_extra_registry(),
        Arc::new(SettingsManager::default()),
        100,
        1,
    );
    view.reconcile(&base_extra_document(1), ApplyDefaultStateMode::Always, true);

    view.with_store_mut(|store| {
        let text = "x".repeat(100);
        let mut edited = text.clone();
        edited.insert_str(52, "yy");
        store.apply_text_change(&text, &edited, 2);
    });

    let outcome = view.reconcile(&base_extra_document(1), ApplyDefaultStateMode::Never, true);

    assert_eq!(outcome, ReconcileOutcome::Stale);
    let shifted: Vec<ByteRange> = view.regions().iter().map(|region| region.range).collect();
    assert_eq!(shifted, vec![ByteRange::new(0, 50), ByteRange::new(62, 92)]);
    assert_eq!(view.with_store(|store| store.document_version()), 2);
}

#[test]
fn tree_accessor_reports_node_spans() {
    let tree = tree_with(100, &[ByteRange::new(0, 50)]);
    let node = deepest_node_with_range(&tree, ByteRange::new(0, 50)).expect("node");
    assert_eq!(tree.kind(node), "node");
    assert_eq!(tree.parent(node), Some(tree.root()));
}

#[test]
fn kind_provider_regions_carry_kind_signatures() {
    let mut tree = ArenaTree::new("source_file", ByteRange::new(0, 60));
    let block = tree.push_child(tree.root_id(), "block", ByteRange::new(10, 50));
    tree.push_child(block, "comment", ByteRange::new(20, 30));
    let text = format!("{}\n{}", "x".repeat(30), "x".repeat(29));
    let document = FoldDocument::new(text.clone(), 1, LanguageLayer::root("cfg", tree.clone()));

    let registry = FoldProviderRegistry::new();
    registry.register(
        "cfg",
        Arc::new(
            KindFoldProvider::new()
                .fold_kind("block", Some("{...}"))
                .fold_kind("comment", Some("/*...*/"))
                .collapse_kind("comment"),
        ),
    );
    let settings = FoldingSettings {
        languages: [(
            "cfg".to_string(),
            LanguageFoldingConfig {
                signature_kinds: Some(vec!["block".to_string()]),
                ..Default::default()
            },
        )]
        .into_iter()
        .collect(),
        ..Default::default()
    };
    let manager = SettingsManager::new(WorkspaceFoldingSettings::from(settings));
    let view = FoldingView::in_memory(Arc::new(registry), Arc::new(manager), 60, 1);

    view.reconcile(&document, ApplyDefaultStateMode::Always, true);

    let regions = view.regions();
    let described: Vec<(Option<&str>, bool)> = regions
        .iter()
        .map(|region| (region.signature.as_deref(), region.expanded))
        .collect();
    assert_eq!(
        described,
        vec![(Some("k#block#10,50"), true), (Some("e#20,30,0"), false)]
    );

    // A re-parse that wraps the block keeps its kind signature resolvable
    let mut wrapped = tree;
    wrapped.wrap(block, "statement");
    let reparsed = FoldDocument::new(text, 2, LanguageLayer::root("cfg", wrapped));
    let state = view.capture_state(&document);
    let fresh = FoldingView::in_memory(
        Arc::new({
            let registry = FoldProviderRegistry::new();
            registry.register(
                "cfg",
                Arc::new(KindFoldProvider::new().fold_kind("block", Some("{...}"))),
            );
            registry
        }),
        Arc::new(SettingsManager::default()),
        60,
        2,
    );
    fresh.reconcile(&reparsed, ApplyDefaultStateMode::Always, true);
    assert_eq!(fresh.restore_state(&state, &reparsed), 1);
}
