//! The reconciliation surface of one view.
//!
//! A [`FoldingView`] owns the live region store of a view together with its
//! reconciliation cache and request tracker. `reconcile` aggregates fold
//! candidates against an immutable document snapshot without holding any
//! lock, then plans and commits under the store's write lock. A request that
//! was superseded meanwhile, or whose snapshot is older than the store, does
//! not commit.

use std::sync::{Arc, RwLock};

use super::aggregator::FoldAggregator;
use super::cache::{DependencyStamps, RealizationKey, ReconcileRequest, ReconciliationCache};
use super::reconciler::{ApplyDefaultStateMode, CaretPosition, CommitSummary, FoldReconciler};
use super::region::{LiveFoldRegion, RegionId, RegionInfo};
use super::request_tracker::{ActiveRequest, ReconcileRequestTracker};
use super::state::FoldingState;
use super::store::{FoldRegionStore, RegionBatch, RegionStore};
use crate::config::{SettingsManager, WorkspaceFoldingSettings};
use crate::document::FoldDocument;
use crate::error::LockResultExt;
use crate::language::FoldProviderRegistry;
use crate::syntax::SyntaxTree;

/// What a reconcile call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied(CommitSummary),
    /// The store already reflects this snapshot; nothing was computed
    UpToDate,
    /// Superseded by a newer request
    Cancelled,
    /// The store follows a newer document version than the snapshot
    Stale,
}

/// Parameters of one reconcile request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub request: ReconcileRequest,
    pub mode: ApplyDefaultStateMode,
    pub keep_collapsed: bool,
    /// Caret byte offset in the snapshot, if the view has focus
    pub caret: Option<usize>,
}

impl ReconcileOptions {
    pub fn new(mode: ApplyDefaultStateMode, keep_collapsed: bool) -> Self {
        Self {
            request: ReconcileRequest::Cached,
            mode,
            keep_collapsed,
            caret: None,
        }
    }

    /// Options whose keep-collapsed flag follows the workspace settings
    pub fn from_settings(mode: ApplyDefaultStateMode, settings: &WorkspaceFoldingSettings) -> Self {
        Self::new(mode, settings.keep_collapsed_on_reparse)
    }

    pub fn quick(mut self) -> Self {
        self.request = ReconcileRequest::Quick;
        self
    }

    pub fn with_caret(mut self, offset: usize) -> Self {
        self.caret = Some(offset);
        self
    }
}

pub struct FoldingView<T: SyntaxTree, S: RegionStore = FoldRegionStore> {
    store: RwLock<S>,
    cache: ReconciliationCache,
    requests: ReconcileRequestTracker,
    registry: Arc<FoldProviderRegistry<T>>,
    settings: Arc<SettingsManager>,
}

impl<T: SyntaxTree> FoldingView<T, FoldRegionStore> {
    /// View over an empty in-memory store for a document of `document_len`
    /// bytes at `document_version`
    pub fn in_memory(
        registry: Arc<FoldProviderRegistry<T>>,
        settings: Arc<SettingsManager>,
        document_len: usize,
        document_version: u64,
    ) -> Self {
        Self::new(
            registry,
            settings,
            FoldRegionStore::new(document_len, document_version),
        )
    }
}

impl<T: SyntaxTree, S: RegionStore> FoldingView<T, S> {
    pub fn new(
        registry: Arc<FoldProviderRegistry<T>>,
        settings: Arc<SettingsManager>,
        store: S,
    ) -> Self {
        Self {
            store: RwLock::new(store),
            cache: ReconciliationCache::new(),
            requests: ReconcileRequestTracker::new(),
            registry,
            settings,
        }
    }

    /// Bring the store in line with `document` using cached infos when valid
    pub fn reconcile(
        &self,
        document: &FoldDocument<T>,
        mode: ApplyDefaultStateMode,
        keep_collapsed: bool,
    ) -> ReconcileOutcome {
        self.reconcile_with(document, ReconcileOptions::new(mode, keep_collapsed))
    }

    /// Reconcile with `keep_collapsed` taken from the current settings
    pub fn reconcile_with_settings(
        &self,
        document: &FoldDocument<T>,
        mode: ApplyDefaultStateMode,
    ) -> ReconcileOutcome {
        self.reconcile_with(document, self.default_options(mode))
    }

    pub fn default_options(&self, mode: ApplyDefaultStateMode) -> ReconcileOptions {
        ReconcileOptions::from_settings(mode, &self.settings.load_settings())
    }

    pub fn reconcile_with(
        &self,
        document: &FoldDocument<T>,
        options: ReconcileOptions,
    ) -> ReconcileOutcome {
        let request = self.requests.start_request();
        let outcome = self.run_request(document, options, &request);
        self.requests.finish_request(request.id);
        log::debug!(
            target: "orikomi::reconciler",
            "Request {} for version {}: {:?}",
            request.id,
            document.version(),
            outcome
        );
        outcome
    }

    fn run_request(
        &self,
        document: &FoldDocument<T>,
        options: ReconcileOptions,
        request: &ActiveRequest,
    ) -> ReconcileOutcome {
        let settings_count = self.settings.modification_count();
        let caret_line = options
            .caret
            .map(|offset| document.line_map().line_of(offset));
        let realization = |store_modification_count| RealizationKey {
            store_modification_count,
            mode: options.mode,
            keep_collapsed: options.keep_collapsed,
            caret_line,
        };

        let infos = match options.request {
            ReconcileRequest::Cached => {
                {
                    let store = self.store.read().recover_poison("view::reconcile(read)");
                    if store.document_version() == document.version()
                        && self.cache.is_realized(
                            document.version(),
                            settings_count,
                            &realization(store.modification_count()),
                        )
                    {
                        return ReconcileOutcome::UpToDate;
                    }
                }
                match self.cache.infos(document.version(), settings_count) {
                    Some(infos) => infos,
                    None => match self.aggregate(document, false, request) {
                        Some((infos, stamps)) => {
                            self.cache.store(Arc::clone(&infos), stamps);
                            infos
                        }
                        None => return ReconcileOutcome::Cancelled,
                    },
                }
            }
            ReconcileRequest::Quick => match self.aggregate(document, true, request) {
                Some((infos, _)) => infos,
                None => return ReconcileOutcome::Cancelled,
            },
        };

        let mut store = self.store.write().recover_poison("view::reconcile(write)");
        if !self.requests.is_active(request.id) {
            return ReconcileOutcome::Cancelled;
        }

        let store_version = store.document_version();
        if store_version > document.version() {
            log::debug!(
                target: "orikomi::reconciler",
                "Discarding snapshot version {}: store is at version {}",
                document.version(),
                store_version
            );
            return ReconcileOutcome::Stale;
        }
        if store_version < document.version() {
            log::error!(
                target: "orikomi::reconciler",
                "Store at version {} lags behind snapshot version {}; committing best-effort",
                store_version,
                document.version()
            );
        } else if store.document_len() != document.len() {
            log::error!(
                target: "orikomi::reconciler",
                "Store length {} differs from snapshot length {} at version {}",
                store.document_len(),
                document.len(),
                store_version
            );
        }

        let caret = options
            .caret
            .map(|offset| CaretPosition::new(offset, document.line_map()));
        let plan = FoldReconciler::compute_plan(
            &*store,
            &infos,
            options.mode,
            options.keep_collapsed,
            caret,
            store.document_len(),
        );
        let summary = FoldReconciler::commit(&mut *store, &plan);

        if options.request == ReconcileRequest::Cached {
            self.cache
                .mark_realized(&infos, realization(store.modification_count()));
        }
        ReconcileOutcome::Applied(summary)
    }

    fn aggregate(
        &self,
        document: &FoldDocument<T>,
        quick: bool,
        request: &ActiveRequest,
    ) -> Option<(Arc<Vec<RegionInfo>>, DependencyStamps)> {
        let settings_count = self.settings.modification_count();
        let aggregator = FoldAggregator::new(Arc::clone(&self.registry), self.settings.load_settings());
        let aggregation = aggregator.aggregate(document, quick, &request.token).ok()?;

        let stamps = DependencyStamps::new(document.version(), settings_count, aggregation.dependencies);
        Some((Arc::new(aggregation.infos), stamps))
    }

    /// User toggle; grouped regions follow together
    pub fn set_expanded(&self, id: RegionId, expanded: bool) -> bool {
        let mut store = self.store.write().recover_poison("view::set_expanded");
        let Some(region) = store.all_regions().into_iter().find(|region| region.id == id) else {
            return false;
        };
        if expanded && region.non_expandable {
            return false;
        }
        let targets: Vec<RegionId> = match region.group {
            Some(group) => store
                .grouped_regions(group)
                .iter()
                .map(|member| member.id)
                .collect(),
            None => vec![id],
        };
        store.run_atomic(&mut |batch: &mut dyn RegionBatch| {
            for target in &targets {
                batch.set_expanded(*target, expanded);
            }
        });
        true
    }

    /// Snapshot of the live regions
    pub fn regions(&self) -> Vec<LiveFoldRegion> {
        self.store
            .read()
            .recover_poison("view::regions")
            .all_regions()
    }

    /// Read access to the store
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.store.read().recover_poison("view::with_store"))
    }

    /// Write access to the store, e.g. to follow document edits
    pub fn with_store_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.store.write().recover_poison("view::with_store_mut"))
    }

    /// Expand states of the live regions, keyed by their latest signatures
    pub fn capture_state(&self, document: &FoldDocument<T>) -> FoldingState {
        let infos = self
            .cache
            .infos(document.version(), self.settings.modification_count())
            .unwrap_or_default();
        FoldingState::capture(&self.regions(), &infos)
    }

    /// Apply a captured state to the live regions; returns how many changed
    pub fn restore_state(&self, state: &FoldingState, document: &FoldDocument<T>) -> usize {
        let mut store = self.store.write().recover_poison("view::restore_state");
        state.restore(&mut *store, document)
    }

    /// Drop cached results and cancel the in-flight request
    pub fn dispose(&self) {
        self.requests.cancel_all();
        self.cache.invalidate();
    }
}
