//! Memoization of aggregated region infos.
//!
//! Aggregation is the expensive half of reconciliation. Its result only
//! depends on the document snapshot, the folding settings and whatever
//! external state the providers declared as dependencies, so it is cached
//! under [`DependencyStamps`] and reused until one of them moves.
//!
//! The cache additionally remembers the last realization (store state, mode,
//! keep-collapsed flag and caret line it was committed with). A request that
//! matches both the stamps and the realization is already reflected by the
//! store and needs no work at all.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

use super::dependency::TrackedDependency;
use super::reconciler::ApplyDefaultStateMode;
use super::region::RegionInfo;

/// How a reconcile request may use cached infos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReconcileRequest {
    /// Bypass the cache; providers run in quick mode
    Quick,
    /// Reuse cached infos while their stamps are valid
    #[default]
    Cached,
}

/// Inputs a cached info list was computed from
#[derive(Debug, Clone)]
pub struct DependencyStamps {
    document_version: u64,
    settings_modification_count: u64,
    dependencies: Vec<TrackedDependency>,
}

impl DependencyStamps {
    pub fn new(
        document_version: u64,
        settings_modification_count: u64,
        dependencies: Vec<TrackedDependency>,
    ) -> Self {
        Self {
            document_version,
            settings_modification_count,
            dependencies,
        }
    }

    pub fn is_valid(&self, document_version: u64, settings_modification_count: u64) -> bool {
        self.document_version == document_version
            && self.settings_modification_count == settings_modification_count
            && self.dependencies.iter().all(TrackedDependency::is_up_to_date)
    }
}

/// Conditions a committed plan was realized under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RealizationKey {
    pub store_modification_count: u64,
    pub mode: ApplyDefaultStateMode,
    pub keep_collapsed: bool,
    pub caret_line: Option<u32>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    infos: Arc<Vec<RegionInfo>>,
    stamps: DependencyStamps,
    realized: Option<RealizationKey>,
}

/// Single-entry cache owned by a view; the entry is replaced wholesale.
#[derive(Debug, Default)]
pub struct ReconciliationCache {
    entry: ArcSwapOption<CacheEntry>,
}

impl ReconciliationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached infos, if still valid for the given inputs
    pub fn infos(
        &self,
        document_version: u64,
        settings_modification_count: u64,
    ) -> Option<Arc<Vec<RegionInfo>>> {
        let entry = self.entry.load();
        match entry.as_ref() {
            Some(entry) if entry.stamps.is_valid(document_version, settings_modification_count) => {
                log::trace!(
                    target: "orikomi::cache",
                    "Cache hit for document version {}",
                    document_version
                );
                Some(Arc::clone(&entry.infos))
            }
            Some(_) => {
                log::debug!(
                    target: "orikomi::cache",
                    "Cache entry outdated for document version {}",
                    document_version
                );
                None
            }
            None => None,
        }
    }

    /// The store already reflects the cached infos under `key`
    pub fn is_realized(
        &self,
        document_version: u64,
        settings_modification_count: u64,
        key: &RealizationKey,
    ) -> bool {
        self.entry.load().as_ref().is_some_and(|entry| {
            entry.realized.as_ref() == Some(key)
                && entry.stamps.is_valid(document_version, settings_modification_count)
        })
    }

    /// Replace the entry with freshly aggregated infos
    pub fn store(&self, infos: Arc<Vec<RegionInfo>>, stamps: DependencyStamps) {
        self.entry.store(Some(Arc::new(CacheEntry {
            infos,
            stamps,
            realized: None,
        })));
    }

    /// Record that the cached infos were committed under `key`.
    ///
    /// Ignored if the entry no longer holds `infos`.
    pub fn mark_realized(&self, infos: &Arc<Vec<RegionInfo>>, key: RealizationKey) {
        let current = self.entry.load_full();
        let Some(current) = current else {
            return;
        };
        if !Arc::ptr_eq(&current.infos, infos) {
            return;
        }
        let mut updated = CacheEntry::clone(&current);
        updated.realized = Some(key);
        self.entry.store(Some(Arc::new(updated)));
    }

    /// Forget the realization, e.g. after the store was changed externally
    pub fn forget_realization(&self) {
        if let Some(current) = self.entry.load_full()
            && current.realized.is_some()
        {
            let mut updated = CacheEntry::clone(&current);
            updated.realized = None;
            self.entry.store(Some(Arc::new(updated)));
        }
    }

    pub fn invalidate(&self) {
        self.entry.store(None);
    }
}
