//! Live settings shared between views.
//!
//! `SettingsManager` holds the resolved [`WorkspaceFoldingSettings`] behind an
//! `ArcSwap` so readers never block, and bumps a modification counter on every
//! change. The counter is registered as a cache dependency, which makes a
//! settings change invalidate every cached fold computation.

use arc_swap::ArcSwap;
use std::sync::Arc;

use super::settings::{FoldingSettings, WorkspaceFoldingSettings};
use crate::folding::dependency::{ModificationTracker, SimpleModificationTracker};

pub struct SettingsManager {
    settings: ArcSwap<WorkspaceFoldingSettings>,
    tracker: Arc<SimpleModificationTracker>,
}

impl std::fmt::Debug for SettingsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsManager")
            .field("settings", &"ArcSwap<WorkspaceFoldingSettings>")
            .field("modification_count", &self.tracker.modification_count())
            .finish()
    }
}

impl Default for SettingsManager {
    fn default() -> Self {
        Self::new(WorkspaceFoldingSettings::default())
    }
}

impl SettingsManager {
    pub fn new(settings: WorkspaceFoldingSettings) -> Self {
        Self {
            settings: ArcSwap::new(Arc::new(settings)),
            tracker: Arc::new(SimpleModificationTracker::new()),
        }
    }

    /// Load the current settings.
    ///
    /// Returns an Arc containing the settings for efficient sharing.
    pub fn load_settings(&self) -> Arc<WorkspaceFoldingSettings> {
        self.settings.load_full()
    }

    /// Replace the settings and record a modification
    pub fn apply_settings(&self, settings: WorkspaceFoldingSettings) {
        self.settings.store(Arc::new(settings));
        let count = self.tracker.inc_modification_count();
        log::debug!(
            target: "orikomi::cache",
            "Folding settings replaced (modification {})",
            count
        );
    }

    /// Resolve raw settings layers and apply the result
    pub fn apply_layers(&self, layers: &[Option<FoldingSettings>]) {
        let merged = super::merge_all(layers).unwrap_or_default();
        self.apply_settings(WorkspaceFoldingSettings::from(merged));
    }

    pub fn modification_count(&self) -> u64 {
        self.tracker.modification_count()
    }

    /// Tracker to register as a dependency of computations reading these settings
    pub fn tracker(&self) -> Arc<dyn ModificationTracker> {
        self.tracker.clone()
    }
}
