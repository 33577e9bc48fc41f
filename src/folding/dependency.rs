//! Modification stamps used to invalidate cached fold computations.
//!
//! Any input a fold candidate depends on (settings, an outline index, a
//! project model) exposes a monotonically increasing counter. A cached result
//! stays valid exactly as long as every counter it recorded is unchanged.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of a monotonically increasing modification count
pub trait ModificationTracker: Send + Sync + fmt::Debug {
    fn modification_count(&self) -> u64;
}

/// Counter bumped explicitly by its owner on every change
#[derive(Debug, Default)]
pub struct SimpleModificationTracker {
    count: AtomicU64,
}

impl SimpleModificationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a modification and return the new count
    pub fn inc_modification_count(&self) -> u64 {
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl ModificationTracker for SimpleModificationTracker {
    fn modification_count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }
}

/// A tracker together with the count observed when a result was computed
#[derive(Debug, Clone)]
pub struct TrackedDependency {
    tracker: Arc<dyn ModificationTracker>,
    observed: u64,
}

impl TrackedDependency {
    /// Capture the tracker's current count
    pub fn observe(tracker: Arc<dyn ModificationTracker>) -> Self {
        let observed = tracker.modification_count();
        Self { tracker, observed }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.tracker.modification_count() == self.observed
    }
}

/// Observe a set of trackers, skipping repeated references to the same tracker.
pub fn observe_all<'a>(
    trackers: impl IntoIterator<Item = &'a Arc<dyn ModificationTracker>>,
) -> Vec<TrackedDependency> {
    let mut observed: Vec<TrackedDependency> = Vec::new();
    for tracker in trackers {
        if observed
            .iter()
            .any(|dependency| Arc::ptr_eq(&dependency.tracker, tracker))
        {
            continue;
        }
        observed.push(TrackedDependency::observe(Arc::clone(tracker)));
    }
    observed
}
