//! Request tracking for reconciliation to support cancellation.
//!
//! A new reconcile request for a view supersedes any in-flight one: the older
//! request's [`CancellationToken`] is cancelled and its id stops being active.
//! The aggregator checks the token between languages and the view checks
//! `is_active()` again under the store lock, so a superseded request never
//! commits after a newer one.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

use crate::error::LockResultExt;

/// Monotonically increasing request ID for tracking
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// Handle returned to the caller that started a request
#[derive(Debug, Clone)]
pub struct ActiveRequest {
    pub id: u64,
    pub token: CancellationToken,
}

/// Tracks the most recent reconcile request of one view
#[derive(Debug, Default)]
pub struct ReconcileRequestTracker {
    active: Mutex<Option<ActiveRequest>>,
}

impl ReconcileRequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a new request, cancelling the previous one.
    pub fn start_request(&self) -> ActiveRequest {
        let request = ActiveRequest {
            id: next_request_id(),
            token: CancellationToken::new(),
        };
        let previous = self
            .active
            .lock()
            .recover_poison("request_tracker::start_request")
            .replace(request.clone());
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        request
    }

    /// Checks if a request is still the newest one and was not cancelled.
    pub fn is_active(&self, request_id: u64) -> bool {
        self.active
            .lock()
            .recover_poison("request_tracker::is_active")
            .as_ref()
            .is_some_and(|active| active.id == request_id && !active.token.is_cancelled())
    }

    /// Stops tracking a request if it is still the active one.
    pub fn finish_request(&self, request_id: u64) {
        let mut active = self
            .active
            .lock()
            .recover_poison("request_tracker::finish_request");
        if active.as_ref().is_some_and(|request| request.id == request_id) {
            *active = None;
        }
    }

    /// Cancels the in-flight request, if any. Used when a view is disposed.
    pub fn cancel_all(&self) {
        let previous = self
            .active
            .lock()
            .recover_poison("request_tracker::cancel_all")
            .take();
        if let Some(previous) = previous {
            previous.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_tracking_basic() {
        let tracker = ReconcileRequestTracker::new();

        let request = tracker.start_request();
        assert!(tracker.is_active(request.id), "Request should be active");

        tracker.finish_request(request.id);
        assert!(!tracker.is_active(request.id), "Request should be finished");
    }

    #[test]
    fn newer_request_supersedes_and_cancels() {
        let tracker = ReconcileRequestTracker::new();

        let first = tracker.start_request();
        let second = tracker.start_request();

        assert!(second.id > first.id);
        assert!(first.token.is_cancelled(), "First token should be cancelled");
        assert!(!tracker.is_active(first.id), "First request should be superseded");
        assert!(tracker.is_active(second.id), "Second request should be active");
    }

    #[test]
    fn finishing_a_superseded_request_keeps_the_newer_one() {
        let tracker = ReconcileRequestTracker::new();

        let first = tracker.start_request();
        let second = tracker.start_request();
        tracker.finish_request(first.id);

        assert!(tracker.is_active(second.id));
    }

    #[test]
    fn cancel_all_cancels_in_flight_request() {
        let tracker = ReconcileRequestTracker::new();

        let request = tracker.start_request();
        tracker.cancel_all();

        assert!(request.token.is_cancelled());
        assert!(!tracker.is_active(request.id), "Request should be cancelled");
    }
}
