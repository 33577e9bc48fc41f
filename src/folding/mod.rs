//! Fold-region aggregation and reconciliation.
//!
//! Data flows leaves first: providers propose [`FoldCandidate`]s, the
//! [`FoldAggregator`] merges them into conflict-free [`RegionInfo`]s, the
//! [`FoldReconciler`] diffs those against a [`RegionStore`] and commits a
//! minimal plan. [`FoldingView`] wraps the pipeline with caching and request
//! supersession.

pub mod aggregator;
pub mod cache;
pub mod candidate;
pub mod dependency;
pub mod reconciler;
pub mod region;
pub mod request_tracker;
pub mod signature;
pub mod state;
pub mod store;
pub mod view;

pub use aggregator::{Aggregation, Cancelled, FoldAggregator};
pub use cache::{DependencyStamps, RealizationKey, ReconcileRequest, ReconciliationCache};
pub use candidate::FoldCandidate;
pub use dependency::{ModificationTracker, SimpleModificationTracker, TrackedDependency};
pub use reconciler::{
    ApplyDefaultStateMode, CaretPosition, CommitSummary, FoldReconciler, MutationPlan,
    PlannedRegion,
};
pub use region::{FoldingGroup, LiveFoldRegion, NewRegion, RegionId, RegionInfo};
pub use request_tracker::{ActiveRequest, ReconcileRequestTracker};
pub use signature::{
    ParsedSignature, SignatureCodec, SignatureError, decode_signature, encode_signature,
    parse_signature,
};
pub use state::{FoldingState, FoldingStateStore};
pub use store::{FoldRegionStore, RegionBatch, RegionStore, TextEdit};
pub use view::{FoldingView, ReconcileOptions, ReconcileOutcome};
