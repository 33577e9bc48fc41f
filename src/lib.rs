//! Incremental fold-region reconciliation.
//!
//! Fold providers propose collapsible regions per language, the aggregator
//! merges them into a conflict-free set, and the reconciler diffs that set
//! against the regions already live in a view, keeping expand/collapse state
//! across re-parses.

pub mod config;
pub mod document;
pub mod error;
pub mod folding;
pub mod language;
pub mod syntax;

pub use config::{FoldingSettings, SettingsManager, WorkspaceFoldingSettings};
pub use document::{FoldDocument, LanguageLayer, LineMap};
pub use error::{FoldingError, FoldingResult};
pub use folding::{
    ApplyDefaultStateMode, FoldAggregator, FoldCandidate, FoldReconciler, FoldRegionStore,
    FoldingGroup, FoldingState, FoldingStateStore, FoldingView, ReconcileOptions,
    ReconcileOutcome, RegionInfo, RegionStore, SignatureCodec,
};
pub use language::{FoldProviderRegistry, LanguageFoldProvider, ProviderError};
pub use syntax::{ArenaTree, ByteRange, SyntaxTree};
