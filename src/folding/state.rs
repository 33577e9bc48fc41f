//! Expand/collapse state that outlives region objects.
//!
//! A [`FoldingState`] maps region signatures to their expand flag. Because
//! signatures relocate nodes structurally, a state captured from one view can
//! be restored into a fresh view of the same content, e.g. when a document is
//! reopened.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use url::Url;

use super::region::{LiveFoldRegion, RegionId, RegionInfo};
use super::signature::{SignatureCodec, parse_signature};
use super::store::{RegionBatch, RegionStore};
use crate::document::FoldDocument;
use crate::syntax::{ByteRange, SyntaxTree};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FoldingState {
    entries: BTreeMap<String, bool>,
}

impl FoldingState {
    /// Snapshot the expand flags of `regions`.
    ///
    /// Kept regions may carry a signature computed for an older document
    /// version, so signatures from `infos` (the latest aggregation) win for
    /// matching ranges. Regions without any signature are skipped.
    pub fn capture(regions: &[LiveFoldRegion], infos: &[RegionInfo]) -> Self {
        let fresh: HashMap<ByteRange, &str> = infos
            .iter()
            .filter_map(|info| Some((info.range, info.signature.as_deref()?)))
            .collect();

        let entries = regions
            .iter()
            .filter_map(|region| {
                let signature = fresh
                    .get(&region.range)
                    .copied()
                    .or(region.signature.as_deref())?;
                Some((signature.to_string(), region.expanded))
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn expanded(&self, signature: &str) -> Option<bool> {
        self.entries.get(signature).copied()
    }

    pub fn insert(&mut self, signature: impl Into<String>, expanded: bool) {
        self.entries.insert(signature.into(), expanded);
    }

    /// Apply the recorded flags to the regions of `store`.
    ///
    /// Both the recorded signatures and the live regions' signatures are
    /// decoded against `document`; a flag is applied where they resolve to
    /// the same node. Returns the number of regions updated.
    pub fn restore<T: SyntaxTree, S: RegionStore + ?Sized>(
        &self,
        store: &mut S,
        document: &FoldDocument<T>,
    ) -> usize {
        if self.entries.is_empty() {
            return 0;
        }
        let codec = SignatureCodec::all_strategies();

        let mut live: HashMap<(usize, ByteRange, &str), RegionId> = HashMap::new();
        for region in store.all_regions() {
            let Some(signature) = region.signature.as_deref() else {
                continue;
            };
            if let Some(key) = Self::node_key(&codec, document, signature) {
                live.insert(key, region.id);
            }
        }

        let updates: Vec<(RegionId, bool)> = self
            .entries
            .iter()
            .filter_map(|(signature, expanded)| {
                let key = Self::node_key(&codec, document, signature)?;
                live.get(&key).map(|id| (*id, *expanded))
            })
            .collect();

        let mut restored = 0;
        store.run_atomic(&mut |batch: &mut dyn RegionBatch| {
            for (id, expanded) in &updates {
                if batch.set_expanded(*id, *expanded) {
                    restored += 1;
                }
            }
        });
        log::debug!(
            target: "orikomi::signature",
            "Restored {} of {} recorded fold states",
            restored,
            self.entries.len()
        );
        restored
    }

    /// Layer index, range and kind of the node a signature resolves to.
    ///
    /// Layers are searched like [`SignatureCodec::decode_in_document`]: the
    /// base layer, then injected layers covering the signature's start.
    fn node_key<'a, T: SyntaxTree>(
        codec: &SignatureCodec,
        document: &'a FoldDocument<T>,
        signature: &str,
    ) -> Option<(usize, ByteRange, &'a str)> {
        let start = parse_signature(signature).ok()?.range().start;
        document
            .layers()
            .iter()
            .enumerate()
            .filter(|(index, layer)| *index == 0 || layer.contains_offset(start))
            .find_map(|(index, layer)| {
                let node = codec.decode(&layer.tree, signature, None)?;
                Some((index, layer.tree.text_range(node), layer.tree.kind(node)))
            })
    }
}

/// Folding states of closed documents, keyed by URI
#[derive(Debug, Default)]
pub struct FoldingStateStore {
    states: DashMap<Url, FoldingState>,
}

impl FoldingStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, uri: &Url, state: FoldingState) {
        if state.is_empty() {
            self.states.remove(uri);
        } else {
            self.states.insert(uri.clone(), state);
        }
    }

    pub fn load(&self, uri: &Url) -> Option<FoldingState> {
        self.states.get(uri).map(|state| state.clone())
    }

    /// Take the state for a document being reopened
    pub fn take(&self, uri: &Url) -> Option<FoldingState> {
        self.states.remove(uri).map(|(_, state)| state)
    }

    pub fn remove(&self, uri: &Url) {
        self.states.remove(uri);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
