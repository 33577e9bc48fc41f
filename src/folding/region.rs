//! Region value types shared by the aggregator, the reconciler and stores.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::syntax::ByteRange;

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity token shared by regions that expand and collapse together.
///
/// Two groups are equal only if they were minted by the same `new()` call.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FoldingGroup(u64);

impl FoldingGroup {
    pub fn new() -> Self {
        Self(NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for FoldingGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FoldingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FoldingGroup#{}", self.0)
    }
}

/// Handle of a region materialized in a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(u64);

impl RegionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// A fold candidate resolved for one reconciliation pass.
///
/// Owns everything it needs; the syntax node it was built from is not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInfo {
    pub range: ByteRange,
    pub placeholder: String,
    pub group: Option<FoldingGroup>,
    pub non_expandable: bool,
    pub can_be_removed_when_collapsed: bool,
    pub language: String,
    /// `None` when no strategy could encode the owner node
    pub signature: Option<String>,
    pub collapsed_by_default: bool,
}

impl RegionInfo {
    /// Region info without language or signature, for hand-built candidate lists
    pub fn new(range: ByteRange, placeholder: impl Into<String>) -> Self {
        Self {
            range,
            placeholder: placeholder.into(),
            group: None,
            non_expandable: false,
            can_be_removed_when_collapsed: false,
            language: String::new(),
            signature: None,
            collapsed_by_default: false,
        }
    }

    pub fn with_group(mut self, group: FoldingGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn collapsed_by_default(mut self, collapsed: bool) -> Self {
        self.collapsed_by_default = collapsed;
        self
    }

    pub fn non_expandable(mut self) -> Self {
        self.non_expandable = true;
        self
    }
}

/// Snapshot of a region held by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveFoldRegion {
    pub id: RegionId,
    pub range: ByteRange,
    pub placeholder: String,
    pub group: Option<FoldingGroup>,
    pub expanded: bool,
    pub signature: Option<String>,
    /// Default-state assumption the region was created with
    pub collapsed_by_default: Option<bool>,
    pub can_be_removed_when_collapsed: bool,
    pub non_expandable: bool,
}

/// Everything a store needs to create a region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegion {
    pub range: ByteRange,
    pub placeholder: String,
    pub group: Option<FoldingGroup>,
    pub non_expandable: bool,
    pub signature: Option<String>,
    pub collapsed_by_default: Option<bool>,
    pub can_be_removed_when_collapsed: bool,
}

impl From<&RegionInfo> for NewRegion {
    fn from(info: &RegionInfo) -> Self {
        Self {
            range: info.range,
            placeholder: info.placeholder.clone(),
            group: info.group,
            non_expandable: info.non_expandable,
            signature: info.signature.clone(),
            collapsed_by_default: Some(info.collapsed_by_default),
            can_be_removed_when_collapsed: info.can_be_removed_when_collapsed,
        }
    }
}

impl NewRegion {
    pub fn new(range: ByteRange, placeholder: impl Into<String>) -> Self {
        Self {
            range,
            placeholder: placeholder.into(),
            group: None,
            non_expandable: false,
            signature: None,
            collapsed_by_default: None,
            can_be_removed_when_collapsed: false,
        }
    }
}
