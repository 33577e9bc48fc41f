//! Live fold regions of one view.
//!
//! [`RegionStore`] is the contract the reconciler commits against. All
//! structural changes happen inside [`RegionStore::run_atomic`], whose
//! [`RegionBatch`] enforces the store invariants: no empty ranges, no exact
//! duplicates, no partially overlapping ranges.
//!
//! [`FoldRegionStore`] is the in-memory implementation used by views. Besides
//! the contract it follows document edits, shifting regions that sit after an
//! edit, growing or shrinking regions that contain it, and dropping regions
//! whose boundary was edited away.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use super::region::{FoldingGroup, LiveFoldRegion, NewRegion, RegionId};
use crate::syntax::ByteRange;

/// Structural mutations available inside [`RegionStore::run_atomic`]
pub trait RegionBatch {
    /// Create a collapsed-or-expanded region.
    ///
    /// Returns `None` for empty or out-of-bounds ranges and for ranges that
    /// duplicate or partially overlap an existing region.
    fn create_region(&mut self, region: NewRegion) -> Option<RegionId>;

    fn remove_region(&mut self, id: RegionId) -> bool;

    fn set_expanded(&mut self, id: RegionId, expanded: bool) -> bool;

    /// Forget which regions had their document range touched by edits
    fn clear_document_ranges_modification_status(&mut self);
}

/// Region set owned by a view
pub trait RegionStore {
    /// All regions ordered by start offset, outer regions first
    fn all_regions(&self) -> Vec<LiveFoldRegion>;

    fn grouped_regions(&self, group: FoldingGroup) -> Vec<LiveFoldRegion>;

    /// The region's span was touched by an edit since the last commit
    fn has_document_region_changed(&self, id: RegionId) -> bool;

    fn document_len(&self) -> usize;

    fn document_version(&self) -> u64;

    /// Counter bumped by every structural change (creation, removal, edit
    /// shifting). Expand toggles do not count.
    fn modification_count(&self) -> u64;

    /// Apply a batch of mutations; readers never observe a partial batch
    fn run_atomic(&mut self, mutation: &mut dyn FnMut(&mut dyn RegionBatch));
}

/// A document edit in byte offsets of the old text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub old_end: usize,
    pub new_end: usize,
}

impl TextEdit {
    pub fn new(start: usize, old_end: usize, new_end: usize) -> Self {
        Self {
            start,
            old_end,
            new_end,
        }
    }

    pub fn insertion(offset: usize, len: usize) -> Self {
        Self::new(offset, offset, offset + len)
    }

    pub fn deletion(range: ByteRange) -> Self {
        Self::new(range.start, range.end, range.start)
    }

    fn shift(&self, offset: usize) -> usize {
        (offset + self.new_end).saturating_sub(self.old_end)
    }

    /// Reconstruct one merged edit from the old and new text.
    ///
    /// All changes are merged into `[first_change, last_change_old)` becoming
    /// `[first_change, last_change_new)`. Returns `None` for identical texts.
    pub fn between(old_text: &str, new_text: &str) -> Option<Self> {
        use similar::{ChangeTag, TextDiff};

        if old_text == new_text {
            return None;
        }

        // Character diff; byte positions are tracked through value lengths
        let diff = TextDiff::from_chars(old_text, new_text);

        let mut first_change_start: Option<usize> = None;
        let mut last_old_end = 0;
        let mut last_new_end = 0;
        let mut old_byte = 0;
        let mut new_byte = 0;

        for change in diff.iter_all_changes() {
            let len = change.value().len();
            match change.tag() {
                ChangeTag::Equal => {
                    old_byte += len;
                    new_byte += len;
                }
                ChangeTag::Delete => {
                    first_change_start.get_or_insert(old_byte);
                    old_byte += len;
                    last_old_end = old_byte;
                    last_new_end = new_byte;
                }
                ChangeTag::Insert => {
                    first_change_start.get_or_insert(old_byte);
                    new_byte += len;
                    last_old_end = old_byte;
                    last_new_end = new_byte;
                }
            }
        }

        first_change_start.map(|start| Self::new(start, last_old_end, last_new_end))
    }
}

#[derive(Debug, Clone)]
struct StoredRegion {
    range: ByteRange,
    placeholder: String,
    group: Option<FoldingGroup>,
    expanded: bool,
    signature: Option<String>,
    collapsed_by_default: Option<bool>,
    can_be_removed_when_collapsed: bool,
    non_expandable: bool,
    document_range_changed: bool,
}

type OrderKey = (usize, Reverse<usize>);

fn order_key(range: ByteRange) -> OrderKey {
    (range.start, Reverse(range.end))
}

#[derive(Debug, Default)]
pub struct FoldRegionStore {
    regions: HashMap<RegionId, StoredRegion>,
    /// Regions ordered by start, outer regions first
    order: BTreeMap<OrderKey, RegionId>,
    document_len: usize,
    document_version: u64,
    modification_count: u64,
}

impl FoldRegionStore {
    pub fn new(document_len: usize, document_version: u64) -> Self {
        Self {
            document_len,
            document_version,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn region(&self, id: RegionId) -> Option<LiveFoldRegion> {
        self.regions.get(&id).map(|region| snapshot(id, region))
    }

    /// Region with exactly this range
    pub fn region_at(&self, range: ByteRange) -> Option<LiveFoldRegion> {
        let id = self.order.get(&order_key(range))?;
        self.region(*id)
    }

    /// Outermost collapsed region containing `offset`
    pub fn collapsed_region_at(&self, offset: usize) -> Option<LiveFoldRegion> {
        self.order
            .range(..=(offset, Reverse(0)))
            .filter_map(|(_, id)| self.regions.get(id).map(|region| (*id, region)))
            .find(|(_, region)| !region.expanded && region.range.contains_offset(offset))
            .map(|(id, region)| snapshot(id, region))
    }

    pub fn is_offset_collapsed(&self, offset: usize) -> bool {
        self.collapsed_region_at(offset).is_some()
    }

    /// Regions not contained in any other region
    pub fn top_level_regions(&self) -> Vec<LiveFoldRegion> {
        let mut top_level = Vec::new();
        let mut current_end = 0;
        for (_, id) in &self.order {
            let region = &self.regions[id];
            if top_level.is_empty() || region.range.start >= current_end {
                current_end = region.range.end;
                top_level.push(snapshot(*id, region));
            }
        }
        top_level
    }

    /// End offset of the last region of a group
    pub fn group_end_offset(&self, group: FoldingGroup) -> Option<usize> {
        self.regions
            .values()
            .filter(|region| region.group == Some(group))
            .map(|region| region.range.end)
            .max()
    }

    /// User toggle. Grouped regions change together; non-expandable regions
    /// cannot be expanded.
    pub fn set_expanded(&mut self, id: RegionId, expanded: bool) -> bool {
        let Some(region) = self.regions.get(&id) else {
            return false;
        };
        if expanded && region.non_expandable {
            return false;
        }
        match region.group {
            Some(group) => {
                for member in self.regions.values_mut() {
                    if member.group == Some(group) && !(expanded && member.non_expandable) {
                        member.expanded = expanded;
                    }
                }
            }
            None => {
                if let Some(region) = self.regions.get_mut(&id) {
                    region.expanded = expanded;
                }
            }
        }
        true
    }

    /// Remove every region
    pub fn clear(&mut self) {
        if self.regions.is_empty() {
            return;
        }
        self.regions.clear();
        self.order.clear();
        self.modification_count += 1;
    }

    /// Follow a document edit.
    ///
    /// Regions after the edit shift, regions containing it resize and are
    /// marked as changed, regions with a boundary inside the edited span are
    /// removed together with their group.
    pub fn apply_edit(&mut self, edit: &TextEdit, new_version: u64) {
        let mut invalidated_groups = Vec::new();
        let mut invalidated = Vec::new();
        let mut updates = Vec::new();

        for (id, region) in &self.regions {
            let range = region.range;
            if edit.start >= range.end {
                continue;
            }
            let shifted = if edit.old_end <= range.start {
                ByteRange::new(edit.shift(range.start), edit.shift(range.end))
            } else if edit.start >= range.start && edit.old_end <= range.end {
                ByteRange::new(range.start, edit.shift(range.end))
            } else {
                invalidated.push(*id);
                invalidated_groups.extend(region.group);
                continue;
            };

            if shifted.is_empty() {
                invalidated.push(*id);
                invalidated_groups.extend(region.group);
            } else {
                let touched = edit.start >= range.start && edit.old_end <= range.end;
                updates.push((*id, shifted, touched));
            }
        }

        for (id, region) in &self.regions {
            if region.group.is_some_and(|group| invalidated_groups.contains(&group))
                && !invalidated.contains(id)
            {
                invalidated.push(*id);
            }
        }

        for (id, range, touched) in updates {
            if invalidated.contains(&id) {
                continue;
            }
            if let Some(region) = self.regions.get_mut(&id) {
                region.range = range;
                region.document_range_changed |= touched;
            }
        }
        for id in &invalidated {
            if let Some(region) = self.regions.remove(id) {
                log::debug!(
                    target: "orikomi::store",
                    "Edit {:?} invalidated region {}",
                    edit,
                    region.range
                );
            }
        }
        self.rebuild_order();

        self.document_len = edit.shift(self.document_len).max(edit.new_end);
        self.document_version = new_version;
        self.modification_count += 1;
    }

    /// Follow an edit given as old and new document text
    pub fn apply_text_change(&mut self, old_text: &str, new_text: &str, new_version: u64) {
        match TextEdit::between(old_text, new_text) {
            Some(edit) => self.apply_edit(&edit, new_version),
            None => self.document_version = new_version,
        }
        self.document_len = new_text.len();
    }

    fn rebuild_order(&mut self) {
        self.order = self
            .regions
            .iter()
            .map(|(id, region)| (order_key(region.range), *id))
            .collect();
    }

    /// Partially overlapping region, if any
    fn conflict(&self, range: ByteRange) -> Option<ByteRange> {
        self.order
            .range(..(range.end, Reverse(0)))
            .map(|(_, id)| self.regions[id].range)
            .find(|existing| existing.conflicts_with(&range))
    }
}

fn snapshot(id: RegionId, region: &StoredRegion) -> LiveFoldRegion {
    LiveFoldRegion {
        id,
        range: region.range,
        placeholder: region.placeholder.clone(),
        group: region.group,
        expanded: region.expanded,
        signature: region.signature.clone(),
        collapsed_by_default: region.collapsed_by_default,
        can_be_removed_when_collapsed: region.can_be_removed_when_collapsed,
        non_expandable: region.non_expandable,
    }
}

impl RegionBatch for FoldRegionStore {
    fn create_region(&mut self, region: NewRegion) -> Option<RegionId> {
        let range = region.range;
        if range.is_empty() || range.end > self.document_len {
            log::debug!(
                target: "orikomi::store",
                "Refused region {} in document of length {}",
                range,
                self.document_len
            );
            return None;
        }
        if self.order.contains_key(&order_key(range)) {
            return None;
        }
        if let Some(existing) = self.conflict(range) {
            log::debug!(
                target: "orikomi::store",
                "Refused region {}: conflicts with {}",
                range,
                existing
            );
            return None;
        }

        let id = RegionId::next();
        self.order.insert(order_key(range), id);
        self.regions.insert(
            id,
            StoredRegion {
                range,
                placeholder: region.placeholder,
                group: region.group,
                expanded: !region.non_expandable,
                signature: region.signature,
                collapsed_by_default: region.collapsed_by_default,
                can_be_removed_when_collapsed: region.can_be_removed_when_collapsed,
                non_expandable: region.non_expandable,
                document_range_changed: false,
            },
        );
        self.modification_count += 1;
        Some(id)
    }

    fn remove_region(&mut self, id: RegionId) -> bool {
        let Some(region) = self.regions.remove(&id) else {
            return false;
        };
        self.order.remove(&order_key(region.range));
        self.modification_count += 1;
        true
    }

    fn set_expanded(&mut self, id: RegionId, expanded: bool) -> bool {
        match self.regions.get_mut(&id) {
            Some(region) => {
                region.expanded = expanded && !region.non_expandable;
                true
            }
            None => false,
        }
    }

    fn clear_document_ranges_modification_status(&mut self) {
        for region in self.regions.values_mut() {
            region.document_range_changed = false;
        }
    }
}

impl RegionStore for FoldRegionStore {
    fn all_regions(&self) -> Vec<LiveFoldRegion> {
        self.order
            .values()
            .map(|id| snapshot(*id, &self.regions[id]))
            .collect()
    }

    fn grouped_regions(&self, group: FoldingGroup) -> Vec<LiveFoldRegion> {
        self.order
            .values()
            .filter(|id| self.regions[*id].group == Some(group))
            .map(|id| snapshot(*id, &self.regions[id]))
            .collect()
    }

    fn has_document_region_changed(&self, id: RegionId) -> bool {
        self.regions
            .get(&id)
            .is_some_and(|region| region.document_range_changed)
    }

    fn document_len(&self) -> usize {
        self.document_len
    }

    fn document_version(&self) -> u64 {
        self.document_version
    }

    fn modification_count(&self) -> u64 {
        self.modification_count
    }

    fn run_atomic(&mut self, mutation: &mut dyn FnMut(&mut dyn RegionBatch)) {
        let before = self.modification_count;
        mutation(self);
        log::trace!(
            target: "orikomi::store",
            "Batch applied {} structural changes, {} regions live",
            self.modification_count - before,
            self.regions.len()
        );
    }
}
