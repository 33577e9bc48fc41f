//! Diffing freshly computed region infos against the live region set.
//!
//! Reconciliation runs in three phases:
//!
//! 1. **Classify** live regions group by group. A region whose range and
//!    placeholder are unchanged is kept untouched, so its expand state
//!    survives. Groups are kept or removed as a whole. Collapsed regions that
//!    lost their candidate may be kept to avoid flicker while a re-parse
//!    settles.
//! 2. **Materialize** the infos nothing matched, choosing their initial
//!    expand state from the [`ApplyDefaultStateMode`].
//! 3. **Commit** removals and additions in one [`RegionStore::run_atomic`]
//!    batch.

use std::collections::{HashMap, HashSet};

use super::region::{FoldingGroup, LiveFoldRegion, NewRegion, RegionId, RegionInfo};
use super::store::{RegionBatch, RegionStore};
use crate::document::LineMap;
use crate::syntax::ByteRange;

/// Regions covering fewer bytes are not practically collapsible
const MIN_COLLAPSIBLE_LEN: usize = 2;

/// How new regions choose their initial expand state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyDefaultStateMode {
    /// Collapse according to each region's default (first materialization)
    Always,
    /// As `Always`, but regions on the caret line stay expanded
    ExceptCaretLine,
    /// Incremental update: reuse recorded expand states
    Never,
}

/// Caret offset and the range of the line containing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaretPosition {
    pub offset: usize,
    pub line: ByteRange,
}

impl CaretPosition {
    pub fn new(offset: usize, line_map: &LineMap) -> Self {
        Self {
            offset,
            line: line_map.line_range_at(offset),
        }
    }

    /// The range shares text with the caret line
    pub fn on_line(&self, range: ByteRange) -> bool {
        range.intersects_strict(&self.line) || range.contains_offset(self.offset)
    }

    /// The caret sits strictly inside the range
    pub fn inside(&self, range: ByteRange) -> bool {
        range.start < self.offset && self.offset < range.end
    }
}

/// A region to create together with its initial expand state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRegion {
    pub info: RegionInfo,
    pub expanded: bool,
}

/// Result of the classification and materialization phases
#[derive(Debug, Clone, Default)]
pub struct MutationPlan {
    pub to_remove: Vec<LiveFoldRegion>,
    pub to_add: Vec<PlannedRegion>,
    /// Live regions left untouched
    pub kept: usize,
    /// Expand state of removed regions by range
    pub transferred: HashMap<ByteRange, bool>,
}

impl MutationPlan {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}

/// What a commit changed in the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub removed: usize,
    pub added: usize,
    pub kept: usize,
    /// Additions the store refused (conflict with a kept region)
    pub refused: usize,
}

fn is_collapsible(range: ByteRange) -> bool {
    range.len() >= MIN_COLLAPSIBLE_LEN
}

/// Candidate infos indexed for matching
struct CandidateIndex<'a> {
    infos: &'a [RegionInfo],
    by_range: HashMap<ByteRange, Vec<usize>>,
    group_sizes: HashMap<FoldingGroup, usize>,
    consumed: Vec<bool>,
}

impl<'a> CandidateIndex<'a> {
    fn new(infos: &'a [RegionInfo]) -> Self {
        let mut by_range: HashMap<ByteRange, Vec<usize>> = HashMap::new();
        let mut group_sizes: HashMap<FoldingGroup, usize> = HashMap::new();
        for (index, info) in infos.iter().enumerate() {
            by_range.entry(info.range).or_default().push(index);
            if let Some(group) = info.group {
                *group_sizes.entry(group).or_default() += 1;
            }
        }
        Self {
            infos,
            by_range,
            group_sizes,
            consumed: vec![false; infos.len()],
        }
    }

    /// Unconsumed info with the region's range and placeholder
    fn find_match(&self, region: &LiveFoldRegion) -> Option<usize> {
        if !is_collapsible(region.range) {
            return None;
        }
        self.by_range
            .get(&region.range)?
            .iter()
            .copied()
            .find(|index| !self.consumed[*index] && self.infos[*index].placeholder == region.placeholder)
    }

    /// Mark infos sharing a kept region's range, which the store would refuse
    fn consume_range(&mut self, range: ByteRange) {
        if let Some(indices) = self.by_range.get(&range) {
            for index in indices {
                self.consumed[*index] = true;
            }
        }
    }
}

/// Live regions split into groups, ungrouped regions as singletons
fn group_live_regions(regions: Vec<LiveFoldRegion>) -> Vec<Vec<LiveFoldRegion>> {
    let mut groups: Vec<Vec<LiveFoldRegion>> = Vec::new();
    let mut group_slots: HashMap<FoldingGroup, usize> = HashMap::new();
    for region in regions {
        match region.group {
            Some(group) => match group_slots.get(&group) {
                Some(slot) => groups[*slot].push(region),
                None => {
                    group_slots.insert(group, groups.len());
                    groups.push(vec![region]);
                }
            },
            None => groups.push(vec![region]),
        }
    }
    groups
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FoldReconciler;

impl FoldReconciler {
    /// Phases 1 and 2: decide what to remove, keep and add.
    ///
    /// `document_len` is the length of the document the store currently
    /// reflects; infos reaching past it are stale and skipped.
    pub fn compute_plan<S: RegionStore + ?Sized>(
        store: &S,
        infos: &[RegionInfo],
        mode: ApplyDefaultStateMode,
        keep_collapsed: bool,
        caret: Option<CaretPosition>,
        document_len: usize,
    ) -> MutationPlan {
        let mut plan = MutationPlan::default();
        let mut candidates = CandidateIndex::new(infos);

        for members in group_live_regions(store.all_regions()) {
            Self::classify_group(store, members, &mut candidates, &mut plan, keep_collapsed, caret);
        }

        Self::materialize(&candidates, &mut plan, mode, caret, document_len);

        log::debug!(
            target: "orikomi::reconciler",
            "Plan: {} kept, {} removed, {} added",
            plan.kept,
            plan.to_remove.len(),
            plan.to_add.len()
        );
        plan
    }

    fn classify_group<S: RegionStore + ?Sized>(
        store: &S,
        members: Vec<LiveFoldRegion>,
        candidates: &mut CandidateIndex<'_>,
        plan: &mut MutationPlan,
        keep_collapsed: bool,
        caret: Option<CaretPosition>,
    ) {
        let mut matched: Vec<Option<usize>> = Vec::with_capacity(members.len());
        let mut default_state_stale = false;
        for region in &members {
            let found = candidates.find_match(region).filter(|index| {
                let fresh = candidates.infos[*index].collapsed_by_default;
                let stale = region.collapsed_by_default.is_some_and(|stored| stored != fresh);
                if stale {
                    log::trace!(
                        target: "orikomi::reconciler",
                        "Region {} changed its default state to collapsed={}",
                        region.range,
                        fresh
                    );
                }
                default_state_stale |= stale;
                !stale
            });
            matched.push(found);
        }

        // An ungrouped region matching a grouped candidate must be recreated
        // so the whole group is materialized together.
        let keep = match members.first().and_then(|region| region.group) {
            None => matched[0].is_some_and(|index| candidates.infos[index].group.is_none()),
            Some(_) => Self::group_matches(candidates, &matched),
        };

        if keep {
            for index in matched.iter().flatten() {
                candidates.consumed[*index] = true;
            }
            plan.kept += members.len();
            return;
        }

        let force_keep = !default_state_stale
            && keep_collapsed
            && members.iter().all(|region| !region.expanded)
            && !members
                .iter()
                .any(|region| Self::can_be_removed_when_collapsed(store, region, caret));
        if force_keep {
            for region in &members {
                log::trace!(
                    target: "orikomi::reconciler",
                    "Keeping collapsed region {} without candidate",
                    region.range
                );
                candidates.consume_range(region.range);
            }
            plan.kept += members.len();
            return;
        }

        for region in members {
            if region.signature.is_none() {
                log::trace!(
                    target: "orikomi::reconciler",
                    "Removing light region {}",
                    region.range
                );
            }
            plan.transferred.insert(region.range, region.expanded);
            plan.to_remove.push(region);
        }
    }

    /// A live group survives only if every member matched, all matches share
    /// one group token, and that token has no other candidates.
    fn group_matches(candidates: &CandidateIndex<'_>, matched: &[Option<usize>]) -> bool {
        let Some(indices) = matched.iter().copied().collect::<Option<Vec<usize>>>() else {
            return false;
        };
        let mut tokens = indices.iter().map(|index| candidates.infos[*index].group);
        let Some(Some(token)) = tokens.next() else {
            return false;
        };
        if !tokens.all(|other| other == Some(token)) {
            return false;
        }
        candidates.group_sizes.get(&token).copied() == Some(indices.len())
    }

    fn can_be_removed_when_collapsed<S: RegionStore + ?Sized>(
        store: &S,
        region: &LiveFoldRegion,
        caret: Option<CaretPosition>,
    ) -> bool {
        region.can_be_removed_when_collapsed
            || store.has_document_region_changed(region.id)
            || caret.is_some_and(|caret| caret.on_line(region.range))
    }

    fn materialize(
        candidates: &CandidateIndex<'_>,
        plan: &mut MutationPlan,
        mode: ApplyDefaultStateMode,
        caret: Option<CaretPosition>,
        document_len: usize,
    ) {
        let mut group_expanded: HashMap<FoldingGroup, bool> = HashMap::new();
        let non_expandable_groups: HashSet<FoldingGroup> = candidates
            .infos
            .iter()
            .filter(|info| info.non_expandable)
            .filter_map(|info| info.group)
            .collect();
        let mut additions = Vec::new();

        for (index, info) in candidates.infos.iter().enumerate() {
            if candidates.consumed[index] {
                continue;
            }
            if info.range.end > document_len {
                log::error!(
                    target: "orikomi::reconciler",
                    "Skipped {} region {}: document length is {}",
                    info.language,
                    info.range,
                    document_len
                );
                continue;
            }
            if !is_collapsible(info.range) {
                log::trace!(
                    target: "orikomi::reconciler",
                    "Skipped degenerate region {} {:?}",
                    info.range,
                    info.placeholder
                );
                continue;
            }

            let expanded = !info.non_expandable
                && Self::initial_expanded(info, mode, caret, &plan.transferred);
            if let Some(group) = info.group {
                *group_expanded.entry(group).or_default() |= expanded;
            }
            additions.push(PlannedRegion {
                info: info.clone(),
                expanded,
            });
        }

        // A group holding a non-expandable member can never expand, so all
        // of its members start collapsed.
        for planned in &mut additions {
            if let Some(group) = planned.info.group {
                planned.expanded = group_expanded.get(&group).copied().unwrap_or(planned.expanded)
                    && !non_expandable_groups.contains(&group);
            }
        }
        plan.to_add = additions;
    }

    fn initial_expanded(
        info: &RegionInfo,
        mode: ApplyDefaultStateMode,
        caret: Option<CaretPosition>,
        transferred: &HashMap<ByteRange, bool>,
    ) -> bool {
        match mode {
            ApplyDefaultStateMode::Always | ApplyDefaultStateMode::ExceptCaretLine => {
                let on_caret_line = mode == ApplyDefaultStateMode::ExceptCaretLine
                    && caret.is_some_and(|caret| caret.on_line(info.range));
                on_caret_line || !info.collapsed_by_default
            }
            ApplyDefaultStateMode::Never => {
                let caret_inside = caret.is_some_and(|caret| caret.inside(info.range));
                caret_inside || transferred.get(&info.range).copied().unwrap_or(true)
            }
        }
    }

    /// Phase 3: apply the plan in one atomic batch.
    ///
    /// A new group whose members are not all accepted by the store is rolled
    /// back entirely.
    pub fn commit<S: RegionStore + ?Sized>(store: &mut S, plan: &MutationPlan) -> CommitSummary {
        let mut summary = CommitSummary {
            kept: plan.kept,
            ..Default::default()
        };

        store.run_atomic(&mut |batch: &mut dyn RegionBatch| {
            for region in &plan.to_remove {
                if batch.remove_region(region.id) {
                    summary.removed += 1;
                }
            }

            let mut created: Vec<(RegionId, &PlannedRegion)> = Vec::with_capacity(plan.to_add.len());
            let mut incomplete_groups: HashSet<FoldingGroup> = HashSet::new();
            for planned in &plan.to_add {
                match batch.create_region(NewRegion::from(&planned.info)) {
                    Some(id) => created.push((id, planned)),
                    None => {
                        log::debug!(
                            target: "orikomi::reconciler",
                            "Store refused {} region {}",
                            planned.info.language,
                            planned.info.range
                        );
                        summary.refused += 1;
                        incomplete_groups.extend(planned.info.group);
                    }
                }
            }

            for (id, planned) in created {
                if planned
                    .info
                    .group
                    .is_some_and(|group| incomplete_groups.contains(&group))
                {
                    batch.remove_region(id);
                    summary.refused += 1;
                    continue;
                }
                batch.set_expanded(id, planned.expanded);
                summary.added += 1;
            }

            batch.clear_document_ranges_modification_status();
        });

        log::debug!(
            target: "orikomi::reconciler",
            "Committed: {} removed, {} added, {} kept, {} refused",
            summary.removed,
            summary.added,
            summary.kept,
            summary.refused
        );
        summary
    }

    /// Plan against the store's current document length and commit
    pub fn reconcile<S: RegionStore + ?Sized>(
        store: &mut S,
        infos: &[RegionInfo],
        mode: ApplyDefaultStateMode,
        keep_collapsed: bool,
        caret: Option<CaretPosition>,
    ) -> CommitSummary {
        let document_len = store.document_len();
        let plan = Self::compute_plan(&*store, infos, mode, keep_collapsed, caret, document_len);
        Self::commit(store, &plan)
    }
}
