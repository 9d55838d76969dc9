//! Segment report preparation: site merging and boilerplate suppression.
//!
//! Segments never feed the baseline or gating; everything here is
//! report-only.

use rustc_hash::FxHashSet;

use super::grouping::GroupMap;
use super::stmt_index::StmtIndexCache;
use crate::constants::SEGMENT_MIN_UNIQUE_STMT_KINDS;
use crate::extractor::SegmentUnit;

/// Prepared segment groups plus the number suppressed as boilerplate.
#[derive(Debug, Default)]
pub struct SegmentReport {
    pub groups: GroupMap<SegmentUnit>,
    pub suppressed: usize,
}

/// Merges each group's overlapping windows into maximal spans, then drops
/// groups made of pure boilerplate: fewer than two distinct statement kinds
/// and no control-flow statement (e.g. long runs of attribute assignments).
#[must_use]
pub fn prepare_segment_report_groups(
    segment_groups: &GroupMap<SegmentUnit>,
    index_cache: &mut StmtIndexCache,
) -> SegmentReport {
    let mut report = SegmentReport::default();

    for (key, items) in segment_groups {
        let merged = merge_segment_items(items);
        if merged.is_empty() {
            continue;
        }
        if is_boilerplate(&merged, index_cache) {
            report.suppressed += 1;
            continue;
        }
        report.groups.insert(key.clone(), merged);
    }

    report
}

fn merge_segment_items(items: &[SegmentUnit]) -> Vec<SegmentUnit> {
    let mut sorted: Vec<SegmentUnit> = items
        .iter()
        .filter(|item| item.start_line > 0 && item.end_line >= item.start_line)
        .cloned()
        .collect();
    sorted.sort_by(|a, b| {
        (&a.filepath, &a.qualname, a.start_line, a.end_line)
            .cmp(&(&b.filepath, &b.qualname, b.start_line, b.end_line))
    });

    let mut merged: Vec<SegmentUnit> = Vec::new();
    for item in sorted {
        match merged.last_mut() {
            Some(current)
                if current.filepath == item.filepath
                    && current.qualname == item.qualname
                    && item.start_line <= current.end_line + 1 =>
            {
                current.end_line = current.end_line.max(item.end_line);
                current.size = current.end_line - current.start_line + 1;
            }
            _ => {
                let mut fresh = item;
                fresh.size = fresh.end_line - fresh.start_line + 1;
                merged.push(fresh);
            }
        }
    }
    merged
}

fn is_boilerplate(items: &[SegmentUnit], index_cache: &mut StmtIndexCache) -> bool {
    let mut kinds: FxHashSet<&'static str> = FxHashSet::default();
    let mut has_control_flow = false;
    let mut saw_statements = false;

    for item in items {
        let Some(index) = index_cache.index_for(&item.filepath) else {
            continue;
        };
        for info in index.stmts_in_range(item.start_line, item.end_line) {
            saw_statements = true;
            kinds.insert(info.kind);
            has_control_flow |= info.is_control_flow;
        }
    }

    // Unreadable members cannot be classified; keep the group.
    if !saw_statements {
        return false;
    }
    kinds.len() < SEGMENT_MIN_UNIQUE_STMT_KINDS && !has_control_flow
}
