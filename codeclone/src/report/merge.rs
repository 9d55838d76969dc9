//! Report-only merging of sliding windows into maximal regions.
//!
//! Group keys are never touched here: merging block windows into their keys
//! would change the baseline contract. Only the reported item ranges are
//! collapsed.

use super::grouping::GroupMap;
use crate::extractor::BlockUnit;

/// Merges overlapping or adjacent windows of the same function into one
/// maximal range each.
pub(super) fn merge_block_items(items: &[BlockUnit]) -> Vec<BlockUnit> {
    let mut sorted: Vec<BlockUnit> = items
        .iter()
        .filter(|item| item.start_line > 0 && item.end_line >= item.start_line)
        .cloned()
        .collect();
    sorted.sort_by(|a, b| {
        (&a.filepath, &a.qualname, a.start_line, a.end_line)
            .cmp(&(&b.filepath, &b.qualname, b.start_line, b.end_line))
    });

    let mut merged: Vec<BlockUnit> = Vec::new();
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

/// Converts sliding block windows into maximal merged regions for
/// reporting. Block hash keys remain unchanged.
#[must_use]
pub fn prepare_block_report_groups(groups: &GroupMap<BlockUnit>) -> GroupMap<BlockUnit> {
    groups
        .iter()
        .map(|(key, items)| (key.clone(), merge_block_items(items)))
        .collect()
}
