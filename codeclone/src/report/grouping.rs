//! Equivalence grouping over the collected units and windows.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

use crate::extractor::{BlockUnit, SegmentUnit, Unit};

/// Sorted group-key map; `BTreeMap` keeps key iteration deterministic.
pub type GroupMap<T> = BTreeMap<String, Vec<T>>;

/// Function groups keyed `fingerprint|loc_bucket`; singletons discarded.
#[must_use]
pub fn build_groups(units: &[Unit]) -> GroupMap<Unit> {
    let mut groups: GroupMap<Unit> = BTreeMap::new();
    for unit in units {
        let key = format!("{}|{}", unit.fingerprint, unit.loc_bucket);
        groups.entry(key).or_default().push(unit.clone());
    }
    groups.retain(|_, members| members.len() > 1);
    for members in groups.values_mut() {
        members.sort_by(|a, b| {
            (&a.filepath, a.start_line, &a.qualname).cmp(&(
                &b.filepath,
                b.start_line,
                &b.qualname,
            ))
        });
    }
    groups
}

/// Block groups keyed by block hash. A group must span at least two
/// distinct functions; overlapping smaller groups at an already-claimed
/// site are rejected.
#[must_use]
pub fn build_block_groups(blocks: &[BlockUnit]) -> GroupMap<BlockUnit> {
    let mut groups: GroupMap<BlockUnit> = BTreeMap::new();
    for block in blocks {
        groups
            .entry(block.block_hash.clone())
            .or_default()
            .push(block.clone());
    }

    groups.retain(|_, members| {
        let functions: FxHashSet<&str> =
            members.iter().map(|b| b.qualname.as_str()).collect();
        functions.len() >= 2
    });
    for members in groups.values_mut() {
        members.sort_by(|a, b| {
            (&a.filepath, a.start_line, &a.qualname).cmp(&(
                &b.filepath,
                b.start_line,
                &b.qualname,
            ))
        });
    }
    reject_overlapping_groups(groups)
}

/// Larger groups claim their member sites first; any later group touching a
/// claimed interval in the same function is dropped entirely. Ordering is
/// deterministic: descending total span, then key.
fn reject_overlapping_groups(groups: GroupMap<BlockUnit>) -> GroupMap<BlockUnit> {
    let mut order: Vec<(usize, &String)> = groups
        .iter()
        .map(|(key, members)| {
            let span: usize = members
                .iter()
                .map(|b| b.end_line.saturating_sub(b.start_line) + 1)
                .sum();
            (span, key)
        })
        .collect();
    order.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    let mut claimed: FxHashMap<(String, String), Vec<(usize, usize)>> = FxHashMap::default();
    let mut keep: FxHashSet<String> = FxHashSet::default();

    for (_, key) in order {
        let members = &groups[key];
        let overlaps = members.iter().any(|member| {
            claimed
                .get(&(member.filepath.clone(), member.qualname.clone()))
                .is_some_and(|intervals| {
                    intervals.iter().any(|&(start, end)| {
                        member.start_line <= end && start <= member.end_line
                    })
                })
        });
        if overlaps {
            continue;
        }
        for member in members {
            claimed
                .entry((member.filepath.clone(), member.qualname.clone()))
                .or_default()
                .push((member.start_line, member.end_line));
        }
        keep.insert(key.clone());
    }

    groups
        .into_iter()
        .filter(|(key, _)| keep.contains(key))
        .collect()
}

/// Segment groups: cluster candidates by the order-insensitive signature,
/// confirm strict equivalence by the order-sensitive hash, then emit only
/// in-function repetition keyed `segment_hash|qualname`.
#[must_use]
pub fn build_segment_groups(segments: &[SegmentUnit]) -> GroupMap<SegmentUnit> {
    let mut sig_groups: FxHashMap<&str, Vec<&SegmentUnit>> = FxHashMap::default();
    for segment in segments {
        sig_groups
            .entry(segment.segment_sig.as_str())
            .or_default()
            .push(segment);
    }

    let mut confirmed: GroupMap<SegmentUnit> = BTreeMap::new();
    for candidates in sig_groups.values() {
        if candidates.len() < 2 {
            continue;
        }

        let mut hash_groups: FxHashMap<&str, Vec<&SegmentUnit>> = FxHashMap::default();
        for segment in candidates {
            hash_groups
                .entry(segment.segment_hash.as_str())
                .or_default()
                .push(segment);
        }

        for (segment_hash, strict) in hash_groups {
            if strict.len() < 2 {
                continue;
            }
            let mut by_function: FxHashMap<&str, Vec<&SegmentUnit>> = FxHashMap::default();
            for segment in strict {
                by_function
                    .entry(segment.qualname.as_str())
                    .or_default()
                    .push(segment);
            }
            for (qualname, members) in by_function {
                if members.len() >= 2 {
                    confirmed.insert(
                        format!("{segment_hash}|{qualname}"),
                        members.into_iter().cloned().collect(),
                    );
                }
            }
        }
    }

    for members in confirmed.values_mut() {
        members.sort_by(|a, b| {
            (&a.filepath, a.start_line, &a.qualname).cmp(&(
                &b.filepath,
                b.start_line,
                &b.qualname,
            ))
        });
    }
    confirmed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(fingerprint: &str, bucket: &str, filepath: &str, qualname: &str) -> Unit {
        Unit {
            qualname: qualname.to_owned(),
            filepath: filepath.to_owned(),
            start_line: 1,
            end_line: 20,
            loc: 20,
            stmt_count: 8,
            fingerprint: fingerprint.to_owned(),
            loc_bucket: bucket.to_owned(),
        }
    }

    fn block(hash: &str, filepath: &str, qualname: &str, start: usize, end: usize) -> BlockUnit {
        BlockUnit {
            block_hash: hash.to_owned(),
            filepath: filepath.to_owned(),
            qualname: qualname.to_owned(),
            start_line: start,
            end_line: end,
            size: 4,
        }
    }

    fn segment(hash: &str, sig: &str, qualname: &str, start: usize) -> SegmentUnit {
        SegmentUnit {
            segment_hash: hash.to_owned(),
            segment_sig: sig.to_owned(),
            filepath: "a.py".to_owned(),
            qualname: qualname.to_owned(),
            start_line: start,
            end_line: start + 5,
            size: 6,
        }
    }

    #[test]
    fn test_function_groups_require_two_members() {
        let units = vec![
            unit("fp1", "b1", "a.py", "a:f"),
            unit("fp1", "b1", "b.py", "b:g"),
            unit("fp2", "b1", "c.py", "c:h"),
        ];
        let groups = build_groups(&units);
        assert_eq!(groups.len(), 1);
        assert!(groups.contains_key("fp1|b1"));
    }

    #[test]
    fn test_bucket_separates_sizes() {
        let units = vec![
            unit("fp1", "b0", "a.py", "a:f"),
            unit("fp1", "b3", "b.py", "b:g"),
        ];
        assert!(build_groups(&units).is_empty());
    }

    #[test]
    fn test_block_groups_reject_single_function() {
        let blocks = vec![
            block("h1", "a.py", "a:f", 10, 14),
            block("h1", "a.py", "a:f", 30, 34),
        ];
        assert!(build_block_groups(&blocks).is_empty());
    }

    #[test]
    fn test_block_groups_span_functions() {
        let blocks = vec![
            block("h1", "a.py", "a:f", 10, 14),
            block("h1", "b.py", "b:g", 20, 24),
        ];
        let groups = build_block_groups(&blocks);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["h1"].len(), 2);
    }

    #[test]
    fn test_overlapping_smaller_group_is_rejected() {
        let blocks = vec![
            // The larger group claims lines 10-19 in a:f.
            block("big", "a.py", "a:f", 10, 19),
            block("big", "b.py", "b:g", 10, 19),
            // The smaller group overlaps the claimed site.
            block("small", "a.py", "a:f", 12, 15),
            block("small", "c.py", "c:h", 40, 43),
        ];
        let groups = build_block_groups(&blocks);
        assert!(groups.contains_key("big"));
        assert!(!groups.contains_key("small"));
    }

    #[test]
    fn test_segment_groups_are_per_function() {
        let segments = vec![
            segment("sh1", "sig1", "a:f", 10),
            segment("sh1", "sig1", "a:f", 30),
            segment("sh1", "sig1", "a:g", 50),
        ];
        let groups = build_segment_groups(&segments);
        assert_eq!(groups.len(), 1);
        assert!(groups.contains_key("sh1|a:f"));
    }

    #[test]
    fn test_segment_sig_clusters_but_hash_confirms() {
        // Same signature, different strict hashes, one occurrence each:
        // nothing confirmed.
        let segments = vec![
            segment("sh1", "sig1", "a:f", 10),
            segment("sh2", "sig1", "a:f", 30),
        ];
        assert!(build_segment_groups(&segments).is_empty());
    }
}
