//! Deterministic explainability facts for block clone groups.
//!
//! This is the source of truth for block explanations; renderers only
//! display these facts.

use std::collections::BTreeMap;

use super::grouping::GroupMap;
use super::stmt_index::StmtIndexCache;
use crate::constants::BLOCK_SIZE;
use crate::extractor::BlockUnit;

pub type GroupFacts = BTreeMap<String, BTreeMap<String, String>>;

fn looks_like_test_path(filepath: &str) -> bool {
    let normalized = filepath.replace('\\', "/").to_lowercase();
    let filename = normalized.rsplit('/').next().unwrap_or(&normalized);
    format!("/{normalized}/").contains("/tests/") || filename.starts_with("test_")
}

/// Builds the fact map for every block group. Assert analysis re-parses the
/// member files through the shared statement index.
#[must_use]
pub fn build_block_group_facts(
    block_groups: &GroupMap<BlockUnit>,
    index_cache: &mut StmtIndexCache,
) -> GroupFacts {
    let mut facts_by_group = GroupFacts::new();
    for (group_key, items) in block_groups {
        let mut facts = base_facts();
        enrich_with_assert_facts(&mut facts, items, index_cache);
        facts_by_group.insert(group_key.clone(), facts);
    }
    facts_by_group
}

fn base_facts() -> BTreeMap<String, String> {
    let mut facts = BTreeMap::new();
    facts.insert("match_rule".to_owned(), "normalized_sliding_window".to_owned());
    facts.insert("block_size".to_owned(), BLOCK_SIZE.to_string());
    facts.insert("signature_kind".to_owned(), "stmt_hash_sequence".to_owned());
    facts.insert("merged_regions".to_owned(), "true".to_owned());
    facts
}

fn enrich_with_assert_facts(
    facts: &mut BTreeMap<String, String>,
    items: &[BlockUnit],
    index_cache: &mut StmtIndexCache,
) {
    let mut assert_only = !items.is_empty();
    let mut test_like_paths = !items.is_empty();
    let mut total_statements = 0usize;
    let mut assert_statements = 0usize;
    let mut max_consecutive = 0usize;

    for item in items {
        let mut range_total = 0usize;
        let mut range_assert = 0usize;
        let mut consecutive = 0usize;

        if let Some(index) = index_cache.index_for(&item.filepath) {
            for info in index.stmts_in_range(item.start_line, item.end_line) {
                range_total += 1;
                if info.is_assert_like {
                    range_assert += 1;
                    consecutive += 1;
                    max_consecutive = max_consecutive.max(consecutive);
                } else {
                    consecutive = 0;
                }
            }
        }

        total_statements += range_total;
        assert_statements += range_assert;
        if range_total == 0 || range_total != range_assert {
            assert_only = false;
        }
        if !looks_like_test_path(&item.filepath) {
            test_like_paths = false;
        }
    }

    if total_statements > 0 {
        #[allow(clippy::cast_precision_loss)]
        let ratio = ((assert_statements as f64 / total_statements as f64) * 100.0).round();
        facts.insert("assert_ratio".to_owned(), format!("{ratio:.0}%"));
        facts.insert(
            "consecutive_asserts".to_owned(),
            max_consecutive.to_string(),
        );
    }

    if assert_only {
        facts.insert("hint".to_owned(), "assert_only".to_owned());
        facts.insert("hint_confidence".to_owned(), "deterministic".to_owned());
        if test_like_paths {
            facts.insert("hint_context".to_owned(), "likely_test_boilerplate".to_owned());
        }
        facts.insert(
            "hint_note".to_owned(),
            "This block clone consists entirely of assert-only statements. \
             This often occurs in test suites."
                .to_owned(),
        );
    }
}
