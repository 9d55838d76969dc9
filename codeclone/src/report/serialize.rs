//! Deterministic report serialization (JSON and text).
//!
//! Determinism rules: the file list is lexicographically sorted, group keys
//! are emitted in sorted order, items within a group are sorted by
//! `(file_index, qualname, start_line, end_line)`, and the JSON encoder
//! emits sorted keys.

use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use super::explain::GroupFacts;
use super::grouping::GroupMap;
use crate::contracts::REPORT_SCHEMA_VERSION;
use crate::extractor::{BlockUnit, SegmentUnit, Unit};

/// Report metadata; serialized under `meta` with sorted keys.
pub type ReportMeta = BTreeMap<String, Value>;

/// The three prepared group sections of one run.
pub struct ReportGroups<'a> {
    pub functions: &'a GroupMap<Unit>,
    pub blocks: &'a GroupMap<BlockUnit>,
    pub segments: &'a GroupMap<SegmentUnit>,
}

/// Positional item schemas, one per section.
fn group_item_layout() -> Value {
    json!({
        "functions": [
            "file_i", "qualname", "start", "end", "loc", "stmt_count",
            "fingerprint", "loc_bucket",
        ],
        "blocks": ["file_i", "qualname", "start", "end", "size"],
        "segments": [
            "file_i", "qualname", "start", "end", "size",
            "segment_hash", "segment_sig",
        ],
    })
}

trait ReportItem {
    fn filepath(&self) -> &str;
    fn qualname(&self) -> &str;
    fn start_line(&self) -> usize;
    fn end_line(&self) -> usize;
    fn metric(&self) -> usize;
    fn encode(&self, file_i: usize) -> Value;
}

impl ReportItem for Unit {
    fn filepath(&self) -> &str {
        &self.filepath
    }
    fn qualname(&self) -> &str {
        &self.qualname
    }
    fn start_line(&self) -> usize {
        self.start_line
    }
    fn end_line(&self) -> usize {
        self.end_line
    }
    fn metric(&self) -> usize {
        self.loc
    }
    fn encode(&self, file_i: usize) -> Value {
        json!([
            file_i,
            self.qualname,
            self.start_line,
            self.end_line,
            self.loc,
            self.stmt_count,
            self.fingerprint,
            self.loc_bucket
        ])
    }
}

impl ReportItem for BlockUnit {
    fn filepath(&self) -> &str {
        &self.filepath
    }
    fn qualname(&self) -> &str {
        &self.qualname
    }
    fn start_line(&self) -> usize {
        self.start_line
    }
    fn end_line(&self) -> usize {
        self.end_line
    }
    fn metric(&self) -> usize {
        self.size
    }
    fn encode(&self, file_i: usize) -> Value {
        json!([file_i, self.qualname, self.start_line, self.end_line, self.size])
    }
}

impl ReportItem for SegmentUnit {
    fn filepath(&self) -> &str {
        &self.filepath
    }
    fn qualname(&self) -> &str {
        &self.qualname
    }
    fn start_line(&self) -> usize {
        self.start_line
    }
    fn end_line(&self) -> usize {
        self.end_line
    }
    fn metric(&self) -> usize {
        self.size
    }
    fn encode(&self, file_i: usize) -> Value {
        json!([
            file_i,
            self.qualname,
            self.start_line,
            self.end_line,
            self.size,
            self.segment_hash,
            self.segment_sig
        ])
    }
}

fn collect_files(groups: &ReportGroups<'_>) -> Vec<String> {
    let mut files: BTreeSet<String> = BTreeSet::new();
    for items in groups.functions.values() {
        files.extend(items.iter().map(|i| i.filepath.clone()));
    }
    for items in groups.blocks.values() {
        files.extend(items.iter().map(|i| i.filepath.clone()));
    }
    for items in groups.segments.values() {
        files.extend(items.iter().map(|i| i.filepath.clone()));
    }
    files.into_iter().collect()
}

fn encode_section<T: ReportItem>(
    groups: &GroupMap<T>,
    file_ids: &BTreeMap<&str, usize>,
) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    for (key, items) in groups {
        let mut records: Vec<(usize, String, usize, usize, Value)> = items
            .iter()
            .map(|item| {
                let file_i = file_ids.get(item.filepath()).copied().unwrap_or(0);
                (
                    file_i,
                    item.qualname().to_owned(),
                    item.start_line(),
                    item.end_line(),
                    item.encode(file_i),
                )
            })
            .collect();
        records.sort_by(|a, b| (a.0, &a.1, a.2, a.3).cmp(&(b.0, &b.1, b.2, b.3)));
        out.insert(
            key.clone(),
            Value::Array(records.into_iter().map(|r| r.4).collect()),
        );
    }
    out
}

fn baseline_is_trusted(meta: &ReportMeta) -> bool {
    meta.get("baseline_loaded") == Some(&Value::Bool(true))
        && meta
            .get("baseline_status")
            .and_then(Value::as_str)
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("ok"))
}

/// NEW/KNOWN split: with a trusted baseline, keys absent from `new_keys`
/// are KNOWN; otherwise everything is NEW and KNOWN is empty.
fn split_for(
    keys: impl Iterator<Item = String>,
    new_keys: Option<&BTreeSet<String>>,
    trusted: bool,
) -> (Vec<String>, Vec<String>) {
    let sorted_keys: Vec<String> = keys.collect();
    let Some(new_keys) = new_keys.filter(|_| trusted) else {
        return (sorted_keys, Vec::new());
    };
    let mut new_list = Vec::new();
    let mut known_list = Vec::new();
    for key in sorted_keys {
        if new_keys.contains(&key) {
            new_list.push(key);
        } else {
            known_list.push(key);
        }
    }
    (new_list, known_list)
}

/// Serializes the machine-readable JSON report.
#[must_use]
pub fn to_json_report(
    meta: &ReportMeta,
    groups: &ReportGroups<'_>,
    facts: Option<&GroupFacts>,
    new_function_keys: Option<&BTreeSet<String>>,
    new_block_keys: Option<&BTreeSet<String>>,
) -> String {
    let files = collect_files(groups);
    let file_ids: BTreeMap<&str, usize> = files
        .iter()
        .enumerate()
        .map(|(i, path)| (path.as_str(), i))
        .collect();

    let function_section = encode_section(groups.functions, &file_ids);
    let block_section = encode_section(groups.blocks, &file_ids);
    let segment_section = encode_section(groups.segments, &file_ids);

    let trusted = baseline_is_trusted(meta);
    let (functions_new, functions_known) = split_for(
        groups.functions.keys().cloned(),
        new_function_keys,
        trusted,
    );
    let (blocks_new, blocks_known) =
        split_for(groups.blocks.keys().cloned(), new_block_keys, trusted);
    // Segment keys are never baselined, so they are always NEW.
    let (segments_new, segments_known) = split_for(groups.segments.keys().cloned(), None, trusted);

    let mut meta_payload = meta.clone();
    meta_payload.insert(
        "report_schema_version".to_owned(),
        Value::String(REPORT_SCHEMA_VERSION.to_owned()),
    );
    meta_payload.insert(
        "groups_counts".to_owned(),
        json!({
            "functions": {
                "total": functions_new.len() + functions_known.len(),
                "new": functions_new.len(),
                "known": functions_known.len(),
            },
            "blocks": {
                "total": blocks_new.len() + blocks_known.len(),
                "new": blocks_new.len(),
                "known": blocks_known.len(),
            },
            "segments": {
                "total": segments_new.len() + segments_known.len(),
                "new": segments_new.len(),
                "known": segments_known.len(),
            },
        }),
    );

    let mut payload = serde_json::Map::new();
    payload.insert("meta".to_owned(), json!(meta_payload));
    payload.insert("files".to_owned(), json!(files));
    payload.insert(
        "groups".to_owned(),
        json!({
            "functions": function_section,
            "blocks": block_section,
            "segments": segment_section,
        }),
    );
    payload.insert(
        "groups_split".to_owned(),
        json!({
            "functions": {"new": functions_new, "known": functions_known},
            "blocks": {"new": blocks_new, "known": blocks_known},
            "segments": {"new": segments_new, "known": segments_known},
        }),
    );
    payload.insert("group_item_layout".to_owned(), group_item_layout());

    if let Some(facts) = facts {
        if !facts.is_empty() {
            payload.insert("facts".to_owned(), json!({ "blocks": facts }));
        }
    }

    let mut text = serde_json::to_string_pretty(&Value::Object(payload))
        .unwrap_or_else(|_| String::from("{}"));
    text.push('\n');
    text
}

fn format_meta_text_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::Bool(b)) => (if *b { "true" } else { "false" }).to_owned(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                "(none)".to_owned()
            } else {
                trimmed.to_owned()
            }
        }
        Some(Value::Null) | None => "(none)".to_owned(),
        Some(other) => other.to_string(),
    }
}

fn text_groups<T: ReportItem>(groups: &GroupMap<T>, keys: &[String], metric_name: &str) -> String {
    let mut ordered: Vec<(&String, &Vec<T>)> = keys
        .iter()
        .filter_map(|key| groups.get_key_value(key))
        .collect();
    ordered.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));

    let mut lines = Vec::new();
    for (i, (_, items)) in ordered.iter().enumerate() {
        let mut sorted: Vec<&T> = items.iter().collect();
        sorted.sort_by(|a, b| {
            (a.filepath(), a.start_line(), a.end_line(), a.qualname())
                .cmp(&(b.filepath(), b.start_line(), b.end_line(), b.qualname()))
        });
        lines.push(format!(
            "\n=== Clone group #{} (count={}) ===",
            i + 1,
            items.len()
        ));
        for item in sorted {
            lines.push(format!(
                "- {} {}:{}-{} {}={}",
                item.qualname(),
                item.filepath(),
                item.start_line(),
                item.end_line(),
                metric_name,
                item.metric()
            ));
        }
    }
    lines.join("\n").trim().to_owned()
}

/// Serializes the auxiliary deterministic text report.
#[must_use]
pub fn to_text_report(
    meta: &ReportMeta,
    groups: &ReportGroups<'_>,
    new_function_keys: Option<&BTreeSet<String>>,
    new_block_keys: Option<&BTreeSet<String>>,
) -> String {
    let trusted = baseline_is_trusted(meta);
    let meta_line = |label: &str, key: &str| {
        format!("{label}: {}", format_meta_text_value(meta.get(key)))
    };

    let mut lines = vec![
        "REPORT METADATA".to_owned(),
        format!("Report schema version: {REPORT_SCHEMA_VERSION}"),
        meta_line("CodeClone version", "codeclone_version"),
        meta_line("Python tag", "python_tag"),
        meta_line("Baseline path", "baseline_path"),
        meta_line("Baseline fingerprint version", "baseline_fingerprint_version"),
        meta_line("Baseline schema version", "baseline_schema_version"),
        meta_line("Baseline Python tag", "baseline_python_tag"),
        meta_line("Baseline generator name", "baseline_generator_name"),
        meta_line("Baseline generator version", "baseline_generator_version"),
        meta_line("Baseline payload sha256", "baseline_payload_sha256"),
        meta_line("Baseline loaded", "baseline_loaded"),
        meta_line("Baseline status", "baseline_status"),
        meta_line("Cache path", "cache_path"),
        meta_line("Cache schema version", "cache_schema_version"),
        meta_line("Cache status", "cache_status"),
        meta_line("Cache used", "cache_used"),
        meta_line("Source IO skipped", "files_skipped_source_io"),
    ];

    if !trusted {
        lines.push("Note: baseline is untrusted; all groups are treated as NEW.".to_owned());
    }

    let (functions_new, functions_known) = split_for(
        groups.functions.keys().cloned(),
        new_function_keys,
        trusted,
    );
    let (blocks_new, blocks_known) =
        split_for(groups.blocks.keys().cloned(), new_block_keys, trusted);
    let (segments_new, segments_known) = split_for(groups.segments.keys().cloned(), None, trusted);

    let sections: [(&str, Vec<String>, Vec<String>); 3] = [
        ("FUNCTION CLONES", functions_new, functions_known),
        ("BLOCK CLONES", blocks_new, blocks_known),
        ("SEGMENT CLONES", segments_new, segments_known),
    ];

    for (title, new_keys, known_keys) in sections {
        let (new_block_text, known_block_text) = match title {
            "FUNCTION CLONES" => (
                text_groups(groups.functions, &new_keys, "loc"),
                text_groups(groups.functions, &known_keys, "loc"),
            ),
            "BLOCK CLONES" => (
                text_groups(groups.blocks, &new_keys, "size"),
                text_groups(groups.blocks, &known_keys, "size"),
            ),
            _ => (
                text_groups(groups.segments, &new_keys, "size"),
                text_groups(groups.segments, &known_keys, "size"),
            ),
        };

        lines.push(String::new());
        lines.push(format!("{title} (NEW) (groups={})", new_keys.len()));
        lines.push(if new_block_text.is_empty() {
            "(none)".to_owned()
        } else {
            new_block_text
        });

        lines.push(String::new());
        lines.push(format!("{title} (KNOWN) (groups={})", known_keys.len()));
        lines.push(if known_block_text.is_empty() {
            "(none)".to_owned()
        } else {
            known_block_text
        });
    }

    let mut text = lines.join("\n").trim_end().to_owned();
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(filepath: &str, qualname: &str, start: usize) -> Unit {
        Unit {
            qualname: qualname.to_owned(),
            filepath: filepath.to_owned(),
            start_line: start,
            end_line: start + 19,
            loc: 20,
            stmt_count: 8,
            fingerprint: "fp".to_owned(),
            loc_bucket: "b1".to_owned(),
        }
    }

    fn sample_groups() -> GroupMap<Unit> {
        let mut groups = GroupMap::new();
        groups.insert(
            "fp|b1".to_owned(),
            vec![unit("/b.py", "b:g", 5), unit("/a.py", "a:f", 1)],
        );
        groups
    }

    fn empty_meta() -> ReportMeta {
        let mut meta = ReportMeta::new();
        meta.insert("baseline_loaded".to_owned(), Value::Bool(false));
        meta.insert(
            "baseline_status".to_owned(),
            Value::String("missing".to_owned()),
        );
        meta
    }

    #[test]
    fn test_json_report_is_deterministic_and_sorted() {
        let functions = sample_groups();
        let blocks = GroupMap::new();
        let segments = GroupMap::new();
        let groups = ReportGroups {
            functions: &functions,
            blocks: &blocks,
            segments: &segments,
        };
        let one = to_json_report(&empty_meta(), &groups, None, None, None);
        let two = to_json_report(&empty_meta(), &groups, None, None, None);
        assert_eq!(one, two);

        let parsed: Value = serde_json::from_str(&one).unwrap();
        let files: Vec<&str> = parsed["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(files, vec!["/a.py", "/b.py"]);
        // Items sorted by (file_index, qualname, start, end).
        let items = parsed["groups"]["functions"]["fp|b1"].as_array().unwrap();
        assert_eq!(items[0][0], 0);
        assert_eq!(items[1][0], 1);
    }

    #[test]
    fn test_untrusted_baseline_makes_all_new() {
        let functions = sample_groups();
        let blocks = GroupMap::new();
        let segments = GroupMap::new();
        let groups = ReportGroups {
            functions: &functions,
            blocks: &blocks,
            segments: &segments,
        };
        let known: BTreeSet<String> = BTreeSet::new();
        let report = to_json_report(&empty_meta(), &groups, None, Some(&known), None);
        let parsed: Value = serde_json::from_str(&report).unwrap();
        assert_eq!(
            parsed["groups_split"]["functions"]["new"]
                .as_array()
                .unwrap()
                .len(),
            1
        );
        assert!(parsed["groups_split"]["functions"]["known"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_trusted_baseline_splits_new_and_known() {
        let mut functions = sample_groups();
        functions.insert(
            "other|b1".to_owned(),
            vec![unit("/c.py", "c:h", 1), unit("/d.py", "d:i", 1)],
        );
        let blocks = GroupMap::new();
        let segments = GroupMap::new();
        let groups = ReportGroups {
            functions: &functions,
            blocks: &blocks,
            segments: &segments,
        };

        let mut meta = ReportMeta::new();
        meta.insert("baseline_loaded".to_owned(), Value::Bool(true));
        meta.insert("baseline_status".to_owned(), Value::String("ok".to_owned()));

        let new_keys: BTreeSet<String> = ["other|b1".to_owned()].into_iter().collect();
        let report = to_json_report(&meta, &groups, None, Some(&new_keys), None);
        let parsed: Value = serde_json::from_str(&report).unwrap();
        let split = &parsed["groups_split"]["functions"];
        assert_eq!(split["new"], json!(["other|b1"]));
        assert_eq!(split["known"], json!(["fp|b1"]));
        // Partition invariant: new ∪ known = all keys, new ∩ known = ∅.
        assert_eq!(
            split["new"].as_array().unwrap().len() + split["known"].as_array().unwrap().len(),
            parsed["groups"]["functions"].as_object().unwrap().len()
        );
    }

    #[test]
    fn test_text_report_contains_sections() {
        let functions = sample_groups();
        let blocks = GroupMap::new();
        let segments = GroupMap::new();
        let groups = ReportGroups {
            functions: &functions,
            blocks: &blocks,
            segments: &segments,
        };
        let text = to_text_report(&empty_meta(), &groups, None, None);
        assert!(text.contains("REPORT METADATA"));
        assert!(text.contains("FUNCTION CLONES (NEW) (groups=1)"));
        assert!(text.contains("BLOCK CLONES (NEW) (groups=0)"));
        assert!(text.contains("SEGMENT CLONES (KNOWN) (groups=0)"));
        assert!(text.contains("baseline is untrusted"));
    }
}
