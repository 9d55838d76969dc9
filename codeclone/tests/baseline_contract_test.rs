#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use codeclone::entry_point::run_with_args_to;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn run(args: &[&str]) -> i32 {
    let mut out: Vec<u8> = Vec::new();
    run_with_args_to(args.iter().map(|s| (*s).to_owned()).collect(), &mut out)
        .expect("driver runs")
}

fn write(root: &Path, name: &str, source: &str) {
    std::fs::write(root.join(name), source).unwrap();
}

fn clone_pair(root: &Path) {
    write(root, "one.py", "def a(x):\n    return x + 1\n");
    write(root, "two.py", "def b(y):\n    return y + 1\n");
}

#[test]
fn test_legacy_baseline_rejected_in_ci() {
    let dir = TempDir::new().unwrap();
    clone_pair(dir.path());
    let baseline = dir.path().join("baseline.json");
    std::fs::write(&baseline, r#"{"functions": ["a"], "blocks": []}"#).unwrap();

    let report = dir.path().join("report.json");
    let code = run(&[
        dir.path().to_str().unwrap(),
        "--min-loc",
        "1",
        "--min-stmt",
        "1",
        "--baseline",
        baseline.to_str().unwrap(),
        "--json",
        report.to_str().unwrap(),
        "--ci",
        "--no-progress",
    ]);
    assert_eq!(code, 2, "legacy layout is a contract error under --ci");

    let parsed: Value =
        serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
    assert_eq!(parsed["meta"]["baseline_status"], "missing_fields");
    // Untrusted baseline: every group key is NEW.
    assert!(parsed["groups_split"]["functions"]["known"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn test_untrusted_baseline_is_warning_in_normal_mode() {
    let dir = TempDir::new().unwrap();
    clone_pair(dir.path());
    let baseline = dir.path().join("baseline.json");
    std::fs::write(&baseline, r#"{"functions": [], "blocks": []}"#).unwrap();

    let code = run(&[
        dir.path().to_str().unwrap(),
        "--min-loc",
        "1",
        "--min-stmt",
        "1",
        "--baseline",
        baseline.to_str().unwrap(),
        "--no-progress",
        "--quiet",
        "--no-color",
    ]);
    assert_eq!(code, 0, "normal mode diffs against empty and succeeds");
}

#[test]
fn test_python_tag_mismatch_gates() {
    let dir = TempDir::new().unwrap();
    clone_pair(dir.path());
    let baseline = dir.path().join("baseline.json");

    // Create a valid baseline, then rewrite it as if produced under a
    // different parser tag (with a matching payload hash so only the tag
    // gate trips).
    let code = run(&[
        dir.path().to_str().unwrap(),
        "--min-loc",
        "1",
        "--min-stmt",
        "1",
        "--baseline",
        baseline.to_str().unwrap(),
        "--update-baseline",
        "--no-progress",
        "--quiet",
        "--no-color",
    ]);
    assert_eq!(code, 0);

    let text = std::fs::read_to_string(&baseline).unwrap();
    let mut doc: Value = serde_json::from_str(&text).unwrap();
    doc["meta"]["python_tag"] = Value::String("cp311".to_owned());
    std::fs::write(&baseline, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    let report = dir.path().join("report.json");
    let code = run(&[
        dir.path().to_str().unwrap(),
        "--min-loc",
        "1",
        "--min-stmt",
        "1",
        "--baseline",
        baseline.to_str().unwrap(),
        "--json",
        report.to_str().unwrap(),
        "--ci",
        "--no-progress",
    ]);
    assert_eq!(code, 2, "tag mismatch is a contract error in gating mode");

    let parsed: Value =
        serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
    assert_eq!(parsed["meta"]["baseline_status"], "mismatch_python_version");

    // Normal mode only warns.
    let code = run(&[
        dir.path().to_str().unwrap(),
        "--min-loc",
        "1",
        "--min-stmt",
        "1",
        "--baseline",
        baseline.to_str().unwrap(),
        "--no-progress",
        "--quiet",
        "--no-color",
    ]);
    assert_eq!(code, 0);
}

#[test]
fn test_baseline_written_by_update_is_trusted_and_complete() {
    let dir = TempDir::new().unwrap();
    clone_pair(dir.path());
    let baseline = dir.path().join("baseline.json");

    let code = run(&[
        dir.path().to_str().unwrap(),
        "--min-loc",
        "1",
        "--min-stmt",
        "1",
        "--baseline",
        baseline.to_str().unwrap(),
        "--update-baseline",
        "--no-progress",
        "--quiet",
        "--no-color",
    ]);
    assert_eq!(code, 0);

    let doc: Value =
        serde_json::from_str(&std::fs::read_to_string(&baseline).unwrap()).unwrap();
    assert_eq!(doc["meta"]["generator"]["name"], "codeclone");
    assert_eq!(doc["meta"]["schema_version"], "1.0");
    assert_eq!(doc["meta"]["fingerprint_version"], "1");
    assert!(doc["meta"]["payload_sha256"].is_string());
    assert!(doc["meta"]["created_at"].is_string());
    // The rename-invariant pair collapses into one function group key.
    assert_eq!(doc["clones"]["functions"].as_array().unwrap().len(), 1);
    assert!(doc["clones"]["blocks"].as_array().unwrap().is_empty());

    // Sorted and unique.
    let functions: Vec<&str> = doc["clones"]["functions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    let mut sorted = functions.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(functions, sorted);
}

#[test]
fn test_tampered_baseline_fails_integrity_gate() {
    let dir = TempDir::new().unwrap();
    clone_pair(dir.path());
    let baseline = dir.path().join("baseline.json");

    let code = run(&[
        dir.path().to_str().unwrap(),
        "--min-loc",
        "1",
        "--min-stmt",
        "1",
        "--baseline",
        baseline.to_str().unwrap(),
        "--update-baseline",
        "--no-progress",
        "--quiet",
        "--no-color",
    ]);
    assert_eq!(code, 0);

    // Inject a key without recomputing the payload hash.
    let text = std::fs::read_to_string(&baseline).unwrap();
    let mut doc: Value = serde_json::from_str(&text).unwrap();
    doc["clones"]["blocks"] = serde_json::json!(["deadbeef"]);
    std::fs::write(&baseline, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    let report = dir.path().join("report.json");
    let code = run(&[
        dir.path().to_str().unwrap(),
        "--min-loc",
        "1",
        "--min-stmt",
        "1",
        "--baseline",
        baseline.to_str().unwrap(),
        "--json",
        report.to_str().unwrap(),
        "--ci",
        "--no-progress",
    ]);
    assert_eq!(code, 2);

    let parsed: Value =
        serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
    assert_eq!(parsed["meta"]["baseline_status"], "integrity_failed");
}
