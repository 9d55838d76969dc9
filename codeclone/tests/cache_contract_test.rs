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

fn run_with_report(root: &Path, cache: &Path, report: &Path) -> (i32, Value) {
    let code = run(&[
        root.to_str().unwrap(),
        "--min-loc",
        "1",
        "--min-stmt",
        "1",
        "--cache-path",
        cache.to_str().unwrap(),
        "--json",
        report.to_str().unwrap(),
        "--no-progress",
        "--quiet",
        "--no-color",
    ]);
    let parsed = serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
    (code, parsed)
}

#[test]
fn test_cache_round_trip_reuses_entries() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("cache.json");
    let report = dir.path().join("report.json");
    write(dir.path(), "one.py", "def a(x):\n    return x + 1\n");
    write(dir.path(), "two.py", "def b(y):\n    return y + 1\n");

    let (code, first) = run_with_report(dir.path(), &cache, &report);
    assert_eq!(code, 0);
    assert!(cache.exists());

    // Second run hits the cache for every file and reports identically.
    let (code, second) = run_with_report(dir.path(), &cache, &report);
    assert_eq!(code, 0);
    assert_eq!(second["meta"]["cache_status"], "ok");
    assert_eq!(first["groups"], second["groups"]);
    assert_eq!(first["files"], second["files"]);
}

#[test]
fn test_tampered_cache_fails_open_with_identical_groups() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("cache.json");
    let report = dir.path().join("report.json");
    write(dir.path(), "one.py", "def a(x):\n    return x + 1\n");
    write(dir.path(), "two.py", "def b(y):\n    return y + 1\n");

    let (_, clean) = run_with_report(dir.path(), &cache, &report);

    // Corrupt the signature.
    let text = std::fs::read_to_string(&cache).unwrap();
    let sig_start = text.find("\"sig\":\"").unwrap() + 7;
    let mut tampered = text.clone();
    let replacement = if &text[sig_start..=sig_start] == "0" { "1" } else { "0" };
    tampered.replace_range(sig_start..=sig_start, replacement);
    std::fs::write(&cache, tampered).unwrap();

    let (code, degraded) = run_with_report(dir.path(), &cache, &report);
    assert_eq!(code, 0, "cache failures never fail the run");
    assert_eq!(degraded["meta"]["cache_status"], "integrity_failed");
    assert_eq!(degraded["meta"]["cache_used"], Value::Bool(false));
    // Identical analysis output with or without a usable cache.
    assert_eq!(clean["groups"], degraded["groups"]);
    assert_eq!(clean["groups_split"], degraded["groups_split"]);
    assert_eq!(clean["files"], degraded["files"]);
}

#[test]
fn test_stat_change_invalidates_only_that_file() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("cache.json");
    let report = dir.path().join("report.json");
    write(dir.path(), "one.py", "def a(x):\n    return x + 1\n");
    write(dir.path(), "two.py", "def b(y):\n    return y + 1\n");

    run_with_report(dir.path(), &cache, &report);

    // Changing one file's content changes the group structure on rerun.
    write(dir.path(), "one.py", "def a(x):\n    return x - 1\n");
    let (code, parsed) = run_with_report(dir.path(), &cache, &report);
    assert_eq!(code, 0);
    assert!(
        parsed["groups"]["functions"].as_object().unwrap().is_empty(),
        "the pair no longer matches after the edit"
    );
}

#[test]
fn test_corrupt_cache_json_fails_open() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("cache.json");
    let report = dir.path().join("report.json");
    write(dir.path(), "one.py", "def a(x):\n    return x + 1\n");
    std::fs::write(&cache, "{definitely not json").unwrap();

    let (code, parsed) = run_with_report(dir.path(), &cache, &report);
    assert_eq!(code, 0);
    assert_eq!(parsed["meta"]["cache_status"], "invalid_json");
}

#[test]
fn test_oversized_cache_fails_open() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("cache.json");
    let report = dir.path().join("report.json");
    write(dir.path(), "one.py", "def a(x):\n    return x + 1\n");

    // 1 MB limit; write more than that.
    std::fs::write(&cache, "x".repeat(2 * 1024 * 1024)).unwrap();
    let code = run(&[
        dir.path().to_str().unwrap(),
        "--min-loc",
        "1",
        "--min-stmt",
        "1",
        "--cache-path",
        cache.to_str().unwrap(),
        "--max-cache-size-mb",
        "1",
        "--json",
        report.to_str().unwrap(),
        "--no-progress",
        "--quiet",
        "--no-color",
    ]);
    assert_eq!(code, 0);
    let parsed: Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(parsed["meta"]["cache_status"], "too_large");
}
