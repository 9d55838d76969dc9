//! The run driver: scan, cache gate, parallel analysis, grouping, baseline
//! diff, report emission, exit-code decision.

use anyhow::Result;
use colored::Colorize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use super::args::Cli;
use super::summary::{create_progress, print_summary, RunSummary};
use crate::baseline::{Baseline, BaselineStatus};
use crate::cache::{file_stat_signature, Cache, CacheStatus, FileStat};
use crate::constants::CHUNK_SIZE;
use crate::contracts::{ExitCode, PYTHON_TAG};
use crate::errors::FileSkipReason;
use crate::extractor::{extract_units_from_source, BlockUnit, Extraction, SegmentUnit, Unit};
use crate::normalize::NormalizeConfig;
use crate::report::{
    build_block_groups, build_groups, build_html_report, build_segment_groups,
    build_block_group_facts, prepare_block_report_groups, prepare_segment_report_groups,
    to_json_report, to_text_report, ReportGroups, ReportMeta, StmtIndexCache,
};
use crate::scanner;
use crate::utils::{module_name_from_path, write_atomic};
use crate::CANCELLED;

const MB: u64 = 1024 * 1024;

/// Conventional exit code for an interrupted run; outside the gating
/// contract on purpose.
const EXIT_INTERRUPTED: i32 = 130;

struct FileOutcome {
    path: PathBuf,
    stat: FileStat,
    result: Result<Extraction, FileSkipReason>,
}

fn contract_error(message: &str) -> i32 {
    eprintln!("{}", format!("error: {message}").red().bold());
    ExitCode::ContractError.code()
}

fn validate_output_path(path: &Path, expected: &str, label: &str) -> Result<(), String> {
    let matches = path
        .extension()
        .map_or(false, |ext| ext.to_string_lossy().to_lowercase() == expected);
    if matches {
        Ok(())
    } else {
        Err(format!(
            "{label} output path must end with .{expected}: {}",
            path.display()
        ))
    }
}

#[allow(clippy::too_many_lines)]
pub(super) fn execute<W: Write>(cli: &Cli, writer: &mut W) -> Result<i32> {
    let quiet = cli.quiet || cli.ci;
    let no_color = cli.no_color || cli.ci;
    let fail_on_new = cli.fail_on_new || cli.ci;
    let gating = fail_on_new || cli.fail_threshold.is_some();

    if no_color {
        colored::control::set_override(false);
    }

    for (path, extension, label) in [
        (cli.html.as_deref(), "html", "HTML"),
        (cli.json.as_deref(), "json", "JSON"),
        (cli.text.as_deref(), "txt", "text"),
    ] {
        if let Some(path) = path {
            if let Err(message) = validate_output_path(path, extension, label) {
                return Ok(contract_error(&message));
            }
        }
    }

    let root = match scanner::resolve_root(&cli.root) {
        Ok(root) => root,
        Err(e) => return Ok(contract_error(&e.to_string())),
    };

    crate::install_interrupt_handler();

    if cli.verbose {
        eprintln!("[VERBOSE] codeclone v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("[VERBOSE] Scanning root: {}", root.display());
        eprintln!("[VERBOSE] Workers: {}", cli.processes.max(1));
    }

    let files = match scanner::iter_py_files(&root) {
        Ok(files) => files,
        Err(e) => return Ok(contract_error(&e.to_string())),
    };

    let cache_path = cli
        .cache_path
        .clone()
        .unwrap_or_else(|| root.join(".cache").join("codeclone").join("cache.json"));
    let mut cache = Cache::new(&cache_path, &root, cli.max_cache_size_mb * MB);
    cache.load();
    if let Some(warning) = &cache.warning {
        eprintln!("{}", format!("warning: {warning}").yellow());
    }

    // Discovery: reuse cached results wholesale when the stat signature
    // matches, otherwise queue the file for analysis.
    let mut all_units: Vec<Unit> = Vec::new();
    let mut all_blocks: Vec<BlockUnit> = Vec::new();
    let mut all_segments: Vec<SegmentUnit> = Vec::new();
    let mut pending: Vec<(PathBuf, FileStat)> = Vec::new();
    let mut cache_hits = 0usize;
    let mut skipped_source_io = 0usize;
    let mut skipped_parse = 0usize;

    for file in &files {
        let path_str = file.to_string_lossy();
        match file_stat_signature(file) {
            Ok(stat) => {
                let hit = cache
                    .get_file_entry(&path_str)
                    .filter(|entry| entry.stat == stat)
                    .cloned();
                if let Some(entry) = hit {
                    all_units.extend(entry.units);
                    all_blocks.extend(entry.blocks);
                    all_segments.extend(entry.segments);
                    cache_hits += 1;
                } else {
                    pending.push((file.clone(), stat));
                }
            }
            Err(e) => {
                eprintln!(
                    "{}",
                    format!("warning: skipping {path_str}: {e}").yellow()
                );
                skipped_source_io += 1;
            }
        }
    }

    let progress = create_progress(pending.len(), !cli.no_progress && !quiet);
    let config = NormalizeConfig::default();
    let mut outcomes = analyze_files(&pending, &root, &config, cli, &progress);
    progress.finish_and_clear();

    if CANCELLED.load(Ordering::Relaxed) {
        eprintln!("Interrupted; no baseline or cache written.");
        return Ok(EXIT_INTERRUPTED);
    }

    // Worker completion order is not observable: everything is re-sorted by
    // path before reduction.
    outcomes.sort_by(|a, b| a.path.cmp(&b.path));
    let mut files_analyzed = 0usize;
    for outcome in outcomes {
        let path_str = outcome.path.to_string_lossy().into_owned();
        match outcome.result {
            Ok(extraction) => {
                cache.put_file_entry(
                    &path_str,
                    outcome.stat,
                    extraction.units.clone(),
                    extraction.blocks.clone(),
                    extraction.segments.clone(),
                );
                all_units.extend(extraction.units);
                all_blocks.extend(extraction.blocks);
                all_segments.extend(extraction.segments);
                files_analyzed += 1;
            }
            Err(reason) => {
                eprintln!(
                    "{}",
                    format!("warning: skipping {path_str}: {reason}").yellow()
                );
                if reason.is_source_io() {
                    skipped_source_io += 1;
                } else {
                    skipped_parse += 1;
                }
            }
        }
    }

    // Unreadable sources void the gate: deferred so the report still
    // reflects the run, then reported as a contract error.
    let mut contract_failure: Option<String> = None;
    if gating && skipped_source_io > 0 {
        contract_failure = Some(format!(
            "{skipped_source_io} source file(s) could not be read in gating mode"
        ));
    }

    let func_groups = build_groups(&all_units);
    let block_groups = build_block_groups(&all_blocks);
    let segment_groups = build_segment_groups(&all_segments);

    let func_keys: BTreeSet<String> = func_groups.keys().cloned().collect();
    let block_keys: BTreeSet<String> = block_groups.keys().cloned().collect();

    if let Err(e) = cache.save() {
        return Ok(contract_error(&format!(
            "failed to save cache at {}: {e}",
            cache_path.display()
        )));
    }

    // Baseline: read-only during gating; rewritten (and re-read) only in
    // update mode.
    let mut baseline = Baseline::load(&cli.baseline, cli.max_baseline_size_mb * MB);
    if cli.update_baseline {
        let fresh = Baseline::from_keys(
            &cli.baseline,
            func_keys.iter().cloned(),
            block_keys.iter().cloned(),
        );
        if let Err(e) = fresh.save() {
            return Ok(contract_error(&format!(
                "failed to save baseline at {}: {e}",
                cli.baseline.display()
            )));
        }
        writeln!(writer, "Baseline updated: {}", cli.baseline.display())?;
        baseline = Baseline::load(&cli.baseline, cli.max_baseline_size_mb * MB);
    }

    if !baseline.is_trusted() {
        let status = baseline.status.as_str();
        if gating && contract_failure.is_none() {
            contract_failure = Some(format!(
                "baseline at {} is untrusted (status: {status}) in gating mode",
                cli.baseline.display()
            ));
        } else if baseline.status == BaselineStatus::Missing {
            eprintln!(
                "{}",
                format!(
                    "warning: baseline not found at {}; comparing against an empty baseline. \
                     Use --update-baseline to create it.",
                    cli.baseline.display()
                )
                .yellow()
            );
        } else {
            eprintln!(
                "{}",
                format!(
                    "warning: baseline at {} is untrusted (status: {status}); \
                     comparing against an empty baseline.",
                    cli.baseline.display()
                )
                .yellow()
            );
        }
    }

    let (new_functions, new_blocks) = if baseline.is_trusted() {
        baseline.diff(&func_keys, &block_keys)
    } else {
        (func_keys.clone(), block_keys.clone())
    };

    // Report preparation (merging and suppression are report-only).
    let mut index_cache = StmtIndexCache::new();
    let prepared_blocks = prepare_block_report_groups(&block_groups);
    let segment_report = prepare_segment_report_groups(&segment_groups, &mut index_cache);
    let block_facts = build_block_group_facts(&prepared_blocks, &mut index_cache);

    let meta = build_meta(
        &cli.baseline,
        &baseline,
        &cache_path,
        &cache,
        skipped_source_io,
    );
    let report_groups = ReportGroups {
        functions: &func_groups,
        blocks: &prepared_blocks,
        segments: &segment_report.groups,
    };

    if let Some(path) = &cli.json {
        let content = to_json_report(
            &meta,
            &report_groups,
            Some(&block_facts),
            Some(&new_functions),
            Some(&new_blocks),
        );
        if let Err(e) = write_atomic(path, &content) {
            return Ok(contract_error(&format!(
                "failed to write JSON report to {}: {e}",
                path.display()
            )));
        }
        if !quiet {
            writeln!(writer, "JSON report saved: {}", path.display())?;
        }
    }

    if let Some(path) = &cli.text {
        let content = to_text_report(&meta, &report_groups, Some(&new_functions), Some(&new_blocks));
        if let Err(e) = write_atomic(path, &content) {
            return Ok(contract_error(&format!(
                "failed to write text report to {}: {e}",
                path.display()
            )));
        }
        if !quiet {
            writeln!(writer, "Text report saved: {}", path.display())?;
        }
    }

    if let Some(path) = &cli.html {
        let content = build_html_report(&meta, &report_groups);
        if let Err(e) = write_atomic(path, &content) {
            return Ok(contract_error(&format!(
                "failed to write HTML report to {}: {e}",
                path.display()
            )));
        }
        if !quiet {
            writeln!(writer, "HTML report saved: {}", path.display())?;
        }
    }

    let summary = RunSummary {
        files_found: files.len(),
        files_analyzed,
        cache_hits,
        files_skipped: skipped_source_io + skipped_parse,
        function_groups: func_groups.len(),
        block_groups: block_groups.len(),
        segment_groups: segment_report.groups.len(),
        suppressed_segment_groups: segment_report.suppressed,
        new_clones: new_functions.len() + new_blocks.len(),
    };
    print_summary(writer, quiet, &summary)?;

    // Exit decision. Contract errors override gating failures.
    if let Some(message) = contract_failure {
        return Ok(contract_error(&message));
    }

    if fail_on_new && (!new_functions.is_empty() || !new_blocks.is_empty()) {
        writeln!(writer, "{}", "FAILED: new code clones detected".red().bold())?;
        if !new_functions.is_empty() {
            writeln!(
                writer,
                "  new function groups: {}",
                new_functions.iter().cloned().collect::<Vec<_>>().join(", ")
            )?;
        }
        if !new_blocks.is_empty() {
            writeln!(
                writer,
                "  new block groups: {}",
                new_blocks.iter().cloned().collect::<Vec<_>>().join(", ")
            )?;
        }
        return Ok(ExitCode::GatingFailure.code());
    }

    if let Some(threshold) = cli.fail_threshold {
        let total = func_groups.len() + block_groups.len();
        if total > threshold {
            writeln!(
                writer,
                "{}",
                format!("FAILED: total clone groups ({total}) exceed threshold ({threshold})")
                    .red()
                    .bold()
            )?;
            return Ok(ExitCode::GatingFailure.code());
        }
    }

    if !gating && !cli.update_baseline && summary.new_clones > 0 {
        writeln!(
            writer,
            "New clones detected but --fail-on-new not set. \
             Run with --update-baseline to accept them."
        )?;
    }

    Ok(ExitCode::Success.code())
}

/// File-level analysis on a dedicated worker pool; workers own their inputs
/// exclusively and return typed per-file outcomes. Falls back to sequential
/// processing when the pool cannot be spawned.
fn analyze_files(
    pending: &[(PathBuf, FileStat)],
    root: &Path,
    config: &NormalizeConfig,
    cli: &Cli,
    progress: &indicatif::ProgressBar,
) -> Vec<FileOutcome> {
    use rayon::prelude::*;

    let process = |(path, stat): &(PathBuf, FileStat)| -> Option<FileOutcome> {
        if CANCELLED.load(Ordering::Relaxed) {
            return None;
        }
        let outcome = process_file(path, *stat, root, config, cli.min_loc, cli.min_stmt);
        progress.inc(1);
        Some(outcome)
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.processes.max(1))
        .build();

    let mut outcomes = Vec::with_capacity(pending.len());
    match pool {
        Ok(pool) => {
            for chunk in pending.chunks(CHUNK_SIZE) {
                if CANCELLED.load(Ordering::Relaxed) {
                    break;
                }
                let chunk_outcomes: Vec<FileOutcome> =
                    pool.install(|| chunk.par_iter().filter_map(process).collect());
                outcomes.extend(chunk_outcomes);
            }
        }
        Err(_) => {
            outcomes.extend(pending.iter().filter_map(process));
        }
    }
    outcomes
}

fn process_file(
    path: &Path,
    stat: FileStat,
    root: &Path,
    config: &NormalizeConfig,
    min_loc: usize,
    min_stmt: usize,
) -> FileOutcome {
    let source = match scanner::read_source(path) {
        Ok(source) => source,
        Err(reason) => {
            return FileOutcome {
                path: path.to_path_buf(),
                stat,
                result: Err(reason),
            }
        }
    };

    let module_name = module_name_from_path(root, path);
    let result = extract_units_from_source(
        &source,
        &path.to_string_lossy(),
        &module_name,
        config,
        min_loc,
        min_stmt,
    )
    .map_err(FileSkipReason::Parse);

    FileOutcome {
        path: path.to_path_buf(),
        stat,
        result,
    }
}

fn build_meta(
    baseline_path: &Path,
    baseline: &Baseline,
    cache_path: &Path,
    cache: &Cache,
    skipped_source_io: usize,
) -> ReportMeta {
    let opt_str = |value: &Option<String>| match value {
        Some(s) => Value::String(s.clone()),
        None => Value::Null,
    };

    let mut meta = ReportMeta::new();
    meta.insert(
        "codeclone_version".to_owned(),
        Value::String(env!("CARGO_PKG_VERSION").to_owned()),
    );
    meta.insert("python_tag".to_owned(), Value::String(PYTHON_TAG.to_owned()));
    meta.insert(
        "baseline_path".to_owned(),
        Value::String(baseline_path.display().to_string()),
    );
    meta.insert(
        "baseline_fingerprint_version".to_owned(),
        opt_str(&baseline.fingerprint_version),
    );
    meta.insert(
        "baseline_schema_version".to_owned(),
        opt_str(&baseline.schema_version),
    );
    meta.insert("baseline_python_tag".to_owned(), opt_str(&baseline.python_tag));
    meta.insert(
        "baseline_generator_name".to_owned(),
        opt_str(&baseline.generator_name),
    );
    meta.insert(
        "baseline_generator_version".to_owned(),
        opt_str(&baseline.generator_version),
    );
    meta.insert(
        "baseline_payload_sha256".to_owned(),
        opt_str(&baseline.payload_sha256),
    );
    meta.insert(
        "baseline_payload_sha256_verified".to_owned(),
        Value::Bool(baseline.is_trusted()),
    );
    meta.insert(
        "baseline_loaded".to_owned(),
        Value::Bool(baseline.status != BaselineStatus::Missing),
    );
    meta.insert(
        "baseline_status".to_owned(),
        Value::String(baseline.status.as_str().to_owned()),
    );
    meta.insert(
        "cache_path".to_owned(),
        Value::String(cache_path.display().to_string()),
    );
    meta.insert(
        "cache_schema_version".to_owned(),
        match &cache.schema_version {
            Some(v) => Value::String(v.clone()),
            None => Value::Null,
        },
    );
    meta.insert(
        "cache_status".to_owned(),
        Value::String(cache.status.as_str().to_owned()),
    );
    meta.insert(
        "cache_used".to_owned(),
        Value::Bool(cache.status == CacheStatus::Ok),
    );
    meta.insert(
        "files_skipped_source_io".to_owned(),
        Value::from(skipped_source_io),
    );
    meta
}
