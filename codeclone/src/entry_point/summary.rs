//! Run summary rendering: a table in interactive mode, compact lines under
//! `--quiet`, plus the shared progress-bar factory.

use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;

/// Everything the end-of-run summary reports.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct RunSummary {
    pub files_found: usize,
    pub files_analyzed: usize,
    pub cache_hits: usize,
    pub files_skipped: usize,
    pub function_groups: usize,
    pub block_groups: usize,
    pub segment_groups: usize,
    pub suppressed_segment_groups: usize,
    pub new_clones: usize,
}

impl RunSummary {
    fn rows(&self) -> [(&'static str, usize); 9] {
        [
            ("Files found", self.files_found),
            ("Files analyzed", self.files_analyzed),
            ("Cache hits", self.cache_hits),
            ("Files skipped", self.files_skipped),
            ("Function clone groups", self.function_groups),
            ("Block clone groups", self.block_groups),
            ("Segment clone groups", self.segment_groups),
            ("Suppressed segment groups", self.suppressed_segment_groups),
            ("New clones (vs baseline)", self.new_clones),
        ]
    }

    /// Discovery accounting must balance; a mismatch indicates a driver bug
    /// worth surfacing to the user.
    fn accounting_balances(&self) -> bool {
        self.files_found == self.files_analyzed + self.cache_hits + self.files_skipped
    }
}

fn value_cell(label: &str, value: usize) -> Cell {
    let text = value.to_string();
    if value == 0 {
        return Cell::new(text);
    }
    match label {
        "New clones (vs baseline)" => Cell::new(text.red().bold().to_string()),
        "Suppressed segment groups" => Cell::new(text.yellow().to_string()),
        "Function clone groups" | "Block clone groups" | "Segment clone groups" => {
            Cell::new(text.yellow().bold().to_string())
        }
        _ => Cell::new(text),
    }
}

pub(super) fn print_summary<W: Write>(
    writer: &mut W,
    quiet: bool,
    summary: &RunSummary,
) -> std::io::Result<()> {
    if quiet {
        writeln!(writer, "Analysis Summary")?;
        writeln!(
            writer,
            "input: found={} analyzed={} cache_hits={} skipped={}",
            summary.files_found,
            summary.files_analyzed,
            summary.cache_hits,
            summary.files_skipped
        )?;
        writeln!(
            writer,
            "clones: function={} block={} segment={} suppressed={} new={}",
            summary.function_groups,
            summary.block_groups,
            summary.segment_groups,
            summary.suppressed_segment_groups,
            summary.new_clones
        )?;
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Metric", "Value"]);
        if cfg!(test) {
            table.set_width(80);
        }
        for (label, value) in summary.rows() {
            table.add_row(vec![Cell::new(label), value_cell(label, value)]);
        }
        writeln!(writer, "{table}")?;
    }

    if !summary.accounting_balances() {
        eprintln!(
            "{}",
            "warning: file accounting mismatch (found != analyzed + cache hits + skipped)"
                .yellow()
        );
    }
    Ok(())
}

/// Progress bar over the files pending analysis. Hidden in tests and when
/// progress is disabled.
pub(super) fn create_progress(total: usize, enabled: bool) -> ProgressBar {
    if cfg!(test) || !enabled || total == 0 {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    bar
}
