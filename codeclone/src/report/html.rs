//! Minimal deterministic HTML rendering: the report metadata and the group
//! listings in a plain page. Rich rendering (snippets, highlighting) is a
//! separate concern and not part of this crate.

use super::grouping::GroupMap;
use super::serialize::{ReportGroups, ReportMeta};
use serde_json::Value;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn meta_value(meta: &ReportMeta, key: &str) -> String {
    match meta.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => escape(s.trim()),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "(none)".to_owned(),
    }
}

fn section<T>(out: &mut String, title: &str, groups: &GroupMap<T>, describe: impl Fn(&T) -> String) {
    out.push_str(&format!(
        "<h2>{} ({} groups)</h2>\n",
        escape(title),
        groups.len()
    ));
    if groups.is_empty() {
        out.push_str("<p>(none)</p>\n");
        return;
    }
    for (key, items) in groups {
        out.push_str(&format!(
            "<h3><code>{}</code> (count={})</h3>\n<ul>\n",
            escape(key),
            items.len()
        ));
        for item in items {
            out.push_str(&format!("<li>{}</li>\n", describe(item)));
        }
        out.push_str("</ul>\n");
    }
}

/// Renders the report as a single self-contained HTML document.
#[must_use]
pub fn build_html_report(meta: &ReportMeta, groups: &ReportGroups<'_>) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>CodeClone Report</title>\n");
    out.push_str(
        "<style>body{font-family:monospace;margin:2em}code{background:#eee;padding:0 2px}</style>\n",
    );
    out.push_str("</head>\n<body>\n<h1>CodeClone Report</h1>\n");

    out.push_str("<table>\n");
    for (label, key) in [
        ("Version", "codeclone_version"),
        ("Python tag", "python_tag"),
        ("Baseline status", "baseline_status"),
        ("Cache status", "cache_status"),
    ] {
        out.push_str(&format!(
            "<tr><td>{label}</td><td>{}</td></tr>\n",
            meta_value(meta, key)
        ));
    }
    out.push_str("</table>\n");

    section(&mut out, "Function clones", groups.functions, |u| {
        format!(
            "{} {}:{}-{} loc={}",
            escape(&u.qualname),
            escape(&u.filepath),
            u.start_line,
            u.end_line,
            u.loc
        )
    });
    section(&mut out, "Block clones", groups.blocks, |b| {
        format!(
            "{} {}:{}-{} size={}",
            escape(&b.qualname),
            escape(&b.filepath),
            b.start_line,
            b.end_line,
            b.size
        )
    });
    section(&mut out, "Segment clones", groups.segments, |s| {
        format!(
            "{} {}:{}-{} size={}",
            escape(&s.qualname),
            escape(&s.filepath),
            s.start_line,
            s.end_line,
            s.size
        )
    });

    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_covers_html_metacharacters() {
        assert_eq!(
            escape("<a href=\"x\">&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_report_is_a_complete_document() {
        let functions = GroupMap::new();
        let blocks = GroupMap::new();
        let segments = GroupMap::new();
        let groups = ReportGroups {
            functions: &functions,
            blocks: &blocks,
            segments: &segments,
        };
        let html = build_html_report(&ReportMeta::new(), &groups);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Function clones (0 groups)"));
        assert!(html.ends_with("</html>\n"));
    }
}
