//! Grouping, report-layer merging, explainability facts, and the
//! deterministic serializers.

mod explain;
mod grouping;
mod html;
mod merge;
mod segments;
mod serialize;
mod stmt_index;

pub use explain::build_block_group_facts;
pub use grouping::{build_block_groups, build_groups, build_segment_groups, GroupMap};
pub use html::build_html_report;
pub use merge::prepare_block_report_groups;
pub use segments::{prepare_segment_report_groups, SegmentReport};
pub use serialize::{to_json_report, to_text_report, ReportGroups, ReportMeta};
pub use stmt_index::StmtIndexCache;
