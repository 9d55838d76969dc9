//! The incremental cache contract: integrity-checked, keyed on per-file
//! stat signatures, and always fail-open — any trust failure downgrades to
//! an empty in-memory cache with a warning, never an error.

use rustc_hash::FxHashMap;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::canonical_json::canonical_json;
use crate::constants::MAX_CACHE_SIZE_BYTES;
use crate::contracts::{CACHE_VERSION, FINGERPRINT_VERSION, PYTHON_TAG};
use crate::extractor::{BlockUnit, SegmentUnit, Unit};
use crate::hashing::{constant_time_eq, sha256_hex};
use crate::utils::write_atomic;

/// Domain separation for the payload signature. The cache is tamper-evident
/// rather than secret, so the "key" is a fixed process-scope policy string.
const CACHE_SIG_DOMAIN: &str = "codeclone.cache.v1:";

/// Exactly one status per load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Ok,
    Missing,
    TooLarge,
    Unreadable,
    InvalidJson,
    InvalidType,
    VersionMismatch,
    PythonTagMismatch,
    FingerprintMismatch,
    IntegrityFailed,
}

impl CacheStatus {
    /// Wire spelling used in reports and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Missing => "missing",
            Self::TooLarge => "too_large",
            Self::Unreadable => "unreadable",
            Self::InvalidJson => "invalid_json",
            Self::InvalidType => "invalid_type",
            Self::VersionMismatch => "version_mismatch",
            Self::PythonTagMismatch => "python_tag_mismatch",
            Self::FingerprintMismatch => "mismatch_fingerprint_version",
            Self::IntegrityFailed => "integrity_failed",
        }
    }
}

/// Per-file freshness signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub mtime_ns: u64,
    pub size: u64,
}

/// Stat signature of a file on disk.
///
/// # Errors
///
/// Propagates the underlying metadata error.
pub fn file_stat_signature(path: &Path) -> std::io::Result<FileStat> {
    let metadata = std::fs::metadata(path)?;
    let mtime_ns = metadata
        .modified()?
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
    Ok(FileStat {
        mtime_ns,
        size: metadata.len(),
    })
}

/// Everything previously computed for one file.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub stat: FileStat,
    pub units: Vec<Unit>,
    pub blocks: Vec<BlockUnit>,
    pub segments: Vec<SegmentUnit>,
}

/// The cache document: `{v, payload: {py, fp, files}, sig}` on disk, a
/// runtime-path-keyed map in memory.
#[derive(Debug)]
pub struct Cache {
    path: PathBuf,
    root: PathBuf,
    max_size_bytes: u64,
    pub status: CacheStatus,
    pub warning: Option<String>,
    pub schema_version: Option<String>,
    files: FxHashMap<String, CacheEntry>,
}

impl Cache {
    #[must_use]
    pub fn new(path: &Path, root: &Path, max_size_bytes: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
            max_size_bytes: if max_size_bytes == 0 {
                MAX_CACHE_SIZE_BYTES
            } else {
                max_size_bytes
            },
            status: CacheStatus::Missing,
            warning: None,
            schema_version: None,
            files: FxHashMap::default(),
        }
    }

    fn ignore(&mut self, status: CacheStatus, message: String) {
        self.status = status;
        self.warning = Some(message);
        self.files.clear();
    }

    /// Loads the cache file, fail-open on every trust failure.
    pub fn load(&mut self) {
        let size = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.status = CacheStatus::Missing;
                return;
            }
            Err(e) => {
                self.ignore(
                    CacheStatus::Unreadable,
                    format!("Cache unreadable; ignoring cache: {e}"),
                );
                return;
            }
        };
        if size > self.max_size_bytes {
            self.ignore(
                CacheStatus::TooLarge,
                format!(
                    "Cache file too large ({size} bytes, max {}); ignoring cache.",
                    self.max_size_bytes
                ),
            );
            return;
        }

        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                self.ignore(
                    CacheStatus::Unreadable,
                    format!("Cache unreadable; ignoring cache: {e}"),
                );
                return;
            }
        };
        let Ok(document) = serde_json::from_str::<Value>(&text) else {
            self.ignore(
                CacheStatus::InvalidJson,
                "Cache corrupted; ignoring cache.".to_owned(),
            );
            return;
        };
        self.parse_document(&document);
    }

    fn parse_document(&mut self, document: &Value) {
        let Some(root) = document.as_object() else {
            self.ignore(
                CacheStatus::InvalidType,
                "Cache format invalid; ignoring cache.".to_owned(),
            );
            return;
        };

        let Some(version) = root.get("v").and_then(Value::as_str) else {
            self.ignore(
                CacheStatus::InvalidType,
                "Cache format invalid; ignoring cache.".to_owned(),
            );
            return;
        };
        let version = version.to_owned();
        if version != CACHE_VERSION {
            self.schema_version = Some(version.clone());
            self.ignore(
                CacheStatus::VersionMismatch,
                format!("Cache version mismatch (found {version}); ignoring cache."),
            );
            return;
        }

        let (Some(signature), Some(payload)) = (
            root.get("sig").and_then(Value::as_str),
            root.get("payload").and_then(Value::as_object),
        ) else {
            self.ignore(
                CacheStatus::InvalidType,
                "Cache format invalid; ignoring cache.".to_owned(),
            );
            return;
        };

        let payload_value = Value::Object(payload.clone());
        let expected = sign_payload(&payload_value);
        if !constant_time_eq(signature, &expected) {
            self.schema_version = Some(version);
            self.ignore(
                CacheStatus::IntegrityFailed,
                "Cache signature mismatch; ignoring cache.".to_owned(),
            );
            return;
        }

        match payload.get("py").and_then(Value::as_str) {
            Some(tag) if tag == PYTHON_TAG => {}
            Some(tag) => {
                self.schema_version = Some(version);
                self.ignore(
                    CacheStatus::PythonTagMismatch,
                    format!(
                        "Cache python tag mismatch (found {tag}, expected {PYTHON_TAG}); ignoring cache."
                    ),
                );
                return;
            }
            None => {
                self.ignore(
                    CacheStatus::InvalidType,
                    "Cache format invalid; ignoring cache.".to_owned(),
                );
                return;
            }
        }

        match payload.get("fp").and_then(Value::as_str) {
            Some(fp) if fp == FINGERPRINT_VERSION => {}
            Some(fp) => {
                self.schema_version = Some(version);
                self.ignore(
                    CacheStatus::FingerprintMismatch,
                    format!(
                        "Cache fingerprint version mismatch (found {fp}, expected {FINGERPRINT_VERSION}); ignoring cache."
                    ),
                );
                return;
            }
            None => {
                self.ignore(
                    CacheStatus::InvalidType,
                    "Cache format invalid; ignoring cache.".to_owned(),
                );
                return;
            }
        }

        let Some(files) = payload.get("files").and_then(Value::as_object) else {
            self.ignore(
                CacheStatus::InvalidType,
                "Cache format invalid; ignoring cache.".to_owned(),
            );
            return;
        };

        let mut parsed = FxHashMap::default();
        for (wire_path, entry_value) in files {
            let runtime_path = self.runtime_path_from_wire(wire_path);
            let Some(entry) = decode_wire_entry(entry_value, &runtime_path) else {
                self.ignore(
                    CacheStatus::InvalidType,
                    "Cache format invalid; ignoring cache.".to_owned(),
                );
                return;
            };
            parsed.insert(runtime_path, entry);
        }

        self.schema_version = Some(version);
        self.status = CacheStatus::Ok;
        self.files = parsed;
    }

    /// Writes the cache atomically with a fresh signature.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; the caller treats it as a contract
    /// error.
    pub fn save(&self) -> std::io::Result<()> {
        let mut wire_files = BTreeMap::new();
        for (runtime_path, entry) in &self.files {
            let wire_path = self.wire_path_from_runtime(runtime_path);
            wire_files.insert(wire_path, encode_wire_entry(entry));
        }

        let payload = json!({
            "py": PYTHON_TAG,
            "fp": FINGERPRINT_VERSION,
            "files": wire_files,
        });
        let document = json!({
            "v": CACHE_VERSION,
            "payload": payload,
            "sig": sign_payload(&payload),
        });

        write_atomic(&self.path, &canonical_json(&document))
    }

    /// Cached entry for `filepath` whose stat signature must be compared by
    /// the caller; `None` when the file was never cached.
    #[must_use]
    pub fn get_file_entry(&self, filepath: &str) -> Option<&CacheEntry> {
        self.files.get(filepath)
    }

    /// Records the analysis results for one file.
    pub fn put_file_entry(
        &mut self,
        filepath: &str,
        stat: FileStat,
        units: Vec<Unit>,
        blocks: Vec<BlockUnit>,
        segments: Vec<SegmentUnit>,
    ) {
        self.files.insert(
            filepath.to_owned(),
            CacheEntry {
                stat,
                units,
                blocks,
                segments,
            },
        );
    }

    /// Wire paths are relative to the scan root with `/` separators, so a
    /// relocated checkout keeps its cache.
    fn wire_path_from_runtime(&self, runtime_path: &str) -> String {
        let path = Path::new(runtime_path);
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn runtime_path_from_wire(&self, wire_path: &str) -> String {
        let wire = Path::new(wire_path);
        if wire.is_absolute() {
            return wire_path.to_owned();
        }
        let mut combined = self.root.clone();
        for part in wire_path.split('/') {
            combined.push(part);
        }
        combined.to_string_lossy().into_owned()
    }
}

fn sign_payload(payload: &Value) -> String {
    sha256_hex(&format!("{CACHE_SIG_DOMAIN}{}", canonical_json(payload)))
}

// ---------- Wire codec ----------
//
// Per-file record: {st: [mtime_ns, size], u: [...], b: [...], s: [...]}
// with positional arrays (u: 7 fields, b: 5, s: 6); empty arrays omitted.

fn encode_wire_entry(entry: &CacheEntry) -> Value {
    let mut wire = serde_json::Map::new();
    wire.insert(
        "st".to_owned(),
        json!([entry.stat.mtime_ns, entry.stat.size]),
    );

    let mut units = entry.units.clone();
    units.sort_by(|a, b| {
        (&a.qualname, a.start_line, a.end_line, &a.fingerprint)
            .cmp(&(&b.qualname, b.start_line, b.end_line, &b.fingerprint))
    });
    if !units.is_empty() {
        let rows: Vec<Value> = units
            .iter()
            .map(|u| {
                json!([
                    u.qualname,
                    u.start_line,
                    u.end_line,
                    u.loc,
                    u.stmt_count,
                    u.fingerprint,
                    u.loc_bucket
                ])
            })
            .collect();
        wire.insert("u".to_owned(), Value::Array(rows));
    }

    let mut blocks = entry.blocks.clone();
    blocks.sort_by(|a, b| {
        (&a.qualname, a.start_line, a.end_line, &a.block_hash)
            .cmp(&(&b.qualname, b.start_line, b.end_line, &b.block_hash))
    });
    if !blocks.is_empty() {
        let rows: Vec<Value> = blocks
            .iter()
            .map(|b| json!([b.qualname, b.start_line, b.end_line, b.size, b.block_hash]))
            .collect();
        wire.insert("b".to_owned(), Value::Array(rows));
    }

    let mut segments = entry.segments.clone();
    segments.sort_by(|a, b| {
        (&a.qualname, a.start_line, a.end_line, &a.segment_hash)
            .cmp(&(&b.qualname, b.start_line, b.end_line, &b.segment_hash))
    });
    if !segments.is_empty() {
        let rows: Vec<Value> = segments
            .iter()
            .map(|s| {
                json!([
                    s.qualname,
                    s.start_line,
                    s.end_line,
                    s.size,
                    s.segment_hash,
                    s.segment_sig
                ])
            })
            .collect();
        wire.insert("s".to_owned(), Value::Array(rows));
    }

    Value::Object(wire)
}

fn decode_wire_entry(value: &Value, filepath: &str) -> Option<CacheEntry> {
    let object = value.as_object()?;

    let stat_row = object.get("st")?.as_array()?;
    if stat_row.len() != 2 {
        return None;
    }
    let stat = FileStat {
        mtime_ns: stat_row[0].as_u64()?,
        size: stat_row[1].as_u64()?,
    };

    let mut units = Vec::new();
    if let Some(rows) = object.get("u") {
        for row in rows.as_array()? {
            units.push(decode_wire_unit(row, filepath)?);
        }
    }

    let mut blocks = Vec::new();
    if let Some(rows) = object.get("b") {
        for row in rows.as_array()? {
            blocks.push(decode_wire_block(row, filepath)?);
        }
    }

    let mut segments = Vec::new();
    if let Some(rows) = object.get("s") {
        for row in rows.as_array()? {
            segments.push(decode_wire_segment(row, filepath)?);
        }
    }

    Some(CacheEntry {
        stat,
        units,
        blocks,
        segments,
    })
}

fn as_usize(value: &Value) -> Option<usize> {
    usize::try_from(value.as_u64()?).ok()
}

fn decode_wire_unit(value: &Value, filepath: &str) -> Option<Unit> {
    let row = value.as_array()?;
    if row.len() != 7 {
        return None;
    }
    Some(Unit {
        qualname: row[0].as_str()?.to_owned(),
        filepath: filepath.to_owned(),
        start_line: as_usize(&row[1])?,
        end_line: as_usize(&row[2])?,
        loc: as_usize(&row[3])?,
        stmt_count: as_usize(&row[4])?,
        fingerprint: row[5].as_str()?.to_owned(),
        loc_bucket: row[6].as_str()?.to_owned(),
    })
}

fn decode_wire_block(value: &Value, filepath: &str) -> Option<BlockUnit> {
    let row = value.as_array()?;
    if row.len() != 5 {
        return None;
    }
    Some(BlockUnit {
        qualname: row[0].as_str()?.to_owned(),
        filepath: filepath.to_owned(),
        start_line: as_usize(&row[1])?,
        end_line: as_usize(&row[2])?,
        size: as_usize(&row[3])?,
        block_hash: row[4].as_str()?.to_owned(),
    })
}

fn decode_wire_segment(value: &Value, filepath: &str) -> Option<SegmentUnit> {
    let row = value.as_array()?;
    if row.len() != 6 {
        return None;
    }
    Some(SegmentUnit {
        qualname: row[0].as_str()?.to_owned(),
        filepath: filepath.to_owned(),
        start_line: as_usize(&row[1])?,
        end_line: as_usize(&row[2])?,
        size: as_usize(&row[3])?,
        segment_hash: row[4].as_str()?.to_owned(),
        segment_sig: row[5].as_str()?.to_owned(),
    })
}
