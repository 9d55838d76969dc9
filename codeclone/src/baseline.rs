//! The baseline contract: a versioned, tamper-evident snapshot of the
//! function and block group keys accepted as existing duplication.
//!
//! Trust is classified through a fixed gate order (size, JSON, shape,
//! required fields, compatibility, integrity); the first failing gate wins
//! and later gates are not evaluated. Segments are excluded from baselines
//! by design.

use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::canonical_json::canonical_json;
use crate::constants::MAX_BASELINE_SIZE_BYTES;
use crate::contracts::{BASELINE_SCHEMA_VERSION, FINGERPRINT_VERSION, GENERATOR_NAME, PYTHON_TAG};
use crate::hashing::{constant_time_eq, sha256_hex};
use crate::utils::write_atomic;

/// Exactly one status per load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineStatus {
    Ok,
    Missing,
    TooLarge,
    InvalidJson,
    InvalidType,
    MissingFields,
    MismatchSchemaVersion,
    MismatchFingerprintVersion,
    MismatchPythonVersion,
    GeneratorMismatch,
    IntegrityMissing,
    IntegrityFailed,
}

impl BaselineStatus {
    /// Wire spelling used in reports and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Missing => "missing",
            Self::TooLarge => "too_large",
            Self::InvalidJson => "invalid_json",
            Self::InvalidType => "invalid_type",
            Self::MissingFields => "missing_fields",
            Self::MismatchSchemaVersion => "mismatch_schema_version",
            Self::MismatchFingerprintVersion => "mismatch_fingerprint_version",
            Self::MismatchPythonVersion => "mismatch_python_version",
            Self::GeneratorMismatch => "generator_mismatch",
            Self::IntegrityMissing => "integrity_missing",
            Self::IntegrityFailed => "integrity_failed",
        }
    }
}

/// A loaded (or freshly built) baseline snapshot.
#[derive(Debug, Clone)]
pub struct Baseline {
    pub path: PathBuf,
    pub functions: BTreeSet<String>,
    pub blocks: BTreeSet<String>,
    pub status: BaselineStatus,
    pub generator_name: Option<String>,
    pub generator_version: Option<String>,
    pub schema_version: Option<String>,
    pub fingerprint_version: Option<String>,
    pub python_tag: Option<String>,
    pub created_at: Option<String>,
    pub payload_sha256: Option<String>,
}

impl Baseline {
    fn empty(path: &Path, status: BaselineStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            functions: BTreeSet::new(),
            blocks: BTreeSet::new(),
            status,
            generator_name: None,
            generator_version: None,
            schema_version: None,
            fingerprint_version: None,
            python_tag: None,
            created_at: None,
            payload_sha256: None,
        }
    }

    /// Loads and classifies `path`. Never fails: every outcome is a status.
    #[must_use]
    pub fn load(path: &Path, max_size_bytes: u64) -> Self {
        let size = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(_) => return Self::empty(path, BaselineStatus::Missing),
        };
        let limit = if max_size_bytes == 0 {
            MAX_BASELINE_SIZE_BYTES
        } else {
            max_size_bytes
        };
        if size > limit {
            return Self::empty(path, BaselineStatus::TooLarge);
        }

        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::empty(path, BaselineStatus::Missing);
        };
        let Ok(document) = serde_json::from_str::<Value>(&text) else {
            return Self::empty(path, BaselineStatus::InvalidJson);
        };
        let Some(root) = document.as_object() else {
            return Self::empty(path, BaselineStatus::InvalidType);
        };

        // Legacy layout: functions/blocks at the root without a meta
        // section. Classified as missing required fields, never trusted.
        let Some(meta) = root.get("meta").and_then(Value::as_object) else {
            return Self::empty(path, BaselineStatus::MissingFields);
        };
        let Some(clones) = root.get("clones").and_then(Value::as_object) else {
            return Self::empty(path, BaselineStatus::MissingFields);
        };

        let Some(functions) = str_list(clones.get("functions")) else {
            return Self::empty(path, BaselineStatus::InvalidType);
        };
        let Some(blocks) = str_list(clones.get("blocks")) else {
            return Self::empty(path, BaselineStatus::InvalidType);
        };

        let generator = meta.get("generator").and_then(Value::as_object);
        let generator_name =
            generator.and_then(|g| g.get("name").and_then(Value::as_str).map(str::to_owned));
        let generator_version =
            generator.and_then(|g| g.get("version").and_then(Value::as_str).map(str::to_owned));
        let schema_version = meta
            .get("schema_version")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let fingerprint_version = meta
            .get("fingerprint_version")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let python_tag = meta
            .get("python_tag")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let created_at = meta
            .get("created_at")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let payload_sha256 = meta
            .get("payload_sha256")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let mut baseline = Self {
            path: path.to_path_buf(),
            functions,
            blocks,
            status: BaselineStatus::Ok,
            generator_name,
            generator_version,
            schema_version,
            fingerprint_version,
            python_tag,
            created_at,
            payload_sha256,
        };
        baseline.status = baseline.classify();
        baseline
    }

    /// Compatibility gates in fixed order, then the integrity check.
    fn classify(&self) -> BaselineStatus {
        if self.schema_version.is_none()
            || self.fingerprint_version.is_none()
            || self.python_tag.is_none()
        {
            return BaselineStatus::MissingFields;
        }
        if self.generator_name.as_deref() != Some(GENERATOR_NAME) {
            return BaselineStatus::GeneratorMismatch;
        }
        if self.schema_version.as_deref() != Some(BASELINE_SCHEMA_VERSION) {
            return BaselineStatus::MismatchSchemaVersion;
        }
        if self.fingerprint_version.as_deref() != Some(FINGERPRINT_VERSION) {
            return BaselineStatus::MismatchFingerprintVersion;
        }
        if self.python_tag.as_deref() != Some(PYTHON_TAG) {
            return BaselineStatus::MismatchPythonVersion;
        }
        let Some(stored) = self.payload_sha256.as_deref() else {
            return BaselineStatus::IntegrityMissing;
        };
        let expected = compute_payload_sha256(
            &self.functions,
            &self.blocks,
            self.fingerprint_version.as_deref().unwrap_or_default(),
            self.python_tag.as_deref().unwrap_or_default(),
        );
        if !constant_time_eq(stored, &expected) {
            return BaselineStatus::IntegrityFailed;
        }
        BaselineStatus::Ok
    }

    /// True when every gate passed.
    #[must_use]
    pub fn is_trusted(&self) -> bool {
        self.status == BaselineStatus::Ok
    }

    /// Builds a snapshot of the current run's group keys.
    #[must_use]
    pub fn from_keys<I, J>(path: &Path, functions: I, blocks: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        let mut baseline = Self::empty(path, BaselineStatus::Ok);
        baseline.functions = functions.into_iter().collect();
        baseline.blocks = blocks.into_iter().collect();
        baseline.generator_name = Some(GENERATOR_NAME.to_owned());
        baseline.generator_version = Some(env!("CARGO_PKG_VERSION").to_owned());
        baseline.schema_version = Some(BASELINE_SCHEMA_VERSION.to_owned());
        baseline.fingerprint_version = Some(FINGERPRINT_VERSION.to_owned());
        baseline.python_tag = Some(PYTHON_TAG.to_owned());
        baseline
    }

    /// Writes the snapshot atomically. The integrity hash is computed over
    /// the canonical payload before anything touches the disk.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the temp write or the rename.
    pub fn save(&self) -> std::io::Result<()> {
        let fingerprint_version = self
            .fingerprint_version
            .clone()
            .unwrap_or_else(|| FINGERPRINT_VERSION.to_owned());
        let python_tag = self
            .python_tag
            .clone()
            .unwrap_or_else(|| PYTHON_TAG.to_owned());
        let payload_sha256 = compute_payload_sha256(
            &self.functions,
            &self.blocks,
            &fingerprint_version,
            &python_tag,
        );
        let created_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        let document = json!({
            "meta": {
                "generator": {
                    "name": self.generator_name.as_deref().unwrap_or(GENERATOR_NAME),
                    "version": self
                        .generator_version
                        .as_deref()
                        .unwrap_or(env!("CARGO_PKG_VERSION")),
                },
                "schema_version": self
                    .schema_version
                    .as_deref()
                    .unwrap_or(BASELINE_SCHEMA_VERSION),
                "fingerprint_version": fingerprint_version,
                "python_tag": python_tag,
                "created_at": created_at,
                "payload_sha256": payload_sha256,
            },
            "clones": {
                "functions": self.functions.iter().collect::<Vec<_>>(),
                "blocks": self.blocks.iter().collect::<Vec<_>>(),
            },
        });

        let mut text = serde_json::to_string_pretty(&document)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        text.push('\n');
        write_atomic(&self.path, &text)
    }

    /// Group keys present now but absent from the snapshot, per section.
    /// Keys the current run no longer produces are ignored: removing
    /// duplication is always allowed.
    #[must_use]
    pub fn diff(
        &self,
        current_functions: &BTreeSet<String>,
        current_blocks: &BTreeSet<String>,
    ) -> (BTreeSet<String>, BTreeSet<String>) {
        let new_functions = current_functions
            .difference(&self.functions)
            .cloned()
            .collect();
        let new_blocks = current_blocks.difference(&self.blocks).cloned().collect();
        (new_functions, new_blocks)
    }
}

/// The canonical payload covers exactly the fields that define what was
/// measured: the key sets plus the fingerprint and parser tags. Generator
/// identity, schema version, and the timestamp are deliberately outside.
#[must_use]
pub fn compute_payload_sha256(
    functions: &BTreeSet<String>,
    blocks: &BTreeSet<String>,
    fingerprint_version: &str,
    python_tag: &str,
) -> String {
    let payload = json!({
        "functions": functions.iter().collect::<Vec<_>>(),
        "blocks": blocks.iter().collect::<Vec<_>>(),
        "fingerprint_version": fingerprint_version,
        "python_tag": python_tag,
    });
    sha256_hex(&canonical_json(&payload))
}

fn str_list(value: Option<&Value>) -> Option<BTreeSet<String>> {
    let items = value?.as_array()?;
    let mut out = BTreeSet::new();
    for item in items {
        out.insert(item.as_str()?.to_owned());
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("codeclone-baseline-tests");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn sample_keys() -> (BTreeSet<String>, BTreeSet<String>) {
        let functions: BTreeSet<String> =
            ["fp1|b0".to_owned(), "fp2|b1".to_owned()].into_iter().collect();
        let blocks: BTreeSet<String> = ["bh1".to_owned()].into_iter().collect();
        (functions, blocks)
    }

    #[test]
    fn test_round_trip_is_trusted() {
        let path = scratch("roundtrip.json");
        let (functions, blocks) = sample_keys();
        Baseline::from_keys(&path, functions.clone(), blocks.clone())
            .save()
            .unwrap();

        let loaded = Baseline::load(&path, 0);
        assert_eq!(loaded.status, BaselineStatus::Ok);
        assert_eq!(loaded.functions, functions);
        assert_eq!(loaded.blocks, blocks);
        assert_eq!(
            loaded.payload_sha256.as_deref(),
            Some(
                compute_payload_sha256(&functions, &blocks, FINGERPRINT_VERSION, PYTHON_TAG)
                    .as_str()
            )
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file() {
        let baseline = Baseline::load(Path::new("/nonexistent/baseline.json"), 0);
        assert_eq!(baseline.status, BaselineStatus::Missing);
        assert!(baseline.functions.is_empty());
    }

    #[test]
    fn test_legacy_layout_is_missing_fields() {
        let path = scratch("legacy.json");
        std::fs::write(&path, r#"{"functions": ["a"], "blocks": ["b"]}"#).unwrap();
        let baseline = Baseline::load(&path, 0);
        assert_eq!(baseline.status, BaselineStatus::MissingFields);
        assert!(!baseline.is_trusted());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_corrupted_json() {
        let path = scratch("corrupt.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(Baseline::load(&path, 0).status, BaselineStatus::InvalidJson);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_tampered_payload_fails_integrity() {
        let path = scratch("tampered.json");
        let (functions, blocks) = sample_keys();
        Baseline::from_keys(&path, functions, blocks).save().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let tampered = text.replace("fp1|b0", "fp1|b9");
        std::fs::write(&path, tampered).unwrap();

        assert_eq!(
            Baseline::load(&path, 0).status,
            BaselineStatus::IntegrityFailed
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_python_tag_mismatch() {
        let path = scratch("pytag.json");
        let (functions, blocks) = sample_keys();
        let mut baseline = Baseline::from_keys(&path, functions, blocks);
        baseline.python_tag = Some("cp311".to_owned());
        baseline.save().unwrap();

        assert_eq!(
            Baseline::load(&path, 0).status,
            BaselineStatus::MismatchPythonVersion
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_fingerprint_version_mismatch() {
        let path = scratch("fpver.json");
        let (functions, blocks) = sample_keys();
        let mut baseline = Baseline::from_keys(&path, functions, blocks);
        baseline.fingerprint_version = Some("0".to_owned());
        baseline.save().unwrap();

        assert_eq!(
            Baseline::load(&path, 0).status,
            BaselineStatus::MismatchFingerprintVersion
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_generator_mismatch() {
        let path = scratch("generator.json");
        let (functions, blocks) = sample_keys();
        let mut baseline = Baseline::from_keys(&path, functions, blocks);
        baseline.generator_name = Some("othertool".to_owned());
        baseline.save().unwrap();

        assert_eq!(
            Baseline::load(&path, 0).status,
            BaselineStatus::GeneratorMismatch
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_size_guard_runs_first() {
        let path = scratch("oversize.json");
        std::fs::write(&path, "x".repeat(64)).unwrap();
        assert_eq!(Baseline::load(&path, 16).status, BaselineStatus::TooLarge);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_diff_ignores_removed_keys() {
        let path = scratch("diff.json");
        let (functions, blocks) = sample_keys();
        let baseline = Baseline::from_keys(&path, functions, blocks);

        let current_functions: BTreeSet<String> =
            ["fp2|b1".to_owned(), "fp3|b0".to_owned()].into_iter().collect();
        let current_blocks: BTreeSet<String> = BTreeSet::new();
        let (new_functions, new_blocks) = baseline.diff(&current_functions, &current_blocks);

        assert_eq!(
            new_functions.into_iter().collect::<Vec<_>>(),
            vec!["fp3|b0".to_owned()]
        );
        assert!(new_blocks.is_empty());
    }

    #[test]
    fn test_payload_hash_excludes_meta_noise() {
        let (functions, blocks) = sample_keys();
        let one = compute_payload_sha256(&functions, &blocks, "1", "rpy313");
        let two = compute_payload_sha256(&functions, &blocks, "1", "rpy313");
        assert_eq!(one, two);
        let other = compute_payload_sha256(&functions, &blocks, "2", "rpy313");
        assert_ne!(one, other);
    }
}
