//! Core data models for translation jobs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::core::errors::{Result, SyncError};

/// ISO-like locale identifier: language, then optional region/script subtags
const LOCALE_PATTERN: &str = r"^[A-Za-z]{2,3}([-_][A-Za-z0-9]{2,8})*$";

fn locale_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LOCALE_PATTERN).expect("locale pattern is valid"))
}

/// Validated locale identifier such as `en`, `pt-BR` or `zh_Hans`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleCode(String);

impl LocaleCode {
    /// Parse and validate a locale code
    pub fn parse(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        let trimmed = code.trim();
        if !locale_regex().is_match(trimmed) {
            return Err(SyncError::validation(format!(
                "invalid locale code: {:?}",
                code
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether both codes name the same locale, ignoring ASCII case and `-`/`_`
    pub fn same_locale(&self, other: &LocaleCode) -> bool {
        fn fold(c: char) -> char {
            if c == '_' {
                '-'
            } else {
                c.to_ascii_lowercase()
            }
        }

        self.0.len() == other.0.len() && self.0.chars().map(fold).eq(other.0.chars().map(fold))
    }
}

impl TryFrom<String> for LocaleCode {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<LocaleCode> for String {
    fn from(code: LocaleCode) -> Self {
        code.0
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint of one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub source_file_path: String,
    pub file_hash: String,
}

/// Body of `generate-plan-from-entire-files`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPlanRequest {
    pub project_uuid: String,
    pub source_locale_iso: LocaleCode,
    pub target_locale_isos: Vec<LocaleCode>,
    pub files_metadata: Vec<FileMetadata>,
}

/// Source file with its raw text, as sent when creating a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFile {
    pub source_file_path: String,
    pub file_hash: String,
    pub content: String,
}

/// Body of `create-with-parsed-files`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub project_uuid: String,
    pub source_locale_iso: LocaleCode,
    pub target_locale_isos: Vec<LocaleCode>,
    pub translation_job_uuid: String,
    pub parsed_files: Vec<ParsedFile>,
    pub name: String,
}

/// Response of `create-with-parsed-files`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobResponse {
    pub translation_job_id: String,
}

/// Counts reported by `translation-progress`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub translations_total: u64,
    pub translations_completed: u64,
}

impl JobProgress {
    pub fn is_complete(&self) -> bool {
        self.translations_completed == self.translations_total
    }
}

/// Summary of a plan response
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDiff {
    pub added: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub raw: serde_json::Value,
}

impl PlanDiff {
    /// Reads counts from a plan response.
    ///
    /// Each of `added_files`, `changed_files` and `unchanged_files` may be an
    /// array (its length is used) or a number; missing keys count as zero.
    pub fn from_response(raw: serde_json::Value) -> Self {
        Self {
            added: count_field(&raw, "added_files"),
            changed: count_field(&raw, "changed_files"),
            unchanged: count_field(&raw, "unchanged_files"),
            raw,
        }
    }

    /// Files the service would send for translation
    pub fn pending(&self) -> usize {
        self.added + self.changed
    }
}

fn count_field(raw: &serde_json::Value, key: &str) -> usize {
    match raw.get(key) {
        Some(serde_json::Value::Array(items)) => items.len(),
        Some(value) => value.as_u64().unwrap_or(0) as usize,
        None => 0,
    }
}

impl fmt::Display for PlanDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} changed, {} unchanged",
            self.added, self.changed, self.unchanged
        )
    }
}
