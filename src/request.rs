//! Validated tool requests.
//!
//! Every tool decodes its arguments into one of these structs (unknown keys
//! are rejected) and then checks paths, patterns and commit hashes here,
//! before any filesystem or subprocess work starts.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::Error;
use crate::patterns;
use crate::platform::Platform;
use crate::quality::Criterion;

/// 7 to 40 hexadecimal characters, nothing else.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static COMMIT_HASH: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"^[0-9a-fA-F]{7,40}$").expect("valid regex"));

/// Output format shared by every reporting tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Machine-readable JSON.
    Json,
    /// Human-readable markdown.
    #[default]
    Markdown,
}

/// How `sync` treats the project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Also rebuild the dependency graph and refresh the baseline.
    Proactive,
    /// Report only.
    #[default]
    Reactive,
}

/// Arguments of `docmgr_assess_quality`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssessQualityRequest {
    /// Criteria to assess; all seven when absent or empty.
    #[serde(default)]
    pub criteria: Option<Vec<Criterion>>,
    /// Documentation directory; configured or detected when absent.
    #[serde(default)]
    pub docs_path: Option<String>,
    /// Absolute project root.
    pub project_path: String,
    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Arguments of `docmgr_bootstrap`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapRequest {
    /// Directory to create, relative to the project root.
    #[serde(default = "default_docs_path")]
    pub docs_path: String,
    /// Platform to prepare for; recommended when absent.
    #[serde(default)]
    pub platform: Option<Platform>,
    /// Absolute project root.
    pub project_path: String,
}

/// Arguments of `docmgr_detect_platform`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectPlatformRequest {
    /// Absolute project root.
    pub project_path: String,
    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Arguments of `docmgr_initialize_config`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitializeConfigRequest {
    /// Exclude patterns written to the configuration.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    /// Platform to record; detected when absent.
    #[serde(default)]
    pub platform: Option<Platform>,
    /// Absolute project root.
    pub project_path: String,
}

/// Arguments of `docmgr_initialize_memory`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitializeMemoryRequest {
    /// Absolute project root.
    pub project_path: String,
}

/// Arguments of `docmgr_map_changes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapChangesRequest {
    /// Absolute project root.
    pub project_path: String,
    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
    /// Compare against this commit instead of the baseline checksums.
    #[serde(default)]
    pub since_commit: Option<String>,
}

/// Arguments of `docmgr_migrate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateRequest {
    /// Report the plan without touching any file.
    #[serde(default)]
    pub dry_run: bool,
    /// Current documentation directory, relative to the project root.
    pub existing_docs_path: String,
    /// Destination directory, relative to the project root.
    #[serde(default = "default_new_docs_path")]
    pub new_docs_path: String,
    /// Use `git mv` so file history follows the move.
    #[serde(default = "default_true")]
    pub preserve_history: bool,
    /// Absolute project root.
    pub project_path: String,
    /// Platform recorded for the new layout; existing one kept when absent.
    #[serde(default)]
    pub target_platform: Option<Platform>,
}

/// Arguments of `docmgr_sync`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncRequest {
    /// Reactive or proactive.
    #[serde(default)]
    pub mode: SyncMode,
    /// Absolute project root.
    pub project_path: String,
    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Arguments of `docmgr_track_dependencies`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackDependenciesRequest {
    /// Documentation directory; configured or detected when absent.
    #[serde(default)]
    pub docs_path: Option<String>,
    /// Absolute project root.
    pub project_path: String,
    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Arguments of `docmgr_validate_docs`.
#[allow(clippy::struct_excessive_bools, reason = "one switch per independent check")]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidateDocsRequest {
    /// Check images: existence and alt text.
    #[serde(default = "default_true")]
    pub check_assets: bool,
    /// Check relative links.
    #[serde(default = "default_true")]
    pub check_links: bool,
    /// Parse tagged code blocks.
    #[serde(default = "default_true")]
    pub check_snippets: bool,
    /// Documentation directory; configured or detected when absent.
    #[serde(default)]
    pub docs_path: Option<String>,
    /// Absolute project root.
    pub project_path: String,
    /// Output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
    /// Check function and class references against the symbol index.
    #[serde(default)]
    pub validate_symbols: bool,
}

impl SyncMode {
    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Proactive => "proactive",
            Self::Reactive => "reactive",
        };
    }
}

/// Default documentation directory for new docs.
fn default_docs_path() -> String {
    return "docs".to_string();
}

/// Exclude patterns written when none are supplied.
pub fn default_exclude_patterns() -> Vec<String> {
    return ["**/node_modules", "**/dist", "**/vendor", "**/*.log"].map(String::from).to_vec();
}

/// Default migration destination.
fn default_new_docs_path() -> String {
    return "docs-new".to_string();
}

/// Serde default for switches that are on unless turned off.
const fn default_true() -> bool {
    return true;
}

/// Whether any component of `path` is `..`.
fn has_traversal(path: &Path) -> bool {
    return path.components().any(|c| return matches!(c, Component::ParentDir));
}

/// Reject anything but 7-40 hexadecimal characters. Values are never
/// sanitized, since they reach a git invocation.
///
/// # Errors
///
/// Returns `Error::InvalidCommitHash` naming the rejected value.
pub fn validate_commit_hash(value: &str) -> Result<&str, Error> {
    if COMMIT_HASH.is_match(value) {
        return Ok(value);
    }
    return Err(Error::InvalidCommitHash {
        value: value.to_string(),
    });
}

/// Exclude patterns supplied with a request.
///
/// # Errors
///
/// Returns `Error::TooManyPatterns` or `Error::InvalidPattern`.
pub fn validate_exclude_patterns(patterns: &[String]) -> Result<(), Error> {
    return patterns::validate_patterns(patterns);
}

/// Project root: absolute, free of `..`, an existing directory.
///
/// # Errors
///
/// Returns `Error::InvalidPath` naming the violated rule.
pub fn validate_project_path(raw: &str) -> Result<PathBuf, Error> {
    let trimmed = raw.trim();
    let invalid = |reason: &str| {
        return Error::InvalidPath {
            path: trimmed.to_string(),
            reason: reason.to_string(),
        };
    };

    if trimmed.is_empty() {
        return Err(invalid("project path is empty"));
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(invalid("project path must be absolute"));
    }
    if has_traversal(path) {
        return Err(invalid("path traversal (`..`) is not allowed"));
    }
    if !path.exists() {
        return Err(invalid("project path does not exist"));
    }
    if !path.is_dir() {
        return Err(invalid("project path is not a directory"));
    }
    return Ok(path.to_path_buf());
}

/// Path relative to the project root: non-empty, not absolute, free of `..`.
/// Returns it joined onto `root`.
///
/// # Errors
///
/// Returns `Error::InvalidPath` naming the violated rule.
pub fn validate_relative_path(root: &Path, raw: &str) -> Result<PathBuf, Error> {
    let trimmed = raw.trim();
    let invalid = |reason: &str| {
        return Error::InvalidPath {
            path: trimmed.to_string(),
            reason: reason.to_string(),
        };
    };

    if trimmed.is_empty() {
        return Err(invalid("path is empty"));
    }
    let path = Path::new(trimmed);
    if path.is_absolute() || trimmed.starts_with('/') || trimmed.starts_with('\\') {
        return Err(invalid("path must be relative to the project root"));
    }
    if has_traversal(path) {
        return Err(invalid("path traversal (`..`) is not allowed"));
    }
    return Ok(root.join(path));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_hash_accepts_hex_only() {
        assert!(validate_commit_hash("abc1234").is_ok());
        assert!(validate_commit_hash("ABCDEF0123456789abcdef0123456789abcdef01").is_ok());

        for bad in [
            "HEAD; rm -rf /",
            "abc123 && ls",
            "`whoami`",
            "abc123",
            "g123456",
            "HEAD",
            "0123456789abcdef0123456789abcdef012345678",
            "",
        ] {
            let err = validate_commit_hash(bad).unwrap_err();
            assert_eq!(err.kind(), "InvalidCommitHash", "{bad}");
        }
    }

    #[test]
    fn commit_hash_message_names_the_rule() {
        let message = validate_commit_hash("abc123 && ls").unwrap_err().to_string();
        assert!(message.contains("hexadecimal"));
        assert!(message.contains("7-40"));
        assert!(message.contains("command injection"));
    }

    #[test]
    fn project_path_rules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        assert_eq!(validate_project_path(root).unwrap(), dir.path());

        assert!(validate_project_path("relative/dir").is_err());
        assert!(validate_project_path("").is_err());
        assert!(validate_project_path(&format!("{root}/missing")).is_err());
        assert!(validate_project_path(&format!("{root}/../x")).is_err());

        std::fs::write(dir.path().join("file.txt"), "").unwrap();
        let err = validate_project_path(&format!("{root}/file.txt")).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn relative_path_rules() {
        let root = Path::new("/project");
        assert_eq!(validate_relative_path(root, "docs").unwrap(), PathBuf::from("/project/docs"));
        assert_eq!(validate_relative_path(root, "docs/guide/").unwrap(), PathBuf::from("/project/docs/guide/"));
        assert!(validate_relative_path(root, "/etc").is_err());
        assert!(validate_relative_path(root, "../outside").is_err());
        assert!(validate_relative_path(root, "docs/../../x").is_err());
        assert!(validate_relative_path(root, "  ").is_err());
    }

    #[test]
    fn unknown_fields_rejected() {
        let decoded: Result<DetectPlatformRequest, _> =
            serde_json::from_value(serde_json::json!({"project_path": "/p", "colour": "blue"}));
        assert!(decoded.is_err());
    }

    #[test]
    fn defaults_fill_in() {
        let request: MigrateRequest =
            serde_json::from_value(serde_json::json!({"project_path": "/p", "existing_docs_path": "doc"})).unwrap();
        assert_eq!(request.new_docs_path, "docs-new");
        assert!(request.preserve_history);
        assert!(!request.dry_run);

        let request: InitializeConfigRequest =
            serde_json::from_value(serde_json::json!({"project_path": "/p"})).unwrap();
        assert_eq!(request.exclude_patterns.len(), 4);

        let request: ValidateDocsRequest = serde_json::from_value(serde_json::json!({"project_path": "/p"})).unwrap();
        assert!(request.check_links && request.check_assets && request.check_snippets);
        assert!(!request.validate_symbols);
        assert_eq!(request.response_format, ResponseFormat::Markdown);

        let request: SyncRequest =
            serde_json::from_value(serde_json::json!({"project_path": "/p", "mode": "proactive"})).unwrap();
        assert_eq!(request.mode, SyncMode::Proactive);
        assert!(serde_json::from_value::<SyncRequest>(serde_json::json!({"project_path": "/p", "mode": "eager"})).is_err());
    }

    #[test]
    fn criteria_decode_by_name() {
        let request: AssessQualityRequest = serde_json::from_value(serde_json::json!({
            "project_path": "/p",
            "criteria": ["relevance", "structure"],
            "response_format": "json"
        }))
        .unwrap();
        assert_eq!(request.criteria.unwrap(), vec![Criterion::Relevance, Criterion::Structure]);
        assert_eq!(request.response_format, ResponseFormat::Json);
    }
}
