/// Crate-level error types for docmgr tools.
use std::path::PathBuf;

/// All errors in docmgr carry enough context to produce a useful diagnostic
/// at the tool boundary. Each variant names the path, value, or rule that failed.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The documentation directory could not be located.
    #[error("documentation directory not found: {}", path.display())]
    DocsNotFound {
        /// Directory that was expected to hold documentation.
        path: PathBuf,
    },

    /// A required file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A git command failed and no fallback exists for the operation.
    #[error("git {args} failed: {reason}")]
    GitFailed {
        /// Space-joined git arguments.
        args: String,
        /// Description of the failure.
        reason: String,
    },

    /// A commit hash is not 7-40 hexadecimal characters.
    #[error(
        "Invalid git commit hash format: `{value}`. Expected 7-40 hexadecimal characters \
         (rejected to prevent command injection)"
    )]
    InvalidCommitHash {
        /// The rejected input.
        value: String,
    },

    /// A path input violated an input rule.
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath {
        /// The rejected path as supplied.
        path: String,
        /// Which rule was violated.
        reason: String,
    },

    /// An exclude pattern failed the safety validator.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Which rule was violated.
        reason: String,
    },

    /// Tool arguments could not be decoded into a request.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Decoder message.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON (de)serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// An artifact lock could not be acquired.
    #[error("lock failed: {}: {reason}", path.display())]
    LockFailed {
        /// Artifact whose lock failed.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Tree-sitter failed to parse a source file.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// More exclude patterns than the list cap allows.
    #[error("too many patterns: {count} (max {max})")]
    TooManyPatterns {
        /// Number of patterns supplied.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// No tool registered under this name.
    #[error("unknown tool: `{name}`")]
    UnknownTool {
        /// Requested tool name.
        name: String,
    },

    /// No tree-sitter grammar registered for this file extension.
    #[error("no grammar for extension: .{ext}")]
    UnsupportedLanguage {
        /// File extension without the leading dot.
        ext: String,
    },

    /// YAML (de)serialization failed.
    #[error("yaml: {0}")]
    Yaml(
        /// The wrapped YAML error.
        #[from]
        serde_yaml::Error,
    ),
}

impl Error {
    /// Stable kind name used in the `Error: <kind>: <detail>` boundary convention.
    pub const fn kind(&self) -> &'static str {
        return match self {
            Self::DocsNotFound { .. } => "DocsNotFound",
            Self::FileNotFound { .. } => "FileNotFound",
            Self::GitFailed { .. } => "GitFailed",
            Self::InvalidCommitHash { .. } => "InvalidCommitHash",
            Self::InvalidPath { .. } => "InvalidPath",
            Self::InvalidPattern { .. } => "InvalidPattern",
            Self::InvalidRequest { .. } => "InvalidRequest",
            Self::Io(_) => "IoError",
            Self::Json(_) => "JsonError",
            Self::LockFailed { .. } => "LockFailed",
            Self::ParseFailed { .. } => "ParseFailed",
            Self::TooManyPatterns { .. } => "TooManyPatterns",
            Self::UnknownTool { .. } => "UnknownTool",
            Self::UnsupportedLanguage { .. } => "UnsupportedLanguage",
            Self::Yaml(_) => "YamlError",
        };
    }
}
