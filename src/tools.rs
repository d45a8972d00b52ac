//! The ten documentation tools.
//!
//! Every tool reloads configuration and artifacts from disk, returns a
//! markdown or JSON report, and passes it through the response limiter.
//! Failures come back as `Error: <kind>: <detail>` text, never as a panic.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};

use crate::config::{self, Config, Metadata};
use crate::diagnostics;
use crate::error::Error;
use crate::git;
use crate::graph::{self, DependencyGraph};
use crate::heuristics;
use crate::lock;
use crate::matcher::{Matcher, ProjectFiles};
use crate::memory::{self, AssetManifest, Baseline};
use crate::patterns::{self, ExcludeSet};
use crate::platform::{self, Platform};
use crate::quality;
use crate::request::{
    self, AssessQualityRequest, BootstrapRequest, DetectPlatformRequest, InitializeConfigRequest,
    InitializeMemoryRequest, MapChangesRequest, MigrateRequest, ResponseFormat, SyncMode, SyncRequest,
    TrackDependenciesRequest, ValidateDocsRequest,
};
use crate::scanner;
use crate::symbols;
use crate::truncate;
use crate::types::{CandidateReference, IssueKind, Severity, Symbol, ValidationIssue};
use crate::validation::{self, Checks};

/// Tool name of [`assess_quality`].
pub const ASSESS_QUALITY: &str = "docmgr_assess_quality";
/// Tool name of [`bootstrap`].
pub const BOOTSTRAP: &str = "docmgr_bootstrap";
/// Tool name of [`detect_platform`].
pub const DETECT_PLATFORM: &str = "docmgr_detect_platform";
/// Tool name of [`initialize_config`].
pub const INITIALIZE_CONFIG: &str = "docmgr_initialize_config";
/// Tool name of [`initialize_memory`].
pub const INITIALIZE_MEMORY: &str = "docmgr_initialize_memory";
/// Tool name of [`map_changes`].
pub const MAP_CHANGES: &str = "docmgr_map_changes";
/// Tool name of [`migrate`].
pub const MIGRATE: &str = "docmgr_migrate";
/// Tool name of [`sync`].
pub const SYNC: &str = "docmgr_sync";
/// Tool name of [`track_dependencies`].
pub const TRACK_DEPENDENCIES: &str = "docmgr_track_dependencies";
/// Tool name of [`validate_docs`].
pub const VALIDATE_DOCS: &str = "docmgr_validate_docs";

/// Public symbols listed in a bootstrapped API reference.
const API_REFERENCE_LIMIT: usize = 200;

/// Order of issue sections in validation reports.
const ISSUE_SECTIONS: [IssueKind; 5] = [
    IssueKind::BrokenLink,
    IssueKind::MissingAsset,
    IssueKind::MissingAltText,
    IssueKind::CodeSyntaxError,
    IssueKind::MissingSymbol,
];

/// Build command shown in a bootstrapped getting-started page, per language.
const LANGUAGE_SETUP: &[(&str, &str)] = &[
    ("Go", "go build ./..."),
    ("Java", "mvn package"),
    ("JavaScript/TypeScript", "npm install"),
    ("PHP", "composer install"),
    ("Python", "pip install -e ."),
    ("Ruby", "bundle install"),
    ("Rust", "cargo build"),
];

/// Directories recorded as `sources` when present at the project root.
const SOURCE_DIRECTORIES: &[&str] = &["app", "cmd", "internal", "lib", "pkg", "src"];

/// How a file differs from the comparison point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
enum ChangeStatus {
    /// New since the baseline.
    Added,
    /// Reported by `git diff`, which does not say how.
    Changed,
    /// Gone since the baseline.
    Deleted,
    /// Content differs from the baseline.
    Modified,
}

/// Changed files and what they were compared against.
struct ChangeSet {
    /// One entry per changed file, sorted by path.
    changes: Vec<FileChange>,
    /// Human-readable comparison point.
    compared_against: String,
    /// `commit` or `baseline`.
    source: &'static str,
}

/// One changed file.
#[derive(Debug, Clone, Serialize)]
struct FileChange {
    /// Docs referencing the file or a symbol in it.
    affected_docs: BTreeSet<String>,
    /// Project-relative path.
    path: String,
    /// Kind of change.
    status: ChangeStatus,
}

/// How one file was migrated.
#[derive(Debug, Clone, Serialize)]
struct MigratedFile {
    /// Project-relative source.
    from: String,
    /// `git mv`, `copy` or `preview`.
    method: &'static str,
    /// Project-relative destination.
    to: String,
}

/// Configuration and exclusion layers of one validated project root.
struct Project {
    /// Loaded or default configuration.
    config: Config,
    /// Exclusion layers built from the configuration.
    excludes: ExcludeSet,
    /// Validated absolute root.
    root: PathBuf,
}

/// Output of a reference scan over a docs directory.
struct Tracking {
    /// Markdown files scanned.
    docs_scanned: usize,
    /// Graph of resolved references.
    graph: DependencyGraph,
    /// Candidates that matched nothing in the project.
    unresolved: Vec<CandidateReference>,
}

/// A decoded tool invocation.
#[derive(Debug, Clone)]
pub enum ToolRequest {
    /// `docmgr_assess_quality`.
    AssessQuality(AssessQualityRequest),
    /// `docmgr_bootstrap`.
    Bootstrap(BootstrapRequest),
    /// `docmgr_detect_platform`.
    DetectPlatform(DetectPlatformRequest),
    /// `docmgr_initialize_config`.
    InitializeConfig(InitializeConfigRequest),
    /// `docmgr_initialize_memory`.
    InitializeMemory(InitializeMemoryRequest),
    /// `docmgr_map_changes`.
    MapChanges(MapChangesRequest),
    /// `docmgr_migrate`.
    Migrate(MigrateRequest),
    /// `docmgr_sync`.
    Sync(SyncRequest),
    /// `docmgr_track_dependencies`.
    TrackDependencies(TrackDependenciesRequest),
    /// `docmgr_validate_docs`.
    ValidateDocs(ValidateDocsRequest),
}

impl Project {
    /// Validate `project_path` and load its configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPath` for a bad root, or the configuration's
    /// load error.
    fn open(project_path: &str) -> Result<Self, Error> {
        let root = request::validate_project_path(project_path)?;
        let config = Config::load_or_default(&root)?;
        let excludes = ExcludeSet::build(&root, &config);
        return Ok(Self { config, excludes, root });
    }

    /// Documentation directory: the requested one, else the configured one,
    /// else the first well-known directory found. Returns the absolute and
    /// the project-relative form.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPath` for a bad request path or
    /// `Error::DocsNotFound` when no directory exists.
    fn docs_dir(&self, requested: Option<&str>) -> Result<(PathBuf, String), Error> {
        if let Some(raw) = requested {
            let dir = request::validate_relative_path(&self.root, raw)?;
            if !dir.is_dir() {
                return Err(Error::DocsNotFound { path: dir });
            }
            let relative = patterns::relative_to(&self.root, &dir);
            return Ok((dir, relative));
        }
        return memory::docs_directory(&self.root, &self.config)
            .map(|relative| return (self.root.join(&relative), relative))
            .ok_or_else(|| {
                return Error::DocsNotFound {
                    path: self.root.join(&self.config.docs_path),
                };
            });
    }

    /// The persisted dependency graph, `None` when it was never built.
    ///
    /// # Errors
    ///
    /// Returns read or parse errors of an existing graph.
    fn graph(&self) -> Result<Option<DependencyGraph>, Error> {
        return match DependencyGraph::read(&self.root.join(graph::GRAPH_FILE)) {
            Ok(graph) => Ok(Some(graph)),
            Err(Error::FileNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        };
    }
}

impl ToolRequest {
    /// Decode tool arguments by tool name.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownTool` or `Error::InvalidRequest`.
    pub fn decode(name: &str, arguments: Value) -> Result<Self, Error> {
        let invalid = |e: serde_json::Error| {
            return Error::InvalidRequest {
                reason: e.to_string(),
            };
        };
        return match name {
            ASSESS_QUALITY => serde_json::from_value(arguments).map(Self::AssessQuality).map_err(invalid),
            BOOTSTRAP => serde_json::from_value(arguments).map(Self::Bootstrap).map_err(invalid),
            DETECT_PLATFORM => serde_json::from_value(arguments).map(Self::DetectPlatform).map_err(invalid),
            INITIALIZE_CONFIG => serde_json::from_value(arguments).map(Self::InitializeConfig).map_err(invalid),
            INITIALIZE_MEMORY => serde_json::from_value(arguments).map(Self::InitializeMemory).map_err(invalid),
            MAP_CHANGES => serde_json::from_value(arguments).map(Self::MapChanges).map_err(invalid),
            MIGRATE => serde_json::from_value(arguments).map(Self::Migrate).map_err(invalid),
            SYNC => serde_json::from_value(arguments).map(Self::Sync).map_err(invalid),
            TRACK_DEPENDENCIES => serde_json::from_value(arguments).map(Self::TrackDependencies).map_err(invalid),
            VALIDATE_DOCS => serde_json::from_value(arguments).map(Self::ValidateDocs).map_err(invalid),
            _ => Err(Error::UnknownTool { name: name.to_string() }),
        };
    }

    /// Format the tool reports in. Tools without a format option report markdown.
    pub const fn response_format(&self) -> ResponseFormat {
        return match self {
            Self::AssessQuality(r) => r.response_format,
            Self::DetectPlatform(r) => r.response_format,
            Self::MapChanges(r) => r.response_format,
            Self::Sync(r) => r.response_format,
            Self::TrackDependencies(r) => r.response_format,
            Self::ValidateDocs(r) => r.response_format,
            Self::Bootstrap(_) | Self::InitializeConfig(_) | Self::InitializeMemory(_) | Self::Migrate(_) => {
                ResponseFormat::Markdown
            },
        };
    }
}

/// Decode and run a tool by name. Always returns text.
pub fn call(name: &str, arguments: Value) -> String {
    return ToolRequest::decode(name, arguments)
        .map_or_else(|e| return diagnostics::render_error(&e), |request| return execute(&request));
}

/// Run a decoded tool and limit its output.
pub fn execute(request: &ToolRequest) -> String {
    let outcome = match request {
        ToolRequest::AssessQuality(r) => assess_quality(r),
        ToolRequest::Bootstrap(r) => bootstrap(r),
        ToolRequest::DetectPlatform(r) => detect_platform(r),
        ToolRequest::InitializeConfig(r) => initialize_config(r),
        ToolRequest::InitializeMemory(r) => initialize_memory(r),
        ToolRequest::MapChanges(r) => map_changes(r),
        ToolRequest::Migrate(r) => migrate(r),
        ToolRequest::Sync(r) => sync(r),
        ToolRequest::TrackDependencies(r) => track_dependencies(r),
        ToolRequest::ValidateDocs(r) => validate_docs(r),
    };
    return outcome.map_or_else(
        |e| {
            log::debug!("tool failed: {e:?}");
            return diagnostics::render_error(&e);
        },
        |output| return truncate::limit(output, request.response_format(), truncate::CHARACTER_LIMIT),
    );
}

/// Docs referencing each changed file, inverted into doc → changed files.
fn affected_by_doc(changes: &[FileChange]) -> BTreeMap<&str, Vec<&str>> {
    let mut by_doc: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for change in changes {
        for doc in &change.affected_docs {
            by_doc.entry(doc.as_str()).or_default().push(change.path.as_str());
        }
    }
    return by_doc;
}

/// API reference page listing public symbols by file.
fn api_reference_page(name: &str, index: &symbols::SymbolIndex) -> String {
    let mut page = String::from("# API reference\n\n");
    let _ = writeln!(page, "Public functions, methods and types of {name}.\n");

    let mut by_file: BTreeMap<&str, Vec<&Symbol>> = BTreeMap::new();
    for symbol in index.public_symbols().take(API_REFERENCE_LIMIT) {
        by_file.entry(symbol.file.as_str()).or_default().push(symbol);
    }
    if by_file.is_empty() {
        page.push_str("No public symbols were found. Add entries here as the API takes shape.\n");
        return page;
    }
    for (file, mut file_symbols) in by_file {
        file_symbols.sort_by_key(|s| return s.line);
        let _ = writeln!(page, "## `{file}`\n");
        for symbol in file_symbols {
            let display = symbol
                .scope
                .as_ref()
                .map_or_else(|| return symbol.name.clone(), |scope| return format!("{scope}.{}", symbol.name));
            let _ = writeln!(page, "- `{display}` ({}, line {})", symbol.kind.as_str(), symbol.line);
        }
        page.push('\n');
    }
    return page;
}

/// Run the selected quality criteria over the docs directory.
///
/// # Errors
///
/// Returns path validation errors or `Error::DocsNotFound`.
pub fn assess_quality(request: &AssessQualityRequest) -> Result<String, Error> {
    let project = Project::open(&request.project_path)?;
    let (docs_dir, docs_relative) = project.docs_dir(request.docs_path.as_deref())?;
    let selected = request.criteria.clone().unwrap_or_default();
    let assessment = quality::assess(&project.root, &docs_dir, &project.excludes, &selected)?;

    return match request.response_format {
        ResponseFormat::Json => Ok(serde_json::to_string_pretty(&assessment)?),
        ResponseFormat::Markdown => Ok(quality::render_markdown(&assessment, &docs_relative)),
    };
}

/// Create a starter documentation set: `index.md`, `getting-started.md` and
/// `api-reference.md`.
///
/// # Errors
///
/// Returns `Error::InvalidPath` when the target directory already holds files,
/// or an I/O error while writing.
pub fn bootstrap(request: &BootstrapRequest) -> Result<String, Error> {
    let project = Project::open(&request.project_path)?;
    let docs_dir = request::validate_relative_path(&project.root, &request.docs_path)?;
    let docs_relative = patterns::relative_to(&project.root, &docs_dir);
    if docs_dir.is_file() || (docs_dir.is_dir() && std::fs::read_dir(&docs_dir)?.next().is_some()) {
        return Err(Error::InvalidPath {
            path: docs_relative,
            reason: "directory already contains files; use docmgr_migrate to restructure existing docs".to_string(),
        });
    }

    let language = platform::detect_language(&project.root);
    let chosen = request
        .platform
        .unwrap_or_else(|| return platform::recommend(&platform::detect_platforms(&project.root), &language).0);
    let name = project_name(&project.root);
    let index = symbols::build_index(&project.root, &project.excludes);

    let pages = [
        ("index.md", index_page(&name, &language, chosen)),
        ("getting-started.md", getting_started_page(&name, &language)),
        ("api-reference.md", api_reference_page(&name, &index)),
    ];
    std::fs::create_dir_all(&docs_dir)?;
    for (file, content) in &pages {
        std::fs::write(docs_dir.join(file), content)?;
    }

    let config_note = if Config::path(&project.root).exists() {
        let mut updated = project.config.clone();
        updated.docs_path.clone_from(&docs_relative);
        if request.platform.is_some() || updated.platform == Platform::Unknown {
            updated.platform = chosen;
        }
        updated.write(&project.root)?;
        "Updated `.doc-manager.yml` with the new docs path."
    } else {
        "No `.doc-manager.yml` found; run `docmgr_initialize_config` to record this layout."
    };

    let mut out = format!("✓ Bootstrapped documentation in `{docs_relative}`\n\n");
    let _ = writeln!(out, "**Platform:** {}", chosen.as_str());
    let _ = writeln!(out, "**Primary Language:** {language}");
    let _ = writeln!(out, "**Public symbols listed:** {}\n", index.public_symbols().count().min(API_REFERENCE_LIMIT));
    out.push_str("**Created Files:**\n");
    for (file, _) in &pages {
        let _ = writeln!(out, "- {docs_relative}/{file}");
    }
    let _ = writeln!(out, "\n{config_note}\n");
    out.push_str("Next steps:\n");
    out.push_str("1. Fill in the introduction in `index.md`\n");
    out.push_str("2. Run `docmgr_track_dependencies` to link the docs to the code\n");
    out.push_str("3. Run `docmgr_validate_docs` to check links and code blocks\n");
    return Ok(out);
}

/// Compare the project against a commit or the memory baseline.
/// A failed `git diff` falls back to the baseline.
///
/// # Errors
///
/// Returns `Error::InvalidCommitHash` before any git call, or
/// `Error::FileNotFound` when the baseline is needed but absent.
fn detect_changes(project: &Project, since_commit: Option<&str>) -> Result<ChangeSet, Error> {
    if let Some(raw) = since_commit {
        let commit = request::validate_commit_hash(raw.trim())?;
        if let Some(files) = git::changed_files_since(&project.root, commit) {
            let changes = files
                .into_iter()
                .filter(|path| return !project.excludes.is_excluded(path, false))
                .map(|path| {
                    return FileChange {
                        affected_docs: BTreeSet::new(),
                        path,
                        status: ChangeStatus::Changed,
                    };
                })
                .collect();
            return Ok(ChangeSet {
                changes,
                compared_against: format!("commit `{commit}`"),
                source: "commit",
            });
        }
        log::warn!("git diff against {commit} failed, comparing with the memory baseline instead");
    }

    let baseline = Baseline::read(&project.root)?;
    let diff = baseline.diff(&memory::compute_checksums(&project.root, &project.excludes));
    let mut changes: Vec<FileChange> = [
        (ChangeStatus::Added, diff.added),
        (ChangeStatus::Deleted, diff.deleted),
        (ChangeStatus::Modified, diff.modified),
    ]
    .into_iter()
    .flat_map(|(status, paths)| {
        return paths.into_iter().map(move |path| {
            return FileChange {
                affected_docs: BTreeSet::new(),
                path,
                status,
            };
        });
    })
    .collect();
    changes.sort_by(|a, b| return a.path.cmp(&b.path));

    return Ok(ChangeSet {
        changes,
        compared_against: format!("memory baseline from {}", baseline.created_at),
        source: "baseline",
    });
}

/// Detect documentation platforms and recommend one.
///
/// # Errors
///
/// Returns `Error::InvalidPath` for a bad project root.
pub fn detect_platform(request: &DetectPlatformRequest) -> Result<String, Error> {
    let root = request::validate_project_path(&request.project_path)?;
    let detections = platform::detect_platforms(&root);
    let language = platform::detect_language(&root);
    let (recommendation, rationale) = platform::recommend(&detections, &language);

    if request.response_format == ResponseFormat::Json {
        let result = json!({
            "detected_platforms": detections,
            "project_language": language,
            "rationale": rationale,
            "recommendation": recommendation.as_str(),
        });
        return Ok(serde_json::to_string_pretty(&result)?);
    }

    let mut out = String::from("# Documentation Platform Detection\n\n");
    if !detections.is_empty() {
        out.push_str("## Detected Platforms\n");
        for detection in &detections {
            let confidence = serde_json::to_value(detection.confidence)?;
            let _ = writeln!(
                out,
                "- **{}** ({} confidence)",
                detection.platform.as_str().to_uppercase(),
                confidence.as_str().unwrap_or("unknown")
            );
            for evidence in &detection.evidence {
                let _ = writeln!(out, "  - {evidence}");
            }
        }
        out.push('\n');
    }
    out.push_str("## Recommendation\n");
    let _ = writeln!(out, "**{}**\n", recommendation.as_str().to_uppercase());
    out.push_str("### Rationale:\n");
    for reason in &rationale {
        let _ = writeln!(out, "- {reason}");
    }
    out.push_str("\n### Project Context:\n");
    let _ = writeln!(out, "- Primary Language: {language}");
    return Ok(out);
}

/// Getting-started page for a bootstrapped docs set.
fn getting_started_page(name: &str, language: &str) -> String {
    let mut page = String::from("# Getting started\n\n");
    let _ = writeln!(page, "This guide takes you from a fresh checkout of {name} to a working build.\n");
    page.push_str("## Installation\n\n");
    let install = LANGUAGE_SETUP.iter().find(|(lang, _)| return *lang == language).map_or_else(
        || return "Follow the build instructions in the project README.\n\n".to_string(),
        |(_, command)| return format!("```bash\n{command}\n```\n\n"),
    );
    page.push_str(&install);
    page.push_str("## First steps\n\n");
    page.push_str("Describe the smallest useful thing a new user can do, with the exact commands.\n\n");
    page.push_str("## Next steps\n\n");
    page.push_str("- Read the [API reference](api-reference.md)\n");
    page.push_str("- Return to the [overview](index.md)\n");
    return page;
}

/// Overview page for a bootstrapped docs set.
fn index_page(name: &str, language: &str, chosen: Platform) -> String {
    let mut page = format!("# {name}\n\n");
    let _ = writeln!(page, "This is the documentation for {name}, a {language} project.\n");
    page.push_str("## Contents\n\n");
    page.push_str("- [Getting started](getting-started.md): install and run the project\n");
    page.push_str("- [API reference](api-reference.md): public functions and types\n\n");
    page.push_str("## About these docs\n\n");
    let _ = writeln!(page, "These pages are plain markdown, laid out for {}.", chosen.as_str());
    return page;
}

/// Write `.doc-manager.yml` with detected defaults.
///
/// # Errors
///
/// Returns path or pattern validation errors, or a write error.
pub fn initialize_config(request: &InitializeConfigRequest) -> Result<String, Error> {
    let root = request::validate_project_path(&request.project_path)?;
    request::validate_exclude_patterns(&request.exclude_patterns)?;

    let path = Config::path(&root);
    if path.exists() {
        return Ok(format!(
            "Configuration already exists at {}. Delete it first to reinitialize.",
            path.display()
        ));
    }

    let chosen = request.platform.unwrap_or_else(|| {
        return platform::detect_platforms(&root)
            .first()
            .map_or(Platform::Unknown, |detection| return detection.platform);
    });
    let language = platform::detect_language(&root);
    let docs_path = platform::find_docs_directory(&root)
        .map_or_else(|| return "docs".to_string(), |dir| return patterns::relative_to(&root, &dir));
    let sources = SOURCE_DIRECTORIES
        .iter()
        .filter(|dir| return root.join(dir).is_dir())
        .map(|dir| return (*dir).to_string())
        .collect();

    let config = Config {
        docs_path: docs_path.clone(),
        exclude: request.exclude_patterns.clone(),
        metadata: Metadata {
            created: chrono::Utc::now().to_rfc3339(),
            language: language.clone(),
            version: config::FORMAT_VERSION.to_string(),
        },
        platform: chosen,
        sources,
        use_gitignore: false,
    };
    config.write(&root)?;

    let mut out = format!("✓ Created {}\n\n", config::CONFIG_FILE);
    out.push_str("**Configuration Summary:**\n");
    let _ = writeln!(out, "- Platform: {}", chosen.as_str());
    let _ = writeln!(out, "- Documentation Path: {docs_path}");
    let _ = writeln!(out, "- Primary Language: {language}");
    let _ = writeln!(out, "- Exclude Patterns: {} patterns\n", request.exclude_patterns.len());
    out.push_str("Next steps:\n");
    out.push_str("1. Run `docmgr_initialize_memory` to set up the memory system\n");
    out.push_str("2. Run `docmgr_bootstrap` to generate documentation (if starting fresh)\n");
    out.push_str("3. Run `docmgr_migrate` to restructure existing documentation (if docs exist)\n");
    return Ok(out);
}

/// Create `.doc-manager/` with the baseline, conventions and asset manifest.
///
/// # Errors
///
/// Returns path validation or write errors.
pub fn initialize_memory(request: &InitializeMemoryRequest) -> Result<String, Error> {
    let project = Project::open(&request.project_path)?;
    let memory_dir = project.root.join(memory::MEMORY_DIR);
    if memory_dir.exists() {
        return Ok(format!(
            "Memory system already exists at {}. Delete it first to reinitialize.",
            memory_dir.display()
        ));
    }

    let baseline = Baseline::capture(&project.root, &project.config, &project.excludes);
    baseline.write(&project.root)?;
    lock::write_atomic(
        &project.root.join(memory::CONVENTIONS_FILE),
        memory::conventions_template().as_bytes(),
    )?;
    AssetManifest::empty_now().write(&project.root)?;

    let commit = baseline
        .git_commit
        .as_deref()
        .map_or("N/A", |hash| return hash.get(..8).unwrap_or(hash));
    let mut out = String::from("✓ Initialized documentation memory system\n\n");
    out.push_str("**Memory System Summary:**\n");
    let _ = writeln!(out, "- Repository: {}", baseline.repo_name);
    let _ = writeln!(out, "- Language: {}", baseline.language);
    let _ = writeln!(out, "- Documentation: {}", if baseline.docs_exist { "Found" } else { "Not found" });
    let _ = writeln!(out, "- Git Commit: {commit}");
    let _ = writeln!(out, "- Files Tracked: {}\n", baseline.file_count);
    out.push_str("**Created Files:**\n");
    for file in [memory::BASELINE_FILE, memory::CONVENTIONS_FILE, memory::ASSET_MANIFEST_FILE] {
        let _ = writeln!(out, "- {file}");
    }
    out.push_str("\nNext steps:\n");
    out.push_str("1. Customize `doc-conventions.md` to match your project's standards\n");
    out.push_str("2. Run `docmgr_bootstrap` or `docmgr_migrate` to set up documentation\n");
    out.push_str("3. Run `docmgr_sync` to keep docs in sync with code changes\n");
    return Ok(out);
}

/// Attach affected docs from the graph to every change.
fn join_graph(changes: &mut [FileChange], graph: Option<&DependencyGraph>) {
    let Some(graph) = graph else {
        return;
    };
    for change in changes {
        change.affected_docs = graph.docs_for_file(&change.path);
    }
}

/// Map changed files to the docs that reference them.
///
/// # Errors
///
/// Returns `Error::InvalidCommitHash`, or `Error::FileNotFound` when no
/// baseline exists to compare with.
pub fn map_changes(request: &MapChangesRequest) -> Result<String, Error> {
    let project = Project::open(&request.project_path)?;
    let mut change_set = detect_changes(&project, request.since_commit.as_deref())?;
    let graph = project.graph()?;
    join_graph(&mut change_set.changes, graph.as_ref());
    let by_doc = affected_by_doc(&change_set.changes);

    if request.response_format == ResponseFormat::Json {
        let result = json!({
            "affected_docs": by_doc,
            "changed_files": change_set.changes,
            "compared_against": change_set.compared_against,
            "graph_available": graph.is_some(),
            "source": change_set.source,
        });
        return Ok(serde_json::to_string_pretty(&result)?);
    }

    let mut out = String::from("# Code Change Mapping\n\n");
    let _ = writeln!(out, "**Compared against:** {}", change_set.compared_against);
    let _ = writeln!(out, "**Changed files:** {}", change_set.changes.len());
    let _ = writeln!(out, "**Affected docs:** {}\n", by_doc.len());
    if graph.is_none() {
        out.push_str("> No dependency graph found. Run `docmgr_track_dependencies` to map changes to documentation.\n\n");
    }
    if change_set.changes.is_empty() {
        out.push_str("No changes detected.\n");
        return Ok(out);
    }

    out.push_str("## Changed Files\n\n");
    for change in &change_set.changes {
        let status = serde_json::to_value(change.status)?;
        let _ = writeln!(out, "- `{}` ({})", change.path, status.as_str().unwrap_or("changed"));
        let targets = graph
            .as_ref()
            .map(|g| return g.targets_in_file(&change.path))
            .unwrap_or_default();
        if !targets.is_empty() {
            let listed: Vec<String> = targets.iter().map(|t| return format!("`{t}`")).collect();
            let _ = writeln!(out, "  - documented targets: {}", listed.join(", "));
        }
        for doc in &change.affected_docs {
            let _ = writeln!(out, "  - affects `{doc}`");
        }
    }
    if !by_doc.is_empty() {
        out.push_str("\n## Affected Documentation\n\n");
        for (doc, files) in &by_doc {
            let sources: Vec<String> = files.iter().map(|f| return format!("`{f}`")).collect();
            let _ = writeln!(out, "- `{doc}`: {}", sources.join(", "));
        }
    }
    return Ok(out);
}

/// Move a documentation tree to a new directory, keeping relative layout.
///
/// # Errors
///
/// Returns path validation errors, `Error::DocsNotFound` for a missing
/// source, or I/O errors while copying.
pub fn migrate(request: &MigrateRequest) -> Result<String, Error> {
    let project = Project::open(&request.project_path)?;
    let source = request::validate_relative_path(&project.root, &request.existing_docs_path)?;
    let target = request::validate_relative_path(&project.root, &request.new_docs_path)?;
    if !source.is_dir() {
        return Err(Error::DocsNotFound { path: source });
    }
    let source_relative = patterns::relative_to(&project.root, &source);
    let target_relative = patterns::relative_to(&project.root, &target);
    if target.starts_with(&source) || source.starts_with(&target) {
        return Err(Error::InvalidPath {
            path: target_relative,
            reason: "destination overlaps the existing docs directory".to_string(),
        });
    }
    if target.is_file() || (target.is_dir() && std::fs::read_dir(&target)?.next().is_some()) {
        return Err(Error::InvalidPath {
            path: target_relative,
            reason: "destination already contains files".to_string(),
        });
    }

    let mut moved = Vec::new();
    for file in project.excludes.walk(&project.root, &source) {
        let inner = file.path.strip_prefix(&source).unwrap_or(&file.path);
        let destination = target.join(inner);
        let to = patterns::relative_to(&project.root, &destination);
        let method = if request.dry_run {
            "preview"
        } else {
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if request.preserve_history && git::move_path(&project.root, &file.relative, &to) {
                "git mv"
            } else {
                if request.preserve_history {
                    log::warn!("git mv failed for {}, copying instead", file.relative);
                }
                std::fs::copy(&file.path, &destination)?;
                "copy"
            }
        };
        moved.push(MigratedFile {
            from: file.relative,
            method,
            to,
        });
    }

    let config_updated = !request.dry_run && Config::path(&project.root).exists();
    if config_updated {
        let mut updated = project.config.clone();
        updated.docs_path.clone_from(&target_relative);
        if let Some(chosen) = request.target_platform {
            updated.platform = chosen;
        }
        updated.write(&project.root)?;
    }

    let mut out = String::from("# Documentation Migration\n\n");
    let _ = writeln!(out, "**From:** `{source_relative}`");
    let _ = writeln!(out, "**To:** `{target_relative}`");
    if let Some(chosen) = request.target_platform {
        let _ = writeln!(out, "**Target platform:** {}", chosen.as_str());
    }
    let _ = writeln!(out, "**Files:** {}\n", moved.len());
    if request.dry_run {
        out.push_str("Dry run: no files were changed.\n\n");
    }
    let mut by_method: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in &moved {
        let count = by_method.entry(entry.method).or_default();
        *count = count.saturating_add(1);
    }
    for (method, count) in &by_method {
        let _ = writeln!(out, "- {method}: {count}");
    }
    out.push_str("\n## Files\n\n");
    for entry in &moved {
        let _ = writeln!(out, "- `{}` → `{}` ({})", entry.from, entry.to, entry.method);
    }
    if config_updated {
        let _ = writeln!(out, "\nUpdated `{}` to point at `{target_relative}`.", config::CONFIG_FILE);
    }
    return Ok(out);
}

/// Directory name of the project root.
fn project_name(root: &Path) -> String {
    return root
        .file_name()
        .map_or_else(|| return "this project".to_string(), |n| return n.to_string_lossy().into_owned());
}

/// Markdown list of validation issues, grouped by kind.
fn render_issue_sections(out: &mut String, issues: &[ValidationIssue]) {
    for kind in ISSUE_SECTIONS {
        let matching: Vec<&ValidationIssue> = issues.iter().filter(|i| return i.kind == kind).collect();
        if matching.is_empty() {
            continue;
        }
        let _ = writeln!(out, "## {} ({})\n", kind.title(), matching.len());
        for issue in matching {
            let _ = writeln!(out, "- `{}` line {}: {}", issue.file, issue.line, issue.detail);
        }
        out.push('\n');
    }
}

/// Docs to review, each with the changed files behind it (empty when the doc
/// itself was edited), and the validation issues found in them.
fn review_docs(project: &Project, changes: &[FileChange]) -> (BTreeMap<String, Vec<String>>, Vec<ValidationIssue>) {
    let mut review: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for change in changes {
        for doc in &change.affected_docs {
            review.entry(doc.clone()).or_default().push(change.path.clone());
        }
        if validation::is_markdown(&change.path) && change.status != ChangeStatus::Deleted {
            review.entry(change.path.clone()).or_default();
        }
    }

    let mut issues = Vec::new();
    for doc in review.keys() {
        let Ok(text) = std::fs::read_to_string(project.root.join(doc)) else {
            log::debug!("skipping unreadable {doc}");
            continue;
        };
        issues.extend(validation::validate_document(&project.root, doc, &text, Checks::default(), None));
    }
    return (review, issues);
}

/// Changed paths under the configured source directories; every change when
/// no sources are configured.
fn source_changes<'a>(changes: &'a [FileChange], sources: &[String]) -> Vec<&'a str> {
    let globs: Vec<String> = sources
        .iter()
        .map(|source| {
            if source.contains('*') {
                return source.clone();
            }
            return format!("{}/**", source.trim_end_matches('/'));
        })
        .collect();
    return changes
        .iter()
        .map(|change| return change.path.as_str())
        .filter(|path| return globs.is_empty() || patterns::matches(path, &globs))
        .collect();
}

/// Report what changed, which docs need review and what is wrong with them.
/// Proactive mode also rebuilds the dependency graph and refreshes the baseline.
///
/// # Errors
///
/// Returns `Error::FileNotFound` when memory has not been initialized.
pub fn sync(request: &SyncRequest) -> Result<String, Error> {
    let project = Project::open(&request.project_path)?;
    let mut change_set = detect_changes(&project, None)?;

    let mut updates = Vec::new();
    let graph = match request.mode {
        SyncMode::Proactive => match project.docs_dir(None) {
            Ok((docs_dir, docs_relative)) => {
                let tracked = track(&project, &docs_dir);
                tracked.graph.write(&project.root.join(graph::GRAPH_FILE))?;
                updates.push(format!(
                    "Rebuilt dependency graph from `{docs_relative}`: {} references",
                    tracked.graph.total_references
                ));
                Some(tracked.graph)
            },
            Err(Error::DocsNotFound { .. }) => {
                updates.push("Skipped dependency graph: no documentation directory".to_string());
                project.graph()?
            },
            Err(e) => return Err(e),
        },
        SyncMode::Reactive => project.graph()?,
    };
    join_graph(&mut change_set.changes, graph.as_ref());

    let (review, issues) = review_docs(&project, &change_set.changes);

    if request.mode == SyncMode::Proactive {
        let baseline = Baseline::capture(&project.root, &project.config, &project.excludes);
        baseline.write(&project.root)?;
        updates.push(format!("Refreshed baseline: {} files tracked", baseline.file_count));
    }

    let sources = source_changes(&change_set.changes, &project.config.sources);

    if request.response_format == ResponseFormat::Json {
        let result = json!({
            "changed_files": change_set.changes,
            "compared_against": change_set.compared_against,
            "docs_to_review": review,
            "graph_available": graph.is_some(),
            "issues": issues,
            "mode": request.mode.as_str(),
            "source_changes": sources,
            "updates": updates,
        });
        return Ok(serde_json::to_string_pretty(&result)?);
    }

    let errors = issues.iter().filter(|i| return i.severity == Severity::Error).count();
    let mut out = String::from("# Documentation Sync Report\n\n");
    let _ = writeln!(out, "**Mode:** {}", request.mode.as_str());
    let _ = writeln!(out, "**Compared against:** {}", change_set.compared_against);
    let _ = writeln!(out, "**Changed files:** {}", change_set.changes.len());
    let _ = writeln!(out, "**Source files changed:** {}", sources.len());
    let _ = writeln!(out, "**Docs needing review:** {}", review.len());
    let _ = writeln!(out, "**Validation issues:** {} ({errors} errors)\n", issues.len());
    if graph.is_none() {
        out.push_str("> No dependency graph found. Run `docmgr_track_dependencies` or sync in proactive mode.\n\n");
    }
    if change_set.changes.is_empty() {
        out.push_str("✓ No changes since the baseline. Documentation is in sync.\n\n");
    }
    if !review.is_empty() {
        out.push_str("## Docs Needing Review\n\n");
        for (doc, sources) in &review {
            if sources.is_empty() {
                let _ = writeln!(out, "- `{doc}` (edited directly)");
            } else {
                let listed: Vec<String> = sources.iter().map(|s| return format!("`{s}`")).collect();
                let _ = writeln!(out, "- `{doc}` (changed: {})", listed.join(", "));
            }
        }
        out.push('\n');
    }
    render_issue_sections(&mut out, &issues);
    if !updates.is_empty() {
        out.push_str("## Updates\n\n");
        for update in &updates {
            let _ = writeln!(out, "- {update}");
        }
    }
    return Ok(out);
}

/// Extract and resolve every reference in the docs below `docs_dir`.
fn track(project: &Project, docs_dir: &Path) -> Tracking {
    let index = symbols::build_index(&project.root, &project.excludes);
    let files = ProjectFiles::scan(&project.root, &project.excludes);
    let matcher = Matcher::new(&files, &index);
    let docs = heuristics::load_documents(&project.root, docs_dir, &project.excludes);

    let mut matches = Vec::new();
    let mut unresolved = Vec::new();
    for doc in &docs {
        for candidate in scanner::extract(&doc.text, &doc.relative) {
            match matcher.resolve(&candidate) {
                Some(found) => matches.push(found),
                None => unresolved.push(candidate),
            }
        }
    }
    log::debug!("{} references resolved, {} unresolved", matches.len(), unresolved.len());

    return Tracking {
        docs_scanned: docs.len(),
        graph: DependencyGraph::build(&matches),
        unresolved,
    };
}

/// Build and persist the doc ↔ code dependency graph.
///
/// # Errors
///
/// Returns path errors, `Error::DocsNotFound`, or a write error.
pub fn track_dependencies(request: &TrackDependenciesRequest) -> Result<String, Error> {
    let project = Project::open(&request.project_path)?;
    let (docs_dir, docs_relative) = project.docs_dir(request.docs_path.as_deref())?;
    let tracked = track(&project, &docs_dir);
    tracked.graph.write(&project.root.join(graph::GRAPH_FILE))?;

    if request.response_format == ResponseFormat::Json {
        let mut result = serde_json::to_value(&tracked.graph)?;
        if let Value::Object(map) = &mut result {
            map.insert("docs_scanned".to_string(), json!(tracked.docs_scanned));
            map.insert("graph_file".to_string(), json!(graph::GRAPH_FILE));
            let unresolved: Vec<Value> = tracked
                .unresolved
                .iter()
                .map(|c| {
                    return json!({
                        "doc_file": c.doc_file,
                        "kind": c.kind.as_str(),
                        "line": c.line,
                        "text": c.raw_text,
                    });
                })
                .collect();
            map.insert("unresolved".to_string(), Value::Array(unresolved));
        }
        return Ok(serde_json::to_string_pretty(&result)?);
    }

    let graph = &tracked.graph;
    let mut out = String::from("# Dependency Tracking Report\n\n");
    let _ = writeln!(
        out,
        "Scanned {} documents in `{docs_relative}` and found {} references to {} code targets.",
        tracked.docs_scanned,
        graph.total_references,
        graph.code_to_doc.len()
    );
    let _ = writeln!(out, "Graph written to `{}`.\n", graph::GRAPH_FILE);

    if !graph.doc_to_code.is_empty() {
        out.push_str("## Documentation → Code\n\n");
        for (doc, targets) in &graph.doc_to_code {
            let _ = writeln!(out, "### `{doc}`\n");
            for target in targets {
                let _ = writeln!(out, "- `{target}`");
            }
            out.push('\n');
        }

        out.push_str("## Code → Documentation\n\n");
        let mut by_reach: Vec<(&String, &BTreeSet<String>)> = graph.code_to_doc.iter().collect();
        by_reach.sort_by(|a, b| return b.1.len().cmp(&a.1.len()).then_with(|| return a.0.cmp(b.0)));
        for (target, docs) in by_reach {
            let listed: Vec<String> = docs.iter().map(|d| return format!("`{d}`")).collect();
            let _ = writeln!(out, "- `{target}` ← {}", listed.join(", "));
        }
        out.push('\n');
    }

    if !tracked.unresolved.is_empty() {
        let _ = writeln!(out, "## Unresolved References ({})\n", tracked.unresolved.len());
        out.push_str("These mentions match no file, command, config key or symbol in the project.\n\n");
        for candidate in &tracked.unresolved {
            let _ = writeln!(
                out,
                "- `{}` ({}) in `{}` line {}",
                candidate.raw_text,
                candidate.kind.as_str(),
                candidate.doc_file,
                candidate.line
            );
        }
    }
    return Ok(out);
}

/// Validate links, assets, snippets and (optionally) symbols.
///
/// # Errors
///
/// Returns path errors or `Error::DocsNotFound`.
pub fn validate_docs(request: &ValidateDocsRequest) -> Result<String, Error> {
    let project = Project::open(&request.project_path)?;
    let (docs_dir, docs_relative) = project.docs_dir(request.docs_path.as_deref())?;
    let checks = Checks {
        assets: request.check_assets,
        links: request.check_links,
        snippets: request.check_snippets,
        symbols: request.validate_symbols,
    };
    let report = validation::validate_docs(&project.root, &docs_dir, &project.excludes, checks)?;

    if request.response_format == ResponseFormat::Json {
        let result = json!({
            "docs_path": docs_relative,
            "files_checked": report.files_checked,
            "issues": report.issues,
            "total_issues": report.issues.len(),
        });
        return Ok(serde_json::to_string_pretty(&result)?);
    }

    let errors = report.issues.iter().filter(|i| return i.severity == Severity::Error).count();
    let warnings = report.issues.len().saturating_sub(errors);
    let mut out = String::from("# Documentation Validation Report\n\n");
    let _ = writeln!(out, "**Docs path:** `{docs_relative}`");
    let _ = writeln!(out, "**Files checked:** {}", report.files_checked);
    let _ = writeln!(
        out,
        "**Issues found:** {} ({errors} errors, {warnings} warnings)\n",
        report.issues.len()
    );
    if report.issues.is_empty() {
        out.push_str("✓ Documentation is valid: 0 issues found.\n");
        return Ok(out);
    }
    for kind in ISSUE_SECTIONS {
        let count = report.count(kind);
        if count > 0 {
            let _ = writeln!(out, "- {}: {count}", kind.as_str());
        }
    }
    out.push('\n');
    render_issue_sections(&mut out, &report.issues);
    return Ok(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        return dir;
    }

    fn root_arg(dir: &tempfile::TempDir) -> String {
        return dir.path().to_str().unwrap().to_string();
    }

    #[test]
    fn unknown_tool_and_bad_arguments() {
        assert!(call("docmgr_frobnicate", json!({})).starts_with("Error: UnknownTool:"));
        let out = call(DETECT_PLATFORM, json!({"project_path": "/tmp", "colour": "blue"}));
        assert!(out.starts_with("Error: InvalidRequest:"));
        let out = call(DETECT_PLATFORM, json!({"project_path": "relative/path"}));
        assert!(out.starts_with("Error: InvalidPath:"));
    }

    #[test]
    fn detect_platform_reports_json() {
        let dir = project();
        std::fs::write(dir.path().join("mkdocs.yml"), "site_name: x\n").unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "").unwrap();

        let out = call(DETECT_PLATFORM, json!({"project_path": root_arg(&dir), "response_format": "json"}));
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["recommendation"], "mkdocs");
        assert_eq!(parsed["project_language"], "Python");
        assert_eq!(parsed["detected_platforms"][0]["confidence"], "high");

        let out = call(DETECT_PLATFORM, json!({"project_path": root_arg(&dir)}));
        assert!(out.starts_with("# Documentation Platform Detection"));
        assert!(out.contains("- **MKDOCS** (high confidence)"));
        assert!(out.contains("- Primary Language: Python"));
    }

    #[test]
    fn initialize_config_once() {
        let dir = project();
        let out = call(INITIALIZE_CONFIG, json!({"project_path": root_arg(&dir), "platform": "hugo"}));
        assert!(out.contains("**Configuration Summary:**"), "{out}");
        assert!(out.contains("- Platform: hugo"));
        assert!(out.contains("- Exclude Patterns: 4 patterns"));

        let config = Config::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.platform, Platform::Hugo);
        assert_eq!(config.docs_path, "docs");
        assert_eq!(config.sources, vec!["src"]);

        let again = call(INITIALIZE_CONFIG, json!({"project_path": root_arg(&dir)}));
        assert!(again.contains("already exists"));
    }

    #[test]
    fn initialize_config_rejects_unsafe_patterns() {
        let dir = project();
        let out = call(INITIALIZE_CONFIG, json!({"project_path": root_arg(&dir), "exclude_patterns": ["(a+)+"]}));
        assert!(out.starts_with("Error: InvalidPattern:"));
        assert!(!Config::path(dir.path()).exists());
    }

    #[test]
    fn initialize_memory_writes_artifacts() {
        let dir = project();
        std::fs::write(dir.path().join("docs/index.md"), "# Home\n").unwrap();
        let out = call(INITIALIZE_MEMORY, json!({"project_path": root_arg(&dir)}));
        assert!(out.contains("**Memory System Summary:**"), "{out}");
        assert!(out.contains("- Documentation: Found"));
        assert!(out.contains("- Files Tracked: 1"));
        assert!(dir.path().join(memory::BASELINE_FILE).exists());
        assert!(dir.path().join(memory::CONVENTIONS_FILE).exists());
        assert!(dir.path().join(memory::ASSET_MANIFEST_FILE).exists());

        let again = call(INITIALIZE_MEMORY, json!({"project_path": root_arg(&dir)}));
        assert!(again.contains("already exists"));
    }

    #[test]
    fn validate_docs_clean_and_broken() {
        let dir = project();
        std::fs::write(dir.path().join("docs/index.md"), "# Home\n\nSee [guide](guide.md).\n").unwrap();
        std::fs::write(dir.path().join("docs/guide.md"), "# Guide\n\nBack to [home](index.md).\n").unwrap();

        let out = call(VALIDATE_DOCS, json!({"project_path": root_arg(&dir)}));
        assert!(out.to_lowercase().contains("documentation is valid"), "{out}");
        assert!(out.contains("0 issues"));

        std::fs::write(dir.path().join("docs/guide.md"), "# Guide\n\n\n\nSee [gone](missing.md).\n").unwrap();
        let out = call(VALIDATE_DOCS, json!({"project_path": root_arg(&dir)}));
        assert!(out.contains("## Broken Links (1)"), "{out}");
        assert!(out.contains("`docs/guide.md` line 5"));
        assert!(out.contains("missing.md"));
    }

    #[test]
    fn validate_docs_missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = call(VALIDATE_DOCS, json!({"project_path": root_arg(&dir), "docs_path": "nowhere"}));
        assert!(out.starts_with("Error: DocsNotFound:"));
        let out = call(VALIDATE_DOCS, json!({"project_path": root_arg(&dir), "docs_path": "../up"}));
        assert!(out.starts_with("Error: InvalidPath:"));
    }

    #[test]
    fn track_writes_graph() {
        let dir = project();
        std::fs::write(
            dir.path().join("docs/guide.md"),
            "# Configuration Guide\n\nEdit the `config.yaml` file.\nModify settings in `src/settings.py`.\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("config.yaml"), "key: value\n").unwrap();
        std::fs::write(dir.path().join("src/settings.py"), "SETTING = True\n").unwrap();

        let out = call(TRACK_DEPENDENCIES, json!({"project_path": root_arg(&dir)}));
        assert!(out.contains("config.yaml"));
        assert!(out.contains("src/settings.py"));
        assert!(out.to_lowercase().contains("dependency"));
        assert!(dir.path().join(graph::GRAPH_FILE).exists());

        let out = call(TRACK_DEPENDENCIES, json!({"project_path": root_arg(&dir), "response_format": "json"}));
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert!(parsed["doc_to_code"]["docs/guide.md"].is_array());
        assert!(parsed["total_references"].as_u64().unwrap() >= 2);
    }

    #[test]
    fn track_empty_docs_reports_zero() {
        let dir = project();
        let out = call(TRACK_DEPENDENCIES, json!({"project_path": root_arg(&dir)}));
        assert!(out.contains("found 0 references"), "{out}");
    }

    #[test]
    fn map_changes_against_baseline() {
        let dir = project();
        std::fs::write(dir.path().join("docs/guide.md"), "# Guide\n\nSettings live in `src/settings.py`.\n").unwrap();
        std::fs::write(dir.path().join("src/settings.py"), "SETTING = True\n").unwrap();
        call(INITIALIZE_MEMORY, json!({"project_path": root_arg(&dir)}));
        call(TRACK_DEPENDENCIES, json!({"project_path": root_arg(&dir)}));

        std::fs::write(dir.path().join("src/settings.py"), "SETTING = False\n").unwrap();
        let out = call(MAP_CHANGES, json!({"project_path": root_arg(&dir), "response_format": "json"}));
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["source"], "baseline");
        assert_eq!(parsed["changed_files"][0]["path"], "src/settings.py");
        assert_eq!(parsed["changed_files"][0]["status"], "modified");
        assert_eq!(parsed["affected_docs"]["docs/guide.md"][0], "src/settings.py");
    }

    #[test]
    fn map_changes_rejects_injection() {
        let dir = project();
        let out = call(MAP_CHANGES, json!({"project_path": root_arg(&dir), "since_commit": "HEAD; rm -rf /"}));
        assert!(out.starts_with("Error: InvalidCommitHash:"));
    }

    #[test]
    fn sync_needs_memory_then_refreshes() {
        let dir = project();
        std::fs::write(dir.path().join("docs/index.md"), "# Home\n").unwrap();
        let out = call(SYNC, json!({"project_path": root_arg(&dir)}));
        assert!(out.starts_with("Error: FileNotFound:"));
        assert!(out.contains("docmgr_initialize_memory"));

        call(INITIALIZE_MEMORY, json!({"project_path": root_arg(&dir)}));
        std::fs::write(dir.path().join("docs/new.md"), "# New\n\n![](missing.png)\n").unwrap();

        let out = call(SYNC, json!({"project_path": root_arg(&dir), "mode": "proactive"}));
        assert!(out.contains("**Mode:** proactive"), "{out}");
        assert!(out.contains("`docs/new.md` (edited directly)"));
        assert!(out.contains("## Missing Assets (1)"));
        assert!(out.contains("Refreshed baseline"));

        let out = call(SYNC, json!({"project_path": root_arg(&dir)}));
        assert!(out.contains("**Changed files:** 0"), "{out}");
    }

    #[test]
    fn bootstrap_creates_pages_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"x\"\n").unwrap();
        let out = call(BOOTSTRAP, json!({"project_path": root_arg(&dir)}));
        assert!(out.contains("✓ Bootstrapped documentation in `docs`"), "{out}");
        for page in ["index.md", "getting-started.md", "api-reference.md"] {
            assert!(dir.path().join("docs").join(page).exists(), "{page}");
        }
        let started = std::fs::read_to_string(dir.path().join("docs/getting-started.md")).unwrap();
        assert!(started.contains("cargo build"));

        let report = call(VALIDATE_DOCS, json!({"project_path": root_arg(&dir)}));
        assert!(report.contains("0 issues"), "{report}");

        let again = call(BOOTSTRAP, json!({"project_path": root_arg(&dir)}));
        assert!(again.starts_with("Error: InvalidPath:"));
    }

    #[test]
    fn migrate_dry_run_then_copy() {
        let dir = project();
        std::fs::create_dir_all(dir.path().join("docs/guide")).unwrap();
        std::fs::write(dir.path().join("docs/index.md"), "# Home\n").unwrap();
        std::fs::write(dir.path().join("docs/guide/setup.md"), "# Setup\n").unwrap();

        let args = json!({"project_path": root_arg(&dir), "existing_docs_path": "docs", "dry_run": true});
        let out = call(MIGRATE, args);
        assert!(out.contains("Dry run"), "{out}");
        assert!(out.contains("`docs/guide/setup.md` → `docs-new/guide/setup.md` (preview)"));
        assert!(!dir.path().join("docs-new").exists());

        let args = json!({"project_path": root_arg(&dir), "existing_docs_path": "docs", "preserve_history": false});
        let out = call(MIGRATE, args);
        assert!(out.contains("(copy)"), "{out}");
        assert!(dir.path().join("docs-new/guide/setup.md").exists());
        assert!(dir.path().join("docs-new/index.md").exists());
    }

    #[test]
    fn migrate_rejects_overlap() {
        let dir = project();
        std::fs::write(dir.path().join("docs/index.md"), "# Home\n").unwrap();
        let args = json!({"project_path": root_arg(&dir), "existing_docs_path": "docs", "new_docs_path": "docs/v2"});
        assert!(call(MIGRATE, args).starts_with("Error: InvalidPath:"));
    }

    #[test]
    fn assess_quality_empty_docs() {
        let dir = project();
        let out = call(ASSESS_QUALITY, json!({"project_path": root_arg(&dir)}));
        assert!(out.contains("No files found"), "{out}");
    }
}
