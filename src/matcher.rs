//! Resolution of candidate references against real files, commands, config
//! keys and indexed symbols.
//!
//! Paths match whole segments or separator-anchored suffixes, commands match
//! whole tokens, symbols match exact names. Nothing here uses raw substring
//! containment, so `save.py` never resolves to `autosave.py` and `add` never
//! resolves to `add_user`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::patterns::ExcludeSet;
use crate::scanner;
use crate::symbols::SymbolIndex;
use crate::types::{
    CandidateReference, IssueKind, Match, ReferenceKind, Severity, Symbol, SymbolKind, ValidationIssue,
};

/// Directory names whose files define CLI subcommands.
const COMMAND_DIRS: &[&str] = &["bin", "cli", "cmd", "cmds", "command", "commands", "subcommands"];

/// Extensions of files scanned for configuration keys.
const CONFIG_EXTENSIONS: &[&str] = &["cfg", "env", "ini", "json", "toml", "yaml", "yml"];

/// Config files above this size are not scanned for keys (1 MiB).
const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

/// Stems that name their parent directory rather than themselves.
const PACKAGE_STEMS: &[&str] = &["__init__", "__main__", "index", "main", "mod"];

/// Key declaration in YAML, TOML, INI, `.env` or JSON.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static CONFIG_KEY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"^\s*(?:-\s+)?"?([A-Za-z_][\w.-]*)"?\s*[:=]"#).expect("valid regex");
});

/// Resolves candidates against one project snapshot.
pub struct Matcher<'a> {
    /// Files, commands and config keys of the project.
    files: &'a ProjectFiles,
    /// Public symbol index.
    index: &'a SymbolIndex,
}

/// File listing of a project plus the command surface and config keys
/// derived from it.
#[derive(Debug, Default)]
pub struct ProjectFiles {
    /// Command name → files defining it, sorted.
    commands: BTreeMap<String, Vec<String>>,
    /// Config key → config files declaring it, sorted.
    config_keys: BTreeMap<String, Vec<String>>,
    /// Root-relative file paths.
    files: BTreeSet<String>,
    /// Name the project's own binary is invoked by: the root directory name.
    program: Option<String>,
}

impl<'a> Matcher<'a> {
    /// Matcher over a file listing and symbol index.
    pub const fn new(files: &'a ProjectFiles, index: &'a SymbolIndex) -> Self {
        return Self { files, index };
    }

    /// Resolve one candidate to a match, or `None` for ordinary prose.
    pub fn resolve(&self, candidate: &CandidateReference) -> Option<Match> {
        let code_target = match candidate.kind {
            ReferenceKind::ClassName => self.resolve_class(&candidate.raw_text),
            ReferenceKind::CliCommand => self.resolve_command(&candidate.raw_text),
            ReferenceKind::ConfigKey => self.resolve_config_key(&candidate.raw_text),
            ReferenceKind::FilePath => self.resolve_path(&candidate.raw_text, &candidate.doc_file),
            ReferenceKind::FunctionCall => self.resolve_function(&candidate.raw_text),
        }?;

        return Some(Match {
            code_target,
            doc_file: candidate.doc_file.clone(),
            line: candidate.line,
            reference_kind: candidate.kind,
        });
    }

    /// Class lookup: class declarations first, then anything with that name.
    fn resolve_class(&self, name: &str) -> Option<String> {
        let symbols = self.index.lookup(name);
        return symbols
            .iter()
            .find(|s| return s.kind == SymbolKind::Class)
            .or_else(|| return symbols.first())
            .map(Symbol::code_target);
    }

    /// The first word names the command. When it is the project's own
    /// program, the first non-flag word after it names the subcommand.
    fn resolve_command(&self, raw: &str) -> Option<String> {
        let mut words = raw.split_whitespace();
        let first = words.next()?;
        if let Some(files) = self.files.commands.get(first) {
            return files.first().cloned();
        }
        if self.files.program.as_deref() != Some(first) {
            return None;
        }
        let subcommand = words.find(|word| return !word.starts_with('-'))?;
        return self.files.commands.get(subcommand)?.first().cloned();
    }

    /// Key before `:`/`=`, then its last dotted segment.
    fn resolve_config_key(&self, raw: &str) -> Option<String> {
        let key = raw.split([':', '=']).next()?.trim();
        let last_segment = key.rsplit('.').next().unwrap_or(key);
        return [key, last_segment]
            .iter()
            .find_map(|k| return self.files.config_keys.get(*k)?.first().cloned());
    }

    /// `name(...)` or `Scope.name(...)` via exact index lookup.
    fn resolve_function(&self, raw: &str) -> Option<String> {
        let (scope, name) = split_call(raw)?;
        return match scope {
            Some(scope) => self.index.lookup_qualified(scope, name).first().map(|s| return s.code_target()),
            None => self.index.lookup(name).first().map(Symbol::code_target),
        };
    }

    /// Doc-relative, then root-relative, then shortest separator-anchored suffix.
    fn resolve_path(&self, raw: &str, doc_file: &str) -> Option<String> {
        let cleaned = raw.trim().trim_end_matches('/');
        if cleaned.is_empty() {
            return None;
        }

        if let Some(root_relative) = cleaned.strip_prefix('/') {
            return normalize_relative(root_relative).filter(|p| return self.files.contains_path(p));
        }

        let doc_dir = doc_file.rsplit_once('/').map_or("", |(dir, _)| return dir);
        let attempts = [normalize_relative(&format!("{doc_dir}/{cleaned}")), normalize_relative(cleaned)];
        for attempt in attempts.into_iter().flatten() {
            if self.files.contains_path(&attempt) {
                return Some(attempt);
            }
        }

        let suffix = normalize_relative(cleaned)?;
        if suffix.is_empty() {
            return None;
        }
        let anchored = format!("/{suffix}");
        return self
            .files
            .files
            .iter()
            .filter(|path| return path.ends_with(&anchored))
            .min_by(|a, b| return a.len().cmp(&b.len()).then_with(|| return a.cmp(b)))
            .cloned();
    }
}

impl ProjectFiles {
    /// Whether `path` is a known file, or a directory holding known files.
    fn contains_path(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        if self.files.contains(path) {
            return true;
        }
        let prefix = format!("{path}/");
        return self
            .files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|first| return first.starts_with(&prefix));
    }

    /// Record one file, deriving its command name and config keys.
    fn record(&mut self, relative: String, absolute: &Path) {
        if let Some(command) = command_name(&relative) {
            self.commands.entry(command).or_default().push(relative.clone());
        }
        if is_config_file(&relative) {
            for key in config_keys(absolute) {
                let files = self.config_keys.entry(key).or_default();
                if !files.contains(&relative) {
                    files.push(relative.clone());
                }
            }
        }
        self.files.insert(relative);
    }

    /// List the project under `root`, honouring the exclude set.
    pub fn scan(root: &Path, excludes: &ExcludeSet) -> Self {
        let mut listing = Self {
            program: root.file_name().map(|name| return name.to_string_lossy().into_owned()),
            ..Self::default()
        };
        for file in excludes.walk(root, root) {
            listing.record(file.relative, &file.path);
        }
        for files in listing.commands.values_mut().chain(listing.config_keys.values_mut()) {
            files.sort();
        }
        return listing;
    }
}

/// `missing_symbol` issues for function and class spans absent from the index.
/// The issue target carries the full span text, e.g. `MyClass.render()`.
pub fn check_symbols(text: &str, doc_file: &str, index: &SymbolIndex) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for span in scanner::inline_spans(text) {
        let Some((kind, raw)) = scanner::classify_span(&span.text) else {
            continue;
        };
        let exists = match kind {
            ReferenceKind::ClassName => !index.lookup(&raw).is_empty(),
            ReferenceKind::FunctionCall => match split_call(&raw) {
                Some((Some(scope), name)) => !index.lookup_qualified(scope, name).is_empty(),
                Some((None, name)) => !index.lookup(name).is_empty(),
                None => true,
            },
            ReferenceKind::CliCommand | ReferenceKind::ConfigKey | ReferenceKind::FilePath => continue,
        };
        if exists {
            continue;
        }
        issues.push(ValidationIssue {
            detail: format!("Symbol `{}` not found in codebase", span.text),
            file: doc_file.to_string(),
            kind: IssueKind::MissingSymbol,
            language: None,
            line: span.line,
            severity: Severity::Warning,
            target: Some(span.text.clone()),
        });
    }
    return issues;
}

/// Command name a file defines, if it lives under a command directory.
/// `cmd/add.go` → `add`; `cmd/add/main.go` → `add`.
fn command_name(relative: &str) -> Option<String> {
    let segments: Vec<&str> = relative.split('/').collect();
    let (file_name, dirs) = segments.split_last()?;
    if !dirs.iter().any(|d| return COMMAND_DIRS.contains(d)) {
        return None;
    }
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    if !PACKAGE_STEMS.contains(&stem) {
        return Some(stem.to_string());
    }
    let parent = dirs.last()?;
    return (!COMMAND_DIRS.contains(parent)).then(|| return (*parent).to_string());
}

/// Keys declared in a config file; unreadable or oversized files yield none.
fn config_keys(path: &Path) -> BTreeSet<String> {
    let too_large = std::fs::metadata(path).is_ok_and(|m| return m.len() > MAX_CONFIG_SIZE);
    if too_large {
        log::debug!("skipping oversized config {}", path.display());
        return BTreeSet::new();
    }
    let Ok(content) = std::fs::read_to_string(path) else {
        log::debug!("skipping unreadable config {}", path.display());
        return BTreeSet::new();
    };
    return content
        .lines()
        .filter_map(|line| return CONFIG_KEY_DECL.captures(line)?.get(1))
        .map(|m| return m.as_str().to_string())
        .collect();
}

/// Whether the file's extension marks it as configuration.
fn is_config_file(relative: &str) -> bool {
    return Path::new(relative)
        .extension()
        .and_then(|e| return e.to_str())
        .is_some_and(|ext| return CONFIG_EXTENSIONS.contains(&ext));
}

/// Collapse `.` and `..` in a relative path. Returns `None` when the path
/// climbs above its starting point.
pub fn normalize_relative(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {},
            ".." => {
                parts.pop()?;
            },
            other => parts.push(other),
        }
    }
    return Some(parts.join("/"));
}

/// Split `Scope.name(args)` into its optional scope and bare name.
fn split_call(raw: &str) -> Option<(Option<&str>, &str)> {
    let callee = raw.split('(').next()?.trim();
    if callee.is_empty() {
        return None;
    }
    return Some(match callee.rsplit_once('.') {
        Some((scope, name)) => (Some(scope), name),
        None => (None, callee),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols;

    fn project(files: &[(&str, &str)]) -> (tempfile::TempDir, ProjectFiles, SymbolIndex) {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        let excludes = ExcludeSet::defaults_only();
        let listing = ProjectFiles::scan(dir.path(), &excludes);
        let index = symbols::build_index(dir.path(), &excludes);
        return (dir, listing, index);
    }

    fn candidate(kind: ReferenceKind, raw: &str) -> CandidateReference {
        return CandidateReference {
            doc_file: "docs/guide.md".to_string(),
            kind,
            line: 4,
            raw_text: raw.to_string(),
        };
    }

    #[test]
    fn path_never_matches_substring() {
        let (_dir, files, index) = project(&[("src/save.py", ""), ("src/autosave.py", "")]);
        let matcher = Matcher::new(&files, &index);

        let found = matcher.resolve(&candidate(ReferenceKind::FilePath, "save.py")).unwrap();
        assert_eq!(found.code_target, "src/save.py");
        assert_eq!(found.line, 4);

        let found = matcher.resolve(&candidate(ReferenceKind::FilePath, "autosave.py")).unwrap();
        assert_eq!(found.code_target, "src/autosave.py");

        assert!(matcher.resolve(&candidate(ReferenceKind::FilePath, "ave.py")).is_none());
    }

    #[test]
    fn path_resolution_order() {
        let (_dir, files, index) = project(&[
            ("docs/setup.md", ""),
            ("setup.md", ""),
            ("pkg/deep/util.rs", ""),
            ("lib/util.rs", ""),
        ]);
        let matcher = Matcher::new(&files, &index);
        let resolve = |raw: &str| matcher.resolve(&candidate(ReferenceKind::FilePath, raw)).map(|m| m.code_target);

        assert_eq!(resolve("setup.md").as_deref(), Some("docs/setup.md"));
        assert_eq!(resolve("../setup.md").as_deref(), Some("setup.md"));
        assert_eq!(resolve("/setup.md").as_deref(), Some("setup.md"));
        assert_eq!(resolve("util.rs").as_deref(), Some("lib/util.rs"));
        assert_eq!(resolve("pkg/").as_deref(), Some("pkg"));
        assert_eq!(resolve("../../etc/passwd"), None);
    }

    #[test]
    fn command_matches_whole_token_only() {
        let (_dir, files, index) = project(&[("cmd/add.go", ""), ("cmd/add_user.go", ""), ("cmd/serve/main.go", "")]);
        let matcher = Matcher::new(&files, &index);
        let resolve = |raw: &str| matcher.resolve(&candidate(ReferenceKind::CliCommand, raw)).map(|m| m.code_target);

        assert_eq!(resolve("add").as_deref(), Some("cmd/add.go"));
        assert_eq!(resolve("add --force").as_deref(), Some("cmd/add.go"));
        assert_eq!(resolve("add_user").as_deref(), Some("cmd/add_user.go"));
        assert_eq!(resolve("serve").as_deref(), Some("cmd/serve/main.go"));
        assert_eq!(resolve("ad"), None);
        assert_eq!(resolve("adduser"), None);
    }

    #[test]
    fn command_is_the_first_word_unless_it_names_the_project() {
        let (dir, files, index) = project(&[("cmd/status.go", ""), ("cmd/build.go", ""), ("cmd/add.go", "")]);
        let program = dir.path().file_name().unwrap().to_string_lossy().into_owned();
        let matcher = Matcher::new(&files, &index);
        let resolve = |raw: &str| matcher.resolve(&candidate(ReferenceKind::CliCommand, raw)).map(|m| m.code_target);

        assert_eq!(resolve("git status"), None);
        assert_eq!(resolve("cd build && make"), None);
        assert_eq!(resolve("status --short").as_deref(), Some("cmd/status.go"));
        assert_eq!(resolve(&format!("{program} add --force")).as_deref(), Some("cmd/add.go"));
        assert_eq!(resolve(&format!("{program} --verbose build")).as_deref(), Some("cmd/build.go"));
        assert_eq!(resolve(&format!("{program} --verbose")), None);
    }

    #[test]
    fn config_keys_match_declarations() {
        let (_dir, files, index) = project(&[("config/app.yaml", "server:\n  timeout: 30\n"), ("app.toml", "retries = 3\n")]);
        let matcher = Matcher::new(&files, &index);
        let resolve = |raw: &str| matcher.resolve(&candidate(ReferenceKind::ConfigKey, raw)).map(|m| m.code_target);

        assert_eq!(resolve("timeout: 60").as_deref(), Some("config/app.yaml"));
        assert_eq!(resolve("server.timeout: 60").as_deref(), Some("config/app.yaml"));
        assert_eq!(resolve("retries=5").as_deref(), Some("app.toml"));
        assert_eq!(resolve("time: 1"), None);
    }

    #[test]
    fn symbols_resolve_by_exact_and_qualified_name() {
        let (_dir, files, index) = project(&[(
            "app/widget.py",
            "class Widget:\n    def render(self):\n        pass\n\ndef render_all():\n    pass\n",
        )]);
        let matcher = Matcher::new(&files, &index);
        let resolve = |kind, raw: &str| matcher.resolve(&candidate(kind, raw)).map(|m| m.code_target);

        assert_eq!(resolve(ReferenceKind::ClassName, "Widget").as_deref(), Some("app/widget.py#Widget"));
        assert_eq!(
            resolve(ReferenceKind::FunctionCall, "Widget.render()").as_deref(),
            Some("app/widget.py#Widget.render")
        );
        assert_eq!(resolve(ReferenceKind::FunctionCall, "render_all()").as_deref(), Some("app/widget.py#render_all"));
        assert_eq!(resolve(ReferenceKind::FunctionCall, "Other.render()"), None);
        assert_eq!(resolve(ReferenceKind::FunctionCall, "render_al()"), None);
    }

    #[test]
    fn missing_symbols_carry_full_span() {
        let (_dir, _files, index) = project(&[("app.py", "class Widget:\n    def render(self):\n        pass\n")]);
        let text = "# Doc\n\nUse `Widget.render()` and `MyClass.render()`.\n\nAlso `Ghost`.\n";
        let issues = check_symbols(text, "docs/a.md", &index);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].target.as_deref(), Some("MyClass.render()"));
        assert_eq!(issues[0].line, 3);
        assert_eq!(issues[0].kind, IssueKind::MissingSymbol);
        assert_eq!(issues[1].target.as_deref(), Some("Ghost"));
        assert_eq!(issues[1].line, 5);
    }

    #[test]
    fn normalization_rejects_escape() {
        assert_eq!(normalize_relative("docs/../src/./a.rs").as_deref(), Some("src/a.rs"));
        assert_eq!(normalize_relative("docs/../../a.rs"), None);
    }
}
