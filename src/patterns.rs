//! Exclude-pattern evaluation, pattern safety checks and the filtered project walk.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::{GlobBuilder, GlobMatcher};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use regex::Regex;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;

/// Patterns every walk excludes after user and gitignore patterns.
pub const DEFAULT_EXCLUDES: &[&str] =
    &["**/node_modules", "**/dist", "**/vendor", "**/*.log", "**/.git"];

/// Most patterns a single list may carry.
pub const MAX_PATTERN_COUNT: usize = 50;

/// Longest accepted pattern, in characters.
pub const MAX_PATTERN_LENGTH: usize = 512;

/// A group with an inner quantifier followed by another quantifier, e.g. `(a+)+`.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static NESTED_QUANTIFIER: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"\([^)]*[+*]\)[+*]").expect("valid regex"));

/// Effective exclusion layers for one project: user patterns, then the
/// optional `.gitignore` layer, then the built-in defaults.
pub struct ExcludeSet {
    /// Built-in defaults, checked last.
    defaults: Vec<ExcludeRule>,
    /// Parsed `.gitignore`, present only when enabled in config.
    gitignore: Option<Gitignore>,
    /// Patterns from the `exclude` config key, checked first.
    user: Vec<ExcludeRule>,
}

/// One compiled exclude pattern.
enum ExcludeRule {
    /// `**/suffix`: the suffix may match at any depth.
    AnyDepth {
        /// `*/suffix` applied to the whole path.
        nested: Option<GlobMatcher>,
        /// The suffix itself, applied to every tail of the path.
        suffix: Option<GlobMatcher>,
    },
    /// Plain glob against the whole normalized path.
    Direct(Option<GlobMatcher>),
    /// `dir/**`: the directory itself and everything below it.
    Subtree(String),
}

/// A file yielded by the filtered project walk.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Root-relative path with `/` separators.
    pub relative: String,
}

impl ExcludeSet {
    /// Assemble the exclusion layers for `root` from its configuration.
    /// A missing `.gitignore` leaves the gitignore layer empty.
    pub fn build(root: &Path, config: &Config) -> Self {
        let gitignore = if config.use_gitignore {
            load_gitignore(root)
        } else {
            None
        };

        return Self {
            defaults: DEFAULT_EXCLUDES.iter().map(|p| return ExcludeRule::compile(p)).collect(),
            gitignore,
            user: config.exclude.iter().map(|p| return ExcludeRule::compile(p)).collect(),
        };
    }

    /// Defaults only, for projects that have not been initialized yet.
    pub fn defaults_only() -> Self {
        return Self {
            defaults: DEFAULT_EXCLUDES.iter().map(|p| return ExcludeRule::compile(p)).collect(),
            gitignore: None,
            user: Vec::new(),
        };
    }

    /// Whether a root-relative path is excluded by any layer.
    pub fn is_excluded(&self, relative: &str, is_dir: bool) -> bool {
        let normalized = normalize_separators(relative);
        if self.user.iter().any(|rule| return rule.is_match(&normalized)) {
            return true;
        }
        if let Some(gitignore) = &self.gitignore
            && gitignore.matched_path_or_any_parents(&normalized, is_dir).is_ignore()
        {
            return true;
        }
        return self.defaults.iter().any(|rule| return rule.is_match(&normalized));
    }

    /// Walk `start` (inside `root`) and return every non-hidden, non-excluded file.
    /// Symlinks resolving outside `root` are skipped. Results are sorted by path.
    pub fn walk(&self, root: &Path, start: &Path) -> Vec<ProjectFile> {
        let canonical_root = root.canonicalize().unwrap_or_else(|_| return root.to_path_buf());
        let mut files = Vec::new();

        let walker = WalkDir::new(start).sort_by_file_name().into_iter().filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.file_name().to_string_lossy().starts_with('.') {
                return false;
            }
            let relative = relative_to(root, entry.path());
            return !self.is_excluded(&relative, entry.file_type().is_dir());
        });

        for entry in walker.filter_map(Result::ok) {
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if file_type.is_symlink() && !symlink_stays_inside(entry.path(), &canonical_root) {
                log::debug!("skipping symlink escaping project root: {}", entry.path().display());
                continue;
            }
            if file_type.is_symlink() && !entry.path().is_file() {
                continue;
            }
            files.push(ProjectFile {
                relative: relative_to(root, entry.path()),
                path: entry.into_path(),
            });
        }

        return files;
    }
}

impl ExcludeRule {
    /// Compile a pattern into the form matching its shape.
    fn compile(pattern: &str) -> Self {
        let normalized = normalize_separators(pattern);
        if let Some(suffix) = normalized.strip_prefix("**/") {
            return Self::AnyDepth {
                nested: compile_glob(&format!("*/{suffix}")),
                suffix: compile_glob(suffix),
            };
        }
        if let Some(prefix) = normalized.strip_suffix("/**") {
            return Self::Subtree(prefix.to_string());
        }
        return Self::Direct(compile_glob(&normalized));
    }

    /// Test a normalized path against this rule.
    fn is_match(&self, path: &str) -> bool {
        return match self {
            Self::AnyDepth { nested, suffix } => {
                if nested.as_ref().is_some_and(|g| return g.is_match(path)) {
                    return true;
                }
                let Some(suffix) = suffix else {
                    return false;
                };
                path_tails(path).any(|tail| return suffix.is_match(tail))
            },
            Self::Direct(glob) => glob.as_ref().is_some_and(|g| return g.is_match(path)),
            Self::Subtree(prefix) => {
                path == prefix
                    || path.strip_prefix(prefix.as_str()).is_some_and(|rest| return rest.starts_with('/'))
            },
        };
    }
}

/// Compile one glob with fnmatch semantics (`*` crosses `/`).
/// Malformed globs never match.
fn compile_glob(pattern: &str) -> Option<GlobMatcher> {
    return match GlobBuilder::new(pattern).literal_separator(false).build() {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(e) => {
            log::debug!("ignoring malformed glob `{pattern}`: {e}");
            None
        },
    };
}

/// Parse `<root>/.gitignore` when it exists.
fn load_gitignore(root: &Path) -> Option<Gitignore> {
    let path = root.join(".gitignore");
    if !path.is_file() {
        return None;
    }
    let mut builder = GitignoreBuilder::new(root);
    if let Some(e) = builder.add(&path) {
        log::warn!("partially parsed {}: {e}", path.display());
    }
    return match builder.build() {
        Ok(gitignore) => Some(gitignore),
        Err(e) => {
            log::warn!("ignoring {}: {e}", path.display());
            None
        },
    };
}

/// Whether `path` matches any of `patterns`.
///
/// `**/x` matches when some separator-delimited tail of the path matches `x`;
/// `dir/**` matches `dir` and everything below it; other patterns are globs
/// over the whole path.
pub fn matches<S: AsRef<str>>(path: &str, patterns: &[S]) -> bool {
    let normalized = normalize_separators(path);
    return patterns
        .iter()
        .any(|p| return ExcludeRule::compile(p.as_ref()).is_match(&normalized));
}

/// Convert backslashes to `/` and drop a leading `./`.
fn normalize_separators(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    return replaced.strip_prefix("./").map_or_else(|| return replaced.clone(), String::from);
}

/// Every suffix of `path` that starts at a component boundary, longest first.
fn path_tails(path: &str) -> impl Iterator<Item = &str> {
    let starts = std::iter::once(0).chain(
        path.match_indices('/')
            .map(|(i, _)| return i.saturating_add(1)),
    );
    return starts.filter_map(move |i| return path.get(i..));
}

/// Root-relative string form of `path` with `/` separators.
pub fn relative_to(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    return relative
        .components()
        .map(|c| return c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
}

/// Whether a symlink's target resolves under `canonical_root`.
fn symlink_stays_inside(path: &Path, canonical_root: &Path) -> bool {
    return path
        .canonicalize()
        .is_ok_and(|target| return target.starts_with(canonical_root));
}

/// Validate one pattern against the safety rules.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` naming the violated rule.
pub fn validate_pattern(pattern: &str) -> Result<(), Error> {
    let reject = |reason: &str| {
        return Err(Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        });
    };

    if pattern.trim().is_empty() {
        return reject("pattern is empty");
    }
    if pattern.chars().count() > MAX_PATTERN_LENGTH {
        return reject(&format!("pattern exceeds {MAX_PATTERN_LENGTH} characters"));
    }
    if NESTED_QUANTIFIER.is_match(pattern) {
        return reject("nested quantifier can cause catastrophic backtracking");
    }
    if pattern.contains("***") {
        return reject("more than two consecutive wildcards");
    }
    return Ok(());
}

/// Validate a pattern list: count cap first, then each pattern.
///
/// # Errors
///
/// Returns `Error::TooManyPatterns` above the count cap, or the first
/// `Error::InvalidPattern` encountered.
pub fn validate_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<(), Error> {
    if patterns.len() > MAX_PATTERN_COUNT {
        return Err(Error::TooManyPatterns {
            count: patterns.len(),
            max: MAX_PATTERN_COUNT,
        });
    }
    for pattern in patterns {
        validate_pattern(pattern.as_ref())?;
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_depth_matches_component_suffix() {
        assert!(matches("a/b/node_modules", &["**/node_modules"]));
        assert!(matches("node_modules", &["**/node_modules"]));
        assert!(!matches("a/b/my_node_modules", &["**/node_modules"]));
        assert!(!matches("a/node_modules_old", &["**/node_modules"]));
    }

    #[test]
    fn any_depth_with_extension_glob() {
        assert!(matches("logs/deep/run.log", &["**/*.log"]));
        assert!(matches("run.log", &["**/*.log"]));
        assert!(!matches("run.logs", &["**/*.log"]));
    }

    #[test]
    fn subtree_pattern_matches_dir_and_children() {
        assert!(matches("build", &["build/**"]));
        assert!(matches("build/out/app.js", &["build/**"]));
        assert!(!matches("buildtools/x", &["build/**"]));
    }

    #[test]
    fn direct_pattern_and_separator_normalization() {
        assert!(matches("docs\\draft.md", &["docs/*.md"]));
        assert!(matches("./docs/draft.md", &["docs/draft.md"]));
        assert!(!matches("src/draft.md", &["docs/*.md"]));
    }

    #[test]
    fn count_cap_is_inclusive() {
        let fifty: Vec<String> = (0..50).map(|i| format!("dir{i}/**")).collect();
        assert!(validate_patterns(&fifty).is_ok());
        let fifty_one: Vec<String> = (0..51).map(|i| format!("dir{i}/**")).collect();
        assert!(matches!(
            validate_patterns(&fifty_one),
            Err(Error::TooManyPatterns { count: 51, max: 50 })
        ));
    }

    #[test]
    fn length_cap_is_inclusive() {
        assert!(validate_pattern(&"a".repeat(512)).is_ok());
        assert!(matches!(
            validate_pattern(&"a".repeat(513)),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn unsafe_shapes_rejected() {
        for pattern in ["(a+)+", "****", "(x*)*", "", "   "] {
            assert!(validate_pattern(pattern).is_err(), "{pattern:?} should be rejected");
        }
        for pattern in ["**/node_modules", "src/**", "*.py", "(a)"] {
            assert!(validate_pattern(pattern).is_ok(), "{pattern:?} should be accepted");
        }
    }

    #[test]
    fn exclude_set_layers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "generated/\n").unwrap();
        let config = Config {
            exclude: vec!["drafts/**".to_string()],
            use_gitignore: true,
            ..Config::default()
        };
        let set = ExcludeSet::build(dir.path(), &config);
        assert!(set.is_excluded("drafts/a.md", false));
        assert!(set.is_excluded("generated", true));
        assert!(set.is_excluded("web/node_modules", true));
        assert!(!set.is_excluded("src/main.rs", false));
    }

    #[test]
    fn walk_skips_hidden_and_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join(".hidden")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("src/lib.rs"), "").unwrap();
        std::fs::write(root.join(".hidden/x.rs"), "").unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "").unwrap();
        std::fs::write(root.join("run.log"), "").unwrap();

        let files = ExcludeSet::defaults_only().walk(root, root);
        let relative: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(relative, vec!["src/lib.rs"]);
    }
}
