//! Project memory artifacts: repository baseline, documentation conventions
//! and the asset manifest, all under `.doc-manager/`.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::config::{self, Config};
use crate::error::Error;
use crate::git;
use crate::lock;
use crate::patterns::{self, ExcludeSet};
use crate::platform;

/// Memory directory, relative to the project root.
pub const MEMORY_DIR: &str = ".doc-manager/memory";

/// Baseline artifact, relative to the project root.
pub const BASELINE_FILE: &str = ".doc-manager/memory/repo-baseline.json";

/// Conventions template, relative to the project root.
pub const CONVENTIONS_FILE: &str = ".doc-manager/memory/doc-conventions.md";

/// Asset manifest, relative to the project root.
pub const ASSET_MANIFEST_FILE: &str = ".doc-manager/asset-manifest.json";

/// Starting point for a project's documentation conventions.
const CONVENTIONS_TEMPLATE: &str = "# Documentation Conventions

## Style Guide

### Voice and Tone
- Address the reader as \"you\" in user-facing pages
- Write instructions in the active voice
- Prefer short, direct sentences

### Formatting
- Headings use sentence case
- Inline code goes in backticks: `code`
- Fenced code blocks always name their language

### Terminology
- Use one term per concept throughout the docs
- Spell out an acronym the first time it appears
- Follow the naming used in the code

## Structure

### Document Organization
- Open every page with a short introduction
- Keep heading levels nested (H1, then H2, then H3)
- Add a table of contents to long pages

### Code Examples
- Examples are complete and runnable
- Show the expected output
- Comment the non-obvious lines

## Quality Standards

- Every image has descriptive alt text
- Every link resolves
- Every code example is tested
- Docs change in the same commit as the code they describe

---

*Edit this file to match the project's own standards.*
";

/// Asset manifest: tracked documentation assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    /// Tracked assets; empty until assets are registered.
    pub assets: Vec<serde_json::Value>,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 time of the last change.
    pub last_updated: String,
}

/// Snapshot of the repository taken when memory is initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    /// Project-relative path → SHA-256 hex digest.
    pub checksums: BTreeMap<String, String>,
    /// RFC 3339 time the baseline was taken.
    pub created_at: String,
    /// `Repository for <name>`.
    pub description: String,
    /// Whether a documentation directory was found.
    pub docs_exist: bool,
    /// Documentation directory, project-relative.
    pub docs_path: Option<String>,
    /// Number of checksummed files.
    pub file_count: usize,
    /// Checked-out branch, when in a git repository.
    pub git_branch: Option<String>,
    /// `HEAD` hash, when in a git repository.
    pub git_commit: Option<String>,
    /// Primary project language.
    pub language: String,
    /// Directory name of the project root.
    pub repo_name: String,
    /// Artifact format version.
    pub version: String,
}

/// File-level differences between a baseline and the current tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChecksumDiff {
    /// Present now, absent from the baseline.
    pub added: Vec<String>,
    /// Present in the baseline, gone now.
    pub deleted: Vec<String>,
    /// Present in both with different content.
    pub modified: Vec<String>,
}

impl AssetManifest {
    /// Empty manifest stamped with the current time.
    pub fn empty_now() -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        return Self {
            assets: Vec::new(),
            created_at: now.clone(),
            last_updated: now,
        };
    }

    /// Replace the manifest under its lock.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json`, `Error::LockFailed` or `Error::Io`.
    pub fn write(&self, root: &Path) -> Result<(), Error> {
        let content = serde_json::to_string_pretty(self)?;
        return lock::write_atomic(&root.join(ASSET_MANIFEST_FILE), content.as_bytes());
    }
}

impl Baseline {
    /// Take a baseline of the project as it is now.
    pub fn capture(root: &Path, config: &Config, excludes: &ExcludeSet) -> Self {
        let repo_name = root
            .file_name()
            .map_or_else(|| return root.display().to_string(), |n| return n.to_string_lossy().into_owned());
        let docs_path = docs_directory(root, config);
        let checksums = compute_checksums(root, excludes);

        return Self {
            file_count: checksums.len(),
            checksums,
            created_at: chrono::Utc::now().to_rfc3339(),
            description: format!("Repository for {repo_name}"),
            docs_exist: docs_path.is_some(),
            docs_path,
            git_branch: git::current_branch(root),
            git_commit: git::head_commit(root),
            language: platform::detect_language(root),
            repo_name,
            version: config::FORMAT_VERSION.to_string(),
        };
    }

    /// Compare the baseline checksums with the current tree.
    pub fn diff(&self, current: &BTreeMap<String, String>) -> ChecksumDiff {
        let mut diff = ChecksumDiff::default();
        for (path, digest) in current {
            match self.checksums.get(path) {
                None => diff.added.push(path.clone()),
                Some(old) if old != digest => diff.modified.push(path.clone()),
                Some(_) => {},
            }
        }
        diff.deleted = self
            .checksums
            .keys()
            .filter(|path| return !current.contains_key(*path))
            .cloned()
            .collect();
        return diff;
    }

    /// Artifact location for a project.
    pub fn path(root: &Path) -> PathBuf {
        return root.join(BASELINE_FILE);
    }

    /// Read the project's baseline.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` when memory has not been initialized,
    /// or `Error::Json` when the artifact is malformed.
    pub fn read(root: &Path) -> Result<Self, Error> {
        let path = Self::path(root);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::FileNotFound { path }),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Ok(serde_json::from_str(&content)?);
    }

    /// Replace the artifact under its lock.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json`, `Error::LockFailed` or `Error::Io`.
    pub fn write(&self, root: &Path) -> Result<(), Error> {
        let content = serde_json::to_string_pretty(self)?;
        return lock::write_atomic(&Self::path(root), content.as_bytes());
    }
}

/// SHA-256 of a file's content as lowercase hex.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read.
pub fn checksum_file(path: &Path) -> Result<String, Error> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    return Ok(format!("{:x}", hasher.finalize()));
}

/// Checksums of every non-hidden, non-excluded file. Unreadable files are skipped.
pub fn compute_checksums(root: &Path, excludes: &ExcludeSet) -> BTreeMap<String, String> {
    let mut checksums = BTreeMap::new();
    for file in excludes.walk(root, root) {
        match checksum_file(&file.path) {
            Ok(digest) => {
                checksums.insert(file.relative, digest);
            },
            Err(e) => log::debug!("skipping unreadable {}: {e}", file.relative),
        }
    }
    return checksums;
}

/// Conventions template text.
pub const fn conventions_template() -> &'static str {
    return CONVENTIONS_TEMPLATE;
}

/// Documentation directory, project-relative: the configured one when it
/// exists, otherwise the first well-known directory found.
pub fn docs_directory(root: &Path, config: &Config) -> Option<String> {
    if root.join(&config.docs_path).is_dir() {
        return Some(config.docs_path.clone());
    }
    return platform::find_docs_directory(root).map(|dir| return patterns::relative_to(root, &dir));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sha256_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, "hello\n").unwrap();
        assert_eq!(
            checksum_file(&path).unwrap(),
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn baseline_skips_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.md"), "# Home\n").unwrap();
        std::fs::write(dir.path().join("main.py"), "print('x')\n").unwrap();
        std::fs::write(dir.path().join(".env"), "SECRET=1\n").unwrap();

        let baseline = Baseline::capture(dir.path(), &Config::default(), &ExcludeSet::defaults_only());
        assert_eq!(baseline.file_count, 2);
        assert!(baseline.checksums.contains_key("docs/index.md"));
        assert!(!baseline.checksums.contains_key(".env"));
        assert!(baseline.docs_exist);
        assert_eq!(baseline.docs_path.as_deref(), Some("docs"));
        assert_eq!(baseline.version, "1.0.0");
        assert!(baseline.description.starts_with("Repository for "));
    }

    #[test]
    fn diff_classifies_changes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.rs"), "a").unwrap();
        std::fs::write(dir.path().join("edit.rs"), "b").unwrap();
        std::fs::write(dir.path().join("gone.rs"), "c").unwrap();
        let excludes = ExcludeSet::defaults_only();
        let baseline = Baseline::capture(dir.path(), &Config::default(), &excludes);
        baseline.write(dir.path()).unwrap();

        std::fs::write(dir.path().join("edit.rs"), "changed").unwrap();
        std::fs::remove_file(dir.path().join("gone.rs")).unwrap();
        std::fs::write(dir.path().join("new.rs"), "d").unwrap();

        let stored = Baseline::read(dir.path()).unwrap();
        let diff = stored.diff(&compute_checksums(dir.path(), &excludes));
        assert_eq!(diff.added, vec!["new.rs"]);
        assert_eq!(diff.modified, vec!["edit.rs"]);
        assert_eq!(diff.deleted, vec!["gone.rs"]);
    }

    #[test]
    fn missing_baseline_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Baseline::read(dir.path()), Err(Error::FileNotFound { .. })));
    }
}
