//! Documentation validation: links, assets, alt text, snippet syntax and
//! (optionally) symbol references.

use std::path::Path;

use serde::Serialize;

use crate::error::Error;
use crate::matcher;
use crate::patterns::ExcludeSet;
use crate::scanner::{self, Link};
use crate::snippets;
use crate::symbols::{self, SymbolIndex};
use crate::types::{IssueKind, Severity, ValidationIssue};

/// Extensions treated as markdown documents.
const DOC_EXTENSIONS: &[&str] = &["markdown", "md", "mdx"];

/// Link prefixes that never point into the project.
const EXTERNAL_PREFIXES: &[&str] = &["#", "//", "data:", "ftp://", "http://", "https://", "mailto:", "tel:"];

/// Which checks to run.
#[allow(clippy::struct_excessive_bools, reason = "one switch per independent check")]
#[derive(Debug, Clone, Copy)]
pub struct Checks {
    /// Images and `<img>` sources must exist and carry alt text.
    pub assets: bool,
    /// Relative links must resolve inside the project.
    pub links: bool,
    /// Tagged code blocks must parse.
    pub snippets: bool,
    /// Function and class spans must exist in the symbol index.
    pub symbols: bool,
}

impl Default for Checks {
    fn default() -> Self {
        return Self {
            assets: true,
            links: true,
            snippets: true,
            symbols: false,
        };
    }
}

/// Outcome of validating a documentation tree.
#[derive(Debug, Serialize)]
pub struct Report {
    /// Markdown files examined.
    pub files_checked: usize,
    /// Issues ordered by file, then line.
    pub issues: Vec<ValidationIssue>,
}

impl Report {
    /// Issue count per kind, for summaries.
    pub fn count(&self, kind: IssueKind) -> usize {
        return self.issues.iter().filter(|i| return i.kind == kind).count();
    }
}

/// Validate every markdown file below `docs_dir`.
///
/// # Errors
///
/// Returns `Error::DocsNotFound` when `docs_dir` is not a directory.
pub fn validate_docs(root: &Path, docs_dir: &Path, excludes: &ExcludeSet, checks: Checks) -> Result<Report, Error> {
    if !docs_dir.is_dir() {
        return Err(Error::DocsNotFound {
            path: docs_dir.to_path_buf(),
        });
    }

    let index = checks.symbols.then(|| return symbols::build_index(root, excludes));
    let mut files_checked: usize = 0;
    let mut issues = Vec::new();

    for file in excludes.walk(root, docs_dir) {
        if !is_markdown(&file.relative) {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(&file.path) else {
            log::debug!("skipping unreadable doc {}", file.path.display());
            continue;
        };
        files_checked = files_checked.saturating_add(1);
        issues.extend(validate_document(root, &file.relative, &text, checks, index.as_ref()));
    }

    issues.sort_by(|a, b| return a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
    return Ok(Report { files_checked, issues });
}

/// Issues for one markdown document. `index` is consulted only when symbol
/// checks are enabled.
pub fn validate_document(
    root: &Path,
    doc_relative: &str,
    text: &str,
    checks: Checks,
    index: Option<&SymbolIndex>,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if checks.links || checks.assets {
        for link in scanner::links(text) {
            if link.is_image && checks.assets {
                issues.extend(check_image(root, doc_relative, &link));
            } else if !link.is_image && checks.links {
                issues.extend(check_link(root, doc_relative, &link));
            }
        }
    }
    if checks.snippets {
        issues.extend(snippets::validate(text, doc_relative));
    }
    if checks.symbols
        && let Some(index) = index
    {
        issues.extend(matcher::check_symbols(text, doc_relative, index));
    }

    issues.sort_by_key(|issue| return issue.line);
    return issues;
}

/// Missing-asset and missing-alt-text issues for one image.
fn check_image(root: &Path, doc_relative: &str, image: &Link) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if image.alt.as_deref().is_none_or(str::is_empty) {
        issues.push(issue(
            doc_relative,
            image,
            IssueKind::MissingAltText,
            Severity::Warning,
            format!("Image `{}` has no alt text", image.target),
        ));
    }
    if is_external(&image.target) {
        return issues;
    }
    match resolve_target(doc_relative, &image.target) {
        Some(relative) if root.join(&relative).is_file() => {},
        Some(_) => issues.push(issue(
            doc_relative,
            image,
            IssueKind::MissingAsset,
            Severity::Error,
            format!("Image not found: {}", image.target),
        )),
        None => issues.push(issue(
            doc_relative,
            image,
            IssueKind::MissingAsset,
            Severity::Error,
            format!("Image path escapes the project root: {}", image.target),
        )),
    }
    return issues;
}

/// Broken-link issue for a relative link whose target is absent.
fn check_link(root: &Path, doc_relative: &str, link: &Link) -> Option<ValidationIssue> {
    if is_external(&link.target) {
        return None;
    }
    let detail = match resolve_target(doc_relative, &link.target) {
        Some(relative) if relative.is_empty() || root.join(&relative).exists() => return None,
        Some(_) => format!("Link target not found: {}", link.target),
        None => format!("Link escapes the project root: {}", link.target),
    };
    return Some(issue(doc_relative, link, IssueKind::BrokenLink, Severity::Error, detail));
}

/// Whether a target points outside the project (URL, mail, anchor).
fn is_external(target: &str) -> bool {
    let lowered = target.to_ascii_lowercase();
    return EXTERNAL_PREFIXES.iter().any(|prefix| return lowered.starts_with(prefix));
}

/// Whether a path names a markdown document.
pub fn is_markdown(relative: &str) -> bool {
    return Path::new(relative)
        .extension()
        .and_then(|e| return e.to_str())
        .is_some_and(|ext| return DOC_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
}

/// Build one issue located at a link.
fn issue(doc_relative: &str, link: &Link, kind: IssueKind, severity: Severity, detail: String) -> ValidationIssue {
    return ValidationIssue {
        detail,
        file: doc_relative.to_string(),
        kind,
        language: None,
        line: link.line,
        severity,
        target: Some(link.target.clone()),
    };
}

/// Root-relative path a link target refers to. A leading `/` is
/// root-relative, anything else is relative to the document's directory.
/// Fragments and queries are dropped. `None` when the path climbs out of the root.
fn resolve_target(doc_relative: &str, target: &str) -> Option<String> {
    let path = target.split(['#', '?']).next().unwrap_or("").replace("%20", " ");
    if let Some(rooted) = path.strip_prefix('/') {
        return matcher::normalize_relative(rooted);
    }
    let joined = match doc_relative.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{path}"),
        None => path,
    };
    return matcher::normalize_relative(&joined);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        return dir;
    }

    fn run(dir: &tempfile::TempDir, checks: Checks) -> Report {
        let docs = dir.path().join("docs");
        return validate_docs(dir.path(), &docs, &ExcludeSet::defaults_only(), checks).unwrap();
    }

    #[test]
    fn broken_link_line_is_physical() {
        let dir = tree(&[
            ("docs/guide.md", "# Guide\n\nIntro.\n\nSee [missing](nope.md) and [ok](other.md).\n"),
            ("docs/other.md", "# Other\n"),
        ]);
        let report = run(&dir, Checks::default());
        assert_eq!(report.files_checked, 2);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::BrokenLink);
        assert_eq!(report.issues[0].line, 5);
        assert_eq!(report.issues[0].file, "docs/guide.md");
    }

    #[test]
    fn image_checks_report_their_lines() {
        let body = "# Images\n\n![logo](logo.png)\n\n\n\n\n\n\n![chart](img/chart.png)\n";
        let dir = tree(&[("docs/images.md", body), ("docs/logo.png", "png")]);
        let report = run(&dir, Checks::default());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::MissingAsset);
        assert_eq!(report.issues[0].line, 10);

        let dir = tree(&[("docs/alt.md", "# Alt\n\n![](logo.png)\n"), ("docs/logo.png", "png")]);
        let report = run(&dir, Checks::default());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::MissingAltText);
        assert_eq!(report.issues[0].line, 3);
    }

    #[test]
    fn html_img_without_alt_is_flagged() {
        let dir = tree(&[("docs/a.md", "# A\n<img src=\"pic.png\">\n"), ("docs/pic.png", "png")]);
        let report = run(&dir, Checks::default());
        assert_eq!(report.count(IssueKind::MissingAltText), 1);
        assert_eq!(report.count(IssueKind::MissingAsset), 0);
    }

    #[test]
    fn external_and_anchor_links_are_ignored() {
        let text = "[a](https://example.com) [b](mailto:x@y.z) [c](#usage) [d](other.md#part)\n";
        let dir = tree(&[("docs/a.md", text), ("docs/other.md", "# O\n")]);
        assert!(run(&dir, Checks::default()).issues.is_empty());
    }

    #[test]
    fn root_relative_and_escaping_links() {
        let text = "[src](/src/lib.rs)\n[up](../README.md)\n[out](../../etc/passwd)\n";
        let dir = tree(&[("docs/a.md", text), ("src/lib.rs", ""), ("README.md", "")]);
        let report = run(&dir, Checks::default());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].line, 3);
        assert!(report.issues[0].detail.contains("escapes"));
    }

    #[test]
    fn snippets_and_symbols_are_opt_in_checks() {
        let text = "# A\n\nCall `missing_fn()` here.\n\n```python\nprint('x\n```\n";
        let dir = tree(&[("docs/a.md", text), ("src/app.py", "def present():\n    pass\n")]);

        let defaults = run(&dir, Checks::default());
        assert_eq!(defaults.count(IssueKind::CodeSyntaxError), 1);
        assert_eq!(defaults.count(IssueKind::MissingSymbol), 0);

        let with_symbols = run(&dir, Checks { symbols: true, ..Checks::default() });
        assert_eq!(with_symbols.count(IssueKind::MissingSymbol), 1);
    }

    #[test]
    fn missing_docs_directory_is_an_error() {
        let dir = tree(&[("README.md", "")]);
        let result = validate_docs(dir.path(), &dir.path().join("docs"), &ExcludeSet::defaults_only(), Checks::default());
        assert!(matches!(result, Err(Error::DocsNotFound { .. })));
    }
}
