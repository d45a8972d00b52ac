//! Documentation platform, project language and docs directory detection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Candidate documentation directories, in lookup order.
const DOCS_DIRECTORIES: &[&str] = &["docs", "doc", "documentation", "docsite", "website/docs"];

/// Marker file → language, first hit wins.
const LANGUAGE_MARKERS: &[(&str, &str)] = &[
    ("go.mod", "Go"),
    ("package.json", "JavaScript/TypeScript"),
    ("Cargo.toml", "Rust"),
    ("requirements.txt", "Python"),
    ("setup.py", "Python"),
    ("pyproject.toml", "Python"),
    ("pom.xml", "Java"),
    ("build.gradle", "Java"),
    ("Gemfile", "Ruby"),
    ("composer.json", "PHP"),
];

/// Marker files per platform, with the confidence a hit carries.
const PLATFORM_MARKERS: &[(Platform, &[&str], Confidence, &str)] = &[
    (
        Platform::Hugo,
        &["hugo.toml", "hugo.yaml", "config.toml", "docsite/hugo.yaml"],
        Confidence::High,
        "Found Hugo configuration file",
    ),
    (
        Platform::Docusaurus,
        &["docusaurus.config.js", "docusaurus.config.ts"],
        Confidence::High,
        "Found Docusaurus configuration file",
    ),
    (Platform::Mkdocs, &["mkdocs.yml", "mkdocs.yaml"], Confidence::High, "Found mkdocs.yml configuration"),
    (Platform::Sphinx, &["docs/conf.py", "doc/conf.py", "conf.py"], Confidence::High, "Found Sphinx conf.py"),
    (
        Platform::Vitepress,
        &[".vitepress/config.js", ".vitepress/config.ts", "docs/.vitepress/config.js", "docs/.vitepress/config.ts"],
        Confidence::High,
        "Found VitePress configuration",
    ),
    (Platform::Jekyll, &["_config.yml", "docs/_config.yml"], Confidence::Medium, "Found Jekyll _config.yml"),
    (Platform::Gitbook, &["book.json", "SUMMARY.md", ".gitbook.yaml"], Confidence::Medium, "Found GitBook layout file"),
];

/// How strongly a marker file implies its platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Platform-specific configuration file.
    High,
    /// Marker shared with other tools.
    Medium,
}

/// One detected platform and the files that gave it away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// How strongly the evidence implies the platform.
    pub confidence: Confidence,
    /// Human-readable evidence lines.
    pub evidence: Vec<String>,
    /// Detected platform.
    pub platform: Platform,
}

/// Supported documentation platforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Docusaurus (React).
    Docusaurus,
    /// GitBook.
    Gitbook,
    /// Hugo.
    Hugo,
    /// Jekyll.
    Jekyll,
    /// `MkDocs`.
    Mkdocs,
    /// Sphinx.
    Sphinx,
    /// No platform detected or chosen.
    #[default]
    Unknown,
    /// `VitePress`.
    Vitepress,
}

impl Platform {
    /// Lowercase platform name.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Docusaurus => "docusaurus",
            Self::Gitbook => "gitbook",
            Self::Hugo => "hugo",
            Self::Jekyll => "jekyll",
            Self::Mkdocs => "mkdocs",
            Self::Sphinx => "sphinx",
            Self::Unknown => "unknown",
            Self::Vitepress => "vitepress",
        };
    }
}

/// Primary language from well-known manifest files, or `Unknown`.
pub fn detect_language(root: &Path) -> String {
    return LANGUAGE_MARKERS
        .iter()
        .find(|(marker, _)| return root.join(marker).exists())
        .map_or_else(|| return "Unknown".to_string(), |(_, language)| return (*language).to_string());
}

/// Every platform with at least one marker file under `root`, in table order.
pub fn detect_platforms(root: &Path) -> Vec<Detection> {
    let mut detections = Vec::new();
    for (platform, markers, confidence, label) in PLATFORM_MARKERS {
        let found: Vec<&str> = markers
            .iter()
            .copied()
            .filter(|marker| return root.join(marker).is_file())
            .collect();
        if found.is_empty() {
            continue;
        }
        let mut evidence = vec![(*label).to_string()];
        evidence.extend(found.iter().map(|marker| return format!("`{marker}`")));
        detections.push(Detection {
            confidence: *confidence,
            evidence,
            platform: *platform,
        });
    }
    return detections;
}

/// First existing documentation directory under `root`.
pub fn find_docs_directory(root: &Path) -> Option<PathBuf> {
    return DOCS_DIRECTORIES
        .iter()
        .map(|name| return root.join(name))
        .find(|path| return path.is_dir());
}

/// Pick a platform: the first detection wins, otherwise a language-based default.
pub fn recommend(detections: &[Detection], language: &str) -> (Platform, Vec<String>) {
    if let Some(first) = detections.first() {
        return (
            first.platform,
            vec![format!("Detected existing {} platform", first.platform.as_str())],
        );
    }

    let (platform, reason) = match language {
        "Go" => (Platform::Hugo, "Hugo is written in Go and popular in the Go ecosystem"),
        "JavaScript/TypeScript" => {
            (Platform::Docusaurus, "Docusaurus is React-based and popular in the JavaScript ecosystem")
        },
        "Python" => (Platform::Mkdocs, "MkDocs is Python-based and popular in the Python ecosystem"),
        _ => (Platform::Hugo, "Hugo is fast, language-agnostic, and widely adopted"),
    };
    return (platform, vec![reason.to_string()]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_mkdocs_and_recommends_it() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mkdocs.yml"), "site_name: x\n").unwrap();
        let detections = detect_platforms(dir.path());
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].platform, Platform::Mkdocs);
        assert_eq!(recommend(&detections, "Go").0, Platform::Mkdocs);
    }

    #[test]
    fn recommendation_falls_back_on_language() {
        assert_eq!(recommend(&[], "Go").0, Platform::Hugo);
        assert_eq!(recommend(&[], "JavaScript/TypeScript").0, Platform::Docusaurus);
        assert_eq!(recommend(&[], "Python").0, Platform::Mkdocs);
        assert_eq!(recommend(&[], "Unknown").0, Platform::Hugo);
    }

    #[test]
    fn language_and_docs_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_language(dir.path()), "Unknown");
        assert!(find_docs_directory(dir.path()).is_none());

        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("documentation")).unwrap();
        assert_eq!(detect_language(dir.path()), "Rust");
        assert_eq!(find_docs_directory(dir.path()), Some(dir.path().join("documentation")));
    }
}
