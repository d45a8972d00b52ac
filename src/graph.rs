//! Dependency graph persistence: bidirectional doc ↔ code mapping.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::lock;
use crate::types::Match;

/// Location of the graph artifact, relative to the project root.
pub const GRAPH_FILE: &str = ".doc-manager/dependencies.json";

/// Current artifact schema version.
const SCHEMA_VERSION: u32 = 1;

/// Which docs reference which code, and the reverse. Both directions are
/// always built together, so every `doc → code` edge has its `code → doc` mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// Code target → docs referencing it.
    pub code_to_doc: BTreeMap<String, BTreeSet<String>>,
    /// Doc file → code targets it references.
    pub doc_to_code: BTreeMap<String, BTreeSet<String>>,
    /// RFC 3339 build timestamp.
    pub generated_at: String,
    /// Artifact schema version.
    pub schema_version: u32,
    /// Number of distinct `(doc, code)` pairs.
    pub total_references: usize,
}

impl DependencyGraph {
    /// Aggregate matches, deduplicating identical `(doc, code)` pairs.
    pub fn build(matches: &[Match]) -> Self {
        let mut doc_to_code: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut code_to_doc: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut pairs: BTreeSet<(&str, &str)> = BTreeSet::new();

        for found in matches {
            pairs.insert((found.doc_file.as_str(), found.code_target.as_str()));
            doc_to_code
                .entry(found.doc_file.clone())
                .or_default()
                .insert(found.code_target.clone());
            code_to_doc
                .entry(found.code_target.clone())
                .or_default()
                .insert(found.doc_file.clone());
        }

        return Self {
            code_to_doc,
            doc_to_code,
            generated_at: chrono::Utc::now().to_rfc3339(),
            schema_version: SCHEMA_VERSION,
            total_references: pairs.len(),
        };
    }

    /// Docs affected by a change to `file`: docs referencing the file itself
    /// or any symbol inside it (`file#...`).
    pub fn docs_for_file(&self, file: &str) -> BTreeSet<String> {
        let symbol_prefix = format!("{file}#");
        return self
            .code_to_doc
            .iter()
            .filter(|(target, _)| return target.as_str() == file || target.starts_with(&symbol_prefix))
            .flat_map(|(_, docs)| return docs.iter().cloned())
            .collect();
    }

    /// Read the graph from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the artifact is absent,
    /// `Error::Io` for other read failures, or `Error::Json` if it is malformed.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Ok(serde_json::from_str(&content)?);
    }

    /// Code targets living in `file`: the file itself and its symbols.
    pub fn targets_in_file(&self, file: &str) -> Vec<&str> {
        let symbol_prefix = format!("{file}#");
        return self
            .code_to_doc
            .keys()
            .map(String::as_str)
            .filter(|target| return *target == file || target.starts_with(&symbol_prefix))
            .collect();
    }

    /// Replace the artifact on disk under its lock.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails, or a lock/IO error.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let content = serde_json::to_string_pretty(self)?;
        return lock::write_atomic(path, content.as_bytes());
    }
}
