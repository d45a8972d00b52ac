/// Tree-sitter grammar resolution by file extension and fence tag.
use std::path::Path;

use tree_sitter::Language;

use crate::error::Error;

/// Source languages the symbol extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    /// `.go`
    Go,
    /// `.js .jsx .mjs .cjs`, parsed with the TypeScript grammar.
    JavaScript,
    /// `.py`
    Python,
    /// `.rs`
    Rust,
    /// `.ts .tsx`
    TypeScript,
}

impl SourceLanguage {
    /// Language for a source file, from its extension.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedLanguage` for unknown extensions.
    pub fn for_path(path: &Path) -> Result<Self, Error> {
        let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

        return match ext {
            "go" => Ok(Self::Go),
            "cjs" | "js" | "jsx" | "mjs" => Ok(Self::JavaScript),
            "py" => Ok(Self::Python),
            "rs" => Ok(Self::Rust),
            "ts" | "tsx" => Ok(Self::TypeScript),
            _ => Err(Error::UnsupportedLanguage {
                ext: ext.to_string(),
            }),
        };
    }
}

/// Map a file extension to its tree-sitter language.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for unknown extensions.
pub fn language_for_path(path: &Path) -> Result<Language, Error> {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

    return match ext {
        "go" => Ok(tree_sitter_go::LANGUAGE.into()),
        "cjs" | "js" | "mjs" | "ts" => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "jsx" | "tsx" => Ok(tree_sitter_typescript::LANGUAGE_TSX.into()),
        "md" | "markdown" => Ok(tree_sitter_md::LANGUAGE.into()),
        "py" => Ok(tree_sitter_python::LANGUAGE.into()),
        "rs" => Ok(tree_sitter_rust::LANGUAGE.into()),
        _ => Err(Error::UnsupportedLanguage {
            ext: ext.to_string(),
        }),
    };
}

/// Tree-sitter language for a canonical snippet language name.
/// JSON and YAML are checked with serde instead and return `None`.
pub fn language_for_snippet(canonical: &str) -> Option<Language> {
    return match canonical {
        "bash" => Some(tree_sitter_bash::LANGUAGE.into()),
        "go" => Some(tree_sitter_go::LANGUAGE.into()),
        "javascript" | "typescript" => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "python" => Some(tree_sitter_python::LANGUAGE.into()),
        "rust" => Some(tree_sitter_rust::LANGUAGE.into()),
        "tsx" => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
        _ => None,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_map_to_languages() {
        assert_eq!(SourceLanguage::for_path(Path::new("a/b.mjs")).unwrap(), SourceLanguage::JavaScript);
        assert_eq!(SourceLanguage::for_path(Path::new("lib.rs")).unwrap(), SourceLanguage::Rust);
        assert!(SourceLanguage::for_path(Path::new("README")).is_err());
        assert!(language_for_path(Path::new("x.go")).is_ok());
    }

    #[test]
    fn serde_checked_snippets_have_no_grammar() {
        assert!(language_for_snippet("json").is_none());
        assert!(language_for_snippet("yaml").is_none());
        assert!(language_for_snippet("python").is_some());
    }
}
