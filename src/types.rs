/// Core domain types for symbols, candidate references, matches and issues.
use serde::{Deserialize, Serialize};

/// A code-like token pulled out of markdown prose, not yet verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReference {
    /// Markdown file the token came from, project-relative.
    pub doc_file: String,
    /// Classification of the token.
    pub kind: ReferenceKind,
    /// One-based line of the markdown source line holding the token.
    pub line: u32,
    /// Token text exactly as written.
    pub raw_text: String,
}

/// Validation issue categories, serialized in snake case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Link target does not exist or escapes the project root.
    BrokenLink,
    /// Fenced block failed its syntax-only parse.
    CodeSyntaxError,
    /// Image without alternative text.
    MissingAltText,
    /// Image source does not exist.
    MissingAsset,
    /// Inline span names a function or class absent from the symbol index.
    MissingSymbol,
}

impl IssueKind {
    /// Snake-case name used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::BrokenLink => "broken_link",
            Self::CodeSyntaxError => "code_syntax_error",
            Self::MissingAltText => "missing_alt_text",
            Self::MissingAsset => "missing_asset",
            Self::MissingSymbol => "missing_symbol",
        };
    }

    /// Section title used in reports.
    pub const fn title(self) -> &'static str {
        return match self {
            Self::BrokenLink => "Broken Links",
            Self::CodeSyntaxError => "Code Syntax Errors",
            Self::MissingAltText => "Missing Alt Text",
            Self::MissingAsset => "Missing Assets",
            Self::MissingSymbol => "Missing Symbols",
        };
    }
}

/// A verified link between a documentation mention and a real code element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Match {
    /// `path` for files, `path#Name` or `path#Scope.name` for symbols.
    pub code_target: String,
    /// Markdown file holding the mention.
    pub doc_file: String,
    /// One-based line of the mention.
    pub line: u32,
    /// How the mention was classified.
    pub reference_kind: ReferenceKind,
}

/// Candidate reference categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Capitalized identifier such as `Config`.
    ClassName,
    /// First word of a shell-style line such as `docmgr sync`.
    CliCommand,
    /// `key: value` or `key=value` style token.
    ConfigKey,
    /// Token containing a separator or a known extension.
    FilePath,
    /// `name(...)` or `Scope.name(...)`.
    FunctionCall,
}

impl ReferenceKind {
    /// Snake-case name used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::ClassName => "class_name",
            Self::CliCommand => "cli_command",
            Self::ConfigKey => "config_key",
            Self::FilePath => "file_path",
            Self::FunctionCall => "function_call",
        };
    }
}

/// Severity attached to each validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Documentation is wrong.
    Error,
    /// Documentation is weak but not wrong.
    Warning,
}

/// An indexed public declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Zero-based column of the declaration start.
    pub column: u32,
    /// Project-relative file path with `/` separators.
    pub file: String,
    /// Function, method or class.
    pub kind: SymbolKind,
    /// One-based line of the declaration start.
    pub line: u32,
    /// Bare identifier.
    pub name: String,
    /// Enclosing class, impl type or receiver type.
    pub scope: Option<String>,
    /// First source line of the declaration, trimmed.
    pub signature: String,
}

impl Symbol {
    /// Dependency-graph target for this symbol: `file#Name` or `file#Scope.name`.
    pub fn code_target(&self) -> String {
        return match &self.scope {
            Some(scope) => format!("{}#{scope}.{}", self.file, self.name),
            None => format!("{}#{}", self.file, self.name),
        };
    }
}

/// Declaration categories tracked by the symbol index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Struct, enum, trait, interface or class.
    Class,
    /// Free function.
    Function,
    /// Function declared inside a class, impl or with a receiver.
    Method,
}

impl SymbolKind {
    /// Lowercase name used in reports and coverage breakdowns.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Class => "class",
            Self::Function => "function",
            Self::Method => "method",
        };
    }
}

/// One problem found in a documentation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Human-readable description.
    pub detail: String,
    /// Project-relative markdown file.
    pub file: String,
    /// Issue category.
    #[serde(rename = "type")]
    pub kind: IssueKind,
    /// Original fence tag for syntax errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// One-based line, never zero.
    pub line: u32,
    /// How serious the issue is.
    pub severity: Severity,
    /// Full span text for missing symbols, link target for link issues.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(scope: Option<&str>) -> Symbol {
        return Symbol {
            column: 0,
            file: "src/app.py".to_string(),
            kind: SymbolKind::Method,
            line: 3,
            name: "render".to_string(),
            scope: scope.map(String::from),
            signature: "def render(self):".to_string(),
        };
    }

    #[test]
    fn code_target_includes_scope() {
        assert_eq!(symbol(Some("Widget")).code_target(), "src/app.py#Widget.render");
        assert_eq!(symbol(None).code_target(), "src/app.py#render");
    }

    #[test]
    fn issue_serializes_kind_as_type() {
        let issue = ValidationIssue {
            detail: "Broken link".to_string(),
            file: "docs/a.md".to_string(),
            kind: IssueKind::BrokenLink,
            language: None,
            line: 5,
            severity: Severity::Error,
            target: Some("missing.md".to_string()),
        };
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["type"], "broken_link");
        assert_eq!(value["severity"], "error");
        assert!(value.get("language").is_none());
    }
}
