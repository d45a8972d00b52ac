//! Syntax-only checks for tagged fenced code blocks.

use std::collections::BTreeSet;

use tree_sitter::{Language, Node, Parser};

use crate::grammar;
use crate::scanner::{self, FencedBlock};
use crate::types::{IssueKind, Severity, ValidationIssue};

/// Fence tag aliases mapped to the canonical language used for parsing.
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("bash", "bash"),
    ("cjs", "javascript"),
    ("go", "go"),
    ("golang", "go"),
    ("javascript", "javascript"),
    ("js", "javascript"),
    ("json", "json"),
    ("jsx", "tsx"),
    ("mjs", "javascript"),
    ("node", "javascript"),
    ("py", "python"),
    ("python", "python"),
    ("python3", "python"),
    ("rs", "rust"),
    ("rust", "rust"),
    ("sh", "bash"),
    ("shell", "bash"),
    ("ts", "typescript"),
    ("tsx", "tsx"),
    ("typescript", "typescript"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("zsh", "bash"),
];

/// A syntax problem inside one block, as a zero-based content row.
struct BlockError {
    /// Human-readable description.
    detail: String,
    /// Zero-based row within the block content.
    row: usize,
}

/// Canonical language for a fence tag, case-insensitively. `None` for tags
/// the validator does not check.
pub fn canonical_language(tag: &str) -> Option<&'static str> {
    let lowered = tag.to_ascii_lowercase();
    return LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| return *alias == lowered)
        .map(|(_, canonical)| return *canonical);
}

/// Syntax issues for every tagged block of a markdown document.
///
/// Blocks without a tag or with an unrecognized tag are skipped. Each issue
/// keeps the tag as written and a line of `fence_line + row`, where `row` is
/// the zero-based content row (the fence counts as line 1 of the block).
pub fn validate(text: &str, doc_file: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for block in scanner::fenced_blocks(text) {
        let Some(tag) = block.language.as_deref() else {
            continue;
        };
        let Some(canonical) = canonical_language(tag) else {
            continue;
        };

        let errors = match canonical {
            "json" => json_errors(&block.content),
            "yaml" => yaml_errors(&block.content),
            other => match grammar::language_for_snippet(other) {
                Some(language) => tree_errors(&block, &language, tag),
                None => Vec::new(),
            },
        };

        for error in errors {
            issues.push(ValidationIssue {
                detail: error.detail,
                file: doc_file.to_string(),
                kind: IssueKind::CodeSyntaxError,
                language: Some(tag.to_string()),
                line: absolute_line(block.fence_line, error.row),
                severity: Severity::Error,
                target: None,
            });
        }
    }

    return issues;
}

/// Document line for a content row of a block starting at `fence_line`.
fn absolute_line(fence_line: u32, row: usize) -> u32 {
    let row = u32::try_from(row).unwrap_or(u32::MAX);
    return fence_line.saturating_add(row).max(1);
}

/// Walk down from `node` collecting top-most ERROR and MISSING nodes.
/// Subtrees without errors are never entered.
fn collect_error_nodes<'t>(node: Node<'t>, found: &mut Vec<Node<'t>>) {
    if node.is_error() || node.is_missing() {
        found.push(node);
        return;
    }
    if !node.has_error() {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, found);
    }
}

/// JSON blocks go through `serde_json`; its line numbers are one-based.
fn json_errors(content: &str) -> Vec<BlockError> {
    return match serde_json::from_str::<serde_json::Value>(content) {
        Ok(_) => Vec::new(),
        Err(e) => vec![BlockError {
            detail: format!("Invalid JSON at column {}", e.column()),
            row: e.line().saturating_sub(1),
        }],
    };
}

/// Parse with tree-sitter and report one error per affected row.
fn tree_errors(block: &FencedBlock, language: &Language, tag: &str) -> Vec<BlockError> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(language) {
        log::warn!("no grammar for `{tag}` snippets: {e}");
        return Vec::new();
    }
    let Some(tree) = parser.parse(&block.content, None) else {
        log::debug!("parser gave up on `{tag}` block at line {}", block.fence_line);
        return Vec::new();
    };

    let mut nodes = Vec::new();
    collect_error_nodes(tree.root_node(), &mut nodes);

    let mut seen_rows = BTreeSet::new();
    let mut errors = Vec::new();
    for node in nodes {
        let row = node.start_position().row;
        if !seen_rows.insert(row) {
            continue;
        }
        let detail = if node.is_missing() {
            format!("Syntax error in {tag} code block: missing `{}`", node.kind())
        } else {
            format!("Syntax error in {tag} code block")
        };
        errors.push(BlockError { detail, row });
    }
    return errors;
}

/// YAML blocks go through `serde_yaml`; multi-document streams are accepted.
fn yaml_errors(content: &str) -> Vec<BlockError> {
    use serde::Deserialize as _;

    for document in serde_yaml::Deserializer::from_str(content) {
        if let Err(e) = serde_yaml::Value::deserialize(document) {
            let row = e.location().map_or(0, |at| return at.line().saturating_sub(1));
            return vec![BlockError {
                detail: format!("Invalid YAML: {e}"),
                row,
            }];
        }
    }
    return Vec::new();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_case_insensitive() {
        assert_eq!(canonical_language("PY"), Some("python"));
        assert_eq!(canonical_language("golang"), Some("go"));
        assert_eq!(canonical_language("jsx"), Some("tsx"));
        assert_eq!(canonical_language("zsh"), Some("bash"));
        assert_eq!(canonical_language("cobol"), None);
    }

    #[test]
    fn alias_tag_is_kept_in_the_issue() {
        let text = "# Test\n```py\nprint('unclosed string\n```\n";
        let issues = validate(text, "docs/a.md");
        assert!(!issues.is_empty());
        assert_eq!(issues[0].kind, IssueKind::CodeSyntaxError);
        assert_eq!(issues[0].language.as_deref(), Some("py"));
        assert_eq!(issues[0].line, 2);
    }

    #[test]
    fn error_line_counts_fence_as_first_frame_line() {
        let text = "# Documentation\n\nSome text here.\n\n```python\nx = 1\ny = 2\nz = 'unclosed string\n```\n";
        let issues = validate(text, "docs/a.md");
        assert!(!issues.is_empty());
        assert_eq!(issues[0].line, 7);
    }

    #[test]
    fn errors_across_blocks_are_all_reported() {
        let text = "```python\nprint('a\n```\n\ntext\n\n```python\nprint('b\n```\n";
        let issues = validate(text, "docs/a.md");
        let lines: Vec<u32> = issues.iter().map(|i| i.line).collect();
        assert!(lines.contains(&1));
        assert!(lines.contains(&7));
    }

    #[test]
    fn invalid_json_line_is_mapped() {
        let text = "Config:\n\n```json\n{\n  \"a\": 1,\n}\n```\n";
        let issues = validate(text, "docs/a.md");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 5);
        assert_eq!(issues[0].language.as_deref(), Some("json"));
    }

    #[test]
    fn invalid_yaml_is_reported() {
        let text = "```yaml\nkey: [1, 2\n```\n";
        let issues = validate(text, "docs/a.md");
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn untagged_and_unknown_blocks_are_skipped() {
        let text = "```\nprint('x\n```\n\n```cobol\nDISPLAY 'x\n```\n";
        assert!(validate(text, "docs/a.md").is_empty());
    }

    #[test]
    fn valid_blocks_pass_even_with_type_errors() {
        let text = "```ts\nconst x: string = 123;\nlet y: number;\n```\n\n```python\nprint('hello world')\nx = 42\n```\n\n```json\n{\"ok\": true}\n```\n";
        assert!(validate(text, "docs/a.md").is_empty());
    }
}
