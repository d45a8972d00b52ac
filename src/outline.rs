//! Heading outline of a markdown document from the tree-sitter-md block grammar.

use tree_sitter::{Node, Parser};

/// A heading with its level and physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 1 for `#`, 6 for `######`; setext headings are 1 or 2.
    pub level: u8,
    /// One-based line of the heading text.
    pub line: u32,
    /// Heading text without markers.
    pub text: String,
}

/// Every ATX and setext heading in document order. Headings inside fenced
/// code are not headings and never appear. Unparsable input yields nothing.
pub fn headings(text: &str) -> Vec<Heading> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&tree_sitter_md::LANGUAGE.into()) {
        log::warn!("markdown grammar unavailable: {e}");
        return Vec::new();
    }
    let Some(tree) = parser.parse(text, None) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    collect_headings(tree.root_node(), text, &mut found);
    return found;
}

/// Recursively collect headings below `node`; sections nest.
fn collect_headings(node: Node<'_>, source: &str, found: &mut Vec<Heading>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "atx_heading" => found.extend(atx_heading(child, source)),
            "setext_heading" => found.extend(setext_heading(child, source)),
            "fenced_code_block" | "indented_code_block" | "html_block" => {},
            _ => collect_headings(child, source, found),
        }
    }
}

/// Level and text of an ATX heading.
fn atx_heading(heading: Node<'_>, source: &str) -> Option<Heading> {
    let mut level = None;
    let mut text = String::new();
    let mut cursor = heading.walk();
    for child in heading.children(&mut cursor) {
        match child.kind() {
            "atx_h1_marker" => level = Some(1),
            "atx_h2_marker" => level = Some(2),
            "atx_h3_marker" => level = Some(3),
            "atx_h4_marker" => level = Some(4),
            "atx_h5_marker" => level = Some(5),
            "atx_h6_marker" => level = Some(6),
            "heading_content" | "inline" => {
                text = child.utf8_text(source.as_bytes()).ok()?.to_string();
            },
            _ => {},
        }
    }

    return Some(Heading {
        level: level?,
        line: node_line(heading),
        text: text.trim().trim_end_matches('#').trim().to_string(),
    });
}

/// One-based start line of a node.
fn node_line(node: Node<'_>) -> u32 {
    return u32::try_from(node.start_position().row.saturating_add(1)).unwrap_or(u32::MAX);
}

/// Level and text of a setext heading (`===` or `---` underline).
fn setext_heading(heading: Node<'_>, source: &str) -> Option<Heading> {
    let mut level = None;
    let mut text = String::new();
    let mut cursor = heading.walk();
    for child in heading.children(&mut cursor) {
        match child.kind() {
            "paragraph" => {
                let raw = child.utf8_text(source.as_bytes()).ok()?;
                text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            },
            "setext_h1_underline" => level = Some(1),
            "setext_h2_underline" => level = Some(2),
            _ => {},
        }
    }

    return Some(Heading {
        level: level?,
        line: node_line(heading),
        text,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atx_levels_and_lines() {
        let text = "# Title\n\nIntro.\n\n## Install ##\n\n### Details\n";
        let found = headings(text);
        assert_eq!(
            found,
            vec![
                Heading { level: 1, line: 1, text: "Title".to_string() },
                Heading { level: 2, line: 5, text: "Install".to_string() },
                Heading { level: 3, line: 7, text: "Details".to_string() },
            ]
        );
    }

    #[test]
    fn code_fence_comments_are_not_headings() {
        let text = "# Real\n\n```bash\n# not a heading\n```\n";
        let found = headings(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "Real");
    }

    #[test]
    fn setext_headings() {
        let text = "Overview\n========\n\nUsage\n-----\n";
        let found = headings(text);
        assert_eq!(found.len(), 2);
        assert_eq!((found[0].level, found[0].text.as_str()), (1, "Overview"));
        assert_eq!((found[1].level, found[1].line), (2, 4));
    }
}
