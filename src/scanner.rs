//! Lexical markdown scanning: fenced blocks, inline code spans, links and
//! classified candidate references.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{CandidateReference, ReferenceKind};

/// Uppercase words that look like class names but are acronyms.
const ACRONYMS: &[&str] = &[
    "API", "CLI", "HTML", "HTTP", "HTTPS", "JSON", "SDK", "SQL", "TOML", "URL", "XML", "YAML",
];

/// Fence tags whose lines are shell invocations.
const SHELL_TAGS: &[&str] = &["bash", "console", "sh", "shell", "zsh"];

/// Ordered span classification table; the first matching rule wins.
#[allow(clippy::expect_used, reason = "literal patterns covered by tests")]
static SPAN_RULES: LazyLock<Vec<(ReferenceKind, Regex)>> = LazyLock::new(|| {
    return [
        (ReferenceKind::FunctionCall, r"^(?:[A-Za-z_]\w*\.)?[A-Za-z_]\w*\([^()]*\)$"),
        (ReferenceKind::ConfigKey, r"^[A-Za-z_][\w.-]*\s*(?::\s+|=\s*)\S"),
        (
            ReferenceKind::FilePath,
            r"^(?:[^\s:]*/\S*|[^\s/]+\.(?:c|cfg|cjs|cpp|cs|css|go|h|hpp|html|ini|java|js|json|jsx|kt|md|mjs|php|py|rb|rs|sh|swift|toml|ts|tsx|txt|yaml|yml))$",
        ),
        (ReferenceKind::ClassName, r"^[A-Z][a-zA-Z0-9]+$"),
        (ReferenceKind::CliCommand, r"^[a-z][a-z0-9_-]*(?:\s+\S+)*$"),
    ]
    .into_iter()
    .map(|(kind, pattern)| return (kind, Regex::new(pattern).expect("valid regex")))
    .collect();
});

/// Single-backtick inline code span.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"`([^`]+)`").expect("valid regex"));

/// Markdown link or image: `[text](target "title")`, `![alt](src)`.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"(!?)\[([^\]]*)\]\(([^)\s]+)(?:\s+"[^"]*")?\)"#).expect("valid regex");
});

/// HTML `<img ...>` tag.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"(?i)<img\b[^>]*>").expect("valid regex"));

/// `src="..."` attribute.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']*)["']"#).expect("valid regex"));

/// `alt="..."` attribute.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static IMG_ALT: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r#"(?i)\balt\s*=\s*["']([^"']*)["']"#).expect("valid regex"));

/// A fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// Lines between the fences, joined with `\n`.
    pub content: String,
    /// One-based line of the opening fence.
    pub fence_line: u32,
    /// First word of the info string, as written.
    pub language: Option<String>,
}

/// Inline code span with the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    /// One-based markdown line.
    pub line: u32,
    /// Span content without backticks, trimmed.
    pub text: String,
}

/// Link or image found outside code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Alternative text for images; `None` for links and `<img>` without `alt`.
    pub alt: Option<String>,
    /// Whether this is an image.
    pub is_image: bool,
    /// One-based markdown line.
    pub line: u32,
    /// Target exactly as written.
    pub target: String,
}

/// Fence bookkeeping while walking lines.
struct OpenFence {
    /// Lines collected so far.
    body: Vec<String>,
    /// Backtick or tilde.
    marker: char,
    /// Opening run length; the closing run must be at least this long.
    run: usize,
    /// One-based line of the opening fence.
    start_line: u32,
    /// Info string word.
    tag: Option<String>,
}

/// Fenced blocks plus a per-line flag marking lines that belong to a fence.
fn fence_layout(text: &str) -> (Vec<FencedBlock>, Vec<bool>) {
    let mut blocks = Vec::new();
    let mut in_fence = Vec::new();
    let mut open: Option<OpenFence> = None;

    for (number, line) in numbered_lines(text) {
        match open.take() {
            None => {
                if let Some((marker, run, info)) = fence_opening(line) {
                    open = Some(OpenFence {
                        body: Vec::new(),
                        marker,
                        run,
                        start_line: number,
                        tag: info
                            .split_whitespace()
                            .next()
                            .map(|w| return w.trim_matches(['{', '}', '.']).to_string()),
                    });
                    in_fence.push(true);
                } else {
                    in_fence.push(false);
                }
            },
            Some(mut fence) => {
                in_fence.push(true);
                if is_fence_closing(line, fence.marker, fence.run) {
                    blocks.push(finish_block(fence));
                } else {
                    fence.body.push(line.to_string());
                    open = Some(fence);
                }
            },
        }
    }

    if let Some(fence) = open {
        blocks.push(finish_block(fence));
    }
    return (blocks, in_fence);
}

/// Opening fence: up to three spaces, then three or more backticks or tildes.
fn fence_opening(line: &str) -> Option<(char, usize, &str)> {
    let indent = line.len().saturating_sub(line.trim_start_matches(' ').len());
    if indent > 3 {
        return None;
    }
    let rest = line.get(indent..)?;
    let marker = rest.chars().next().filter(|c| return *c == '`' || *c == '~')?;
    let run = rest.chars().take_while(|c| return *c == marker).count();
    if run < 3 {
        return None;
    }
    let info = rest.get(run..).unwrap_or("").trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    return Some((marker, run, info));
}

/// Closing fence of the same marker, at least as long, nothing after it.
fn is_fence_closing(line: &str, marker: char, run: usize) -> bool {
    let trimmed = line.trim_start_matches(' ');
    if line.len().saturating_sub(trimmed.len()) > 3 {
        return false;
    }
    let closing_run = trimmed.chars().take_while(|c| return *c == marker).count();
    return closing_run >= run && trimmed.chars().skip(closing_run).all(char::is_whitespace);
}

/// Turn an open fence into a finished block.
fn finish_block(fence: OpenFence) -> FencedBlock {
    return FencedBlock {
        content: fence.body.join("\n"),
        fence_line: fence.start_line,
        language: fence.tag.filter(|t| return !t.is_empty()),
    };
}

/// Every fenced code block in document order. An unclosed fence runs to the end.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock> {
    return fence_layout(text).0;
}

/// Inline code spans on lines outside fenced blocks.
pub fn inline_spans(text: &str) -> Vec<InlineSpan> {
    let (_, in_fence) = fence_layout(text);
    let mut spans = Vec::new();
    for (number, line) in prose_lines(text, &in_fence) {
        for cap in INLINE_CODE.captures_iter(line) {
            let Some(content) = cap.get(1) else {
                continue;
            };
            let trimmed = content.as_str().trim();
            if !trimmed.is_empty() {
                spans.push(InlineSpan {
                    line: number,
                    text: trimmed.to_string(),
                });
            }
        }
    }
    return spans;
}

/// Lines outside fenced blocks, with their one-based numbers.
pub fn outside_fences(text: &str) -> Vec<(u32, &str)> {
    let (_, in_fence) = fence_layout(text);
    return prose_lines(text, &in_fence).collect();
}

/// Classify inline spans and shell fence lines of a document into candidates.
pub fn extract(text: &str, doc_file: &str) -> Vec<CandidateReference> {
    let mut candidates: Vec<CandidateReference> = inline_spans(text)
        .into_iter()
        .filter_map(|span| {
            let (kind, raw_text) = classify_span(&span.text)?;
            return Some(CandidateReference {
                doc_file: doc_file.to_string(),
                kind,
                line: span.line,
                raw_text,
            });
        })
        .collect();

    for block in fenced_blocks(text) {
        let is_shell = block
            .language
            .as_deref()
            .is_some_and(|tag| return SHELL_TAGS.contains(&tag.to_ascii_lowercase().as_str()));
        if !is_shell {
            continue;
        }
        for (offset, line) in block.content.lines().enumerate() {
            let Some(command) = shell_command(line) else {
                continue;
            };
            let offset = u32::try_from(offset).unwrap_or(u32::MAX);
            candidates.push(CandidateReference {
                doc_file: doc_file.to_string(),
                kind: ReferenceKind::CliCommand,
                line: block.fence_line.saturating_add(1).saturating_add(offset),
                raw_text: command.to_string(),
            });
        }
    }

    candidates.sort_by_key(|c| return c.line);
    return candidates;
}

/// Classify one inline span through the rule table.
/// Returns the kind and the text to resolve.
pub fn classify_span(span: &str) -> Option<(ReferenceKind, String)> {
    let text = span.trim();
    if text.is_empty() || text.starts_with("http://") || text.starts_with("https://") {
        return None;
    }

    for (kind, rule) in SPAN_RULES.iter() {
        let candidate = if *kind == ReferenceKind::FilePath {
            text.trim_end_matches([':', ',', ';'])
        } else {
            text
        };
        if !rule.is_match(candidate) {
            continue;
        }
        if *kind == ReferenceKind::ClassName && ACRONYMS.contains(&candidate) {
            return None;
        }
        return Some((*kind, candidate.to_string()));
    }
    return None;
}

/// Links, images and `<img>` tags outside code. Inline code is masked first so
/// bracket syntax inside backticks is not a link.
pub fn links(text: &str) -> Vec<Link> {
    let (_, in_fence) = fence_layout(text);
    let mut found = Vec::new();

    for (number, line) in prose_lines(text, &in_fence) {
        let masked = INLINE_CODE.replace_all(line, |cap: &regex::Captures<'_>| {
            return " ".repeat(cap.get(0).map_or(0, |m| return m.len()));
        });

        for cap in MARKDOWN_LINK.captures_iter(&masked) {
            let is_image = cap.get(1).is_some_and(|m| return m.as_str() == "!");
            let label = cap.get(2).map_or("", |m| return m.as_str());
            let Some(target) = cap.get(3) else {
                continue;
            };
            found.push(Link {
                alt: is_image.then(|| return label.trim().to_string()),
                is_image,
                line: number,
                target: target.as_str().to_string(),
            });
        }

        for tag in IMG_TAG.find_iter(&masked) {
            let Some(src) = IMG_SRC.captures(tag.as_str()).and_then(|c| return c.get(1)) else {
                continue;
            };
            let alt = IMG_ALT
                .captures(tag.as_str())
                .and_then(|c| return c.get(1))
                .map(|m| return m.as_str().trim().to_string());
            found.push(Link {
                alt,
                is_image: true,
                line: number,
                target: src.as_str().to_string(),
            });
        }
    }

    return found;
}

/// Lines paired with their one-based numbers.
fn numbered_lines(text: &str) -> impl Iterator<Item = (u32, &str)> {
    return text
        .lines()
        .enumerate()
        .map(|(i, line)| return (u32::try_from(i.saturating_add(1)).unwrap_or(u32::MAX), line));
}

/// Numbered lines that are not part of any fenced block.
fn prose_lines<'t>(text: &'t str, in_fence: &[bool]) -> impl Iterator<Item = (u32, &'t str)> {
    return numbered_lines(text)
        .zip(in_fence.iter())
        .filter(|(_, fenced)| return !**fenced)
        .map(|(pair, _)| return pair);
}

/// Command text of a shell line: comments and blanks skipped, prompt stripped.
fn shell_command(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let command = trimmed.strip_prefix("$ ").unwrap_or(trimmed).trim();
    return (!command.is_empty()).then_some(command);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_record_language_and_line() {
        let text = "# Title\n\n```python\nprint('hi')\n```\n\n~~~\nplain\n~~~\n";
        let blocks = fenced_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language.as_deref(), Some("python"));
        assert_eq!(blocks[0].fence_line, 3);
        assert_eq!(blocks[0].content, "print('hi')");
        assert_eq!(blocks[1].language, None);
        assert_eq!(blocks[1].fence_line, 7);
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let blocks = fenced_blocks("intro\n```js\nlet a = 1;\nlet b = 2;\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "let a = 1;\nlet b = 2;");
    }

    #[test]
    fn inline_spans_skip_fenced_content() {
        let text = "Use `save()` here.\n```\n`not_a_span()`\n```\nAnd `Config` too.\n";
        let spans = inline_spans(text);
        assert_eq!(
            spans,
            vec![
                InlineSpan { line: 1, text: "save()".to_string() },
                InlineSpan { line: 5, text: "Config".to_string() },
            ]
        );
    }

    #[test]
    fn function_pattern_rules() {
        assert_eq!(classify_span("Class.method()").map(|c| c.0), Some(ReferenceKind::FunctionCall));
        assert_eq!(classify_span("run(a, b)").map(|c| c.0), Some(ReferenceKind::FunctionCall));
        assert_ne!(classify_span("not_valid()extra").map(|c| c.0), Some(ReferenceKind::FunctionCall));
        assert_ne!(classify_span("123invalid()").map(|c| c.0), Some(ReferenceKind::FunctionCall));
    }

    #[test]
    fn class_pattern_excludes_acronyms() {
        assert_eq!(classify_span("MyClass").map(|c| c.0), Some(ReferenceKind::ClassName));
        assert_eq!(classify_span("API"), None);
        assert_eq!(classify_span("HTTPS"), None);
        assert_ne!(classify_span("A").map(|c| c.0), Some(ReferenceKind::ClassName));
    }

    #[test]
    fn paths_config_keys_and_commands() {
        assert_eq!(classify_span("src/save.py"), Some((ReferenceKind::FilePath, "src/save.py".to_string())));
        assert_eq!(classify_span("save.py:"), Some((ReferenceKind::FilePath, "save.py".to_string())));
        assert_eq!(classify_span("timeout: 30").map(|c| c.0), Some(ReferenceKind::ConfigKey));
        assert_eq!(classify_span("retries=3").map(|c| c.0), Some(ReferenceKind::ConfigKey));
        assert_eq!(classify_span("add --force").map(|c| c.0), Some(ReferenceKind::CliCommand));
        assert_eq!(classify_span("https://example.com/x.py"), None);
    }

    #[test]
    fn extract_keeps_physical_line_numbers() {
        let text = "# Guide\n\nCall `load()`.\n\n```bash\n# comment\n$ tool add item\n\n```\n";
        let candidates = extract(text, "docs/guide.md");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].line, 3);
        assert_eq!(candidates[0].kind, ReferenceKind::FunctionCall);
        assert_eq!(candidates[1].line, 7);
        assert_eq!(candidates[1].raw_text, "tool add item");
        assert_eq!(candidates[1].kind, ReferenceKind::CliCommand);
    }

    #[test]
    fn links_images_and_img_tags() {
        let text = "\
See [guide](guide.md \"Guide\").
![Diagram](img/arch.png)
![](img/blank.png)
<img src=\"logo.svg\" alt=\"Logo\"> <img src='x.png'>
`[not](a-link.md)`
";
        let found = links(text);
        assert_eq!(found.len(), 5);
        assert_eq!(found[0], Link { alt: None, is_image: false, line: 1, target: "guide.md".to_string() });
        assert_eq!(found[1].alt.as_deref(), Some("Diagram"));
        assert_eq!(found[2].alt.as_deref(), Some(""));
        assert_eq!(found[3].line, 4);
        assert_eq!(found[3].alt.as_deref(), Some("Logo"));
        assert_eq!(found[4].alt, None);
    }
}
