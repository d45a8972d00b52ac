//! Corpus-wide quality heuristics over the documentation set.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::outline;
use crate::patterns::ExcludeSet;
use crate::scanner;
use crate::symbols::SymbolIndex;
use crate::types::Symbol;
use crate::validation;

/// Blocks shorter than this, once normalized, are never reported as duplicates.
const MIN_DUPLICATE_CHARS: usize = 20;

/// Words ignored when deciding heading case: articles, conjunctions and
/// short prepositions.
const MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "in", "into", "nor", "of", "on", "or", "over", "so",
    "the", "to", "up", "via", "with", "yet",
];

/// Characters that start an unordered list item.
const LIST_MARKERS: &[char] = &['*', '+', '-'];

/// Identifier tokens inside inline code.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid regex"));

/// Unordered list item: optional indent, marker, whitespace, content.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"^\s{0,12}([-*+])\s+\S").expect("valid regex"));

/// Documentation coverage over public symbols.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    /// Per symbol kind, computed with the same formula.
    pub by_kind: BTreeMap<&'static str, KindCoverage>,
    /// `documented / total * 100`, two decimals; `0.0` without symbols.
    pub coverage_percentage: f64,
    /// Public symbols mentioned in inline code.
    pub documented: usize,
    /// Public symbols in the index.
    pub total: usize,
}

/// A markdown file of the documentation set.
#[derive(Debug, Clone)]
pub struct Document {
    /// Project-relative path.
    pub relative: String,
    /// File content.
    pub text: String,
}

/// A block of content appearing in more than one place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateBlock {
    /// `file:line` of every occurrence, in document order.
    pub locations: Vec<String>,
    /// Start of the normalized block.
    pub preview: String,
}

/// Heading-case tally across the documentation set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadingCase {
    /// Majority style; `None` when no heading could be classified.
    pub dominant: Option<HeadingStyle>,
    /// Fraction of classified headings following the dominant style.
    pub score: f64,
    /// Headings classified as sentence case.
    pub sentence_case: usize,
    /// Headings classified as title case.
    pub title_case: usize,
}

/// Capitalization convention of a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingStyle {
    /// Only the first word (and proper nouns) capitalized.
    SentenceCase,
    /// Most significant words capitalized.
    TitleCase,
}

/// Coverage of one symbol kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindCoverage {
    /// Percentage, two decimals.
    pub coverage_percentage: f64,
    /// Documented symbols of this kind.
    pub documented: usize,
    /// Public symbols of this kind.
    pub total: usize,
}

/// List-marker tally across the documentation set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListMarkers {
    /// Item count per marker character.
    pub counts: BTreeMap<char, usize>,
    /// Most used marker, `None` when no document has a list.
    pub majority: Option<char>,
    /// Fraction of list-bearing documents whose dominant marker is the majority.
    pub score: f64,
}

/// A document with other than exactly one top-level heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultipleH1 {
    /// Project-relative path.
    pub file: String,
    /// Number of level-1 headings.
    pub h1_count: usize,
    /// Text of each level-1 heading.
    pub h1_texts: Vec<String>,
}

/// Title or sentence case for a heading. Headings without significant words
/// after the first default to sentence case.
pub fn classify_heading_style(text: &str) -> HeadingStyle {
    return significant_case(text).unwrap_or(HeadingStyle::SentenceCase);
}

/// Markdown documents below `docs_dir`, in path order. Unreadable files are skipped.
pub fn load_documents(root: &Path, docs_dir: &Path, excludes: &ExcludeSet) -> Vec<Document> {
    let mut docs = Vec::new();
    for file in excludes.walk(root, docs_dir) {
        if !validation::is_markdown(&file.relative) {
            continue;
        }
        match std::fs::read_to_string(&file.path) {
            Ok(text) => docs.push(Document {
                relative: file.relative,
                text,
            }),
            Err(e) => log::debug!("skipping unreadable doc {}: {e}", file.relative),
        }
    }
    return docs;
}

/// Public symbols whose names appear in inline code, as a set of names.
pub fn documented_names(docs: &[Document]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for doc in docs {
        for span in scanner::inline_spans(&doc.text) {
            names.extend(IDENTIFIER.find_iter(&span.text).map(|m| return m.as_str().to_string()));
        }
    }
    return names;
}

/// Coverage over public symbols, overall and per kind.
pub fn documentation_coverage(index: &SymbolIndex, documented: &BTreeSet<String>) -> Coverage {
    let mut by_kind: BTreeMap<&'static str, (usize, usize)> = BTreeMap::new();
    for symbol in index.public_symbols() {
        let entry = by_kind.entry(symbol.kind.as_str()).or_default();
        entry.1 = entry.1.saturating_add(1);
        if documented.contains(&symbol.name) {
            entry.0 = entry.0.saturating_add(1);
        }
    }

    let documented_total = by_kind.values().map(|(hit, _)| return *hit).sum();
    let total = by_kind.values().map(|(_, all)| return *all).sum();
    return Coverage {
        by_kind: by_kind
            .into_iter()
            .map(|(kind, (hit, all))| {
                return (
                    kind,
                    KindCoverage {
                        coverage_percentage: percentage(hit, all),
                        documented: hit,
                        total: all,
                    },
                );
            })
            .collect(),
        coverage_percentage: percentage(documented_total, total),
        documented: documented_total,
        total,
    };
}

/// Blocks of at least twenty normalized characters that occur more than once.
pub fn duplicate_blocks(docs: &[Document]) -> Vec<DuplicateBlock> {
    let mut seen: BTreeMap<String, Vec<(usize, String)>> = BTreeMap::new();
    for (order, doc) in docs.iter().enumerate() {
        for (line, block) in paragraphs(&doc.text) {
            if block.chars().count() < MIN_DUPLICATE_CHARS {
                continue;
            }
            seen.entry(block).or_default().push((order, format!("{}:{line}", doc.relative)));
        }
    }

    let mut duplicates: Vec<(usize, DuplicateBlock)> = seen
        .into_iter()
        .filter(|(_, places)| return places.len() > 1)
        .map(|(block, places)| {
            let first = places.first().map_or(0, |(order, _)| return *order);
            return (
                first,
                DuplicateBlock {
                    locations: places.into_iter().map(|(_, at)| return at).collect(),
                    preview: block.chars().take(60).collect(),
                },
            );
        })
        .collect();
    duplicates.sort_by(|a, b| return a.0.cmp(&b.0).then_with(|| return a.1.locations.cmp(&b.1.locations)));
    return duplicates.into_iter().map(|(_, block)| return block).collect();
}

/// Heading-case tally. Headings with no significant words are not counted.
pub fn heading_case_consistency(docs: &[Document]) -> HeadingCase {
    let mut title_case: usize = 0;
    let mut sentence_case: usize = 0;
    for doc in docs {
        for heading in outline::headings(&doc.text) {
            match significant_case(&heading.text) {
                Some(HeadingStyle::TitleCase) => title_case = title_case.saturating_add(1),
                Some(HeadingStyle::SentenceCase) => sentence_case = sentence_case.saturating_add(1),
                None => {},
            }
        }
    }

    let classified = title_case.saturating_add(sentence_case);
    let dominant = match (title_case, sentence_case) {
        (0, 0) => None,
        (title, sentence) if title > sentence => Some(HeadingStyle::TitleCase),
        _ => Some(HeadingStyle::SentenceCase),
    };
    let score = if classified == 0 {
        1.0
    } else {
        ratio(title_case.max(sentence_case), classified)
    };
    return HeadingCase {
        dominant,
        score,
        sentence_case,
        title_case,
    };
}

/// Marker tally and majority across documents. An empty corpus scores 1.0.
pub fn list_marker_consistency(docs: &[Document]) -> ListMarkers {
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    let mut dominant_per_doc = Vec::new();

    for doc in docs {
        let mut doc_counts: BTreeMap<char, usize> = BTreeMap::new();
        for (_, line) in scanner::outside_fences(&doc.text) {
            let Some(marker) = LIST_ITEM
                .captures(line)
                .and_then(|c| return c.get(1))
                .and_then(|m| return m.as_str().chars().next())
            else {
                continue;
            };
            let entry = doc_counts.entry(marker).or_default();
            *entry = entry.saturating_add(1);
        }
        for (marker, count) in &doc_counts {
            let entry = counts.entry(*marker).or_default();
            *entry = entry.saturating_add(*count);
        }
        if let Some(marker) = most_used(&doc_counts) {
            dominant_per_doc.push(marker);
        }
    }

    let majority = most_used(&counts);
    let score = match majority {
        Some(marker) => ratio(dominant_per_doc.iter().filter(|m| return **m == marker).count(), dominant_per_doc.len()),
        None => 1.0,
    };
    return ListMarkers {
        counts,
        majority,
        score,
    };
}

/// Marker with the highest count; ties go to the earlier entry of `LIST_MARKERS`.
fn most_used(counts: &BTreeMap<char, usize>) -> Option<char> {
    let mut best: Option<(char, usize)> = None;
    for marker in LIST_MARKERS {
        let count = counts.get(marker).copied().unwrap_or(0);
        if count > 0 && best.is_none_or(|(_, most)| return count > most) {
            best = Some((*marker, count));
        }
    }
    return best.map(|(marker, _)| return marker);
}

/// Documents with zero or several level-1 headings.
pub fn multiple_h1s(docs: &[Document]) -> Vec<MultipleH1> {
    return docs
        .iter()
        .filter_map(|doc| {
            let h1_texts: Vec<String> = outline::headings(&doc.text)
                .into_iter()
                .filter(|h| return h.level == 1)
                .map(|h| return h.text)
                .collect();
            if h1_texts.len() == 1 {
                return None;
            }
            return Some(MultipleH1 {
                file: doc.relative.clone(),
                h1_count: h1_texts.len(),
                h1_texts,
            });
        })
        .collect();
}

/// Blank-line separated blocks, whitespace-collapsed and lowercased, with
/// the line each starts on.
fn paragraphs(text: &str) -> Vec<(u32, String)> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start: u32 = 1;

    for (i, line) in text.lines().enumerate() {
        let number = u32::try_from(i.saturating_add(1)).unwrap_or(u32::MAX);
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push((start, normalize_block(&current)));
                current.clear();
            }
            continue;
        }
        if current.is_empty() {
            start = number;
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push((start, normalize_block(&current)));
    }
    return blocks;
}

/// Lines joined with single spaces, lowercased.
fn normalize_block(lines: &[&str]) -> String {
    return lines
        .iter()
        .flat_map(|line| return line.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
}

/// `part / whole * 100` rounded to two decimals; zero when `whole` is zero.
fn percentage(part: usize, whole: usize) -> f64 {
    return (ratio(part, whole) * 10_000.0).round() / 100.0;
}

/// `part / whole`; zero when `whole` is zero.
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let part = f64::from(u32::try_from(part).unwrap_or(u32::MAX));
    let whole = f64::from(u32::try_from(whole).unwrap_or(u32::MAX));
    return part / whole;
}

/// Style decided by the words after the first, ignoring minor words and
/// words without letters. `None` when no significant word remains.
fn significant_case(text: &str) -> Option<HeadingStyle> {
    let mut significant: usize = 0;
    let mut capitalized: usize = 0;

    for raw in text.split_whitespace().skip(1) {
        let word = strip_word(raw);
        if !word.chars().any(char::is_alphabetic) {
            continue;
        }
        if MINOR_WORDS.contains(&word.to_lowercase().as_str()) {
            continue;
        }
        significant = significant.saturating_add(1);
        if word.chars().next().is_some_and(char::is_uppercase) {
            capitalized = capitalized.saturating_add(1);
        }
    }

    if significant == 0 {
        return None;
    }
    if capitalized.saturating_mul(2) > significant {
        return Some(HeadingStyle::TitleCase);
    }
    return Some(HeadingStyle::SentenceCase);
}

/// Word without surrounding punctuation or a possessive suffix.
fn strip_word(raw: &str) -> &str {
    let trimmed = raw.trim_matches(|c: char| return !c.is_alphanumeric());
    return trimmed
        .strip_suffix("'s")
        .or_else(|| return trimmed.strip_suffix("\u{2019}s"))
        .unwrap_or(trimmed);
}

/// Public symbols never named in inline code, in index order.
pub fn undocumented_apis<'a>(index: &'a SymbolIndex, documented: &BTreeSet<String>) -> Vec<&'a Symbol> {
    return index.public_symbols().filter(|symbol| return !documented.contains(&symbol.name)).collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymbolKind;

    fn doc(relative: &str, text: &str) -> Document {
        return Document {
            relative: relative.to_string(),
            text: text.to_string(),
        };
    }

    fn symbol(name: &str, kind: SymbolKind) -> Symbol {
        return Symbol {
            column: 0,
            file: "src/lib.py".to_string(),
            kind,
            line: 1,
            name: name.to_string(),
            scope: None,
            signature: format!("def {name}()"),
        };
    }

    #[test]
    fn heading_case_threshold_is_strict_majority() {
        assert_eq!(classify_heading_style("Getting Started With the API"), HeadingStyle::TitleCase);
        assert_eq!(classify_heading_style("Getting started with the API"), HeadingStyle::SentenceCase);
        assert_eq!(classify_heading_style("Installation"), HeadingStyle::SentenceCase);
        assert_eq!(classify_heading_style("Install of the"), HeadingStyle::SentenceCase);
        assert_eq!(classify_heading_style("The User's Guide"), HeadingStyle::TitleCase);
        assert_eq!(classify_heading_style("Step 2: configure"), HeadingStyle::SentenceCase);
    }

    #[test]
    fn heading_tally_skips_unclassifiable_headings() {
        let docs = [doc("a.md", "# Overview\n\n## Quick Start Guide\n\n## Advanced Usage Notes\n\n## Next steps\n")];
        let tally = heading_case_consistency(&docs);
        assert_eq!(tally.title_case, 2);
        assert_eq!(tally.sentence_case, 1);
        assert_eq!(tally.dominant, Some(HeadingStyle::TitleCase));
    }

    #[test]
    fn list_markers_majority_and_score() {
        let docs = [
            doc("a.md", "- one\n- two\n"),
            doc("b.md", "* one\n* two\n"),
            doc("c.md", "- one\n\n```\n* not a list\n```\n"),
            doc("d.md", "no lists here\n"),
        ];
        let markers = list_marker_consistency(&docs);
        assert_eq!(markers.majority, Some('-'));
        assert_eq!(markers.counts[&'-'], 3);
        assert!((markers.score - 2.0 / 3.0).abs() < 1e-9);

        let empty = list_marker_consistency(&[]);
        assert_eq!(empty.majority, None);
        assert!((empty.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn h1_count_other_than_one_is_flagged() {
        let docs = [
            doc("one.md", "# Only\n\n## Sub\n"),
            doc("two.md", "# First\n\ntext\n\n# Second\n"),
            doc("none.md", "## Sub only\n"),
        ];
        let flagged = multiple_h1s(&docs);
        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged[0].file, "two.md");
        assert_eq!(flagged[0].h1_texts, vec!["First", "Second"]);
        assert_eq!(flagged[1].h1_count, 0);
    }

    #[test]
    fn coverage_counts_public_symbols() {
        let mut index: SymbolIndex = (0..10).map(|i| symbol(&format!("func_{i}"), SymbolKind::Function)).collect();
        index.insert(symbol("_private", SymbolKind::Function));
        let text = "Use `func_0()`, `func_1()`, `func_2()` and `func_3(x)`.\nAlso `func_4` and `obj.func_5()`.\n";
        let documented = documented_names(&[doc("a.md", text)]);

        let coverage = documentation_coverage(&index, &documented);
        assert_eq!(coverage.total, 10);
        assert_eq!(coverage.documented, 6);
        assert!((coverage.coverage_percentage - 60.0).abs() < f64::EPSILON);
        assert!((coverage.by_kind["function"].coverage_percentage - 60.0).abs() < f64::EPSILON);
        assert_eq!(undocumented_apis(&index, &documented).len(), 4);
    }

    #[test]
    fn coverage_without_symbols_is_zero() {
        let coverage = documentation_coverage(&SymbolIndex::default(), &BTreeSet::new());
        assert_eq!(coverage.total, 0);
        assert!(coverage.coverage_percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn duplicate_blocks_across_documents() {
        let shared = "# Installation\n\nTo install, run:\n```\npip install doc-manager\n```\n\nThen configure your project.\n";
        let docs = [doc("docs/a.md", shared), doc("docs/b.md", shared), doc("docs/c.md", "# Other\n\nShort.\n")];
        let duplicates = duplicate_blocks(&docs);
        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].locations, vec!["docs/a.md:3", "docs/b.md:3"]);
    }
}
