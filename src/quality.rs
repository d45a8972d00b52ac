//! Seven-criterion documentation quality assessment.
//!
//! Each criterion measures one metric and maps it to a four-level score
//! through a threshold table. The overall score is the rounded mean of the
//! criterion scores.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::Error;
use crate::heuristics::{self, Document};
use crate::outline;
use crate::patterns::ExcludeSet;
use crate::scanner;
use crate::symbols::{self, SymbolIndex};
use crate::validation::{self, Checks};

/// Score used in place of an unrecognized score when averaging.
const INVALID_SCORE_VALUE: u8 = 2;

/// Issues listed per criterion before the rest is summarized.
const MAX_LISTED_ISSUES: usize = 25;

/// Sentences longer than this many words are reported.
const LONG_SENTENCE_WORDS: usize = 40;

/// Coverage percentage → score, higher is better.
const COVERAGE_SCORES: &[(f64, Score)] = &[(80.0, Score::Excellent), (60.0, Score::Good), (40.0, Score::Fair)];

/// Validation issues per document → score, lower is better.
const ACCURACY_SCORES: &[(f64, Score)] = &[(0.0, Score::Excellent), (0.5, Score::Good), (1.5, Score::Fair)];

/// Share of documents that open with an introduction → score.
const PURPOSE_SCORES: &[(f64, Score)] = &[(0.9, Score::Excellent), (0.7, Score::Good), (0.5, Score::Fair)];

/// Duplicated blocks → score, lower is better.
const UNIQUENESS_SCORES: &[(f64, Score)] = &[(0.0, Score::Excellent), (2.0, Score::Good), (5.0, Score::Fair)];

/// Mean of list-marker and heading-case agreement → score.
const CONSISTENCY_SCORES: &[(f64, Score)] = &[(0.9, Score::Excellent), (0.75, Score::Good), (0.5, Score::Fair)];

/// Average words per sentence → score, lower is better.
const CLARITY_SCORES: &[(f64, Score)] = &[(20.0, Score::Excellent), (25.0, Score::Good), (30.0, Score::Fair)];

/// Structural problems per document → score, lower is better.
const STRUCTURE_SCORES: &[(f64, Score)] = &[(0.0, Score::Excellent), (0.25, Score::Good), (0.5, Score::Fair)];

/// Sentence boundary: terminal punctuation followed by whitespace or end.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"[.!?]+(?:\s+|$)").expect("valid regex"));

/// Words that carry no information in technical prose.
#[allow(clippy::expect_used, reason = "literal pattern covered by tests")]
static VAGUE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(?i)\b(?:stuff|things?|somehow|whatever|and so on|you know)\b").expect("valid regex");
});

/// Full assessment of a documentation tree.
#[derive(Debug, Serialize)]
pub struct Assessment {
    /// One result per criterion, in reporting order.
    pub criteria: Vec<CriterionResult>,
    /// Markdown files assessed.
    pub files_assessed: usize,
    /// Rounded mean of the criterion scores.
    pub overall_score: Option<Score>,
}

/// The seven assessed criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Links, assets, snippets and symbols are correct.
    Accuracy,
    /// Sentences are short and concrete.
    Clarity,
    /// Formatting conventions agree across documents.
    Consistency,
    /// Documents state what they are for.
    Purposefulness,
    /// The public API is covered.
    Relevance,
    /// Heading hierarchy is sound.
    Structure,
    /// Content is not repeated.
    Uniqueness,
}

impl Criterion {
    /// Reporting order.
    pub const ALL: [Self; 7] = [
        Self::Relevance,
        Self::Accuracy,
        Self::Purposefulness,
        Self::Uniqueness,
        Self::Consistency,
        Self::Clarity,
        Self::Structure,
    ];

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Accuracy => "accuracy",
            Self::Clarity => "clarity",
            Self::Consistency => "consistency",
            Self::Purposefulness => "purposefulness",
            Self::Relevance => "relevance",
            Self::Structure => "structure",
            Self::Uniqueness => "uniqueness",
        };
    }

    /// Capitalized name for headings.
    pub const fn title(self) -> &'static str {
        return match self {
            Self::Accuracy => "Accuracy",
            Self::Clarity => "Clarity",
            Self::Consistency => "Consistency",
            Self::Purposefulness => "Purposefulness",
            Self::Relevance => "Relevance",
            Self::Structure => "Structure",
            Self::Uniqueness => "Uniqueness",
        };
    }
}

/// Result of one criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionResult {
    /// Which criterion.
    pub criterion: Criterion,
    /// Observations, good or bad.
    #[serde(default)]
    pub findings: Vec<String>,
    /// Located problems.
    #[serde(default)]
    pub issues: Vec<QualityIssue>,
    /// Raw measurements behind the score.
    #[serde(default)]
    pub metrics: Map<String, Value>,
    /// Four-level score; absent when it could not be determined.
    #[serde(default)]
    pub score: Option<ScoreEntry>,
}

/// A located quality problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    /// Project-relative markdown file.
    pub file: String,
    /// One-based line, when the problem has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// What is wrong.
    pub message: String,
}

/// Four-level ordinal score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Score {
    /// 4
    Excellent,
    /// 2
    Fair,
    /// 3
    Good,
    /// 1
    Poor,
}

impl Score {
    /// Score for a rounded mean value; out-of-range values clamp.
    const fn from_value(value: u8) -> Self {
        return match value {
            0 | 1 => Self::Poor,
            2 => Self::Fair,
            3 => Self::Good,
            _ => Self::Excellent,
        };
    }

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Excellent => "excellent",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Poor => "poor",
        };
    }

    /// Ordinal value, poor = 1 through excellent = 4.
    pub const fn value(self) -> u8 {
        return match self {
            Self::Excellent => 4,
            Self::Fair => 2,
            Self::Good => 3,
            Self::Poor => 1,
        };
    }
}

/// A score as recorded: a known level, or text that is not one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreEntry {
    /// One of the four levels.
    Known(Score),
    /// Anything else.
    Unrecognized(String),
}

/// Run the `selected` criteria (all seven when empty) over the markdown files
/// below `docs_dir`.
///
/// # Errors
///
/// Returns `Error::DocsNotFound` when `docs_dir` is not a directory.
pub fn assess(root: &Path, docs_dir: &Path, excludes: &ExcludeSet, selected: &[Criterion]) -> Result<Assessment, Error> {
    if !docs_dir.is_dir() {
        return Err(Error::DocsNotFound {
            path: docs_dir.to_path_buf(),
        });
    }

    let docs = heuristics::load_documents(root, docs_dir, excludes);
    if docs.is_empty() {
        return Ok(Assessment {
            criteria: Vec::new(),
            files_assessed: 0,
            overall_score: None,
        });
    }

    let index = symbols::build_index(root, excludes);
    let criteria: Vec<CriterionResult> = Criterion::ALL
        .into_iter()
        .filter(|c| return selected.is_empty() || selected.contains(c))
        .map(|criterion| {
            return match criterion {
                Criterion::Accuracy => accuracy(root, &docs, &index),
                Criterion::Clarity => clarity(&docs),
                Criterion::Consistency => consistency(&docs),
                Criterion::Purposefulness => purposefulness(&docs),
                Criterion::Relevance => relevance(&docs, &index),
                Criterion::Structure => structure(&docs),
                Criterion::Uniqueness => uniqueness(&docs),
            };
        })
        .collect();
    let overall_score = overall_score(&criteria);

    return Ok(Assessment {
        criteria,
        files_assessed: docs.len(),
        overall_score,
    });
}

/// Validation issues per document.
fn accuracy(root: &Path, docs: &[Document], index: &SymbolIndex) -> CriterionResult {
    let checks = Checks {
        symbols: !index.is_empty(),
        ..Checks::default()
    };
    let mut issues = Vec::new();
    for doc in docs {
        for found in validation::validate_document(root, &doc.relative, &doc.text, checks, Some(index)) {
            issues.push(QualityIssue {
                file: found.file,
                line: Some(found.line),
                message: format!("{}: {}", found.kind.as_str(), found.detail),
            });
        }
    }

    let per_doc = per_document(issues.len(), docs.len());
    let findings = if issues.is_empty() {
        vec!["All links, images, code blocks and symbol references check out".to_string()]
    } else {
        vec![format!("{} validation issue(s) across {} file(s)", issues.len(), docs.len())]
    };
    let mut metrics = Map::new();
    metrics.insert("issues_per_document".to_string(), json!(round2(per_doc)));
    metrics.insert("symbol_checks".to_string(), json!(checks.symbols));
    metrics.insert("total_issues".to_string(), json!(issues.len()));
    return result(Criterion::Accuracy, score_at_most(per_doc, ACCURACY_SCORES), findings, issues, metrics);
}

/// Sentence length and vague wording.
fn clarity(docs: &[Document]) -> CriterionResult {
    let mut sentences: usize = 0;
    let mut words: usize = 0;
    let mut vague: usize = 0;
    let mut issues = Vec::new();

    for doc in docs {
        for (line, text) in prose(&doc.text) {
            for sentence in SENTENCE_END.split(&text).filter(|s| return !s.trim().is_empty()) {
                let count = sentence.split_whitespace().count();
                sentences = sentences.saturating_add(1);
                words = words.saturating_add(count);
                if count > LONG_SENTENCE_WORDS {
                    issues.push(QualityIssue {
                        file: doc.relative.clone(),
                        line: Some(line),
                        message: format!("sentence of {count} words"),
                    });
                }
            }
            for term in VAGUE_TERMS.find_iter(&text) {
                vague = vague.saturating_add(1);
                issues.push(QualityIssue {
                    file: doc.relative.clone(),
                    line: Some(line),
                    message: format!("vague wording \"{}\"", term.as_str()),
                });
            }
        }
    }

    let average = per_document(words, sentences);
    let mut findings = vec![format!("Average sentence length: {average:.1} words")];
    if vague > 0 {
        findings.push(format!("{vague} vague term(s) such as \"stuff\" or \"thing\""));
    }
    let mut metrics = Map::new();
    metrics.insert("average_sentence_length".to_string(), json!(round2(average)));
    metrics.insert("sentences".to_string(), json!(sentences));
    metrics.insert("vague_terms".to_string(), json!(vague));
    let score = if sentences == 0 {
        Score::Fair
    } else {
        score_at_most(average, CLARITY_SCORES)
    };
    return result(Criterion::Clarity, score, findings, issues, metrics);
}

/// List-marker and heading-case agreement.
fn consistency(docs: &[Document]) -> CriterionResult {
    let markers = heuristics::list_marker_consistency(docs);
    let headings = heuristics::heading_case_consistency(docs);
    let agreement = (markers.score + headings.score) / 2.0;

    let mut findings = Vec::new();
    if let Some(marker) = markers.majority {
        findings.push(format!("List marker `{marker}` is the majority ({:.0}% of files)", markers.score * 100.0));
    }
    if let Some(style) = headings.dominant {
        let name = match style {
            heuristics::HeadingStyle::SentenceCase => "Sentence case",
            heuristics::HeadingStyle::TitleCase => "Title case",
        };
        findings.push(format!("{name} headings dominate ({:.0}% of headings)", headings.score * 100.0));
    }
    if findings.is_empty() {
        findings.push("No lists or classifiable headings to compare".to_string());
    }

    let mut metrics = Map::new();
    metrics.insert("heading_case".to_string(), serde_json::to_value(&headings).unwrap_or(Value::Null));
    metrics.insert("list_markers".to_string(), serde_json::to_value(&markers).unwrap_or(Value::Null));
    return result(
        Criterion::Consistency,
        score_at_least(agreement, CONSISTENCY_SCORES),
        findings,
        Vec::new(),
        metrics,
    );
}

/// Whether a document has prose before its second section.
fn has_introduction(text: &str) -> bool {
    let mut headings_seen: usize = 0;
    for (_, line) in scanner::outside_fences(text) {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            headings_seen = headings_seen.saturating_add(1);
            if headings_seen > 1 {
                return false;
            }
            continue;
        }
        if !trimmed.is_empty() && trimmed.chars().next().is_some_and(char::is_alphanumeric) {
            return true;
        }
    }
    return false;
}

/// Rounded (half away from zero) mean of the scores present. Unrecognized
/// scores count as fair; missing scores are left out. `None` when nothing
/// could be averaged.
pub fn overall_score(results: &[CriterionResult]) -> Option<Score> {
    let mut total: u32 = 0;
    let mut counted: u32 = 0;
    for entry in results {
        let value = match &entry.score {
            Some(ScoreEntry::Known(score)) => score.value(),
            Some(ScoreEntry::Unrecognized(raw)) => {
                log::warn!(
                    "Invalid quality score '{raw}' for {}, using default {INVALID_SCORE_VALUE} (fair)",
                    entry.criterion.as_str()
                );
                INVALID_SCORE_VALUE
            },
            None => {
                log::warn!("Missing quality score for {}, skipping in summary", entry.criterion.as_str());
                continue;
            },
        };
        total = total.saturating_add(u32::from(value));
        counted = counted.saturating_add(1);
    }
    if counted == 0 {
        return None;
    }

    // Scores are positive, so rounding half up is rounding half away from zero.
    let rounded = total
        .saturating_mul(2)
        .saturating_add(counted)
        .checked_div(counted.saturating_mul(2))
        .unwrap_or(0);
    return Some(Score::from_value(u8::try_from(rounded).unwrap_or(u8::MAX)));
}

/// `part / whole` as a float; zero when `whole` is zero.
fn per_document(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let part = f64::from(u32::try_from(part).unwrap_or(u32::MAX));
    let whole = f64::from(u32::try_from(whole).unwrap_or(u32::MAX));
    return part / whole;
}

/// Prose lines with their numbers: outside fences, headings skipped, inline
/// code removed.
fn prose(text: &str) -> Vec<(u32, String)> {
    return scanner::outside_fences(text)
        .into_iter()
        .filter(|(_, line)| return !line.trim_start().starts_with('#') && !line.trim().is_empty())
        .map(|(number, line)| {
            let stripped: String = line.split('`').step_by(2).collect::<Vec<_>>().join(" ");
            return (number, stripped);
        })
        .collect();
}

/// Share of documents that open with an introduction.
fn purposefulness(docs: &[Document]) -> CriterionResult {
    let mut issues = Vec::new();
    for doc in docs {
        if !has_introduction(&doc.text) {
            issues.push(QualityIssue {
                file: doc.relative.clone(),
                line: None,
                message: "no introduction before the first section".to_string(),
            });
        }
    }

    let introduced = docs.len().saturating_sub(issues.len());
    let share = per_document(introduced, docs.len());
    let findings = vec![format!("{introduced} of {} file(s) open with an introduction", docs.len())];
    let mut metrics = Map::new();
    metrics.insert("documents_with_introduction".to_string(), json!(introduced));
    metrics.insert("introduction_ratio".to_string(), json!(round2(share)));
    return result(Criterion::Purposefulness, score_at_least(share, PURPOSE_SCORES), findings, issues, metrics);
}

/// Coverage of the public API by inline-code mentions.
fn relevance(docs: &[Document], index: &SymbolIndex) -> CriterionResult {
    let documented = heuristics::documented_names(docs);
    let coverage = heuristics::documentation_coverage(index, &documented);
    let undocumented = heuristics::undocumented_apis(index, &documented);

    let issues = undocumented
        .iter()
        .map(|symbol| {
            return QualityIssue {
                file: symbol.file.clone(),
                line: Some(symbol.line),
                message: format!("undocumented {} `{}`", symbol.kind.as_str(), symbol.name),
            };
        })
        .collect();

    let (score, findings) = if coverage.total == 0 {
        (Score::Fair, vec!["No public symbols found to measure coverage against".to_string()])
    } else {
        (
            score_at_least(coverage.coverage_percentage, COVERAGE_SCORES),
            vec![format!(
                "{} of {} public symbol(s) documented ({:.2}%)",
                coverage.documented, coverage.total, coverage.coverage_percentage
            )],
        )
    };
    let mut metrics = Map::new();
    metrics.insert("coverage".to_string(), serde_json::to_value(&coverage).unwrap_or(Value::Null));
    metrics.insert("undocumented_apis".to_string(), json!(undocumented.len()));
    return result(Criterion::Relevance, score, findings, issues, metrics);
}

/// Markdown report; criteria without a score show `N/A`.
pub fn render_markdown(assessment: &Assessment, docs_path: &str) -> String {
    if assessment.files_assessed == 0 {
        return format!("# Documentation Quality Assessment\n\nNo files found in `{docs_path}`.\n");
    }

    let mut out = String::from("# Documentation Quality Assessment\n\n");
    let overall = assessment.overall_score.map_or("N/A", |s| return s.as_str());
    let _ = writeln!(out, "**Overall Score:** {}", overall.to_uppercase());
    let _ = writeln!(out, "**Files Assessed:** {}\n", assessment.files_assessed);

    out.push_str("## Score Summary\n\n");
    for entry in &assessment.criteria {
        let _ = writeln!(out, "- {}: {}", entry.criterion.title(), score_label(entry, false));
    }

    for entry in &assessment.criteria {
        let _ = write!(out, "\n## {}\n\n**Score:** {}\n", entry.criterion.title(), score_label(entry, true));
        if !entry.findings.is_empty() {
            out.push_str("\n### Findings\n\n");
            for finding in &entry.findings {
                let _ = writeln!(out, "- {finding}");
            }
        }
        if !entry.issues.is_empty() {
            out.push_str("\n### Issues\n\n");
            for issue in entry.issues.iter().take(MAX_LISTED_ISSUES) {
                match issue.line {
                    Some(line) => {
                        let _ = writeln!(out, "- `{}` line {line}: {}", issue.file, issue.message);
                    },
                    None => {
                        let _ = writeln!(out, "- `{}`: {}", issue.file, issue.message);
                    },
                }
            }
            let hidden = entry.issues.len().saturating_sub(MAX_LISTED_ISSUES);
            if hidden > 0 {
                let _ = writeln!(out, "- ... and {hidden} more");
            }
        }
    }
    return out;
}

/// Assemble a criterion result.
fn result(
    criterion: Criterion,
    score: Score,
    findings: Vec<String>,
    issues: Vec<QualityIssue>,
    metrics: Map<String, Value>,
) -> CriterionResult {
    return CriterionResult {
        criterion,
        findings,
        issues,
        metrics,
        score: Some(ScoreEntry::Known(score)),
    };
}

/// Two-decimal rounding for reported metrics.
fn round2(value: f64) -> f64 {
    return (value * 100.0).round() / 100.0;
}

/// Uppercase score label. Missing scores render `N/A`; the display warning is
/// logged once, from the detailed section.
fn score_label(entry: &CriterionResult, warn_missing: bool) -> String {
    return match &entry.score {
        Some(ScoreEntry::Known(score)) => score.as_str().to_uppercase(),
        Some(ScoreEntry::Unrecognized(raw)) => raw.to_uppercase(),
        None => {
            if warn_missing {
                log::warn!("Missing quality score for {}, displaying N/A", entry.criterion.as_str());
            }
            "N/A".to_string()
        },
    };
}

/// First level whose threshold `value` reaches; poor otherwise.
fn score_at_least(value: f64, table: &[(f64, Score)]) -> Score {
    return table
        .iter()
        .find(|(threshold, _)| return value >= *threshold)
        .map_or(Score::Poor, |(_, score)| return *score);
}

/// First level whose threshold `value` stays within; poor otherwise.
fn score_at_most(value: f64, table: &[(f64, Score)]) -> Score {
    return table
        .iter()
        .find(|(threshold, _)| return value <= *threshold)
        .map_or(Score::Poor, |(_, score)| return *score);
}

/// Heading-level jumps and top-level heading counts.
fn structure(docs: &[Document]) -> CriterionResult {
    let mut issues = Vec::new();
    for doc in docs {
        let mut previous: Option<u8> = None;
        for heading in outline::headings(&doc.text) {
            if let Some(prev) = previous
                && heading.level > prev.saturating_add(1)
            {
                issues.push(QualityIssue {
                    file: doc.relative.clone(),
                    line: Some(heading.line),
                    message: format!("heading level jumps from H{prev} to H{}", heading.level),
                });
            }
            previous = Some(heading.level);
        }
    }
    let skips = issues.len();

    let h1_problems = heuristics::multiple_h1s(docs);
    for flagged in &h1_problems {
        let message = if flagged.h1_count == 0 {
            "no top-level heading".to_string()
        } else {
            format!("{} top-level headings: {}", flagged.h1_count, flagged.h1_texts.join(", "))
        };
        issues.push(QualityIssue {
            file: flagged.file.clone(),
            line: None,
            message,
        });
    }

    let max_depth = docs
        .iter()
        .map(|doc| return doc.relative.matches('/').count())
        .max()
        .unwrap_or(0);
    let per_doc = per_document(issues.len(), docs.len());
    let findings = vec![
        format!("{skips} heading level jump(s), {} file(s) without exactly one H1", h1_problems.len()),
        format!("Deepest file sits {max_depth} director(ies) below the project root"),
    ];
    let mut metrics = Map::new();
    metrics.insert("heading_level_skips".to_string(), json!(skips));
    metrics.insert("max_depth".to_string(), json!(max_depth));
    metrics.insert("multiple_h1".to_string(), serde_json::to_value(&h1_problems).unwrap_or(Value::Null));
    return result(Criterion::Structure, score_at_most(per_doc, STRUCTURE_SCORES), findings, issues, metrics);
}

/// Duplicated content blocks.
fn uniqueness(docs: &[Document]) -> CriterionResult {
    let duplicates = heuristics::duplicate_blocks(docs);
    let issues = duplicates
        .iter()
        .map(|block| {
            return QualityIssue {
                file: block.locations.join(", "),
                line: None,
                message: format!("duplicate content: \"{}\"", block.preview),
            };
        })
        .collect();

    let findings = if duplicates.is_empty() {
        vec!["No duplicate content blocks".to_string()]
    } else {
        vec![format!("{} duplicate content block(s)", duplicates.len())]
    };
    let count = f64::from(u32::try_from(duplicates.len()).unwrap_or(u32::MAX));
    let mut metrics = Map::new();
    metrics.insert("duplicate_blocks".to_string(), json!(duplicates.len()));
    return result(Criterion::Uniqueness, score_at_most(count, UNIQUENESS_SCORES), findings, issues, metrics);
}
