//! Response size limiting for tool output.
//!
//! Narrative output is cut at a line boundary and ends with a visible notice.
//! JSON output stays parseable: trailing entries of the largest collections
//! are dropped until it fits, and the result is flagged as truncated.

use serde_json::{Map, Value};

use crate::request::ResponseFormat;

/// Maximum response size, in characters.
pub const CHARACTER_LIMIT: usize = 25_000;

/// Fit `output` into `max_chars` characters. Output already within the limit
/// is returned unchanged.
pub fn limit(output: String, format: ResponseFormat, max_chars: usize) -> String {
    if output.chars().count() <= max_chars {
        return output;
    }
    log::debug!("truncating {format:?} response to {max_chars} characters");

    return match format {
        ResponseFormat::Json => limit_json(&output, max_chars).unwrap_or_else(|| return plain_notice(max_chars)),
        ResponseFormat::Markdown => limit_narrative(&output, max_chars),
    };
}

/// `25000` → `25,000`.
fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut grouped = String::new();
    for (i, digit) in digits.chars().enumerate() {
        let remaining = digits.len().saturating_sub(i);
        if i > 0 && remaining % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    return grouped;
}

/// JSON pointer of the collection with the most entries. The root object is
/// never chosen so the truncation markers survive.
fn largest_collection(value: &Value, pointer: &str, is_root: bool, best: &mut Option<(usize, String)>) {
    let len = match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::Bool(_) | Value::Null | Value::Number(_) | Value::String(_) => return,
    };
    if !is_root && len > 0 && best.as_ref().is_none_or(|(most, _)| return len > *most) {
        *best = Some((len, pointer.to_string()));
    }

    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                largest_collection(item, &format!("{pointer}/{i}"), false, best);
            }
        },
        Value::Object(map) => {
            for (key, item) in map {
                let escaped = key.replace('~', "~0").replace('/', "~1");
                largest_collection(item, &format!("{pointer}/{escaped}"), false, best);
            }
        },
        Value::Bool(_) | Value::Null | Value::Number(_) | Value::String(_) => {},
    }
}

/// Shrink structured output until it serializes within `max_chars`.
/// `None` when the input is not JSON or nothing can be dropped any more.
fn limit_json(output: &str, max_chars: usize) -> Option<String> {
    let parsed: Value = serde_json::from_str(output).ok()?;
    let mut root = match parsed {
        Value::Object(map) => map,
        other => {
            let mut wrapper = Map::new();
            wrapper.insert("data".to_string(), other);
            wrapper
        },
    };
    root.insert("truncated".to_string(), Value::Bool(true));
    root.insert("truncation_notice".to_string(), Value::String(notice_text(max_chars)));
    let mut value = Value::Object(root);

    loop {
        let serialized = serde_json::to_string_pretty(&value).ok()?;
        let size = serialized.chars().count();
        if size <= max_chars {
            return Some(serialized);
        }

        let mut best = None;
        largest_collection(&value, "", true, &mut best);
        let (len, pointer) = best?;
        let target = value.pointer_mut(&pointer)?;
        let target_size = serde_json::to_string(target).map_or(size, |s| return s.chars().count()).max(1);
        let overshoot = size.saturating_sub(max_chars);
        let drop = overshoot.saturating_mul(len).div_ceil(target_size).clamp(1, len);
        pop_trailing(target, drop);
    }
}

/// Cut at the last line boundary that leaves room for the notice.
fn limit_narrative(output: &str, max_chars: usize) -> String {
    let notice = format!("\n\n---\n{}\n", notice_text(max_chars));
    let notice_len = notice.chars().count();
    if max_chars <= notice_len {
        return plain_notice(max_chars);
    }

    let budget = max_chars.saturating_sub(notice_len);
    let head: String = output.chars().take(budget).collect();
    let kept = match head.rfind('\n') {
        Some(end) => head.get(..end).unwrap_or(&head),
        None => head.as_str(),
    };
    return format!("{}{notice}", kept.trim_end());
}

/// Notice text naming the enforced limit and a remedy.
fn notice_text(max_chars: usize) -> String {
    return format!(
        "**Response truncated**: output exceeded the {} character limit.\nTip: narrow the request (a single docs path, fewer files) or use the json format and filter the result.",
        group_thousands(max_chars)
    );
}

/// The bare notice, cut to `max_chars` if even that is too long.
fn plain_notice(max_chars: usize) -> String {
    return notice_text(max_chars).chars().take(max_chars).collect();
}

/// Remove the last `count` entries of an array or object.
fn pop_trailing(target: &mut Value, count: usize) {
    match target {
        Value::Array(items) => items.truncate(items.len().saturating_sub(count)),
        Value::Object(map) => {
            for _ in 0..count {
                let Some(last) = map.keys().next_back().cloned() else {
                    break;
                };
                map.remove(&last);
            }
        },
        Value::Bool(_) | Value::Null | Value::Number(_) | Value::String(_) => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_passes_through() {
        let text = "# Report\n\nAll good.\n".to_string();
        assert_eq!(limit(text.clone(), ResponseFormat::Markdown, CHARACTER_LIMIT), text);
    }

    #[test]
    fn narrative_is_cut_at_a_line_with_notice() {
        let text: String = (0..5000).map(|i| format!("line {i} of the report\n")).collect();
        let out = limit(text, ResponseFormat::Markdown, CHARACTER_LIMIT);
        assert!(out.chars().count() <= CHARACTER_LIMIT);
        assert!(out.contains("**Response truncated**"));
        assert!(out.contains("25,000 character limit"));
        assert!(out.trim_end().ends_with("filter the result."));
        let body = out.split("\n\n---\n").next().unwrap();
        assert!(body.ends_with("of the report"));
    }

    #[test]
    fn multibyte_text_is_counted_in_characters() {
        let text = "é".repeat(30_000);
        let out = limit(text, ResponseFormat::Markdown, CHARACTER_LIMIT);
        assert!(out.chars().count() <= CHARACTER_LIMIT);
        assert!(out.contains("Response truncated"));
    }

    #[test]
    fn json_stays_parseable_and_flagged() {
        let entries: Vec<Value> = (0..3000).map(|i| serde_json::json!({"file": format!("docs/page-{i}.md"), "line": i})).collect();
        let output = serde_json::json!({"issues": entries, "total": 3000}).to_string();
        let out = limit(output, ResponseFormat::Json, CHARACTER_LIMIT);
        assert!(out.chars().count() <= CHARACTER_LIMIT);

        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["truncated"], Value::Bool(true));
        assert_eq!(parsed["total"], 3000);
        let kept = parsed["issues"].as_array().unwrap();
        assert!(!kept.is_empty() && kept.len() < 3000);
        assert_eq!(kept[0]["file"], "docs/page-0.md");
        assert!(parsed["truncation_notice"].as_str().unwrap().contains("25,000"));
    }

    #[test]
    fn unshrinkable_json_falls_back_to_notice() {
        let output = serde_json::json!({"blob": "x".repeat(40_000)}).to_string();
        let out = limit(output, ResponseFormat::Json, CHARACTER_LIMIT);
        assert!(out.starts_with("**Response truncated**"));

        let out = limit("not json ".repeat(4000), ResponseFormat::Json, CHARACTER_LIMIT);
        assert!(out.starts_with("**Response truncated**"));
    }

    #[test]
    fn notice_names_the_enforced_limit() {
        let text: String = (0..200).map(|i| format!("entry {i} in a long listing\n")).collect();
        let out = limit(text, ResponseFormat::Markdown, 1000);
        assert!(out.chars().count() <= 1000);
        assert!(out.contains("1,000 character limit"), "{out}");
        assert!(!out.contains("25,000"));

        let entries: Vec<Value> = (0..200).map(|i| serde_json::json!({"file": format!("docs/{i}.md")})).collect();
        let out = limit(serde_json::json!({"files": entries}).to_string(), ResponseFormat::Json, 2000);
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert!(parsed["truncation_notice"].as_str().unwrap().contains("2,000 character limit"));
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(25_000), "25,000");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
