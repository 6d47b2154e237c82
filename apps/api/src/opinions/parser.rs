//! Response Parser: recovers exactly five opinions from free-form provider text.
//!
//! Tiers run in order and the first one that yields five non-empty entries wins:
//! 1. structured: a JSON array of strings, or an object with an `opinions` array
//! 2. numbered: lines like `1. text`, `2) text`, `3: text`, ordered by label
//! 3. quoted: the first five double-quoted substrings that are not JSON keys
//! 4. lines: the first five non-blank lines
//!
//! Each tier is a pure function over the raw text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::models::student::{Opinion, Opinions, OPINION_COUNT};
use crate::opinions::error::ParseError;

type Tier = fn(&str) -> Option<Vec<Opinion>>;

const TIERS: &[(&str, Tier)] = &[
    ("structured", parse_structured as Tier),
    ("numbered", parse_numbered as Tier),
    ("quoted", parse_quoted as Tier),
    ("lines", parse_lines as Tier),
];

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})\s*[.:)]\s*(.+)$").unwrap());

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"\n]*)"|“([^”\n]*)”"#).unwrap());

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*•]\s*").unwrap());

/// Runs the tier chain over `raw`.
pub fn parse(raw: &str) -> Result<Opinions, ParseError> {
    for (name, tier) in TIERS {
        if let Some(opinions) = tier(raw).and_then(exactly_five) {
            debug!("Parsed opinions with the {} tier", name);
            return Ok(opinions);
        }
    }
    Err(ParseError {
        raw: raw.to_string(),
    })
}

/// Trims every entry and accepts the list only if it holds five non-empty strings.
fn exactly_five(entries: Vec<Opinion>) -> Option<Opinions> {
    let entries: Vec<Opinion> = entries.iter().map(|e| e.trim().to_string()).collect();
    if entries.len() != OPINION_COUNT || entries.iter().any(|e| e.is_empty()) {
        return None;
    }
    entries.try_into().ok()
}

// ────────────────────────────────────────────────────────────────────────────
// Tier 1: structured
// ────────────────────────────────────────────────────────────────────────────

pub fn parse_structured(raw: &str) -> Option<Vec<Opinion>> {
    let text = strip_json_fences(raw);
    if let Some(entries) = strings_from_json(text) {
        return Some(entries);
    }

    // JSON array embedded in surrounding prose
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    strings_from_json(&text[start..=end])
}

fn strings_from_json(text: &str) -> Option<Vec<Opinion>> {
    let items = match serde_json::from_str::<Value>(text).ok()? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("opinions")? {
            Value::Array(items) => items,
            _ => return None,
        },
        _ => return None,
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    stripped
        .trim_start()
        .strip_suffix("```")
        .map(|s| s.trim())
        .unwrap_or(stripped.trim_start())
}

// ────────────────────────────────────────────────────────────────────────────
// Tier 2: numbered list
// ────────────────────────────────────────────────────────────────────────────

pub fn parse_numbered(raw: &str) -> Option<Vec<Opinion>> {
    let mut labelled: Vec<(u32, Opinion)> = raw
        .lines()
        .filter_map(|line| {
            let caps = NUMBERED_LINE.captures(line.trim())?;
            let label = caps[1].parse::<u32>().ok()?;
            Some((label, strip_wrapping_quotes(&caps[2]).to_string()))
        })
        .collect();

    if labelled.is_empty() {
        return None;
    }
    labelled.sort_by_key(|(label, _)| *label);
    Some(labelled.into_iter().map(|(_, body)| body).collect())
}

fn strip_wrapping_quotes(text: &str) -> &str {
    let text = text.trim();
    [('"', '"'), ('“', '”'), ('\'', '\'')]
        .iter()
        .find_map(|(open, close)| {
            text.strip_prefix(*open)
                .and_then(|rest| rest.strip_suffix(*close))
        })
        .unwrap_or(text)
}

// ────────────────────────────────────────────────────────────────────────────
// Tier 3: quoted strings
// ────────────────────────────────────────────────────────────────────────────

pub fn parse_quoted(raw: &str) -> Option<Vec<Opinion>> {
    let quoted: Vec<Opinion> = QUOTED
        .captures_iter(raw)
        .filter(|caps| !is_object_key(raw, caps.get(0).map_or(0, |m| m.end())))
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .take(OPINION_COUNT)
        .map(str::to_string)
        .collect();

    (!quoted.is_empty()).then_some(quoted)
}

/// A quoted string followed by `:` is a JSON object key, not an opinion.
fn is_object_key(raw: &str, quote_end: usize) -> bool {
    raw[quote_end..].trim_start().starts_with(':')
}

// ────────────────────────────────────────────────────────────────────────────
// Tier 4: plain lines
// ────────────────────────────────────────────────────────────────────────────

pub fn parse_lines(raw: &str) -> Option<Vec<Opinion>> {
    let lines: Vec<Opinion> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(OPINION_COUNT)
        .collect();

    (!lines.is_empty()).then_some(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> Opinions {
        ["A", "B", "C", "D", "E"].map(String::from)
    }

    #[test]
    fn test_json_array_round_trips_through_structured_tier() {
        let parsed = parse(r#"["a","b","c","d","e"]"#).unwrap();
        assert_eq!(parsed, ["a", "b", "c", "d", "e"].map(String::from));
        assert!(parse_structured(r#"["a","b","c","d","e"]"#).is_some());
    }

    #[test]
    fn test_structured_accepts_opinions_object() {
        let raw = r#"{"opinions": ["A", "B", "C", "D", "E"]}"#;
        assert_eq!(parse(raw).unwrap(), letters());
    }

    #[test]
    fn test_structured_accepts_fenced_json() {
        let raw = "```json\n[\"A\", \"B\", \"C\", \"D\", \"E\"]\n```";
        assert_eq!(parse_structured(raw).unwrap(), letters().to_vec());
    }

    #[test]
    fn test_structured_finds_array_inside_prose() {
        let raw = "다음은 평가의견입니다:\n[\"A\", \"B\", \"C\", \"D\", \"E\"]\n감사합니다.";
        assert_eq!(parse_structured(raw).unwrap(), letters().to_vec());
    }

    #[test]
    fn test_structured_rejects_non_string_entries() {
        assert!(parse_structured(r#"["A", 2, "C", "D", "E"]"#).is_none());
    }

    #[test]
    fn test_numbered_list() {
        let raw = "1. A\n2. B\n3. C\n4. D\n5. E";
        assert_eq!(parse_numbered(raw).unwrap(), letters().to_vec());
        assert_eq!(parse(raw).unwrap(), letters());
    }

    #[test]
    fn test_numbered_list_mixed_separators_sorted_by_label() {
        let raw = "Here you go:\n2) B\n1: A\n3. \"C\"\n5) E\n4. D";
        assert_eq!(parse_numbered(raw).unwrap(), letters().to_vec());
    }

    #[test]
    fn test_quoted_strings() {
        let raw = "\"A\" \"B\" \"C\" \"D\" \"E\"";
        assert_eq!(parse_quoted(raw).unwrap(), letters().to_vec());
        assert_eq!(parse(raw).unwrap(), letters());
    }

    #[test]
    fn test_quoted_takes_first_five_and_accepts_curly_quotes() {
        let raw = "“A” then “B”, \"C\" \"D\" \"E\" \"F\"";
        assert_eq!(parse_quoted(raw).unwrap(), letters().to_vec());
    }

    #[test]
    fn test_line_split_takes_first_five_non_blank_lines() {
        let raw = "A\n\nB\nC\n\nD\nE\nF";
        assert_eq!(parse_lines(raw).unwrap(), letters().to_vec());
        assert_eq!(parse(raw).unwrap(), letters());
    }

    #[test]
    fn test_line_split_strips_bullets_and_fences() {
        let raw = "```\n- A\n* B\n• C\n- D\n- E\n```";
        assert_eq!(parse(raw).unwrap(), letters());
    }

    #[test]
    fn test_six_entry_array_falls_through_to_first_five_quoted() {
        let raw = r#"["A","B","C","D","E","F"]"#;
        assert!(parse_structured(raw).and_then(exactly_five).is_none());
        assert_eq!(parse(raw).unwrap(), letters());
    }

    #[test]
    fn test_short_opinions_object_does_not_surface_its_key() {
        let raw = r#"{"opinions": ["A", "B", "C", "D"]}"#;
        assert!(parse_quoted(raw).and_then(exactly_five).is_none());
        assert!(parse(raw).is_err());
    }

    #[test]
    fn test_long_opinions_object_takes_first_five_values() {
        let raw = r#"{"opinions":["A","B","C","D","E","F"]}"#;
        assert_eq!(parse(raw).unwrap(), letters());
    }

    #[test]
    fn test_line_split_keeps_leading_digits() {
        let parsed = parse("3:1로 이긴 경기에서 활약함\nB\nC\nD\nE").unwrap();
        assert_eq!(parsed[0], "3:1로 이긴 경기에서 활약함");
        let parsed = parse("100점 만점을 받음\nB\nC\nD\nE").unwrap();
        assert_eq!(parsed[0], "100점 만점을 받음");
    }

    #[test]
    fn test_single_line_is_parse_error() {
        let err = parse("only one line").unwrap_err();
        assert_eq!(err.raw, "only one line");
    }

    #[test]
    fn test_three_entries_is_parse_error_not_padded() {
        assert!(parse(r#"["A","B","C"]"#).is_err());
        assert!(parse("1. A\n2. B\n3. C").is_err());
    }

    #[test]
    fn test_empty_response_is_parse_error() {
        assert!(parse("").is_err());
        assert!(parse("   \n  ").is_err());
    }

    #[test]
    fn test_blank_entries_are_rejected() {
        assert!(exactly_five(vec!["A".into(), " ".into(), "C".into(), "D".into(), "E".into()]).is_none());
    }
}
