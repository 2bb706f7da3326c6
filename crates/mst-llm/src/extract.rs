//! Pulls a single JSON object out of a raw LLM completion. Models routinely
//! wrap JSON in markdown code fences or pad it with prose before/after —
//! this performs a brace-depth, string/escape-aware scan rather than
//! assuming the whole response is valid JSON.

use mst_schemas::AppError;
use serde_json::Value;

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag on the opening fence line (e.g. "json").
    let after_lang = match after_open.find('\n') {
        Some(idx) => &after_open[idx + 1..],
        None => after_open,
    };
    match after_lang.rfind("```") {
        Some(idx) => after_lang[..idx].trim(),
        None => after_lang.trim(),
    }
}

/// Scans from the first `{` for the matching `}`, tracking string literals
/// and backslash escapes so braces inside quoted strings don't throw off
/// the depth count.
fn find_balanced_object(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let start = s.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(&s[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extracts and parses the first balanced `{...}` object found in `raw`,
/// after stripping any surrounding markdown code fences.
pub fn extract_json(raw: &str) -> Result<Value, AppError> {
    let stripped = strip_code_fences(raw);

    let candidate = find_balanced_object(stripped).ok_or_else(|| {
        AppError::validation(format!(
            "no balanced JSON object found in LLM response: {}",
            truncate_for_error(stripped)
        ))
    })?;

    serde_json::from_str(candidate).map_err(|e| {
        AppError::validation(format!(
            "LLM response JSON did not parse ({e}): {}",
            truncate_for_error(candidate)
        ))
    })
}

fn truncate_for_error(s: &str) -> String {
    const MAX: usize = 300;
    if s.len() <= MAX {
        s.to_string()
    } else {
        format!("{}...", &s[..MAX])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_object() {
        let v = extract_json(r#"{"label":"positive","score":0.8}"#).unwrap();
        assert_eq!(v["label"], "positive");
    }

    #[test]
    fn strips_fenced_json_block() {
        let raw = "```json\n{\"label\": \"negative\"}\n```";
        let v = extract_json(raw).unwrap();
        assert_eq!(v["label"], "negative");
    }

    #[test]
    fn ignores_leading_and_trailing_prose() {
        let raw = "Here is the analysis:\n{\"label\": \"neutral\"}\nLet me know if you need more.";
        let v = extract_json(raw).unwrap();
        assert_eq!(v["label"], "neutral");
    }

    #[test]
    fn braces_inside_strings_do_not_break_depth_tracking() {
        let raw = r#"{"reasoning": "mentions {sector} risk", "label": "neutral"}"#;
        let v = extract_json(raw).unwrap();
        assert_eq!(v["label"], "neutral");
    }

    #[test]
    fn escaped_quotes_inside_strings_are_handled() {
        let raw = r#"{"reasoning": "says \"buy now\"", "label": "positive"}"#;
        let v = extract_json(raw).unwrap();
        assert_eq!(v["label"], "positive");
    }

    #[test]
    fn no_object_present_is_an_error() {
        assert!(extract_json("no json here at all").is_err());
    }

    #[test]
    fn unbalanced_object_is_an_error() {
        assert!(extract_json(r#"{"label": "positive""#).is_err());
    }
}
