//! services/api/src/generation/extract.rs
//!
//! Parses raw model output as JSON, tolerating the prose and code fences
//! models like to wrap their answers in. Never fails: malformed output
//! degrades to a fallback structure instead of an error.

use serde_json::{json, Value};

pub const FALLBACK_TITLE: &str = "Untitled Lesson";
pub const FALLBACK_THEME: &str = "General";

/// Carves the JSON value out of `raw` and parses it.
///
/// The candidate substring runs from the first `{` or `[` to the last `}`
/// or `]`, inclusive. On any failure the returned value is the fallback
/// object `{"title", "detected_theme", "content"}` with the original raw
/// text as the content, so callers can always persist something.
pub fn extract_structure(raw: &str) -> Value {
    if let Some(candidate) = json_candidate(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return value;
        }
    }
    json!({
        "title": FALLBACK_TITLE,
        "detected_theme": FALLBACK_THEME,
        "content": raw,
    })
}

fn json_candidate(raw: &str) -> Option<&str> {
    let start = raw.find(['{', '['])?;
    let end = raw.rfind(['}', ']'])?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prose_around_a_json_object() {
        let raw = r#"Sure! {"title":"X","detected_theme":"Y","content":"Z"} Hope that helps!"#;
        let value = extract_structure(raw);
        assert_eq!(value["title"], "X");
        assert_eq!(value["detected_theme"], "Y");
        assert_eq!(value["content"], "Z");
    }

    #[test]
    fn strips_code_fences() {
        let raw = "```json\n{\"title\":\"Fenced\",\"detected_theme\":\"T\",\"content\":\"C\"}\n```";
        let value = extract_structure(raw);
        assert_eq!(value["title"], "Fenced");
    }

    #[test]
    fn non_json_input_returns_the_fallback_object() {
        let value = extract_structure("not json at all");
        assert_eq!(value["title"], FALLBACK_TITLE);
        assert_eq!(value["detected_theme"], FALLBACK_THEME);
        assert_eq!(value["content"], "not json at all");
    }

    #[test]
    fn extracts_a_bare_json_array() {
        let value = extract_structure(r#"Here you go: ["Grace", "Hope", "Faith"]"#);
        let themes = value.as_array().expect("array");
        assert_eq!(themes.len(), 3);
        assert_eq!(themes[0], "Grace");
    }

    #[test]
    fn unbalanced_braces_fall_back() {
        let value = extract_structure("} oops {");
        assert_eq!(value["title"], FALLBACK_TITLE);
        assert_eq!(value["content"], "} oops {");
    }
}
