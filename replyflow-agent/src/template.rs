//! `{key}` placeholder rendering for step instructions.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use replyflow_core::SharedState;
use serde_json::Value;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\}")
        .expect("valid placeholder regex")
});

/// Fill `{key}` and `{key.field}` placeholders from the shared state.
///
/// Strings are inserted verbatim, other values as JSON. Placeholders naming a
/// missing key are left untouched.
pub fn render_instruction(instruction: &str, state: &SharedState) -> String {
    PLACEHOLDER
        .replace_all(instruction, |caps: &Captures<'_>| {
            match state.lookup(&caps[1]) {
                Some(Value::String(text)) => text.clone(),
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn fills_nested_and_plain_keys() {
        let mut state = SharedState::new();
        state.set_raw(
            "fetched_email_data",
            json!({"status": "success", "sender": "jane@example.com"}),
        );
        state.set_raw("attempts", json!(2));

        let rendered = render_instruction(
            "Reply to {fetched_email_data.sender} (attempt {attempts}).",
            &state,
        );
        assert_eq!(rendered, "Reply to jane@example.com (attempt 2).");
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let state = SharedState::new();
        let text = "Never write {recipient name} or {missing_key}.";
        assert_eq!(render_instruction(text, &state), text);
    }

    #[test]
    fn object_values_render_as_json() {
        let mut state = SharedState::new();
        state.set_raw("data", json!({"a": 1}));
        assert_eq!(render_instruction("{data}", &state), r#"{"a":1}"#);
    }

    #[test]
    fn placeholder_matches_dotted_keys_only() {
        assert!(PLACEHOLDER.is_match("{fetched_email_data.sender}"));
        assert!(!PLACEHOLDER.is_match("{recipient name}"));
        assert!(!PLACEHOLDER.is_match("{1st}"));
    }
}
