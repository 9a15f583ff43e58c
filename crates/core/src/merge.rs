//! Mail-merge keyword substitution.
//!
//! Templates reference subscriber attributes with `<<attribute_name>>`
//! tokens. Known attributes are substituted with their string form; list
//! attributes are rendered as a human-joined list (`"A, B and C"`). Tokens
//! naming an attribute that is not present are left untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Regex pattern matching `<<placeholder>>` tokens.
pub const PLACEHOLDER_PATTERN: &str = r"<<([A-Za-z0-9_\-]+)>>";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid regex"));

/// Join items for display: `""`, `"A"`, `"A and B"`, `"A, B and C"`.
pub fn join_human<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            format!("{} and {}", head.join(", "), last.as_ref())
        }
    }
}

/// Render a single attribute value the way it appears in a merged message.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(render_value).collect();
            join_human(&rendered)
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Substitute every `<<key>>` token in `template` whose key exists in `fields`.
///
/// Substitution is a single pass, so attribute values that themselves
/// contain `<<...>>` are not expanded again.
pub fn merge_keywords(template: &str, fields: &Map<String, Value>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| match fields.get(&caps[1]) {
            Some(value) => render_value(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Convert a serializable record into merge fields, dropping `null` attributes.
///
/// Absent optional attributes behave like unknown placeholders.
pub fn merge_fields<T: serde::Serialize>(record: &T) -> Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    // -- join_human -----------------------------------------------------------

    #[test]
    fn join_empty_list() {
        assert_eq!(join_human::<&str>(&[]), "");
    }

    #[test]
    fn join_single_item() {
        assert_eq!(join_human(&["A"]), "A");
    }

    #[test]
    fn join_two_items() {
        assert_eq!(join_human(&["A", "B"]), "A and B");
    }

    #[test]
    fn join_many_items() {
        assert_eq!(join_human(&["A", "B", "C", "D"]), "A, B, C and D");
    }

    // -- merge_keywords -------------------------------------------------------

    #[test]
    fn merges_scalar_and_list_attributes() {
        let subscriber = fields(json!({"first_name": "Ann", "topics": ["A", "B", "C"]}));
        let merged = merge_keywords("Hello <<first_name>>, you follow <<topics>>", &subscriber);
        assert_eq!(merged, "Hello Ann, you follow A, B and C");
    }

    #[test]
    fn replaces_every_occurrence() {
        let subscriber = fields(json!({"first_name": "Ann"}));
        let merged = merge_keywords("<<first_name>>! <<first_name>>?", &subscriber);
        assert_eq!(merged, "Ann! Ann?");
    }

    #[test]
    fn unknown_placeholders_are_left_untouched() {
        let subscriber = fields(json!({"first_name": "Ann"}));
        let merged = merge_keywords("Hi <<first_name>> from <<country>>", &subscriber);
        assert_eq!(merged, "Hi Ann from <<country>>");
    }

    #[test]
    fn booleans_render_as_text() {
        let subscriber = fields(json!({"verified": true}));
        assert_eq!(merge_keywords("v=<<verified>>", &subscriber), "v=true");
    }

    #[test]
    fn substituted_values_are_not_re_expanded() {
        let subscriber = fields(json!({"first_name": "<<last_name>>", "last_name": "Smith"}));
        assert_eq!(merge_keywords("<<first_name>>", &subscriber), "<<last_name>>");
    }

    #[test]
    fn merge_fields_drops_null_attributes() {
        #[derive(serde::Serialize)]
        struct Row {
            first_name: &'static str,
            sms: Option<&'static str>,
        }
        let map = merge_fields(&Row {
            first_name: "Ann",
            sms: None,
        });
        assert!(map.contains_key("first_name"));
        assert!(!map.contains_key("sms"));
        assert_eq!(
            merge_keywords("<<first_name>> <<sms>>", &map),
            "Ann <<sms>>"
        );
    }
}
