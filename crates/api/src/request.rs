//! Lenient field decoders for gateway request bodies.
//!
//! Callers send list fields either as a JSON array or as a single string,
//! and booleans either as JSON booleans or as `"true"`/`"True"`.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// `"a"` or `["a", "b"]` as a list.
pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    OneOrMany::deserialize(deserializer).map(Into::into)
}

/// [`one_or_many`] for an optional field.
pub fn opt_one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(Into::into))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolLike {
    Bool(bool),
    Text(String),
}

/// `true` or `"true"` (any case) as `true`; anything else as `false`.
pub fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match BoolLike::deserialize(deserializer)? {
        BoolLike::Bool(b) => b,
        BoolLike::Text(s) => s.trim().eq_ignore_ascii_case("true"),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "one_or_many")]
        topics: Vec<String>,
        #[serde(default, deserialize_with = "opt_one_or_many")]
        medium: Option<Vec<String>>,
        #[serde(default, deserialize_with = "flexible_bool")]
        verified: bool,
    }

    #[test]
    fn single_string_becomes_list() {
        let sample: Sample = serde_json::from_value(json!({"topics": "a", "medium": "sms"})).unwrap();
        assert_eq!(sample.topics, vec!["a"]);
        assert_eq!(sample.medium, Some(vec!["sms".to_string()]));
        assert!(!sample.verified);
    }

    #[test]
    fn string_booleans_are_accepted() {
        for value in [json!(true), json!("true"), json!("True")] {
            let sample: Sample = serde_json::from_value(json!({"topics": [], "verified": value})).unwrap();
            assert!(sample.verified);
        }
        let sample: Sample = serde_json::from_value(json!({"topics": [], "verified": "no"})).unwrap();
        assert!(!sample.verified);
    }
}
