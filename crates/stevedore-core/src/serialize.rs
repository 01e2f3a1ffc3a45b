//! Deterministic text rendering.
//!
//! Repeated runs on identical input must produce byte-identical output,
//! so test fixtures can assert exact string equality. Keys are sorted
//! ascending within each object, integers carry no trailing `.0`,
//! indentation is fixed, and the document ends without a trailing
//! newline.

use serde::Serialize;
use stevedore_common::constants::JSON_INDENT;
use stevedore_common::error::{Result, StevedoreError};

use crate::value::Value;

/// Renders a document tree as 4-space-indented JSON with sorted keys.
///
/// # Errors
///
/// Returns [`StevedoreError::Serialization`] when the underlying
/// serializer fails.
pub fn to_deterministic_json(value: &Value) -> Result<String> {
    let tree = value.to_json();
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    tree.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Renders a document tree as YAML with sorted keys and no trailing
/// newline.
///
/// # Errors
///
/// Returns [`StevedoreError::Serialization`] when the underlying
/// serializer fails.
pub fn to_deterministic_yaml(value: &Value) -> Result<String> {
    let tree = value.to_yaml();
    let rendered = serde_yaml::to_string(&tree).map_err(|err| StevedoreError::Serialization {
        message: err.to_string(),
    })?;
    Ok(rendered.trim_end_matches('\n').to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueMap;

    fn sample_document() -> Value {
        let mut container = ValueMap::new();
        container.insert("image", Value::from("postgres:9.3"));
        container.insert("cpu", Value::Integer(200));
        let mut doc = ValueMap::new();
        doc.insert("volumes", Value::Sequence(Vec::new()));
        doc.insert("family", Value::from("pythonapp"));
        doc.insert(
            "containerDefinitions",
            Value::Sequence(vec![Value::Mapping(container)]),
        );
        Value::Mapping(doc)
    }

    #[test]
    fn json_keys_sort_ascending_with_fixed_indent() {
        let expected = concat!(
            "{\n",
            "    \"containerDefinitions\": [\n",
            "        {\n",
            "            \"cpu\": 200,\n",
            "            \"image\": \"postgres:9.3\"\n",
            "        }\n",
            "    ],\n",
            "    \"family\": \"pythonapp\",\n",
            "    \"volumes\": []\n",
            "}",
        );
        let rendered = to_deterministic_json(&sample_document()).expect("render");
        assert_eq!(rendered, expected);
    }

    #[test]
    fn json_has_no_trailing_newline() {
        let rendered = to_deterministic_json(&sample_document()).expect("render");
        assert!(!rendered.ends_with('\n'));
    }

    #[test]
    fn json_integers_have_no_fractional_part() {
        let rendered = to_deterministic_json(&Value::Integer(200)).expect("render");
        assert_eq!(rendered, "200");
    }

    #[test]
    fn json_is_idempotent() {
        let doc = sample_document();
        let first = to_deterministic_json(&doc).expect("first render");
        let second = to_deterministic_json(&doc).expect("second render");
        assert_eq!(first, second);
    }

    #[test]
    fn yaml_keys_sort_ascending() {
        let mut map = ValueMap::new();
        map.insert("zebra", Value::Integer(1));
        map.insert("alpha", Value::Integer(2));
        let rendered = to_deterministic_yaml(&Value::Mapping(map)).expect("render");
        assert_eq!(rendered, "alpha: 2\nzebra: 1");
    }

    #[test]
    fn yaml_has_no_trailing_newline() {
        let rendered = to_deterministic_yaml(&Value::from("x")).expect("render");
        assert!(!rendered.ends_with('\n'));
    }
}
