//! Text codec for the backing file.
//!
//! The on-disk format is a flat alternating sequence of
//! `key, encoded-value, key, encoded-value, ...` joined by newlines, with
//! no header or length prefix. Each encoded value carries a one-character
//! type tag:
//!
//! | tag | shape  | payload                                        |
//! |-----|--------|------------------------------------------------|
//! | `t` | bool   | true                                           |
//! | `f` | bool   | false                                          |
//! | `"` | string | text, literal newlines escaped as `\` + newline |
//! | `n` | null   |                                                |
//! | `u` | absent |                                                |
//! | `o` | object | compact JSON                                   |
//! |     | number | bare decimal text (default case)               |
//!
//! A newline preceded by an odd number of backslashes is escaped string
//! data, not a record separator.

use std::collections::BTreeMap;

use itertools::Itertools as _;

use crate::error::{Error, Result};
use crate::value::Value;

/// The in-memory mirror of the backing file.
pub type StateMap = BTreeMap<String, Value>;

/// Encode the whole mapping to the on-disk text form.
pub fn encode(state: &StateMap) -> String {
    let mut parts = Vec::with_capacity(state.len() * 2);
    for (key, value) in state {
        parts.push(key.clone());
        parts.push(encode_value(value));
    }
    parts.join("\n")
}

/// Decode an entire backing-file blob into a mapping.
///
/// A trailing key with no value segment is ignored. Malformed JSON after
/// an `o` tag and unparseable number segments fail the whole load.
pub fn decode(input: &str) -> Result<StateMap> {
    let mut state = StateMap::new();
    if input.is_empty() {
        return Ok(state);
    }
    for (key, raw) in split_records(input).into_iter().tuples() {
        state.insert(key.to_string(), decode_value(raw)?);
    }
    Ok(state)
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "t".to_string(),
        Value::Bool(false) => "f".to_string(),
        Value::Str(s) => format!("\"{}", s.replace('\n', "\\\n")),
        Value::Null => "n".to_string(),
        Value::Absent => "u".to_string(),
        Value::Object(obj) => format!("o{}", obj),
        Value::Number(n) => n.to_string(),
    }
}

fn decode_value(raw: &str) -> Result<Value> {
    match raw.as_bytes().first() {
        Some(b't') => Ok(Value::Bool(true)),
        Some(b'f') => Ok(Value::Bool(false)),
        Some(b'n') => Ok(Value::Null),
        Some(b'u') => Ok(Value::Absent),
        Some(b'"') => Ok(Value::Str(raw[1..].replace("\\\n", "\n"))),
        Some(b'o') => serde_json::from_str(&raw[1..])
            .map(Value::Object)
            .map_err(|e| Error::Decode(format!("invalid object payload: {}", e))),
        _ => raw
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| Error::Decode(format!("invalid number literal: {:?}", raw))),
    }
}

/// Split on record separators: newlines preceded by an even number of
/// backslashes. Escaped newlines stay inside their segment.
fn split_records(input: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut backslashes = 0usize;
    for (i, b) in input.bytes().enumerate() {
        match b {
            b'\\' => backslashes += 1,
            b'\n' if backslashes % 2 == 0 => {
                segments.push(&input[start..i]);
                start = i + 1;
                backslashes = 0;
            }
            _ => backslashes = 0,
        }
    }
    segments.push(&input[start..]);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(value: Value) {
        let mut state = StateMap::new();
        state.insert("k".to_string(), value);
        let decoded = decode(&encode(&state)).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_roundtrip_number() {
        roundtrip(Value::Number(42.0));
        roundtrip(Value::Number(-3.25));
        roundtrip(Value::Number(0.0));
    }

    #[test]
    fn test_roundtrip_bool_null_absent() {
        roundtrip(Value::Bool(true));
        roundtrip(Value::Bool(false));
        roundtrip(Value::Null);
        roundtrip(Value::Absent);
    }

    #[test]
    fn test_roundtrip_string() {
        roundtrip(Value::Str("hello world".to_string()));
        roundtrip(Value::Str(String::new()));
        // A string starting with a tag character must not be mistaken
        // for that tag.
        roundtrip(Value::Str("t-shirt".to_string()));
    }

    #[test]
    fn test_roundtrip_string_with_newlines() {
        roundtrip(Value::Str("line one\nline two\nline three".to_string()));
        roundtrip(Value::Str("\n".to_string()));
    }

    #[test]
    fn test_roundtrip_object() {
        roundtrip(Value::Object(json!({"name": "a", "nested": {"n": [1, 2, 3]}})));
        roundtrip(Value::Object(json!([])));
    }

    #[test]
    fn test_roundtrip_multiple_keys() {
        let mut state = StateMap::new();
        state.insert("count".to_string(), Value::Number(42.0));
        state.insert("enabled".to_string(), Value::Bool(true));
        state.insert("note".to_string(), Value::Str("a\nb".to_string()));
        let decoded = decode(&encode(&state)).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_encoded_form() {
        let mut state = StateMap::new();
        state.insert("a".to_string(), Value::Number(1.0));
        state.insert("b".to_string(), Value::Bool(false));
        assert_eq!(encode(&state), "a\n1\nb\nf");
    }

    #[test]
    fn test_string_newline_is_escaped_on_disk() {
        let mut state = StateMap::new();
        state.insert("s".to_string(), Value::Str("x\ny".to_string()));
        assert_eq!(encode(&state), "s\n\"x\\\ny");
    }

    #[test]
    fn test_decode_empty_input() {
        assert_eq!(decode("").unwrap(), StateMap::new());
    }

    #[test]
    fn test_decode_ignores_trailing_incomplete_pair() {
        let decoded = decode("a\n1\ndangling").unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.get("a"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_decode_malformed_object_is_fatal() {
        let result = decode("k\no{not json");
        assert!(matches!(result, Err(crate::Error::Decode(_))));
    }

    #[test]
    fn test_decode_invalid_number_is_fatal() {
        let result = decode("k\nzzz");
        assert!(matches!(result, Err(crate::Error::Decode(_))));
    }
}
