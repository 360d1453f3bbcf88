//! The closed set of value shapes the store can hold.

/// A stored value.
///
/// Every entry in the store is one of these six shapes. `Absent` doubles as
/// the result of reading a missing key and as a storable marker: writing it
/// keeps the key around in memory, but after a round trip through the
/// backing file it is indistinguishable from the key never having existed.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer or float, stored as `f64`. Whole-millisecond timestamps
    /// stay exact up to 2^53.
    Number(f64),
    Bool(bool),
    Str(String),
    Null,
    /// Explicitly-cleared marker, collapses with "missing" on reload.
    Absent,
    /// Arbitrary JSON-representable structure.
    Object(serde_json::Value),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(obj: serde_json::Value) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(42i64), Value::Number(42.0));
        assert_eq!(Value::from(2.5f64), Value::Number(2.5));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("hello"), Value::Str("hello".to_string()));
        assert_eq!(Value::from(json!({"a": 1})), Value::Object(json!({"a": 1})));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::Number(7.0));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Number(1.5).as_number(), Some(1.5));
        assert_eq!(Value::Bool(false).as_bool(), Some(false));
        assert_eq!(Value::Str("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Null.as_number(), None);
        assert!(Value::Absent.is_absent());
        assert!(!Value::Null.is_absent());
    }
}
