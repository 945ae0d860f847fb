//! Tagged value payload carried by features and outputs.

use super::Feature;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The runtime payload of a [`Feature`] or an output.
///
/// Exactly one variant is populated. Coercions never panic; a coercion that
/// makes no sense for the variant yields `NaN`, `None`, or an empty string
/// as documented on each method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Real number.
    Number(f64),
    /// Boolean flag.
    Boolean(bool),
    /// Free text or a categorical label.
    Text(String),
    /// Pre-tokenized text.
    Tokens(Vec<String>),
    /// Length of time.
    Duration(Duration),
    /// Wall-clock time of day.
    Time(NaiveTime),
    /// Ordered child features.
    Composite(Vec<Feature>),
    /// Opaque structured payload.
    Object(serde_json::Value),
    /// No value.
    Undefined,
}

impl Value {
    /// Numeric view of the value.
    ///
    /// Numbers map to themselves, booleans to `1.0`/`0.0`, durations to
    /// seconds, times to seconds since midnight, text to its parsed float.
    /// Everything else (and unparsable text) is `NaN`.
    #[must_use]
    pub fn as_number(&self) -> f64 {
        match self {
            Self::Number(x) => *x,
            Self::Boolean(b) => f64::from(u8::from(*b)),
            Self::Duration(d) => d.as_secs_f64(),
            Self::Time(t) => f64::from(t.num_seconds_from_midnight()),
            Self::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
            Self::Object(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
            Self::Object(serde_json::Value::Bool(b)) => f64::from(u8::from(*b)),
            _ => f64::NAN,
        }
    }

    /// String view of the value. Never fails; `Undefined` is the empty string.
    #[must_use]
    pub fn as_string(&self) -> String {
        match self {
            Self::Number(x) => x.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Text(s) => s.clone(),
            Self::Tokens(tokens) => tokens.join(" "),
            Self::Duration(d) => format!("{d:?}"),
            Self::Time(t) => t.to_string(),
            Self::Composite(children) => children
                .iter()
                .map(|f| f.value().as_string())
                .collect::<Vec<_>>()
                .join(" "),
            Self::Object(v) => v.to_string(),
            Self::Undefined => String::new(),
        }
    }

    /// Boolean view: booleans, non-zero numbers and the literals
    /// `"true"`/`"false"`. `None` otherwise.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            Self::Number(x) if !x.is_nan() => Some(*x != 0.0),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Object(serde_json::Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Whitespace tokens of the string view. Pre-tokenized text is returned
    /// as is.
    #[must_use]
    pub fn as_tokens(&self) -> Vec<String> {
        match self {
            Self::Tokens(tokens) => tokens.clone(),
            other => other
                .as_string()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Returns true for `Number` payloads.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Number(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_number_coercions() {
        assert!((Value::Number(2.5).as_number() - 2.5).abs() < 1e-12);
        assert!((Value::Boolean(true).as_number() - 1.0).abs() < 1e-12);
        assert!((Value::Duration(Duration::from_millis(1500)).as_number() - 1.5).abs() < 1e-12);
        let noon = NaiveTime::from_hms_opt(12, 0, 0).expect("valid time");
        assert!((Value::Time(noon).as_number() - 43_200.0).abs() < 1e-12);
        assert!((Value::Text(" 3.25 ".into()).as_number() - 3.25).abs() < 1e-12);
        assert!(Value::Text("red".into()).as_number().is_nan());
        assert!(Value::Undefined.as_number().is_nan());
        assert!((Value::Object(serde_json::json!(4)).as_number() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_as_string_never_fails() {
        assert_eq!(Value::Number(1.0).as_string(), "1");
        assert_eq!(Value::Boolean(false).as_string(), "false");
        assert_eq!(Value::Tokens(vec!["a".into(), "b".into()]).as_string(), "a b");
        assert_eq!(Value::Undefined.as_string(), "");
        assert_eq!(Value::Object(serde_json::json!({"k": 1})).as_string(), r#"{"k":1}"#);
    }

    #[test]
    fn test_as_bool() {
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Number(0.0).as_bool(), Some(false));
        assert_eq!(Value::Text("true".into()).as_bool(), Some(true));
        assert_eq!(Value::Text("maybe".into()).as_bool(), None);
        assert_eq!(Value::Number(f64::NAN).as_bool(), None);
    }

    #[test]
    fn test_as_tokens() {
        assert_eq!(
            Value::Text("  the quick  fox ".into()).as_tokens(),
            vec!["the", "quick", "fox"]
        );
        assert!(Value::Undefined.as_tokens().is_empty());
    }

    #[test]
    fn test_serde_tagged_representation() {
        let json = serde_json::to_string(&Value::Number(2.0)).expect("serializable");
        assert_eq!(json, r#"{"kind":"number","value":2.0}"#);
        let back: Value = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back, Value::Number(2.0));
    }
}
