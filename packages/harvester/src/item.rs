//! Tolerant access to native figshare JSON records.
//!
//! figshare records are loosely typed: fields may be missing, `null`, or of an
//! unexpected type. Every accessor here returns an absence marker instead of
//! failing, so crosswalks can treat odd input as "field absent".

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One upstream record, as returned by the search or article endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeItem(Map<String, Value>);

impl NativeItem {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value; `None` unless it is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Upstream numeric id.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        field_u64(&self.0, "id")
    }

    /// Whether the key is present with a non-null value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_null())
    }

    /// Non-empty string field.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        field_text(&self.0, key)
    }

    /// Non-empty string field inside a nested object.
    #[must_use]
    pub fn nested_text(&self, object: &str, key: &str) -> Option<&str> {
        self.object(object).and_then(|o| field_text(o, key))
    }

    /// Boolean field; absent or non-boolean reads as `false`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        field_flag(&self.0, key)
    }

    #[must_use]
    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Array field; absent or non-array reads as empty.
    #[must_use]
    pub fn list(&self, key: &str) -> &[Value] {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Compact JSON serialization of the whole record.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }
}

impl From<Map<String, Value>> for NativeItem {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Non-empty string value of `key`.
pub fn field_text<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Unsigned integer value of `key`.
pub fn field_u64(fields: &Map<String, Value>, key: &str) -> Option<u64> {
    fields.get(key).and_then(Value::as_u64)
}

/// Boolean value of `key`, `false` when absent.
pub fn field_flag(fields: &Map<String, Value>, key: &str) -> bool {
    fields.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Render a scalar JSON value as text: strings verbatim, `null` as empty.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
