use std::borrow::Cow;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// A uniquely identified record inside a collection.
///
/// Serializes as one flat JSON object: the metadata keys `id`, `createdAt`
/// and `updatedAt` sit next to the data fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Document {
    pub(crate) fn new(id: &str, data: Map<String, Value>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            created_at,
            updated_at: created_at,
            data,
        }
    }

    /// Resolves a dotted field path (`"profile.city"`, `"tags.0"`).
    ///
    /// The single-segment paths `id`, `createdAt` and `updatedAt` resolve to
    /// the document metadata; timestamps come back as RFC 3339 strings.
    pub fn field(&self, path: &str) -> Option<Cow<'_, Value>> {
        match path {
            ID_FIELD => return Some(Cow::Owned(Value::String(self.id.clone()))),
            CREATED_AT_FIELD => return Some(Cow::Owned(timestamp_value(&self.created_at))),
            UPDATED_AT_FIELD => return Some(Cow::Owned(timestamp_value(&self.updated_at))),
            _ => {}
        }
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.data.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(Cow::Borrowed(current))
    }

    /// Index key of the value at `path`, `None` when the path does not resolve.
    pub fn field_key(&self, path: &str) -> Option<IndexKey> {
        self.field(path).map(|value| IndexKey::from_value(&value))
    }

    /// Flat JSON rendering, metadata included.
    pub fn to_value(&self) -> Value {
        let mut map = self.data.clone();
        map.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        map.insert(CREATED_AT_FIELD.to_string(), timestamp_value(&self.created_at));
        map.insert(UPDATED_AT_FIELD.to_string(), timestamp_value(&self.updated_at));
        Value::Object(map)
    }
}

/// Hashable equality key for field values.
///
/// Both indexed lookups and scans compare values through this key, so the
/// two paths always agree. Numbers compare numerically (`2 == 2.0`,
/// `-0.0 == 0.0`); objects compare structurally regardless of key order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Null,
    Bool(bool),
    Number(u64),
    Text(String),
    List(Vec<IndexKey>),
    Object(Vec<(String, IndexKey)>),
}

impl IndexKey {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Number(n) => {
                let f = n.as_f64().unwrap_or(0.0);
                // collapse -0.0 onto 0.0
                let f = if f == 0.0 { 0.0 } else { f };
                IndexKey::Number(f.to_bits())
            }
            Value::String(s) => IndexKey::Text(s.clone()),
            Value::Array(items) => IndexKey::List(items.iter().map(IndexKey::from_value).collect()),
            Value::Object(map) => {
                let mut entries: Vec<(String, IndexKey)> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), IndexKey::from_value(v)))
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                IndexKey::Object(entries)
            }
        }
    }
}

/// Equality used by every field comparison in the store.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    IndexKey::from_value(a) == IndexKey::from_value(b)
}

/// True when the field at `path` exists and equals `value`.
pub fn field_matches(doc: &Document, path: &str, value: &Value) -> bool {
    doc.field(path)
        .map(|found| values_equal(&found, value))
        .unwrap_or(false)
}

/// Extracts the data fields of a write payload.
///
/// Non-object payloads carry no fields. Metadata keys are owned by the store
/// and dropped.
pub(crate) fn payload_fields(data: Value) -> Map<String, Value> {
    match data {
        Value::Object(mut map) => {
            map.remove(ID_FIELD);
            map.remove(CREATED_AT_FIELD);
            map.remove(UPDATED_AT_FIELD);
            map
        }
        _ => Map::new(),
    }
}

/// Current time, strictly after `previous` when one is given.
pub(crate) fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
        _ => now,
    }
}

fn timestamp_value(ts: &DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(data: Value) -> Document {
        Document::new("d1", payload_fields(data), Utc::now())
    }

    #[test]
    fn test_field_resolves_nested_paths() {
        let d = doc(json!({ "profile": { "city": "Oslo", "tags": ["a", "b"] } }));
        assert_eq!(d.field("profile.city").as_deref(), Some(&json!("Oslo")));
        assert_eq!(d.field("profile.tags.1").as_deref(), Some(&json!("b")));
        assert!(d.field("profile.zip").is_none());
        assert!(d.field("profile.city.deeper").is_none());
    }

    #[test]
    fn test_field_exposes_metadata() {
        let d = doc(json!({ "id": "ignored", "name": "A" }));
        assert_eq!(d.field("id").as_deref(), Some(&json!("d1")));
        assert!(d.field("createdAt").is_some());
        assert!(!d.data.contains_key("id"));
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert!(values_equal(&json!(2), &json!(2.0)));
        assert!(values_equal(&json!(-0.0), &json!(0)));
        assert!(!values_equal(&json!(2), &json!("2")));
        assert!(values_equal(&json!({"a": 1, "b": [1.0]}), &json!({"b": [1], "a": 1.0})));
    }

    #[test]
    fn test_missing_field_never_matches_null() {
        let d = doc(json!({ "present": null }));
        assert!(field_matches(&d, "present", &Value::Null));
        assert!(!field_matches(&d, "absent", &Value::Null));
    }

    #[test]
    fn test_next_timestamp_is_strictly_increasing() {
        let first = next_timestamp(None);
        let far_future = first + chrono::Duration::days(1);
        let bumped = next_timestamp(Some(far_future));
        assert!(bumped > far_future);
    }

    #[test]
    fn test_document_serializes_flat() {
        let d = doc(json!({ "name": "A" }));
        let value = serde_json::to_value(&d).expect("serialize");
        assert_eq!(value["id"], json!("d1"));
        assert_eq!(value["name"], json!("A"));
        assert!(value.get("createdAt").is_some());
        let back: Document = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, d);
    }
}
