//! Backend document model.
//!
//! The realtime database stores schemaless key-value documents. We represent a
//! document as a [`ciborium::Value`] map with text keys, which keeps the
//! in-memory store and any wire encoding on the same data model.

use ciborium::Value;
use serde::{Serialize, de::DeserializeOwned};

use crate::DocumentError;

/// A schemaless key-value document.
pub type Document = Value;

/// Encode a serializable record as a document.
pub fn encode<T: Serialize>(record: &T) -> Result<Document, DocumentError> {
    Value::serialized(record).map_err(|e| DocumentError::Codec(e.to_string()))
}

/// Decode a document into a record.
pub fn decode<T: DeserializeOwned>(document: &Document) -> Result<T, DocumentError> {
    if !document.is_map() {
        return Err(DocumentError::NotAMap);
    }
    document.deserialized().map_err(|e| DocumentError::Codec(e.to_string()))
}

/// Value of a text-keyed field. `None` if absent or `document` is not a map.
pub fn field<'a>(document: &'a Document, name: &str) -> Option<&'a Value> {
    document.as_map()?.iter().find(|(k, _)| k.as_text() == Some(name)).map(|(_, v)| v)
}

/// Text field. `None` if absent or not text.
pub fn text_field<'a>(document: &'a Document, name: &str) -> Option<&'a str> {
    field(document, name).and_then(Value::as_text)
}

/// Integer field. `None` if absent, not an integer, or out of `i64` range.
pub fn int_field(document: &Document, name: &str) -> Option<i64> {
    field(document, name).and_then(Value::as_integer).and_then(|i| i64::try_from(i).ok())
}

/// Build a map document from text-keyed fields.
pub fn map<I, K>(fields: I) -> Document
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::Map(fields.into_iter().map(|(k, v)| (Value::Text(k.into()), v)).collect())
}

/// Merge `fields` into `target`, overwriting existing keys.
///
/// A non-map target is replaced by an empty map first, matching the
/// update-children semantics of the backend.
pub fn merge(target: &mut Document, fields: Vec<(String, Value)>) {
    if !target.is_map() {
        *target = Value::Map(Vec::new());
    }
    let Value::Map(entries) = target else {
        return;
    };

    for (key, value) in fields {
        match entries.iter_mut().find(|(k, _)| k.as_text() == Some(key.as_str())) {
            Some((_, existing)) => *existing = value,
            None => entries.push((Value::Text(key), value)),
        }
    }
}
