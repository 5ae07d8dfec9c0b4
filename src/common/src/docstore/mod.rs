//! Document store port.
//!
//! The cleanup job only reads from the document store: whole collections
//! and single documents addressed by id. Documents carry arbitrary field
//! maps, so every field is read through an accessor that distinguishes
//! "absent" from "present with an unexpected shape".

use async_trait::async_trait;
use std::collections::BTreeMap;

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDocumentStore;
pub use memory::InMemoryDocumentStore;

/// A single typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// RFC 3339 timestamp, kept verbatim
    Timestamp(String),
    /// Path of another document
    Reference(String),
    /// Base64 payload, kept verbatim
    Bytes(String),
    GeoPoint { latitude: f64, longitude: f64 },
    Array(Vec<FieldValue>),
    Map(FieldMap),
}

impl FieldValue {
    /// Short name of the variant, used in shape errors and logs
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Integer(_) => "integer",
            FieldValue::Double(_) => "double",
            FieldValue::String(_) => "string",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Reference(_) => "reference",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::GeoPoint { .. } => "geo point",
            FieldValue::Array(_) => "array",
            FieldValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&FieldMap> {
        match self {
            FieldValue::Map(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl From<FieldMap> for FieldValue {
    fn from(fields: FieldMap) -> Self {
        FieldValue::Map(fields)
    }
}

/// A field held a value of a different type than the caller expected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{field}` is {found}, expected {expected}")]
pub struct ShapeError {
    pub field: String,
    pub expected: &'static str,
    pub found: &'static str,
}

/// Named fields of a document or of a nested map value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(BTreeMap<String, FieldValue>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Raw lookup. `Null` is returned as-is.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// String field: `Ok(None)` when absent or null.
    pub fn string(&self, name: &str) -> Result<Option<&str>, ShapeError> {
        self.typed(name, "string", FieldValue::as_str)
    }

    /// Array field: `Ok(None)` when absent or null.
    pub fn array(&self, name: &str) -> Result<Option<&[FieldValue]>, ShapeError> {
        self.typed(name, "array", FieldValue::as_array)
    }

    /// Map field: `Ok(None)` when absent or null.
    pub fn map(&self, name: &str) -> Result<Option<&FieldMap>, ShapeError> {
        self.typed(name, "map", FieldValue::as_map)
    }

    fn typed<'a, T: ?Sized>(
        &'a self,
        name: &str,
        expected: &'static str,
        extract: fn(&'a FieldValue) -> Option<&'a T>,
    ) -> Result<Option<&'a T>, ShapeError> {
        match self.0.get(name) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(value) => extract(value).map(Some).ok_or_else(|| ShapeError {
                field: name.to_string(),
                expected,
                found: value.kind(),
            }),
        }
    }
}

impl FromIterator<(String, FieldValue)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id within its collection
    pub id: String,
    pub fields: FieldMap,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn string(&self, name: &str) -> Result<Option<&str>, ShapeError> {
        self.fields.string(name)
    }

    pub fn array(&self, name: &str) -> Result<Option<&[FieldValue]>, ShapeError> {
        self.fields.array(name)
    }
}

/// Error types that can occur during document store operations
#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("Document store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Document store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode document store response: {0}")]
    Decode(String),

    #[error("Invalid document store configuration: {0}")]
    Config(String),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for document store operations
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

/// Read-only access to a document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document of a collection, in store order.
    async fn list(&self, collection: &str) -> DocumentStoreResult<Vec<Document>>;

    /// One document by id, `None` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> DocumentStoreResult<Option<Document>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Document {
        Document::new(
            "p1",
            FieldMap::new()
                .with("name", "Linen shirt")
                .with("imageUrls", vec!["a.jpg", "b.jpg"])
                .with("price", FieldValue::Integer(4200))
                .with("discontinued", FieldValue::Null),
        )
    }

    #[test]
    fn test_present_field_with_expected_shape() {
        let doc = product();
        assert_eq!(doc.string("name"), Ok(Some("Linen shirt")));
        let urls = doc.array("imageUrls").unwrap().unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].as_str(), Some("a.jpg"));
    }

    #[test]
    fn test_absent_and_null_fields_are_none() {
        let doc = product();
        assert_eq!(doc.string("logoUrl"), Ok(None));
        assert_eq!(doc.array("discontinued"), Ok(None));
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        let doc = product();
        let err = doc.array("price").unwrap_err();
        assert_eq!(err.field, "price");
        assert_eq!(err.expected, "array");
        assert_eq!(err.found, "integer");
        assert_eq!(err.to_string(), "field `price` is integer, expected array");
    }

    #[test]
    fn test_nested_map_lookup() {
        let slide = FieldMap::new().with("imageUrl", "https://x/upload/v1/s.png");
        let doc = Document::new(
            "hero_slider",
            FieldMap::new().with("slides", FieldValue::Array(vec![slide.into()])),
        );

        let slides = doc.array("slides").unwrap().unwrap();
        let first = slides[0].as_map().unwrap();
        assert_eq!(
            first.string("imageUrl"),
            Ok(Some("https://x/upload/v1/s.png"))
        );
    }
}
