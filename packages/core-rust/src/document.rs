//! Document payload type and construction helpers.
//!
//! A [`Document`] is an ordered string-keyed map of JSON-compatible values.
//! The engine treats documents as opaque payloads; encoding domain objects
//! into them (and decoding results back) belongs to the codec layer, not
//! this crate.

use serde_json::Value;

/// Structured document payload: a string-keyed map of JSON-compatible values.
///
/// Filters, update specifications, pipeline stages, and stored records all
/// share this shape.
pub type Document = serde_json::Map<String, Value>;

/// Builds a [`Document`] with `serde_json::json!` object syntax.
///
/// ```
/// use docflow_core::doc;
///
/// let filter = doc! { "x": 1, "tags": ["a", "b"] };
/// assert_eq!(filter["x"], 1);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($body:tt)+) => {
        match ::serde_json::json!({ $($body)+ }) {
            ::serde_json::Value::Object(map) => map,
            // json!({ ... }) always yields Value::Object.
            _ => unreachable!(),
        }
    };
}

/// Converts a JSON value into a [`Document`], if it is an object.
#[must_use]
pub fn as_document(value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
