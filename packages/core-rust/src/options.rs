//! Per-command options structs with documented defaults.
//!
//! Every command on [`CollectionHandle`](crate::CollectionHandle) takes one
//! of these; `Default` gives the documented default behavior in each case.

use serde::{Deserialize, Serialize};

use crate::document::Document;

/// Options for `delete_one` / `delete_many`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Collation document forwarded verbatim to the store.
    pub collation: Option<Document>,
    /// Index hint forwarded verbatim to the store.
    pub hint: Option<Document>,
}

/// Options for `insert_one`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsertOneOptions {
    /// Skip server-side document validation. Default: store decides (off).
    pub bypass_document_validation: Option<bool>,
}

/// Options for `insert_many`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertManyOptions {
    /// Stop at the first failing insert when `true`. Default: `true`.
    pub ordered: bool,
}

impl Default for InsertManyOptions {
    fn default() -> Self {
        Self { ordered: true }
    }
}

/// Options for `update_one` / `update_many`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Insert a new document when the filter matches nothing. Default: `false`.
    pub upsert: bool,
    /// Array filters forwarded verbatim to the store.
    pub array_filters: Option<Vec<Document>>,
}

/// Options for `replace_one`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaceOptions {
    /// Insert the replacement when the filter matches nothing. Default: `false`.
    pub upsert: bool,
}

/// Options for `bulk_write`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkWriteOptions {
    /// Stop at the first failing directive when `true`. Default: `true`.
    pub ordered: bool,
}

impl Default for BulkWriteOptions {
    fn default() -> Self {
        Self { ordered: true }
    }
}

/// Options for `count`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountOptions {
    /// Maximum number of documents to count.
    pub limit: Option<u64>,
    /// Number of matching documents to skip before counting.
    pub skip: Option<u64>,
}

/// Which version of the document a find-and-modify command returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnDocument {
    /// Return the document as it was before the modification. Default.
    #[default]
    Before,
    /// Return the document as it is after the modification.
    After,
}

/// Options for `find_one_and_delete`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindOneAndDeleteOptions {
    /// Sort order used to pick the document when several match.
    pub sort: Option<Document>,
}

/// Options for `find_one_and_replace`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindOneAndReplaceOptions {
    /// Sort order used to pick the document when several match.
    pub sort: Option<Document>,
    /// Which version of the document to return. Default: [`ReturnDocument::Before`].
    pub return_document: ReturnDocument,
    /// Insert the replacement when the filter matches nothing. Default: `false`.
    pub upsert: bool,
}

/// Options for `find_one_and_update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindOneAndUpdateOptions {
    /// Sort order used to pick the document when several match.
    pub sort: Option<Document>,
    /// Which version of the document to return. Default: [`ReturnDocument::Before`].
    pub return_document: ReturnDocument,
    /// Insert a new document when the filter matches nothing. Default: `false`.
    pub upsert: bool,
}

/// Options for `find`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindOptions {
    /// Sort order document (`{field: 1 | -1}`).
    pub sort: Option<Document>,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
    /// Number of matching documents to skip.
    pub skip: Option<u64>,
    /// Projection document (`{field: 1}` includes, `{field: 0}` excludes).
    pub projection: Option<Document>,
}

/// Options for `aggregate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateOptions {
    /// Let the store spill pipeline stages to disk. Default: store decides.
    pub allow_disk_use: Option<bool>,
}
