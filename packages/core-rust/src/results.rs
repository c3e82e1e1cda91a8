//! Result structs and write directives for the command surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;

/// Result of `delete_one` / `delete_many`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    /// Number of documents removed.
    pub deleted_count: u64,
}

/// Result of `insert_one`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOneResult {
    /// The `_id` of the inserted document (caller-supplied or generated).
    pub inserted_id: Value,
}

/// Result of `insert_many`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertManyResult {
    /// The `_id`s of the inserted documents, in insertion order.
    pub inserted_ids: Vec<Value>,
}

/// Result of `update_one` / `update_many` / `replace_one`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Number of documents the filter matched.
    pub matched_count: u64,
    /// Number of documents actually modified.
    pub modified_count: u64,
    /// The `_id` of the upserted document, when an upsert happened.
    pub upserted_id: Option<Value>,
}

/// Aggregate counts from `bulk_write`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkWriteResult {
    pub inserted_count: u64,
    pub matched_count: u64,
    pub modified_count: u64,
    pub deleted_count: u64,
    pub upserted_count: u64,
}

/// An update payload: either a modifier document or an aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpdateSpec {
    /// A modifier document (`{"$set": {...}, "$inc": {...}}`).
    Document(Document),
    /// A pipeline of update stages.
    Pipeline(Vec<Document>),
}

impl From<Document> for UpdateSpec {
    fn from(doc: Document) -> Self {
        Self::Document(doc)
    }
}

/// A single directive within a `bulk_write` batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteDirective {
    InsertOne {
        document: Document,
    },
    UpdateOne {
        filter: Document,
        update: UpdateSpec,
        upsert: bool,
    },
    UpdateMany {
        filter: Document,
        update: UpdateSpec,
        upsert: bool,
    },
    ReplaceOne {
        filter: Document,
        replacement: Document,
        upsert: bool,
    },
    DeleteOne {
        filter: Document,
    },
    DeleteMany {
        filter: Document,
    },
}
