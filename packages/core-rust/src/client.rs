//! The store command surface: client, database, and collection traits.
//!
//! These traits are the seam between the dispatch engine and whatever store
//! actually executes commands. Implementations are shared as `Arc<dyn _>`
//! and must be freely usable from concurrent tasks; a single command's
//! atomicity is whatever the backing store provides for that command.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::document::Document;
use crate::error::StoreResult;
use crate::options::{
    AggregateOptions, BulkWriteOptions, CountOptions, DeleteOptions, FindOneAndDeleteOptions,
    FindOneAndReplaceOptions, FindOneAndUpdateOptions, FindOptions, InsertManyOptions,
    InsertOneOptions, ReplaceOptions, UpdateOptions,
};
use crate::results::{
    BulkWriteResult, DeleteResult, InsertManyResult, InsertOneResult, UpdateResult, UpdateSpec,
    WriteDirective,
};

/// Entry point to a remote document store.
///
/// Handle creation is cheap and performs no I/O; the store is only touched
/// when a command runs.
pub trait StoreClient: Send + Sync {
    /// Returns a handle to the named database.
    fn database(&self, name: &str) -> Arc<dyn DatabaseHandle>;
}

/// Handle to one database within a store.
#[async_trait]
pub trait DatabaseHandle: Send + Sync {
    /// The database name.
    fn name(&self) -> &str;

    /// Opens a handle to the named collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be opened.
    async fn collection(&self, name: &str) -> StoreResult<Arc<dyn CollectionHandle>>;

    /// Runs a raw database-level command and returns its reply document.
    async fn run_command(&self, command: Document) -> StoreResult<Document>;

    /// Lists the names of the collections in this database.
    async fn list_collection_names(&self) -> StoreResult<Vec<String>>;
}

/// Handle to one collection, exposing the full fixed command set the engine
/// forwards: the payload/options/result shapes mirror the remote commands
/// one to one.
#[async_trait]
pub trait CollectionHandle: Send + Sync {
    /// The collection name.
    fn name(&self) -> &str;

    /// Deletes at most one document matching `filter`.
    async fn delete_one(&self, filter: Document, options: DeleteOptions)
        -> StoreResult<DeleteResult>;

    /// Deletes every document matching `filter`.
    async fn delete_many(
        &self,
        filter: Document,
        options: DeleteOptions,
    ) -> StoreResult<DeleteResult>;

    /// Inserts one document, returning its `_id`.
    async fn insert_one(
        &self,
        document: Document,
        options: InsertOneOptions,
    ) -> StoreResult<InsertOneResult>;

    /// Inserts a batch of documents, returning their `_id`s in order.
    async fn insert_many(
        &self,
        documents: Vec<Document>,
        options: InsertManyOptions,
    ) -> StoreResult<InsertManyResult>;

    /// Applies `update` to at most one document matching `filter`.
    async fn update_one(
        &self,
        filter: Document,
        update: UpdateSpec,
        options: UpdateOptions,
    ) -> StoreResult<UpdateResult>;

    /// Applies `update` to every document matching `filter`.
    async fn update_many(
        &self,
        filter: Document,
        update: UpdateSpec,
        options: UpdateOptions,
    ) -> StoreResult<UpdateResult>;

    /// Replaces at most one document matching `filter` with `replacement`.
    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        options: ReplaceOptions,
    ) -> StoreResult<UpdateResult>;

    /// Executes a batch of write directives.
    async fn bulk_write(
        &self,
        directives: Vec<WriteDirective>,
        options: BulkWriteOptions,
    ) -> StoreResult<BulkWriteResult>;

    /// Counts the documents matching `filter`.
    async fn count(&self, filter: Document, options: CountOptions) -> StoreResult<u64>;

    /// Returns an estimate of the collection size from metadata, without a
    /// filter scan.
    async fn estimated_count(&self) -> StoreResult<u64>;

    /// Atomically removes and returns one document matching `filter`, or
    /// `None` if nothing matched.
    async fn find_one_and_delete(
        &self,
        filter: Document,
        options: FindOneAndDeleteOptions,
    ) -> StoreResult<Option<Document>>;

    /// Atomically replaces one document matching `filter`, returning the
    /// pre- or post-image per the options.
    async fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        options: FindOneAndReplaceOptions,
    ) -> StoreResult<Option<Document>>;

    /// Atomically updates one document matching `filter`, returning the
    /// pre- or post-image per the options.
    async fn find_one_and_update(
        &self,
        filter: Document,
        update: UpdateSpec,
        options: FindOneAndUpdateOptions,
    ) -> StoreResult<Option<Document>>;

    /// Returns the documents matching `filter`, honoring sort/limit/skip/
    /// projection options.
    async fn find(&self, filter: Document, options: FindOptions) -> StoreResult<Vec<Document>>;

    /// Runs an aggregation pipeline.
    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: AggregateOptions,
    ) -> StoreResult<Vec<Document>>;

    /// Returns the distinct values of `field` across documents matching
    /// `filter`.
    async fn distinct(&self, field: &str, filter: Document) -> StoreResult<Vec<Value>>;
}
