//! Write-command kinds: delete, insert, update, replace, and bulk write.

use std::sync::Arc;

use async_trait::async_trait;

use docflow_core::{
    BulkWriteOptions, BulkWriteResult, CollectionHandle, DeleteOptions, DeleteResult, Document,
    InsertManyOptions, InsertManyResult, InsertOneOptions, InsertOneResult, ReplaceOptions,
    StoreResult, UpdateOptions, UpdateResult, UpdateSpec, WriteDirective,
};

use crate::op::{Materialized, Op, Target};
use crate::operation::Operation;
use crate::ops::{materialize_with, CollectionCommand};
use crate::queue::queued_kind;

// ---------------------------------------------------------------------------
// delete-one / delete-many
// ---------------------------------------------------------------------------

/// Recipe: delete at most one document matching a filter.
#[derive(Debug, Clone)]
pub struct DeleteOne {
    pub target: Target,
    pub filter: Document,
    pub options: DeleteOptions,
}

impl DeleteOne {
    #[must_use]
    pub fn new(collection: impl Into<String>, filter: Document) -> Self {
        Self {
            target: Target::new(collection),
            filter,
            options: DeleteOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: DeleteOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for DeleteOne {
    type Output = DeleteResult;

    fn materialize(&self) -> Materialized<DeleteResult> {
        let recipe = self.clone();
        materialize_with(|operation| DeleteOneOperation {
            target: recipe.target,
            filter: recipe.filter,
            options: recipe.options,
            operation,
        })
    }
}

/// Live delete-one operation.
pub struct DeleteOneOperation {
    pub target: Target,
    pub filter: Document,
    pub options: DeleteOptions,
    pub operation: Operation<DeleteResult>,
}

queued_kind!(DeleteOneOperation, "delete-one");

#[async_trait]
impl CollectionCommand for DeleteOneOperation {
    const NAME: &'static str = "delete-one";
    type Output = DeleteResult;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<DeleteResult> {
        self.operation.clone()
    }

    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<DeleteResult> {
        collection.delete_one(self.filter, self.options).await
    }
}

/// Recipe: delete every document matching a filter.
#[derive(Debug, Clone)]
pub struct DeleteMany {
    pub target: Target,
    pub filter: Document,
    pub options: DeleteOptions,
}

impl DeleteMany {
    #[must_use]
    pub fn new(collection: impl Into<String>, filter: Document) -> Self {
        Self {
            target: Target::new(collection),
            filter,
            options: DeleteOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: DeleteOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for DeleteMany {
    type Output = DeleteResult;

    fn materialize(&self) -> Materialized<DeleteResult> {
        let recipe = self.clone();
        materialize_with(|operation| DeleteManyOperation {
            target: recipe.target,
            filter: recipe.filter,
            options: recipe.options,
            operation,
        })
    }
}

/// Live delete-many operation.
pub struct DeleteManyOperation {
    pub target: Target,
    pub filter: Document,
    pub options: DeleteOptions,
    pub operation: Operation<DeleteResult>,
}

queued_kind!(DeleteManyOperation, "delete-many");

#[async_trait]
impl CollectionCommand for DeleteManyOperation {
    const NAME: &'static str = "delete-many";
    type Output = DeleteResult;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<DeleteResult> {
        self.operation.clone()
    }

    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<DeleteResult> {
        collection.delete_many(self.filter, self.options).await
    }
}

// ---------------------------------------------------------------------------
// insert-one / insert-many
// ---------------------------------------------------------------------------

/// Recipe: insert one document.
#[derive(Debug, Clone)]
pub struct InsertOne {
    pub target: Target,
    pub document: Document,
    pub options: InsertOneOptions,
}

impl InsertOne {
    #[must_use]
    pub fn new(collection: impl Into<String>, document: Document) -> Self {
        Self {
            target: Target::new(collection),
            document,
            options: InsertOneOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: InsertOneOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for InsertOne {
    type Output = InsertOneResult;

    fn materialize(&self) -> Materialized<InsertOneResult> {
        let recipe = self.clone();
        materialize_with(|operation| InsertOneOperation {
            target: recipe.target,
            document: recipe.document,
            options: recipe.options,
            operation,
        })
    }
}

/// Live insert-one operation.
pub struct InsertOneOperation {
    pub target: Target,
    pub document: Document,
    pub options: InsertOneOptions,
    pub operation: Operation<InsertOneResult>,
}

queued_kind!(InsertOneOperation, "insert-one");

#[async_trait]
impl CollectionCommand for InsertOneOperation {
    const NAME: &'static str = "insert-one";
    type Output = InsertOneResult;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<InsertOneResult> {
        self.operation.clone()
    }

    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<InsertOneResult> {
        collection.insert_one(self.document, self.options).await
    }
}

/// Recipe: insert a batch of documents.
#[derive(Debug, Clone)]
pub struct InsertMany {
    pub target: Target,
    pub documents: Vec<Document>,
    pub options: InsertManyOptions,
}

impl InsertMany {
    #[must_use]
    pub fn new(collection: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            target: Target::new(collection),
            documents,
            options: InsertManyOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: InsertManyOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for InsertMany {
    type Output = InsertManyResult;

    fn materialize(&self) -> Materialized<InsertManyResult> {
        let recipe = self.clone();
        materialize_with(|operation| InsertManyOperation {
            target: recipe.target,
            documents: recipe.documents,
            options: recipe.options,
            operation,
        })
    }
}

/// Live insert-many operation.
pub struct InsertManyOperation {
    pub target: Target,
    pub documents: Vec<Document>,
    pub options: InsertManyOptions,
    pub operation: Operation<InsertManyResult>,
}

queued_kind!(InsertManyOperation, "insert-many");

#[async_trait]
impl CollectionCommand for InsertManyOperation {
    const NAME: &'static str = "insert-many";
    type Output = InsertManyResult;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<InsertManyResult> {
        self.operation.clone()
    }

    async fn execute(
        self,
        collection: Arc<dyn CollectionHandle>,
    ) -> StoreResult<InsertManyResult> {
        collection.insert_many(self.documents, self.options).await
    }
}

// ---------------------------------------------------------------------------
// update-one / update-many / replace-one
// ---------------------------------------------------------------------------

/// Recipe: apply an update to at most one matching document.
#[derive(Debug, Clone)]
pub struct UpdateOne {
    pub target: Target,
    pub filter: Document,
    pub update: UpdateSpec,
    pub options: UpdateOptions,
}

impl UpdateOne {
    #[must_use]
    pub fn new(
        collection: impl Into<String>,
        filter: Document,
        update: impl Into<UpdateSpec>,
    ) -> Self {
        Self {
            target: Target::new(collection),
            filter,
            update: update.into(),
            options: UpdateOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: UpdateOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for UpdateOne {
    type Output = UpdateResult;

    fn materialize(&self) -> Materialized<UpdateResult> {
        let recipe = self.clone();
        materialize_with(|operation| UpdateOneOperation {
            target: recipe.target,
            filter: recipe.filter,
            update: recipe.update,
            options: recipe.options,
            operation,
        })
    }
}

/// Live update-one operation.
pub struct UpdateOneOperation {
    pub target: Target,
    pub filter: Document,
    pub update: UpdateSpec,
    pub options: UpdateOptions,
    pub operation: Operation<UpdateResult>,
}

queued_kind!(UpdateOneOperation, "update-one");

#[async_trait]
impl CollectionCommand for UpdateOneOperation {
    const NAME: &'static str = "update-one";
    type Output = UpdateResult;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<UpdateResult> {
        self.operation.clone()
    }

    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<UpdateResult> {
        collection
            .update_one(self.filter, self.update, self.options)
            .await
    }
}

/// Recipe: apply an update to every matching document.
#[derive(Debug, Clone)]
pub struct UpdateMany {
    pub target: Target,
    pub filter: Document,
    pub update: UpdateSpec,
    pub options: UpdateOptions,
}

impl UpdateMany {
    #[must_use]
    pub fn new(
        collection: impl Into<String>,
        filter: Document,
        update: impl Into<UpdateSpec>,
    ) -> Self {
        Self {
            target: Target::new(collection),
            filter,
            update: update.into(),
            options: UpdateOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: UpdateOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for UpdateMany {
    type Output = UpdateResult;

    fn materialize(&self) -> Materialized<UpdateResult> {
        let recipe = self.clone();
        materialize_with(|operation| UpdateManyOperation {
            target: recipe.target,
            filter: recipe.filter,
            update: recipe.update,
            options: recipe.options,
            operation,
        })
    }
}

/// Live update-many operation.
pub struct UpdateManyOperation {
    pub target: Target,
    pub filter: Document,
    pub update: UpdateSpec,
    pub options: UpdateOptions,
    pub operation: Operation<UpdateResult>,
}

queued_kind!(UpdateManyOperation, "update-many");

#[async_trait]
impl CollectionCommand for UpdateManyOperation {
    const NAME: &'static str = "update-many";
    type Output = UpdateResult;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<UpdateResult> {
        self.operation.clone()
    }

    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<UpdateResult> {
        collection
            .update_many(self.filter, self.update, self.options)
            .await
    }
}

/// Recipe: replace at most one matching document.
#[derive(Debug, Clone)]
pub struct ReplaceOne {
    pub target: Target,
    pub filter: Document,
    pub replacement: Document,
    pub options: ReplaceOptions,
}

impl ReplaceOne {
    #[must_use]
    pub fn new(collection: impl Into<String>, filter: Document, replacement: Document) -> Self {
        Self {
            target: Target::new(collection),
            filter,
            replacement,
            options: ReplaceOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: ReplaceOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for ReplaceOne {
    type Output = UpdateResult;

    fn materialize(&self) -> Materialized<UpdateResult> {
        let recipe = self.clone();
        materialize_with(|operation| ReplaceOneOperation {
            target: recipe.target,
            filter: recipe.filter,
            replacement: recipe.replacement,
            options: recipe.options,
            operation,
        })
    }
}

/// Live replace-one operation.
pub struct ReplaceOneOperation {
    pub target: Target,
    pub filter: Document,
    pub replacement: Document,
    pub options: ReplaceOptions,
    pub operation: Operation<UpdateResult>,
}

queued_kind!(ReplaceOneOperation, "replace-one");

#[async_trait]
impl CollectionCommand for ReplaceOneOperation {
    const NAME: &'static str = "replace-one";
    type Output = UpdateResult;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<UpdateResult> {
        self.operation.clone()
    }

    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<UpdateResult> {
        collection
            .replace_one(self.filter, self.replacement, self.options)
            .await
    }
}

// ---------------------------------------------------------------------------
// bulk-write
// ---------------------------------------------------------------------------

/// Recipe: run a batch of write directives.
#[derive(Debug, Clone)]
pub struct BulkWrite {
    pub target: Target,
    pub directives: Vec<WriteDirective>,
    pub options: BulkWriteOptions,
}

impl BulkWrite {
    #[must_use]
    pub fn new(collection: impl Into<String>, directives: Vec<WriteDirective>) -> Self {
        Self {
            target: Target::new(collection),
            directives,
            options: BulkWriteOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: BulkWriteOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for BulkWrite {
    type Output = BulkWriteResult;

    fn materialize(&self) -> Materialized<BulkWriteResult> {
        let recipe = self.clone();
        materialize_with(|operation| BulkWriteOperation {
            target: recipe.target,
            directives: recipe.directives,
            options: recipe.options,
            operation,
        })
    }
}

/// Live bulk-write operation.
pub struct BulkWriteOperation {
    pub target: Target,
    pub directives: Vec<WriteDirective>,
    pub options: BulkWriteOptions,
    pub operation: Operation<BulkWriteResult>,
}

queued_kind!(BulkWriteOperation, "bulk-write");

#[async_trait]
impl CollectionCommand for BulkWriteOperation {
    const NAME: &'static str = "bulk-write";
    type Output = BulkWriteResult;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<BulkWriteResult> {
        self.operation.clone()
    }

    async fn execute(
        self,
        collection: Arc<dyn CollectionHandle>,
    ) -> StoreResult<BulkWriteResult> {
        collection.bulk_write(self.directives, self.options).await
    }
}

#[cfg(test)]
mod tests {
    use docflow_core::doc;

    use super::*;

    #[test]
    fn materializing_twice_yields_independent_operations() {
        let op = InsertOne::new("users", doc! { "x": 1 });
        let first = op.materialize();
        let second = op.materialize();

        first.operation.complete(InsertOneResult {
            inserted_id: serde_json::Value::from("a"),
        });
        assert!(first.operation.is_settled());
        assert!(!second.operation.is_settled());
    }

    #[test]
    fn kind_names_are_stable() {
        let m = DeleteMany::new("users", doc! {}).materialize();
        assert_eq!(m.pending.kind_name(), "delete-many");
        let m = BulkWrite::new("users", Vec::new()).materialize();
        assert_eq!(m.pending.kind_name(), "bulk-write");
    }

    #[test]
    fn builder_pins_database() {
        let op = UpdateOne::new("users", doc! {}, doc! { "$set": { "x": 1 } }).database("crm");
        assert_eq!(op.target.database.as_deref(), Some("crm"));
    }
}
