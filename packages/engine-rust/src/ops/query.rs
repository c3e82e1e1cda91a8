//! Query-command kinds: count, find, find-and-modify, aggregate, distinct.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use docflow_core::{
    AggregateOptions, CollectionHandle, CountOptions, Document, FindOneAndDeleteOptions,
    FindOneAndReplaceOptions, FindOneAndUpdateOptions, FindOptions, StoreResult, UpdateSpec,
};

use crate::op::{Materialized, Op, Target};
use crate::operation::Operation;
use crate::ops::{materialize_with, CollectionCommand};
use crate::queue::queued_kind;

// ---------------------------------------------------------------------------
// count / estimated-count
// ---------------------------------------------------------------------------

/// Recipe: count the documents matching a filter.
#[derive(Debug, Clone)]
pub struct Count {
    pub target: Target,
    pub filter: Document,
    pub options: CountOptions,
}

impl Count {
    #[must_use]
    pub fn new(collection: impl Into<String>, filter: Document) -> Self {
        Self {
            target: Target::new(collection),
            filter,
            options: CountOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: CountOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for Count {
    type Output = u64;

    fn materialize(&self) -> Materialized<u64> {
        let recipe = self.clone();
        materialize_with(|operation| CountOperation {
            target: recipe.target,
            filter: recipe.filter,
            options: recipe.options,
            operation,
        })
    }
}

/// Live count operation.
pub struct CountOperation {
    pub target: Target,
    pub filter: Document,
    pub options: CountOptions,
    pub operation: Operation<u64>,
}

queued_kind!(CountOperation, "count");

#[async_trait]
impl CollectionCommand for CountOperation {
    const NAME: &'static str = "count";
    type Output = u64;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<u64> {
        self.operation.clone()
    }

    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<u64> {
        collection.count(self.filter, self.options).await
    }
}

/// Recipe: estimate the collection size from metadata.
#[derive(Debug, Clone)]
pub struct EstimatedCount {
    pub target: Target,
}

impl EstimatedCount {
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            target: Target::new(collection),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }
}

impl Op for EstimatedCount {
    type Output = u64;

    fn materialize(&self) -> Materialized<u64> {
        let target = self.target.clone();
        materialize_with(|operation| EstimatedCountOperation { target, operation })
    }
}

/// Live estimated-count operation.
pub struct EstimatedCountOperation {
    pub target: Target,
    pub operation: Operation<u64>,
}

queued_kind!(EstimatedCountOperation, "estimated-count");

#[async_trait]
impl CollectionCommand for EstimatedCountOperation {
    const NAME: &'static str = "estimated-count";
    type Output = u64;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<u64> {
        self.operation.clone()
    }

    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<u64> {
        collection.estimated_count().await
    }
}

// ---------------------------------------------------------------------------
// find-one-and-{delete,replace,update}
// ---------------------------------------------------------------------------

/// Recipe: atomically remove and return one matching document.
#[derive(Debug, Clone)]
pub struct FindOneAndDelete {
    pub target: Target,
    pub filter: Document,
    pub options: FindOneAndDeleteOptions,
}

impl FindOneAndDelete {
    #[must_use]
    pub fn new(collection: impl Into<String>, filter: Document) -> Self {
        Self {
            target: Target::new(collection),
            filter,
            options: FindOneAndDeleteOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: FindOneAndDeleteOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for FindOneAndDelete {
    type Output = Option<Document>;

    fn materialize(&self) -> Materialized<Option<Document>> {
        let recipe = self.clone();
        materialize_with(|operation| FindOneAndDeleteOperation {
            target: recipe.target,
            filter: recipe.filter,
            options: recipe.options,
            operation,
        })
    }
}

/// Live find-one-and-delete operation.
pub struct FindOneAndDeleteOperation {
    pub target: Target,
    pub filter: Document,
    pub options: FindOneAndDeleteOptions,
    pub operation: Operation<Option<Document>>,
}

queued_kind!(FindOneAndDeleteOperation, "find-one-and-delete");

#[async_trait]
impl CollectionCommand for FindOneAndDeleteOperation {
    const NAME: &'static str = "find-one-and-delete";
    type Output = Option<Document>;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<Option<Document>> {
        self.operation.clone()
    }

    async fn execute(
        self,
        collection: Arc<dyn CollectionHandle>,
    ) -> StoreResult<Option<Document>> {
        collection.find_one_and_delete(self.filter, self.options).await
    }
}

/// Recipe: atomically replace one matching document.
#[derive(Debug, Clone)]
pub struct FindOneAndReplace {
    pub target: Target,
    pub filter: Document,
    pub replacement: Document,
    pub options: FindOneAndReplaceOptions,
}

impl FindOneAndReplace {
    #[must_use]
    pub fn new(collection: impl Into<String>, filter: Document, replacement: Document) -> Self {
        Self {
            target: Target::new(collection),
            filter,
            replacement,
            options: FindOneAndReplaceOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: FindOneAndReplaceOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for FindOneAndReplace {
    type Output = Option<Document>;

    fn materialize(&self) -> Materialized<Option<Document>> {
        let recipe = self.clone();
        materialize_with(|operation| FindOneAndReplaceOperation {
            target: recipe.target,
            filter: recipe.filter,
            replacement: recipe.replacement,
            options: recipe.options,
            operation,
        })
    }
}

/// Live find-one-and-replace operation.
pub struct FindOneAndReplaceOperation {
    pub target: Target,
    pub filter: Document,
    pub replacement: Document,
    pub options: FindOneAndReplaceOptions,
    pub operation: Operation<Option<Document>>,
}

queued_kind!(FindOneAndReplaceOperation, "find-one-and-replace");

#[async_trait]
impl CollectionCommand for FindOneAndReplaceOperation {
    const NAME: &'static str = "find-one-and-replace";
    type Output = Option<Document>;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<Option<Document>> {
        self.operation.clone()
    }

    async fn execute(
        self,
        collection: Arc<dyn CollectionHandle>,
    ) -> StoreResult<Option<Document>> {
        collection
            .find_one_and_replace(self.filter, self.replacement, self.options)
            .await
    }
}

/// Recipe: atomically update one matching document.
#[derive(Debug, Clone)]
pub struct FindOneAndUpdate {
    pub target: Target,
    pub filter: Document,
    pub update: UpdateSpec,
    pub options: FindOneAndUpdateOptions,
}

impl FindOneAndUpdate {
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
            options: FindOneAndUpdateOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: FindOneAndUpdateOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for FindOneAndUpdate {
    type Output = Option<Document>;

    fn materialize(&self) -> Materialized<Option<Document>> {
        let recipe = self.clone();
        materialize_with(|operation| FindOneAndUpdateOperation {
            target: recipe.target,
            filter: recipe.filter,
            update: recipe.update,
            options: recipe.options,
            operation,
        })
    }
}

/// Live find-one-and-update operation.
pub struct FindOneAndUpdateOperation {
    pub target: Target,
    pub filter: Document,
    pub update: UpdateSpec,
    pub options: FindOneAndUpdateOptions,
    pub operation: Operation<Option<Document>>,
}

queued_kind!(FindOneAndUpdateOperation, "find-one-and-update");

#[async_trait]
impl CollectionCommand for FindOneAndUpdateOperation {
    const NAME: &'static str = "find-one-and-update";
    type Output = Option<Document>;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<Option<Document>> {
        self.operation.clone()
    }

    async fn execute(
        self,
        collection: Arc<dyn CollectionHandle>,
    ) -> StoreResult<Option<Document>> {
        collection
            .find_one_and_update(self.filter, self.update, self.options)
            .await
    }
}

// ---------------------------------------------------------------------------
// find / aggregate / distinct
// ---------------------------------------------------------------------------

/// Recipe: return the documents matching a filter.
#[derive(Debug, Clone)]
pub struct Find {
    pub target: Target,
    pub filter: Document,
    pub options: FindOptions,
}

impl Find {
    #[must_use]
    pub fn new(collection: impl Into<String>, filter: Document) -> Self {
        Self {
            target: Target::new(collection),
            filter,
            options: FindOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: FindOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for Find {
    type Output = Vec<Document>;

    fn materialize(&self) -> Materialized<Vec<Document>> {
        let recipe = self.clone();
        materialize_with(|operation| FindOperation {
            target: recipe.target,
            filter: recipe.filter,
            options: recipe.options,
            operation,
        })
    }
}

/// Live find operation.
pub struct FindOperation {
    pub target: Target,
    pub filter: Document,
    pub options: FindOptions,
    pub operation: Operation<Vec<Document>>,
}

queued_kind!(FindOperation, "find");

#[async_trait]
impl CollectionCommand for FindOperation {
    const NAME: &'static str = "find";
    type Output = Vec<Document>;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<Vec<Document>> {
        self.operation.clone()
    }

    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<Vec<Document>> {
        collection.find(self.filter, self.options).await
    }
}

/// Recipe: run an aggregation pipeline.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub target: Target,
    pub pipeline: Vec<Document>,
    pub options: AggregateOptions,
}

impl Aggregate {
    #[must_use]
    pub fn new(collection: impl Into<String>, pipeline: Vec<Document>) -> Self {
        Self {
            target: Target::new(collection),
            pipeline,
            options: AggregateOptions::default(),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }

    #[must_use]
    pub fn options(mut self, options: AggregateOptions) -> Self {
        self.options = options;
        self
    }
}

impl Op for Aggregate {
    type Output = Vec<Document>;

    fn materialize(&self) -> Materialized<Vec<Document>> {
        let recipe = self.clone();
        materialize_with(|operation| AggregateOperation {
            target: recipe.target,
            pipeline: recipe.pipeline,
            options: recipe.options,
            operation,
        })
    }
}

/// Live aggregate operation.
pub struct AggregateOperation {
    pub target: Target,
    pub pipeline: Vec<Document>,
    pub options: AggregateOptions,
    pub operation: Operation<Vec<Document>>,
}

queued_kind!(AggregateOperation, "aggregate");

#[async_trait]
impl CollectionCommand for AggregateOperation {
    const NAME: &'static str = "aggregate";
    type Output = Vec<Document>;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<Vec<Document>> {
        self.operation.clone()
    }

    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<Vec<Document>> {
        collection.aggregate(self.pipeline, self.options).await
    }
}

/// Recipe: distinct values of a field across matching documents.
#[derive(Debug, Clone)]
pub struct Distinct {
    pub target: Target,
    pub field: String,
    pub filter: Document,
}

impl Distinct {
    #[must_use]
    pub fn new(collection: impl Into<String>, field: impl Into<String>, filter: Document) -> Self {
        Self {
            target: Target::new(collection),
            field: field.into(),
            filter,
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.target = self.target.in_database(database);
        self
    }
}

impl Op for Distinct {
    type Output = Vec<Value>;

    fn materialize(&self) -> Materialized<Vec<Value>> {
        let recipe = self.clone();
        materialize_with(|operation| DistinctOperation {
            target: recipe.target,
            field: recipe.field,
            filter: recipe.filter,
            operation,
        })
    }
}

/// Live distinct operation.
pub struct DistinctOperation {
    pub target: Target,
    pub field: String,
    pub filter: Document,
    pub operation: Operation<Vec<Value>>,
}

queued_kind!(DistinctOperation, "distinct");

#[async_trait]
impl CollectionCommand for DistinctOperation {
    const NAME: &'static str = "distinct";
    type Output = Vec<Value>;

    fn target(&self) -> &Target {
        &self.target
    }

    fn handle(&self) -> Operation<Vec<Value>> {
        self.operation.clone()
    }

    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<Vec<Value>> {
        collection.distinct(&self.field, self.filter).await
    }
}
