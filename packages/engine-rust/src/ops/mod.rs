//! Built-in operation kinds: one recipe (`Op`) plus one queue entry
//! (`*Operation`) per remote command, grouped into write, query, database,
//! and block modules.

pub mod block;
pub mod database;
pub mod query;
pub mod write;

pub use block::{Block, BlockOperation, DepResult};
pub use database::{ListCollections, ListCollectionsOperation, RunCommand, RunCommandOperation};
pub use query::{
    Aggregate, AggregateOperation, Count, CountOperation, Distinct, DistinctOperation,
    EstimatedCount, EstimatedCountOperation, Find, FindOneAndDelete, FindOneAndDeleteOperation,
    FindOneAndReplace, FindOneAndReplaceOperation, FindOneAndUpdate, FindOneAndUpdateOperation,
    FindOperation,
};
pub use write::{
    BulkWrite, BulkWriteOperation, DeleteMany, DeleteManyOperation, DeleteOne, DeleteOneOperation,
    InsertMany, InsertManyOperation, InsertOne, InsertOneOperation, ReplaceOne,
    ReplaceOneOperation, UpdateMany, UpdateManyOperation, UpdateOne, UpdateOneOperation,
};

use std::sync::Arc;

use async_trait::async_trait;

use docflow_core::{CollectionHandle, DatabaseHandle, StoreResult};

use crate::op::Materialized;
use crate::operation::Operation;
use crate::queue::{PendingOperation, QueuedOperation};

/// A claimed collection-level operation, ready to run against its collection
/// handle. Implemented by every kind in [`write`] and [`query`]; the generic
/// [`CollectionOperator`](crate::operators::CollectionOperator) drives it.
#[async_trait]
pub trait CollectionCommand: QueuedOperation + Sized {
    /// Remote command name (also the queue kind name).
    const NAME: &'static str;

    /// The command's result type.
    type Output: Clone + Send + 'static;

    /// The collection this operation targets.
    fn target(&self) -> &crate::op::Target;

    /// A clone of the result slot.
    fn handle(&self) -> Operation<Self::Output>;

    /// Runs the remote command, consuming the payload.
    async fn execute(self, collection: Arc<dyn CollectionHandle>) -> StoreResult<Self::Output>;
}

/// A claimed database-level operation. Same shape as [`CollectionCommand`]
/// but scoped to a whole database handle.
#[async_trait]
pub trait DatabaseCommand: QueuedOperation + Sized {
    /// Remote command name (also the queue kind name).
    const NAME: &'static str;

    /// The command's result type.
    type Output: Clone + Send + 'static;

    /// The explicit database name, if the operation carries one.
    fn database(&self) -> Option<&str>;

    /// A clone of the result slot.
    fn handle(&self) -> Operation<Self::Output>;

    /// Runs the remote command, consuming the payload.
    async fn execute(self, database: Arc<dyn DatabaseHandle>) -> StoreResult<Self::Output>;
}

/// Allocates a fresh result slot and builds the paired queue entry.
pub(crate) fn materialize_with<T, K>(build: impl FnOnce(Operation<T>) -> K) -> Materialized<T>
where
    T: Clone + Send + 'static,
    K: QueuedOperation,
{
    let operation = Operation::new();
    let pending: PendingOperation = Box::new(build(operation.clone()));
    Materialized { operation, pending }
}
