//! Generic operator for collection-level command kinds.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::operator::{Operator, StoreContext};
use crate::ops::CollectionCommand;
use crate::scope::OperatorScope;

/// Claims every pending operation of kind `K` and executes each on its own
/// task: resolve the collection handle (initialized once per orchestrator),
/// run the remote command, and settle the operation's result slot.
///
/// A store failure settles only that operation; sibling operations claimed in
/// the same pass are unaffected, and nothing escapes into the dispatch loop.
pub struct CollectionOperator<K> {
    _kind: PhantomData<fn() -> K>,
}

impl<K> CollectionOperator<K> {
    /// Creates the operator for kind `K`.
    #[must_use]
    pub fn new() -> Self {
        Self { _kind: PhantomData }
    }
}

impl<K> Default for CollectionOperator<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: CollectionCommand + 'static> Operator for CollectionOperator<K> {
    fn name(&self) -> &'static str {
        K::NAME
    }

    async fn apply(&self, scope: &mut OperatorScope<'_>, ctx: &Arc<StoreContext>) {
        for op in scope.accept::<K>() {
            let ctx = Arc::clone(ctx);
            let handle = op.handle();
            let target = op.target().clone();
            tokio::spawn(async move {
                let outcome = match ctx.collection(&target).await {
                    Ok(collection) => op
                        .execute(collection)
                        .await
                        .map_err(|err| EngineError::command(K::NAME, err)),
                    Err(err) => Err(err),
                };
                match outcome {
                    Ok(value) => handle.complete(value),
                    Err(err) => {
                        tracing::debug!(command = K::NAME, error = %err, "operation failed");
                        handle.fail(err);
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use docflow_core::{doc, MemoryStore};

    use super::*;
    use crate::op::Op;
    use crate::ops::write::{InsertOne, InsertOneOperation};

    #[tokio::test]
    async fn claims_and_resolves_matching_kind() {
        let ctx = Arc::new(StoreContext::new(
            Arc::new(MemoryStore::new()),
            Some("app".to_string()),
        ));
        let operator = CollectionOperator::<InsertOneOperation>::new();

        let materialized = InsertOne::new("users", doc! { "x": 1 }).materialize();
        let mut queue = vec![materialized.pending];
        let mut scope = OperatorScope::new(&mut queue);
        operator.apply(&mut scope, &ctx).await;

        assert!(scope.is_empty());
        let result = materialized.operation.await_settled().await.unwrap();
        assert!(result.inserted_id.is_string());
    }

    #[tokio::test]
    async fn missing_database_fails_the_operation_only() {
        let ctx = Arc::new(StoreContext::new(Arc::new(MemoryStore::new()), None));
        let operator = CollectionOperator::<InsertOneOperation>::new();

        let materialized = InsertOne::new("users", doc! { "x": 1 }).materialize();
        let mut queue = vec![materialized.pending];
        let mut scope = OperatorScope::new(&mut queue);
        operator.apply(&mut scope, &ctx).await;

        assert!(matches!(
            materialized.operation.await_settled().await,
            Err(EngineError::MissingDatabase { .. })
        ));
    }

    #[tokio::test]
    async fn leaves_other_kinds_pending() {
        let ctx = Arc::new(StoreContext::new(
            Arc::new(MemoryStore::new()),
            Some("app".to_string()),
        ));
        let operator = CollectionOperator::<InsertOneOperation>::new();

        let find = crate::ops::query::Find::new("users", doc! {}).materialize();
        let mut queue = vec![find.pending];
        let mut scope = OperatorScope::new(&mut queue);
        operator.apply(&mut scope, &ctx).await;

        assert_eq!(scope.pending_len(), 1);
        assert!(!find.operation.is_settled());
    }
}
