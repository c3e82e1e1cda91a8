//! The dispatch engine: accepts materialized operations, routes each one
//! through the registered operators, and cancels whatever nobody claims.

use std::sync::Arc;

use tokio::sync::Mutex;

use docflow_core::StoreClient;

use crate::op::Op;
use crate::operation::Operation;
use crate::operator::{Operator, StoreContext};
use crate::operators::{BlockOperator, CollectionOperator, DatabaseOperator};
use crate::ops::{
    AggregateOperation, BulkWriteOperation, CountOperation, DeleteManyOperation,
    DeleteOneOperation, DistinctOperation, EstimatedCountOperation, FindOneAndDeleteOperation,
    FindOneAndReplaceOperation, FindOneAndUpdateOperation, FindOperation, InsertManyOperation,
    InsertOneOperation, ReplaceOneOperation, UpdateManyOperation, UpdateOneOperation,
};
use crate::queue::PendingOperation;

struct DispatchState {
    context: Option<Arc<StoreContext>>,
    backlog: Vec<PendingOperation>,
}

/// Routes submitted operations to a fixed, ordered set of [`Operator`]s.
///
/// Until [`connect`](Orchestrator::connect) is called, submissions accumulate
/// in a backlog; connecting drains the backlog through one dispatch pass, in
/// submission order. After that every submission runs exactly one pass of its
/// own. Operations left unclaimed at the end of a pass are canceled, so an
/// awaiting caller gets an [`Unclaimed`](crate::EngineError::Unclaimed) error
/// instead of hanging.
///
/// The dispatch state is confined behind an async mutex: passes never
/// interleave, and an operator sees a stable queue for the whole pass. The
/// work an operator schedules for claimed operations runs on spawned tasks
/// and does not hold the pass up.
pub struct Orchestrator {
    operators: Vec<Arc<dyn Operator>>,
    state: Mutex<DispatchState>,
}

impl Orchestrator {
    /// Creates an orchestrator with an explicit operator list. Operators run
    /// in the order given; earlier operators claim first.
    #[must_use]
    pub fn new(operators: Vec<Arc<dyn Operator>>) -> Self {
        Self {
            operators,
            state: Mutex::new(DispatchState {
                context: None,
                backlog: Vec::new(),
            }),
        }
    }

    /// Creates an orchestrator with the full built-in operator set: the block
    /// expander first (so dependencies it enqueues reach the kind operators
    /// in the same pass), one operator per collection command kind, and the
    /// database operator last.
    #[must_use]
    pub fn with_default_operators() -> Self {
        Self::new(vec![
            Arc::new(BlockOperator),
            Arc::new(CollectionOperator::<InsertOneOperation>::new()),
            Arc::new(CollectionOperator::<InsertManyOperation>::new()),
            Arc::new(CollectionOperator::<UpdateOneOperation>::new()),
            Arc::new(CollectionOperator::<UpdateManyOperation>::new()),
            Arc::new(CollectionOperator::<ReplaceOneOperation>::new()),
            Arc::new(CollectionOperator::<DeleteOneOperation>::new()),
            Arc::new(CollectionOperator::<DeleteManyOperation>::new()),
            Arc::new(CollectionOperator::<BulkWriteOperation>::new()),
            Arc::new(CollectionOperator::<CountOperation>::new()),
            Arc::new(CollectionOperator::<EstimatedCountOperation>::new()),
            Arc::new(CollectionOperator::<FindOneAndDeleteOperation>::new()),
            Arc::new(CollectionOperator::<FindOneAndReplaceOperation>::new()),
            Arc::new(CollectionOperator::<FindOneAndUpdateOperation>::new()),
            Arc::new(CollectionOperator::<FindOperation>::new()),
            Arc::new(CollectionOperator::<AggregateOperation>::new()),
            Arc::new(CollectionOperator::<DistinctOperation>::new()),
            Arc::new(DatabaseOperator),
        ])
    }

    /// Installs the store connection and drains the backlog through a single
    /// dispatch pass, preserving submission order.
    pub async fn connect(&self, client: Arc<dyn StoreClient>, default_database: Option<String>) {
        let mut state = self.state.lock().await;
        let ctx = Arc::new(StoreContext::new(client, default_database));
        state.context = Some(Arc::clone(&ctx));

        let mut backlog = std::mem::take(&mut state.backlog);
        if !backlog.is_empty() {
            tracing::debug!(operations = backlog.len(), "draining pre-connect backlog");
            self.dispatch_pass(&ctx, &mut backlog).await;
        }
    }

    /// Materializes a recipe and submits it, returning the live handle.
    pub async fn dispatch<O: Op>(&self, op: &O) -> Operation<O::Output> {
        let materialized = op.materialize();
        self.submit(vec![materialized.pending]).await;
        materialized.operation
    }

    /// Materializes a batch of same-kind recipes and submits them together,
    /// so they share one dispatch pass.
    pub async fn dispatch_all<O: Op>(&self, ops: &[O]) -> Vec<Operation<O::Output>> {
        let mut handles = Vec::with_capacity(ops.len());
        let mut pending = Vec::with_capacity(ops.len());
        for op in ops {
            let materialized = op.materialize();
            handles.push(materialized.operation);
            pending.push(materialized.pending);
        }
        self.submit(pending).await;
        handles
    }

    /// Submits already-materialized operations as one batch. Before a
    /// connection exists the batch is backlogged; afterwards it gets exactly
    /// one dispatch pass.
    pub async fn submit(&self, operations: Vec<PendingOperation>) {
        let mut state = self.state.lock().await;
        match state.context.clone() {
            None => state.backlog.extend(operations),
            Some(ctx) => {
                let mut queue = operations;
                self.dispatch_pass(&ctx, &mut queue).await;
            }
        }
    }

    /// One pass: every operator, registration order, fresh scope over the
    /// shared queue. Anything still pending afterwards is canceled.
    async fn dispatch_pass(&self, ctx: &Arc<StoreContext>, queue: &mut Vec<PendingOperation>) {
        for operator in &self.operators {
            if queue.is_empty() {
                break;
            }
            let mut scope = crate::scope::OperatorScope::new(queue);
            operator.apply(&mut scope, ctx).await;
        }
        for leftover in queue.drain(..) {
            tracing::warn!(kind = leftover.kind_name(), "no operator claimed operation");
            leftover.cancel_unclaimed();
        }
    }
}

#[cfg(test)]
mod tests {
    use docflow_core::{doc, FindOptions, MemoryStore};
    use serde_json::Value;

    use super::*;
    use crate::error::EngineError;
    use crate::ops::block::Block;
    use crate::ops::query::{Aggregate, Count, Find, FindOneAndDelete};
    use crate::ops::write::InsertOne;

    fn connected() -> (Orchestrator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Orchestrator::with_default_operators(), store)
    }

    #[tokio::test]
    async fn insert_then_find_one_and_delete_round_trips() {
        let (engine, store) = connected();
        engine.connect(store, Some("app".to_string())).await;

        let inserted = engine
            .dispatch(&InsertOne::new("T", doc! { "x": 1 }))
            .await
            .await_settled()
            .await
            .unwrap();
        assert!(inserted.inserted_id.is_string());

        let removed = engine
            .dispatch(&FindOneAndDelete::new("T", doc! { "x": 1 }))
            .await
            .await_settled()
            .await
            .unwrap()
            .expect("the inserted document matches");
        assert_eq!(removed["x"], 1);
        assert_eq!(removed["_id"], inserted.inserted_id);

        let rest = engine
            .dispatch(&Find::new("T", doc! {}))
            .await
            .await_settled()
            .await
            .unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn block_combines_settled_dependency_results() {
        let (engine, store) = connected();
        engine.connect(store, Some("app".to_string())).await;

        // Nothing matches: the lookup settles to null and the count to zero.
        let block = Block::new(|results| {
            let lookup = results[0].as_ref().map_err(Clone::clone)?;
            let count = results[1].as_ref().map_err(Clone::clone)?;
            if lookup.is_null() && *count == Value::from(0) {
                Ok("empty".to_string())
            } else {
                Ok("populated".to_string())
            }
        })
        .dep(FindOneAndDelete::new("T", doc! { "missing": true }))
        .dep(Count::new("T", doc! {}));

        let verdict = engine.dispatch(&block).await.await_settled().await.unwrap();
        assert_eq!(verdict, "empty");
    }

    #[tokio::test]
    async fn failed_dependency_reaches_combinator_as_per_item_err() {
        let (engine, store) = connected();
        engine.connect(store, Some("app".to_string())).await;

        // The `$group` stage is unsupported, so the aggregate dependency
        // fails while the insert succeeds; the combinator may ignore the
        // failure and still produce a value.
        let block = Block::new(|results| {
            if results[0].is_err() && results[1].is_ok() {
                Ok("fallback".to_string())
            } else {
                anyhow::bail!("expected one failed and one settled dependency");
            }
        })
        .dep(Aggregate::new(
            "T",
            vec![doc! { "$group": { "_id": "$k" } }],
        ))
        .dep(InsertOne::new("T", doc! { "k": 1 }));

        let verdict = engine.dispatch(&block).await.await_settled().await.unwrap();
        assert_eq!(verdict, "fallback");
    }

    #[tokio::test]
    async fn unclaimed_operation_is_canceled_not_stranded() {
        let engine = Orchestrator::new(Vec::new());
        engine
            .connect(Arc::new(MemoryStore::new()), Some("app".to_string()))
            .await;

        let handle = engine.dispatch(&InsertOne::new("T", doc! {})).await;
        assert!(matches!(
            handle.await_settled().await,
            Err(EngineError::Unclaimed { kind: "insert-one" })
        ));
    }

    #[tokio::test]
    async fn concurrent_submissions_all_resolve() {
        let (engine, store) = connected();
        let engine = Arc::new(engine);
        engine.connect(store, Some("app".to_string())).await;

        let mut handles = Vec::new();
        for i in 0..100u32 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine
                    .dispatch(&InsertOne::new("load", doc! { "i": i }))
                    .await
                    .await_settled()
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let total = engine
            .dispatch(&Count::new("load", doc! {}))
            .await
            .await_settled()
            .await
            .unwrap();
        assert_eq!(total, 100);
    }

    #[tokio::test]
    async fn dispatch_all_resolves_the_whole_batch() {
        let (engine, store) = connected();
        engine.connect(store, Some("app".to_string())).await;

        let inserts: Vec<_> = (0..4)
            .map(|i| InsertOne::new("batch", doc! { "i": i }))
            .collect();
        for handle in engine.dispatch_all(&inserts).await {
            handle.await_settled().await.unwrap();
        }

        let total = engine
            .dispatch(&Count::new("batch", doc! {}))
            .await
            .await_settled()
            .await
            .unwrap();
        assert_eq!(total, 4);
    }

    #[tokio::test]
    async fn pre_connect_submissions_are_backlogged_then_drained() {
        let (engine, store) = connected();

        let first = engine.dispatch(&InsertOne::new("T", doc! { "n": 1 })).await;
        let second = engine.dispatch(&InsertOne::new("T", doc! { "n": 2 })).await;
        assert!(!first.is_settled());
        assert!(!second.is_settled());

        engine.connect(store, Some("app".to_string())).await;
        first.await_settled().await.unwrap();
        second.await_settled().await.unwrap();

        let sorted = FindOptions {
            sort: Some(doc! { "n": 1 }),
            ..FindOptions::default()
        };
        let docs = engine
            .dispatch(&Find::new("T", doc! {}).options(sorted))
            .await
            .await_settled()
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["n"], 1);
        assert_eq!(docs[1]["n"], 2);
    }

    #[tokio::test]
    async fn missing_database_fails_collection_operations() {
        let (engine, store) = connected();
        engine.connect(store, None).await;

        let outcome = engine
            .dispatch(&InsertOne::new("T", doc! {}))
            .await
            .await_settled()
            .await;
        assert!(matches!(
            outcome,
            Err(EngineError::MissingDatabase { target }) if target == "T"
        ));
    }

    #[tokio::test]
    async fn duplicate_block_dependency_executes_twice() {
        let (engine, store) = connected();
        engine.connect(store, Some("app".to_string())).await;

        let insert = Arc::new(InsertOne::new("dup", doc! { "v": 1 }));
        let block = Block::new(|results| Ok(results.len()))
            .dep_arc(Arc::clone(&insert))
            .dep_arc(insert);
        let seen = engine.dispatch(&block).await.await_settled().await.unwrap();
        assert_eq!(seen, 2);

        let total = engine
            .dispatch(&Count::new("dup", doc! {}))
            .await
            .await_settled()
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn explicit_database_routes_past_the_default() {
        let (engine, store) = connected();
        engine.connect(store, Some("app".to_string())).await;

        engine
            .dispatch(&InsertOne::new("T", doc! { "here": true }).database("other"))
            .await
            .await_settled()
            .await
            .unwrap();

        let in_default = engine
            .dispatch(&Count::new("T", doc! {}))
            .await
            .await_settled()
            .await
            .unwrap();
        assert_eq!(in_default, 0);

        let in_other = engine
            .dispatch(&Count::new("T", doc! {}).database("other"))
            .await
            .await_settled()
            .await
            .unwrap();
        assert_eq!(in_other, 1);
    }
}
