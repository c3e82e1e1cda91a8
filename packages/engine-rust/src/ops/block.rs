//! Block composition: operations computed from the settled results of
//! dependency operations.
//!
//! A [`Block`] recipe carries a list of dependency `Op`s and a combinator.
//! Materializing it materializes every dependency (no deduplication — the
//! same recipe referenced twice executes twice) and erases each dependency's
//! typed result into a `serde_json::Value`, so the combinator sees a uniform
//! list of per-dependency `Result`s. A dependency failure never fails the
//! block by itself; the combinator decides what to make of it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;
use crate::op::{Materialized, Op};
use crate::operation::Operation;
use crate::queue::{PendingOperation, QueuedOperation};

/// Outcome of one dependency, as seen by a block combinator.
pub type DepResult = Result<Value, EngineError>;

/// Object-safe erasure of a dependency recipe: materializes the dependency
/// and exposes its eventual result as a [`DepResult`] future.
trait DepOp: Send + Sync {
    fn materialize_erased(&self) -> (PendingOperation, BoxFuture<'static, DepResult>);
}

impl<O> DepOp for O
where
    O: Op,
    O::Output: Serialize,
{
    fn materialize_erased(&self) -> (PendingOperation, BoxFuture<'static, DepResult>) {
        let materialized = self.materialize();
        let handle = materialized.operation;
        let settled = async move {
            let value = handle.await_settled().await?;
            serde_json::to_value(value).map_err(|err| EngineError::Combinator {
                message: format!("failed to encode dependency result: {err}"),
            })
        }
        .boxed();
        (materialized.pending, settled)
    }
}

/// Recipe for a composite operation whose value is computed from the settled
/// results of its dependencies.
///
/// The combinator runs only after every dependency has settled — it never
/// observes a pending dependency — and is free to ignore dependency failures
/// and still produce a value (the mechanism for optional lookups).
pub struct Block<U> {
    deps: Vec<Arc<dyn DepOp>>,
    #[allow(clippy::type_complexity)]
    combine: Arc<dyn Fn(Vec<DepResult>) -> anyhow::Result<U> + Send + Sync>,
}

impl<U> Clone for Block<U> {
    fn clone(&self) -> Self {
        Self {
            deps: self.deps.clone(),
            combine: Arc::clone(&self.combine),
        }
    }
}

impl<U: Clone + Send + 'static> Block<U> {
    /// Creates a block with no dependencies yet.
    pub fn new<F>(combine: F) -> Self
    where
        F: Fn(Vec<DepResult>) -> anyhow::Result<U> + Send + Sync + 'static,
    {
        Self {
            deps: Vec::new(),
            combine: Arc::new(combine),
        }
    }

    /// Adds a dependency recipe.
    #[must_use]
    pub fn dep<O>(mut self, op: O) -> Self
    where
        O: Op + 'static,
        O::Output: Serialize,
    {
        self.deps.push(Arc::new(op));
        self
    }

    /// Adds a shared dependency recipe. Adding the same `Arc` twice is
    /// allowed and executes the recipe twice — there is no memoization.
    #[must_use]
    pub fn dep_arc<O>(mut self, op: Arc<O>) -> Self
    where
        O: Op + 'static,
        O::Output: Serialize,
    {
        self.deps.push(op);
        self
    }

    /// Number of registered dependencies.
    #[must_use]
    pub fn dep_count(&self) -> usize {
        self.deps.len()
    }
}

impl<U: Clone + Send + 'static> Op for Block<U> {
    type Output = U;

    fn materialize(&self) -> Materialized<U> {
        let operation = Operation::new();

        let mut deps = Vec::with_capacity(self.deps.len());
        let mut settled = Vec::with_capacity(self.deps.len());
        for dep in &self.deps {
            let (pending, future) = dep.materialize_erased();
            deps.push(pending);
            settled.push(future);
        }

        let combine = Arc::clone(&self.combine);
        let handle = operation.clone();
        let settle = async move {
            let results = join_all(settled).await;
            match std::panic::catch_unwind(AssertUnwindSafe(|| combine(results))) {
                Ok(Ok(value)) => handle.complete(value),
                Ok(Err(err)) => handle.fail(EngineError::Combinator {
                    message: format!("{err:#}"),
                }),
                Err(panic) => handle.fail(EngineError::Combinator {
                    message: panic_message(panic.as_ref()),
                }),
            }
        }
        .boxed();

        let cancel_handle = operation.clone();
        let pending: PendingOperation = Box::new(BlockOperation {
            deps,
            settle,
            cancel: Box::new(move || {
                cancel_handle.cancel(EngineError::Unclaimed { kind: "block" });
            }),
        });
        Materialized { operation, pending }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "combinator panicked".to_string()
    }
}

/// Live block operation: the dependency queue entries plus the erased settle
/// task. Claimed by the [`BlockOperator`](crate::operators::BlockOperator),
/// which re-enqueues the dependencies and spawns the settle task.
pub struct BlockOperation {
    deps: Vec<PendingOperation>,
    settle: BoxFuture<'static, ()>,
    cancel: Box<dyn FnOnce() + Send>,
}

impl BlockOperation {
    /// Splits into the dependencies to re-enqueue and the settle task.
    pub(crate) fn into_parts(self) -> (Vec<PendingOperation>, BoxFuture<'static, ()>) {
        (self.deps, self.settle)
    }
}

impl QueuedOperation for BlockOperation {
    fn kind_name(&self) -> &'static str {
        "block"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }

    fn cancel_unclaimed(self: Box<Self>) {
        // An unclaimed block never enqueued its dependencies; cancel them
        // too so no observer waits forever.
        for dep in self.deps {
            dep.cancel_unclaimed();
        }
        (self.cancel)();
    }
}

#[cfg(test)]
mod tests {
    use docflow_core::doc;

    use super::*;
    use crate::ops::write::InsertOne;

    #[test]
    fn duplicate_dependency_materializes_twice() {
        let shared = Arc::new(InsertOne::new("t", doc! { "x": 1 }));
        let block = Block::new(|results| Ok(results.len()))
            .dep_arc(Arc::clone(&shared))
            .dep_arc(shared);
        assert_eq!(block.dep_count(), 2);

        let materialized = block.materialize();
        assert_eq!(materialized.pending.kind_name(), "block");
    }

    #[tokio::test]
    async fn unclaimed_block_cancels_dependencies_and_itself() {
        let insert = InsertOne::new("t", doc! { "x": 1 });
        let block = Block::new(|_| Ok(())).dep(insert);
        let materialized = block.materialize();

        materialized.pending.cancel_unclaimed();
        assert!(matches!(
            materialized.operation.try_result(),
            Some(Err(EngineError::Unclaimed { kind: "block" }))
        ));
    }

    #[tokio::test]
    async fn combinator_error_becomes_block_failure() {
        let block: Block<u32> = Block::new(|_| anyhow::bail!("nope"));
        let materialized = block.materialize();
        let (deps, settle) = match materialized.pending.into_any().downcast::<BlockOperation>() {
            Ok(block_op) => block_op.into_parts(),
            Err(_) => unreachable!("block materializes a BlockOperation"),
        };
        assert!(deps.is_empty());
        settle.await;

        assert!(matches!(
            materialized.operation.try_result(),
            Some(Err(EngineError::Combinator { message })) if message.contains("nope")
        ));
    }

    #[tokio::test]
    async fn combinator_panic_becomes_block_failure_with_payload() {
        let block: Block<u32> = Block::new(|_| panic!("boom"));
        let materialized = block.materialize();
        let (deps, settle) = match materialized.pending.into_any().downcast::<BlockOperation>() {
            Ok(block_op) => block_op.into_parts(),
            Err(_) => unreachable!("block materializes a BlockOperation"),
        };
        assert!(deps.is_empty());
        settle.await;

        assert!(matches!(
            materialized.operation.try_result(),
            Some(Err(EngineError::Combinator { message })) if message.contains("boom")
        ));
    }
}
