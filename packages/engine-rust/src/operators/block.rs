//! Operator that expands and settles block operations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::operator::{Operator, StoreContext};
use crate::ops::block::BlockOperation;
use crate::scope::OperatorScope;

/// Claims pending [`BlockOperation`]s, re-enqueues their dependencies into
/// the same pass, and spawns the settle task that waits for every dependency
/// and runs the combinator.
///
/// Register this operator first: dependencies it enqueues must still be seen
/// by the operators that follow in the same pass. Expansion loops until no
/// block remains, so blocks nested as dependencies of other blocks are
/// expanded in the same pass as well.
pub struct BlockOperator;

#[async_trait]
impl Operator for BlockOperator {
    fn name(&self) -> &'static str {
        "block"
    }

    async fn apply(&self, scope: &mut OperatorScope<'_>, _ctx: &Arc<StoreContext>) {
        loop {
            let blocks = scope.accept::<BlockOperation>();
            if blocks.is_empty() {
                break;
            }
            for block in blocks {
                let (deps, settle) = block.into_parts();
                scope.enqueue_all(deps);
                tokio::spawn(settle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use docflow_core::{doc, MemoryStore};

    use super::*;
    use crate::op::Op;
    use crate::ops::block::Block;
    use crate::ops::write::InsertOne;

    #[tokio::test]
    async fn expands_dependencies_into_the_scope() {
        let ctx = Arc::new(StoreContext::new(
            Arc::new(MemoryStore::new()),
            Some("app".to_string()),
        ));
        let block = Block::new(|results| Ok(results.len()))
            .dep(InsertOne::new("t", doc! { "a": 1 }))
            .dep(InsertOne::new("t", doc! { "b": 2 }));
        let materialized = block.materialize();

        let mut queue = vec![materialized.pending];
        let mut scope = OperatorScope::new(&mut queue);
        BlockOperator.apply(&mut scope, &ctx).await;

        // The block itself is claimed; its two dependencies are now pending.
        assert_eq!(scope.pending_len(), 2);
    }

    #[tokio::test]
    async fn nested_blocks_are_expanded_in_the_same_pass() {
        let ctx = Arc::new(StoreContext::new(
            Arc::new(MemoryStore::new()),
            Some("app".to_string()),
        ));
        let inner = Block::new(|results| Ok(results.len())).dep(InsertOne::new("t", doc! {}));
        let outer = Block::new(|results| Ok(results.len())).dep(inner);
        let materialized = outer.materialize();

        let mut queue = vec![materialized.pending];
        let mut scope = OperatorScope::new(&mut queue);
        BlockOperator.apply(&mut scope, &ctx).await;

        // Both block layers claimed; only the innermost insert remains.
        assert_eq!(scope.pending_len(), 1);
    }
}
