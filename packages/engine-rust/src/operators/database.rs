//! Operator for database-scoped command kinds.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::operator::{Operator, StoreContext};
use crate::ops::database::{ListCollectionsOperation, RunCommandOperation};
use crate::ops::DatabaseCommand;
use crate::scope::OperatorScope;

/// Claims database-level operations (`run-command`, `list-collections`) and
/// executes them against the resolved database handle.
///
/// Claim rule: an operation naming no database is only claimed when the
/// orchestrator has a default database. Otherwise it stays pending for a
/// later operator — claiming without a valid target would be unsafe — and is
/// canceled at the end of the pass if nobody else takes it.
pub struct DatabaseOperator;

impl DatabaseOperator {
    fn claim_kind<K: DatabaseCommand + 'static>(
        scope: &mut OperatorScope<'_>,
        ctx: &Arc<StoreContext>,
    ) {
        let has_default = ctx.default_database().is_some();
        for op in scope.accept_where::<K>(|op| op.database().is_some() || has_default) {
            let ctx = Arc::clone(ctx);
            let handle = op.handle();
            tokio::spawn(async move {
                let outcome = match ctx.database(op.database(), K::NAME) {
                    Ok(database) => op
                        .execute(database)
                        .await
                        .map_err(|err| EngineError::command(K::NAME, err)),
                    Err(err) => Err(err),
                };
                match outcome {
                    Ok(value) => handle.complete(value),
                    Err(err) => handle.fail(err),
                }
            });
        }
    }
}

#[async_trait]
impl Operator for DatabaseOperator {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn apply(&self, scope: &mut OperatorScope<'_>, ctx: &Arc<StoreContext>) {
        Self::claim_kind::<RunCommandOperation>(scope, ctx);
        Self::claim_kind::<ListCollectionsOperation>(scope, ctx);
    }
}

#[cfg(test)]
mod tests {
    use docflow_core::{doc, MemoryStore};

    use super::*;
    use crate::op::Op;
    use crate::ops::database::{ListCollections, RunCommand};

    #[tokio::test]
    async fn runs_command_against_default_database() {
        let ctx = Arc::new(StoreContext::new(
            Arc::new(MemoryStore::new()),
            Some("app".to_string()),
        ));
        let materialized = RunCommand::new(doc! { "ping": 1 }).materialize();
        let mut queue = vec![materialized.pending];
        let mut scope = OperatorScope::new(&mut queue);
        DatabaseOperator.apply(&mut scope, &ctx).await;

        assert!(scope.is_empty());
        let reply = materialized.operation.await_settled().await.unwrap();
        assert_eq!(reply["ok"], 1);
    }

    #[tokio::test]
    async fn does_not_claim_without_database_or_default() {
        let ctx = Arc::new(StoreContext::new(Arc::new(MemoryStore::new()), None));
        let materialized = ListCollections::new().materialize();
        let mut queue = vec![materialized.pending];
        let mut scope = OperatorScope::new(&mut queue);
        DatabaseOperator.apply(&mut scope, &ctx).await;

        // Left pending: no explicit database and no default configured.
        assert_eq!(scope.pending_len(), 1);
        assert!(!materialized.operation.is_settled());
    }

    #[tokio::test]
    async fn explicit_database_is_claimed_without_default() {
        let ctx = Arc::new(StoreContext::new(Arc::new(MemoryStore::new()), None));
        let materialized = ListCollections::new().database("crm").materialize();
        let mut queue = vec![materialized.pending];
        let mut scope = OperatorScope::new(&mut queue);
        DatabaseOperator.apply(&mut scope, &ctx).await;

        assert!(scope.is_empty());
        assert_eq!(materialized.operation.await_settled().await.unwrap().len(), 0);
    }
}
