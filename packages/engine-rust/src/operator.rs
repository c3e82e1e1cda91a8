//! The operator contract and the shared store context.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::OnceCell;

use docflow_core::{CollectionHandle, DatabaseHandle, StoreClient};

use crate::error::EngineError;
use crate::op::Target;
use crate::scope::OperatorScope;

/// A pluggable handler claiming and executing operations of specific kinds.
///
/// Operators are registered into the orchestrator at construction time and
/// never change while operations are in flight. During a dispatch pass each
/// operator is invoked once, in registration order, with a scope over the
/// current queue; the side effects it schedules for claimed operations run on
/// their own tasks and must never block the pass.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Diagnostic name for this operator.
    fn name(&self) -> &'static str;

    /// Claim matching pending operations and schedule their execution.
    async fn apply(&self, scope: &mut OperatorScope<'_>, ctx: &Arc<StoreContext>);
}

/// Connection state shared by all operators of one orchestrator: the store
/// client, the optional default database name, and the memoized collection
/// handles.
pub struct StoreContext {
    client: Arc<dyn StoreClient>,
    default_database: Option<String>,
    /// Init-once guard: each `(database, collection)` pair is opened exactly
    /// once per orchestrator, however many operations target it.
    collections: DashMap<(String, String), Arc<OnceCell<Arc<dyn CollectionHandle>>>>,
}

impl StoreContext {
    /// Creates a context over a connected store client.
    #[must_use]
    pub fn new(client: Arc<dyn StoreClient>, default_database: Option<String>) -> Self {
        Self {
            client,
            default_database,
            collections: DashMap::new(),
        }
    }

    /// The configured default database name, if any.
    #[must_use]
    pub fn default_database(&self) -> Option<&str> {
        self.default_database.as_deref()
    }

    /// Resolves a database handle from an explicit name or the default.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingDatabase`] when neither an explicit name
    /// nor a default is available. `target` only labels the diagnostic.
    pub fn database(
        &self,
        explicit: Option<&str>,
        target: &str,
    ) -> Result<Arc<dyn DatabaseHandle>, EngineError> {
        let name = explicit
            .or(self.default_database.as_deref())
            .ok_or_else(|| EngineError::MissingDatabase {
                target: target.to_string(),
            })?;
        Ok(self.client.database(name))
    }

    /// Resolves the collection handle for a target, initializing it at most
    /// once per orchestrator instance.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingDatabase`] when the target has no
    /// database and no default is configured, or the store's failure to open
    /// the collection.
    pub async fn collection(
        &self,
        target: &Target,
    ) -> Result<Arc<dyn CollectionHandle>, EngineError> {
        let database_name = target
            .database
            .as_deref()
            .or(self.default_database.as_deref())
            .ok_or_else(|| EngineError::MissingDatabase {
                target: target.collection.clone(),
            })?;

        let cell = self
            .collections
            .entry((database_name.to_string(), target.collection.clone()))
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let handle = cell
            .get_or_try_init(|| async {
                let database = self.client.database(database_name);
                database
                    .collection(&target.collection)
                    .await
                    .map_err(|err| EngineError::command("collection", err))
            })
            .await?;
        Ok(Arc::clone(handle))
    }
}

#[cfg(test)]
mod tests {
    use docflow_core::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn collection_uses_default_database() {
        let ctx = StoreContext::new(Arc::new(MemoryStore::new()), Some("app".to_string()));
        let coll = ctx.collection(&Target::new("users")).await.unwrap();
        assert_eq!(coll.name(), "users");
    }

    #[tokio::test]
    async fn collection_without_database_fails() {
        let ctx = StoreContext::new(Arc::new(MemoryStore::new()), None);
        match ctx.collection(&Target::new("users")).await {
            Err(EngineError::MissingDatabase { target }) => assert_eq!(target, "users"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("resolved a collection without a database"),
        }
    }

    #[tokio::test]
    async fn collection_handle_is_memoized() {
        let ctx = StoreContext::new(Arc::new(MemoryStore::new()), Some("app".to_string()));
        let a = ctx.collection(&Target::new("users")).await.unwrap();
        let b = ctx.collection(&Target::new("users")).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn explicit_database_wins_over_default() {
        let ctx = StoreContext::new(Arc::new(MemoryStore::new()), Some("app".to_string()));
        let db = ctx.database(Some("other"), "users").unwrap();
        assert_eq!(db.name(), "other");
        let fallback = ctx.database(None, "users").unwrap();
        assert_eq!(fallback.name(), "app");
    }
}
