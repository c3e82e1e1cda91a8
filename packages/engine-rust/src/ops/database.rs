//! Database-level kinds: raw commands and collection listing.

use std::sync::Arc;

use async_trait::async_trait;

use docflow_core::{DatabaseHandle, Document, StoreResult};

use crate::op::{Materialized, Op};
use crate::operation::Operation;
use crate::ops::{materialize_with, DatabaseCommand};
use crate::queue::queued_kind;

/// Recipe: run a raw database command.
#[derive(Debug, Clone)]
pub struct RunCommand {
    pub database: Option<String>,
    pub command: Document,
}

impl RunCommand {
    /// Runs `command` against the orchestrator's default database.
    #[must_use]
    pub fn new(command: Document) -> Self {
        Self {
            database: None,
            command,
        }
    }

    /// Pins the command to an explicit database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

impl Op for RunCommand {
    type Output = Document;

    fn materialize(&self) -> Materialized<Document> {
        let recipe = self.clone();
        materialize_with(|operation| RunCommandOperation {
            database: recipe.database,
            command: recipe.command,
            operation,
        })
    }
}

/// Live run-command operation.
pub struct RunCommandOperation {
    pub database: Option<String>,
    pub command: Document,
    pub operation: Operation<Document>,
}

queued_kind!(RunCommandOperation, "run-command");

#[async_trait]
impl DatabaseCommand for RunCommandOperation {
    const NAME: &'static str = "run-command";
    type Output = Document;

    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn handle(&self) -> Operation<Document> {
        self.operation.clone()
    }

    async fn execute(self, database: Arc<dyn DatabaseHandle>) -> StoreResult<Document> {
        database.run_command(self.command).await
    }
}

/// Recipe: list the collection names of a database.
#[derive(Debug, Clone, Default)]
pub struct ListCollections {
    pub database: Option<String>,
}

impl ListCollections {
    /// Lists the orchestrator's default database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the listing to an explicit database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

impl Op for ListCollections {
    type Output = Vec<String>;

    fn materialize(&self) -> Materialized<Vec<String>> {
        let database = self.database.clone();
        materialize_with(|operation| ListCollectionsOperation {
            database,
            operation,
        })
    }
}

/// Live list-collections operation.
pub struct ListCollectionsOperation {
    pub database: Option<String>,
    pub operation: Operation<Vec<String>>,
}

queued_kind!(ListCollectionsOperation, "list-collections");

#[async_trait]
impl DatabaseCommand for ListCollectionsOperation {
    const NAME: &'static str = "list-collections";
    type Output = Vec<String>;

    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn handle(&self) -> Operation<Vec<String>> {
        self.operation.clone()
    }

    async fn execute(self, database: Arc<dyn DatabaseHandle>) -> StoreResult<Vec<String>> {
        database.list_collection_names().await
    }
}
