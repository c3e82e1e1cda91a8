//! Stateless operation recipes and their materialization.

use crate::operation::Operation;
use crate::queue::PendingOperation;

/// Target of a collection-level operation: an explicit collection name and an
/// optional database name (absent means "use the orchestrator's default").
///
/// Names are always explicit; nothing is inferred from types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub collection: String,
    pub database: Option<String>,
}

impl Target {
    /// Targets `collection` in the orchestrator's default database.
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            database: None,
        }
    }

    /// Pins the target to an explicit database.
    #[must_use]
    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

/// Result of materializing an [`Op`]: the awaitable handle and the queue
/// entry to submit to the orchestrator.
pub struct Materialized<T> {
    /// The caller-facing deferred handle.
    pub operation: Operation<T>,
    /// The queue entry an operator will claim.
    pub pending: PendingOperation,
}

/// A stateless, reusable recipe describing one store operation and its
/// expected result type.
///
/// `materialize` is pure: it allocates the handle graph and performs no I/O.
/// Calling it twice yields two fully independent [`Operation`]s — an `Op`
/// carries no mutable state and may be shared and reused freely. No
/// deduplication happens anywhere: referencing the same `Op` twice (for
/// example in a block's dependency list) executes it twice.
pub trait Op: Send + Sync {
    /// The success value the materialized operation resolves to.
    type Output: Clone + Send + 'static;

    /// Creates a fresh live operation from this recipe.
    fn materialize(&self) -> Materialized<Self::Output>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_builder() {
        let t = Target::new("users");
        assert_eq!(t.collection, "users");
        assert_eq!(t.database, None);

        let pinned = Target::new("users").in_database("crm");
        assert_eq!(pinned.database.as_deref(), Some("crm"));
    }
}
