//! Engine error taxonomy.
//!
//! Every failure reaches the caller through an [`Operation`](crate::Operation)
//! result slot, so the error type is cheap to clone: non-clonable sources are
//! wrapped in `Arc`.

use std::sync::Arc;

use docflow_core::StoreError;

/// Errors delivered through an operation's result slot.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// No registered operator recognized the operation's kind; terminal.
    #[error("no operator claimed operation of kind `{kind}`")]
    Unclaimed { kind: &'static str },

    /// The operation named no database and the orchestrator has no default.
    #[error("no database name for `{target}` and no default database configured")]
    MissingDatabase { target: String },

    /// The store rejected or failed the claimed operation's command.
    #[error("command `{command}` failed: {source}")]
    Command {
        command: &'static str,
        source: Arc<StoreError>,
    },

    /// A block's combinator returned an error or panicked.
    #[error("block combinator failed: {message}")]
    Combinator { message: String },
}

impl EngineError {
    /// Wraps a store failure for the given command.
    #[must_use]
    pub fn command(command: &'static str, source: StoreError) -> Self {
        Self::Command {
            command,
            source: Arc::new(source),
        }
    }
}
