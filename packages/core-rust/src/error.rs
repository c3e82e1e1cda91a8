//! Error type for the store command surface.

/// Errors returned by store collaborators implementing the command surface.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store rejected or failed a command.
    #[error("command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    /// A filter document could not be evaluated.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// An update specification could not be applied.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// A database-level command is not recognized by the store.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The target collection could not be opened.
    #[error("collection `{0}` unavailable: {1}")]
    CollectionUnavailable(String, String),
}

impl StoreError {
    /// Shorthand for a [`StoreError::CommandFailed`].
    #[must_use]
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Result alias for store commands.
pub type StoreResult<T> = Result<T, StoreError>;
