//! Type-erased pending-queue entries.
//!
//! The pending queue holds heterogeneous operations; operators claim entries
//! of the concrete kinds they understand by downcasting. Anything still in
//! the queue after a full dispatch pass is canceled via
//! [`QueuedOperation::cancel_unclaimed`].

use std::any::Any;

/// A pending operation awaiting a claim, erased to its queue representation.
///
/// Implemented by every concrete operation kind. `Any` enables the
/// type-routed `accept` on [`OperatorScope`](crate::OperatorScope).
pub trait QueuedOperation: Any + Send {
    /// Stable kind name used in diagnostics (`"insert-one"`, `"block"`, ...).
    fn kind_name(&self) -> &'static str;

    /// Borrow as `Any` for the claim-predicate check.
    fn as_any(&self) -> &dyn Any;

    /// Convert to `Any` so a claiming operator can recover the concrete kind.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Terminal cancellation for an operation no operator claimed: fails the
    /// result slot (and those of any embedded dependencies) with
    /// [`EngineError::Unclaimed`](crate::EngineError::Unclaimed).
    fn cancel_unclaimed(self: Box<Self>);
}

/// Boxed queue entry.
pub type PendingOperation = Box<dyn QueuedOperation>;

/// Implements [`QueuedOperation`] for a kind struct holding its result slot
/// in an `operation` field.
macro_rules! queued_kind {
    ($ty:ty, $name:literal) => {
        impl $crate::queue::QueuedOperation for $ty {
            fn kind_name(&self) -> &'static str {
                $name
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(self: Box<Self>) -> Box<dyn ::std::any::Any> {
                self
            }

            fn cancel_unclaimed(self: Box<Self>) {
                self.operation
                    .cancel($crate::error::EngineError::Unclaimed { kind: $name });
            }
        }
    };
}

pub(crate) use queued_kind;
