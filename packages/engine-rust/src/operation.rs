//! Single-assignment deferred handle for in-flight operations.
//!
//! An [`Operation`] is created pending and settles exactly once — completed
//! with a value, failed with an [`EngineError`], or canceled. The handle is
//! cheap to clone; one clone is owned by whichever operator resolves it, any
//! number of others may observe the outcome via [`Operation::await_settled`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::EngineError;

enum SlotState<T> {
    Pending,
    Settled(Result<T, EngineError>),
}

struct Shared<T> {
    state: Mutex<SlotState<T>>,
    notify: Notify,
}

/// Live, single-use deferred handle produced by materializing an
/// [`Op`](crate::Op).
///
/// Settling an already-settled operation is a programming error: it panics in
/// debug builds and is a logged no-op in release builds (the first resolution
/// wins).
pub struct Operation<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Operation<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Operation<T> {
    /// Creates a pending operation handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SlotState::Pending),
                notify: Notify::new(),
            }),
        }
    }

    /// Whether the operation has settled (completed, failed, or canceled).
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(*self.shared.state.lock(), SlotState::Pending)
    }

    /// Resolves the operation with a success value.
    pub fn complete(&self, value: T) {
        self.settle(Ok(value));
    }

    /// Resolves the operation with a failure.
    pub fn fail(&self, error: EngineError) {
        self.settle(Err(error));
    }

    /// Cancels a never-claimed operation. Terminal, like [`fail`](Self::fail);
    /// the distinct entry point exists for the dispatch loop and does not
    /// abort work already in flight.
    pub fn cancel(&self, error: EngineError) {
        self.settle(Err(error));
    }

    fn settle(&self, outcome: Result<T, EngineError>) {
        {
            let mut state = self.shared.state.lock();
            if matches!(*state, SlotState::Settled(_)) {
                drop(state);
                debug_assert!(false, "operation resolved twice");
                tracing::warn!("operation resolved twice; keeping the first result");
                return;
            }
            *state = SlotState::Settled(outcome);
        }
        self.shared.notify.notify_waiters();
    }
}

impl<T: Clone> Operation<T> {
    /// Returns the outcome if the operation has settled.
    #[must_use]
    pub fn try_result(&self) -> Option<Result<T, EngineError>> {
        match &*self.shared.state.lock() {
            SlotState::Pending => None,
            SlotState::Settled(outcome) => Some(outcome.clone()),
        }
    }

    /// Waits until the operation settles and returns its outcome.
    ///
    /// Suspends only the calling task. Any number of observers may wait on
    /// clones of the same handle; each receives the same outcome.
    ///
    /// # Errors
    ///
    /// Returns the operation's failure or cancellation error.
    pub async fn await_settled(&self) -> Result<T, EngineError> {
        loop {
            // Register for a wakeup before checking, so a settle between the
            // check and the await cannot be missed.
            let notified = self.shared.notify.notified();
            if let Some(outcome) = self.try_result() {
                return outcome;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_then_await() {
        let op = Operation::new();
        op.complete(42);
        assert!(op.is_settled());
        assert_eq!(op.await_settled().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn await_before_completion_suspends_until_settled() {
        let op: Operation<&'static str> = Operation::new();
        let observer = op.clone();
        let waiter = tokio::spawn(async move { observer.await_settled().await });

        tokio::task::yield_now().await;
        op.complete("done");

        assert_eq!(waiter.await.unwrap().unwrap(), "done");
    }

    #[tokio::test]
    async fn multiple_observers_see_the_same_outcome() {
        let op: Operation<u32> = Operation::new();
        let observers: Vec<_> = (0..8)
            .map(|_| {
                let handle = op.clone();
                tokio::spawn(async move { handle.await_settled().await })
            })
            .collect();

        op.complete(7);
        for observer in observers {
            assert_eq!(observer.await.unwrap().unwrap(), 7);
        }
    }

    #[tokio::test]
    async fn failure_propagates_to_awaiters() {
        let op: Operation<u32> = Operation::new();
        op.fail(EngineError::Unclaimed { kind: "test" });
        assert!(matches!(
            op.await_settled().await,
            Err(EngineError::Unclaimed { kind: "test" })
        ));
    }

    #[test]
    fn try_result_is_none_while_pending() {
        let op: Operation<u32> = Operation::new();
        assert!(op.try_result().is_none());
        assert!(!op.is_settled());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "operation resolved twice")]
    fn double_resolution_fails_fast_in_debug() {
        let op = Operation::new();
        op.complete(1);
        op.complete(2);
    }

    #[test]
    fn materialized_handles_are_independent() {
        let a: Operation<u32> = Operation::new();
        let b: Operation<u32> = Operation::new();
        a.complete(1);
        assert!(a.is_settled());
        assert!(!b.is_settled());
    }
}
