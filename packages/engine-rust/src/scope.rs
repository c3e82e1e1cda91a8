//! The queue-access view handed to an operator during one dispatch pass.

use crate::queue::{PendingOperation, QueuedOperation};

/// View over the pending queue exposed to an [`Operator`](crate::Operator)
/// during one dispatch pass.
///
/// An operator claims the operations it understands with [`accept`] /
/// [`accept_where`] (atomic removal from the queue) and may push further
/// pending operations back with [`enqueue`] — that is how a block expands its
/// dependencies so operators later in the same pass can claim them.
///
/// [`accept`]: OperatorScope::accept
/// [`accept_where`]: OperatorScope::accept_where
/// [`enqueue`]: OperatorScope::enqueue
pub struct OperatorScope<'a> {
    queue: &'a mut Vec<PendingOperation>,
}

impl<'a> OperatorScope<'a> {
    pub(crate) fn new(queue: &'a mut Vec<PendingOperation>) -> Self {
        Self { queue }
    }

    /// Removes and returns every pending operation of kind `K`.
    pub fn accept<K: QueuedOperation>(&mut self) -> Vec<K> {
        self.accept_where(|_| true)
    }

    /// Removes and returns every pending operation of kind `K` matching the
    /// predicate; non-matching operations stay pending for later operators.
    pub fn accept_where<K: QueuedOperation>(&mut self, claim: impl Fn(&K) -> bool) -> Vec<K> {
        let mut claimed = Vec::new();
        let mut remaining = Vec::with_capacity(self.queue.len());
        for entry in self.queue.drain(..) {
            if entry.as_any().downcast_ref::<K>().is_some_and(&claim) {
                match entry.into_any().downcast::<K>() {
                    Ok(op) => claimed.push(*op),
                    // The downcast_ref above proved the type.
                    Err(_) => unreachable!("kind checked before downcast"),
                }
            } else {
                remaining.push(entry);
            }
        }
        *self.queue = remaining;
        claimed
    }

    /// Adds a new pending operation, visible to operators later in this pass.
    pub fn enqueue(&mut self, operation: PendingOperation) {
        self.queue.push(operation);
    }

    /// Adds a batch of pending operations.
    pub fn enqueue_all(&mut self, operations: impl IntoIterator<Item = PendingOperation>) {
        self.queue.extend(operations);
    }

    /// Number of operations currently pending.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::operation::Operation;
    use crate::queue::queued_kind;

    struct AlphaOperation {
        tag: u32,
        operation: Operation<u32>,
    }
    queued_kind!(AlphaOperation, "alpha");

    struct BetaOperation {
        operation: Operation<()>,
    }
    queued_kind!(BetaOperation, "beta");

    fn alpha(tag: u32) -> PendingOperation {
        Box::new(AlphaOperation {
            tag,
            operation: Operation::new(),
        })
    }

    fn beta() -> PendingOperation {
        Box::new(BetaOperation {
            operation: Operation::new(),
        })
    }

    #[test]
    fn accept_removes_only_matching_kind() {
        let mut queue = vec![alpha(1), beta(), alpha(2)];
        let mut scope = OperatorScope::new(&mut queue);

        let alphas = scope.accept::<AlphaOperation>();
        assert_eq!(alphas.iter().map(|a| a.tag).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(scope.pending_len(), 1);

        let betas = scope.accept::<BetaOperation>();
        assert_eq!(betas.len(), 1);
        assert!(scope.is_empty());
    }

    #[test]
    fn accept_where_leaves_unmatched_pending() {
        let mut queue = vec![alpha(1), alpha(2), alpha(3)];
        let mut scope = OperatorScope::new(&mut queue);

        let odd = scope.accept_where::<AlphaOperation>(|op| op.tag % 2 == 1);
        assert_eq!(odd.iter().map(|a| a.tag).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(scope.pending_len(), 1);
    }

    #[test]
    fn enqueue_is_visible_to_later_accepts() {
        let mut queue = Vec::new();
        let mut scope = OperatorScope::new(&mut queue);
        scope.enqueue(alpha(9));
        scope.enqueue_all(vec![beta(), alpha(10)]);

        assert_eq!(scope.accept::<AlphaOperation>().len(), 2);
        assert_eq!(scope.pending_len(), 1);
    }

    #[test]
    fn cancel_unclaimed_fails_the_slot() {
        let handle = Operation::new();
        let entry: PendingOperation = Box::new(AlphaOperation {
            tag: 0,
            operation: handle.clone(),
        });
        entry.cancel_unclaimed();
        assert!(matches!(
            handle.try_result(),
            Some(Err(EngineError::Unclaimed { kind: "alpha" }))
        ));
    }
}
