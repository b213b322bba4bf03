//! Priority queue of pending operations.

use crate::operation::{Priority, QueuedOperation, SyncOperation};
use chrono::Utc;

/// Operations ordered by priority, then by arrival.
#[derive(Debug, Default)]
pub struct SyncQueue {
    items: Vec<QueuedOperation>,
    next_id: u64,
}

impl SyncQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation and restore priority order. Returns its ID.
    pub fn push(&mut self, operation: SyncOperation, priority: Priority) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.items.push(QueuedOperation {
            id,
            operation,
            priority,
            enqueued_at: Utc::now(),
        });
        // Stable: equal priorities keep arrival order.
        self.items.sort_by(|a, b| b.priority.cmp(&a.priority));
        id
    }

    /// Remove the head of the queue.
    pub fn pop(&mut self) -> Option<QueuedOperation> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    /// Number of waiting operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every waiting operation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Copy of the waiting operations in dequeue order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QueuedOperation> {
        self.items.clone()
    }
}
