use crate::core::Transaction;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};

pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// Bounded FIFO of pending transactions.
///
/// Producers block in `enqueue` while the buffer is full and the consumer
/// blocks in `dequeue` while it is empty. Nothing is ever dropped.
pub struct TransactionBuffer {
    inner: Mutex<VecDeque<Transaction>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl Default for TransactionBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

impl TransactionBuffer {
    /// A zero capacity is raised to one so producers can make progress
    pub fn new(capacity: usize) -> TransactionBuffer {
        let capacity = capacity.max(1);
        TransactionBuffer {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    // A panicking holder cannot leave the deque half-updated, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Transaction>> {
        self.inner.lock().unwrap_or_else(|e| {
            log::error!("Transaction buffer lock was poisoned; recovering");
            e.into_inner()
        })
    }

    pub fn enqueue(&self, tx: Transaction) {
        let mut queue = self.lock();
        while queue.len() >= self.capacity {
            queue = self.not_full.wait(queue).unwrap_or_else(|e| e.into_inner());
        }
        queue.push_back(tx);
        self.not_empty.notify_one();
    }

    pub fn dequeue(&self) -> Transaction {
        let mut queue = self.lock();
        loop {
            if let Some(tx) = queue.pop_front() {
                self.not_full.notify_one();
                return tx;
            }
            queue = self.not_empty.wait(queue).unwrap_or_else(|e| e.into_inner());
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
