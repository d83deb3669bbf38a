//! Transaction-tagged message queue.

use gateway_core::{Transactional, TRANSACTION_NEW};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// Ordered buffer of records pending delivery to one destination.
///
/// Records enter with the sentinel tag, get tagged with a transaction id
/// when a send attempt picks them up, and leave only when that exact
/// transaction is committed. A failed attempt rolls every tagged record
/// back to the sentinel so the next attempt picks it up again. That tag
/// discipline is the system's only consistency mechanism.
///
/// Every operation runs under the queue's lock; none of them performs I/O,
/// so producers calling [`enqueue`](Self::enqueue) never wait on a network
/// round trip.
pub struct TransactionQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T: Transactional + Clone> TransactionQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a record. Safe to call from any thread; never blocks on
    /// dispatch I/O.
    pub fn enqueue(&self, record: T) {
        let mut queue = self.inner.lock().expect("queue lock poisoned");
        queue.push_back(record);
    }

    /// Total number of records, tagged or not.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue lock poisoned").len()
    }

    /// Whether the queue holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any record is still waiting with the sentinel tag.
    pub fn has_pending(&self) -> bool {
        let queue = self.inner.lock().expect("queue lock poisoned");
        queue
            .iter()
            .any(|record| record.transaction_tag() == TRANSACTION_NEW)
    }

    /// Ordered clones of the records with the sentinel tag, without
    /// removing or tagging them.
    pub fn snapshot_pending(&self) -> Vec<T> {
        let queue = self.inner.lock().expect("queue lock poisoned");
        queue
            .iter()
            .filter(|record| record.transaction_tag() == TRANSACTION_NEW)
            .cloned()
            .collect()
    }

    /// Tag every sentinel record with `transaction_id` and return ordered
    /// clones of exactly the records that were tagged.
    ///
    /// The clones are taken under the lock, so the batch a dispatcher sends
    /// can never diverge from the set of records the transaction owns.
    pub fn begin(&self, transaction_id: i64) -> Vec<T> {
        let mut queue = self.inner.lock().expect("queue lock poisoned");
        let mut batch = Vec::new();
        for record in queue.iter_mut() {
            if record.transaction_tag() == TRANSACTION_NEW {
                record.set_transaction_tag(transaction_id);
                batch.push(record.clone());
            }
        }
        batch
    }

    /// Remove every record tagged with `transaction_id`, returning how many
    /// were removed. Records owned by other transactions and untagged
    /// records are untouched.
    pub fn commit(&self, transaction_id: i64) -> usize {
        let mut queue = self.inner.lock().expect("queue lock poisoned");
        let before = queue.len();
        queue.retain(|record| record.transaction_tag() != transaction_id);
        before - queue.len()
    }

    /// Reset every tagged record back to the sentinel, returning how many
    /// were reset. A no-op when nothing is in flight.
    pub fn rollback(&self) -> usize {
        let mut queue = self.inner.lock().expect("queue lock poisoned");
        let mut reset = 0;
        for record in queue.iter_mut() {
            if record.transaction_tag() != TRANSACTION_NEW {
                record.set_transaction_tag(TRANSACTION_NEW);
                reset += 1;
            }
        }
        reset
    }
}

impl<T: Transactional + Clone> Default for TransactionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide send-attempt counter, shared by both destinations.
///
/// Strictly increasing for the lifetime of the process; a transaction id is
/// never reused.
pub struct TransactionCounter(AtomicI64);

impl TransactionCounter {
    /// Counter starting at zero; the first transaction id is 1.
    pub fn new() -> Self {
        Self(AtomicI64::new(0))
    }

    /// Allocate the next transaction id.
    pub fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for TransactionCounter {
    fn default() -> Self {
        Self::new()
    }
}
