//! Monitor queue shared between threads
//!
//! Any number of producers may `push`; consumers block in `pop` until an
//! item shows up. The buffer is unbounded.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Which end of the buffer `pop` takes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueOrder {
    /// Oldest item first
    #[default]
    Fifo,
    /// Most recently pushed item first
    Lifo,
}

/// A thread-safe, unbounded queue with a blocking `pop`
#[derive(Debug)]
pub struct BlockingQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
    order: QueueOrder,
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlockingQueue<T> {
    /// Create an empty FIFO queue
    pub fn new() -> Self {
        Self::with_order(QueueOrder::Fifo)
    }

    pub fn with_order(order: QueueOrder) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            order,
        }
    }

    pub fn order(&self) -> QueueOrder {
        self.order
    }

    /// Append an item and wake one waiting consumer
    pub fn push(&self, item: T) {
        let mut items = self.lock();
        items.push_back(item);
        drop(items);
        self.available.notify_one();
    }

    /// Remove an item, blocking while the queue is empty
    pub fn pop(&self) -> T {
        let mut items = self.lock();
        loop {
            if let Some(item) = self.take(&mut items) {
                return item;
            }
            items = self
                .available
                .wait(items)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like `pop`, but gives up after `timeout`
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.pop());
        };
        let mut items = self.lock();
        loop {
            if let Some(item) = self.take(&mut items) {
                return Some(item);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, _) = self
                .available
                .wait_timeout(items, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            items = guard;
        }
    }

    /// Remove an item if one is present, never blocks
    pub fn try_pop(&self) -> Option<T> {
        let mut items = self.lock();
        self.take(&mut items)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn take(&self, items: &mut VecDeque<T>) -> Option<T> {
        match self.order {
            QueueOrder::Fifo => items.pop_front(),
            QueueOrder::Lifo => items.pop_back(),
        }
    }

    // A panicking producer cannot leave the VecDeque half-modified,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
