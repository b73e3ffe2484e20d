//! FIFO backlog with direct hand-off to parked consumers.
//!
//! Consumers that find the backlog empty park on a condition variable and
//! are counted as waiting. A producer may then transfer an item straight to
//! one of them with [`TransferQueue::try_hand_off`]; the item never shows up
//! in the backlog.
//!
//! Accounting invariant, held under the queue mutex:
//! `waiting + handoffs.len() == number of parked consumers`. A hand-off
//! claims one waiting consumer by moving one unit from `waiting` into
//! `handoffs`, so a claimed item can always be picked up by some parked
//! consumer, even one whose timeout has just fired.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Outcome of a timed take. Exactly one outcome per call.
#[derive(Debug, PartialEq, Eq)]
pub enum Take<T> {
    /// An item was received from the backlog or by direct hand-off.
    Item(T),
    /// Nothing arrived before the timeout.
    TimedOut,
    /// The queue is closed and holds nothing more for this consumer.
    Closed,
}

struct QueueState<T> {
    /// Items waiting for any consumer, oldest first.
    backlog: VecDeque<T>,
    /// Items already promised to a parked consumer.
    handoffs: VecDeque<T>,
    /// Parked consumers not yet claimed by a hand-off.
    waiting: usize,
    closed: bool,
}

/// Thread-safe transfer queue.
///
/// ```
/// use scalable_pool::core::worker_pool::TransferQueue;
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(TransferQueue::unbounded());
/// assert_eq!(queue.try_hand_off(1), Err(1)); // no consumer parked yet
///
/// queue.enqueue(2).unwrap();
/// let q = Arc::clone(&queue);
/// let consumer = thread::spawn(move || q.take());
/// assert_eq!(consumer.join().unwrap(), Some(2));
/// ```
pub struct TransferQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
    capacity: Option<usize>,
}

impl<T> TransferQueue<T> {
    /// Create a queue. `None` means an unbounded backlog; `Some(0)` means
    /// items can only move by direct hand-off.
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                backlog: VecDeque::with_capacity(capacity.unwrap_or(0).min(1024)),
                handoffs: VecDeque::new(),
                waiting: 0,
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Create a queue with no capacity bound.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Transfer `item` to a parked consumer, or give it back immediately if
    /// none is parked or the queue is closed.
    ///
    /// # Errors
    ///
    /// Returns the item when no consumer is waiting.
    pub fn try_hand_off(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock();
        if state.closed || state.waiting == 0 {
            return Err(item);
        }
        state.waiting -= 1;
        state.handoffs.push_back(item);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Append `item` to the backlog.
    ///
    /// # Errors
    ///
    /// Returns the item when the backlog is at capacity or the queue is
    /// closed.
    pub fn enqueue(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(item);
        }
        if let Some(capacity) = self.capacity {
            if state.backlog.len() >= capacity {
                return Err(item);
            }
        }
        state.backlog.push_back(item);
        let wake = state.waiting > 0;
        drop(state);
        if wake {
            self.available.notify_one();
        }
        Ok(())
    }

    /// Block until an item is available. Returns `None` once the queue is
    /// closed and nothing is left for this consumer.
    pub fn take(&self) -> Option<T> {
        match self.take_until(None) {
            Take::Item(item) => Some(item),
            Take::TimedOut | Take::Closed => None,
        }
    }

    /// Block for at most `timeout` waiting for an item.
    pub fn take_timeout(&self, timeout: Duration) -> Take<T> {
        // An overflowing deadline is as good as no deadline.
        let deadline = Instant::now().checked_add(timeout);
        self.take_until(deadline)
    }

    fn take_until(&self, deadline: Option<Instant>) -> Take<T> {
        let mut state = self.state.lock();
        if let Some(item) = state.backlog.pop_front() {
            return Take::Item(item);
        }
        if state.closed {
            return Take::Closed;
        }

        state.waiting += 1;
        let mut timed_out = false;
        loop {
            // A pending hand-off already paid for our slot in `waiting`.
            if let Some(item) = state.handoffs.pop_front() {
                return Take::Item(item);
            }
            if let Some(item) = state.backlog.pop_front() {
                state.waiting -= 1;
                return Take::Item(item);
            }
            if state.closed {
                state.waiting -= 1;
                return Take::Closed;
            }
            if timed_out {
                state.waiting -= 1;
                return Take::TimedOut;
            }
            match deadline {
                Some(deadline) => {
                    timed_out = self.available.wait_until(&mut state, deadline).timed_out();
                }
                None => self.available.wait(&mut state),
            }
        }
    }

    /// Refuse further input and wake every parked consumer. Items already in
    /// the backlog or promised by hand-off stay available to consumers.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.available.notify_all();
    }

    /// Close the queue and take the whole backlog in one step, so no
    /// consumer can pop an item between the two. Items already promised by
    /// hand-off stay with their consumers.
    pub fn close_and_drain(&self) -> Vec<T> {
        let mut state = self.state.lock();
        state.closed = true;
        let items = state.backlog.drain(..).collect();
        drop(state);
        self.available.notify_all();
        items
    }

    /// Remove every backlog item, oldest first. Items already handed off to
    /// a parked consumer are not affected.
    pub fn drain(&self) -> Vec<T> {
        self.state.lock().backlog.drain(..).collect()
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of items in the backlog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().backlog.len()
    }

    /// Whether the backlog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().backlog.is_empty()
    }

    /// Parked consumers that could accept a hand-off right now.
    #[must_use]
    pub fn waiting_consumers(&self) -> usize {
        self.state.lock().waiting
    }

    /// Configured backlog bound, if any.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl<T> Default for TransferQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> std::fmt::Debug for TransferQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransferQueue")
            .field("backlog", &state.backlog.len())
            .field("handoffs", &state.handoffs.len())
            .field("waiting", &state.waiting)
            .field("closed", &state.closed)
            .field("capacity", &self.capacity)
            .finish()
    }
}
