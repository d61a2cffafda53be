//! Pooled FIFO delivery.
//!
//! Every message is boxed on push, so its address never moves while the
//! queue grows or shrinks around it. Release is by address, not by index.

use std::collections::VecDeque;
use std::fmt;
use std::ptr::{self, NonNull};

use parking_lot::Mutex;

use super::Delivery;
use crate::error::{BridgeError, BridgeResult};
use crate::state::ServiceState;

struct Pool<M> {
    items: VecDeque<Box<M>>,
    published: u64,
}

/// FIFO queue of messages. The producer pushes; consumers poll the front and
/// release by address.
pub struct PooledQueue<M> {
    state: ServiceState,
    pool: Mutex<Pool<M>>,
}

impl<M> Default for PooledQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> PooledQueue<M> {
    pub fn new() -> Self {
        Self {
            state: ServiceState::new(),
            pool: Mutex::new(Pool {
                items: VecDeque::new(),
                published: 0,
            }),
        }
    }

    /// Append a message at the tail and fire the notifier.
    ///
    /// Never blocks on the consumer; the queue is unbounded.
    pub fn push(&self, message: M) {
        {
            let mut pool = self.pool.lock();
            pool.items.push_back(Box::new(message));
            pool.published += 1;
        }
        self.state.notify();
    }

    /// Address of the oldest unreleased message.
    ///
    /// Polling twice without a release returns the same address.
    pub fn poll(&self) -> Option<NonNull<M>> {
        self.pool
            .lock()
            .items
            .front()
            .map(|item| NonNull::from(&**item))
    }

    /// Remove the message living at `message`.
    ///
    /// Fails with [`BridgeError::StaleMessage`] when no queued message has
    /// that address (already released, or never polled from this queue).
    pub fn try_release(&self, message: *const M) -> BridgeResult<()> {
        let removed = {
            let mut pool = self.pool.lock();
            let index = pool.items.iter().position(|item| ptr::eq(&**item, message));
            index.and_then(|index| pool.items.remove(index))
        };

        // Dropped outside the lock
        match removed {
            Some(_) => Ok(()),
            None => Err(BridgeError::StaleMessage(message as usize)),
        }
    }

    /// Like [`try_release`](Self::try_release) but unknown addresses are
    /// silently ignored.
    pub fn release(&self, message: *const M) {
        if let Err(e) = self.try_release(message) {
            tracing::trace!(error = %e, "Ignoring release");
        }
    }

    /// Number of messages waiting to be released.
    pub fn len(&self) -> usize {
        self.pool.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.lock().items.is_empty()
    }

    /// Total number of messages pushed since creation.
    pub fn published(&self) -> u64 {
        self.pool.lock().published
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }
}

impl<M: Send + Sync + 'static> Delivery for PooledQueue<M> {
    type Message = M;

    const KIND: &'static str = "pooled";

    fn state(&self) -> &ServiceState {
        &self.state
    }

    fn publish(&self, message: M) {
        self.push(message);
    }

    fn poll(&self) -> Option<NonNull<M>> {
        PooledQueue::poll(self)
    }

    fn release(&self, message: *const M) {
        PooledQueue::release(self, message);
    }
}

impl<M> fmt::Debug for PooledQueue<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pool = self.pool.lock();
        f.debug_struct("PooledQueue")
            .field("len", &pool.items.len())
            .field("published", &pool.published)
            .field("state", &self.state)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
