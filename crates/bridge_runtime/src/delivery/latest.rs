//! Latest-value delivery.
//!
//! One slot, last write wins. The slot's memory is reused across writes
//! unless its address is currently lent to a consumer, in which case the new
//! value goes into a second allocation and the lent one is retired.
//!
//! There is a single consumer. Once it polls a newer address, the retired
//! allocation is no longer read and becomes the spare for the next write, so
//! the cell never holds more than two allocations.

use std::fmt;
use std::mem;
use std::ptr::NonNull;

use parking_lot::Mutex;

use super::Delivery;
use crate::state::ServiceState;

struct Slot<M> {
    current: Box<M>,
    ready: bool,
    /// `current`'s address was handed out by `poll` since the last release
    lent: bool,
    /// Superseded allocation the consumer may still be reading
    retired: Option<Box<M>>,
}

/// Single-slot cell holding the most recent message.
pub struct LatestValue<M> {
    state: ServiceState,
    slot: Mutex<Slot<M>>,
}

impl<M: Default> Default for LatestValue<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Default> LatestValue<M> {
    pub fn new() -> Self {
        Self {
            state: ServiceState::new(),
            slot: Mutex::new(Slot {
                current: Box::default(),
                ready: false,
                lent: false,
                retired: None,
            }),
        }
    }
}

impl<M> LatestValue<M> {
    /// Store `message` as the current value and fire the notifier.
    ///
    /// An unconsumed previous value is discarded.
    pub fn set(&self, message: M) {
        let previous = {
            let mut slot = self.slot.lock();
            let previous = if slot.lent {
                // `current` was polled after `retired` was lent, so the
                // consumer has let go of `retired`
                let (fresh, stale) = match slot.retired.take() {
                    Some(mut spare) => {
                        let stale = mem::replace(&mut *spare, message);
                        (spare, Some(stale))
                    }
                    None => (Box::new(message), None),
                };
                let lent = mem::replace(&mut slot.current, fresh);
                slot.retired = Some(lent);
                slot.lent = false;
                stale
            } else {
                Some(mem::replace(&mut *slot.current, message))
            };
            slot.ready = true;
            previous
        };
        drop(previous);
        self.state.notify();
    }

    /// Address of the current value, or `None` if it was already consumed.
    ///
    /// The address stays readable until the next `release`, or until a later
    /// poll hands out a newer address and that one is superseded in turn.
    pub fn poll(&self) -> Option<NonNull<M>> {
        let mut slot = self.slot.lock();
        if !slot.ready {
            return None;
        }
        slot.lent = true;
        Some(NonNull::from(&*slot.current))
    }

    /// Mark the current value consumed.
    ///
    /// The argument is ignored: there is only one value to release. The value
    /// itself stays in memory for reuse by the next `set`.
    pub fn release(&self, _message: *const M) {
        let retired = {
            let mut slot = self.slot.lock();
            slot.ready = false;
            slot.lent = false;
            slot.retired.take()
        };
        drop(retired);
    }

    /// Whether an unconsumed value is available.
    pub fn is_ready(&self) -> bool {
        self.slot.lock().ready
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }
}

impl<M: Send + Sync + 'static> Delivery for LatestValue<M> {
    type Message = M;

    const KIND: &'static str = "latest";

    fn state(&self) -> &ServiceState {
        &self.state
    }

    fn publish(&self, message: M) {
        self.set(message);
    }

    fn poll(&self) -> Option<NonNull<M>> {
        LatestValue::poll(self)
    }

    fn release(&self, message: *const M) {
        LatestValue::release(self, message);
    }
}

impl<M> fmt::Debug for LatestValue<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("LatestValue")
            .field("ready", &slot.ready)
            .field("lent", &slot.lent)
            .field("retired", &slot.retired.is_some())
            .field("state", &self.state)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Notifier;
    use std::collections::HashSet;
    use std::ptr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn read<M: Clone>(message: NonNull<M>) -> M {
        unsafe { message.as_ref().clone() }
    }

    #[test]
    fn test_poll_before_set_is_none() {
        let cell = LatestValue::<String>::new();
        assert!(cell.poll().is_none());
        assert!(!cell.is_ready());
    }

    #[test]
    fn test_last_write_wins() {
        let cell = LatestValue::new();
        cell.set("a".to_string());
        cell.set("b".to_string());

        let message = cell.poll().unwrap();
        assert_eq!(read(message), "b");
    }

    #[test]
    fn test_presence_cycle() {
        let cell = LatestValue::new();
        assert!(cell.poll().is_none());

        cell.set(42u32);
        let message = cell.poll().unwrap();
        assert_eq!(read(message), 42);

        cell.release(message.as_ptr());
        assert!(cell.poll().is_none());

        cell.set(43);
        assert_eq!(read(cell.poll().unwrap()), 43);
    }

    #[test]
    fn test_repeated_poll_returns_same_address() {
        let cell = LatestValue::new();
        cell.set(1u8);

        let first = cell.poll().unwrap();
        assert_eq!(cell.poll(), Some(first));
        assert_eq!(cell.poll(), Some(first));
    }

    #[test]
    fn test_release_ignores_argument() {
        let cell = LatestValue::new();
        cell.set(5i64);

        cell.release(ptr::null());
        assert!(cell.poll().is_none());
    }

    #[test]
    fn test_memory_reused_after_release() {
        let cell = LatestValue::new();
        cell.set(1u32);
        let first = cell.poll().unwrap();
        cell.release(first.as_ptr());

        // Stored value survives the release
        assert_eq!(read(first), 1);

        cell.set(2);
        let second = cell.poll().unwrap();
        assert_eq!(second, first);
        assert_eq!(read(second), 2);
    }

    #[test]
    fn test_lent_value_not_overwritten() {
        let cell = LatestValue::new();
        cell.set("old".to_string());
        let lent = cell.poll().unwrap();

        cell.set("new".to_string());
        assert_eq!(read(lent), "old");

        let current = cell.poll().unwrap();
        assert_ne!(current, lent);
        assert_eq!(read(current), "new");

        cell.release(current.as_ptr());
        assert!(cell.slot.lock().retired.is_none());
    }

    #[test]
    fn test_polling_without_release_stays_bounded() {
        let cell = LatestValue::new();
        let mut addresses = HashSet::new();

        for i in 0..10_000u32 {
            cell.set(i);
            let message = cell.poll().unwrap();
            assert_eq!(read(message), i);
            addresses.insert(message);
        }

        assert!(addresses.len() <= 2);
        assert!(cell.slot.lock().retired.is_some());

        let last = cell.poll().unwrap();
        cell.release(last.as_ptr());
        assert!(cell.slot.lock().retired.is_none());
    }

    #[test]
    fn test_lent_value_survives_one_set() {
        let cell = LatestValue::new();
        cell.set("first".to_string());
        let first = cell.poll().unwrap();

        cell.set("second".to_string());
        cell.set("third".to_string());
        assert_eq!(read(first), "first");

        let third = cell.poll().unwrap();
        assert_eq!(read(third), "third");

        // `first` is reused once the consumer holds `third`
        cell.set("fourth".to_string());
        assert_eq!(cell.poll(), Some(first));
        assert_eq!(read(third), "third");
    }

    #[test]
    fn test_notifier_fires_once_per_set() {
        let cell = Arc::new(LatestValue::new());
        let count = Arc::new(AtomicUsize::new(0));
        let observed = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let reader = Arc::clone(&cell);
        let sink = Arc::clone(&observed);
        cell.state().set_notifier(Notifier::from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = reader.poll() {
                sink.store(read(message), Ordering::SeqCst);
            }
        }));

        for i in 1..=3usize {
            cell.set(i);
            assert_eq!(observed.load(Ordering::SeqCst), i);
        }

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
