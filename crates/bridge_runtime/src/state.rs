//! Shared Service State
//!
//! Bookkeeping common to every delivery variant: the stop flag the producer
//! polls, the notifier the host registers, and the signal that wakes a
//! producer sleeping between productions.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

// ─────────────────────────────────────────────────────────────────────────────
// Notifier
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
enum NotifierKind {
    Extern(unsafe extern "C" fn()),
    Closure(Arc<dyn Fn() + Send + Sync>),
}

/// Zero-argument callback fired once per published message.
///
/// Either a C function pointer handed over by the host or a Rust closure.
#[derive(Clone)]
pub struct Notifier {
    kind: NotifierKind,
}

impl Notifier {
    /// Wrap a Rust closure.
    pub fn from_fn(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            kind: NotifierKind::Closure(Arc::new(f)),
        }
    }

    /// Wrap a C callback.
    ///
    /// # Safety
    ///
    /// `callback` must stay callable from any thread until it is replaced or
    /// cleared.
    pub unsafe fn from_extern(callback: unsafe extern "C" fn()) -> Self {
        Self {
            kind: NotifierKind::Extern(callback),
        }
    }

    fn invoke(&self) {
        match &self.kind {
            // SAFETY: guaranteed by the caller of `from_extern`.
            NotifierKind::Extern(callback) => unsafe { callback() },
            NotifierKind::Closure(f) => f(),
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NotifierKind::Extern(callback) => f
                .debug_tuple("Notifier::Extern")
                .field(&(*callback as usize as *const ()))
                .finish(),
            NotifierKind::Closure(_) => f.write_str("Notifier::Closure"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service State
// ─────────────────────────────────────────────────────────────────────────────

/// Base state embedded in every delivery variant.
pub struct ServiceState {
    /// Stop flag (atomic so the producer can check it without locking)
    stopping: AtomicBool,
    /// Single subscriber for "message available" notifications
    notifier: Mutex<Option<Notifier>>,
    /// Guards stop-flag transitions against a sleeping producer
    signal: Mutex<()>,
    /// Wakes a producer blocked in `wait_for`
    wake: Condvar,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceState {
    pub fn new() -> Self {
        Self {
            stopping: AtomicBool::new(false),
            notifier: Mutex::new(None),
            signal: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    /// Whether a stop has been requested.
    #[inline]
    pub fn stopped(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Ask the producer to stop.
    ///
    /// Returns immediately. A producer blocked in [`wait_for`](Self::wait_for)
    /// wakes up; one that is mid-production sees the flag on its next check.
    pub fn request_stop(&self) {
        let _guard = self.signal.lock();
        self.stopping.store(true, Ordering::Release);
        self.wake.notify_all();
    }

    /// Reset the stop flag before a new producer starts.
    pub fn clear_stop(&self) {
        let _guard = self.signal.lock();
        self.stopping.store(false, Ordering::Release);
    }

    /// Sleep for `timeout` or until a stop is requested.
    ///
    /// Returns `true` if a stop was requested. A timeout too large to
    /// represent as a deadline waits for the stop alone.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut guard = self.signal.lock();
        match Instant::now().checked_add(timeout) {
            Some(deadline) => {
                while !self.stopped() {
                    if self.wake.wait_until(&mut guard, deadline).timed_out() {
                        return self.stopped();
                    }
                }
            }
            None => {
                while !self.stopped() {
                    self.wake.wait(&mut guard);
                }
            }
        }
        true
    }

    /// Fire the registered notifier, if any.
    ///
    /// The notifier lock is released before the callback runs, so the
    /// callback may poll, release or even replace itself.
    pub fn notify(&self) {
        let notifier = self.notifier.lock().clone();
        if let Some(notifier) = notifier {
            notifier.invoke();
        }
    }

    /// Replace the notifier, returning the previous one.
    pub fn set_notifier(&self, notifier: Notifier) -> Option<Notifier> {
        self.notifier.lock().replace(notifier)
    }

    /// Unsubscribe the current notifier.
    pub fn clear_notifier(&self) -> Option<Notifier> {
        self.notifier.lock().take()
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.lock().is_some()
    }
}

impl fmt::Debug for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceState")
            .field("stopping", &self.stopped())
            .field("has_notifier", &self.has_notifier())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
