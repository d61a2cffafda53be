//! Standalone Services
//!
//! Services that only expose their own functions (a command sink, a
//! counter, ...) still have to answer the five boundary calls. A
//! `Standalone` has no message container: polling always comes back empty.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Service without messages. Start and stop optionally run user hooks.
pub struct Standalone {
    on_start: Option<fn()>,
    on_stop: Option<fn()>,
    starts: AtomicU64,
    stops: AtomicU64,
}

impl Standalone {
    /// Every operation is a no-op.
    pub const fn noop() -> Self {
        Self {
            on_start: None,
            on_stop: None,
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
        }
    }

    /// Delegate start and stop to the given functions.
    pub const fn with_hooks(on_start: fn(), on_stop: fn()) -> Self {
        Self {
            on_start: Some(on_start),
            on_stop: Some(on_stop),
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
        }
    }

    pub fn start(&self) {
        self.starts.fetch_add(1, Ordering::Relaxed);
        if let Some(hook) = self.on_start {
            hook();
        }
    }

    pub fn stop(&self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
        if let Some(hook) = self.on_stop {
            hook();
        }
    }

    /// Number of start calls so far.
    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::Relaxed)
    }

    /// Number of stop calls so far.
    pub fn stops(&self) -> u64 {
        self.stops.load(Ordering::Relaxed)
    }
}

impl Default for Standalone {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Standalone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Standalone")
            .field("hooks", &self.on_start.is_some())
            .field("starts", &self.starts())
            .field("stops", &self.stops())
            .finish()
    }
}
