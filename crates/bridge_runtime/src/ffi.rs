//! C Boundary
//!
//! The five symbols every service library exports, and the macros that
//! generate them:
//!
//! | Symbol | Signature |
//! |---|---|
//! | `start_service` | `void start_service(void)` |
//! | `stop_service` | `void stop_service(void)` |
//! | `get_next_message` | `void* get_next_message(void)` |
//! | `free_message` | `void free_message(void*)` |
//! | `set_message_callback` | `void set_message_callback(void (*)(void))` |
//!
//! Nothing fails across the boundary: errors are logged and swallowed, an
//! empty container yields a null pointer, unknown pointers are ignored.
//!
//! # Example
//!
//! ```ignore
//! use bridge_runtime::{PooledQueue, Service, ServiceConfig};
//!
//! bridge_runtime::export_service! {
//!     static SERVICE: Service<PooledQueue<u32>> =
//!         Service::pooled(ServiceConfig::new("ticks").resolve(), |producer| {
//!             let mut tick = 0;
//!             producer.run(|| { tick += 1; tick });
//!         });
//! }
//! ```

use std::ffi::c_void;
use std::ptr;

use crate::delivery::Delivery;
use crate::logging;
use crate::service::Service;
use crate::standalone::Standalone;
use crate::state::Notifier;

/// Host callback fired when a message becomes available. `None` is a null
/// function pointer on the C side.
pub type MessageCallback = Option<unsafe extern "C" fn()>;

/// The five boundary operations, with C-shaped signatures.
pub trait BoundaryContract: Send + Sync {
    fn start_service(&self);

    fn stop_service(&self);

    /// Next message address, or null.
    fn get_next_message(&self) -> *mut c_void;

    fn free_message(&self, message: *mut c_void);

    /// Replace the host callback. A null callback unsubscribes.
    ///
    /// # Safety
    ///
    /// A non-null `callback` must stay callable from any thread until it is
    /// replaced.
    unsafe fn set_message_callback(&self, callback: MessageCallback);
}

impl<D: Delivery> BoundaryContract for Service<D> {
    fn start_service(&self) {
        logging::init();
        if let Err(e) = self.start() {
            tracing::warn!(service = %self.name(), error = %e, "start_service ignored");
        }
    }

    fn stop_service(&self) {
        self.stop();
    }

    fn get_next_message(&self) -> *mut c_void {
        self.poll()
            .map_or(ptr::null_mut(), |message| message.as_ptr().cast())
    }

    fn free_message(&self, message: *mut c_void) {
        self.release(message.cast_const().cast());
    }

    unsafe fn set_message_callback(&self, callback: MessageCallback) {
        match callback {
            // SAFETY: forwarded from the caller.
            Some(callback) => {
                self.register_notifier(unsafe { Notifier::from_extern(callback) });
            }
            None => {
                self.clear_notifier();
            }
        }
    }
}

impl BoundaryContract for Standalone {
    fn start_service(&self) {
        logging::init();
        self.start();
    }

    fn stop_service(&self) {
        self.stop();
    }

    fn get_next_message(&self) -> *mut c_void {
        ptr::null_mut()
    }

    fn free_message(&self, _message: *mut c_void) {}

    unsafe fn set_message_callback(&self, _callback: MessageCallback) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────────────

/// Declare a lazily built static service and export the five boundary
/// symbols for it.
///
/// ```ignore
/// bridge_runtime::export_service! {
///     static SERVICE: Service<LatestValue<Reading>> =
///         Service::latest(ServiceConfig::new("sensor").resolve(), worker);
/// }
/// ```
#[macro_export]
macro_rules! export_service {
    ($(#[$meta:meta])* $vis:vis static $name:ident : $ty:ty = $init:expr ;) => {
        $(#[$meta])*
        $vis static $name: ::std::sync::LazyLock<$ty> = ::std::sync::LazyLock::new(|| $init);

        $crate::__export_boundary!(&*$name);
    };
}

/// Export the five boundary symbols for a service with no messages whose
/// start and stop call the given functions.
#[macro_export]
macro_rules! export_standalone {
    ($on_start:expr, $on_stop:expr $(,)?) => {
        static __BRIDGE_STANDALONE: $crate::Standalone =
            $crate::Standalone::with_hooks($on_start, $on_stop);

        $crate::__export_boundary!(&__BRIDGE_STANDALONE);
    };
}

/// Export five no-op boundary symbols.
#[macro_export]
macro_rules! export_standalone_noop {
    () => {
        static __BRIDGE_STANDALONE: $crate::Standalone = $crate::Standalone::noop();

        $crate::__export_boundary!(&__BRIDGE_STANDALONE);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __export_boundary {
    ($service:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn start_service() {
            $crate::ffi::BoundaryContract::start_service($service);
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn stop_service() {
            $crate::ffi::BoundaryContract::stop_service($service);
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn get_next_message() -> *mut ::std::ffi::c_void {
            $crate::ffi::BoundaryContract::get_next_message($service)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn free_message(message: *mut ::std::ffi::c_void) {
            $crate::ffi::BoundaryContract::free_message($service, message);
        }

        /// # Safety
        ///
        /// A non-null `callback` must stay callable from any thread until it
        /// is replaced.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn set_message_callback(callback: $crate::ffi::MessageCallback) {
            unsafe { $crate::ffi::BoundaryContract::set_message_callback($service, callback) }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
