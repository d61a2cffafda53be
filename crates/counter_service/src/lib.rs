//! Counter Service
//!
//! Standalone service: no messages, just an `increment` function whose
//! counter is reset by `start_service` and `stop_service`.

use std::sync::atomic::{AtomicI32, Ordering};

static COUNTER: AtomicI32 = AtomicI32::new(0);

fn on_start() {
    COUNTER.store(0, Ordering::Relaxed);
    tracing::debug!("Counter reset on start");
}

fn on_stop() {
    COUNTER.store(0, Ordering::Relaxed);
    tracing::debug!("Counter reset on stop");
}

bridge_runtime::export_standalone!(on_start, on_stop);

/// Increment the counter and return its new value.
#[unsafe(no_mangle)]
pub extern "C" fn increment() -> i32 {
    COUNTER.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_lifecycle() {
        start_service();
        assert_eq!(increment(), 1);
        assert_eq!(increment(), 2);
        assert_eq!(increment(), 3);

        stop_service();
        assert_eq!(increment(), 1);

        start_service();
        assert_eq!(increment(), 1);

        assert!(get_next_message().is_null());
        free_message(std::ptr::null_mut());
        unsafe { set_message_callback(None) };
    }
}
