//! Drives a service through the symbols generated by `export_service!`,
//! the way a host loading the shared library would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use bridge_runtime::{Lifecycle, PooledQueue, Service, ServiceConfig};

#[derive(Debug)]
struct Tick {
    value: u32,
}

bridge_runtime::export_service! {
    static SERVICE: Service<PooledQueue<Tick>> = Service::pooled(
        ServiceConfig::new("ticks").with_interval(Duration::from_millis(5)),
        |producer| {
            let mut value = 0;
            producer.run(|| {
                value += 1;
                Tick { value }
            });
        },
    );
}

/// Projection a concrete service would export next to the five symbols.
unsafe extern "C" fn get_value(message: *const Tick) -> u32 {
    unsafe { (*message).value }
}

static NOTIFIED: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn on_message() {
    NOTIFIED.fetch_add(1, Ordering::SeqCst);
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn test_exported_symbols_drive_service() {
    assert!(get_next_message().is_null());

    unsafe { set_message_callback(Some(on_message)) };
    start_service();
    assert!(wait_until(Duration::from_secs(5), || {
        NOTIFIED.load(Ordering::SeqCst) >= 3
    }));

    stop_service();
    SERVICE.join().unwrap();
    assert_eq!(SERVICE.lifecycle(), Lifecycle::Idle);

    // Stopping leaves the queue intact
    let mut expected = 1;
    loop {
        let message = get_next_message();
        if message.is_null() {
            break;
        }
        assert_eq!(unsafe { get_value(message.cast()) }, expected);
        free_message(message);
        expected += 1;
    }
    assert_eq!(expected as usize - 1, NOTIFIED.load(Ordering::SeqCst));

    // Restart continues producing with the same instance
    unsafe { set_message_callback(None) };
    start_service();
    assert!(wait_until(Duration::from_secs(5), || !get_next_message().is_null()));
    stop_service();
    SERVICE.join().unwrap();
}
