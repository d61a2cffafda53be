//! Color Service
//!
//! Pooled service publishing a random opaque color every interval. The host
//! reads each color through `get_hexa_color`.

use std::time::Duration;

use bridge_runtime::{PooledQueue, Producer, Service, ServiceConfig};
use rand::Rng;

/// Default time between two colors.
pub const INTERVAL: Duration = Duration::from_secs(2);

/// One RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ColorMessage {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorMessage {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            r: rng.gen_range(0..=u8::MAX),
            g: rng.gen_range(0..=u8::MAX),
            b: rng.gen_range(0..=u8::MAX),
        }
    }

    /// Pack as `0xAARRGGBB` with full alpha.
    pub fn argb(&self) -> u32 {
        0xFF00_0000 | (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

fn produce(producer: &Producer<PooledQueue<ColorMessage>>) {
    let mut rng = rand::thread_rng();
    producer.run(|| ColorMessage::random(&mut rng));
}

bridge_runtime::export_service! {
    static SERVICE: Service<PooledQueue<ColorMessage>> = Service::pooled(
        ServiceConfig::new("color").with_interval(INTERVAL).resolve(),
        produce,
    );
}

/// Color of `message` as `0xAARRGGBB`, or 0 for a null pointer.
///
/// # Safety
///
/// `message` must be null or an unreleased pointer from `get_next_message`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_hexa_color(message: *const ColorMessage) -> u32 {
    unsafe { message.as_ref() }.map_or(0, ColorMessage::argb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_argb_packing() {
        let color = ColorMessage {
            r: 0x12,
            g: 0x34,
            b: 0x56,
        };
        assert_eq!(color.argb(), 0xFF12_3456);
        assert_eq!(ColorMessage { r: 0, g: 0, b: 0 }.argb(), 0xFF00_0000);
        assert_eq!(unsafe { get_hexa_color(&color) }, 0xFF12_3456);
        assert_eq!(unsafe { get_hexa_color(ptr::null()) }, 0);
    }

    #[test]
    fn test_service_publishes_colors() {
        start_service();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut message = get_next_message();
        while message.is_null() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
            message = get_next_message();
        }
        assert!(!message.is_null());

        let color = unsafe { get_hexa_color(message.cast()) };
        assert_eq!(color >> 24, 0xFF);

        free_message(message);
        stop_service();
        SERVICE.join().unwrap();
    }
}
