//! Word Service
//!
//! Latest-value service picking a random word every interval. Only the most
//! recent word is visible; `get_text` reads it as a C string.

use std::ffi::{CStr, c_char};
use std::time::Duration;

use bridge_runtime::{LatestValue, Producer, Service, ServiceConfig};
use rand::Rng;

/// Default time between two words.
pub const INTERVAL: Duration = Duration::from_secs(2);

/// Vocabulary the service draws from.
pub const WORDS: [&CStr; 5] = [c"hello", c"world", c"this", c"is", c"me"];

/// The current word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordMessage {
    pub text: &'static CStr,
}

impl WordMessage {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            text: WORDS[rng.gen_range(0..WORDS.len())],
        }
    }
}

fn produce(producer: &Producer<LatestValue<WordMessage>>) {
    let mut rng = rand::thread_rng();
    producer.run(|| WordMessage::random(&mut rng));
}

bridge_runtime::export_service! {
    static SERVICE: Service<LatestValue<WordMessage>> = Service::latest(
        ServiceConfig::new("word").with_interval(INTERVAL).resolve(),
        produce,
    );
}

/// NUL-terminated text of `message`, or `"null"` for a null pointer.
///
/// # Safety
///
/// `message` must be null or an unreleased pointer from `get_next_message`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_text(message: *const WordMessage) -> *const c_char {
    match unsafe { message.as_ref() } {
        Some(message) => message.text.as_ptr(),
        None => c"null".as_ptr(),
    }
}
