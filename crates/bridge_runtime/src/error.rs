//! Error types for the bridge runtime.
//!
//! None of these ever cross the C boundary: the exported symbols log them and
//! carry on.

/// Errors that can occur while driving a service.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Service already running: {0}")]
    AlreadyRunning(String),

    #[error("Failed to spawn producer thread: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Producer thread panicked: {0}")]
    ThreadPanic(String),

    #[error("Message {0:#x} is not owned by this service")]
    StaleMessage(usize),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
