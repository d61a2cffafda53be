//! Bridge Runtime
//!
//! Core of the native service bridge. A host application loads a shared
//! library built on this crate and drives it through five C symbols:
//! `start_service`, `stop_service`, `get_next_message`, `free_message` and
//! `set_message_callback`.
//!
//! # Architecture
//!
//! - Each service owns one producer thread that publishes messages
//! - Messages are delivered through a [`PooledQueue`] (FIFO, every message is
//!   seen) or a [`LatestValue`] (lossy, only the newest message is seen)
//! - Consumers poll for a message address, read it through service-specific
//!   projections, then release it
//! - An optional notifier tells the host a new message is available
//!
//! The [`export_service!`], [`export_standalone!`] and
//! [`export_standalone_noop!`] macros bind a service instance to the C
//! symbols.

pub mod config;
pub mod delivery;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod service;
pub mod standalone;
pub mod state;

pub use config::{BridgeConfig, ServiceConfig};
pub use delivery::{Delivery, LatestValue, PooledQueue};
pub use error::{BridgeError, BridgeResult};
pub use ffi::{BoundaryContract, MessageCallback};
pub use service::{Lifecycle, Producer, Service};
pub use standalone::Standalone;
pub use state::{Notifier, ServiceState};
