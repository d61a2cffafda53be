//! Delivery Disciplines
//!
//! How messages travel from the producer thread to the host. Both variants
//! hand out raw addresses: a consumer polls an address, reads the message
//! through service projections, and releases it when done.

mod latest;
mod pooled;

pub use latest::LatestValue;
pub use pooled::PooledQueue;

use std::ptr::NonNull;

use crate::state::ServiceState;

/// A message container a [`Service`](crate::Service) can publish into.
pub trait Delivery: Send + Sync + 'static {
    /// Payload produced by the service.
    type Message: Send + Sync + 'static;

    /// Short name used in logs ("pooled", "latest").
    const KIND: &'static str;

    /// Base state (stop flag, notifier).
    fn state(&self) -> &ServiceState;

    /// Hand a freshly produced message to the container, then notify.
    fn publish(&self, message: Self::Message);

    /// Address of the next message to consume, if any.
    ///
    /// The address stays readable until it is released.
    fn poll(&self) -> Option<NonNull<Self::Message>>;

    /// Signal that the consumer is done with `message`.
    ///
    /// Unknown addresses are ignored.
    fn release(&self, message: *const Self::Message);
}
