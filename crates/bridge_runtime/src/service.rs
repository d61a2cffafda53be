//! Service Adapter
//!
//! Binds a delivery variant and a producer routine into the five boundary
//! operations. The service owns its producer thread: `start` spawns it,
//! `stop` asks it to finish, and `join`/`shutdown` wait for it.

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::ServiceConfig;
use crate::delivery::{Delivery, LatestValue, PooledQueue};
use crate::error::{BridgeError, BridgeResult};
use crate::state::Notifier;

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// Current state of a service's producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    /// No producer thread is running
    Idle = 0,
    /// Producer is publishing messages
    Running = 1,
    /// Stop requested, producer has not exited yet
    Stopping = 2,
}

impl Lifecycle {
    /// Convert from u8
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        *self == Lifecycle::Running
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Idle => write!(f, "idle"),
            Lifecycle::Running => write!(f, "running"),
            Lifecycle::Stopping => write!(f, "stopping"),
        }
    }
}

/// Marks the service idle when the producer thread exits, panicking or not.
struct IdleOnExit(Arc<AtomicU8>);

impl Drop for IdleOnExit {
    fn drop(&mut self) {
        self.0.store(Lifecycle::Idle as u8, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Producer
// ─────────────────────────────────────────────────────────────────────────────

/// What a producer routine sees of its service.
pub struct Producer<D: Delivery> {
    delivery: Arc<D>,
    interval: Duration,
}

impl<D: Delivery> Producer<D> {
    /// Whether the routine should return.
    #[inline]
    pub fn stopped(&self) -> bool {
        self.delivery.state().stopped()
    }

    /// Hand a message to the container.
    pub fn publish(&self, message: D::Message) {
        self.delivery.publish(message);
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    /// Configured production interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep for one interval. Returns `true` if stop was requested.
    pub fn pause(&self) -> bool {
        self.pause_for(self.interval)
    }

    /// Sleep for `duration`, waking early on stop. Returns `true` if stop was
    /// requested.
    pub fn pause_for(&self, duration: Duration) -> bool {
        self.delivery.state().wait_for(duration)
    }

    /// Publish `produce()` once per interval until stopped.
    pub fn run(&self, mut produce: impl FnMut() -> D::Message) {
        while !self.stopped() {
            self.publish(produce());
            if self.pause() {
                break;
            }
        }
    }
}

impl<D: Delivery> fmt::Debug for Producer<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("kind", &D::KIND)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

type Worker<D> = Arc<dyn Fn(&Producer<D>) + Send + Sync>;

/// A native service: one delivery container plus the routine that fills it.
pub struct Service<D: Delivery> {
    config: ServiceConfig,
    delivery: Arc<D>,
    worker: Worker<D>,
    lifecycle: Arc<AtomicU8>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl<M: Send + Sync + 'static> Service<PooledQueue<M>> {
    /// Service delivering every message in FIFO order.
    pub fn pooled(
        config: ServiceConfig,
        worker: impl Fn(&Producer<PooledQueue<M>>) + Send + Sync + 'static,
    ) -> Self {
        Self::new(config, PooledQueue::new(), worker)
    }
}

impl<M: Default + Send + Sync + 'static> Service<LatestValue<M>> {
    /// Service exposing only the most recent message.
    pub fn latest(
        config: ServiceConfig,
        worker: impl Fn(&Producer<LatestValue<M>>) + Send + Sync + 'static,
    ) -> Self {
        Self::new(config, LatestValue::new(), worker)
    }
}

impl<D: Delivery> Service<D> {
    pub fn new(
        config: ServiceConfig,
        delivery: D,
        worker: impl Fn(&Producer<D>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            delivery: Arc::new(delivery),
            worker: Arc::new(worker),
            lifecycle: Arc::new(AtomicU8::new(Lifecycle::Idle as u8)),
            thread: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn delivery(&self) -> &Arc<D> {
        &self.delivery
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle().is_running()
    }

    /// Spawn the producer thread.
    ///
    /// A producer that was asked to stop but has not exited yet is joined
    /// first, so two producers never write the same container.
    pub fn start(&self) -> BridgeResult<()> {
        let thread_name = self.config.thread_name();
        if thread_name.contains('\0') {
            return Err(BridgeError::Config(format!(
                "thread name {thread_name:?} contains a NUL byte"
            )));
        }

        let mut thread = self.thread.lock();

        if let Some(handle) = thread.as_ref() {
            if !handle.is_finished() && !self.delivery.state().stopped() {
                return Err(BridgeError::AlreadyRunning(self.config.name.clone()));
            }
        }

        if let Some(previous) = thread.take() {
            if previous.join().is_err() {
                tracing::error!(service = %self.config.name, "Previous producer panicked");
            }
        }

        self.delivery.state().clear_stop();
        self.lifecycle.store(Lifecycle::Running as u8, Ordering::SeqCst);

        let producer = Producer {
            delivery: Arc::clone(&self.delivery),
            interval: self.config.interval,
        };
        let worker = Arc::clone(&self.worker);
        let exit_guard = IdleOnExit(Arc::clone(&self.lifecycle));
        let name = self.config.name.clone();

        let spawned = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let _exit_guard = exit_guard;
                tracing::debug!(service = %name, kind = D::KIND, "Producer started");
                worker(&producer);
                tracing::debug!(service = %name, "Producer exited");
            });

        match spawned {
            Ok(handle) => {
                *thread = Some(handle);
                tracing::debug!(service = %self.config.name, "Service started");
                Ok(())
            }
            Err(e) => {
                self.lifecycle.store(Lifecycle::Idle as u8, Ordering::SeqCst);
                Err(BridgeError::SpawnFailed(e))
            }
        }
    }

    /// Ask the producer to stop. Does not wait for it.
    ///
    /// Queued messages are left in place.
    pub fn stop(&self) {
        self.delivery.state().request_stop();
        let _ = self.lifecycle.compare_exchange(
            Lifecycle::Running as u8,
            Lifecycle::Stopping as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        tracing::debug!(service = %self.config.name, "Stop requested");
    }

    /// Wait for the producer thread to exit.
    ///
    /// Returns immediately if no producer was started. Does not request a
    /// stop on its own.
    pub fn join(&self) -> BridgeResult<()> {
        let handle = self.thread.lock().take();
        match handle {
            Some(handle) => handle
                .join()
                .map_err(|_| BridgeError::ThreadPanic(self.config.name.clone())),
            None => Ok(()),
        }
    }

    /// Stop the producer and wait for it.
    pub fn shutdown(&self) -> BridgeResult<()> {
        self.stop();
        self.join()
    }

    /// Address of the next message to consume.
    pub fn poll(&self) -> Option<NonNull<D::Message>> {
        self.delivery.poll()
    }

    /// Release a message obtained from [`poll`](Self::poll).
    pub fn release(&self, message: *const D::Message) {
        self.delivery.release(message);
    }

    /// Subscribe to "message available" notifications, replacing any
    /// previous subscriber.
    pub fn register_notifier(&self, notifier: Notifier) -> Option<Notifier> {
        self.delivery.state().set_notifier(notifier)
    }

    /// Drop the current subscriber.
    pub fn clear_notifier(&self) -> Option<Notifier> {
        self.delivery.state().clear_notifier()
    }
}

impl<D: Delivery> Drop for Service<D> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "Producer failed during shutdown");
        }
    }
}

impl<D: Delivery + fmt::Debug> fmt::Debug for Service<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.config.name)
            .field("lifecycle", &self.lifecycle())
            .field("delivery", &self.delivery)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
