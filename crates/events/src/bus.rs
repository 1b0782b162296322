//! Event publishing/subscription abstraction (mechanics only).
//!
//! This module provides the **event bus pattern** - a pub/sub mechanism for
//! distributing events to multiple consumers (projections, handlers, workers).
//!
//! The bus is intentionally **lightweight**:
//!
//! - **Transport-agnostic**: Works with in-memory channels, message queues, etc.
//! - **At-least-once delivery**: Events may be delivered multiple times;
//!   consumers must be idempotent
//! - **No persistence**: Bus is for distribution, not storage (event store is
//!   source of truth)
//!
//! Events are stored in the event store first, then published. If publication
//! fails, events are still in the store and can be republished.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to an event stream.
///
/// Each subscription gets a copy of all events published to the bus
/// (broadcast semantics).
///
/// Subscriptions are designed for single-threaded consumption. Each
/// subscription should be used by one thread (or use a mutex/channel to
/// distribute events to multiple threads).
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// The event bus sits between the event store and event consumers:
///
/// ```text
/// Command → Event Store (append events) → Event Bus (publish) → Consumers
/// ```
///
/// ## Delivery Guarantees
///
/// The bus provides **at-least-once delivery**:
/// - Events may be delivered multiple times
/// - Events may be delivered out of order (unless the implementation
///   provides ordering)
/// - Consumers must be idempotent (handle duplicates safely)
///
/// ## Error Handling
///
/// `publish()` can fail (e.g., bus is full). Failures are surfaced to the
/// caller which may retry or handle the error. Since events are already
/// persisted, retrying publication is safe.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
