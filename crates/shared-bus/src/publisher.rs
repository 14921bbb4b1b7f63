//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::events::{CoreEvent, EventFilter};
use crate::handlers::{HandlerGuard, HandlerRegistry};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Trait for publishing events to the bus.
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// Synchronous handlers have all run by the time this returns.
    ///
    /// # Returns
    ///
    /// The number of subscribers (handlers + broadcast receivers) that
    /// received the event.
    fn publish(&self, event: CoreEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Two delivery paths share one publish call:
///
/// - synchronous handlers (registration order, panic-isolated) for
///   consumers that must observe the event before the publisher returns;
/// - a `tokio::sync::broadcast` channel for async consumers such as the
///   sync layer and UI streams.
///
/// Suitable for a single process; the remote channel port covers
/// cross-process distribution.
pub struct InMemoryEventBus {
    /// Broadcast sender for async subscribers.
    sender: broadcast::Sender<CoreEvent>,

    /// Registry of synchronous handlers.
    handlers: Arc<HandlerRegistry>,

    /// Total events published.
    events_published: AtomicU64,

    /// Broadcast channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            handlers: Arc::new(HandlerRegistry::default()),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter (async receive side).
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(?filter, "new broadcast subscription");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Register a synchronous handler for events matching a filter.
    ///
    /// The handler runs on the publishing task before `publish` returns.
    /// Releasing the returned guard guarantees no further callbacks.
    #[must_use]
    pub fn subscribe_handler(
        &self,
        filter: EventFilter,
        handler: impl Fn(&CoreEvent) + Send + Sync + 'static,
    ) -> HandlerGuard {
        HandlerRegistry::register(&self.handlers, filter, Box::new(handler))
    }

    /// Get a stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Number of active broadcast subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Broadcast channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: CoreEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        // Synchronous handlers first: callers rely on them having run
        // by the time publish returns.
        let handled = self.handlers.dispatch(&event);

        let topic = event.topic();
        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(?topic, handled, receivers = receiver_count, "event published");
                handled + receiver_count
            }
            Err(_) => {
                // No broadcast receivers; sync handlers may still have
                // observed the event.
                debug!(?topic, handled, "event published without broadcast receivers");
                handled
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
