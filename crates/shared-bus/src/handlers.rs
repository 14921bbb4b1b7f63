//! # Synchronous Handler Registry
//!
//! The synchronous side of the bus: handlers run in registration order on
//! the publishing task, so a caller that publishes and then returns knows
//! every registered handler has already observed the event.
//!
//! ## Unsubscribe Fence
//!
//! Dispatch holds the registry read lock for the duration of a publish;
//! removal takes the write lock. Releasing a [`HandlerGuard`] therefore
//! blocks until any in-flight dispatch completes, and once it returns no
//! further callback runs for that handler. Handlers must not release
//! their own guard from inside a callback.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::events::{CoreEvent, EventFilter};

/// Boxed synchronous event handler.
pub(crate) type Handler = Box<dyn Fn(&CoreEvent) + Send + Sync>;

pub(crate) struct HandlerEntry {
    pub(crate) id: u64,
    pub(crate) filter: EventFilter,
    pub(crate) handler: Handler,
}

/// Registry of synchronous handlers, shared between the bus and the
/// guards it hands out.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    entries: RwLock<Vec<HandlerEntry>>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    pub(crate) fn register(
        registry: &Arc<Self>,
        filter: EventFilter,
        handler: Handler,
    ) -> HandlerGuard {
        let id = registry.next_id.fetch_add(1, Ordering::Relaxed);
        registry.entries.write().push(HandlerEntry {
            id,
            filter,
            handler,
        });
        HandlerGuard {
            id,
            registry: Arc::clone(registry),
            released: false,
        }
    }

    /// Dispatch an event to every matching handler, isolating panics.
    ///
    /// Returns the number of handlers that observed the event.
    pub(crate) fn dispatch(&self, event: &CoreEvent) -> usize {
        let entries = self.entries.read();
        let mut delivered = 0;
        for entry in entries.iter() {
            if !entry.filter.matches(event) {
                continue;
            }
            delivered += 1;
            if catch_unwind(AssertUnwindSafe(|| (entry.handler)(event))).is_err() {
                warn!(handler_id = entry.id, "event handler panicked, isolated");
            }
        }
        delivered
    }

    fn remove(&self, id: u64) {
        // Blocks while a dispatch holds the read lock; this is the
        // "no callback after unsubscribe returns" fence.
        self.entries.write().retain(|entry| entry.id != id);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Handle for a registered synchronous handler.
///
/// Releasing it — explicitly via [`HandlerGuard::unsubscribe`] or by
/// dropping — removes the handler and guarantees no further callbacks.
pub struct HandlerGuard {
    id: u64,
    registry: Arc<HandlerRegistry>,
    released: bool,
}

impl HandlerGuard {
    /// Remove the handler now. Equivalent to dropping the guard, but
    /// reads better at call sites that release on a specific exit path.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.remove(self.id);
        }
    }
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        self.release();
    }
}
