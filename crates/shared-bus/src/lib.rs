//! # Shared Bus - Event Dispatcher
//!
//! In-process publish/subscribe bus that fans out committed events to
//! interested subsystems, decoupled from storage. Durability is the event
//! log's job; the bus persists nothing.
//!
//! ## Delivery Contract
//!
//! - **At-least-once**: a subscriber may observe the same event more than
//!   once (e.g. around a reconnect); every consumer deduplicates by event
//!   id.
//! - **Synchronous handlers**: handlers registered via
//!   [`InMemoryEventBus::subscribe_handler`] run in registration order on
//!   the publishing task before `publish` returns. A panicking handler is
//!   isolated and never prevents delivery to the others.
//! - **Unsubscribe fence**: releasing a [`HandlerGuard`] blocks until any
//!   in-flight dispatch finishes; once it returns, no further callback
//!   runs for that handler.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Master Data  │                    │  Sync Layer  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod handlers;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{CoreEvent, EventFilter, EventTopic};
pub use handlers::HandlerGuard;
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per broadcast subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
