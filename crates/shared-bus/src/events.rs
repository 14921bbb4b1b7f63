//! # Bus Events
//!
//! Defines everything that flows through the shared bus. Domain events are
//! committed [`EventEnvelope`]s; conflicts, sync outcomes, and presence
//! changes travel the same way so that UI consumers observe them through
//! one mechanism instead of ad hoc side channels.

use serde::{Deserialize, Serialize};
use shared_types::{ActorId, Conflict, EventEnvelope, EventId, EventKind, PresenceRecord};

/// All events that can be published to the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoreEvent {
    /// A domain event was appended to the log and folded into the
    /// projection. Carries the full committed envelope.
    EventCommitted(EventEnvelope),

    /// The sync layer confirmed a round-trip for an event.
    SyncCompleted {
        /// The synced event.
        event_id: EventId,
        /// Attempts it took, including the successful one.
        attempts: u32,
    },

    /// The retry budget for an event is exhausted.
    SyncFailed {
        /// The failed event.
        event_id: EventId,
        /// Attempts made before giving up.
        attempts: u32,
        /// Last transport/remote error, for the operator.
        reason: String,
    },

    /// A divergence between local and remote state was detected and
    /// queued for resolution.
    ConflictDetected(Conflict),

    /// A peer joined or refreshed its presence.
    PresenceUpdated(PresenceRecord),

    /// A peer missed its heartbeat allowance and was removed.
    PresenceExpired(ActorId),
}

impl CoreEvent {
    /// The coarse topic this event belongs to.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            CoreEvent::EventCommitted(_) => EventTopic::Domain,
            CoreEvent::SyncCompleted { .. } | CoreEvent::SyncFailed { .. } => EventTopic::Sync,
            CoreEvent::ConflictDetected(_) => EventTopic::Conflict,
            CoreEvent::PresenceUpdated(_) | CoreEvent::PresenceExpired(_) => EventTopic::Presence,
        }
    }

    /// The domain event kind, for `Domain` topic events.
    #[must_use]
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            CoreEvent::EventCommitted(envelope) => Some(envelope.kind()),
            _ => None,
        }
    }
}

/// Coarse routing topics on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTopic {
    /// Committed domain events.
    Domain,
    /// Sync queue outcomes.
    Sync,
    /// Presence joins/refreshes/expiries.
    Presence,
    /// Detected conflicts.
    Conflict,
}

/// Filter deciding which bus events a subscriber observes.
///
/// An empty topic list is the wildcard; `kinds` further narrows `Domain`
/// events and is ignored for the other topics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Topics to accept; empty accepts every topic.
    pub topics: Vec<EventTopic>,
    /// Domain event kinds to accept; empty accepts every kind.
    pub kinds: Vec<EventKind>,
}

impl EventFilter {
    /// Wildcard filter accepting everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept only the given topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            kinds: Vec::new(),
        }
    }

    /// Accept only domain events of the given kinds.
    #[must_use]
    pub fn kinds(kinds: Vec<EventKind>) -> Self {
        Self {
            topics: vec![EventTopic::Domain],
            kinds,
        }
    }

    /// Whether this filter accepts the event.
    #[must_use]
    pub fn matches(&self, event: &CoreEvent) -> bool {
        if !self.topics.is_empty() && !self.topics.contains(&event.topic()) {
            return false;
        }
        if !self.kinds.is_empty() {
            match event.kind() {
                Some(kind) => return self.kinds.contains(&kind),
                // Kind filters only constrain Domain events.
                None => return true,
            }
        }
        true
    }
}
