//! Scheduled events
//!
//! A time-ordered queue of one-shot callbacks, the journal that records what
//! fired, and the tracked tasks that carry a callback's slow work past the
//! drain.

pub mod background;
pub mod journal;
pub mod queue;

pub use background::{BackgroundTasks, Settled};
pub use journal::EventJournal;
pub use queue::{DrainReport, EventOutcome, EventQueue, FiredEvent, PendingEvent};

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;

use agent_model::SimTime;

use crate::error::EventError;

/// Unique identifier of a scheduled event
pub type EventId = String;

/// Opaque data handed to an event's callback when it fires
pub type EventPayload = serde_json::Value;

/// Future produced by a callback
pub type EventFuture = BoxFuture<'static, Result<(), EventError>>;

/// One-shot callback invoked with the event's payload
pub type EventCallback = Box<dyn FnOnce(EventPayload) -> EventFuture + Send>;

/// Common event kinds
pub mod kinds {
    /// Agent reflection requested after enough interactions
    pub const REFLECTION: &str = "reflection";
    /// Two agents exchange a line of dialogue
    pub const CONVERSATION: &str = "conversation";
    /// Re-score an agent's active plans
    pub const REPRIORITIZE: &str = "reprioritize";
}

/// An event owned by the queue until it fires or is cancelled
pub struct ScheduledEvent {
    pub id: EventId,
    pub kind: String,
    pub fire_time: SimTime,
    pub payload: EventPayload,
    /// Insertion sequence, breaks fire-time ties
    pub(crate) seq: u64,
    pub(crate) callback: EventCallback,
}

impl std::fmt::Debug for ScheduledEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledEvent")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("fire_time", &self.fire_time)
            .field("payload", &self.payload)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

/// Wrap an async closure as an [`EventCallback`]
pub fn callback<F, Fut>(f: F) -> EventCallback
where
    F: FnOnce(EventPayload) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), EventError>> + Send + 'static,
{
    Box::new(move |payload| f(payload).boxed())
}

/// Wrap a synchronous closure as an [`EventCallback`]
pub fn sync_callback<F>(f: F) -> EventCallback
where
    F: FnOnce(EventPayload) -> Result<(), EventError> + Send + 'static,
{
    Box::new(move |payload| futures::future::ready(f(payload)).boxed())
}
