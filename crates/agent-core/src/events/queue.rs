//! Event Queue
//!
//! Events are keyed by `(fire_time, insertion sequence)`, so iteration order
//! is the firing order and equal fire times fire FIFO. A drain detaches every
//! due event under the lock before running any callback: events scheduled by
//! a callback land in the queue for the next drain, and a cancel that loses
//! the race to a drain simply returns `false`.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use agent_model::SimTime;

use super::{EventCallback, EventId, EventPayload, ScheduledEvent};
use crate::clock::Clock;
use crate::error::{EventError, SimError, SimResult};
use crate::ids::IdGenerator;

type EventKey = (SimTime, u64);

#[derive(Debug, Default)]
struct QueueInner {
    events: BTreeMap<EventKey, ScheduledEvent>,
    index: HashMap<EventId, EventKey>,
    next_seq: u64,
}

/// Read-only view of a pending event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEvent {
    pub id: EventId,
    pub kind: String,
    pub fire_time: SimTime,
    pub payload: EventPayload,
}

/// How a fired callback ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum EventOutcome {
    Completed,
    Failed(String),
}

/// Record of one fired event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredEvent {
    pub id: EventId,
    pub kind: String,
    pub fire_time: SimTime,
    pub fired_at: SimTime,
    pub outcome: EventOutcome,
}

/// Result of one drain pass, in firing order
#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    pub fired: Vec<FiredEvent>,
}

impl DrainReport {
    pub fn failures(&self) -> usize {
        self.fired
            .iter()
            .filter(|e| matches!(e.outcome, EventOutcome::Failed(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

/// Time-ordered queue of scheduled callbacks
#[derive(Debug)]
pub struct EventQueue {
    clock: Arc<Clock>,
    ids: IdGenerator,
    inner: Mutex<QueueInner>,
}

impl EventQueue {
    pub fn new(clock: Arc<Clock>, ids: IdGenerator) -> Self {
        Self {
            clock,
            ids,
            inner: Mutex::new(QueueInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule `callback` to fire `delay_ms` after the current virtual time
    pub fn schedule(
        &self,
        kind: impl Into<String>,
        delay_ms: i64,
        payload: EventPayload,
        callback: EventCallback,
    ) -> SimResult<EventId> {
        if delay_ms < 0 {
            return Err(SimError::InvalidArgument(format!(
                "event delay must be non-negative, got {} ms",
                delay_ms
            )));
        }

        let fire_time = self.clock.now().saturating_add(delay_ms as u64);
        let id = self.ids.next_id();
        let kind = kind.into();

        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let key = (fire_time, seq);
        inner.index.insert(id.clone(), key);
        inner.events.insert(
            key,
            ScheduledEvent {
                id: id.clone(),
                kind: kind.clone(),
                fire_time,
                payload,
                seq,
                callback,
            },
        );
        drop(inner);

        tracing::debug!(event_id = %id, kind = %kind, fire_time = %fire_time, "scheduled event");
        Ok(id)
    }

    /// Remove a pending event. Returns false if it already fired, was
    /// already cancelled, or never existed.
    pub fn cancel(&self, event_id: &str) -> bool {
        let mut inner = self.lock();
        let Some(key) = inner.index.remove(event_id) else {
            return false;
        };
        let removed = inner.events.remove(&key).is_some();
        drop(inner);

        if removed {
            tracing::debug!(event_id = %event_id, "cancelled event");
        }
        removed
    }

    /// Detach every event whose fire time is at or before now, in firing order
    fn take_due(&self) -> (SimTime, Vec<ScheduledEvent>) {
        let mut inner = self.lock();
        let now = self.clock.now();

        let due = if now.as_millis() == u64::MAX {
            std::mem::take(&mut inner.events)
        } else {
            let later = inner.events.split_off(&(now.saturating_add(1), 0));
            std::mem::replace(&mut inner.events, later)
        };
        for event in due.values() {
            inner.index.remove(&event.id);
        }

        (now, due.into_values().collect())
    }

    /// Fire every due event. Callback failures (errors or panics) are logged
    /// and recorded; they never stop the remaining callbacks.
    pub async fn drain_due(&self) -> DrainReport {
        let (now, due) = self.take_due();
        let mut report = DrainReport {
            fired: Vec::with_capacity(due.len()),
        };

        for event in due {
            let ScheduledEvent {
                id,
                kind,
                fire_time,
                payload,
                callback,
                ..
            } = event;

            // Invoke inside the guarded future so a panic while building the
            // callback's future is caught as well.
            let result = AssertUnwindSafe(async move { callback(payload).await })
                .catch_unwind()
                .await
                .unwrap_or(Err(EventError::Panicked));

            let outcome = match result {
                Ok(()) => {
                    tracing::debug!(event_id = %id, kind = %kind, "fired event");
                    EventOutcome::Completed
                }
                Err(e) => {
                    tracing::error!(event_id = %id, kind = %kind, error = %e, "event callback failed");
                    EventOutcome::Failed(e.to_string())
                }
            };

            report.fired.push(FiredEvent {
                id,
                kind,
                fire_time,
                fired_at: now,
                outcome,
            });
        }

        report
    }

    /// Up to `limit` soonest-firing events, without removing them
    pub fn peek(&self, limit: usize) -> Vec<PendingEvent> {
        self.lock()
            .events
            .values()
            .take(limit)
            .map(|e| PendingEvent {
                id: e.id.clone(),
                kind: e.kind.clone(),
                fire_time: e.fire_time,
                payload: e.payload.clone(),
            })
            .collect()
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.lock().index.contains_key(event_id)
    }

    pub fn next_fire_time(&self) -> Option<SimTime> {
        self.lock().events.keys().next().map(|(t, _)| *t)
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    pub fn clock(&self) -> &Arc<Clock> {
        &self.clock
    }
}
