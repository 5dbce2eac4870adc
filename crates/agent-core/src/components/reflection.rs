//! Reflection Scheduler
//!
//! Two-state machine deciding *when* an agent should reflect:
//!
//! ```text
//!            note_interaction()           run_reflection()
//!   Idle ──────────────────────────▶ Due ─────────────────▶ Idle
//!         count ≥ threshold, or
//!         now − last > max interval
//! ```
//!
//! The scheduler never forces a reflection; it reports that one is due and
//! leaves the scheduling decision to its host. Insight text comes from the
//! oracle; the scheduler owns writing it back into memory.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use agent_model::{MemoryKind, MemoryRecord, SimTime, MS_PER_DAY};

use super::memory::MemoryStore;
use crate::clock::Clock;
use crate::events::EventId;

/// Interactions before a reflection is due
pub const DEFAULT_INTERACTION_THRESHOLD: u32 = 10;
/// Elapsed virtual time after which a reflection is due regardless of count
pub const DEFAULT_MAX_INTERVAL_MS: u64 = MS_PER_DAY;
/// Importance assigned to reflection insights
pub const INSIGHT_IMPORTANCE: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionPhase {
    Idle,
    Due,
}

/// Counter state, reset together on each reflection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionState {
    pub interaction_count: u32,
    pub last_reflection_time: SimTime,
}

#[derive(Debug, Clone)]
pub struct ReflectionScheduler {
    clock: Arc<Clock>,
    threshold: u32,
    max_interval_ms: u64,
    state: ReflectionState,
    phase: ReflectionPhase,
    /// Reflection event already queued for this agent, if any
    scheduled: Option<EventId>,
    /// Reflections run so far
    reflections: u32,
}

impl ReflectionScheduler {
    /// The interval is measured from the scheduler's creation time.
    pub fn new(clock: Arc<Clock>, threshold: u32, max_interval_ms: u64) -> Self {
        let now = clock.now();
        Self {
            clock,
            threshold: threshold.max(1),
            max_interval_ms,
            state: ReflectionState {
                interaction_count: 0,
                last_reflection_time: now,
            },
            phase: ReflectionPhase::Idle,
            scheduled: None,
            reflections: 0,
        }
    }

    pub fn with_defaults(clock: Arc<Clock>) -> Self {
        Self::new(clock, DEFAULT_INTERACTION_THRESHOLD, DEFAULT_MAX_INTERVAL_MS)
    }

    /// Count one interaction and report whether a reflection is due
    pub fn note_interaction(&mut self) -> bool {
        self.state.interaction_count = self.state.interaction_count.saturating_add(1);

        if self.phase == ReflectionPhase::Idle {
            let elapsed = self.clock.now().millis_since(self.state.last_reflection_time);
            if self.state.interaction_count >= self.threshold || elapsed > self.max_interval_ms {
                self.phase = ReflectionPhase::Due;
            }
        }

        self.phase == ReflectionPhase::Due
    }

    /// Reset the counters and return to `Idle`. Returns the work to hand to
    /// the oracle, or `None` when there is nothing to reflect on.
    pub fn run_reflection(
        &mut self,
        recent_memories: Vec<MemoryRecord>,
    ) -> Option<PendingReflection> {
        self.state = ReflectionState {
            interaction_count: 0,
            last_reflection_time: self.clock.now(),
        };
        self.phase = ReflectionPhase::Idle;
        self.scheduled = None;
        self.reflections = self.reflections.saturating_add(1);

        if recent_memories.is_empty() {
            return None;
        }
        Some(PendingReflection {
            memories: recent_memories,
        })
    }

    pub fn is_due(&self) -> bool {
        self.phase == ReflectionPhase::Due
    }

    pub fn phase(&self) -> ReflectionPhase {
        self.phase
    }

    pub fn state(&self) -> ReflectionState {
        self.state
    }

    pub fn interaction_count(&self) -> u32 {
        self.state.interaction_count
    }

    pub fn last_reflection_time(&self) -> SimTime {
        self.state.last_reflection_time
    }

    /// Number of times `run_reflection` has reset this scheduler
    pub fn reflection_count(&self) -> u32 {
        self.reflections
    }

    /// Remember the queued reflection event so it is not queued twice
    pub fn mark_scheduled(&mut self, event_id: EventId) {
        self.scheduled = Some(event_id);
    }

    pub fn scheduled_event(&self) -> Option<&EventId> {
        self.scheduled.as_ref()
    }
}

/// Memories selected for a reflection that is waiting on the oracle
#[derive(Debug, Clone)]
pub struct PendingReflection {
    memories: Vec<MemoryRecord>,
}

impl PendingReflection {
    pub fn memories(&self) -> &[MemoryRecord] {
        &self.memories
    }

    /// Store each non-blank insight as a semantic memory of importance 7
    pub fn write_insights(self, store: &mut MemoryStore, insights: Vec<String>) -> Vec<MemoryRecord> {
        self.write_insights_at(store, insights, INSIGHT_IMPORTANCE)
    }

    pub fn write_insights_at(
        self,
        store: &mut MemoryStore,
        insights: Vec<String>,
        importance: f64,
    ) -> Vec<MemoryRecord> {
        insights
            .into_iter()
            .map(|insight| insight.trim().to_string())
            .filter(|insight| !insight.is_empty())
            .map(|insight| store.record(MemoryKind::Semantic, insight, importance))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdGenerator;
    use agent_model::MS_PER_HOUR;

    fn scheduler() -> (Arc<Clock>, ReflectionScheduler) {
        let clock = Arc::new(Clock::default());
        let scheduler = ReflectionScheduler::with_defaults(clock.clone());
        (clock, scheduler)
    }

    fn memory(content: &str) -> MemoryRecord {
        MemoryRecord {
            id: format!("mem_{}", content),
            kind: MemoryKind::Episodic,
            content: content.to_string(),
            created_at: SimTime::ZERO,
            importance: 5.0,
        }
    }

    #[test]
    fn test_due_exactly_on_threshold() {
        let (_clock, mut scheduler) = scheduler();
        for i in 1..10 {
            assert!(!scheduler.note_interaction(), "not due after {} interactions", i);
        }
        assert!(scheduler.note_interaction());
        assert_eq!(scheduler.phase(), ReflectionPhase::Due);
        assert_eq!(scheduler.interaction_count(), 10);
    }

    #[test]
    fn test_stays_due_until_reflection() {
        let (_clock, mut scheduler) = scheduler();
        for _ in 0..10 {
            scheduler.note_interaction();
        }
        assert!(scheduler.note_interaction());
        assert!(scheduler.is_due());
    }

    #[test]
    fn test_due_after_elapsed_interval() {
        let (clock, mut scheduler) = scheduler();
        clock.advance(24 * MS_PER_HOUR);
        // Exactly 24h is not "more than" 24h
        assert!(!scheduler.note_interaction());
        clock.advance(1);
        assert!(scheduler.note_interaction());
    }

    #[test]
    fn test_run_reflection_resets() {
        let (clock, mut scheduler) = scheduler();
        for _ in 0..10 {
            scheduler.note_interaction();
        }
        scheduler.mark_scheduled("evt_00000001".to_string());
        clock.advance(500);

        let pending = scheduler.run_reflection(vec![memory("a")]);
        assert!(pending.is_some());
        assert_eq!(scheduler.interaction_count(), 0);
        assert_eq!(scheduler.last_reflection_time(), SimTime::from_millis(500));
        assert_eq!(scheduler.phase(), ReflectionPhase::Idle);
        assert!(scheduler.scheduled_event().is_none());
    }

    #[test]
    fn test_run_reflection_without_memories() {
        let (_clock, mut scheduler) = scheduler();
        for _ in 0..10 {
            scheduler.note_interaction();
        }
        assert!(scheduler.run_reflection(Vec::new()).is_none());
        // Reset still happens
        assert_eq!(scheduler.interaction_count(), 0);
        assert!(!scheduler.is_due());
        assert_eq!(scheduler.reflection_count(), 1);
    }

    #[test]
    fn test_reflection_count_independent_of_start_time() {
        let clock = Arc::new(Clock::new(SimTime::from_millis(5 * MS_PER_DAY)));
        let mut scheduler = ReflectionScheduler::with_defaults(clock.clone());
        assert_eq!(scheduler.reflection_count(), 0);
        assert!(scheduler.last_reflection_time() > SimTime::ZERO);

        scheduler.run_reflection(vec![memory("a")]);
        clock.advance(10);
        scheduler.run_reflection(Vec::new());
        assert_eq!(scheduler.reflection_count(), 2);
    }

    #[test]
    fn test_insights_written_as_semantic() {
        let (clock, mut scheduler) = scheduler();
        let mut store = MemoryStore::new(clock.clone(), IdGenerator::sequential("mem"));

        let pending = scheduler
            .run_reflection(vec![memory("talked about rain")])
            .unwrap();
        assert_eq!(pending.memories().len(), 1);

        let written = pending.write_insights(
            &mut store,
            vec!["I like rain".to_string(), "   ".to_string(), "People are kind".to_string()],
        );
        assert_eq!(written.len(), 2);
        assert!(written
            .iter()
            .all(|r| r.kind == MemoryKind::Semantic && r.importance == INSIGHT_IMPORTANCE));
        assert_eq!(store.by_kind(MemoryKind::Semantic).len(), 2);
    }
}
