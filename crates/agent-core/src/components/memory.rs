//! Memory Store
//!
//! Typed memory records with a recency/importance retrieval policy:
//!
//! ```text
//! score = importance / (1 + age_in_days)
//! ```
//!
//! A vivid old memory can still beat a trivial fresh one, while stale trivia
//! sinks. Records are never evicted.

use std::cmp::Ordering;
use std::sync::Arc;

use agent_model::{MemoryCounts, MemoryKind, MemoryRecord, SimTime};

use super::clamp_score;
use crate::clock::Clock;
use crate::ids::IdGenerator;

/// Default number of records returned by retrieval
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 10;

/// Relevance of a record at time `now`
pub fn relevance_score(record: &MemoryRecord, now: SimTime) -> f64 {
    record.importance / (1.0 + now.days_since(record.created_at))
}

/// One agent's memories, in insertion order
#[derive(Debug, Clone)]
pub struct MemoryStore {
    clock: Arc<Clock>,
    ids: IdGenerator,
    records: Vec<MemoryRecord>,
}

impl MemoryStore {
    pub fn new(clock: Arc<Clock>, ids: IdGenerator) -> Self {
        Self {
            clock,
            ids,
            records: Vec::new(),
        }
    }

    /// Store a memory stamped with the current time. Importance outside
    /// [0, 10] is clamped.
    pub fn record(
        &mut self,
        kind: MemoryKind,
        content: impl Into<String>,
        importance: f64,
    ) -> MemoryRecord {
        let record = MemoryRecord {
            id: self.ids.next_id(),
            kind,
            content: content.into(),
            created_at: self.clock.now(),
            importance: clamp_score(importance),
        };
        self.records.push(record.clone());
        record
    }

    /// Top `k` records by relevance score, highest first. Ties go to the more
    /// recently created record, then to the earlier stored one.
    ///
    /// `query_context` is accepted for interface parity with semantic search
    /// backends; ranking here uses only importance and age.
    pub fn retrieve_relevant(&self, query_context: &str, k: usize) -> Vec<MemoryRecord> {
        let _ = query_context;
        let now = self.clock.now();

        let mut scored: Vec<(f64, usize, &MemoryRecord)> = self
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| (relevance_score(record, now), index, record))
            .collect();

        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| b.2.created_at.cmp(&a.2.created_at))
                .then_with(|| a.1.cmp(&b.1))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(_, _, record)| record.clone())
            .collect()
    }

    /// The `limit` most recently created records of `kind`, newest first
    pub fn recent(&self, kind: MemoryKind, limit: usize) -> Vec<MemoryRecord> {
        let mut matching: Vec<(usize, &MemoryRecord)> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == kind)
            .collect();
        matching.sort_by(|a, b| match b.1.created_at.cmp(&a.1.created_at) {
            Ordering::Equal => b.0.cmp(&a.0),
            other => other,
        });
        matching
            .into_iter()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Copy of every record
    pub fn all(&self) -> Vec<MemoryRecord> {
        self.records.clone()
    }

    /// Copy of every record of one kind
    pub fn by_kind(&self, kind: MemoryKind) -> Vec<MemoryRecord> {
        self.records
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> MemoryCounts {
        let mut counts = MemoryCounts::default();
        for record in &self.records {
            match record.kind {
                MemoryKind::Episodic => counts.episodic += 1,
                MemoryKind::Semantic => counts.semantic += 1,
                MemoryKind::Procedural => counts.procedural += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
