//! Id generation.
//!
//! Generators are cheap handles: clones share one counter, so every store
//! that was handed the same generator draws from a single sequence.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// How ids are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdMode {
    /// `prefix_00000001`, `prefix_00000002`, ... (replayable)
    #[default]
    Sequential,
    /// `prefix_<uuid v4>`
    Random,
}

/// Produces unique string ids with a fixed prefix
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
    mode: IdMode,
    next: Arc<AtomicU64>,
}

impl IdGenerator {
    pub fn new(prefix: impl Into<String>, mode: IdMode) -> Self {
        Self {
            prefix: prefix.into(),
            mode,
            next: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn sequential(prefix: impl Into<String>) -> Self {
        Self::new(prefix, IdMode::Sequential)
    }

    pub fn random(prefix: impl Into<String>) -> Self {
        Self::new(prefix, IdMode::Random)
    }

    /// Generate the next id
    pub fn next_id(&self) -> String {
        match self.mode {
            IdMode::Sequential => {
                let n = self.next.fetch_add(1, Ordering::Relaxed);
                format!("{}_{:08}", self.prefix, n)
            }
            IdMode::Random => format!("{}_{}", self.prefix, uuid::Uuid::new_v4()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequential_ids() {
        let ids = IdGenerator::sequential("evt");
        assert_eq!(ids.next_id(), "evt_00000001");
        assert_eq!(ids.next_id(), "evt_00000002");
        assert_eq!(ids.next_id(), "evt_00000003");
    }

    #[test]
    fn test_clones_share_sequence() {
        let ids = IdGenerator::sequential("mem");
        let other = ids.clone();
        assert_eq!(ids.next_id(), "mem_00000001");
        assert_eq!(other.next_id(), "mem_00000002");
    }

    #[test]
    fn test_random_ids_unique() {
        let ids = IdGenerator::random("plan");
        let generated: HashSet<String> = (0..100).map(|_| ids.next_id()).collect();
        assert_eq!(generated.len(), 100);
        assert!(generated.iter().all(|id| id.starts_with("plan_")));
    }
}
