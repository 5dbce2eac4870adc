//! Relationship Table
//!
//! Directed affinity from one agent toward others, on a 0-10 scale with 5 as
//! neutral. Each update is exponential smoothing with α = 0.2:
//!
//! ```text
//! new = clamp(0, 10, current × 0.8 + quality × 0.2)
//! ```
//!
//! One bad exchange barely dents a good relationship; a sustained pattern
//! moves it.

use std::collections::{BTreeMap, HashMap};

use agent_model::AgentId;

use super::{clamp_score, SCORE_MAX, SCORE_MIN};
use crate::error::{SimError, SimResult};

/// Score of a relationship that has never been updated
pub const NEUTRAL_AFFINITY: f64 = 5.0;

/// 1 / α. Updates are computed as `(current × 4 + quality) / 5`, which is
/// `current × 0.8 + quality × 0.2` without the rounding error of 0.8 and 0.2.
const SMOOTHING_DIVISOR: f64 = 5.0;

#[derive(Debug, Clone, Default)]
pub struct RelationshipTable {
    scores: HashMap<AgentId, f64>,
}

impl RelationshipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blend one interaction into the relationship. Quality must lie in
    /// [0, 10]. Returns the new score.
    pub fn update(&mut self, target_id: &AgentId, interaction_quality: f64) -> SimResult<f64> {
        if !(SCORE_MIN..=SCORE_MAX).contains(&interaction_quality) {
            return Err(SimError::InvalidArgument(format!(
                "interaction quality must be within [0, 10], got {}",
                interaction_quality
            )));
        }

        let current = self.score(target_id);
        let blended = (current * (SMOOTHING_DIVISOR - 1.0) + interaction_quality) / SMOOTHING_DIVISOR;
        let new_score = clamp_score(blended);
        self.scores.insert(target_id.clone(), new_score);
        Ok(new_score)
    }

    /// Current score, or neutral if the agents never interacted
    pub fn score(&self, target_id: &AgentId) -> f64 {
        self.scores.get(target_id).copied().unwrap_or(NEUTRAL_AFFINITY)
    }

    /// Copy of every entry, ordered by target id
    pub fn snapshot(&self) -> BTreeMap<AgentId, f64> {
        self.scores.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
