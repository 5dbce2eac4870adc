//! Snapshot Types
//!
//! Serialization structs for read-only views of engine state.
//!
//! Snapshots capture every agent's cognitive state at a point in virtual time.
//! Analytics consumers (social graphs, activity heatmaps) work from these and
//! never touch the live engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::location::Location;
use crate::plan::PlanRecord;
use crate::time::SimTime;

/// Generates a snapshot ID with the given sequence number.
pub fn generate_snapshot_id(sequence: u64) -> String {
    format!("snap_{:06}", sequence)
}

/// Per-kind memory totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCounts {
    pub episodic: usize,
    pub semantic: usize,
    pub procedural: usize,
}

impl MemoryCounts {
    pub fn total(&self) -> usize {
        self.episodic + self.semantic + self.procedural
    }
}

/// One directed affinity edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSnapshot {
    pub target_id: String,
    pub score: f64,
}

/// Full agent snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default)]
    pub memory_counts: MemoryCounts,
    #[serde(default)]
    pub interaction_count: u32,
    pub last_reflection_at: SimTime,
    /// Reflections run since the agent was created
    #[serde(default)]
    pub reflection_count: u32,
    /// Active plans, highest priority first
    #[serde(default)]
    pub active_plans: Vec<PlanRecord>,
    /// Sorted by target id
    #[serde(default)]
    pub relationships: Vec<RelationshipSnapshot>,
}

/// Complete engine snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub snapshot_id: String,
    pub time: SimTime,
    pub pending_events: usize,
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Sorted by agent id
    pub agents: Vec<AgentSnapshot>,
}

impl EngineSnapshot {
    /// Total memories across all agents, by kind
    pub fn memory_totals(&self) -> MemoryCounts {
        self.agents
            .iter()
            .fold(MemoryCounts::default(), |mut acc, agent| {
                acc.episodic += agent.memory_counts.episodic;
                acc.semantic += agent.memory_counts.semantic;
                acc.procedural += agent.memory_counts.procedural;
                acc
            })
    }

    /// Number of agents holding an affinity above neutral toward each target
    pub fn positive_ties_by_target(&self) -> BTreeMap<String, usize> {
        let mut ties = BTreeMap::new();
        for agent in &self.agents {
            for rel in &agent.relationships {
                if rel.score > 5.0 {
                    *ties.entry(rel.target_id.clone()).or_insert(0) += 1;
                }
            }
        }
        ties
    }
}
