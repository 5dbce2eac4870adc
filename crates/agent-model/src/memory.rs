//! Memory records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::SimTime;

/// Category of a stored memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Something the agent experienced (a conversation line, an observation)
    Episodic,
    /// Distilled knowledge (extracted facts, reflection insights)
    Semantic,
    /// Know-how
    Procedural,
}

impl MemoryKind {
    pub fn all() -> &'static [MemoryKind] {
        &[
            MemoryKind::Episodic,
            MemoryKind::Semantic,
            MemoryKind::Procedural,
        ]
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKind::Episodic => write!(f, "episodic"),
            MemoryKind::Semantic => write!(f, "semantic"),
            MemoryKind::Procedural => write!(f, "procedural"),
        }
    }
}

/// An immutable memory owned by one agent's memory store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub kind: MemoryKind,
    pub content: String,
    pub created_at: SimTime,
    /// 0.0 (trivial) to 10.0 (life-defining)
    pub importance: f64,
}
