//! Plan records.

use serde::{Deserialize, Serialize};

use crate::time::SimTime;

/// Lifecycle of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Completed,
    Abandoned,
}

/// A goal the agent is pursuing, with the steps the oracle proposed for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: String,
    pub goal: String,
    pub steps: Vec<String>,
    pub status: PlanStatus,
    /// 0.0 (lowest) to 10.0 (highest)
    pub priority: f64,
    pub created_at: SimTime,
    pub updated_at: SimTime,
}

impl PlanRecord {
    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }
}
