//! Per-agent cognitive components
//!
//! Memory, reflection, planning and relationships. Each is plain owned state
//! behind its agent's lock; none of them talk to the oracle directly.

pub mod memory;
pub mod planning;
pub mod reflection;
pub mod relationships;

pub use memory::{relevance_score, MemoryStore};
pub use planning::PlanningQueue;
pub use reflection::{PendingReflection, ReflectionPhase, ReflectionScheduler, ReflectionState};
pub use relationships::{RelationshipTable, NEUTRAL_AFFINITY};

/// Lowest value on every 0-10 scale (importance, priority, affinity)
pub const SCORE_MIN: f64 = 0.0;
/// Highest value on every 0-10 scale
pub const SCORE_MAX: f64 = 10.0;

/// Clamp a score into [0, 10]. NaN clamps to the minimum.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        SCORE_MIN
    } else {
        value.clamp(SCORE_MIN, SCORE_MAX)
    }
}
