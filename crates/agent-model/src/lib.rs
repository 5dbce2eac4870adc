//! Shared record types and serialization for the agent simulation.
//!
//! This crate contains pure data structures with no engine logic.
//! It is a dependency for the engine crate and for anything that only reads
//! the engine's exposed state (analytics, snapshot viewers).

pub mod conversation;
pub mod location;
pub mod memory;
pub mod plan;
pub mod profile;
pub mod snapshot;
pub mod time;

// Re-export time types
pub use time::{ParseTimeError, SimTime, MS_PER_DAY, MS_PER_HOUR};

// Re-export record types
pub use conversation::{ConversationEntry, ConversationHistory};
pub use location::{Location, LocationType};
pub use memory::{MemoryKind, MemoryRecord};
pub use plan::{PlanRecord, PlanStatus};
pub use profile::{AgentId, AgentProfile};

// Re-export snapshot types
pub use snapshot::{
    generate_snapshot_id, AgentSnapshot, EngineSnapshot, MemoryCounts, RelationshipSnapshot,
};
