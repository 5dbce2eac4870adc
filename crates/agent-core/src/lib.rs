//! Agent cognition and discrete-event scheduling engine.
//!
//! Public API for the simulation engine: a virtual clock, a time-ordered
//! event queue, and per-agent memory, reflection, planning and relationship
//! state, with every "intelligent" decision delegated to an [`oracle`].

pub mod agent;
pub mod clock;
pub mod components;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod events;
pub mod ids;
pub mod oracle;
pub mod output;
pub mod setup;

pub use agent::{Agent, AgentState, Utterance};
pub use clock::Clock;
pub use components::*;
pub use config::SimConfig;
pub use engine::{AgentUpkeep, LoopState, NoUpkeep, SimulationEngine, TickReport};
pub use environment::LocationRegistry;
pub use error::{ConfigError, EventError, OracleError, OutputError, SimError, SimResult};
pub use events::{EventCallback, EventId, EventPayload, EventQueue, ScheduledEvent};
pub use ids::IdGenerator;
pub use oracle::{KeywordOracle, Oracle, OracleClient, OracleRequest, OracleResponse};

// Re-export the record types so callers rarely need agent_model directly
pub use agent_model::{
    AgentId, AgentProfile, ConversationEntry, ConversationHistory, Location, LocationType,
    MemoryKind, MemoryRecord, PlanRecord, PlanStatus, SimTime,
};
