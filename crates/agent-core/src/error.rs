//! Error taxonomy.
//!
//! Only [`SimError::InvalidArgument`] and [`SimError::DuplicateAgent`] reach
//! callers as hard failures. Oracle and callback errors are recovered where
//! they happen and only ever show up in logs.

use agent_model::AgentId;
use thiserror::Error;

/// Errors surfaced to direct callers of the engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("agent already registered: {0}")]
    DuplicateAgent(AgentId),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Failure talking to the oracle
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle timed out after {0} ms")]
    Timeout(u64),
    #[error("oracle answered {got} to a {expected} request")]
    UnexpectedResponse {
        expected: &'static str,
        got: &'static str,
    },
}

/// Failure raised by a scheduled event's callback
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EventError {
    #[error("callback failed: {0}")]
    Failed(String),
    #[error("callback panicked")]
    Panicked,
}

impl EventError {
    pub fn failed(message: impl Into<String>) -> Self {
        EventError::Failed(message.into())
    }
}

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors writing snapshots
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
