//! Configuration loading for the simulation engine.
//!
//! Settings come from a TOML file. Every section is optional; anything left
//! out takes its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::components::memory::DEFAULT_RETRIEVAL_LIMIT;
use crate::components::reflection::{
    DEFAULT_INTERACTION_THRESHOLD, DEFAULT_MAX_INTERVAL_MS, INSIGHT_IMPORTANCE,
};
use crate::error::ConfigError;
use crate::ids::IdMode;

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Virtual clock settings
    #[serde(default)]
    pub clock: ClockConfig,
    /// Tick loop settings
    #[serde(default)]
    pub engine: EngineConfig,
    /// Memory retrieval settings
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Reflection trigger settings
    #[serde(default)]
    pub reflection: ReflectionConfig,
    /// Oracle call settings
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Id generation settings
    #[serde(default)]
    pub ids: IdConfig,
}

impl SimConfig {
    /// Loads configuration from a TOML file and validates it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string and validates it.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes this configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock.scale <= 0.0 || !self.clock.scale.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "clock.scale must be positive, got {}",
                self.clock.scale
            )));
        }
        if self.engine.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("engine.tick_interval_ms must be at least 1".into()));
        }
        if self.memory.retrieval_limit == 0 {
            return Err(ConfigError::Invalid("memory.retrieval_limit must be at least 1".into()));
        }
        if self.reflection.interaction_threshold == 0 {
            return Err(ConfigError::Invalid(
                "reflection.interaction_threshold must be at least 1".into(),
            ));
        }
        if self.reflection.recent_memory_window == 0 {
            return Err(ConfigError::Invalid(
                "reflection.recent_memory_window must be at least 1".into(),
            ));
        }
        if !(0.0..=10.0).contains(&self.reflection.insight_importance) {
            return Err(ConfigError::Invalid(format!(
                "reflection.insight_importance must be within [0, 10], got {}",
                self.reflection.insight_importance
            )));
        }
        if self.oracle.timeout_ms == 0 {
            return Err(ConfigError::Invalid("oracle.timeout_ms must be at least 1".into()));
        }
        Ok(())
    }
}

/// Virtual clock configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Virtual time at engine creation, in ms
    pub start_time_ms: u64,
    /// Virtual ms per wall ms
    pub scale: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            start_time_ms: 0,
            scale: 1.0,
        }
    }
}

/// Tick loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock pause between ticks when the loop is running
    pub tick_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 100 }
    }
}

/// Memory retrieval configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Records handed to the oracle when producing an utterance
    pub retrieval_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            retrieval_limit: DEFAULT_RETRIEVAL_LIMIT,
        }
    }
}

/// Reflection trigger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionConfig {
    /// Interactions before a reflection is due
    pub interaction_threshold: u32,
    /// Longest gap between reflections, in ms
    pub max_interval_ms: u64,
    /// Most recent episodic memories a reflection looks at
    pub recent_memory_window: usize,
    /// Importance given to each stored insight
    pub insight_importance: f64,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            interaction_threshold: DEFAULT_INTERACTION_THRESHOLD,
            max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
            recent_memory_window: 20,
            insight_importance: INSIGHT_IMPORTANCE,
        }
    }
}

/// Oracle call configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Per-call timeout before the fallback value is used
    pub timeout_ms: u64,
    /// Line spoken when the oracle cannot produce one
    pub fallback_utterance: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            fallback_utterance: "Hmm, let me think about that.".to_string(),
        }
    }
}

/// Id generation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    pub mode: IdMode,
}
