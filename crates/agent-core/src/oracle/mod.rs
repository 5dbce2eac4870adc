//! Oracle boundary
//!
//! Everything "intelligent" an agent does (speaking, judging importance,
//! planning, reflecting) is delegated to an [`Oracle`]. The engine never
//! trusts it: every call goes through [`OracleClient`], which bounds latency,
//! checks the response shape, clamps scores, and falls back to a neutral
//! value when anything goes wrong.

pub mod keyword;

pub use keyword::KeywordOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use agent_model::{AgentProfile, ConversationHistory, MemoryRecord, PlanRecord};

use crate::components::clamp_score;
use crate::config::OracleConfig;
use crate::error::OracleError;

/// Score used whenever an importance, priority or quality call fails
pub const NEUTRAL_SCORE: f64 = 5.0;

/// One request to the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OracleRequest {
    /// Produce the agent's next line of dialogue
    Utterance {
        profile: AgentProfile,
        history: ConversationHistory,
        relevant_memories: Vec<MemoryRecord>,
        current_plans: Vec<PlanRecord>,
    },
    EvaluateImportance {
        text: String,
    },
    ExtractSemanticKnowledge {
        history: ConversationHistory,
    },
    GeneratePlanSteps {
        goal: String,
    },
    EvaluatePriority {
        goal: String,
    },
    GenerateReflectionInsights {
        memories: Vec<MemoryRecord>,
    },
    EvaluateInteractionQuality {
        text: String,
    },
}

impl OracleRequest {
    pub fn name(&self) -> &'static str {
        match self {
            OracleRequest::Utterance { .. } => "utterance",
            OracleRequest::EvaluateImportance { .. } => "evaluate_importance",
            OracleRequest::ExtractSemanticKnowledge { .. } => "extract_semantic_knowledge",
            OracleRequest::GeneratePlanSteps { .. } => "generate_plan_steps",
            OracleRequest::EvaluatePriority { .. } => "evaluate_priority",
            OracleRequest::GenerateReflectionInsights { .. } => "generate_reflection_insights",
            OracleRequest::EvaluateInteractionQuality { .. } => "evaluate_interaction_quality",
        }
    }
}

/// The oracle's answer, one variant per request shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum OracleResponse {
    Utterance(String),
    Importance(f64),
    SemanticKnowledge(Option<String>),
    PlanSteps(Vec<String>),
    Priority(f64),
    ReflectionInsights(Vec<String>),
    InteractionQuality(f64),
}

impl OracleResponse {
    pub fn name(&self) -> &'static str {
        match self {
            OracleResponse::Utterance(_) => "utterance",
            OracleResponse::Importance(_) => "importance",
            OracleResponse::SemanticKnowledge(_) => "semantic_knowledge",
            OracleResponse::PlanSteps(_) => "plan_steps",
            OracleResponse::Priority(_) => "priority",
            OracleResponse::ReflectionInsights(_) => "reflection_insights",
            OracleResponse::InteractionQuality(_) => "interaction_quality",
        }
    }
}

/// External language-generation collaborator
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn respond(&self, request: OracleRequest) -> Result<OracleResponse, OracleError>;
}

/// Guarded access to an [`Oracle`]. Cheap to clone.
#[derive(Clone)]
pub struct OracleClient {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    fallback_utterance: String,
}

impl std::fmt::Debug for OracleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleClient")
            .field("timeout", &self.timeout)
            .field("fallback_utterance", &self.fallback_utterance)
            .finish_non_exhaustive()
    }
}

impl OracleClient {
    pub fn new(oracle: Arc<dyn Oracle>, config: &OracleConfig) -> Self {
        Self {
            oracle,
            timeout: Duration::from_millis(config.timeout_ms.max(1)),
            fallback_utterance: config.fallback_utterance.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one request, bounded by the configured timeout
    pub async fn call(&self, request: OracleRequest) -> Result<OracleResponse, OracleError> {
        match tokio::time::timeout(self.timeout, self.oracle.respond(request)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    pub async fn generate_utterance(
        &self,
        profile: &AgentProfile,
        history: &ConversationHistory,
        relevant_memories: Vec<MemoryRecord>,
        current_plans: Vec<PlanRecord>,
    ) -> String {
        let request = OracleRequest::Utterance {
            profile: profile.clone(),
            history: history.clone(),
            relevant_memories,
            current_plans,
        };
        match self.call(request).await {
            Ok(OracleResponse::Utterance(text)) => text,
            other => self.recover("utterance", other, self.fallback_utterance.clone()),
        }
    }

    pub async fn evaluate_importance(&self, text: &str) -> f64 {
        let request = OracleRequest::EvaluateImportance { text: text.to_string() };
        match self.call(request).await {
            Ok(OracleResponse::Importance(score)) => clamp_score(score),
            other => self.recover("importance", other, NEUTRAL_SCORE),
        }
    }

    pub async fn extract_semantic_knowledge(&self, history: &ConversationHistory) -> Option<String> {
        let request = OracleRequest::ExtractSemanticKnowledge { history: history.clone() };
        match self.call(request).await {
            Ok(OracleResponse::SemanticKnowledge(knowledge)) => knowledge,
            other => self.recover("semantic_knowledge", other, None),
        }
    }

    pub async fn generate_plan_steps(&self, goal: &str) -> Vec<String> {
        let request = OracleRequest::GeneratePlanSteps { goal: goal.to_string() };
        match self.call(request).await {
            Ok(OracleResponse::PlanSteps(steps)) => steps,
            other => self.recover("plan_steps", other, Vec::new()),
        }
    }

    pub async fn evaluate_priority(&self, goal: &str) -> f64 {
        let request = OracleRequest::EvaluatePriority { goal: goal.to_string() };
        match self.call(request).await {
            Ok(OracleResponse::Priority(score)) => clamp_score(score),
            other => self.recover("priority", other, NEUTRAL_SCORE),
        }
    }

    pub async fn generate_reflection_insights(&self, memories: &[MemoryRecord]) -> Vec<String> {
        let request = OracleRequest::GenerateReflectionInsights { memories: memories.to_vec() };
        match self.call(request).await {
            Ok(OracleResponse::ReflectionInsights(insights)) => insights,
            other => self.recover("reflection_insights", other, Vec::new()),
        }
    }

    pub async fn evaluate_interaction_quality(&self, text: &str) -> f64 {
        let request = OracleRequest::EvaluateInteractionQuality { text: text.to_string() };
        match self.call(request).await {
            Ok(OracleResponse::InteractionQuality(score)) => clamp_score(score),
            other => self.recover("interaction_quality", other, NEUTRAL_SCORE),
        }
    }

    /// Log why the oracle's answer was unusable and hand back the fallback
    fn recover<T>(
        &self,
        expected: &'static str,
        result: Result<OracleResponse, OracleError>,
        fallback: T,
    ) -> T {
        let error = match result {
            Ok(response) => OracleError::UnexpectedResponse {
                expected,
                got: response.name(),
            },
            Err(error) => error,
        };
        tracing::warn!(call = expected, %error, "oracle call failed, using fallback");
        fallback
    }
}
