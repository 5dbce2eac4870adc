//! Offline oracle driven by keyword heuristics.
//!
//! Deterministic and instant, so it backs the `agent_sim` binary and tests.
//! Scores start at the neutral 5 and move one point per matching keyword.

use async_trait::async_trait;

use agent_model::{AgentProfile, ConversationHistory, MemoryRecord};

use super::{Oracle, OracleRequest, OracleResponse, NEUTRAL_SCORE};
use crate::error::OracleError;

const IMPORTANCE_KEYWORDS: &[&str] = &[
    "critical",
    "important",
    "urgent",
    "significant",
    "essential",
    "remember",
    "don't forget",
    "must",
    "need",
    "should",
];

const PRIORITY_KEYWORDS: &[&str] = &[
    "urgent",
    "important",
    "critical",
    "essential",
    "immediate",
    "high priority",
    "asap",
    "deadline",
    "crucial",
    "vital",
];

const POSITIVE_KEYWORDS: &[&str] = &["thank", "appreciate", "good", "great", "excellent", "helpful"];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "bad",
    "unhelpful",
    "confusing",
    "wrong",
    "incorrect",
    "misunderstood",
];

const COPULAS: &[&str] = &["is", "are", "was", "were"];

const PLAN_STEPS: &[&str] = &[
    "Research and gather information",
    "Analyze available options",
    "Make a decision based on analysis",
    "Implement the chosen solution",
    "Evaluate results and adjust if needed",
];

const INSIGHTS: &[&str] = &[
    "I should pay more attention to details in conversations",
    "It seems I have recurring interests in certain topics",
    "I notice patterns in how I respond to questions",
];

/// Characters of conversation kept in a learned fact
const KNOWLEDGE_EXCERPT_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordOracle;

impl KeywordOracle {
    pub fn new() -> Self {
        Self
    }

    pub fn importance(&self, text: &str) -> f64 {
        (NEUTRAL_SCORE + count_matches(text, IMPORTANCE_KEYWORDS) as f64).min(10.0)
    }

    pub fn priority(&self, goal: &str) -> f64 {
        (NEUTRAL_SCORE + count_matches(goal, PRIORITY_KEYWORDS) as f64).min(10.0)
    }

    /// Never below 1: even a rude exchange is an exchange
    pub fn interaction_quality(&self, text: &str) -> f64 {
        let positive = count_matches(text, POSITIVE_KEYWORDS) as f64;
        let negative = count_matches(text, NEGATIVE_KEYWORDS) as f64;
        (NEUTRAL_SCORE + positive - negative).clamp(1.0, 10.0)
    }

    /// A fact worth keeping, if the last three lines state one
    pub fn semantic_knowledge(&self, history: &ConversationHistory) -> Option<String> {
        if history.len() < 3 {
            return None;
        }
        let recent = history[history.len() - 3..]
            .iter()
            .map(|entry| entry.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let states_fact = words(&recent).any(|word| COPULAS.contains(&word.as_str()));
        if !states_fact {
            return None;
        }
        let excerpt: String = recent.chars().take(KNOWLEDGE_EXCERPT_CHARS).collect();
        Some(format!("Learned from conversation: {}...", excerpt))
    }

    pub fn plan_steps(&self, _goal: &str) -> Vec<String> {
        PLAN_STEPS.iter().map(|s| s.to_string()).collect()
    }

    pub fn insights(&self, memories: &[MemoryRecord]) -> Vec<String> {
        if memories.is_empty() {
            return Vec::new();
        }
        INSIGHTS.iter().map(|s| s.to_string()).collect()
    }

    pub fn utterance(&self, profile: &AgentProfile, history: &ConversationHistory) -> String {
        if history.is_empty() {
            return format!("Hello, I'm {}. How can I help you?", profile.first_name);
        }

        let own_name = profile.full_name();
        let Some(last) = history.iter().rev().find(|entry| entry.speaker != own_name) else {
            return "I'm not sure what you're asking. Could you please clarify?".to_string();
        };
        let text = last.text.to_lowercase();

        if words(&text).any(|w| w == "hello" || w == "hi") {
            let occupation = profile.occupation.as_deref().unwrap_or("person");
            let interests = if profile.traits.is_empty() {
                "various things".to_string()
            } else {
                profile.traits.join(", ")
            };
            return format!(
                "Hello! Nice to meet you. I'm {}, a {} with interests in {}.",
                profile.first_name, occupation, interests
            );
        }
        if text.contains("how are you") {
            return "I'm doing well, thank you for asking! How about yourself?".to_string();
        }
        if text.contains('?') {
            let background = profile.background.as_deref().unwrap_or("has my background");
            return format!(
                "That's an interesting question. As someone who {}, I would say it depends on the context.",
                background
            );
        }
        format!(
            "I understand what you're saying. From my perspective as {}, I think it's important to consider different viewpoints.",
            profile.first_name
        )
    }
}

#[async_trait]
impl Oracle for KeywordOracle {
    async fn respond(&self, request: OracleRequest) -> Result<OracleResponse, OracleError> {
        let response = match request {
            OracleRequest::Utterance { profile, history, .. } => {
                OracleResponse::Utterance(self.utterance(&profile, &history))
            }
            OracleRequest::EvaluateImportance { text } => {
                OracleResponse::Importance(self.importance(&text))
            }
            OracleRequest::ExtractSemanticKnowledge { history } => {
                OracleResponse::SemanticKnowledge(self.semantic_knowledge(&history))
            }
            OracleRequest::GeneratePlanSteps { goal } => {
                OracleResponse::PlanSteps(self.plan_steps(&goal))
            }
            OracleRequest::EvaluatePriority { goal } => {
                OracleResponse::Priority(self.priority(&goal))
            }
            OracleRequest::GenerateReflectionInsights { memories } => {
                OracleResponse::ReflectionInsights(self.insights(&memories))
            }
            OracleRequest::EvaluateInteractionQuality { text } => {
                OracleResponse::InteractionQuality(self.interaction_quality(&text))
            }
        };
        Ok(response)
    }
}

fn count_matches(text: &str, keywords: &[&str]) -> usize {
    let text = text.to_lowercase();
    keywords.iter().filter(|k| text.contains(*k)).count()
}

/// Lowercased alphabetic words
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphabetic() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_model::ConversationEntry;

    fn history(lines: &[(&str, &str)]) -> ConversationHistory {
        lines
            .iter()
            .map(|(speaker, text)| ConversationEntry::new(*speaker, *text))
            .collect()
    }

    #[test]
    fn test_importance_counts_keywords() {
        let oracle = KeywordOracle::new();
        assert_eq!(oracle.importance("nice weather"), 5.0);
        assert_eq!(oracle.importance("This is URGENT and important"), 7.0);
        let everything = IMPORTANCE_KEYWORDS.join(" ");
        assert_eq!(oracle.importance(&everything), 10.0);
    }

    #[test]
    fn test_priority_counts_keywords() {
        let oracle = KeywordOracle::new();
        assert_eq!(oracle.priority("learn the piano"), 5.0);
        assert_eq!(oracle.priority("finish report before deadline asap"), 7.0);
    }

    #[test]
    fn test_interaction_quality_bounds() {
        let oracle = KeywordOracle::new();
        assert_eq!(oracle.interaction_quality("thank you, great help"), 7.0);
        assert_eq!(
            oracle.interaction_quality("bad, wrong, incorrect, confusing, unhelpful"),
            1.0
        );
        assert_eq!(oracle.interaction_quality("ok"), 5.0);
    }

    #[test]
    fn test_semantic_knowledge_needs_three_lines() {
        let oracle = KeywordOracle::new();
        let short = history(&[("A", "The sky is blue"), ("B", "Yes")]);
        assert_eq!(oracle.semantic_knowledge(&short), None);

        let long = history(&[("A", "Hi"), ("B", "The market was busy"), ("A", "Oh")]);
        assert_eq!(
            oracle.semantic_knowledge(&long).as_deref(),
            Some("Learned from conversation: Hi The market was busy Oh...")
        );

        let no_fact = history(&[("A", "Hi"), ("B", "Hello"), ("A", "Bye")]);
        assert_eq!(oracle.semantic_knowledge(&no_fact), None);
    }

    #[test]
    fn test_semantic_knowledge_truncates() {
        let oracle = KeywordOracle::new();
        let long_line = "x".repeat(150);
        let h = history(&[("A", "it is"), ("B", &long_line), ("A", "ok")]);
        let fact = oracle.semantic_knowledge(&h).unwrap();
        assert_eq!(
            fact.chars().count(),
            "Learned from conversation: ".len() + 100 + 3
        );
    }

    #[test]
    fn test_utterance_branches() {
        let oracle = KeywordOracle::new();
        let profile = AgentProfile::new("a1", "Ada", "Lovelace").with_occupation("mathematician");

        assert!(oracle.utterance(&profile, &Vec::new()).starts_with("Hello, I'm Ada."));
        assert!(oracle
            .utterance(&profile, &history(&[("Bob", "hi there")]))
            .contains("a mathematician"));
        assert!(oracle
            .utterance(&profile, &history(&[("Bob", "What do you think?")]))
            .starts_with("That's an interesting question."));
        assert!(oracle
            .utterance(&profile, &history(&[("Ada Lovelace", "Anyone?")]))
            .starts_with("I'm not sure"));
    }

    #[tokio::test]
    async fn test_respond_matches_request_shape() {
        let oracle = KeywordOracle::new();
        let response = oracle
            .respond(OracleRequest::GeneratePlanSteps { goal: "g".into() })
            .await
            .unwrap();
        assert!(matches!(response, OracleResponse::PlanSteps(ref steps) if steps.len() == 5));

        let response = oracle
            .respond(OracleRequest::GenerateReflectionInsights { memories: Vec::new() })
            .await
            .unwrap();
        assert_eq!(response, OracleResponse::ReflectionInsights(Vec::new()));
    }
}
