//! Conversation history passed to agents when they speak.

use serde::{Deserialize, Serialize};

/// One line of dialogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: String,
    pub text: String,
}

impl ConversationEntry {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// Ordered dialogue, oldest first
pub type ConversationHistory = Vec<ConversationEntry>;
