//! Formatter trait: converts a turn sequence into a provider wire payload.
//!
//! Formatters are consumed by sessions, never by the processing unit itself.
//! Implementations: Alpaca, Llama3 (base, instruct, chat), OpenAI chat
//! (`llmpu-formatters`).

use serde::{Deserialize, Serialize};

use crate::turn::Turn;

/// One element of a formatted chat payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A prompt formatting strategy.
pub trait Formatter: Send + Sync {
    /// Short identifier (e.g., "alpaca", "llama3_instruct").
    fn name(&self) -> &str;

    /// Rewrite `turns` into the provider-specific message list.
    fn apply(&self, turns: &[Turn]) -> Vec<WireMessage>;

    /// Whether this format substitutes character names for roles.
    fn supports_personas(&self) -> bool {
        false
    }

    /// Sequences that should end generation for this format.
    fn stop_words(&self) -> Vec<String> {
        Vec::new()
    }
}
