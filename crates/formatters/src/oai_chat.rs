//! OpenAI chat format. Turns pass through as role/content messages.

use llmpu_core::{Formatter, Turn, WireMessage};

/// Passthrough formatter for endpoints that apply their own chat template.
#[derive(Debug, Clone, Copy, Default)]
pub struct OaiChatFormatter;

impl Formatter for OaiChatFormatter {
    fn name(&self) -> &str {
        "oaichat"
    }

    fn apply(&self, turns: &[Turn]) -> Vec<WireMessage> {
        turns
            .iter()
            .map(|t| WireMessage::new(t.role.clone(), t.content.clone()))
            .collect()
    }
}
