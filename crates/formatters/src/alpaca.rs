//! Alpaca instruction format.
//!
//! See <https://github.com/tatsu-lab/stanford_alpaca>.

use llmpu_core::turn::roles;
use llmpu_core::{Formatter, Turn, WireMessage};

/// Rewrites turns into `### Instruction:` / `### Input:` / `### Response:` blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlpacaFormatter;

impl Formatter for AlpacaFormatter {
    fn name(&self) -> &str {
        "alpaca"
    }

    fn apply(&self, turns: &[Turn]) -> Vec<WireMessage> {
        let mut result: Vec<WireMessage> = turns
            .iter()
            .map(|turn| match turn.role.as_str() {
                roles::USER => WireMessage::new(
                    roles::USER,
                    format!("### Instruction:\n{}\n\n", turn.content),
                ),
                roles::INPUT => {
                    WireMessage::new(roles::INPUT, format!("### Input:\n{}\n\n", turn.content))
                }
                _ => WireMessage::new(
                    roles::ASSISTANT,
                    format!("### Response:\n{}\n\n", turn.content),
                ),
            })
            .collect();

        // A trailing instruction needs an open response block to answer into
        if result
            .last()
            .is_some_and(|m| m.role == roles::USER || m.role == roles::INPUT)
        {
            result.push(WireMessage::new(roles::ASSISTANT, "### Response:\n"));
        }

        result
    }

    fn stop_words(&self) -> Vec<String> {
        vec!["### Instruction:\n".into()]
    }
}
