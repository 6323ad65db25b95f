//! Prompt formatter implementations for LLMpu.
//!
//! All formatters implement the `llmpu_core::Formatter` trait. The set of
//! available formats is closed and enumerated by [`PromptFormat`].

pub mod alpaca;
pub mod llama3;
pub mod oai_chat;

pub use alpaca::AlpacaFormatter;
pub use llama3::{Llama3ChatFormatter, Llama3Formatter, Llama3InstructFormatter, Personas};
pub use oai_chat::OaiChatFormatter;

use llmpu_core::Formatter;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The prompt formats a session can be configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptFormat {
    #[default]
    Alpaca,
    Llama3,
    Llama3Instruct,
    Llama3Chat,
    #[serde(rename = "oaichat")]
    OaiChat,
}

impl PromptFormat {
    pub const ALL: [PromptFormat; 5] = [
        PromptFormat::Alpaca,
        PromptFormat::Llama3,
        PromptFormat::Llama3Instruct,
        PromptFormat::Llama3Chat,
        PromptFormat::OaiChat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PromptFormat::Alpaca => "alpaca",
            PromptFormat::Llama3 => "llama3",
            PromptFormat::Llama3Instruct => "llama3_instruct",
            PromptFormat::Llama3Chat => "llama3_chat",
            PromptFormat::OaiChat => "oaichat",
        }
    }

    /// Build the formatter. `personas` is only used by formats that support them.
    pub fn build(self, personas: &Personas) -> Box<dyn Formatter> {
        match self {
            PromptFormat::Alpaca => Box::new(AlpacaFormatter),
            PromptFormat::Llama3 => Box::new(Llama3Formatter),
            PromptFormat::Llama3Instruct => Box::new(Llama3InstructFormatter::new()),
            PromptFormat::Llama3Chat => {
                Box::new(Llama3ChatFormatter::with_personas(personas.clone()))
            }
            PromptFormat::OaiChat => Box::new(OaiChatFormatter),
        }
    }
}

impl std::fmt::Display for PromptFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown prompt format '{0}' (expected one of: alpaca, llama3, llama3_instruct, llama3_chat, oaichat)")]
pub struct UnknownPromptFormat(pub String);

impl FromStr for PromptFormat {
    type Err = UnknownPromptFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PromptFormat::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPromptFormat(s.to_string()))
    }
}
