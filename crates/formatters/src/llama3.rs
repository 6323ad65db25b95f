//! Llama3 prompt formats: base, instruct, and chat with personas.
//!
//! See <https://llama.meta.com/docs/model-cards-and-prompt-formats/meta-llama-3/>.

use llmpu_core::turn::roles;
use llmpu_core::{Formatter, Turn, WireMessage};
use serde::{Deserialize, Serialize};

const BEGIN_OF_TEXT: &str = "<|begin_of_text|>";
const END_OF_TEXT: &str = "<|end_of_text|>";
const EOT_ID: &str = "<|eot_id|>";

fn header(role: &str) -> String {
    format!("<|start_header_id|>{role}<|end_header_id|>")
}

/// Llama3 base (completion) format: every turn's content concatenated into a
/// single user message after the BOS token.
#[derive(Debug, Clone, Copy, Default)]
pub struct Llama3Formatter;

impl Formatter for Llama3Formatter {
    fn name(&self) -> &str {
        "llama3"
    }

    fn apply(&self, turns: &[Turn]) -> Vec<WireMessage> {
        let content: String = turns.iter().map(|t| t.content.as_str()).collect();
        vec![WireMessage::new(roles::USER, format!("{BEGIN_OF_TEXT}{content}"))]
    }

    fn stop_words(&self) -> Vec<String> {
        vec![END_OF_TEXT.into()]
    }
}

/// Maps turn roles to the names written into Llama3 headers.
#[derive(Debug, Clone)]
struct HeaderRoles {
    system: String,
    user: String,
    assistant: String,
}

impl HeaderRoles {
    fn plain() -> Self {
        Self {
            system: roles::SYSTEM.into(),
            user: roles::USER.into(),
            assistant: roles::ASSISTANT.into(),
        }
    }

    fn header_role<'a>(&'a self, role: &'a str) -> &'a str {
        match role {
            roles::SYSTEM => self.system.as_str(),
            roles::USER | roles::INPUT => self.user.as_str(),
            roles::ASSISTANT => self.assistant.as_str(),
            other => other,
        }
    }

    fn render(&self, turns: &[Turn]) -> Vec<WireMessage> {
        let mut result: Vec<WireMessage> = turns
            .iter()
            .map(|turn| {
                WireMessage::new(
                    turn.role.clone(),
                    format!(
                        "{}\n\n{}{EOT_ID}",
                        header(self.header_role(&turn.role)),
                        turn.content
                    ),
                )
            })
            .collect();

        // Open assistant header so the model answers as the assistant
        result.push(WireMessage::new(roles::ASSISTANT, header(&self.assistant)));

        if let Some(first) = result.first_mut() {
            first.content.insert_str(0, BEGIN_OF_TEXT);
        }

        result
    }
}

/// Llama3 instruct format: one header-delimited message per turn.
#[derive(Debug, Clone)]
pub struct Llama3InstructFormatter {
    roles: HeaderRoles,
}

impl Llama3InstructFormatter {
    pub fn new() -> Self {
        Self {
            roles: HeaderRoles::plain(),
        }
    }
}

impl Default for Llama3InstructFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for Llama3InstructFormatter {
    fn name(&self) -> &str {
        "llama3_instruct"
    }

    fn apply(&self, turns: &[Turn]) -> Vec<WireMessage> {
        self.roles.render(turns)
    }

    fn stop_words(&self) -> Vec<String> {
        vec![EOT_ID.into(), END_OF_TEXT.into()]
    }
}

/// Character names substituted into role headers by persona-aware formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personas {
    /// Character speaking the user/input turns
    #[serde(default = "default_user_persona")]
    pub user: String,

    /// Character speaking the assistant turns
    #[serde(default = "default_assistant_persona")]
    pub assistant: String,
}

fn default_user_persona() -> String {
    "Alice".into()
}
fn default_assistant_persona() -> String {
    "Bob".into()
}

impl Default for Personas {
    fn default() -> Self {
        Self {
            user: default_user_persona(),
            assistant: default_assistant_persona(),
        }
    }
}

/// Llama3 chat format with personas: headers read `user(Alice)` and
/// `assistant(Bob)` instead of the bare role names.
#[derive(Debug, Clone)]
pub struct Llama3ChatFormatter {
    roles: HeaderRoles,
    personas: Personas,
}

impl Llama3ChatFormatter {
    pub fn new() -> Self {
        Self::with_personas(Personas::default())
    }

    pub fn with_personas(personas: Personas) -> Self {
        let mut formatter = Self {
            roles: HeaderRoles::plain(),
            personas: Personas::default(),
        };
        formatter.set_personas(personas);
        formatter
    }

    /// Replace the characters used in headers.
    pub fn set_personas(&mut self, personas: Personas) {
        self.roles.user = format!("{}({})", roles::USER, personas.user);
        self.roles.assistant = format!("{}({})", roles::ASSISTANT, personas.assistant);
        self.personas = personas;
    }

    pub fn personas(&self) -> &Personas {
        &self.personas
    }
}

impl Default for Llama3ChatFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for Llama3ChatFormatter {
    fn name(&self) -> &str {
        "llama3_chat"
    }

    fn apply(&self, turns: &[Turn]) -> Vec<WireMessage> {
        self.roles.render(turns)
    }

    fn supports_personas(&self) -> bool {
        true
    }

    fn stop_words(&self) -> Vec<String> {
        vec![EOT_ID.into(), END_OF_TEXT.into()]
    }
}
