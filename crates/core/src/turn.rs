//! The `Turn` value type: one role-tagged unit of conversation text.
//!
//! Turns are the leaf unit of all processing-unit state: registers hold them,
//! memory locations hold sequences of them, and sessions send and receive them.

use serde::{Deserialize, Serialize};

/// Well-known role tags. The set is open-ended; providers may define others.
pub mod roles {
    pub const SYSTEM: &str = "system";
    pub const USER: &str = "user";
    pub const INPUT: &str = "input";
    pub const ASSISTANT: &str = "assistant";
}

/// A single role-tagged piece of conversation.
///
/// Serializes as exactly `{"role": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn (`system`, `user`, `input`, `assistant`, ...)
    pub role: String,

    /// The text payload
    pub content: String,
}

impl Turn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a system prompt turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(roles::SYSTEM, content)
    }

    /// Create a user (instruction) turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(roles::USER, content)
    }

    /// Create an input turn (supplementary data attached to an instruction).
    pub fn input(content: impl Into<String>) -> Self {
        Self::new(roles::INPUT, content)
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(roles::ASSISTANT, content)
    }
}

impl std::fmt::Display for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.role, self.content)
    }
}
