//! # LLMpu Core
//!
//! Domain types, traits, and error definitions for the LLMpu processing unit.
//! This crate has **no transport or storage dependencies**; it defines the
//! vocabulary every other crate speaks.
//!
//! ## Design Philosophy
//!
//! An instruct-tuned LLM is treated like the ALU of a small 8-bit style
//! processor: registers hold [`Turn`]s, a hierarchical memory holds turn
//! sequences, and a [`Session`] evaluates a composed context.
//!
//! The collaborators the processing unit depends on are defined here as
//! traits. Implementations live in their respective crates:
//! - [`Session`] — `llmpu-sessions`
//! - [`Formatter`] — `llmpu-formatters`

pub mod error;
pub mod formatter;
pub mod session;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, RegisterError, Result, SessionError};
pub use formatter::{Formatter, WireMessage};
pub use session::{Session, SessionReply};
pub use turn::Turn;
