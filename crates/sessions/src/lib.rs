//! Session implementations for LLMpu.
//!
//! All sessions implement the `llmpu_core::Session` trait. [`build_from_config`]
//! selects and configures one from an `AppConfig`.

pub mod factory;
pub mod openai_compat;

pub use factory::{SessionKind, build_from_config};
pub use openai_compat::OpenAiCompatSession;
