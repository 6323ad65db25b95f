//! Memory system for LLMpu.
//!
//! Memory is a tree of named locations. Every leaf is an ordered sequence of
//! [`Turn`](llmpu_core::Turn)s that can be pushed to and popped from; every
//! interior node maps keys to children. The whole tree is persisted as one
//! JSON document.

pub mod file_backend;
pub mod path;
pub mod store;

pub use path::MemoryPath;
pub use store::{MemoryEntry, MemoryStore};
