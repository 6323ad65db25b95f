//! Read-only diagnostic view of a processing unit.

use chrono::{DateTime, Utc};
use llmpu_core::Turn;
use llmpu_memory::{MemoryPath, MemoryStore};
use serde::{Deserialize, Serialize};

/// One register as seen at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterSnapshot {
    pub name: String,

    /// Resolved contents; `None` when the register is empty
    pub turns: Option<Vec<Turn>>,

    /// Memory path the register is aliased to, if loaded from memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<MemoryPath>,
}

/// A copy of every register and the whole memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub captured_at: DateTime<Utc>,
    pub context_registers: usize,
    pub registers: Vec<RegisterSnapshot>,
    pub memory: MemoryStore,
}

impl UnitSnapshot {
    pub fn register(&self, name: &str) -> Option<&RegisterSnapshot> {
        self.registers.iter().find(|r| r.name == name)
    }

    pub fn registers_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.registers)
    }

    pub fn memory_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.memory)
    }
}
