//! The register bank.
//!
//! Register names are fixed when the bank is built: `system`, `instruction`,
//! `result`, and `context0..contextN-1`. Referencing any other name is an
//! error, never a silent no-op.

use llmpu_core::error::RegisterError;
use llmpu_core::Turn;
use llmpu_memory::{MemoryPath, MemoryStore};
use std::str::FromStr;

/// A register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterName {
    /// The system prompt
    System,
    /// The instruction being evaluated
    Instruction,
    /// The last evaluation result
    Result,
    /// A numbered context register
    Context(usize),
}

impl std::fmt::Display for RegisterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterName::System => f.write_str("system"),
            RegisterName::Instruction => f.write_str("instruction"),
            RegisterName::Result => f.write_str("result"),
            RegisterName::Context(idx) => write!(f, "context{idx}"),
        }
    }
}

impl FromStr for RegisterName {
    type Err = RegisterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(RegisterName::System),
            "instruction" => Ok(RegisterName::Instruction),
            "result" => Ok(RegisterName::Result),
            other => other
                .strip_prefix("context")
                .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|digits| digits.parse().ok())
                .map(RegisterName::Context)
                .ok_or_else(|| RegisterError::Unknown(other.to_string())),
        }
    }
}

/// The registers every bank has, whatever its context count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedRegister {
    System,
    Instruction,
    Result,
}

impl From<FixedRegister> for RegisterName {
    fn from(reg: FixedRegister) -> Self {
        match reg {
            FixedRegister::System => RegisterName::System,
            FixedRegister::Instruction => RegisterName::Instruction,
            FixedRegister::Result => RegisterName::Result,
        }
    }
}

/// What a register currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Slot {
    #[default]
    Empty,
    /// Turns owned by the register
    Turns(Vec<Turn>),
    /// A live view of a memory leaf; reads resolve the path each time
    Aliased(MemoryPath),
}

impl Slot {
    /// Resolve the slot's turns. An alias whose leaf no longer exists reads
    /// as empty.
    pub fn turns<'a>(&'a self, memory: &'a MemoryStore) -> Option<&'a [Turn]> {
        match self {
            Slot::Empty => None,
            Slot::Turns(turns) => Some(turns),
            Slot::Aliased(path) => memory.leaf(path).ok(),
        }
    }

    pub fn alias(&self) -> Option<&MemoryPath> {
        match self {
            Slot::Aliased(path) => Some(path),
            _ => None,
        }
    }
}

/// The fixed set of registers of one processing unit.
#[derive(Debug, Clone)]
pub struct RegisterBank {
    system: Slot,
    instruction: Slot,
    result: Slot,
    contexts: Vec<Slot>,
}

impl RegisterBank {
    /// Create a bank with `context_registers` context slots, all empty.
    pub fn new(context_registers: usize) -> Self {
        Self {
            system: Slot::Empty,
            instruction: Slot::Empty,
            result: Slot::Empty,
            contexts: vec![Slot::Empty; context_registers],
        }
    }

    pub fn context_registers(&self) -> usize {
        self.contexts.len()
    }

    /// Parse a register name and check it exists in this bank.
    pub fn resolve(&self, name: &str) -> Result<RegisterName, RegisterError> {
        self.check(name.parse()?)
    }

    /// Check `name` exists in this bank.
    pub fn check(&self, name: RegisterName) -> Result<RegisterName, RegisterError> {
        match name {
            RegisterName::Context(idx) if idx >= self.contexts.len() => {
                Err(RegisterError::Unknown(name.to_string()))
            }
            _ => Ok(name),
        }
    }

    pub fn slot(&self, name: RegisterName) -> Result<&Slot, RegisterError> {
        match name {
            RegisterName::System => Ok(&self.system),
            RegisterName::Instruction => Ok(&self.instruction),
            RegisterName::Result => Ok(&self.result),
            RegisterName::Context(idx) => self
                .contexts
                .get(idx)
                .ok_or_else(|| RegisterError::Unknown(name.to_string())),
        }
    }

    fn slot_mut(&mut self, name: RegisterName) -> Result<&mut Slot, RegisterError> {
        match name {
            RegisterName::System => Ok(&mut self.system),
            RegisterName::Instruction => Ok(&mut self.instruction),
            RegisterName::Result => Ok(&mut self.result),
            RegisterName::Context(idx) => self
                .contexts
                .get_mut(idx)
                .ok_or_else(|| RegisterError::Unknown(name.to_string())),
        }
    }

    /// Replace the contents of a register.
    pub fn set(&mut self, name: RegisterName, slot: Slot) -> Result<(), RegisterError> {
        *self.slot_mut(name)? = slot;
        Ok(())
    }

    /// Replace a register's contents with a single turn.
    pub fn set_turn(&mut self, name: RegisterName, turn: Turn) -> Result<(), RegisterError> {
        self.set(name, Slot::Turns(vec![turn]))
    }

    /// Replace a fixed register's contents with a single turn.
    pub fn set_fixed(&mut self, reg: FixedRegister, turn: Turn) {
        let slot = match reg {
            FixedRegister::System => &mut self.system,
            FixedRegister::Instruction => &mut self.instruction,
            FixedRegister::Result => &mut self.result,
        };
        *slot = Slot::Turns(vec![turn]);
    }

    pub fn clear(&mut self, name: RegisterName) -> Result<(), RegisterError> {
        self.set(name, Slot::Empty)
    }

    /// All register names in bank order.
    pub fn names(&self) -> impl Iterator<Item = RegisterName> + '_ {
        [
            RegisterName::System,
            RegisterName::Instruction,
            RegisterName::Result,
        ]
        .into_iter()
        .chain((0..self.contexts.len()).map(RegisterName::Context))
    }
}
