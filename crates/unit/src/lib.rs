//! The LLM processing unit.
//!
//! Treats an instruct-trained LLM as the ALU of a very simple 8-bit style
//! processor. Registers are provided for the system prompt, the instruction,
//! the last result, and a configurable number of contexts. Memory locations
//! are paths through a tree whose leaves are stacks of turns. `evaluate`
//! sends the turns in the selected registers to the model and places the
//! answer in the result register.

pub mod register;
pub mod snapshot;
pub mod unit;

#[cfg(test)]
mod test_helpers;

pub use register::{FixedRegister, RegisterBank, RegisterName, Slot};
pub use snapshot::{RegisterSnapshot, UnitSnapshot};
pub use unit::{DEFAULT_CONTEXT_REGISTERS, DEFAULT_EVALUATE_REGISTERS, ProcessingUnit};
