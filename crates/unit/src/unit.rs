//! The processing unit: registers, memory and evaluate.
//!
//! Typical chat round:
//!
//! ```ignore
//! unit.load_ins(user_input);
//! unit.evaluate(&["system", "context0", "instruction"]).await?;
//! println!("{}", unit.read_result().unwrap());
//! unit.push("instruction", "transcript")?.push("result", "transcript")?;
//! unit.load_context(0, "transcript")?;
//! ```
//!
//! Every fallible operation validates before it mutates, so an error leaves
//! registers and memory exactly as they were.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use llmpu_core::{Result, Session, Turn};
use llmpu_memory::{MemoryPath, MemoryStore};
use tracing::{debug, info};

use crate::register::{FixedRegister, RegisterBank, RegisterName, Slot};
use crate::snapshot::{RegisterSnapshot, UnitSnapshot};

/// Context registers provided when no count is given.
pub const DEFAULT_CONTEXT_REGISTERS: usize = 3;

/// Registers `evaluate_default` composes, in order.
pub const DEFAULT_EVALUATE_REGISTERS: [&str; 3] = ["system", "context0", "instruction"];

/// An LLM driven like a tiny processor.
///
/// Owns its register bank and memory store exclusively; all mutators take
/// `&mut self`. Wrap in a mutex at the boundary if several callers share one.
pub struct ProcessingUnit {
    session: Arc<dyn Session>,
    registers: RegisterBank,
    memory: MemoryStore,
}

impl std::fmt::Debug for ProcessingUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingUnit")
            .field("session", &self.session.name())
            .field("registers", &self.registers)
            .field("memory", &self.memory)
            .finish()
    }
}

impl ProcessingUnit {
    /// Create a unit with the default three context registers and empty memory.
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self::with_context_registers(session, DEFAULT_CONTEXT_REGISTERS)
    }

    pub fn with_context_registers(session: Arc<dyn Session>, context_registers: usize) -> Self {
        Self {
            session,
            registers: RegisterBank::new(context_registers),
            memory: MemoryStore::new(),
        }
    }

    /// Start from an existing memory store.
    pub fn with_memory(mut self, memory: MemoryStore) -> Self {
        self.memory = memory;
        self
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn context_registers(&self) -> usize {
        self.registers.context_registers()
    }

    // --- register loads ---

    /// Load `text` into the system register as a `system` turn.
    pub fn load_sys(&mut self, text: impl Into<String>) -> &mut Self {
        self.load_single(FixedRegister::System, Turn::system(text))
    }

    /// Load `text` into the instruction register as a `user` turn.
    pub fn load_ins(&mut self, text: impl Into<String>) -> &mut Self {
        self.load_single(FixedRegister::Instruction, Turn::user(text))
    }

    fn load_single(&mut self, reg: FixedRegister, turn: Turn) -> &mut Self {
        debug!(register = %RegisterName::from(reg), chars = turn.content.len(), "Loaded register");
        self.registers.set_fixed(reg, turn);
        self
    }

    /// Point context register `index` at the memory leaf `path`.
    ///
    /// The register holds the path, not the turns, and stays a live view of
    /// whatever leaf `path` names at read time. Later pushes and pops on
    /// `path` are visible through it until the register is reloaded,
    /// overwritten or cleared. If the leaf is deleted the register reads as
    /// empty; a later push to `path`, or a [`load`](Self::load) of a store
    /// that has `path`, makes it read the new leaf.
    pub fn load_context(&mut self, index: usize, path: impl Into<MemoryPath>) -> Result<&mut Self> {
        let name = self.registers.check(RegisterName::Context(index))?;
        let path = path.into();
        let len = self.memory.leaf(&path)?.len();

        self.registers.set(name, Slot::Aliased(path.clone()))?;
        debug!(register = %name, path = %path, turns = len, "Loaded context from memory");
        Ok(self)
    }

    // --- register reads ---

    pub fn read_sys(&self) -> Option<&Turn> {
        self.first_turn(RegisterName::System)
    }

    pub fn read_ins(&self) -> Option<&Turn> {
        self.first_turn(RegisterName::Instruction)
    }

    pub fn read_result(&self) -> Option<&Turn> {
        self.first_turn(RegisterName::Result)
    }

    /// The full contents of context register `index`.
    pub fn read_context(&self, index: usize) -> Result<Option<&[Turn]>> {
        let name = self.registers.check(RegisterName::Context(index))?;
        Ok(self.turns(name))
    }

    fn first_turn(&self, name: RegisterName) -> Option<&Turn> {
        self.turns(name).and_then(|turns| turns.first())
    }

    fn turns(&self, name: RegisterName) -> Option<&[Turn]> {
        self.registers
            .slot(name)
            .ok()
            .and_then(|slot| slot.turns(&self.memory))
    }

    // --- register <-> memory ---

    /// Append a copy of the turns in `register` to the memory leaf at `path`,
    /// creating the location if needed.
    pub fn push(&mut self, register: &str, path: impl Into<MemoryPath>) -> Result<&mut Self> {
        let name = self.registers.resolve(register)?;
        let path = path.into();
        let turns = self.turns(name).map(<[Turn]>::to_vec).unwrap_or_default();

        self.memory.push(&path, turns)?;
        debug!(register = %name, path = %path, "Pushed register to memory");
        Ok(self)
    }

    /// Pop the last turn at `path` into `register`, replacing whatever the
    /// register held.
    pub fn pop(&mut self, path: impl Into<MemoryPath>, register: &str) -> Result<&mut Self> {
        let name = self.registers.resolve(register)?;
        let path = path.into();

        let turn = self.memory.pop(&path)?;
        self.registers.set_turn(name, turn)?;
        debug!(register = %name, path = %path, "Popped memory into register");
        Ok(self)
    }

    /// Empty a register.
    pub fn clear_reg(&mut self, register: &str) -> Result<&mut Self> {
        let name = self.registers.resolve(register)?;
        self.registers.clear(name)?;
        debug!(register = %name, "Cleared register");
        Ok(self)
    }

    /// Delete the memory subtree at `path`.
    pub fn clear_mem(&mut self, path: impl Into<MemoryPath>) -> Result<&mut Self> {
        self.memory.clear(&path.into())?;
        Ok(self)
    }

    // --- evaluate ---

    /// Evaluate `system`, `context0`, `instruction`.
    pub async fn evaluate_default(&mut self) -> Result<&mut Self> {
        self.evaluate(&DEFAULT_EVALUATE_REGISTERS).await
    }

    /// Send the turns of `registers`, concatenated in the given order, to the
    /// session and store the reply in `result`.
    pub async fn evaluate(&mut self, registers: &[&str]) -> Result<&mut Self> {
        self.evaluate_with_limit(registers, None).await
    }

    /// As [`evaluate`](Self::evaluate), overriding the session's token limit.
    pub async fn evaluate_with_limit(
        &mut self,
        registers: &[&str],
        token_limit: Option<u32>,
    ) -> Result<&mut Self> {
        let names = registers
            .iter()
            .map(|r| self.registers.resolve(r))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let context: Vec<Turn> = names
            .iter()
            .filter_map(|name| self.turns(*name))
            .flatten()
            .cloned()
            .collect();

        debug!(
            session = self.session.name(),
            registers = ?registers,
            turns = context.len(),
            "Evaluating"
        );

        let session = Arc::clone(&self.session);
        let reply = session.respond(&context, token_limit).await?;

        self.registers.set_fixed(FixedRegister::Result, reply.into());
        Ok(self)
    }

    // --- persistence ---

    /// Save the whole memory store as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.memory.save_to(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Saved memory");
        Ok(())
    }

    /// Replace the whole memory store with the contents of a JSON file.
    ///
    /// A missing file yields an empty store. Aliased context registers
    /// resolve against the new store.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        self.memory = MemoryStore::load_from(path.as_ref())?;
        Ok(self)
    }

    // --- diagnostics ---

    /// Copy out every register and the memory store.
    pub fn snapshot(&self) -> UnitSnapshot {
        let registers = self
            .registers
            .names()
            .map(|name| {
                let slot = self.registers.slot(name).ok();
                RegisterSnapshot {
                    name: name.to_string(),
                    turns: slot.and_then(|s| s.turns(&self.memory)).map(<[Turn]>::to_vec),
                    alias: slot.and_then(Slot::alias).cloned(),
                }
            })
            .collect();

        UnitSnapshot {
            captured_at: Utc::now(),
            context_registers: self.registers.context_registers(),
            registers,
            memory: self.memory.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedSession;
    use llmpu_core::error::{Error, MemoryError, RegisterError, SessionError};
    use tempfile::TempDir;

    fn unit_with(session: &Arc<ScriptedSession>) -> ProcessingUnit {
        ProcessingUnit::new(session.clone())
    }

    #[test]
    fn registers_start_empty() {
        let unit = unit_with(&ScriptedSession::replies(&[]));
        assert!(unit.read_sys().is_none());
        assert!(unit.read_ins().is_none());
        assert!(unit.read_result().is_none());
        for idx in 0..DEFAULT_CONTEXT_REGISTERS {
            assert!(unit.read_context(idx).unwrap().is_none());
        }
    }

    #[test]
    fn load_sys_and_ins_replace_previous_value() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.load_sys("first").load_sys("second").load_ins("do it");

        assert_eq!(unit.read_sys(), Some(&Turn::system("second")));
        assert_eq!(unit.read_ins(), Some(&Turn::user("do it")));
    }

    #[tokio::test]
    async fn evaluate_sends_registers_in_order() {
        let session = ScriptedSession::replies(&["R"]);
        let mut unit = unit_with(&session);

        unit.memory.push(&"empty".into(), Vec::<Turn>::new()).unwrap();
        unit.load_sys("S").load_ins("I");
        unit.load_context(0, "empty").unwrap();
        assert_eq!(unit.read_context(0).unwrap(), Some(&[] as &[Turn]));

        unit.evaluate(&["system", "context0", "instruction"]).await.unwrap();

        assert_eq!(
            session.contexts(),
            vec![vec![Turn::system("S"), Turn::user("I")]]
        );
        assert_eq!(unit.read_result(), Some(&Turn::assistant("R")));
    }

    #[tokio::test]
    async fn evaluate_respects_caller_order() {
        let session = ScriptedSession::replies(&["ok"]);
        let mut unit = unit_with(&session);
        unit.load_sys("S").load_ins("I");

        unit.evaluate(&["instruction", "system"]).await.unwrap();
        assert_eq!(
            session.contexts(),
            vec![vec![Turn::user("I"), Turn::system("S")]]
        );
    }

    #[tokio::test]
    async fn evaluate_with_no_registers_still_calls_session() {
        let session = ScriptedSession::replies(&["hello?"]);
        let mut unit = unit_with(&session);
        unit.load_sys("ignored");

        unit.evaluate(&[]).await.unwrap();
        assert_eq!(session.contexts(), vec![Vec::<Turn>::new()]);
        assert_eq!(unit.read_result().unwrap().content, "hello?");
    }

    #[tokio::test]
    async fn evaluate_flattens_multi_turn_context() {
        let session = ScriptedSession::replies(&["ok"]);
        let mut unit = unit_with(&session);
        unit.memory
            .push(&"chat".into(), [Turn::user("a"), Turn::assistant("b")])
            .unwrap();
        unit.load_context(0, "chat").unwrap().load_ins("c");

        unit.evaluate_default().await.unwrap();
        assert_eq!(
            session.contexts()[0],
            vec![Turn::user("a"), Turn::assistant("b"), Turn::user("c")]
        );
    }

    #[tokio::test]
    async fn evaluate_passes_token_limit() {
        let session = ScriptedSession::replies(&["ok", "ok"]);
        let mut unit = unit_with(&session);

        unit.evaluate_default().await.unwrap();
        unit.evaluate_with_limit(&["instruction"], Some(16)).await.unwrap();
        assert_eq!(session.token_limits(), vec![None, Some(16)]);
    }

    #[tokio::test]
    async fn evaluate_unknown_register_fails_before_session() {
        let session = ScriptedSession::replies(&["unused"]);
        let mut unit = unit_with(&session);

        let err = unit.evaluate(&["system", "context9"]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Register(RegisterError::Unknown(ref name)) if name == "context9"
        ));
        assert!(session.contexts().is_empty());
    }

    #[tokio::test]
    async fn evaluate_failure_leaves_result_untouched() {
        let session = ScriptedSession::new(vec![
            Ok(ScriptedSession::reply("first")),
            Err(SessionError::Api {
                status_code: 503,
                body: "{\"error\":\"busy\"}".into(),
            }),
        ]);
        let mut unit = unit_with(&session);
        unit.load_ins("q");

        unit.evaluate_default().await.unwrap();
        let err = unit.evaluate_default().await.unwrap_err();

        match err {
            Error::Session(SessionError::Api { status_code, body }) => {
                assert_eq!(status_code, 503);
                assert_eq!(body, "{\"error\":\"busy\"}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(unit.read_result(), Some(&Turn::assistant("first")));
        assert_eq!(session.contexts().len(), 2);
    }

    #[test]
    fn load_context_rejects_out_of_range_index() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.memory.push(&"chat".into(), [Turn::user("hi")]).unwrap();

        let err = unit.load_context(3, "chat").unwrap_err();
        assert!(matches!(err, Error::Register(RegisterError::Unknown(_))));
        assert!(unit.read_context(3).is_err());
    }

    #[test]
    fn load_context_requires_existing_leaf() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        let err = unit.load_context(0, "nowhere").unwrap_err();
        assert!(matches!(err, Error::Memory(MemoryError::PathNotFound { .. })));
        assert!(unit.read_context(0).unwrap().is_none());
    }

    #[test]
    fn context_aliases_memory() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.memory.push(&"chat".into(), [Turn::user("hi")]).unwrap();
        unit.load_context(1, "chat").unwrap();

        unit.load_ins("more").push("instruction", "chat").unwrap();
        assert_eq!(
            unit.read_context(1).unwrap().unwrap(),
            [Turn::user("hi"), Turn::user("more")]
        );

        unit.pop("chat", "result").unwrap();
        assert_eq!(unit.read_context(1).unwrap().unwrap(), [Turn::user("hi")]);
        assert_eq!(unit.read_result(), Some(&Turn::user("more")));
    }

    #[test]
    fn reloading_or_clearing_breaks_alias() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.memory.push(&"a".into(), [Turn::user("a")]).unwrap();
        unit.memory.push(&"b".into(), [Turn::user("b")]).unwrap();

        unit.load_context(0, "a").unwrap().load_context(0, "b").unwrap();
        unit.memory.push(&"a".into(), [Turn::user("a2")]).unwrap();
        assert_eq!(unit.read_context(0).unwrap().unwrap(), [Turn::user("b")]);

        unit.clear_reg("context0").unwrap();
        assert!(unit.read_context(0).unwrap().is_none());
        assert_eq!(unit.memory().leaf(&"b".into()).unwrap().len(), 1);
    }

    #[test]
    fn debug_names_session_and_registers() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.load_sys("rules");

        let debug = format!("{unit:?}");
        assert!(debug.contains("\"scripted\""));
        assert!(debug.contains("rules"));
    }

    #[test]
    fn alias_follows_recreated_leaf() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.memory.push(&"chat".into(), [Turn::user("old")]).unwrap();
        unit.load_context(0, "chat").unwrap();

        unit.clear_mem("chat").unwrap();
        assert!(unit.read_context(0).unwrap().is_none());

        unit.load_ins("new").push("instruction", "chat").unwrap();
        assert_eq!(unit.read_context(0).unwrap().unwrap(), [Turn::user("new")]);
    }

    #[test]
    fn alias_binds_to_leaf_of_loaded_store() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("other.json");

        let mut other = MemoryStore::new();
        other.push(&"chat".into(), [Turn::assistant("from disk")]).unwrap();
        other.save_to(&file).unwrap();

        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.memory.push(&"chat".into(), [Turn::user("in memory")]).unwrap();
        unit.load_context(0, "chat").unwrap();

        unit.load(&file).unwrap();
        assert_eq!(
            unit.read_context(0).unwrap().unwrap(),
            [Turn::assistant("from disk")]
        );
        assert_eq!(
            unit.snapshot().register("context0").unwrap().alias,
            Some(MemoryPath::from("chat"))
        );
    }

    #[test]
    fn clearing_aliased_memory_empties_register() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.memory.push(&"chat".into(), [Turn::user("hi")]).unwrap();
        unit.load_context(0, "chat").unwrap();

        unit.clear_mem("chat").unwrap();
        assert!(unit.read_context(0).unwrap().is_none());
    }

    #[test]
    fn push_copies_register_into_memory() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.load_sys("rules").push("system", "archive/sys").unwrap();
        unit.load_sys("new rules");

        assert_eq!(
            unit.memory().leaf(&"archive/sys".into()).unwrap(),
            [Turn::system("rules")]
        );
    }

    #[test]
    fn push_empty_register_appends_nothing() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.push("result", "log").unwrap();
        assert_eq!(unit.memory().leaf(&"log".into()).unwrap().len(), 0);
    }

    #[test]
    fn push_aliased_register_onto_itself_doubles() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.memory.push(&"loop".into(), [Turn::user("x")]).unwrap();
        unit.load_context(0, "loop").unwrap();

        unit.push("context0", "loop").unwrap();
        assert_eq!(unit.read_context(0).unwrap().unwrap().len(), 2);
    }

    #[test]
    fn unknown_register_is_fatal_and_changes_nothing() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.memory.push(&"chat".into(), [Turn::user("hi")]).unwrap();

        assert!(unit.push("accumulator", "chat").is_err());
        assert!(unit.pop("chat", "accumulator").is_err());
        assert!(unit.clear_reg("accumulator").is_err());
        assert_eq!(unit.memory().leaf(&"chat".into()).unwrap().len(), 1);
    }

    #[test]
    fn pop_overwrites_register() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.memory
            .push(&"notes".into(), [Turn::user("one"), Turn::user("two")])
            .unwrap();
        unit.load_ins("old");

        unit.pop("notes", "instruction").unwrap();
        assert_eq!(unit.read_ins(), Some(&Turn::user("two")));
    }

    #[test]
    fn pop_errors_surface() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.push("result", "empty").unwrap();

        assert!(matches!(
            unit.pop("empty", "result"),
            Err(Error::Memory(MemoryError::EmptySequence { .. }))
        ));
        assert!(matches!(
            unit.pop("missing/leaf", "result"),
            Err(Error::Memory(MemoryError::PathNotFound { .. }))
        ));
        assert!(unit.read_result().is_none());
    }

    #[test]
    fn save_and_load_memory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("mem.json");

        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.load_ins("remember me").push("instruction", "chats/0").unwrap();
        unit.save(&file).unwrap();

        let mut other = unit_with(&ScriptedSession::replies(&[]));
        other.load(&file).unwrap();
        assert_eq!(other.memory(), unit.memory());
    }

    #[test]
    fn load_missing_file_gives_empty_memory() {
        let dir = TempDir::new().unwrap();
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.load_ins("x").push("instruction", "chat").unwrap();

        unit.load(dir.path().join("missing.json")).unwrap();
        assert!(unit.memory().is_empty());
    }

    #[test]
    fn snapshot_reports_registers_and_aliases() {
        let mut unit = unit_with(&ScriptedSession::replies(&[]));
        unit.memory.push(&"chat".into(), [Turn::user("hi")]).unwrap();
        unit.load_sys("S").load_context(0, "chat").unwrap();

        let snapshot = unit.snapshot();
        assert_eq!(snapshot.context_registers, 3);
        assert_eq!(snapshot.registers.len(), 6);
        assert_eq!(
            snapshot.register("system").unwrap().turns,
            Some(vec![Turn::system("S")])
        );
        let ctx = snapshot.register("context0").unwrap();
        assert_eq!(ctx.alias, Some(MemoryPath::from("chat")));
        assert_eq!(ctx.turns.as_ref().unwrap().len(), 1);
        assert!(snapshot.register("result").unwrap().turns.is_none());
        assert_eq!(&snapshot.memory, unit.memory());
        assert!(snapshot.registers_json().unwrap().contains("\"context0\""));
    }

    #[test]
    fn custom_context_register_count() {
        let unit = ProcessingUnit::with_context_registers(ScriptedSession::replies(&[]), 5);
        assert_eq!(unit.context_registers(), 5);
        assert!(unit.read_context(4).unwrap().is_none());
        assert!(unit.read_context(5).is_err());
    }
}
