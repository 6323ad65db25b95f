//! `llmpu chat` — interactive chat driven through the processing unit.
//!
//! Each round loads the user's line into `instruction`, evaluates
//! `system`, `context0`, `instruction`, prints the result, then pushes the
//! instruction and result onto the transcript and points `context0` at it.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use llmpu_config::AppConfig;
use llmpu_core::error::{Error, MemoryError};
use llmpu_formatters::PromptFormat;
use llmpu_memory::MemoryPath;
use llmpu_unit::ProcessingUnit;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Default, Args)]
pub struct ChatArgs {
    /// Host of the AI server, e.g. http://localhost:5001
    #[arg(long)]
    pub host: Option<String>,

    /// API key sent as a bearer token
    #[arg(long)]
    pub api_key: Option<String>,

    /// Prompt format: alpaca, llama3, llama3_instruct, llama3_chat, oaichat
    #[arg(long)]
    pub prompt_format: Option<PromptFormat>,

    /// Session implementation (openai_compatible)
    #[arg(long)]
    pub session_type: Option<String>,

    /// Memory file loaded at start and saved on exit
    #[arg(long)]
    pub memory_file: Option<PathBuf>,

    /// System prompt
    #[arg(long)]
    pub system: Option<String>,
}

impl ChatArgs {
    /// Command-line flags win over the config file.
    pub fn apply_to(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(api_key) = self.api_key {
            config.api_key = Some(api_key);
        }
        if let Some(format) = self.prompt_format {
            config.prompt_format = format;
        }
        if let Some(session_type) = self.session_type {
            config.session_type = session_type;
        }
        if let Some(memory_file) = self.memory_file {
            config.chat.memory_file = Some(memory_file);
        }
        if let Some(system) = self.system {
            config.chat.system_prompt = Some(system);
        }
    }
}

pub async fn run(config_path: Option<PathBuf>, args: ChatArgs) -> CliResult<()> {
    let mut config = super::load_config(config_path.as_deref())
        .map_err(|e| format!("Failed to load config: {e}"))?;
    args.apply_to(&mut config);
    config.validate()?;

    let session = llmpu_sessions::build_from_config(&config)?;
    let mut unit = ProcessingUnit::with_context_registers(session, config.context_registers);

    if let Some(file) = &config.chat.memory_file {
        unit.load(file)?;
    }
    if let Some(prompt) = &config.chat.system_prompt {
        unit.load_sys(prompt.as_str());
    }

    println!();
    println!("  LLMpu chat");
    println!();
    println!("  Host:       {}{}", config.host, config.endpoint_path);
    println!("  Format:     {}", config.prompt_format);
    println!("  Transcript: {}", config.chat.transcript_slot);
    if let Some(file) = &config.chat.memory_file {
        println!("  Memory:     {}", file.display());
    }
    println!();
    println!("  Type your message and press Enter. /exit to quit.");
    println!("  Commands: /clear /system [text] /dump memory|registers /save [file] /load [file] /forget");
    println!();

    let mut chat = Chat::new(
        unit,
        config.chat.transcript_slot.as_str(),
        config.chat.memory_file.clone(),
    );
    chat.attach_transcript()?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    chat.run(stdin, &mut stdout).await?;

    println!();
    println!("  Goodbye!");
    Ok(())
}

/// A slash command typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Exit,
    ClearScreen,
    ShowSystem,
    SetSystem(&'a str),
    DumpMemory,
    DumpRegisters,
    Save(Option<&'a str>),
    Load(Option<&'a str>),
    Forget,
    Unknown(&'a str),
}

/// Parse a slash command. Returns `None` for ordinary chat input.
pub fn parse_command(line: &str) -> Option<Command<'_>> {
    let rest = line.trim().strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };

    Some(match (name, arg) {
        ("exit", _) => Command::Exit,
        ("clear", _) => Command::ClearScreen,
        ("system", None) => Command::ShowSystem,
        ("system", Some(text)) => Command::SetSystem(text),
        ("dump", Some("memory")) => Command::DumpMemory,
        ("dump", Some("registers")) => Command::DumpRegisters,
        ("save", file) => Command::Save(file),
        ("load", file) => Command::Load(file),
        ("forget", _) => Command::Forget,
        _ => Command::Unknown(line.trim()),
    })
}

enum Flow {
    Continue,
    Exit,
}

/// The chat loop state: the unit plus where the transcript lives.
pub struct Chat {
    unit: ProcessingUnit,
    transcript: MemoryPath,
    memory_file: Option<PathBuf>,
}

impl Chat {
    pub fn new(
        unit: ProcessingUnit,
        transcript: impl Into<MemoryPath>,
        memory_file: Option<PathBuf>,
    ) -> Self {
        Self {
            unit,
            transcript: transcript.into(),
            memory_file,
        }
    }

    pub fn unit(&self) -> &ProcessingUnit {
        &self.unit
    }

    /// Point `context0` at the transcript if memory already holds one,
    /// otherwise empty it. Returns whether a transcript was found.
    pub fn attach_transcript(&mut self) -> llmpu_core::Result<bool> {
        let attached = self.unit.memory().leaf(&self.transcript).is_ok();
        if attached {
            self.unit.load_context(0, self.transcript.clone())?;
        } else {
            self.unit.clear_reg("context0")?;
        }
        debug!(transcript = %self.transcript, attached, "Attached transcript");
        Ok(attached)
    }

    /// Read lines until `/exit` or end of input. The memory file, if any, is
    /// saved before returning.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> CliResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();

        loop {
            write!(out, "  You > ")?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match parse_command(line) {
                Some(command) => {
                    if let Flow::Exit = self.handle(command, out)? {
                        break;
                    }
                }
                None => self.round(line, out).await?,
            }
        }

        if let Some(file) = self.memory_file.clone() {
            self.unit.save(&file)?;
        }
        Ok(())
    }

    async fn round<W: Write>(&mut self, line: &str, out: &mut W) -> CliResult<()> {
        self.unit.load_ins(line);

        if let Err(e) = self.unit.evaluate_default().await {
            writeln!(out, "  [Error] {e}")?;
            writeln!(out)?;
            return Ok(());
        }

        let reply = self
            .unit
            .read_result()
            .map(|turn| turn.content.clone())
            .unwrap_or_default();
        writeln!(out)?;
        for line in reply.lines() {
            writeln!(out, "  Assistant > {line}")?;
        }
        writeln!(out)?;

        if let Err(e) = self.record_round() {
            writeln!(out, "  [Error] Transcript not updated: {e}")?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// Append the round to the transcript and point `context0` at it.
    fn record_round(&mut self) -> llmpu_core::Result<()> {
        let transcript = self.transcript.clone();
        self.unit
            .push("instruction", transcript.clone())?
            .push("result", transcript.clone())?
            .load_context(0, transcript)?;
        Ok(())
    }

    /// Delete the transcript and empty `context0`. A transcript that was
    /// never written is nothing to forget.
    fn forget(&mut self) -> llmpu_core::Result<()> {
        match self.unit.clear_mem(self.transcript.clone()) {
            Ok(_) | Err(Error::Memory(MemoryError::PathNotFound { .. })) => {}
            Err(e) => return Err(e),
        }
        self.unit.clear_reg("context0")?;
        Ok(())
    }

    fn handle<W: Write>(&mut self, command: Command<'_>, out: &mut W) -> CliResult<Flow> {
        match command {
            Command::Exit => return Ok(Flow::Exit),
            Command::ClearScreen => {
                write!(out, "\x1B[2J\x1B[1;1H")?;
            }
            Command::ShowSystem => match self.unit.read_sys() {
                Some(turn) => writeln!(out, "  System: {}", turn.content)?,
                None => writeln!(out, "  System: (empty)")?,
            },
            Command::SetSystem(text) => {
                self.unit.load_sys(text);
                writeln!(out, "  System prompt set.")?;
            }
            Command::DumpMemory => {
                writeln!(out, "{}", self.unit.snapshot().memory_json()?)?;
            }
            Command::DumpRegisters => {
                writeln!(out, "{}", self.unit.snapshot().registers_json()?)?;
            }
            Command::Save(file) => match self.target_file(file) {
                Some(path) => match self.unit.save(&path) {
                    Ok(()) => writeln!(out, "  Saved memory to {}", path.display())?,
                    Err(e) => writeln!(out, "  [Error] {e}")?,
                },
                None => writeln!(out, "  No memory file configured; use /save <file>")?,
            },
            Command::Load(file) => match self.target_file(file) {
                Some(path) => {
                    let loaded = self.unit.load(&path).map(|_| ());
                    match loaded {
                        Ok(()) => {
                            writeln!(out, "  Loaded memory from {}", path.display())?;
                            if let Err(e) = self.attach_transcript() {
                                writeln!(out, "  [Error] {e}")?;
                            }
                        }
                        Err(e) => writeln!(out, "  [Error] {e}")?,
                    }
                }
                None => writeln!(out, "  No memory file configured; use /load <file>")?,
            },
            Command::Forget => match self.forget() {
                Ok(()) => writeln!(out, "  Transcript cleared.")?,
                Err(e) => writeln!(out, "  [Error] {e}")?,
            },
            Command::Unknown(text) => {
                writeln!(out, "  Unknown command: {text}")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn target_file(&self, file: Option<&str>) -> Option<PathBuf> {
        file.map(PathBuf::from).or_else(|| self.memory_file.clone())
    }
}
