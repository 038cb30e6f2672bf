//! Command table and dispatch
//!
//! The host's extensible command mechanism is modeled as an explicit
//! enumerated table built at startup: a static mapping from command name
//! to a typed handler over (store, config, args). No runtime reflection.
//!
//! Handlers run synchronously; one command invocation is the unit of
//! atomicity observable to any other command.

pub mod args;
pub mod create;

pub use args::{parse_create_args, CreateRequest};

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::store::MemoryStore;

/// Successful command outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Generic acknowledgement
    Ok,
    /// A list payload (command names, etc.)
    Array(Vec<String>),
}

type CommandHandler = fn(&mut MemoryStore, &Config, &[String]) -> EngineResult<Reply>;

/// One entry in the command table
pub struct CommandSpec {
    pub name: &'static str,
    pub summary: &'static str,
    /// Minimum number of arguments after the command name
    pub min_args: usize,
    handler: CommandHandler,
}

/// The full command surface, enumerated at startup
static COMMAND_TABLE: &[CommandSpec] = &[
    CommandSpec {
        name: "TEMPO.CREATE",
        summary: "Create a new time series bound to a key",
        min_args: 1,
        handler: create::create,
    },
    CommandSpec {
        name: "TEMPO.COMMANDS",
        summary: "List registered command names, filtered by prefix",
        min_args: 0,
        handler: commands,
    },
];

/// Handle `TEMPO.COMMANDS [<prefix>]`: a thin pass-through over the
/// registry
fn commands(_store: &mut MemoryStore, _config: &Config, args: &[String]) -> EngineResult<Reply> {
    let prefix = args.first().map(String::as_str).unwrap_or("");
    Ok(Reply::Array(
        CommandRegistry::new().names_with_prefix(prefix),
    ))
}

/// Name-to-handler registry over the static command table
pub struct CommandRegistry {
    table: &'static [CommandSpec],
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            table: COMMAND_TABLE,
        }
    }

    /// Look up a command by name, case-insensitively
    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.table
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
    }

    /// Registered command names matching a prefix, case-insensitively
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        let upper = prefix.to_ascii_uppercase();
        self.table
            .iter()
            .filter(|spec| spec.name.starts_with(&upper))
            .map(|spec| spec.name.to_string())
            .collect()
    }

    /// Dispatch one command invocation
    pub fn dispatch(
        &self,
        store: &mut MemoryStore,
        config: &Config,
        name: &str,
        args: &[String],
    ) -> EngineResult<Reply> {
        let spec = self
            .lookup(name)
            .ok_or_else(|| EngineError::UnknownCommand(name.to_string()))?;
        if args.len() < spec.min_args {
            return Err(EngineError::WrongArity(spec.name));
        }
        (spec.handler)(store, config, args)
    }
}
