//! Command table and the context handed to command bodies.

mod freeze;
mod help;

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pipkit_config::Environment;
use pipkit_core::{CommandSpec, ExitStatus, ParserNode, ResolvedOptions};
use pipkit_freeze::VcsRegistry;

use crate::error::CommandError;
use crate::network::NetworkSettings;

pub use freeze::FreezeCommand;
pub use help::HelpCommand;

/// Largest edit distance for which an unknown command gets a suggestion.
const SUGGESTION_DISTANCE: usize = 2;

/// A dispatchable command.
pub trait Command: Send + Sync {
    /// Name, summary and command-specific options.
    fn spec(&self) -> CommandSpec;

    /// Runs the body. `Ok(None)` means success.
    ///
    /// # Errors
    ///
    /// Any [`CommandError`]; the controller maps it to an exit status.
    fn run(&self, ctx: &mut RunContext<'_>) -> Result<Option<ExitStatus>, CommandError>;
}

/// Interrupt flag shared between the signal handler and a running body.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Returns whether it was already requested.
    pub fn cancel(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a command body can see.
pub struct RunContext<'a> {
    pub options: &'a ResolvedOptions,
    pub args: &'a [String],
    pub network: &'a NetworkSettings,
    pub env: &'a Environment,
    pub commands: &'a CommandTable,
    pub global: &'a ParserNode,
    pub vcs: &'a VcsRegistry,
    pub cancel: &'a CancelFlag,
    pub out: &'a mut dyn Write,
}

impl RunContext<'_> {
    /// # Errors
    ///
    /// Returns [`CommandError::Cancelled`] once an interrupt was received.
    pub fn check_cancelled(&self) -> Result<(), CommandError> {
        if self.cancel.is_cancelled() {
            Err(CommandError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A registered command and its declaration, captured once.
pub struct CommandEntry {
    pub spec: CommandSpec,
    pub command: Arc<dyn Command>,
}

/// Name to command table, built once at startup.
///
/// # Examples
///
/// ```
/// use pipkit_cli::CommandTable;
///
/// let table = CommandTable::builtin();
/// assert!(table.get("freeze").is_some());
/// assert_eq!(table.suggest("frezee").as_deref(), Some("freeze"));
/// assert_eq!(table.suggest("uninstall"), None);
/// ```
#[derive(Default)]
pub struct CommandTable {
    entries: BTreeMap<String, CommandEntry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The commands shipped with pipkit.
    pub fn builtin() -> Self {
        Self::new().with(HelpCommand).with(FreezeCommand)
    }

    /// Registers `command`, replacing any command with the same name.
    pub fn register<C: Command + 'static>(&mut self, command: C) {
        let spec = command.spec();
        self.entries.insert(
            spec.name.clone(),
            CommandEntry {
                spec,
                command: Arc::new(command),
            },
        );
    }

    pub fn with<C: Command + 'static>(mut self, command: C) -> Self {
        self.register(command);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    /// `(name, summary)` of every visible command, sorted by name.
    pub fn summaries(&self) -> Vec<(&str, &str)> {
        self.entries
            .values()
            .filter(|entry| !entry.spec.hidden)
            .map(|entry| (entry.spec.name.as_str(), entry.spec.summary.as_str()))
            .collect()
    }

    /// Closest visible command name to `name`, if any is close enough.
    pub fn suggest(&self, name: &str) -> Option<String> {
        self.summaries()
            .into_iter()
            .map(|(candidate, _)| (strsim::levenshtein(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTable")
            .field("commands", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
