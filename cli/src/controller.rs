//! The execution controller: one invocation from argv to exit status.
//!
//! After dispatch a run moves through fixed phases:
//!
//! ```text
//! Parsing -> Merging -> PreconditionCheck -> Running -> Finalizing -> Done
//! ```
//!
//! Failures before Merging completes are printed straight to the console.
//! From Merging on, output goes through the run's own subscriber (see
//! [`crate::logging`]), whose debug buffer is stored to `log_file` when a
//! run fails in a way worth investigating.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use pipkit_config::{ConfigFiles, ConfigOptionParser, Environment, default_log_file};
use pipkit_core::{
    ExitStatus, OptionValue, ParserNode, ResolvedOptions, ValueSource, build_command_parser,
    global_parser,
};
use pipkit_freeze::VcsRegistry;
use tracing::{debug, error, trace, warn};

use crate::commands::{CancelFlag, CommandEntry, CommandTable, RunContext};
use crate::dispatch::{Dispatched, Invocation, dispatch};
use crate::error::{CommandError, DispatchError};
use crate::logging::{
    Console, SharedBuffer, console_level, expand_user, open_logfile, run_subscriber, store_log,
};
use crate::network::NetworkSettings;

/// Destinations whose global value carries over into the command scope.
pub const CARRY_OVER: [&str; 9] = [
    "log",
    "proxy",
    "require_venv",
    "log_explicit_levels",
    "log_file",
    "timeout",
    "default_vcs",
    "skip_requirements_regex",
    "no_input",
];

/// Counters summed across the global and command scopes.
pub const ADDITIVE: [&str; 2] = ["verbose", "quiet"];

const VIRTUAL_ENV: &str = "VIRTUAL_ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parsing,
    Merging,
    PreconditionCheck,
    Running,
    Finalizing,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parsing => "parsing",
            Self::Merging => "merging",
            Self::PreconditionCheck => "precondition check",
            Self::Running => "running",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
        })
    }
}

fn enter(phase: Phase) {
    debug!("phase: {phase}");
}

/// Exit status of one invocation plus the debug log it captured.
///
/// `debug_log` is `None` when the run stopped before its subscriber was
/// installed (help, version, dispatch and parse errors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub status: ExitStatus,
    pub debug_log: Option<String>,
}

impl ExecutionResult {
    fn early(status: ExitStatus) -> Self {
        Self {
            status,
            debug_log: None,
        }
    }
}

/// Folds the global scope into the command scope.
///
/// For each [`CARRY_OVER`] destination the command value falls back to a
/// truthy global value when it is falsy. A truthy global value given on
/// the command line also replaces a command value that was not. The
/// [`ADDITIVE`] counters gain whatever the global command line added on
/// top of `global_defaults`.
///
/// # Examples
///
/// ```
/// use pipkit_cli::merge_options;
/// use pipkit_core::*;
///
/// let node = global_parser("/tmp/pipkit.log");
/// let defaults = ResolvedOptions::from_defaults(&node);
/// let mut global = defaults.clone();
/// global.set("verbose", OptionValue::Count(2), ValueSource::CommandLine);
/// global.set("proxy", OptionValue::Text("p:3128".into()), ValueSource::CommandLine);
///
/// let mut command = defaults.clone();
/// command.set("verbose", OptionValue::Count(1), ValueSource::CommandLine);
///
/// let merged = merge_options(&defaults, &global, command);
/// assert_eq!(merged.count("verbose"), 3);
/// assert_eq!(merged.text("proxy"), Some("p:3128"));
/// ```
pub fn merge_options(
    global_defaults: &ResolvedOptions,
    global: &ResolvedOptions,
    command: ResolvedOptions,
) -> ResolvedOptions {
    let mut merged = command;

    for dest in CARRY_OVER {
        let Some(global_value) = global.get(dest) else {
            continue;
        };
        if !global_value.is_truthy() {
            continue;
        }
        let global_source = global.source(dest).unwrap_or(ValueSource::Default);
        let command_truthy = merged.get(dest).is_some_and(OptionValue::is_truthy);
        let command_cli = merged.source(dest) == Some(ValueSource::CommandLine);
        if !command_truthy || (global_source == ValueSource::CommandLine && !command_cli) {
            merged.set(dest, global_value.clone(), global_source);
        }
    }

    for dest in ADDITIVE {
        let added = global.count(dest).saturating_sub(global_defaults.count(dest));
        if added > 0 {
            let total = merged.count(dest).saturating_add(added);
            merged.set(dest, OptionValue::Count(total), ValueSource::CommandLine);
        }
    }

    merged
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn report(err: &CommandError) {
    match err {
        CommandError::Installation(_)
        | CommandError::Uninstallation(_)
        | CommandError::BadCommand(_)
        | CommandError::Cancelled => {
            error!("{err}");
            debug!("Exception information:\n{err:?}");
        }
        CommandError::Command(_) => {
            error!("ERROR: {err}");
            debug!("Exception information:\n{err:?}");
        }
        CommandError::Unexpected(inner) => error!("Exception:\n{inner:?}"),
    }
}

/// The pipkit application: command table, VCS backends and where output
/// goes.
///
/// # Examples
///
/// ```
/// use pipkit_cli::{App, Console};
/// use pipkit_config::{ConfigFiles, Environment};
/// use pipkit_core::ExitStatus;
///
/// let console = Console::captured();
/// let app = App::new()
///     .with_console(console.clone())
///     .with_config_files(ConfigFiles::empty());
///
/// let result = app.run(&["--version".to_string()], &Environment::default());
/// assert_eq!(result.status, ExitStatus::Success);
/// assert!(console.stdout_text().starts_with("pipkit "));
/// ```
pub struct App {
    commands: CommandTable,
    vcs: VcsRegistry,
    console: Console,
    config_files: Option<ConfigFiles>,
    cancel: CancelFlag,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            commands: CommandTable::builtin(),
            vcs: VcsRegistry::new(),
            console: Console::Terminal,
            config_files: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Uses `files` instead of discovering config files from the
    /// environment.
    pub fn with_config_files(mut self, files: ConfigFiles) -> Self {
        self.config_files = Some(files);
        self
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn with_vcs(mut self, vcs: VcsRegistry) -> Self {
        self.vcs = vcs;
        self
    }

    pub fn with_commands(mut self, commands: CommandTable) -> Self {
        self.commands = commands;
        self
    }

    /// Handle for requesting cancellation of the running command.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Runs one invocation. `argv` excludes the program name.
    pub fn run(&self, argv: &[String], env: &Environment) -> ExecutionResult {
        let log_file_default = default_log_file(env);
        let global = global_parser(&log_file_default.to_string_lossy());

        let files = match &self.config_files {
            Some(files) => files.clone(),
            None => match ConfigFiles::discover(env) {
                Ok(files) => files,
                Err(err) => return self.fail(DispatchError::from(err)),
            },
        };

        let invocation = match dispatch(&global, &files, env, &self.commands, argv, &self.console) {
            Ok(Dispatched::Handled) => return ExecutionResult::early(ExitStatus::Success),
            Ok(Dispatched::Run(invocation)) => invocation,
            Err(err) => return self.fail(err),
        };

        let (merged, args, network) = match Self::prepare(&global, &files, env, &invocation) {
            Ok(prepared) => prepared,
            Err(err) => return self.fail(err),
        };

        let buffer = SharedBuffer::new();
        let logfile = match merged.text("log") {
            Some(path) => match open_logfile(&expand_user(path, env)) {
                Ok(file) => Some(file),
                Err(err) => {
                    self.console
                        .print_err(&format!("pipkit: error: cannot open log file {path}: {err}"));
                    return ExecutionResult::early(ExitStatus::Error);
                }
            },
            None => None,
        };
        let subscriber = run_subscriber(
            &self.console,
            console_level(merged.count("verbose"), merged.count("quiet")),
            merged.flag("log_explicit_levels"),
            &buffer,
            logfile,
        );

        tracing::subscriber::with_default(subscriber, || {
            let status = self.execute(&global, invocation.entry, &merged, &args, &network, env, &buffer);
            ExecutionResult {
                status,
                debug_log: Some(buffer.contents()),
            }
        })
    }

    fn fail(&self, err: DispatchError) -> ExecutionResult {
        self.console.print_err(&err.report());
        ExecutionResult::early(err.status())
    }

    /// Parsing and Merging: command scope resolved, global scope folded in,
    /// network settings computed once.
    fn prepare(
        global: &ParserNode,
        files: &ConfigFiles,
        env: &Environment,
        invocation: &Invocation<'_>,
    ) -> Result<(ResolvedOptions, Vec<String>, NetworkSettings), DispatchError> {
        let node = build_command_parser(global, &invocation.entry.spec)?;
        let parsed = ConfigOptionParser::new(&node, files, env).parse_args(&invocation.args)?;

        let merged = merge_options(&invocation.global_defaults, &invocation.global, parsed.options);
        let network = NetworkSettings::from_options(&merged, env)?;
        Ok((merged, parsed.args, network))
    }

    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        global: &ParserNode,
        entry: &CommandEntry,
        options: &ResolvedOptions,
        args: &[String],
        network: &NetworkSettings,
        env: &Environment,
        buffer: &SharedBuffer,
    ) -> ExitStatus {
        enter(Phase::Parsing);
        debug!("command '{}' with {} argument(s)", entry.spec.name, args.len());
        enter(Phase::Merging);
        trace!(
            "resolved options: {}",
            serde_json::to_string(options).unwrap_or_default()
        );
        debug!("socket timeout {:?}, prompting {}", network.timeout, network.prompting);
        if let Some(proxy) = &network.proxy {
            debug!("using proxy {proxy}");
        }

        enter(Phase::PreconditionCheck);
        if options.flag("require_venv") && env.non_empty(VIRTUAL_ENV).is_none() {
            error!("Could not find an activated virtualenv (required).");
            return ExitStatus::VirtualenvNotFound;
        }

        enter(Phase::Running);
        let mut out = self.console.stdout();
        let outcome = {
            let mut ctx = RunContext {
                options,
                args,
                network,
                env,
                commands: &self.commands,
                global,
                vcs: &self.vcs,
                cancel: &self.cancel,
                out: &mut out,
            };
            panic::catch_unwind(AssertUnwindSafe(|| entry.command.run(&mut ctx)))
        };
        let outcome = outcome.unwrap_or_else(|payload| {
            Err(CommandError::Unexpected(anyhow::anyhow!(
                "command panicked: {}",
                panic_message(&*payload)
            )))
        });

        enter(Phase::Finalizing);
        let (status, persist) = match outcome {
            Ok(None) => (ExitStatus::Success, false),
            Ok(Some(status)) => (status, false),
            Err(err) => {
                report(&err);
                let disposition = err.disposition();
                (disposition.status, disposition.persist)
            }
        };

        enter(Phase::Done);
        if persist {
            let complete_log = buffer.contents();
            match options.text("log_file") {
                Some(path) => {
                    let path: PathBuf = expand_user(path, env);
                    warn!("Storing complete log in {}", path.display());
                    if let Err(err) = store_log(&path, &complete_log) {
                        error!("could not store log in {}: {err}", path.display());
                    }
                }
                None => warn!("no log file configured, complete log not stored"),
            }
        }
        debug!("exit status: {status}");
        status
    }
}
