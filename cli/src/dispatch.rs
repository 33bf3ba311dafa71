//! Global option parsing and command lookup.

use std::path::PathBuf;

use pipkit_config::{ConfigFiles, ConfigOptionParser, Environment};
use pipkit_core::{ParserNode, ResolvedOptions, format_help};

use crate::commands::{CommandEntry, CommandTable};
use crate::error::DispatchError;
use crate::logging::Console;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const HELP_COMMAND: &str = "help";

/// Outcome of dispatch.
pub enum Dispatched<'a> {
    /// Help or version was printed; nothing left to run.
    Handled,
    Run(Invocation<'a>),
}

/// A command selected for execution, with the global scope it was
/// selected under.
pub struct Invocation<'a> {
    pub entry: &'a CommandEntry,
    /// Global options before any command-line flag was applied.
    pub global_defaults: ResolvedOptions,
    pub global: ResolvedOptions,
    /// Tokens following the command name.
    pub args: Vec<String>,
}

/// `pipkit <version> from <executable>`.
pub fn version_line() -> String {
    let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("pipkit"));
    format!("pipkit {VERSION} from {}", exe.display())
}

/// Parses the global options in `argv` and selects a command.
///
/// `--version`, help requests and argument lists without a command are
/// answered here and reported as [`Dispatched::Handled`].
///
/// # Errors
///
/// - [`DispatchError::Config`] for unreadable or invalid configuration
/// - [`DispatchError::Parse`] for malformed global options
/// - [`DispatchError::UnknownCommand`] for a name not in `commands`
pub fn dispatch<'a>(
    global: &ParserNode,
    files: &ConfigFiles,
    env: &Environment,
    commands: &'a CommandTable,
    argv: &[String],
    console: &Console,
) -> Result<Dispatched<'a>, DispatchError> {
    let parser = ConfigOptionParser::new(global, files, env);
    let global_defaults = parser.get_default_values()?.clone();
    let parsed = parser.parse_args(argv)?;

    if parsed.options.flag("version") {
        console.print_out(&version_line());
        return Ok(Dispatched::Handled);
    }

    let bare_help = parsed.args.len() == 1 && parsed.args[0] == HELP_COMMAND;
    let command = parsed.args.split_first().filter(|_| !bare_help);
    let Some((name, rest)) = command.filter(|_| !parsed.options.flag("help")) else {
        console.print_out(format_help(global, &commands.summaries()).trim_end());
        return Ok(Dispatched::Handled);
    };

    let name = name.to_lowercase();
    let Some(entry) = commands.get(&name) else {
        return Err(DispatchError::UnknownCommand {
            suggestion: commands.suggest(&name),
            name,
        });
    };

    Ok(Dispatched::Run(Invocation {
        entry,
        global_defaults,
        global: parsed.options,
        args: rest.to_vec(),
    }))
}
