//! The `help` command.

use std::io::Write;

use pipkit_core::{CommandSpec, ExitStatus, build_command_parser, format_help};

use super::{Command, RunContext};
use crate::error::CommandError;

/// `pipkit help [command]`.
pub struct HelpCommand;

impl Command for HelpCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("help", "Show help for commands").with_usage("pipkit help [command]")
    }

    fn run(&self, ctx: &mut RunContext<'_>) -> Result<Option<ExitStatus>, CommandError> {
        let text = match ctx.args.first() {
            None => format_help(ctx.global, &ctx.commands.summaries()),
            Some(name) => {
                let name = name.to_lowercase();
                let Some(entry) = ctx.commands.get(&name) else {
                    let hint = ctx
                        .commands
                        .suggest(&name)
                        .map(|s| format!(" - maybe you meant \"{s}\""))
                        .unwrap_or_default();
                    return Err(CommandError::Command(format!("unknown command \"{name}\"{hint}")));
                };
                let node = build_command_parser(ctx.global, &entry.spec).map_err(anyhow::Error::from)?;
                format_help(&node, &[])
            }
        };
        write!(ctx.out, "{text}").map_err(anyhow::Error::from)?;
        Ok(None)
    }
}
