//! Token parsing against a [`ParserNode`] through the clap builder API.
//!
//! Each spec with a destination becomes a [`clap::Arg`] whose id is that
//! destination. Parsing starts from already-resolved defaults: only values
//! clap reports as coming from the command line replace them, and counters
//! add to them.

use std::fmt::Write as _;

use clap::error::ErrorKind;
use clap::parser::ValueSource as ClapSource;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use thiserror::Error;

use crate::{Multiplicity, OptionSpec, OptionValue, ParserNode, ResolvedOptions, ValueKind, ValueSource};

/// Id of the positional argument that collects leftover tokens.
pub const ARGS_ID: &str = "args";

/// Malformed command-line input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// clap rejected the tokens; `message` is its one-line description.
    #[error("{message}")]
    Rejected { kind: ErrorKind, message: String },
}

impl From<clap::Error> for ParseError {
    fn from(err: clap::Error) -> Self {
        let rendered = err.to_string();
        let first = rendered.lines().next().unwrap_or_default();
        Self::Rejected {
            kind: err.kind(),
            message: first.trim_start_matches("error: ").to_string(),
        }
    }
}

/// Options after parsing, plus the leftover positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedArgs {
    pub options: ResolvedOptions,
    pub args: Vec<String>,
}

fn to_clap_arg(spec: &OptionSpec, heading: Option<&str>) -> Option<Arg> {
    let dest = spec.dest()?;
    let long = spec.name.strip_prefix("--")?;

    let mut arg = Arg::new(dest.to_string()).long(long.to_string());
    if let Some(short) = spec.short() {
        arg = arg.short(short);
    }
    for alias in spec.long_aliases() {
        arg = arg.alias(alias.to_string());
    }

    arg = match (spec.kind, spec.multiplicity) {
        (ValueKind::Switch, _) => arg.action(ArgAction::SetTrue),
        (ValueKind::Count, _) => arg.action(ArgAction::Count),
        (_, Multiplicity::Append) => arg.action(ArgAction::Append),
        (ValueKind::Float, Multiplicity::Single) => {
            arg.action(ArgAction::Set).value_parser(value_parser!(f64))
        }
        (ValueKind::Text, Multiplicity::Single) => arg.action(ArgAction::Set),
    };

    if let Some(metavar) = &spec.metavar {
        arg = arg.value_name(metavar.clone());
    }
    if let Some(help) = &spec.help {
        arg = arg.help(help.clone());
    }
    if let Some(heading) = heading {
        arg = arg.help_heading(heading.to_string());
    }
    Some(arg.hide(spec.is_hidden()))
}

/// Converts a node into a clap command.
///
/// clap's own help and version flags are disabled; the node declares its
/// own. When the node does not allow interspersed arguments, the trailing
/// positional swallows everything from the first positional token on.
pub fn to_clap_command(node: &ParserNode) -> Command {
    let mut command = Command::new(node.name.clone())
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true);
    if let Some(usage) = &node.usage {
        command = command.override_usage(usage.clone());
    }
    if let Some(description) = &node.description {
        command = command.about(description.clone());
    }

    for spec in &node.options {
        if let Some(arg) = to_clap_arg(spec, None) {
            command = command.arg(arg);
        }
    }
    for group in &node.groups {
        for spec in &group.options {
            if let Some(arg) = to_clap_arg(spec, Some(&group.title)) {
                command = command.arg(arg);
            }
        }
    }

    let mut positional = Arg::new(ARGS_ID)
        .num_args(1..)
        .action(ArgAction::Append)
        .hide(true);
    if !node.allows_interspersed() {
        positional = positional.trailing_var_arg(true);
    }
    command.arg(positional)
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Parses `tokens` against `node`, starting from `base`.
///
/// # Errors
///
/// Returns [`ParseError::Rejected`] for unknown flags, missing values and
/// values that do not convert to the flag's kind.
///
/// # Examples
///
/// ```
/// use pipkit_core::*;
///
/// let node = global_parser("/tmp/pipkit.log");
/// let base = ResolvedOptions::from_defaults(&node);
/// let tokens: Vec<String> = ["-v", "freeze", "-v", "--json"].map(String::from).to_vec();
///
/// let parsed = parse_args(&node, &base, &tokens).unwrap();
/// assert_eq!(parsed.options.count("verbose"), 1);
/// assert_eq!(parsed.args, vec!["freeze", "-v", "--json"]);
/// ```
pub fn parse_args(
    node: &ParserNode,
    base: &ResolvedOptions,
    tokens: &[String],
) -> Result<ParsedArgs, ParseError> {
    let matches = to_clap_command(node).try_get_matches_from(tokens)?;
    let mut options = base.clone();

    for spec in node.all_options() {
        let Some(dest) = spec.dest() else { continue };
        if matches.value_source(dest) != Some(ClapSource::CommandLine) {
            continue;
        }
        let value = match (spec.kind, spec.multiplicity) {
            (ValueKind::Switch, _) => OptionValue::Bool(matches.get_flag(dest)),
            (ValueKind::Count, _) => {
                OptionValue::Count(options.count(dest) + u32::from(matches.get_count(dest)))
            }
            (_, Multiplicity::Append) => OptionValue::List(strings(&matches, dest)),
            (ValueKind::Float, Multiplicity::Single) => matches
                .get_one::<f64>(dest)
                .copied()
                .map_or(OptionValue::Unset, OptionValue::Float),
            (ValueKind::Text, Multiplicity::Single) => matches
                .get_one::<String>(dest)
                .cloned()
                .map_or(OptionValue::Unset, OptionValue::Text),
        };
        options.set(dest, value, ValueSource::CommandLine);
    }

    Ok(ParsedArgs {
        options,
        args: strings(&matches, ARGS_ID),
    })
}

/// Renders help for `node`, followed by a listing of `commands`.
///
/// Each command is a `(name, summary)` pair; pass an empty slice to omit
/// the listing.
pub fn format_help(node: &ParserNode, commands: &[(&str, &str)]) -> String {
    let mut help = to_clap_command(node).render_help().to_string();
    if commands.is_empty() {
        return help;
    }

    let width = commands.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    help.push_str("\nCommands:\n");
    for (name, summary) in commands {
        let _ = writeln!(help, "  {name:<width$}  {summary}");
    }
    help
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommandSpec, build_command_parser, global_parser};

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn freeze_node() -> ParserNode {
        let global = global_parser("/tmp/pipkit.log");
        let spec = CommandSpec::new("freeze", "Output installed packages.")
            .with_option(OptionSpec::append("--find-links", "find_links").alias("-f"))
            .with_option(OptionSpec::switch("--find-tags", "find_tags"));
        build_command_parser(&global, &spec).unwrap()
    }

    #[test]
    fn test_global_parse_stops_at_command() {
        let node = global_parser("/tmp/pipkit.log");
        let base = ResolvedOptions::from_defaults(&node);
        let parsed = parse_args(&node, &base, &tokens(&["--timeout", "3", "install", "--timeout", "5"])).unwrap();

        assert_eq!(parsed.options.float("timeout"), Some(3.0));
        assert_eq!(parsed.args, tokens(&["install", "--timeout", "5"]));
    }

    #[test]
    fn test_counts_add_to_base() {
        let node = freeze_node();
        let mut base = ResolvedOptions::from_defaults(&node);
        base.set("verbose", OptionValue::Count(1), ValueSource::ConfigFile);

        let parsed = parse_args(&node, &base, &tokens(&["-vv"])).unwrap();
        assert_eq!(parsed.options.count("verbose"), 3);
        assert_eq!(parsed.options.source("verbose"), Some(ValueSource::CommandLine));
    }

    #[test]
    fn test_untouched_values_keep_base_source() {
        let node = freeze_node();
        let mut base = ResolvedOptions::from_defaults(&node);
        base.set("proxy", OptionValue::Text("env:1".into()), ValueSource::Environment);

        let parsed = parse_args(&node, &base, &tokens(&["--find-tags"])).unwrap();
        assert_eq!(parsed.options.text("proxy"), Some("env:1"));
        assert_eq!(parsed.options.source("proxy"), Some(ValueSource::Environment));
        assert!(parsed.options.flag("find_tags"));
    }

    #[test]
    fn test_append_replaces_base_list() {
        let node = freeze_node();
        let mut base = ResolvedOptions::from_defaults(&node);
        base.set(
            "find_links",
            OptionValue::List(vec!["http://config".into()]),
            ValueSource::ConfigFile,
        );

        let parsed = parse_args(&node, &base, &tokens(&["-f", "a", "--find-links", "b"])).unwrap();
        assert_eq!(parsed.options.list("find_links"), ["a", "b"]);
    }

    #[test]
    fn test_interspersed_positionals() {
        let node = freeze_node();
        let base = ResolvedOptions::from_defaults(&node);
        let parsed = parse_args(&node, &base, &tokens(&["one", "--find-tags", "two"])).unwrap();
        assert_eq!(parsed.args, tokens(&["one", "two"]));
        assert!(parsed.options.flag("find_tags"));
    }

    #[test]
    fn test_long_alias() {
        let node = freeze_node();
        let base = ResolvedOptions::from_defaults(&node);
        let parsed = parse_args(&node, &base, &tokens(&["--default-timeout", "2.5", "--require-venv"])).unwrap();
        assert_eq!(parsed.options.float("timeout"), Some(2.5));
        assert!(parsed.options.flag("require_venv"));
    }

    #[test]
    fn test_bad_float_is_rejected() {
        let node = freeze_node();
        let base = ResolvedOptions::from_defaults(&node);
        let err = parse_args(&node, &base, &tokens(&["--timeout", "soon"])).unwrap_err();
        let ParseError::Rejected { kind, message } = err;
        assert_eq!(kind, ErrorKind::ValueValidation);
        assert!(message.contains("soon"));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let node = freeze_node();
        let base = ResolvedOptions::from_defaults(&node);
        let err = parse_args(&node, &base, &tokens(&["--bogus"])).unwrap_err();
        assert!(err.to_string().contains("--bogus"));
        assert!(!err.to_string().starts_with("error:"));
    }

    #[test]
    fn test_help_flag_is_not_inherited_by_commands() {
        let node = freeze_node();
        let base = ResolvedOptions::from_defaults(&node);
        assert!(parse_args(&node, &base, &tokens(&["--help"])).is_err());
    }

    #[test]
    fn test_format_help_lists_commands_and_hides_hidden_flags() {
        let node = global_parser("/tmp/pipkit.log");
        let help = format_help(&node, &[("freeze", "Output installed packages."), ("help", "Show help.")]);

        assert!(help.contains("--timeout"));
        assert!(help.contains("General options"));
        assert!(!help.contains("--require-virtualenv"));
        assert!(help.contains("Commands:"));
        assert!(help.contains("  freeze  Output installed packages."));
    }
}
