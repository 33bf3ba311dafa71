//! The global option registry.

use crate::{OptionGroup, OptionSpec, OptionValue, ParserNode};

/// Name of the global parser node, also its config-file section.
pub const GLOBAL_PARSER: &str = "global";

/// Title of the group holding options every command inherits.
pub const GENERAL_GROUP_TITLE: &str = "General options";

/// Default network timeout in seconds.
const DEFAULT_TIMEOUT: f64 = 15.0;

/// Declares the global parser node.
///
/// `log_file_default` seeds `--log-file`, the path the complete log is
/// stored to when a run fails. Interspersed arguments are disabled so
/// that parsing stops at the command name.
///
/// # Examples
///
/// ```
/// use pipkit_core::*;
///
/// let node = global_parser("/home/me/.pipkit/pipkit.log");
/// assert_eq!(node.name, GLOBAL_PARSER);
/// assert!(!node.allows_interspersed());
///
/// let log_file = node.find_flag("--local-log").unwrap();
/// assert!(log_file.is_hidden());
/// assert_eq!(log_file.default, OptionValue::Text("/home/me/.pipkit/pipkit.log".into()));
/// ```
pub fn global_parser(log_file_default: &str) -> ParserNode {
    let mut node = ParserNode::new(GLOBAL_PARSER)
        .with_usage("pipkit COMMAND [OPTIONS]")
        .with_description("A package installer command-line front end.");
    node.disable_interspersed_args();

    node.add_option(
        OptionSpec::switch("--version", "version")
            .alias("-V")
            .with_help("Show version and exit."),
    );

    let general = OptionGroup::new(GENERAL_GROUP_TITLE)
        .with_option(OptionSpec::switch("--help", "help").alias("-h").with_help("Show help."))
        .with_option(
            OptionSpec::count("--verbose", "verbose")
                .alias("-v")
                .with_help("Give more output."),
        )
        .with_option(
            OptionSpec::count("--quiet", "quiet")
                .alias("-q")
                .with_help("Give less output."),
        )
        .with_option(OptionSpec::switch("--log-explicit-levels", "log_explicit_levels").hidden())
        .with_option(
            OptionSpec::text("--log", "log")
                .with_metavar("path")
                .with_help("Log file where a complete (maximum verbosity) record will be kept."),
        )
        .with_option(
            OptionSpec::text("--log-file", "log_file")
                .alias("--local-log")
                .with_default(OptionValue::Text(log_file_default.to_string()))
                .with_metavar("path")
                .with_help("Path to a verbose log, appended to only when a command fails.")
                .hidden(),
        )
        .with_option(
            OptionSpec::switch("--no-input", "no_input")
                .with_help("Disable prompting for input.")
                .hidden(),
        )
        .with_option(
            OptionSpec::text("--proxy", "proxy")
                .with_metavar("proxy")
                .with_help("Specify a proxy in the form user:passwd@proxy.server:port."),
        )
        .with_option(
            OptionSpec::float("--timeout", "timeout")
                .alias("--default-timeout")
                .with_default(OptionValue::Float(DEFAULT_TIMEOUT))
                .with_metavar("sec")
                .with_help("Set the socket timeout (default 15 seconds)."),
        )
        .with_option(
            OptionSpec::text("--default-vcs", "default_vcs")
                .with_metavar("vcs")
                .hidden(),
        )
        .with_option(
            OptionSpec::text("--skip-requirements-regex", "skip_requirements_regex")
                .with_metavar("pattern")
                .hidden(),
        )
        .with_option(
            OptionSpec::switch("--require-virtualenv", "require_venv")
                .alias("--require-venv")
                .hidden(),
        );
    node.add_group(general);

    node
}
