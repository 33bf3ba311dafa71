//! Command parser construction.
//!
//! [`build_command_parser`] derives a command's [`ParserNode`] from the
//! global node: every global spec except `--help` is shared into the new
//! node with its grouping intact, then the command's own specs follow in a
//! [`COMMAND_GROUP_TITLE`] group.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::{OptionGroup, OptionSpec, ParserNode, ValidationError, validate_parser};

/// Title of the group holding command-specific options.
pub const COMMAND_GROUP_TITLE: &str = "Command options";

/// Destination of the help flag, which commands never inherit.
const HELP_DEST: &str = "help";

/// Errors raised while deriving a command parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// A command option reuses a destination already declared in scope.
    #[error("command '{command}' declares duplicate destination '{dest}'")]
    DuplicateDestination { command: String, dest: String },
    /// The finished node failed [`validate_parser`].
    #[error("command '{command}' is malformed: {}", joined(.errors))]
    Invalid {
        command: String,
        errors: Vec<ValidationError>,
    },
}

fn joined(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Declaration of one command: name, help text and its own options.
///
/// # Examples
///
/// ```
/// use pipkit_core::{CommandSpec, OptionSpec};
///
/// let spec = CommandSpec::new("freeze", "Output installed packages in requirements format.")
///     .with_usage("pipkit freeze [options]")
///     .with_option(OptionSpec::switch("--find-tags", "find_tags"));
/// assert_eq!(spec.options.len(), 1);
/// assert!(!spec.hidden);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub summary: String,
    pub usage: Option<String>,
    /// Hidden commands are dispatchable but not listed in help.
    pub hidden: bool,
    pub options: Vec<OptionSpec>,
}

impl CommandSpec {
    pub fn new(name: &str, summary: &str) -> Self {
        Self {
            name: name.to_string(),
            summary: summary.to_string(),
            usage: None,
            hidden: false,
            options: Vec::new(),
        }
    }

    pub fn with_usage(mut self, usage: &str) -> Self {
        self.usage = Some(usage.to_string());
        self
    }

    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

fn inherited(spec: &Arc<OptionSpec>) -> bool {
    matches!(spec.dest(), Some(dest) if dest != HELP_DEST)
}

/// Builds the parser node for `command` on top of `global`.
///
/// Global specs are shared (not cloned) into the new node; separators and
/// the help flag are skipped. The resulting node is independent: changing
/// its option lists leaves `global` and every sibling node untouched.
///
/// # Errors
///
/// Returns [`FactoryError::DuplicateDestination`] when a command option
/// reuses a destination that is already declared, either by a global spec
/// or by an earlier command option, and [`FactoryError::Invalid`] when the
/// finished node fails [`validate_parser`].
///
/// # Examples
///
/// ```
/// use pipkit_core::*;
///
/// let global = global_parser("/tmp/pipkit.log");
/// let clash = CommandSpec::new("bad", "").with_option(OptionSpec::text("--proxy-url", "proxy"));
/// assert!(matches!(
///     build_command_parser(&global, &clash),
///     Err(FactoryError::DuplicateDestination { .. })
/// ));
/// ```
pub fn build_command_parser(
    global: &ParserNode,
    command: &CommandSpec,
) -> Result<ParserNode, FactoryError> {
    let usage = command
        .usage
        .clone()
        .unwrap_or_else(|| format!("pipkit {} [options]", command.name));
    let mut node = ParserNode::new(&command.name)
        .with_usage(&usage)
        .with_description(&command.summary);

    for spec in global.options.iter().filter(|spec| inherited(spec)) {
        node.add_shared(Arc::clone(spec));
    }
    for group in &global.groups {
        let options: Vec<_> = group
            .options
            .iter()
            .filter(|spec| inherited(spec))
            .cloned()
            .collect();
        if !options.is_empty() {
            node.add_group(OptionGroup {
                title: group.title.clone(),
                options,
            });
        }
    }

    let mut seen: HashSet<String> = node.destinations().into_iter().map(String::from).collect();
    let mut own = OptionGroup::new(COMMAND_GROUP_TITLE);
    for option in &command.options {
        if let Some(dest) = option.dest() {
            if !seen.insert(dest.to_string()) {
                return Err(FactoryError::DuplicateDestination {
                    command: command.name.clone(),
                    dest: dest.to_string(),
                });
            }
        }
        own.options.push(Arc::new(option.clone()));
    }
    if !own.options.is_empty() {
        node.add_group(own);
    }

    let errors = validate_parser(&node);
    if !errors.is_empty() {
        return Err(FactoryError::Invalid {
            command: command.name.clone(),
            errors,
        });
    }
    Ok(node)
}
