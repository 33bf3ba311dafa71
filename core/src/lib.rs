//! Option declarations and command parser construction for pipkit.
//!
//! This crate defines the foundational types of the option engine:
//!
//! - [`OptionSpec`] — one recognized flag (canonical name, aliases,
//!   destination, value kind, default, multiplicity, visibility).
//! - [`OptionValue`] — the value a destination resolves to.
//! - [`ParserNode`] — an ordered set of specs plus titled [`OptionGroup`]s.
//!   There is one global node and one node per command.
//! - [`ResolvedOptions`] — destination key to value, with the source each
//!   value came from.
//!
//! The global node is declared by [`global_parser`]. Command nodes are
//! derived from it with [`build_command_parser`], which copies every global
//! spec (except `--help`) into a fresh, independently mutable node and then
//! appends the command's own specs. [`parse_args`] parses tokens against a
//! node on top of already-resolved defaults.
//!
//! # Example
//!
//! ```
//! use pipkit_core::*;
//!
//! let global = global_parser("/tmp/pipkit.log");
//! let spec = CommandSpec::new("freeze", "Output installed packages in requirements format.")
//!     .with_option(OptionSpec::append("--find-links", "find_links").alias("-f"));
//!
//! let node = build_command_parser(&global, &spec).unwrap();
//! assert!(node.find_flag("--find-links").is_some());
//! assert!(node.find_flag("--verbose").is_some());
//! assert!(node.find_dest("help").is_none());
//! assert!(validate_parser(&node).is_empty());
//! ```

mod factory;
mod parse;
mod parser;
mod registry;
mod status;
mod types;
mod validate;
mod values;

pub use factory::{COMMAND_GROUP_TITLE, CommandSpec, FactoryError, build_command_parser};
pub use parse::{ARGS_ID, ParseError, ParsedArgs, format_help, parse_args, to_clap_command};
pub use parser::{OptionGroup, ParserNode};
pub use registry::{GLOBAL_PARSER, GENERAL_GROUP_TITLE, global_parser};
pub use status::ExitStatus;
pub use types::*;
pub use validate::{ValidationError, validate_parser};
pub use values::{ResolvedOptions, ValueSource};
