//! Layered option resolution for pipkit.
//!
//! Option values come from four places, lowest precedence first:
//!
//! 1. built-in defaults declared on each [`OptionSpec`](pipkit_core::OptionSpec)
//! 2. INI config files ([`ConfigFiles`]): the `global` section, then the
//!    command's own section
//! 3. `PIPKIT_*` environment variables ([`Environment`])
//! 4. command-line tokens
//!
//! Config and environment keys are normalized to long-flag form
//! ([`normalize_key`]) and coerced to each option's kind ([`coerce`]).
//! A value that fails to coerce is a fatal [`ConfigError`].
//!
//! # Quick start
//!
//! ```
//! use pipkit_config::{ConfigFiles, Environment, resolve};
//! use pipkit_core::global_parser;
//!
//! let node = global_parser("/tmp/pipkit.log");
//! let files = ConfigFiles::from_ini_str("[global]\nproxy = cfg:1\n").unwrap();
//! let env = Environment::from_pairs([("PIPKIT_PROXY", "env:2")]);
//! let tokens = vec!["freeze".to_string()];
//!
//! let parsed = resolve(&node, &files, &env, &tokens).unwrap();
//! assert_eq!(parsed.options.text("proxy"), Some("env:2"));
//! assert_eq!(parsed.args, vec!["freeze"]);
//! ```

mod coerce;
mod error;
mod locations;
mod resolver;
mod sources;

pub use coerce::{coerce, str_to_bool};
pub use error::{ConfigError, ResolveError, Result};
pub use locations::{CONFIG_FILE_ENV, config_files, default_config_file, default_log_file};
pub use resolver::{ConfigOptionParser, normalize_key, resolve, resolve_defaults, update_defaults};
pub use sources::{ConfigFiles, ENV_PREFIX, Environment, IndentedIni};
