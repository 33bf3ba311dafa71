//! Error types for option resolution.

use std::path::PathBuf;

use pipkit_core::ParseError;
use thiserror::Error;

/// Errors raised while reading config sources or coercing their values.
///
/// Every variant is fatal: the run stops before any command executes.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read or parsed.
    #[error("failed to load config file {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    /// The environment snapshot could not be collected.
    #[error("failed to read environment: {0}")]
    Environment(#[source] config::ConfigError),

    /// A value that does not coerce to its option's kind.
    #[error("{key}: {reason} ({value})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Errors from a full resolve: config sources, then command-line tokens.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
