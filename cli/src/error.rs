//! Error types for dispatch and command execution, with their exit
//! dispositions.

use pipkit_config::{ConfigError, ResolveError};
use pipkit_core::{ExitStatus, FactoryError, ParseError};
use thiserror::Error;

use crate::network::NetworkError;

/// Failures raised by a command body.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Installation(String),

    #[error("{0}")]
    Uninstallation(String),

    #[error("{0}")]
    BadCommand(String),

    /// Misuse of a command, reported without storing the log.
    #[error("{0}")]
    Command(String),

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// What the controller does with a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disposition {
    pub status: ExitStatus,
    /// Store the complete debug log to `log_file`.
    pub persist: bool,
}

impl CommandError {
    pub fn disposition(&self) -> Disposition {
        let (status, persist) = match self {
            Self::Installation(_) | Self::Uninstallation(_) | Self::BadCommand(_) => {
                (ExitStatus::Error, true)
            }
            Self::Command(_) => (ExitStatus::Error, false),
            Self::Cancelled => (ExitStatus::Error, true),
            Self::Unexpected(_) => (ExitStatus::UnknownError, true),
        };
        Disposition { status, persist }
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" - maybe you meant \"{s}\""))
        .unwrap_or_default()
}

/// Failures before a command body runs: bad input, bad config, bad
/// command wiring.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown command \"{name}\"{}", suggestion_suffix(.suggestion))]
    UnknownCommand {
        name: String,
        suggestion: Option<String>,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("An error occurred during configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    /// A command declares options that clash with the global ones.
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

impl From<ResolveError> for DispatchError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Config(err) => Self::Config(err),
            ResolveError::Parse(err) => Self::Parse(err),
        }
    }
}

impl DispatchError {
    pub fn status(&self) -> ExitStatus {
        match self {
            Self::UnknownCommand { .. } | Self::Parse(_) | Self::Network(_) => {
                ExitStatus::Error
            }
            Self::Config(_) => ExitStatus::ConfigError,
            Self::Factory(_) => ExitStatus::UnknownError,
        }
    }

    /// The line printed to the console.
    pub fn report(&self) -> String {
        match self {
            Self::Config(_) => self.to_string(),
            _ => format!("pipkit: error: {self}"),
        }
    }
}
