//! The pipkit command-line front end.
//!
//! [`App::run`] drives one invocation: global options are parsed and a
//! command is selected, the command's options are resolved from config
//! files, environment and command line, the global scope is folded in, and
//! the command body runs under a per-invocation log subscriber. Errors map
//! to an [`ExitStatus`](pipkit_core::ExitStatus); failures worth
//! investigating store the complete debug log to `--log-file`.

pub mod commands;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod network;

pub use commands::{
    CancelFlag, Command, CommandEntry, CommandTable, FreezeCommand, HelpCommand, RunContext,
};
pub use controller::{ADDITIVE, App, CARRY_OVER, ExecutionResult, Phase, merge_options};
pub use dispatch::{Dispatched, Invocation, dispatch, version_line};
pub use error::{CommandError, DispatchError, Disposition};
pub use logging::{Console, SharedBuffer};
pub use network::{NetworkError, NetworkSettings, PROXY_ENV, Proxy};
