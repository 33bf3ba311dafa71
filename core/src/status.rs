//! Process exit statuses.

use std::fmt;

/// Exit status of one invocation.
///
/// # Examples
///
/// ```
/// use pipkit_core::ExitStatus;
///
/// assert_eq!(ExitStatus::VirtualenvNotFound.code(), 3);
/// assert_eq!(ExitStatus::from_code(2), ExitStatus::UnknownError);
/// assert_eq!(ExitStatus::from_code(42), ExitStatus::Other(42));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    Success,
    Error,
    UnknownError,
    VirtualenvNotFound,
    ConfigError,
    /// A code returned by a command body that has no named meaning.
    Other(i32),
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Error => 1,
            Self::UnknownError => 2,
            Self::VirtualenvNotFound => 3,
            Self::ConfigError => 4,
            Self::Other(code) => code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::Error,
            2 => Self::UnknownError,
            3 => Self::VirtualenvNotFound,
            4 => Self::ConfigError,
            other => Self::Other(other),
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Error => f.write_str("error"),
            Self::UnknownError => f.write_str("unknown error"),
            Self::VirtualenvNotFound => f.write_str("virtualenv not found"),
            Self::ConfigError => f.write_str("configuration error"),
            Self::Other(code) => write!(f, "exit code {code}"),
        }
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        // Codes outside u8 wrap like a shell would.
        Self::from(status.code() as u8)
    }
}
