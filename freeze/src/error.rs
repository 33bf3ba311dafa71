//! Error types for requirement reconstruction.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading installed distributions or freezing them.
#[derive(Debug, Error)]
pub enum FreezeError {
    /// A non-VCS distribution must pin exactly one `==` version.
    #[error("distribution {name} does not pin exactly one version ({specifiers} specifiers)")]
    UnpinnedDistribution { name: String, specifiers: usize },

    /// Metadata could not be read from disk.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for results with [`FreezeError`].
pub type Result<T> = std::result::Result<T, FreezeError>;
