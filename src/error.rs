//! Error types for the bitforge build pipeline.
//!
//! Every failure is classified into one of a small set of categories so the
//! operator can tell a misconfigured request apart from an unreachable build
//! host or a genuine toolchain failure. The category also fixes *when* the
//! pipeline may abort: configuration and preflight problems abort before any
//! expensive work, connectivity problems abort before the workspace mirror
//! is touched, and toolchain/artifact problems abort after temporary
//! resources have been cleaned up.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the build pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Conflicting or missing request flags, unresolved toolchain.
    #[error("configuration error: {0}")]
    Config(String),

    /// Required workspace paths are missing, reported as one batch.
    #[error("preflight failed:\n{0}")]
    Preflight(String),

    /// Remote host unreachable, sync tooling or docker unavailable.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// The build tool ran and exited nonzero.
    #[error("toolchain failed: {0}")]
    Toolchain(String),

    /// Expected output missing, or the packaging tool cannot be found
    /// when the target OS generation requires packaging.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// A post-operation state check failed. Surfaced as a warning by
    /// callers; never aborts the pipeline.
    #[error("verification failed: {0}")]
    Verification(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    pub fn config(msg: impl Into<String>) -> Self {
        BuildError::Config(msg.into())
    }

    /// Build a preflight error listing every missing path, not just the
    /// first. The operator fixes all of them in one round-trip.
    pub fn preflight(missing: &[(PathBuf, &str)]) -> Self {
        let mut lines = vec![format!("{} required path(s) missing:", missing.len())];
        for (path, purpose) in missing {
            lines.push(format!("  - {} ({})", path.display(), purpose));
        }
        BuildError::Preflight(lines.join("\n"))
    }

    pub fn connectivity(msg: impl Into<String>) -> Self {
        BuildError::Connectivity(msg.into())
    }

    pub fn toolchain(msg: impl Into<String>) -> Self {
        BuildError::Toolchain(msg.into())
    }

    pub fn artifact(msg: impl Into<String>) -> Self {
        BuildError::Artifact(msg.into())
    }

    pub fn verification(msg: impl Into<String>) -> Self {
        BuildError::Verification(msg.into())
    }
}
