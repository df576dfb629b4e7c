//! # Errors
//!
//! Two failure families with opposite handling:
//!
//! - [`StoreUnavailable`]: the shared store could not answer. Always recovered
//!   inside the crate (fallback tier, empty listing, `false` from write).
//! - [`ConfigError`]: the defaults file exists but cannot be used. Surfaced to
//!   the caller, since treating a broken file as "no defaults" would hide
//!   operator error.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The shared store could not serve a request.
///
/// Every variant is recoverable: callers treat it as "value unknown",
/// never as "value false".
#[derive(Debug, Error)]
pub enum StoreUnavailable {
    /// The backend refused or dropped the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// No pooled connection became free within the acquisition timeout.
    #[error("connection pool exhausted after {waited:?}")]
    PoolExhausted { waited: Duration },

    /// The backend answered with a protocol or runtime failure.
    #[error("store backend failure: {0}")]
    Backend(String),

    /// Socket or file level failure.
    #[error("store io failure: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreUnavailable {
    /// Wrap any displayable backend error.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// The defaults file could not be used.
///
/// `Clone` so the frozen defaults cell can hand the same error to every
/// caller after a failed first load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read defaults file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// The file is not a mapping of namespace -> toggle -> boolean.
    #[error("malformed defaults file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Errors surfaced by the public resolution API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlagError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for the public resolution API.
pub type Result<T> = std::result::Result<T, FlagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_reports_path() {
        let err = ConfigError::Parse {
            path: PathBuf::from("config/features.yml"),
            reason: "expected a mapping".to_string(),
        };
        let text = FlagError::from(err).to_string();
        assert!(text.contains("config/features.yml"));
        assert!(text.contains("expected a mapping"));
    }

    #[test]
    fn pool_exhaustion_mentions_wait() {
        let err = StoreUnavailable::PoolExhausted {
            waited: Duration::from_millis(250),
        };
        assert!(err.to_string().contains("250ms"));
    }
}
