//! Error types for deptrack-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the deptrack-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while tracking dependencies.
///
/// Per-file and per-dependency problems are recorded in the analysis summary
/// and on graph edges instead of being raised through this type; only
/// call-level failures surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// File not found
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Parse failed
    #[error("parse failed for {}: {}", .path.display(), .reason)]
    ParseFailed { path: PathBuf, reason: String },

    /// Memory or other resource exhaustion
    #[error("resource exhausted: {0}")]
    Resource(String),

    /// A worker could not be scheduled
    #[error("concurrency failure: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Output generation failed
    #[error("output generation failed: {0}")]
    Output(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::FileNotFound(PathBuf::from("/srv/app/main.kt"));
        assert_eq!(err.to_string(), "file not found: /srv/app/main.kt");

        let err = Error::ParseFailed {
            path: PathBuf::from("broken.ts"),
            reason: "unexpected token".to_string(),
        };
        assert_eq!(err.to_string(), "parse failed for broken.ts: unexpected token");

        let err = Error::Config("tracker is not initialized".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: tracker is not initialized"
        );
    }
}
