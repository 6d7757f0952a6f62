//! Central error type for the webcam entropy pipeline.
//!
//! Per-URL fetch failures are *not* represented here. A dead camera is an
//! expected, per-round outcome (see [`crate::fetch::FetchOutcome`]), not an
//! exceptional one. This type covers the failures that stop a whole
//! operation: config loading, the persistent store, and the HTTP/CLI
//! front-ends.

use thiserror::Error;

/// Errors raised by the pipeline's non-per-camera operations.
#[derive(Error, Debug)]
pub enum WebcamRngError {
    /// Reading a webcam list, config, or log file failed at the filesystem
    /// level (not found, permission denied, and so on).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persistent buffer store could not be opened or queried.
    #[error("buffer store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The settings file exists but could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Building the shared HTTP client failed (e.g. a broken TLS backend).
    /// Per-URL request failures never reach this variant, see the module
    /// doc comment above.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A background task panicked or was dropped before completing.
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Convenience alias for fallible pipeline operations.
pub type Result<T> = std::result::Result<T, WebcamRngError>;
