//! Error types for tilawa-ap
//!
//! Engine operations never return these across their public boundary;
//! they are logged and turned into a stopped session there.

use thiserror::Error;

/// Main error type for tilawa-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP client errors (remote audio, chapter metadata)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shared library errors
    #[error(transparent)]
    Common(#[from] tilawa_common::Error),

    /// Chapter metadata unavailable or malformed
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// No playable source could be built for a verse
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Offline cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using tilawa-ap Error
pub type Result<T> = std::result::Result<T, Error>;
