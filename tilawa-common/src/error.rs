//! Common error type for Tilawa

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the shared configuration helpers
#[derive(Error, Debug)]
pub enum Error {
    /// Platform configuration location cannot be determined
    #[error("Configuration error: {0}")]
    Config(String),

    /// No configuration file at the expected location
    #[error("Not found: {0}")]
    NotFound(String),
}
