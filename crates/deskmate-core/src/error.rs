use thiserror::Error;

/// Top-level error type for Deskmate.
///
/// Subsystem crates define their own error types and convert into this one
/// where a failure has to cross a crate boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeskmateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<toml::de::Error> for DeskmateError {
    fn from(err: toml::de::Error) -> Self {
        DeskmateError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DeskmateError {
    fn from(err: toml::ser::Error) -> Self {
        DeskmateError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DeskmateError {
    fn from(err: serde_json::Error) -> Self {
        DeskmateError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Deskmate operations.
pub type Result<T> = std::result::Result<T, DeskmateError>;
