//! Error types for the Mailgate service.

use thiserror::Error;

use crate::mailer::ProviderError;

/// Main error type for Mailgate operations.
#[derive(Error, Debug)]
pub enum MailgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Email provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Mailgate operations.
pub type Result<T> = std::result::Result<T, MailgateError>;
