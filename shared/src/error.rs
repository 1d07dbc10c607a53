//! Error types for the RSVP service.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling an RSVP.
#[derive(Error, Debug)]
pub enum Error {
    /// A required field was missing or empty
    #[error("Validation error: {0}")]
    Validation(String),

    /// Appending the attendance row to the spreadsheet failed
    #[error("Store write error: {0}")]
    StoreWrite(String),

    /// Sending the host notification failed
    #[error("Notification error: {0}")]
    Notification(String),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Google service-account authentication error
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            _ => 500,
        }
    }
}
