//! Error types for the cardmail-core library.

use thiserror::Error;

/// Main error type for the cardmail library.
#[derive(Error, Debug)]
pub enum CardmailError {
    /// Transaction extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// The raw message could not be decoded as an email.
    #[error("email error: {0}")]
    Email(#[from] mailparse::MailParseError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to transaction extraction.
///
/// Parsing ambiguity is never an error: an email that does not yield a
/// transaction is reported as `Ok(None)`. Only malformed input ends up here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The input email is malformed.
    #[error("invalid email {field}: {reason}")]
    InvalidEmail { field: String, reason: String },
}

impl ExtractionError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEmail {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for the cardmail library.
pub type Result<T> = std::result::Result<T, CardmailError>;
