//! Accounting client errors.

use thiserror::Error;

/// Errors returned by the accounting service or while talking to it.
#[derive(Debug, Error)]
pub enum AccountingError {
    /// The request never got a response.
    #[error("Accounting request failed: {0}")]
    Request(String),

    /// The API key was rejected.
    #[error("Accounting service rejected the credentials")]
    Unauthorized,

    /// The service answered with an error status.
    #[error("Accounting service error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body wasn't what we expected.
    #[error("Unexpected accounting response: {0}")]
    Decode(String),

    /// The payload can't be sent as is.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<reqwest::Error> for AccountingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AccountingError::Decode(err.to_string())
        } else {
            AccountingError::Request(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AccountingError>;
