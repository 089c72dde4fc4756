//! Classified failures of a knowledge base call.

/// Every way a retrieve-and-generate call can fail, grouped by what the
/// caller can do about it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No credentials were available to sign or authorize the call.
    #[error("No credentials available for the knowledge base service")]
    NoCredentials,

    /// The service rejected the caller's permissions.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Any other error reported by the service, with its own code.
    #[error("Service error ({code}): {message}")]
    Service { code: String, message: String },

    /// Network, decoding, or otherwise unclassified failure.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Unexpected(e.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
