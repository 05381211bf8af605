//! Error types for the academic calendar Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling a calendar request.
///
/// The `Display` output is exactly what ends up in the `error` field of the
/// response body, so variants carry client-facing messages.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or empty required field, bad date ordering
    #[error("{0}")]
    Validation(String),

    /// Request body is not valid JSON for the operation
    #[error("Invalid JSON in request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    /// Entity missing, or entity/secondary-key mismatch
    #[error("{0}")]
    NotFound(String),

    /// A `semesterId` that does not resolve to a stored semester
    #[error("Invalid semesterId - semester does not exist")]
    InvalidReference(String),

    /// HTTP method not routed by the dispatcher
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Persistence failure, message passed through verbatim
    #[error("{0}")]
    Store(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) | Error::InvalidBody(_) | Error::InvalidReference(_) => 400,
            Error::NotFound(_) => 404,
            Error::MethodNotAllowed(_) => 405,
            Error::Store(_) => 500,
        }
    }
}
