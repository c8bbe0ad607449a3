//! Application error types.

use std::fmt;

use crate::resolver::RequestError;

/// Errors that can occur during application lifecycle.
#[derive(Debug)]
pub enum AppError {
    /// Automatic initialization needs a running Tokio runtime.
    NoRuntime,

    /// A request could not be built.
    InvalidRequest(RequestError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NoRuntime => {
                write!(
                    f,
                    "No Tokio runtime available to initialize the cache engine \
                     (start inside a runtime or enable manual_init)"
                )
            }
            AppError::InvalidRequest(e) => write!(f, "Invalid request: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::NoRuntime => None,
            AppError::InvalidRequest(e) => Some(e),
        }
    }
}

impl From<RequestError> for AppError {
    fn from(e: RequestError) -> Self {
        AppError::InvalidRequest(e)
    }
}
