//! Error types for meritum-sheets

use thiserror::Error;

/// Sheets backend error
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration missing or malformed
    #[error("sheets configuration error: {0}")]
    Config(String),

    /// Transport-level failure (connect, timeout, body read)
    #[error("sheets transport error: {0}")]
    Transport(String),

    /// The API answered with a non-success status
    #[error("sheets api error: status {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Body excerpt or status text
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("sheets response parse error: {0}")]
    Parse(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Transient failures are worth one retry: throttling, server-side
    /// errors and transport hiccups. Client errors are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            Error::Config(_) | Error::Parse(_) => false,
        }
    }
}

impl From<Error> for meritum_core::Error {
    fn from(e: Error) -> Self {
        meritum_core::Error::ExternalService(e.to_string())
    }
}
