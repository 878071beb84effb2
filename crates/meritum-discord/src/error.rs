//! Error types for meritum-discord

use thiserror::Error;

/// Discord adapter error
#[derive(Debug, Error)]
pub enum Error {
    /// Discord API or gateway failure
    #[error("discord error: {0}")]
    Discord(String),

    /// Command input could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Engine failure bubbled up from meritum-core
    #[error(transparent)]
    Core(#[from] meritum_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
