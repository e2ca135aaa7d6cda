//! Error types surfaced by a rates session.

use converter_fx::{ConversionError, FetchError};
use thiserror::Error;

/// Session operation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Rate fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Currency not displayed: {0}")]
    UnknownCurrency(String),

    #[error("Session is stopped")]
    Stopped,
}

impl SessionError {
    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Fetch(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// How an accepted event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The result was committed and handed to the render sink.
    Rendered { sequence: u64, changes: usize },
    /// A newer event arrived while this one was in flight; its result was dropped.
    Superseded { sequence: u64 },
    /// The typed text was not a valid amount; nothing changed.
    InputIgnored,
}

impl Outcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Outcome::Rendered { .. })
    }
}
