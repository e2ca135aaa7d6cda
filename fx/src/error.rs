//! FX error types.

use converter_common::ModelError;
use thiserror::Error;

/// Errors surfaced by a remote rate source.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// Connection could not be established or was dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// The source did not answer in time.
    #[error("Rate fetch timed out after {0}ms")]
    Timeout(u64),

    /// The source answered with an error status.
    #[error("Rate server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The response could not be turned into a rate table.
    #[error("Malformed rate response: {0}")]
    Parse(String),

    /// The source has no rates for the requested base currency.
    #[error("Unsupported base currency: {0}")]
    UnsupportedBase(String),
}

impl FetchError {
    /// Check if retrying the fetch may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Network(_) | FetchError::Timeout(_) | FetchError::Server { status: 500..=599, .. }
        )
    }

    /// Get suggested retry delay in milliseconds.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            FetchError::Network(_) => Some(500),
            FetchError::Timeout(_) => Some(1000),
            FetchError::Server { status: 500..=599, .. } => Some(2000),
            _ => None,
        }
    }
}

impl From<ModelError> for FetchError {
    fn from(err: ModelError) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// Errors raised while converting or rebasing a table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConversionError {
    /// The requested pivot currency is not part of the table.
    #[error("No rate for {0} in the current table")]
    MissingRate(String),

    /// The requested pivot has a zero rate; rebasing would divide by zero.
    #[error("Rate for {0} is zero")]
    ZeroRate(String),

    /// A converted amount does not fit in a `Decimal`.
    #[error("Converted amount for {0} overflows")]
    Overflow(String),

    /// The derived table violated a model invariant.
    #[error("Invalid derived table: {0}")]
    InvalidTable(#[from] ModelError),
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for conversion operations.
pub type ConversionResult<T> = Result<T, ConversionError>;
