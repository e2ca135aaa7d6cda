//! Error types for the converter data model.

use rust_decimal::Decimal;
use thiserror::Error;

/// A table or list violates one of its structural invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The same currency code appears twice.
    #[error("Duplicate currency: {0}")]
    DuplicateCurrency(String),

    /// The base currency is also listed as a target.
    #[error("Base currency {0} listed among targets")]
    BaseAmongTargets(String),

    /// Exchange rates cannot be negative.
    #[error("Negative rate {rate} for {code}")]
    NegativeRate { code: String, rate: Decimal },

    /// A derived table lacks the origin quote for a currency.
    #[error("Missing origin quote for {0}")]
    MissingQuote(String),

    /// A derived table's base has a zero origin quote.
    #[error("Zero origin quote for base {0}")]
    ZeroBaseQuote(String),

    /// A display list needs at least the base row.
    #[error("Display list is empty")]
    EmptyList,

    /// The first row of a display list must be the base row.
    #[error("First row of the display list is not the base row")]
    BaseNotFirst,

    /// Only one base row may exist.
    #[error("Display list has more than one base row")]
    MultipleBaseRows,
}

/// Result type alias for data model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
