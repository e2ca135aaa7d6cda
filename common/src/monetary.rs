//! Currencies, rates and exchange-rate tables.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::catalog;
use crate::error::ModelError;
use crate::time::{self, Timestamp};

/// A currency identity.
///
/// Two currencies are the same currency when their codes match; name and
/// icon are descriptive only.
#[derive(Debug, Clone, Serialize)]
pub struct Currency {
    code: String,
    name: String,
    icon: Option<String>,
}

impl Currency {
    /// Create a currency from its code, naming it from the catalog when known.
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into().to_uppercase();
        let name = catalog::display_name(&code)
            .map(str::to_string)
            .unwrap_or_else(|| code.clone());
        Self {
            code,
            name,
            icon: None,
        }
    }

    /// Create a currency with an explicit display name.
    pub fn with_name(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into().to_uppercase(),
            name: name.into(),
            icon: None,
        }
    }

    /// Attach an icon reference.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Get the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the icon reference, if any.
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// Get the standard decimal places for this currency.
    pub fn decimal_places(&self) -> u32 {
        match self.code.as_str() {
            "JPY" | "KRW" | "VND" | "ISK" => 0,
            "BHD" | "KWD" | "OMR" => 3,
            _ => 2,
        }
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }

    pub fn jpy() -> Self {
        Self::new("JPY")
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Currency {}

impl Hash for Currency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Amount of `currency` per one unit of a table's base currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyRate {
    pub currency: Currency,
    pub rate: Decimal,
}

impl CurrencyRate {
    pub fn new(currency: Currency, rate: Decimal) -> Self {
        Self { currency, rate }
    }
}

/// Rates of every target currency against one base currency.
///
/// Tables are immutable once built. Besides the display rates, a table keeps
/// each currency's quote against the currency it was originally fetched in,
/// so rates derived for another base never compound earlier roundings.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRateTable {
    base: Currency,
    rates: Vec<CurrencyRate>,
    #[serde(skip)]
    origin_quotes: HashMap<String, Decimal>,
    fetched_at: Timestamp,
}

impl ExchangeRateTable {
    /// Build a freshly fetched table.
    pub fn new(base: Currency, rates: Vec<CurrencyRate>) -> Result<Self, ModelError> {
        validate(&base, &rates)?;

        let mut origin_quotes: HashMap<String, Decimal> = rates
            .iter()
            .map(|r| (r.currency.code().to_string(), r.rate))
            .collect();
        origin_quotes.insert(base.code().to_string(), Decimal::ONE);

        Ok(Self {
            base,
            rates,
            origin_quotes,
            fetched_at: time::now(),
        })
    }

    /// Build a table whose rates were derived from another table's quotes.
    ///
    /// `origin_quotes` must cover the base and every target, and the base's
    /// quote must be non-zero.
    pub fn from_origin_quotes(
        base: Currency,
        rates: Vec<CurrencyRate>,
        origin_quotes: HashMap<String, Decimal>,
        fetched_at: Timestamp,
    ) -> Result<Self, ModelError> {
        validate(&base, &rates)?;

        match origin_quotes.get(base.code()) {
            None => return Err(ModelError::MissingQuote(base.code().to_string())),
            Some(q) if q.is_zero() => return Err(ModelError::ZeroBaseQuote(base.code().to_string())),
            Some(_) => {}
        }
        if let Some(missing) = rates
            .iter()
            .find(|r| !origin_quotes.contains_key(r.currency.code()))
        {
            return Err(ModelError::MissingQuote(missing.currency.code().to_string()));
        }

        Ok(Self {
            base,
            rates,
            origin_quotes,
            fetched_at,
        })
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn rates(&self) -> &[CurrencyRate] {
        &self.rates
    }

    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }

    /// Rate of a target currency against the base.
    pub fn rate_of(&self, code: &str) -> Option<Decimal> {
        self.rates
            .iter()
            .find(|r| r.currency.code() == code)
            .map(|r| r.rate)
    }

    /// Quote of any currency in the table against the original fetch base.
    pub fn origin_quote(&self, code: &str) -> Option<Decimal> {
        self.origin_quotes.get(code).copied()
    }

    /// All origin quotes, base included.
    pub fn origin_quotes(&self) -> &HashMap<String, Decimal> {
        &self.origin_quotes
    }

    /// Look a currency up among the base and the targets.
    pub fn currency(&self, code: &str) -> Option<&Currency> {
        if self.base.code() == code {
            return Some(&self.base);
        }
        self.rates
            .iter()
            .map(|r| &r.currency)
            .find(|c| c.code() == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.currency(code).is_some()
    }

    /// Number of target currencies.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl PartialEq for ExchangeRateTable {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.rates == other.rates
    }
}

fn validate(base: &Currency, rates: &[CurrencyRate]) -> Result<(), ModelError> {
    let mut seen = HashSet::with_capacity(rates.len());

    for entry in rates {
        let code = entry.currency.code();
        if code == base.code() {
            return Err(ModelError::BaseAmongTargets(code.to_string()));
        }
        if !seen.insert(code) {
            return Err(ModelError::DuplicateCurrency(code.to_string()));
        }
        if entry.rate < Decimal::ZERO {
            return Err(ModelError::NegativeRate {
                code: code.to_string(),
                rate: entry.rate,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd_table() -> ExchangeRateTable {
        ExchangeRateTable::new(
            Currency::usd(),
            vec![
                CurrencyRate::new(Currency::eur(), dec!(0.9)),
                CurrencyRate::new(Currency::gbp(), dec!(0.8)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_currency_equality_by_code() {
        let plain = Currency::new("eur");
        let named = Currency::with_name("EUR", "Single currency").with_icon("flag_eu");

        assert_eq!(plain, named);
        assert_eq!(plain.code(), "EUR");
        assert_eq!(plain.name(), "Euro");
        assert_eq!(named.icon(), Some("flag_eu"));
    }

    #[test]
    fn test_unknown_currency_named_by_code() {
        assert_eq!(Currency::new("xts").name(), "XTS");
    }

    #[test]
    fn test_currency_decimal_places() {
        assert_eq!(Currency::usd().decimal_places(), 2);
        assert_eq!(Currency::jpy().decimal_places(), 0);
        assert_eq!(Currency::new("KWD").decimal_places(), 3);
    }

    #[test]
    fn test_table_lookup() {
        let table = usd_table();

        assert_eq!(table.rate_of("EUR"), Some(dec!(0.9)));
        assert_eq!(table.rate_of("USD"), None);
        assert_eq!(table.origin_quote("USD"), Some(Decimal::ONE));
        assert!(table.contains("USD"));
        assert!(table.contains("GBP"));
        assert!(!table.contains("JPY"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_rejects_duplicates() {
        let result = ExchangeRateTable::new(
            Currency::usd(),
            vec![
                CurrencyRate::new(Currency::eur(), dec!(0.9)),
                CurrencyRate::new(Currency::eur(), dec!(0.91)),
            ],
        );

        assert!(matches!(result, Err(ModelError::DuplicateCurrency(code)) if code == "EUR"));
    }

    #[test]
    fn test_table_rejects_base_among_targets() {
        let result = ExchangeRateTable::new(
            Currency::usd(),
            vec![CurrencyRate::new(Currency::usd(), dec!(1))],
        );

        assert!(matches!(result, Err(ModelError::BaseAmongTargets(_))));
    }

    #[test]
    fn test_table_rejects_negative_rate() {
        let result = ExchangeRateTable::new(
            Currency::usd(),
            vec![CurrencyRate::new(Currency::eur(), dec!(-0.9))],
        );

        assert!(matches!(result, Err(ModelError::NegativeRate { .. })));
    }

    #[test]
    fn test_table_accepts_zero_rate() {
        let table = ExchangeRateTable::new(
            Currency::usd(),
            vec![CurrencyRate::new(Currency::new("RUB"), Decimal::ZERO)],
        )
        .unwrap();

        assert_eq!(table.rate_of("RUB"), Some(Decimal::ZERO));
    }

    #[test]
    fn test_from_origin_quotes_requires_every_quote() {
        let source = usd_table();
        let mut quotes = source.origin_quotes().clone();
        quotes.remove("GBP");

        let result = ExchangeRateTable::from_origin_quotes(
            Currency::eur(),
            vec![
                CurrencyRate::new(Currency::usd(), dec!(1.1)),
                CurrencyRate::new(Currency::gbp(), dec!(0.8)),
            ],
            quotes,
            source.fetched_at(),
        );

        assert!(matches!(result, Err(ModelError::MissingQuote(code)) if code == "GBP"));
    }
}
