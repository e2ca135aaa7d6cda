//! Converted rows and the displayed list.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ModelError;
use crate::monetary::{Currency, CurrencyRate, ExchangeRateTable};

/// One row of the converter list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ConvertedRow {
    /// The row the user types into; anchors every conversion.
    Base { currency: Currency, amount: Decimal },
    /// A row computed from the base amount and its rate.
    Target { currency: Currency, amount: Decimal },
}

impl ConvertedRow {
    pub fn base(currency: Currency, amount: Decimal) -> Self {
        ConvertedRow::Base { currency, amount }
    }

    pub fn target(currency: Currency, amount: Decimal) -> Self {
        ConvertedRow::Target { currency, amount }
    }

    pub fn currency(&self) -> &Currency {
        match self {
            ConvertedRow::Base { currency, .. } | ConvertedRow::Target { currency, .. } => currency,
        }
    }

    pub fn code(&self) -> &str {
        self.currency().code()
    }

    pub fn amount(&self) -> Decimal {
        match self {
            ConvertedRow::Base { amount, .. } | ConvertedRow::Target { amount, .. } => *amount,
        }
    }

    pub fn is_base(&self) -> bool {
        matches!(self, ConvertedRow::Base { .. })
    }
}

/// Rows in display order: the base row first, then the targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayList {
    rows: Vec<ConvertedRow>,
}

impl DisplayList {
    /// Validate and wrap a row sequence.
    pub fn new(rows: Vec<ConvertedRow>) -> Result<Self, ModelError> {
        match rows.first() {
            None => return Err(ModelError::EmptyList),
            Some(first) if !first.is_base() => return Err(ModelError::BaseNotFirst),
            Some(_) => {}
        }

        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            if !seen.insert(row.code()) {
                return Err(ModelError::DuplicateCurrency(row.code().to_string()));
            }
        }
        if rows.iter().skip(1).any(ConvertedRow::is_base) {
            return Err(ModelError::MultipleBaseRows);
        }

        Ok(Self { rows })
    }

    /// Lay out a table: its base row first, then one target row per rate
    /// in table order. Stops at the first amount `amount_for` cannot produce.
    pub fn from_table<F, E>(
        table: &ExchangeRateTable,
        base_amount: Decimal,
        mut amount_for: F,
    ) -> Result<Self, E>
    where
        F: FnMut(&CurrencyRate) -> Result<Decimal, E>,
    {
        let mut rows = Vec::with_capacity(table.len() + 1);
        rows.push(ConvertedRow::base(table.base().clone(), base_amount));
        for rate in table.rates() {
            rows.push(ConvertedRow::target(rate.currency.clone(), amount_for(rate)?));
        }
        Ok(Self { rows })
    }

    /// The base row.
    pub fn base(&self) -> &ConvertedRow {
        &self.rows[0]
    }

    pub fn base_amount(&self) -> Decimal {
        self.base().amount()
    }

    pub fn rows(&self) -> &[ConvertedRow] {
        &self.rows
    }

    pub fn targets(&self) -> &[ConvertedRow] {
        &self.rows[1..]
    }

    /// Find a row by currency code.
    pub fn get(&self, code: &str) -> Option<&ConvertedRow> {
        self.rows.iter().find(|r| r.code() == code)
    }

    /// Position of a row by currency code.
    pub fn position(&self, code: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.code() == code)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false: a valid list holds at least the base row.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConvertedRow> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<ConvertedRow> {
        self.rows
    }
}

impl<'a> IntoIterator for &'a DisplayList {
    type Item = &'a ConvertedRow;
    type IntoIter = std::slice::Iter<'a, ConvertedRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
