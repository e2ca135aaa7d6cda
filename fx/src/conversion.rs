//! Conversion of a base amount across a rate table, and rebasing.

use converter_common::{Currency, CurrencyRate, DisplayList, ExchangeRateTable};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{ConversionError, ConversionResult};

/// Pure conversion engine.
///
/// Amounts are computed with exact decimal arithmetic and never rounded
/// here; rounding belongs to presentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionEngine;

impl ConversionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Convert `base_amount` of the table's base into every target currency.
    pub fn convert(
        &self,
        table: &ExchangeRateTable,
        base_amount: Decimal,
    ) -> ConversionResult<DisplayList> {
        DisplayList::from_table(table, base_amount, |rate| {
            base_amount
                .checked_mul(rate.rate)
                .ok_or_else(|| ConversionError::Overflow(rate.currency.code().to_string()))
        })
    }

    /// Make `new_base_code` the base of a new table and convert
    /// `new_base_amount` across it.
    ///
    /// The old base becomes the first target, the other targets keep their
    /// order. Rates are re-derived from the table's origin quotes, which
    /// equals `rate(X) / rate(new base)` but does not accumulate rounding
    /// across repeated rebases.
    pub fn rebase(
        &self,
        table: &ExchangeRateTable,
        new_base_code: &str,
        new_base_amount: Decimal,
    ) -> ConversionResult<(ExchangeRateTable, DisplayList)> {
        if table.base().code() == new_base_code {
            let list = self.convert(table, new_base_amount)?;
            return Ok((table.clone(), list));
        }

        let pivot_rate = table
            .rate_of(new_base_code)
            .ok_or_else(|| ConversionError::MissingRate(new_base_code.to_string()))?;
        if pivot_rate.is_zero() {
            return Err(ConversionError::ZeroRate(new_base_code.to_string()));
        }
        let pivot_quote = table
            .origin_quote(new_base_code)
            .ok_or_else(|| ConversionError::MissingRate(new_base_code.to_string()))?;

        let derive = |currency: &Currency| -> ConversionResult<CurrencyRate> {
            let quote = table
                .origin_quote(currency.code())
                .ok_or_else(|| ConversionError::MissingRate(currency.code().to_string()))?;
            let rate = quote
                .checked_div(pivot_quote)
                .ok_or_else(|| ConversionError::ZeroRate(new_base_code.to_string()))?;
            Ok(CurrencyRate::new(currency.clone(), rate))
        };

        let mut rates = Vec::with_capacity(table.len());
        rates.push(derive(table.base())?);
        for entry in table.rates() {
            if entry.currency.code() != new_base_code {
                rates.push(derive(&entry.currency)?);
            }
        }

        let new_base = table
            .currency(new_base_code)
            .cloned()
            .ok_or_else(|| ConversionError::MissingRate(new_base_code.to_string()))?;
        let rebased = ExchangeRateTable::from_origin_quotes(
            new_base,
            rates,
            table.origin_quotes().clone(),
            table.fetched_at(),
        )?;

        debug!(
            from = %table.base(),
            to = new_base_code,
            amount = %new_base_amount,
            "Rebased rate table"
        );

        let list = self.convert(&rebased, new_base_amount)?;
        Ok((rebased, list))
    }
}
