//! Parsing of typed amounts and formatting of displayed ones.

use converter_common::Currency;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::config::{DisplayConfig, InputConfig};

/// Characters accepted as the decimal separator.
pub const DECIMAL_SEPARATORS: [char; 2] = ['.', ','];

/// Why a typed text was not turned into an amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputRejected {
    #[error("Character {ch:?} at position {position} is not accepted")]
    IllegalCharacter { ch: char, position: usize },

    #[error("Only one decimal separator is allowed")]
    MultipleSeparators,

    #[error("{digits} integer digits exceed the limit of {max}")]
    TooManyIntegerDigits { digits: usize, max: usize },

    #[error("Amount {0} cannot be represented exactly")]
    Unrepresentable(String),
}

/// Keystroke filter: digits and the decimal separators.
pub fn accepts_char(ch: char) -> bool {
    ch.is_ascii_digit() || DECIMAL_SEPARATORS.contains(&ch)
}

/// Parse typed text into an exact amount.
///
/// Empty and separator-only text is zero. Leading zeros do not count
/// towards `max_integer_digits`; fraction digits beyond
/// `max_fraction_digits` are dropped without rounding.
pub fn parse(
    raw: &str,
    max_integer_digits: usize,
    max_fraction_digits: u32,
) -> Result<Decimal, InputRejected> {
    let mut separator = None;
    for (position, ch) in raw.char_indices() {
        if !accepts_char(ch) {
            return Err(InputRejected::IllegalCharacter { ch, position });
        }
        if DECIMAL_SEPARATORS.contains(&ch) {
            if separator.is_some() {
                return Err(InputRejected::MultipleSeparators);
            }
            separator = Some(position);
        }
    }

    // Separators are single-byte, so slicing around them is safe.
    let (integer, fraction) = match separator {
        Some(position) => (&raw[..position], &raw[position + 1..]),
        None => (raw, ""),
    };

    let integer = integer.trim_start_matches('0');
    if integer.len() > max_integer_digits {
        return Err(InputRejected::TooManyIntegerDigits {
            digits: integer.len(),
            max: max_integer_digits,
        });
    }

    let keep = fraction.len().min(max_fraction_digits as usize);
    let fraction = &fraction[..keep];

    if integer.is_empty() && fraction.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let integer = if integer.is_empty() { "0" } else { integer };
    let normalized = if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    };

    Decimal::from_str_exact(&normalized).map_err(|_| InputRejected::Unrepresentable(normalized))
}

/// Input normalizer bound to the configured limits.
#[derive(Debug, Clone)]
pub struct InputNormalizer {
    max_integer_digits: usize,
    max_fraction_digits: u32,
}

impl InputNormalizer {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            max_integer_digits: config.max_integer_digits,
            max_fraction_digits: config.max_fraction_digits,
        }
    }

    /// Parse typed text with the configured limits.
    pub fn parse(&self, raw: &str) -> Result<Decimal, InputRejected> {
        parse(raw, self.max_integer_digits, self.max_fraction_digits)
    }

    /// Whether a keystroke may be typed at all.
    pub fn accepts(&self, ch: char) -> bool {
        accepts_char(ch)
    }

    /// Whether the text resulting from an edit may replace the current text.
    pub fn admits(&self, candidate: &str) -> bool {
        self.parse(candidate).is_ok()
    }
}

impl Default for InputNormalizer {
    fn default() -> Self {
        Self::new(&InputConfig::default())
    }
}

/// Presentation of amounts: rounding, trailing-zero suppression, grouping.
///
/// The formatted text is for display only and is never parsed back into
/// an amount.
#[derive(Debug, Clone)]
pub struct AmountFormat {
    fraction_digits: Option<u32>,
    group_separator: char,
    decimal_separator: char,
}

impl AmountFormat {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            fraction_digits: config.fraction_digits,
            group_separator: config.group_separator,
            decimal_separator: config.decimal_separator,
        }
    }

    /// Format with the configured fraction digits, or two when unset.
    pub fn format(&self, amount: Decimal) -> String {
        self.render(amount, self.fraction_digits.unwrap_or(2))
    }

    /// Format with the configured fraction digits, or the currency's own.
    pub fn format_for(&self, currency: &Currency, amount: Decimal) -> String {
        self.render(
            amount,
            self.fraction_digits.unwrap_or_else(|| currency.decimal_places()),
        )
    }

    /// Whether the amount displays as a bare zero.
    pub fn is_placeholder(&self, currency: &Currency, amount: Decimal) -> bool {
        self.format_for(currency, amount) == "0"
    }

    fn render(&self, amount: Decimal, fraction_digits: u32) -> String {
        let rounded = amount
            .round_dp_with_strategy(fraction_digits, RoundingStrategy::MidpointAwayFromZero)
            .normalize();
        let negative = rounded < Decimal::ZERO;
        let digits = rounded.abs().to_string();

        let (integer, fraction) = match digits.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (digits.as_str(), None),
        };

        let mut out = String::with_capacity(digits.len() + integer.len() / 3 + 1);
        if negative {
            out.push('-');
        }
        for (i, ch) in integer.chars().enumerate() {
            if i > 0 && (integer.len() - i) % 3 == 0 {
                out.push(self.group_separator);
            }
            out.push(ch);
        }
        if let Some(fraction) = fraction {
            out.push(self.decimal_separator);
            out.push_str(fraction);
        }
        out
    }
}

impl Default for AmountFormat {
    fn default() -> Self {
        Self::new(&DisplayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_truncates_fraction() {
        assert_eq!(parse("12.345", 6, 2), Ok(dec!(12.34)));
        assert_eq!(parse("0.999", 6, 2), Ok(dec!(0.99)));
        assert_eq!(parse("5.5", 6, 0), Ok(dec!(5)));
    }

    #[test]
    fn test_parse_empty_is_zero() {
        assert_eq!(parse("", 6, 2), Ok(Decimal::ZERO));
        assert_eq!(parse(".", 6, 2), Ok(Decimal::ZERO));
        assert_eq!(parse(",", 6, 2), Ok(Decimal::ZERO));
        assert_eq!(parse("000", 6, 2), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_parse_rejects_magnitude() {
        assert_eq!(
            parse("1234567", 6, 2),
            Err(InputRejected::TooManyIntegerDigits { digits: 7, max: 6 })
        );
        assert_eq!(parse("123456", 6, 2), Ok(dec!(123456)));
    }

    #[test]
    fn test_parse_ignores_leading_zeros() {
        assert_eq!(parse("0000123456", 6, 2), Ok(dec!(123456)));
        assert_eq!(parse("007.5", 1, 2), Ok(dec!(7.5)));
    }

    #[test]
    fn test_parse_separators() {
        assert_eq!(parse("12,5", 6, 2), Ok(dec!(12.5)));
        assert_eq!(parse(".5", 6, 2), Ok(dec!(0.5)));
        assert_eq!(parse("12.", 6, 2), Ok(dec!(12)));
        assert_eq!(parse("1.2.3", 6, 2), Err(InputRejected::MultipleSeparators));
        assert_eq!(parse("1.2,3", 6, 2), Err(InputRejected::MultipleSeparators));
    }

    #[test]
    fn test_parse_rejects_other_characters() {
        assert_eq!(
            parse("-5", 6, 2),
            Err(InputRejected::IllegalCharacter { ch: '-', position: 0 })
        );
        assert_eq!(
            parse("1 000", 6, 2),
            Err(InputRejected::IllegalCharacter { ch: ' ', position: 1 })
        );
        assert!(matches!(parse("1e5", 6, 2), Err(InputRejected::IllegalCharacter { ch: 'e', .. })));
    }

    #[test]
    fn test_accepts_char() {
        assert!(accepts_char('7'));
        assert!(accepts_char('.'));
        assert!(accepts_char(','));
        assert!(!accepts_char('-'));
        assert!(!accepts_char('٣'));
    }

    #[test]
    fn test_normalizer_uses_config() {
        let normalizer = InputNormalizer::new(&InputConfig {
            max_integer_digits: 3,
            max_fraction_digits: 1,
        });

        assert_eq!(normalizer.parse("999.99"), Ok(dec!(999.9)));
        assert!(normalizer.admits("999"));
        assert!(!normalizer.admits("1000"));
        assert!(!normalizer.accepts('x'));
    }

    #[test]
    fn test_format_groups_and_trims() {
        let format = AmountFormat::default();

        assert_eq!(format.format(dec!(1234567.891)), "1,234,567.89");
        assert_eq!(format.format(dec!(90.00)), "90");
        assert_eq!(format.format(dec!(80.50)), "80.5");
        assert_eq!(format.format(dec!(999.999)), "1,000");
        assert_eq!(format.format(dec!(0.004)), "0");
        assert_eq!(format.format(dec!(123)), "123");
    }

    #[test]
    fn test_format_rounding_is_display_only() {
        let format = AmountFormat::default();
        let amount = dec!(90) * (dec!(1) / dec!(0.9));

        assert_eq!(format.format(amount), "100");
        assert_ne!(amount, dec!(100));
    }

    #[test]
    fn test_format_per_currency() {
        let format = AmountFormat::default();

        assert_eq!(format.format_for(&Currency::jpy(), dec!(1499.6)), "1,500");
        assert_eq!(format.format_for(&Currency::new("KWD"), dec!(1.23456)), "1.235");
        assert!(format.is_placeholder(&Currency::usd(), dec!(0.001)));
        assert!(!format.is_placeholder(&Currency::usd(), dec!(0.01)));
    }

    #[test]
    fn test_format_custom_separators() {
        let format = AmountFormat::new(&DisplayConfig {
            fraction_digits: Some(3),
            group_separator: ' ',
            decimal_separator: ',',
        });

        assert_eq!(format.format(dec!(12345.6789)), "12 345,679");
    }
}
