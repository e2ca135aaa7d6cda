//! Session configuration.

use std::time::Duration;

use converter_fx::RateCacheConfig;
use rust_decimal::Decimal;

/// Limits applied to typed amounts.
#[derive(Debug, Clone)]
pub struct InputConfig {
    /// Maximum digits before the decimal separator (leading zeros excluded).
    pub max_integer_digits: usize,
    /// Fraction digits kept; further digits are truncated.
    pub max_fraction_digits: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_integer_digits: 9,
            max_fraction_digits: 2,
        }
    }
}

/// Presentation of amounts.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Fraction digits shown; `None` uses each currency's standard places.
    pub fraction_digits: Option<u32>,
    /// Separator between groups of three integer digits.
    pub group_separator: char,
    /// Separator between integer and fraction digits.
    pub decimal_separator: char,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fraction_digits: None,
            group_separator: ',',
            decimal_separator: '.',
        }
    }
}

/// Main session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base currency shown when the session starts.
    pub initial_base: String,
    /// Base amount shown when the session starts.
    pub initial_amount: Decimal,
    /// Input limits.
    pub input: InputConfig,
    /// Amount presentation.
    pub display: DisplayConfig,
    /// Rate cache freshness.
    pub cache: RateCacheConfig,
    /// Interval of the periodic forced reload.
    pub refresh_interval: Duration,
    /// Log level.
    pub log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_base: "EUR".to_string(),
            initial_amount: Decimal::ONE_HUNDRED,
            input: InputConfig::default(),
            display: DisplayConfig::default(),
            cache: RateCacheConfig::default(),
            refresh_interval: Duration::from_secs(1),
            log_level: "info".to_string(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base) = std::env::var("CONVERTER_BASE_CURRENCY") {
            config.initial_base = base.to_uppercase();
        }

        if let Ok(amount) = std::env::var("CONVERTER_BASE_AMOUNT") {
            if let Ok(amount) = amount.parse() {
                config.initial_amount = amount;
            }
        }

        if let Ok(ms) = std::env::var("CONVERTER_REFRESH_MS") {
            if let Ok(ms) = ms.parse() {
                config.refresh_interval = Duration::from_millis(ms);
            }
        }

        if let Ok(secs) = std::env::var("CONVERTER_CACHE_TTL_SECS") {
            if let Ok(secs) = secs.parse::<i64>() {
                config.cache.ttl = (secs > 0).then(|| chrono::Duration::seconds(secs));
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_base.is_empty() {
            return Err("Initial base currency cannot be empty".to_string());
        }

        if self.initial_amount < Decimal::ZERO {
            return Err("Initial amount cannot be negative".to_string());
        }

        if self.input.max_integer_digits == 0 {
            return Err("At least one integer digit must be allowed".to_string());
        }

        if self.input.max_integer_digits + self.input.max_fraction_digits as usize > 28 {
            return Err("Input digits cannot exceed 28 significant digits".to_string());
        }

        if self.refresh_interval.is_zero() {
            return Err("Refresh interval cannot be 0".to_string());
        }

        if matches!(self.cache.ttl, Some(ttl) if ttl < chrono::Duration::zero()) {
            return Err("Cache TTL cannot be negative".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = SessionConfig::default();
        config.refresh_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.input.max_integer_digits = 20;
        config.input.max_fraction_digits = 10;
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.initial_amount = Decimal::NEGATIVE_ONE;
        assert!(config.validate().is_err());
    }
}
