//! Remote rate source trait and implementations.

use std::time::Duration;

use async_trait::async_trait;
use converter_common::{Currency, CurrencyRate, ExchangeRateTable};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{FetchError, FetchResult};

/// Trait for remote providers of exchange-rate tables.
#[async_trait]
pub trait RemoteRateSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch the latest table for a base currency.
    async fn get_latest_rates(&self, base_code: &str) -> FetchResult<ExchangeRateTable>;
}

/// Serves tables derived from a fixed set of quotes against one reference
/// currency, optionally after a simulated network latency.
pub struct StaticRateSource {
    name: String,
    reference: Currency,
    quotes: RwLock<Vec<CurrencyRate>>,
    latency: Duration,
}

impl StaticRateSource {
    /// Create a source quoting `quotes` against `reference`.
    pub fn new(name: impl Into<String>, reference: Currency, quotes: Vec<CurrencyRate>) -> Self {
        Self {
            name: name.into(),
            reference,
            quotes: RwLock::new(quotes),
            latency: Duration::ZERO,
        }
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Replace or add the quote of one currency.
    pub fn set_quote(&self, currency: Currency, quote: Decimal) {
        let mut quotes = self.quotes.write();
        match quotes.iter_mut().find(|q| q.currency == currency) {
            Some(existing) => existing.rate = quote,
            None => quotes.push(CurrencyRate::new(currency, quote)),
        }
    }

    /// Current quote of a currency against the reference.
    pub fn quote(&self, code: &str) -> Option<Decimal> {
        if self.reference.code() == code {
            return Some(Decimal::ONE);
        }
        self.quotes
            .read()
            .iter()
            .find(|q| q.currency.code() == code)
            .map(|q| q.rate)
    }

    fn build_table(&self, base_code: &str) -> FetchResult<ExchangeRateTable> {
        let quotes = self.quotes.read();

        let (base, base_quote) = if self.reference.code() == base_code {
            (self.reference.clone(), Decimal::ONE)
        } else {
            quotes
                .iter()
                .find(|q| q.currency.code() == base_code)
                .map(|q| (q.currency.clone(), q.rate))
                .ok_or_else(|| FetchError::UnsupportedBase(base_code.to_string()))?
        };
        if base_quote.is_zero() {
            return Err(FetchError::UnsupportedBase(base_code.to_string()));
        }

        let derive = |currency: &Currency, quote: Decimal| -> FetchResult<CurrencyRate> {
            let rate = quote.checked_div(base_quote).ok_or_else(|| {
                FetchError::Parse(format!("Rate of {} in {} is out of range", currency, base))
            })?;
            Ok(CurrencyRate::new(currency.clone(), rate))
        };

        let mut rates = Vec::with_capacity(quotes.len());
        if base != self.reference {
            rates.push(derive(&self.reference, Decimal::ONE)?);
        }
        for q in quotes.iter().filter(|q| q.currency != base) {
            rates.push(derive(&q.currency, q.rate)?);
        }

        Ok(ExchangeRateTable::new(base, rates)?)
    }
}

#[async_trait]
impl RemoteRateSource for StaticRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_latest_rates(&self, base_code: &str) -> FetchResult<ExchangeRateTable> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let table = self.build_table(base_code)?;
        debug!(
            source = %self.name,
            base = base_code,
            targets = table.len(),
            "Served rate table"
        );
        Ok(table)
    }
}

/// Mock rate source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateSource {
    name: String,
    tables: dashmap::DashMap<String, ExchangeRateTable>,
    delays: parking_lot::Mutex<std::collections::VecDeque<Duration>>,
    failures: parking_lot::Mutex<std::collections::VecDeque<FetchError>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateSource {
    /// Create a new mock source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: dashmap::DashMap::new(),
            delays: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            failures: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Set the table served for its base currency.
    pub fn set_table(&self, table: ExchangeRateTable) {
        self.tables.insert(table.base().code().to_string(), table);
    }

    /// Delay the next unscripted call by `delay`; delays apply in call order.
    pub fn push_delay(&self, delay: Duration) {
        self.delays.lock().push_back(delay);
    }

    /// Fail the next unscripted call with `error`.
    pub fn fail_next(&self, error: FetchError) {
        self.failures.lock().push_back(error);
    }

    /// Number of fetches made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RemoteRateSource for MockRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_latest_rates(&self, base_code: &str) -> FetchResult<ExchangeRateTable> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let delay = self.delays.lock().pop_front();
        let failure = self.failures.lock().pop_front();

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = failure {
            return Err(error);
        }

        self.tables
            .get(base_code)
            .map(|t| t.clone())
            .ok_or_else(|| FetchError::UnsupportedBase(base_code.to_string()))
    }
}
