//! Simulated remote rate source: latency with jitter, scripted outages and
//! quote drift.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use converter_common::{Currency, CurrencyRate, ExchangeRateTable};
use converter_fx::{FetchError, FetchResult, RemoteRateSource, StaticRateSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Quotes against USD the simulation starts from.
pub fn reference_quotes() -> Vec<CurrencyRate> {
    [
        ("EUR", Decimal::new(92, 2)),
        ("GBP", Decimal::new(79, 2)),
        ("JPY", Decimal::new(1495, 1)),
        ("CHF", Decimal::new(88, 2)),
        ("CAD", Decimal::new(136, 2)),
        ("AUD", Decimal::new(152, 2)),
        ("SEK", Decimal::new(1045, 2)),
        ("PLN", Decimal::new(402, 2)),
    ]
    .into_iter()
    .map(|(code, quote)| CurrencyRate::new(Currency::new(code), quote))
    .collect()
}

/// Wraps a [`StaticRateSource`] with network-like behavior.
pub struct SimulatedSource {
    inner: StaticRateSource,
    jitter: Duration,
    rng: Mutex<StdRng>,
    outages: AtomicU32,
}

impl SimulatedSource {
    pub fn new(latency: Duration, jitter: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            inner: StaticRateSource::new("simulated", Currency::usd(), reference_quotes())
                .with_latency(latency),
            jitter,
            rng: Mutex::new(rng),
            outages: AtomicU32::new(0),
        }
    }

    /// Fail the next `count` fetches with a network error.
    pub fn fail_next(&self, count: u32) {
        self.outages.fetch_add(count, Ordering::SeqCst);
    }

    /// Move one random quote by up to half a percent either way.
    pub async fn drift(&self) {
        let (code, factor) = {
            let mut rng = self.rng.lock().await;
            let quotes = reference_quotes();
            let pick = &quotes[rng.gen_range(0..quotes.len())];
            let basis_points: i64 = rng.gen_range(-50..=50);
            (pick.currency.code().to_string(), Decimal::ONE + Decimal::new(basis_points, 4))
        };

        let Some(quote) = self.inner.quote(&code) else {
            return;
        };
        if let Some(moved) = quote.checked_mul(factor) {
            let moved = moved.round_dp(6);
            debug!(code = %code, from = %quote, to = %moved, "Quote drifted");
            self.inner.set_quote(Currency::new(&code), moved);
        }
    }

    fn take_outage(&self) -> bool {
        self.outages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RemoteRateSource for SimulatedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_latest_rates(&self, base_code: &str) -> FetchResult<ExchangeRateTable> {
        let failing = self.take_outage();

        if !self.jitter.is_zero() {
            let extra = {
                let mut rng = self.rng.lock().await;
                rng.gen_range(0..=self.jitter.as_millis() as u64)
            };
            tokio::time::sleep(Duration::from_millis(extra)).await;
        }

        if failing {
            warn!(base = base_code, "Simulated outage");
            // Failed requests take as long as successful ones.
            let _ = self.inner.get_latest_rates(base_code).await;
            return Err(FetchError::Network("simulated outage".to_string()));
        }

        self.inner.get_latest_rates(base_code).await
    }
}
