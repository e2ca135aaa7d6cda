//! Converter FX
//!
//! Rate acquisition and conversion for the currency converter.
//!
//! # Features
//!
//! - Remote rate sources behind an async trait
//! - Per-base-currency rate cache with configurable TTL
//! - Repository deciding between cached and fresh rates
//! - Exact decimal conversion and rebasing onto another currency
//!
//! # Example
//!
//! ```rust,ignore
//! use converter_fx::{ConversionEngine, RateCache, RateRepository, StaticRateSource};
//!
//! let repository = RateRepository::new(Arc::new(source), Arc::new(RateCache::new()));
//! let table = repository.get_latest_rates("USD", false).await?;
//!
//! let engine = ConversionEngine::new();
//! let list = engine.convert(&table, dec!(100))?;
//! let (eur_table, eur_list) = engine.rebase(&table, "EUR", dec!(90))?;
//! ```

pub mod cache;
pub mod conversion;
pub mod error;
pub mod provider;
pub mod repository;

pub use cache::{LocalRateStore, RateCache, RateCacheConfig};
pub use conversion::ConversionEngine;
pub use error::{ConversionError, ConversionResult, FetchError, FetchResult};
#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateSource;
pub use provider::{RemoteRateSource, StaticRateSource};
pub use repository::RateRepository;
