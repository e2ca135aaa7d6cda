//! Single source of truth for the latest rates of a base currency.

use std::sync::Arc;

use converter_common::ExchangeRateTable;
use tracing::{debug, info, instrument, warn};

use crate::cache::LocalRateStore;
use crate::error::FetchResult;
use crate::provider::RemoteRateSource;

/// Serves rate tables from the local store when they are actual and from
/// the remote source otherwise.
pub struct RateRepository {
    remote: Arc<dyn RemoteRateSource>,
    local: Arc<dyn LocalRateStore>,
}

impl RateRepository {
    /// Create a repository over a remote source and a local store.
    pub fn new(remote: Arc<dyn RemoteRateSource>, local: Arc<dyn LocalRateStore>) -> Self {
        Self { remote, local }
    }

    /// Get the latest table for `base_code`.
    ///
    /// Without `force_reload`, an actual cached table is returned with no
    /// remote access. Otherwise the remote source is asked; a successful
    /// answer is saved once before being returned, a failure is returned
    /// unchanged and leaves the store untouched.
    #[instrument(skip(self), fields(source = self.remote.name()))]
    pub async fn get_latest_rates(
        &self,
        base_code: &str,
        force_reload: bool,
    ) -> FetchResult<Arc<ExchangeRateTable>> {
        if !force_reload && self.local.has_actual_data(base_code) {
            if let Some(cached) = self.local.get(base_code) {
                debug!("Using cached rates");
                return Ok(cached);
            }
        }

        let table = match self.remote.get_latest_rates(base_code).await {
            Ok(table) => Arc::new(table),
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Rate fetch failed");
                return Err(e);
            }
        };

        self.local.save(table.clone());

        info!(targets = table.len(), "Fetched latest rates");

        Ok(table)
    }

    /// The locally stored table for `base_code`, fresh or not.
    pub fn cached(&self, base_code: &str) -> Option<Arc<ExchangeRateTable>> {
        self.local.get(base_code)
    }
}
