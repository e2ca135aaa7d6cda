//! Simulation controller.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use converter_common::ConvertedRow;
use converter_fx::{RateCache, RateRepository};
use converter_session::{AmountFormat, MetricsSnapshot, Outcome, RatesSession, SessionConfig, SessionResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::metrics::SimulationMetrics;
use crate::scenario::{Scenario, ScenarioStep};
use crate::sink::ConsoleSink;
use crate::source::SimulatedSource;

/// Drives one session against a simulated source.
pub struct SimulationController {
    session: Arc<RatesSession>,
    source: Arc<SimulatedSource>,
    sink: Arc<ConsoleSink>,
    /// Random number generator.
    rng: Arc<RwLock<StdRng>>,
    /// Simulation metrics.
    metrics: Arc<RwLock<SimulationMetrics>>,
    /// Events dispatched but not finished.
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl SimulationController {
    /// Create a controller; the session starts loading on [`Self::initialize`].
    pub fn new(config: SessionConfig, source: Arc<SimulatedSource>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };

        let cache = Arc::new(RateCache::with_config(config.cache.clone()));
        let repository = Arc::new(RateRepository::new(source.clone(), cache));
        let sink = Arc::new(ConsoleSink::new(AmountFormat::new(&config.display)));
        let session = Arc::new(RatesSession::new(config, repository, sink.clone()));

        Self {
            session,
            source,
            sink,
            rng: Arc::new(RwLock::new(rng)),
            metrics: Arc::new(RwLock::new(SimulationMetrics::new())),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Load the initial base.
    pub async fn initialize(&self) -> anyhow::Result<()> {
        info!(session = %self.session.id(), "Initializing session");
        self.dispatch("load", |session| async move { session.load().await })
            .await;
        self.drain().await
    }

    /// Run a scenario.
    pub async fn run_scenario(&self, scenario: Scenario) -> anyhow::Result<()> {
        info!("Running scenario: {} - {}", scenario.name, scenario.description);

        for step in &scenario.steps {
            self.execute_step(step).await;
        }

        self.drain().await
    }

    /// Run random user activity with periodic refresh until `duration`
    /// elapses or Ctrl+C.
    pub async fn run(&self, duration: Option<Duration>, pace: Duration) -> anyhow::Result<()> {
        info!("Running simulation in continuous mode");

        let refresh = self.session.spawn_refresh_loop();

        let activity = async {
            loop {
                self.random_event().await;
                tokio::time::sleep(pace).await;
            }
        };

        tokio::select! {
            _ = activity => {}
            _ = async {
                match duration {
                    Some(d) => tokio::time::sleep(d).await,
                    None => {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            warn!(error = %e, "Cannot listen for Ctrl+C");
                            std::future::pending::<()>().await;
                        }
                    }
                }
            } => {}
        }

        self.drain().await?;
        self.session.shutdown();
        refresh.await?;

        Ok(())
    }

    /// Execute a single scenario step.
    async fn execute_step(&self, step: &ScenarioStep) {
        match step {
            ScenarioStep::Edit { code, text } => {
                let code = match code {
                    Some(code) => code.clone(),
                    None => self.session.snapshot().base_code,
                };
                info!("Typing {:?} into {}", text, code);
                let text = text.clone();
                self.dispatch("edit", move |session| async move {
                    session.on_amount_edited(&code, &text).await
                })
                .await;
            }
            ScenarioStep::Select { code } => {
                info!("Selecting {}", code);
                let code = code.clone();
                self.dispatch("select", move |session| async move {
                    session.on_currency_selected(&code).await
                })
                .await;
            }
            ScenarioStep::Refresh => {
                info!("Refreshing");
                self.dispatch("refresh", |session| async move { session.refresh().await })
                    .await;
            }
            ScenarioStep::Wait { millis } => {
                tokio::time::sleep(Duration::from_millis(*millis)).await;
            }
            ScenarioStep::FailNextFetch { count } => {
                info!("Failing the next {} fetches", count);
                self.source.fail_next(*count);
            }
        }
    }

    /// One random user action, sometimes preceded by quote drift.
    async fn random_event(&self) {
        let rows: Vec<ConvertedRow> = self
            .session
            .snapshot()
            .rendered
            .map(|list| list.into_rows())
            .unwrap_or_default();
        if rows.is_empty() {
            return;
        }

        let (row, action, amount, drift) = {
            let mut rng = self.rng.write().await;
            (
                rng.gen_range(0..rows.len()),
                rng.gen_range(0..3u8),
                rng.gen_range(1..100_000u32),
                rng.gen_bool(0.3),
            )
        };

        if drift {
            self.source.drift().await;
        }

        let code = rows[row].code().to_string();
        match action {
            0 => {
                self.dispatch("select", move |session| async move {
                    session.on_currency_selected(&code).await
                })
                .await
            }
            _ => {
                let text = amount.to_string();
                self.dispatch("edit", move |session| async move {
                    session.on_amount_edited(&code, &text).await
                })
                .await
            }
        }
    }

    /// Send an event to the session without waiting for its result.
    async fn dispatch<F, Fut>(&self, label: &'static str, event: F)
    where
        F: FnOnce(Arc<RatesSession>) -> Fut,
        Fut: Future<Output = SessionResult<Outcome>> + Send + 'static,
    {
        let metrics = self.metrics.clone();
        let started = Instant::now();
        let fut = event(self.session.clone());

        let handle = tokio::spawn(async move {
            let result = fut.await;
            let elapsed = started.elapsed().as_millis() as u64;

            match &result {
                Ok(outcome) => info!(event = label, ?outcome, elapsed_ms = elapsed, "Event finished"),
                Err(e) => warn!(event = label, error = %e, elapsed_ms = elapsed, "Event failed"),
            }
            metrics.write().await.record(&result, elapsed);
        });

        self.pending.lock().await.push(handle);
    }

    /// Wait for every dispatched event to finish.
    async fn drain(&self) -> anyhow::Result<()> {
        let handles = std::mem::take(&mut *self.pending.lock().await);
        for joined in futures::future::join_all(handles).await {
            joined?;
        }
        Ok(())
    }

    /// Get simulation metrics.
    pub async fn get_metrics(&self) -> SimulationMetrics {
        self.metrics.read().await.clone()
    }

    pub fn session_metrics(&self) -> MetricsSnapshot {
        self.session.metrics().snapshot()
    }

    /// Session metrics in Prometheus text format.
    pub fn prometheus(&self) -> String {
        self.session.metrics().to_prometheus()
    }

    pub fn sink(&self) -> &ConsoleSink {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quiet_config(ttl_secs: Option<i64>) -> SessionConfig {
        let mut config = SessionConfig {
            initial_base: "USD".to_string(),
            initial_amount: dec!(100),
            ..SessionConfig::default()
        };
        if let Some(secs) = ttl_secs {
            config.cache.ttl = Some(chrono::Duration::seconds(secs));
        }
        config
    }

    fn controller(latency_ms: u64, ttl_secs: Option<i64>) -> SimulationController {
        let source = Arc::new(SimulatedSource::new(
            Duration::from_millis(latency_ms),
            Duration::ZERO,
            Some(1),
        ));
        SimulationController::new(quiet_config(ttl_secs), source, Some(1))
    }

    #[tokio::test]
    async fn test_typing_scenario_renders_last_amount() {
        let controller = controller(100, Some(0));
        controller.initialize().await.unwrap();

        controller
            .run_scenario(Scenario::load("typing").unwrap())
            .await
            .unwrap();

        let metrics = controller.get_metrics().await;
        assert_eq!(metrics.superseded, 2);
        assert_eq!(metrics.ignored, 1);
        assert_eq!(controller.sink().divergences(), 0);
        assert_eq!(controller.session.snapshot().base_amount, dec!(123));
        // Initial load and the last keystroke.
        assert_eq!(controller.sink().renders(), 2);
    }

    #[tokio::test]
    async fn test_rebase_scenario_keeps_sink_in_step() {
        let controller = controller(10, None);
        controller.initialize().await.unwrap();

        controller
            .run_scenario(Scenario::load("rebase").unwrap())
            .await
            .unwrap();

        let view = controller.session.snapshot();
        assert_eq!(view.base_code, "USD");
        assert_eq!(controller.sink().divergences(), 0);
        assert_eq!(controller.get_metrics().await.failed, 0);
        assert_eq!(controller.session_metrics().local_rebases, 3);
    }

    #[tokio::test]
    async fn test_offline_scenario_keeps_rates() {
        let controller = controller(10, None);
        controller.initialize().await.unwrap();

        controller
            .run_scenario(Scenario::load("offline").unwrap())
            .await
            .unwrap();

        let view = controller.session.snapshot();
        assert!(view.error.is_none());
        assert_eq!(view.rendered.unwrap().base_amount(), dec!(250));
        assert_eq!(controller.get_metrics().await.failed, 2);
        assert_eq!(controller.session_metrics().fetch_failures, 2);
        assert!(controller.prometheus().contains("converter_fetch_failures_total 2"));
    }

    #[tokio::test]
    async fn test_continuous_mode_stops_after_duration() {
        let controller = controller(5, None);
        controller.initialize().await.unwrap();

        controller
            .run(Some(Duration::from_millis(200)), Duration::from_millis(20))
            .await
            .unwrap();

        assert!(controller.get_metrics().await.total_events > 1);
        assert_eq!(controller.sink().divergences(), 0);
    }
}
