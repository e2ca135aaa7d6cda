//! The live conversion pipeline of one user session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use converter_common::{ConvertedRow, DisplayList, ExchangeRateTable};
use converter_fx::{ConversionEngine, RateRepository};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{Outcome, SessionError, SessionResult};
use crate::input::InputNormalizer;
use crate::metrics::{SessionMetrics, SharedSessionMetrics};
use crate::reconciler::RateListReconciler;
use crate::render::RenderSink;
use crate::state::{SessionState, ViewState};

/// One logical pipeline from user events to rendered rows.
///
/// Every event takes a ticket from a monotonically increasing sequence
/// while holding the view lock, together with recording the event's
/// intent. A fetched result is committed only if its ticket is still the
/// latest when the lock is taken again, so a slow answer to an older event
/// can never overwrite what a newer event rendered.
pub struct RatesSession {
    id: Uuid,
    config: SessionConfig,
    repository: Arc<RateRepository>,
    engine: ConversionEngine,
    reconciler: RateListReconciler,
    normalizer: InputNormalizer,
    sink: Arc<dyn RenderSink>,
    view: Mutex<ViewState>,
    sequence: AtomicU64,
    state: RwLock<SessionState>,
    metrics: SharedSessionMetrics,
    shutdown_tx: watch::Sender<bool>,
}

impl RatesSession {
    /// Create a session; nothing is fetched until [`RatesSession::load`].
    pub fn new(
        config: SessionConfig,
        repository: Arc<RateRepository>,
        sink: Arc<dyn RenderSink>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let view = ViewState::new(config.initial_base.clone(), config.initial_amount);

        Self {
            id: Uuid::now_v7(),
            normalizer: InputNormalizer::new(&config.input),
            config,
            repository,
            engine: ConversionEngine::new(),
            reconciler: RateListReconciler::new(),
            sink,
            view: Mutex::new(view),
            sequence: AtomicU64::new(0),
            state: RwLock::new(SessionState::Starting),
            metrics: Arc::new(SessionMetrics::new()),
            shutdown_tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn metrics(&self) -> SharedSessionMetrics {
        self.metrics.clone()
    }

    /// Copy of the current view state.
    pub fn snapshot(&self) -> ViewState {
        self.view.lock().clone()
    }

    /// Show the configured base currency and amount.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn load(&self) -> SessionResult<Outcome> {
        self.ensure_accepting()?;
        {
            let mut state = self.state.write();
            if *state == SessionState::Starting {
                *state = SessionState::Running;
            }
        }

        let (ticket, base_code) = {
            let mut view = self.view.lock();
            (self.next_ticket(&mut view), view.base_code.clone())
        };
        self.recompute(ticket, &base_code, false).await
    }

    /// Reload the current base from the remote source.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn refresh(&self) -> SessionResult<Outcome> {
        self.ensure_accepting()?;

        let (ticket, base_code) = {
            let mut view = self.view.lock();
            (self.next_ticket(&mut view), view.base_code.clone())
        };
        self.recompute(ticket, &base_code, true).await
    }

    /// The user typed `raw` into the row of `code`.
    ///
    /// Text that is not a valid amount is ignored and leaves the display
    /// as it is. Typing into a target row first makes it the base.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn on_amount_edited(&self, code: &str, raw: &str) -> SessionResult<Outcome> {
        self.ensure_accepting()?;

        let amount = match self.normalizer.parse(raw) {
            Ok(amount) => amount,
            Err(rejected) => {
                debug!(reason = %rejected, "Ignoring edit");
                self.metrics.input_ignored();
                return Ok(Outcome::InputIgnored);
            }
        };

        let code = code.to_uppercase();
        let ticket = {
            let mut view = self.view.lock();
            if view.base_code == code {
                view.base_amount = amount;
                self.next_ticket(&mut view)
            } else if view.displays(&code) {
                self.rebase_locally(&mut view, &code, amount)
            } else {
                return Err(SessionError::UnknownCurrency(code));
            }
        };
        self.recompute(ticket, &code, false).await
    }

    /// The user picked the row of `code` as the new base, keeping its
    /// exact amount.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn on_currency_selected(&self, code: &str) -> SessionResult<Outcome> {
        self.ensure_accepting()?;

        let code = code.to_uppercase();
        let ticket = {
            let mut view = self.view.lock();
            let amount = view
                .rendered
                .as_ref()
                .and_then(|list| list.get(&code))
                .map(ConvertedRow::amount)
                .ok_or_else(|| SessionError::UnknownCurrency(code.clone()))?;
            self.rebase_locally(&mut view, &code, amount)
        };
        self.recompute(ticket, &code, false).await
    }

    /// Force-reload the current base every `refresh_interval` until
    /// [`RatesSession::shutdown`].
    pub fn spawn_refresh_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let period = self.config.refresh_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match session.refresh().await {
                            Ok(outcome) => debug!(?outcome, "Periodic refresh"),
                            Err(SessionError::Stopped) => break,
                            Err(e) => warn!(error = %e, "Periodic refresh failed"),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!(session = %session.id, "Refresh loop stopped");
        })
    }

    /// Stop the session; later events return [`SessionError::Stopped`].
    pub fn shutdown(&self) {
        *self.state.write() = SessionState::Stopped;
        self.shutdown_tx.send_replace(true);
        info!(session = %self.id, "Session stopped");
    }

    // --- Private methods ---

    fn ensure_accepting(&self) -> SessionResult<()> {
        if !self.state.read().accepts_events() {
            return Err(SessionError::Stopped);
        }
        Ok(())
    }

    /// Take the next ticket. Only called with the view lock held.
    fn next_ticket(&self, view: &mut ViewState) -> u64 {
        view.loading = true;
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Make `code` the base and render the rebased current table at once,
    /// before any fetch for the new base.
    fn rebase_locally(&self, view: &mut ViewState, code: &str, amount: Decimal) -> u64 {
        view.base_code = code.to_string();
        view.base_amount = amount;
        let ticket = self.next_ticket(view);

        if let Some(table) = view.table.clone() {
            match self.engine.rebase(&table, code, amount) {
                Ok((rebased, list)) => {
                    self.commit(view, ticket, Arc::new(rebased), list);
                    self.metrics.local_rebase();
                }
                Err(e) => {
                    warn!(base = code, error = %e, "Local rebase failed, fetching new base");
                }
            }
        }

        ticket
    }

    async fn recompute(&self, ticket: u64, base_code: &str, force: bool) -> SessionResult<Outcome> {
        let result = self.repository.get_latest_rates(base_code, force).await;

        let mut view = self.view.lock();
        if self.sequence.load(Ordering::SeqCst) != ticket {
            debug!(sequence = ticket, "Dropping superseded result");
            self.metrics.superseded();
            return Ok(Outcome::Superseded { sequence: ticket });
        }
        view.loading = false;

        let table = match result {
            Ok(table) => table,
            Err(e) => {
                self.metrics.fetch_failed();
                return Err(self.surface(&mut view, SessionError::from(e)));
            }
        };

        match self.engine.convert(&table, view.base_amount) {
            Ok(list) => {
                let changes = self.commit(&mut view, ticket, table, list);
                Ok(Outcome::Rendered {
                    sequence: ticket,
                    changes,
                })
            }
            Err(e) => {
                warn!(base = base_code, error = %e, "Conversion failed, keeping last render");
                Err(self.surface(&mut view, SessionError::from(e)))
            }
        }
    }

    /// Record `error` and show it; the last render stays on screen.
    fn surface(&self, view: &mut ViewState, error: SessionError) -> SessionError {
        view.error = Some(error.clone());
        self.sink.show_error(&error);
        error
    }

    /// Diff against the last render, hand the changes to the sink and
    /// record the new list. Returns the number of changes.
    fn commit(
        &self,
        view: &mut ViewState,
        ticket: u64,
        table: Arc<ExchangeRateTable>,
        list: DisplayList,
    ) -> usize {
        let changes = match &view.rendered {
            Some(previous) => self.reconciler.diff(previous.rows(), list.rows()),
            None => self.reconciler.initial(&list),
        };

        self.sink.apply_changes(&list, &changes);

        debug!(
            sequence = ticket,
            base = %list.base().currency(),
            amount = %list.base_amount(),
            changes = changes.len(),
            "Rendered rates"
        );

        view.table = Some(table);
        view.rendered = Some(list);
        view.error = None;
        view.committed_sequence = ticket;
        self.metrics.rendered(changes.len());

        changes.len()
    }
}
