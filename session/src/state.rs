//! Session lifecycle and view state.

use std::sync::Arc;

use converter_common::{DisplayList, ExchangeRateTable};
use rust_decimal::Decimal;

use crate::error::SessionError;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created; nothing loaded yet.
    Starting,
    /// At least one load was requested.
    Running,
    /// Stopped; every operation is refused.
    Stopped,
}

impl SessionState {
    /// Check if the session still accepts events.
    pub fn accepts_events(&self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped)
    }
}

/// What the session currently intends to show and what it last rendered.
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Base currency of the latest event.
    pub base_code: String,
    /// Base amount of the latest event.
    pub base_amount: Decimal,
    /// Table behind the rendered list.
    pub table: Option<Arc<ExchangeRateTable>>,
    /// Last list handed to the render sink.
    pub rendered: Option<DisplayList>,
    /// Error of the latest failed fetch, cleared by the next render.
    pub error: Option<SessionError>,
    /// Whether the latest event is still waiting for rates.
    pub loading: bool,
    /// Sequence number of the last committed result.
    pub committed_sequence: u64,
}

impl ViewState {
    pub fn new(base_code: impl Into<String>, base_amount: Decimal) -> Self {
        Self {
            base_code: base_code.into().to_uppercase(),
            base_amount,
            table: None,
            rendered: None,
            error: None,
            loading: false,
            committed_sequence: 0,
        }
    }

    /// Whether `code` is a row of the rendered list.
    pub fn displays(&self, code: &str) -> bool {
        self.rendered
            .as_ref()
            .is_some_and(|list| list.position(code).is_some())
    }
}
