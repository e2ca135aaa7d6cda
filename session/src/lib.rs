//! Converter Session
//!
//! The live pipeline between user events and a rendered list of converted
//! amounts: input parsing, rate fetching with last-event-wins supersession,
//! conversion and row-level reconciliation.

pub mod config;
pub mod error;
pub mod input;
pub mod metrics;
pub mod reconciler;
pub mod render;
pub mod session;
pub mod state;

pub use config::{DisplayConfig, InputConfig, SessionConfig};
pub use error::{Outcome, SessionError, SessionResult};
pub use input::{accepts_char, parse, AmountFormat, InputNormalizer, InputRejected};
pub use metrics::{MetricsSnapshot, SessionMetrics, SharedSessionMetrics};
pub use reconciler::{replay, ChangeKind, RateListReconciler, ReplayError, RowChange};
#[cfg(any(test, feature = "test-utils"))]
pub use render::{RecordingSink, SinkEvent};
pub use render::RenderSink;
pub use session::RatesSession;
pub use state::{SessionState, ViewState};
