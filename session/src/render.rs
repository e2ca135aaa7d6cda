//! Render sink: where committed lists and their change sequences go.

use converter_common::DisplayList;

use crate::error::SessionError;
use crate::reconciler::RowChange;

/// Receives every committed render and every surfaced failure.
///
/// Calls are made while the session holds its view lock, in commit order;
/// implementations must not call back into the session.
pub trait RenderSink: Send + Sync {
    /// Apply `changes` to the rows currently shown; `list` is the result.
    fn apply_changes(&self, list: &DisplayList, changes: &[RowChange]);

    /// Show a failure while keeping the current rows.
    fn show_error(&self, error: &SessionError);
}

#[cfg(any(test, feature = "test-utils"))]
pub use recording::{RecordingSink, SinkEvent};

#[cfg(any(test, feature = "test-utils"))]
mod recording {
    use converter_common::{ConvertedRow, DisplayList};
    use parking_lot::Mutex;

    use super::RenderSink;
    use crate::error::SessionError;
    use crate::reconciler::{replay, ReplayError, RowChange};

    /// One call received by a [`RecordingSink`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum SinkEvent {
        Applied {
            list: DisplayList,
            changes: Vec<RowChange>,
        },
        Error(SessionError),
    }

    /// Records every call and replays each change sequence onto its own rows.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        rows: Mutex<Vec<ConvertedRow>>,
        events: Mutex<Vec<SinkEvent>>,
        replay_errors: Mutex<Vec<ReplayError>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Rows as rebuilt from the change sequences alone.
        pub fn rows(&self) -> Vec<ConvertedRow> {
            self.rows.lock().clone()
        }

        pub fn events(&self) -> Vec<SinkEvent> {
            self.events.lock().clone()
        }

        /// Every list handed over, in order.
        pub fn rendered(&self) -> Vec<DisplayList> {
            self.events
                .lock()
                .iter()
                .filter_map(|event| match event {
                    SinkEvent::Applied { list, .. } => Some(list.clone()),
                    SinkEvent::Error(_) => None,
                })
                .collect()
        }

        pub fn errors(&self) -> Vec<SessionError> {
            self.events
                .lock()
                .iter()
                .filter_map(|event| match event {
                    SinkEvent::Error(error) => Some(error.clone()),
                    SinkEvent::Applied { .. } => None,
                })
                .collect()
        }

        pub fn replay_errors(&self) -> Vec<ReplayError> {
            self.replay_errors.lock().clone()
        }
    }

    impl RenderSink for RecordingSink {
        fn apply_changes(&self, list: &DisplayList, changes: &[RowChange]) {
            if let Err(e) = replay(&mut self.rows.lock(), changes) {
                self.replay_errors.lock().push(e);
            }
            self.events.lock().push(SinkEvent::Applied {
                list: list.clone(),
                changes: changes.to_vec(),
            });
        }

        fn show_error(&self, error: &SessionError) {
            self.events.lock().push(SinkEvent::Error(error.clone()));
        }
    }
}
