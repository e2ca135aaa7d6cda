//! Console render sink.

use std::sync::atomic::{AtomicU64, Ordering};

use converter_common::{ConvertedRow, DisplayList};
use converter_session::{replay, AmountFormat, RenderSink, RowChange, SessionError};
use parking_lot::Mutex;
use tracing::{error, info, warn};

/// Prints every render. Its rows are rebuilt only from the change
/// sequences it receives, and checked against the list each time.
pub struct ConsoleSink {
    format: AmountFormat,
    rows: Mutex<Vec<ConvertedRow>>,
    renders: AtomicU64,
    divergences: AtomicU64,
}

impl ConsoleSink {
    pub fn new(format: AmountFormat) -> Self {
        Self {
            format,
            rows: Mutex::new(Vec::new()),
            renders: AtomicU64::new(0),
            divergences: AtomicU64::new(0),
        }
    }

    /// Renders whose replayed rows did not match the committed list.
    pub fn divergences(&self) -> u64 {
        self.divergences.load(Ordering::Relaxed)
    }

    pub fn renders(&self) -> u64 {
        self.renders.load(Ordering::Relaxed)
    }

    /// One line per row: `*` marks the base, placeholders show as `-`.
    pub fn describe(&self, rows: &[ConvertedRow]) -> String {
        rows.iter()
            .map(|row| {
                let amount = if self.format.is_placeholder(row.currency(), row.amount()) {
                    "-".to_string()
                } else {
                    self.format.format_for(row.currency(), row.amount())
                };
                let marker = if row.is_base() { "*" } else { " " };
                format!("{marker} {:<4}{:>16}  {}", row.code(), amount, row.currency().name())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl RenderSink for ConsoleSink {
    fn apply_changes(&self, list: &DisplayList, changes: &[RowChange]) {
        let mut rows = self.rows.lock();

        if let Err(e) = replay(&mut rows, changes) {
            error!(error = %e, "Change sequence did not apply");
            self.divergences.fetch_add(1, Ordering::Relaxed);
            *rows = list.rows().to_vec();
        } else if rows.as_slice() != list.rows() {
            error!("Replayed rows differ from the committed list");
            self.divergences.fetch_add(1, Ordering::Relaxed);
            *rows = list.rows().to_vec();
        }

        self.renders.fetch_add(1, Ordering::Relaxed);
        info!(
            base = %list.base().currency(),
            changes = changes.len(),
            "Render\n{}",
            self.describe(&rows)
        );
    }

    fn show_error(&self, error: &SessionError) {
        warn!(error = %error, retryable = error.is_retryable(), "Showing error, keeping last rates");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use converter_common::Currency;
    use converter_session::RateListReconciler;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn list(rows: Vec<ConvertedRow>) -> DisplayList {
        DisplayList::new(rows).unwrap()
    }

    #[test]
    fn test_sink_follows_changes() {
        let sink = ConsoleSink::new(AmountFormat::default());
        let reconciler = RateListReconciler::new();
        let first = list(vec![
            ConvertedRow::base(Currency::usd(), dec!(100)),
            ConvertedRow::target(Currency::eur(), dec!(90)),
        ]);
        let second = list(vec![
            ConvertedRow::base(Currency::eur(), dec!(90)),
            ConvertedRow::target(Currency::usd(), dec!(100)),
        ]);

        sink.apply_changes(&first, &reconciler.initial(&first));
        sink.apply_changes(&second, &reconciler.diff(first.rows(), second.rows()));

        assert_eq!(sink.renders(), 2);
        assert_eq!(sink.divergences(), 0);
        assert_eq!(sink.rows.lock().as_slice(), second.rows());
    }

    #[test]
    fn test_sink_recovers_from_bad_changes() {
        let sink = ConsoleSink::new(AmountFormat::default());
        let only = list(vec![ConvertedRow::base(Currency::usd(), dec!(1))]);

        sink.apply_changes(&only, &[]);

        assert_eq!(sink.divergences(), 1);
        assert_eq!(sink.rows.lock().as_slice(), only.rows());
    }

    #[test]
    fn test_describe_marks_base_and_placeholders() {
        let sink = ConsoleSink::new(AmountFormat::default());

        let text = sink.describe(&[
            ConvertedRow::base(Currency::usd(), dec!(1234.5)),
            ConvertedRow::target(Currency::jpy(), Decimal::ZERO),
        ]);

        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].starts_with("* USD"));
        assert!(lines[0].contains("1,234.5"));
        assert!(lines[1].starts_with("  JPY"));
        assert!(lines[1].contains(" - "));
    }
}
