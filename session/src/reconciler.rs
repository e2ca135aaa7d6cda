//! Row-level reconciliation of two display lists.
//!
//! Rows are matched by currency code. A diff is an ordered change sequence
//! that a renderer can apply one by one onto the rows it currently shows:
//! removals (descending index), moves, insertions (ascending index) and
//! finally content updates (ascending index). Every index is valid against
//! the list as it stands when that change is applied.

use std::collections::{HashMap, HashSet};

use converter_common::{ConvertedRow, DisplayList};
use serde::Serialize;
use thiserror::Error;

/// Kind of a row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Unchanged,
    Removed,
    Moved,
    Inserted,
    BecameTarget,
    BecameBase,
    AmountChanged,
}

/// One step of a change sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowChange {
    Removed { code: String, index: usize },
    Moved { code: String, from: usize, to: usize },
    Inserted { index: usize, row: ConvertedRow },
    BecameTarget { index: usize, row: ConvertedRow },
    BecameBase { index: usize, row: ConvertedRow },
    AmountChanged { index: usize, row: ConvertedRow },
}

impl RowChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            RowChange::Removed { .. } => ChangeKind::Removed,
            RowChange::Moved { .. } => ChangeKind::Moved,
            RowChange::Inserted { .. } => ChangeKind::Inserted,
            RowChange::BecameTarget { .. } => ChangeKind::BecameTarget,
            RowChange::BecameBase { .. } => ChangeKind::BecameBase,
            RowChange::AmountChanged { .. } => ChangeKind::AmountChanged,
        }
    }

    /// Currency code of the affected row.
    pub fn code(&self) -> &str {
        match self {
            RowChange::Removed { code, .. } | RowChange::Moved { code, .. } => code,
            RowChange::Inserted { row, .. }
            | RowChange::BecameTarget { row, .. }
            | RowChange::BecameBase { row, .. }
            | RowChange::AmountChanged { row, .. } => row.code(),
        }
    }

    /// Content change between two rows of the same currency.
    ///
    /// A role change wins over an amount change; the emitted row carries
    /// the new amount either way.
    pub fn classify(old: &ConvertedRow, new: &ConvertedRow) -> ChangeKind {
        match (old.is_base(), new.is_base()) {
            (false, true) => ChangeKind::BecameBase,
            (true, false) => ChangeKind::BecameTarget,
            _ if old.amount() != new.amount() => ChangeKind::AmountChanged,
            _ => ChangeKind::Unchanged,
        }
    }

    fn update(kind: ChangeKind, index: usize, row: ConvertedRow) -> Option<Self> {
        match kind {
            ChangeKind::BecameBase => Some(RowChange::BecameBase { index, row }),
            ChangeKind::BecameTarget => Some(RowChange::BecameTarget { index, row }),
            ChangeKind::AmountChanged => Some(RowChange::AmountChanged { index, row }),
            _ => None,
        }
    }
}

/// Computes change sequences between consecutive display lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateListReconciler;

impl RateListReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Changes for the first render: every row inserted in order.
    pub fn initial(&self, list: &DisplayList) -> Vec<RowChange> {
        self.diff(&[], list.rows())
    }

    /// Changes turning `old` into `new`.
    ///
    /// Rows whose old order already agrees with the new order (a longest
    /// increasing run of their new positions) stay put; only the others
    /// are moved.
    pub fn diff(&self, old: &[ConvertedRow], new: &[ConvertedRow]) -> Vec<RowChange> {
        let new_index: HashMap<&str, usize> = new
            .iter()
            .enumerate()
            .map(|(i, row)| (row.code(), i))
            .collect();
        let old_codes: HashSet<&str> = old.iter().map(ConvertedRow::code).collect();

        let mut changes = Vec::new();

        for (index, row) in old.iter().enumerate().rev() {
            if !new_index.contains_key(row.code()) {
                changes.push(RowChange::Removed {
                    code: row.code().to_string(),
                    index,
                });
            }
        }

        // Survivors in old order, each tagged with its position in `new`.
        let mut working: Vec<(&str, usize)> = old
            .iter()
            .filter_map(|row| new_index.get(row.code()).map(|&to| (row.code(), to)))
            .collect();

        let targets: Vec<usize> = working.iter().map(|&(_, target)| target).collect();
        let stable = longest_increasing_subsequence(&targets);

        let mut placed: HashSet<&str> = working
            .iter()
            .zip(&stable)
            .filter(|(_, keep)| **keep)
            .map(|(&(code, _), _)| code)
            .collect();

        let mut movers: Vec<(&str, usize)> = working
            .iter()
            .zip(&stable)
            .filter(|(_, keep)| !**keep)
            .map(|(&entry, _)| entry)
            .collect();
        movers.sort_by_key(|&(_, target)| target);

        for (code, target) in movers {
            let Some(from) = working.iter().position(|&(c, _)| c == code) else {
                continue;
            };
            working.remove(from);

            // Placed rows are sorted by target, so the slot follows the last
            // placed row that precedes this one in `new`.
            let to = working
                .iter()
                .enumerate()
                .filter(|(_, entry)| placed.contains(entry.0) && entry.1 < target)
                .map(|(i, _)| i + 1)
                .max()
                .unwrap_or(0);
            working.insert(to, (code, target));
            placed.insert(code);

            if from != to {
                changes.push(RowChange::Moved {
                    code: code.to_string(),
                    from,
                    to,
                });
            }
        }

        for (index, row) in new.iter().enumerate() {
            if !old_codes.contains(row.code()) {
                changes.push(RowChange::Inserted {
                    index,
                    row: row.clone(),
                });
            }
        }

        let old_rows: HashMap<&str, &ConvertedRow> =
            old.iter().map(|row| (row.code(), row)).collect();
        for (index, row) in new.iter().enumerate() {
            if let Some(previous) = old_rows.get(row.code()) {
                let kind = RowChange::classify(previous, row);
                if let Some(change) = RowChange::update(kind, index, row.clone()) {
                    changes.push(change);
                }
            }
        }

        changes
    }
}

/// A change that does not fit the rows it is applied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("Index {index} out of range for {len} rows")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Expected {expected} at index {index}, found {found}")]
    CodeMismatch {
        index: usize,
        expected: String,
        found: String,
    },
}

/// Apply a change sequence onto `rows` in order.
pub fn replay(rows: &mut Vec<ConvertedRow>, changes: &[RowChange]) -> Result<(), ReplayError> {
    for change in changes {
        match change {
            RowChange::Removed { code, index } => {
                check_code(rows, *index, code)?;
                rows.remove(*index);
            }
            RowChange::Moved { code, from, to } => {
                check_code(rows, *from, code)?;
                let row = rows.remove(*from);
                check_insert(rows, *to)?;
                rows.insert(*to, row);
            }
            RowChange::Inserted { index, row } => {
                check_insert(rows, *index)?;
                rows.insert(*index, row.clone());
            }
            RowChange::BecameTarget { index, row }
            | RowChange::BecameBase { index, row }
            | RowChange::AmountChanged { index, row } => {
                check_code(rows, *index, row.code())?;
                rows[*index] = row.clone();
            }
        }
    }
    Ok(())
}

fn check_code(rows: &[ConvertedRow], index: usize, expected: &str) -> Result<(), ReplayError> {
    let found = rows.get(index).ok_or(ReplayError::IndexOutOfRange {
        index,
        len: rows.len(),
    })?;
    if found.code() != expected {
        return Err(ReplayError::CodeMismatch {
            index,
            expected: expected.to_string(),
            found: found.code().to_string(),
        });
    }
    Ok(())
}

fn check_insert(rows: &[ConvertedRow], index: usize) -> Result<(), ReplayError> {
    if index > rows.len() {
        return Err(ReplayError::IndexOutOfRange {
            index,
            len: rows.len(),
        });
    }
    Ok(())
}

/// Marks one longest strictly increasing subsequence of `seq`.
fn longest_increasing_subsequence(seq: &[usize]) -> Vec<bool> {
    let mut tails: Vec<usize> = Vec::new();
    let mut parent: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let slot = tails.partition_point(|&t| seq[t] < value);
        if slot > 0 {
            parent[i] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut keep = vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = parent[i];
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use converter_common::Currency;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn base(code: &str, amount: Decimal) -> ConvertedRow {
        ConvertedRow::base(Currency::new(code), amount)
    }

    fn target(code: &str, amount: Decimal) -> ConvertedRow {
        ConvertedRow::target(Currency::new(code), amount)
    }

    fn apply(old: &[ConvertedRow], changes: &[RowChange]) -> Vec<ConvertedRow> {
        let mut rows = old.to_vec();
        replay(&mut rows, changes).unwrap();
        rows
    }

    #[test]
    fn test_initial_inserts_everything() {
        let list = DisplayList::new(vec![base("USD", dec!(100)), target("EUR", dec!(90))]).unwrap();

        let changes = RateListReconciler::new().initial(&list);

        assert_eq!(
            changes,
            vec![
                RowChange::Inserted { index: 0, row: base("USD", dec!(100)) },
                RowChange::Inserted { index: 1, row: target("EUR", dec!(90)) },
            ]
        );
    }

    #[test]
    fn test_identical_lists_produce_nothing() {
        let rows = vec![base("USD", dec!(100)), target("EUR", dec!(90)), target("GBP", dec!(80))];
        let same_value = vec![
            base("USD", dec!(100.00)),
            target("EUR", dec!(90.0)),
            target("GBP", dec!(80)),
        ];

        assert!(RateListReconciler::new().diff(&rows, &same_value).is_empty());
    }

    #[test]
    fn test_single_amount_change() {
        let old = vec![base("USD", dec!(100)), target("EUR", dec!(90)), target("GBP", dec!(80))];
        let new = vec![base("USD", dec!(100)), target("EUR", dec!(91)), target("GBP", dec!(80))];

        let changes = RateListReconciler::new().diff(&old, &new);

        assert_eq!(
            changes,
            vec![RowChange::AmountChanged { index: 1, row: target("EUR", dec!(91)) }]
        );
    }

    #[test]
    fn test_rebase_diff() {
        let old = vec![base("USD", dec!(100)), target("EUR", dec!(90)), target("GBP", dec!(80))];
        let new = vec![base("EUR", dec!(90)), target("USD", dec!(100)), target("GBP", dec!(80.01))];

        let changes = RateListReconciler::new().diff(&old, &new);

        assert_eq!(
            changes,
            vec![
                RowChange::Moved { code: "USD".to_string(), from: 0, to: 1 },
                RowChange::BecameBase { index: 0, row: base("EUR", dec!(90)) },
                RowChange::BecameTarget { index: 1, row: target("USD", dec!(100)) },
                RowChange::AmountChanged { index: 2, row: target("GBP", dec!(80.01)) },
            ]
        );
        assert_eq!(apply(&old, &changes), new);
    }

    #[test]
    fn test_removals_and_insertions() {
        let old = vec![base("USD", dec!(1)), target("EUR", dec!(2)), target("GBP", dec!(3))];
        let new = vec![base("USD", dec!(1)), target("JPY", dec!(4)), target("GBP", dec!(3))];

        let changes = RateListReconciler::new().diff(&old, &new);

        assert_eq!(
            changes,
            vec![
                RowChange::Removed { code: "EUR".to_string(), index: 1 },
                RowChange::Inserted { index: 1, row: target("JPY", dec!(4)) },
            ]
        );
        assert_eq!(apply(&old, &changes), new);
    }

    #[test]
    fn test_reversal_moves_all_but_one() {
        let codes = ["USD", "EUR", "GBP", "JPY"];
        let old: Vec<_> = codes.iter().map(|c| target(c, dec!(1))).collect();
        let new: Vec<_> = codes.iter().rev().map(|c| target(c, dec!(1))).collect();

        let changes = RateListReconciler::new().diff(&old, &new);

        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| c.kind() == ChangeKind::Moved));
        assert_eq!(apply(&old, &changes), new);
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            RowChange::classify(&target("EUR", dec!(1)), &target("EUR", dec!(1.0))),
            ChangeKind::Unchanged
        );
        assert_eq!(
            RowChange::classify(&target("EUR", dec!(1)), &target("EUR", dec!(2))),
            ChangeKind::AmountChanged
        );
        assert_eq!(
            RowChange::classify(&target("EUR", dec!(1)), &base("EUR", dec!(2))),
            ChangeKind::BecameBase
        );
        assert_eq!(
            RowChange::classify(&base("EUR", dec!(1)), &target("EUR", dec!(1))),
            ChangeKind::BecameTarget
        );
    }

    #[test]
    fn test_replay_rejects_foreign_changes() {
        let mut rows = vec![base("USD", dec!(1))];

        let mismatch = replay(
            &mut rows,
            &[RowChange::Removed { code: "EUR".to_string(), index: 0 }],
        );
        assert_eq!(
            mismatch,
            Err(ReplayError::CodeMismatch {
                index: 0,
                expected: "EUR".to_string(),
                found: "USD".to_string(),
            })
        );

        let out_of_range = replay(
            &mut rows,
            &[RowChange::Inserted { index: 5, row: target("EUR", dec!(1)) }],
        );
        assert_eq!(out_of_range, Err(ReplayError::IndexOutOfRange { index: 5, len: 1 }));
    }

    #[test]
    fn test_lis_marks_longest_run() {
        assert_eq!(longest_increasing_subsequence(&[]), Vec::<bool>::new());
        assert_eq!(
            longest_increasing_subsequence(&[1, 0, 2]),
            vec![false, true, true]
        );
        let keep = longest_increasing_subsequence(&[4, 1, 2, 0, 3]);
        assert_eq!(keep.iter().filter(|&&k| k).count(), 3);
    }

    const CODES: &[&str] = &["USD", "EUR", "GBP", "JPY", "CHF", "SEK", "PLN", "NOK"];

    fn arb_rows() -> impl Strategy<Value = Vec<ConvertedRow>> {
        prop::sample::subsequence(CODES.to_vec(), 1..=CODES.len())
            .prop_shuffle()
            .prop_flat_map(|codes| {
                let len = codes.len();
                (Just(codes), prop::collection::vec(0i64..4, len))
            })
            .prop_map(|(codes, amounts)| {
                codes
                    .into_iter()
                    .zip(amounts)
                    .enumerate()
                    .map(|(i, (code, amount))| {
                        let amount = Decimal::from(amount);
                        if i == 0 {
                            base(code, amount)
                        } else {
                            target(code, amount)
                        }
                    })
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn prop_replay_reproduces_new(old in arb_rows(), new in arb_rows()) {
            let changes = RateListReconciler::new().diff(&old, &new);

            let mut rows = old.clone();
            prop_assert_eq!(replay(&mut rows, &changes), Ok(()));
            prop_assert_eq!(rows, new);
        }

        #[test]
        fn prop_diff_of_equal_lists_is_empty(rows in arb_rows()) {
            prop_assert!(RateListReconciler::new().diff(&rows, &rows).is_empty());
        }
    }
}
