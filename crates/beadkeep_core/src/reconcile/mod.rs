//! Desired-vs-existing label reconciliation.
//!
//! # Responsibility
//! - Compute the additive delta between a desired label set and a snapshot
//!   of existing labels.
//! - Apply the delta through the tracker in fixed-size batches, degrading to
//!   per-pair calls when a batch fails.
//!
//! # Invariants
//! - The delta contains exactly the desired pairs missing from the snapshot,
//!   once each, ordered by (record, label).
//! - A failing pair never prevents other pairs from being applied.
//! - Dry runs make no tracker calls.

use crate::model::label::{LabelPair, LabelSnapshot};
use crate::tracker::Tracker;
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Default number of pairs per bulk call.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Knobs for `apply_delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Pairs per bulk call; `0` is treated as `1`.
    pub batch_size: usize,
    pub dry_run: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }
}

/// Counts from one `apply_delta` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub applied: usize,
    pub failed: usize,
    /// Bulk calls attempted.
    pub batches: usize,
    /// Bulk calls that failed and were retried pair by pair.
    pub degraded_batches: usize,
}

impl ApplyOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Groups desired pairs into a per-record desired set.
pub fn desired_by_record<I>(pairs: I) -> BTreeMap<String, BTreeSet<String>>
where
    I: IntoIterator<Item = LabelPair>,
{
    let mut desired = BTreeMap::<String, BTreeSet<String>>::new();
    for pair in pairs {
        desired.entry(pair.record_id).or_default().insert(pair.label);
    }
    desired
}

/// Desired pairs whose label is not yet attached to the record.
pub fn compute_delta(
    desired: &BTreeMap<String, BTreeSet<String>>,
    existing: &LabelSnapshot,
) -> Vec<LabelPair> {
    let mut delta = Vec::new();
    for (record_id, labels) in desired {
        let current = existing.get(record_id);
        for label in labels {
            if current.is_some_and(|set| set.contains(label)) {
                continue;
            }
            delta.push(LabelPair::new(record_id.clone(), label.clone()));
        }
    }
    delta
}

/// Applies `delta` through `tracker`, batch first and per pair on failure.
pub fn apply_delta<T: Tracker + ?Sized>(
    tracker: &mut T,
    delta: &[LabelPair],
    options: ApplyOptions,
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();
    if options.dry_run {
        outcome.applied = delta.len();
        return outcome;
    }

    for batch in delta.chunks(options.batch_size.max(1)) {
        outcome.batches += 1;
        match tracker.add_labels_bulk(batch) {
            Ok(()) => outcome.applied += batch.len(),
            Err(err) => {
                outcome.degraded_batches += 1;
                warn!(
                    "event=label_batch module=reconcile status=degraded size={} error={}",
                    batch.len(),
                    err
                );
                for pair in batch {
                    match tracker.add_label(&pair.record_id, &pair.label) {
                        Ok(()) => outcome.applied += 1,
                        Err(err) => {
                            outcome.failed += 1;
                            warn!(
                                "event=label_add module=reconcile status=error record_id={} label={} error={}",
                                pair.record_id, pair.label, err
                            );
                        }
                    }
                }
            }
        }
    }

    info!(
        "event=label_apply module=reconcile status={} applied={} failed={} batches={} degraded_batches={}",
        if outcome.is_clean() { "ok" } else { "partial" },
        outcome.applied,
        outcome.failed,
        outcome.batches,
        outcome.degraded_batches
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn delta_is_desired_minus_existing_per_record() {
        let desired = desired_by_record(vec![
            LabelPair::new("iv-1", "mod:clavain"),
            LabelPair::new("iv-1", "theme:ux"),
            LabelPair::new("iv-2", "theme:docs"),
            LabelPair::new("iv-1", "theme:ux"),
        ]);
        let mut existing = LabelSnapshot::new();
        existing.insert("iv-1".to_string(), set(&["theme:ux", "other"]));

        let delta = compute_delta(&desired, &existing);
        assert_eq!(
            delta,
            vec![
                LabelPair::new("iv-1", "mod:clavain"),
                LabelPair::new("iv-2", "theme:docs"),
            ]
        );
    }

    #[test]
    fn delta_is_empty_when_existing_covers_desired() {
        let desired = desired_by_record(vec![LabelPair::new("iv-1", "theme:ux")]);
        let mut existing = LabelSnapshot::new();
        existing.insert("iv-1".to_string(), set(&["theme:ux"]));
        assert!(compute_delta(&desired, &existing).is_empty());
    }

    #[test]
    fn dry_run_counts_without_calls() {
        let mut tracker = crate::tracker::BdCli::new("/nonexistent/bd-for-tests");
        let delta = vec![LabelPair::new("iv-1", "theme:ux")];
        let outcome = apply_delta(
            &mut tracker,
            &delta,
            ApplyOptions {
                dry_run: true,
                ..ApplyOptions::default()
            },
        );
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.batches, 0);
        assert!(outcome.is_clean());
    }
}
