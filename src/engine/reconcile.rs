//! Reconciliation: turning holder changes into enable/disable calls.
//!
//! ## Algorithm
//!
//! Holders are compared as multisets. For each distinct holder, the count in
//! `after` minus the count in `before` gives how many occurrences were added
//! (positive) or removed (negative). Unchanged counts produce nothing.
//!
//! Transitions then run in three phases, in order:
//!
//! 1. **Added**: if the holder's conditions are met, enable every effect.
//! 2. **Removed**: disable every effect, unconditionally.
//! 3. **Re-check**: for every holder in `after`, disable its effects if its
//!    conditions are no longer met.
//!
//! Phase 3 never enables. A holder that was added while unmet and later
//! becomes met stays disabled until it is removed and added again.
//!
//! Handler failures are logged and counted; they never abort a pass.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::core::SubjectId;
use crate::holders::{Holder, HolderSet};

/// Occurrences added and removed between two holder multisets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HolderDiff {
    /// Occurrences only in `after`, in `after` order.
    pub added: Vec<Holder>,
    /// Occurrences only in `before`, in `before` order.
    pub removed: Vec<Holder>,
}

impl HolderDiff {
    /// Multiset difference between `before` and `after`.
    pub fn between(before: &HolderSet, after: &HolderSet) -> Self {
        let before_counts = frequencies(before);
        let after_counts = frequencies(after);

        Self {
            added: excess(after, &after_counts, &before_counts),
            removed: excess(before, &before_counts, &after_counts),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

fn frequencies(holders: &HolderSet) -> FxHashMap<&Holder, usize> {
    let mut counts = FxHashMap::default();
    for holder in holders {
        *counts.entry(holder).or_insert(0) += 1;
    }
    counts
}

fn excess(
    holders: &HolderSet,
    counts: &FxHashMap<&Holder, usize>,
    other: &FxHashMap<&Holder, usize>,
) -> Vec<Holder> {
    let mut seen = FxHashSet::default();
    let mut result = Vec::new();

    for holder in holders {
        if !seen.insert(holder) {
            continue;
        }
        let count = counts.get(holder).copied().unwrap_or(0);
        let theirs = other.get(holder).copied().unwrap_or(0);
        for _ in theirs..count {
            result.push(holder.clone());
        }
    }
    result
}

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    pub subject: SubjectId,
    /// Holder occurrences added since the last pass.
    pub added: usize,
    /// Holder occurrences removed since the last pass.
    pub removed: usize,
    /// Added holders whose conditions were met and whose effects were enabled.
    pub activated: HolderSet,
    /// Successful `enable` calls.
    pub enabled: usize,
    /// Successful `disable` calls.
    pub disabled: usize,
    /// Handler errors (conditions or effects).
    pub failures: usize,
    /// The pass did not run because one was already in flight for the subject.
    pub skipped: bool,
}

impl ReconcileReport {
    pub fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            added: 0,
            removed: 0,
            activated: HolderSet::new(),
            enabled: 0,
            disabled: 0,
            failures: 0,
            skipped: false,
        }
    }

    /// Report for a pass that was not run.
    pub fn skipped(subject: SubjectId) -> Self {
        Self {
            skipped: true,
            ..Self::new(subject)
        }
    }

    /// Whether the pass made no handler calls that changed anything.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.enabled == 0 && self.disabled == 0 && self.failures == 0
    }
}

/// Outcome of tearing down one or more subjects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub subjects: usize,
    pub holders: usize,
    pub disabled: usize,
    pub failures: usize,
}

impl TeardownReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: TeardownReport) {
        self.subjects += other.subjects;
        self.holders += other.holders;
        self.disabled += other.disabled;
        self.failures += other.failures;
    }
}

/// Applies holder transitions for a subject.
pub struct Reconciler;

impl Reconciler {
    /// Run the three transition phases from `before` to `after`.
    pub fn apply(subject: SubjectId, before: &HolderSet, after: &HolderSet) -> ReconcileReport {
        let diff = HolderDiff::between(before, after);
        let mut report = ReconcileReport::new(subject);
        report.added = diff.added.len();
        report.removed = diff.removed.len();

        for holder in &diff.added {
            if !Self::conditions_met(subject, holder, &mut report.failures) {
                continue;
            }
            for effect in holder.effects() {
                match effect.enable(subject) {
                    Ok(()) => report.enabled += 1,
                    Err(error) => {
                        warn!(%subject, holder = holder.id(), effect = effect.id(), %error, "failed to enable effect");
                        report.failures += 1;
                    }
                }
            }
            report.activated.push_back(holder.clone());
        }

        for holder in &diff.removed {
            Self::disable_effects(subject, holder, &mut report.disabled, &mut report.failures);
        }

        for holder in after {
            if !Self::conditions_met(subject, holder, &mut report.failures) {
                Self::disable_effects(subject, holder, &mut report.disabled, &mut report.failures);
            }
        }

        report
    }

    /// Disable every effect of every holder.
    pub fn teardown(subject: SubjectId, holders: &HolderSet) -> TeardownReport {
        let mut report = TeardownReport {
            subjects: 1,
            holders: holders.len(),
            ..TeardownReport::default()
        };
        for holder in holders {
            Self::disable_effects(subject, holder, &mut report.disabled, &mut report.failures);
        }
        report
    }

    /// A failing condition counts as unmet.
    fn conditions_met(subject: SubjectId, holder: &Holder, failures: &mut usize) -> bool {
        match holder.is_active(subject) {
            Ok(met) => met,
            Err(error) => {
                warn!(%subject, holder = holder.id(), %error, "condition failed during reconciliation");
                *failures += 1;
                false
            }
        }
    }

    fn disable_effects(subject: SubjectId, holder: &Holder, disabled: &mut usize, failures: &mut usize) {
        for effect in holder.effects() {
            match effect.disable(subject) {
                Ok(()) => *disabled += 1,
                Err(error) => {
                    warn!(%subject, holder = holder.id(), effect = effect.id(), %error, "failed to disable effect");
                    *failures += 1;
                }
            }
        }
    }
}
