//! Firing trigger occurrences against a subject's holders.

use tracing::warn;

use crate::core::SubjectId;
use crate::holders::HolderSet;

use super::data::TriggerData;
use super::trigger::Trigger;

/// Outcome of one dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Holders looked at.
    pub considered: usize,
    /// Holders whose conditions were met.
    pub active: usize,
    /// Effects that respond to the trigger.
    pub matched: usize,
    /// Effects whose handler reported that it ran.
    pub fired: usize,
    /// Handler errors (conditions or effects).
    pub failures: usize,
}

impl DispatchReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: DispatchReport) {
        self.considered += other.considered;
        self.active += other.active;
        self.matched += other.matched;
        self.fired += other.fired;
        self.failures += other.failures;
    }
}

/// Hands trigger occurrences to the effects that respond to them.
pub struct TriggerDispatcher;

impl TriggerDispatcher {
    /// Fire `trigger` for `subject` over `holders`.
    ///
    /// Only holders whose conditions are met are considered. A failing
    /// condition counts as unmet; a failing effect is logged and the rest
    /// still fire.
    pub fn dispatch(
        trigger: &dyn Trigger,
        subject: SubjectId,
        data: &TriggerData,
        holders: &HolderSet,
    ) -> DispatchReport {
        let trigger_id = trigger.id();
        let mut report = DispatchReport::default();

        for holder in holders {
            report.considered += 1;

            match holder.is_active(subject) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(error) => {
                    warn!(%subject, holder = holder.id(), trigger = trigger_id, %error, "condition failed during dispatch");
                    report.failures += 1;
                    continue;
                }
            }
            report.active += 1;

            for effect in holder.effects().iter().filter(|effect| effect.responds_to(trigger_id)) {
                report.matched += 1;
                match effect.fire(data) {
                    Ok(true) => report.fired += 1,
                    Ok(false) => {}
                    Err(error) => {
                        warn!(%subject, holder = holder.id(), effect = effect.id(), trigger = trigger_id, %error, "effect failed on trigger");
                        report.failures += 1;
                    }
                }
            }
        }

        report
    }
}
