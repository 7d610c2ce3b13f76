//! Trigger contract and the built-in `enable` trigger.

use crate::core::{Identified, SubjectId};
use crate::holders::HolderSet;

use super::data::{ParameterSet, TriggerParameter};

/// A named host occurrence that can fire holder effects.
///
/// Triggers carry no behavior of their own; the host turns its events into
/// activations through a [`TriggerRouter`](super::TriggerRouter) and the
/// engine dispatches them.
pub trait Trigger: Identified + Send + Sync {
    /// Parameters every occurrence of this trigger supplies.
    fn parameters(&self) -> ParameterSet;
}

/// A trigger defined entirely by its id and parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredTrigger {
    id: String,
    parameters: ParameterSet,
}

impl DeclaredTrigger {
    /// Declare a trigger.
    pub fn new(id: impl Into<String>, parameters: ParameterSet) -> Self {
        Self {
            id: id.into(),
            parameters,
        }
    }
}

impl Identified for DeclaredTrigger {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Trigger for DeclaredTrigger {
    fn parameters(&self) -> ParameterSet {
        self.parameters
    }
}

/// Fired right after reconciliation enables one or more holders.
///
/// Dispatch is restricted to [`HolderEnableEvent::holders`], so effects fire
/// once for the holders that just became active rather than for everything
/// the subject has.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnableTrigger;

impl EnableTrigger {
    /// Registry id.
    pub const ID: &'static str = "enable";
}

impl Identified for EnableTrigger {
    fn id(&self) -> &str {
        Self::ID
    }
}

impl Trigger for EnableTrigger {
    fn parameters(&self) -> ParameterSet {
        ParameterSet::of(&[TriggerParameter::Player, TriggerParameter::Event])
    }
}

/// Raised by the engine when holders are enabled for a subject.
#[derive(Clone, Debug)]
pub struct HolderEnableEvent {
    /// Subject whose holders were enabled.
    pub subject: SubjectId,
    /// The holders enabled in this cycle.
    pub holders: HolderSet,
}

impl HolderEnableEvent {
    /// Create the event.
    pub fn new(subject: SubjectId, holders: HolderSet) -> Self {
        Self { subject, holders }
    }
}
