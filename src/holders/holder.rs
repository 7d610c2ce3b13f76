//! Holders: named bundles of conditions and effects.
//!
//! A holder is what a subject "has" (an equipped item, a granted ability, a
//! permanent talent). It is immutable once compiled and shared through an
//! `Arc`; cloning is cheap.
//!
//! Equality is by content (id, config and compiled blocks), not identity, so
//! the same item compiled twice compares equal and reconciliation does not
//! flap when a provider rebuilds its holders.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::conditions::{ConditionBlock, ConditionList};
use crate::core::{Config, SubjectId};
use crate::effects::{EffectBlock, EffectList};
use crate::error::HandlerResult;

/// Ordered multiset of holders. Duplicates are meaningful (two copies of an
/// item apply twice).
pub type HolderSet = im::Vector<Holder>;

struct HolderInner {
    id: String,
    config: Config,
    conditions: ConditionList,
    effects: EffectList,
}

/// A compiled holder.
#[derive(Clone)]
pub struct Holder(Arc<HolderInner>);

impl Holder {
    /// Assemble a holder from compiled parts.
    pub fn new(id: impl Into<String>, config: Config, conditions: ConditionList, effects: EffectList) -> Self {
        Self(Arc::new(HolderInner {
            id: id.into(),
            config,
            conditions,
            effects,
        }))
    }

    /// Start building a holder programmatically.
    pub fn builder(id: impl Into<String>) -> HolderBuilder {
        HolderBuilder {
            id: id.into(),
            config: Config::empty(),
            conditions: ConditionList::new(),
            effects: EffectList::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// The config the holder was compiled from.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.0.config
    }

    #[must_use]
    pub fn conditions(&self) -> &ConditionList {
        &self.0.conditions
    }

    #[must_use]
    pub fn effects(&self) -> &EffectList {
        &self.0.effects
    }

    /// Whether every condition is met for `subject`.
    pub fn is_active(&self, subject: SubjectId) -> HandlerResult<bool> {
        self.0.conditions.are_met(subject, self)
    }

    /// Whether both handles point at the same compiled holder.
    #[must_use]
    pub fn ptr_eq(&self, other: &Holder) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Holder {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.0.id == other.0.id
                && self.0.config == other.0.config
                && self.0.conditions == other.0.conditions
                && self.0.effects == other.0.effects)
    }
}

impl Eq for Holder {}

impl Hash for Holder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
        self.0.config.hash(state);
    }
}

impl std::fmt::Debug for Holder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Holder")
            .field("id", &self.0.id)
            .field("conditions", &self.0.conditions.len())
            .field("effects", &self.0.effects.len())
            .finish()
    }
}

impl std::fmt::Display for Holder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.id)
    }
}

/// Builder for holders assembled in code rather than compiled from config.
#[derive(Debug)]
pub struct HolderBuilder {
    id: String,
    config: Config,
    conditions: ConditionList,
    effects: EffectList,
}

impl HolderBuilder {
    /// Set the source config (builder pattern).
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Add a condition block (builder pattern).
    #[must_use]
    pub fn condition(mut self, block: ConditionBlock) -> Self {
        self.conditions.push(block);
        self
    }

    /// Add an effect block (builder pattern).
    #[must_use]
    pub fn effect(mut self, block: EffectBlock) -> Self {
        self.effects.push(block);
        self
    }

    pub fn build(self) -> Holder {
        Holder::new(self.id, self.config, self.conditions, self.effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::{ArgumentSchema, Compilable};
    use crate::conditions::Condition;
    use crate::core::{CompiledData, Identified};
    use rustc_hash::FxHashSet;

    struct Flag(bool);

    impl Identified for Flag {
        fn id(&self) -> &str {
            if self.0 {
                "always"
            } else {
                "never"
            }
        }
    }

    impl Compilable for Flag {
        fn arguments(&self) -> &ArgumentSchema {
            static EMPTY: std::sync::LazyLock<ArgumentSchema> = std::sync::LazyLock::new(ArgumentSchema::empty);
            &EMPTY
        }
    }

    impl Condition for Flag {
        fn is_met(&self, _: SubjectId, _: &Config, _: &Holder, _: &CompiledData) -> HandlerResult<bool> {
            Ok(self.0)
        }
    }

    fn flag(value: bool) -> ConditionBlock {
        ConditionBlock::new(Arc::new(Flag(value)), Config::empty(), CompiledData::none())
    }

    #[test]
    fn test_content_equality() {
        let config = Config::builder().set("slot", "helmet").build();
        let a = Holder::builder("crown").config(config.clone()).build();
        let b = Holder::builder("crown").config(Config::builder().set("slot", "helmet").build()).build();
        let c = Holder::builder("crown").config(config).condition(flag(true)).build();

        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert_ne!(a, c);

        let set: FxHashSet<Holder> = [a.clone(), b, a].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_is_active_requires_all_conditions() {
        let subject = SubjectId::new(1);
        let none = Holder::builder("none").build();
        let met = Holder::builder("met").condition(flag(true)).condition(flag(true)).build();
        let unmet = Holder::builder("unmet").condition(flag(true)).condition(flag(false)).build();

        assert!(none.is_active(subject).unwrap());
        assert!(met.is_active(subject).unwrap());
        assert!(!unmet.is_active(subject).unwrap());
    }

    #[test]
    fn test_holder_set_keeps_duplicates() {
        let ring = Holder::builder("ring").build();
        let set: HolderSet = im::vector![ring.clone(), ring.clone()];

        assert_eq!(set.len(), 2);
        assert_eq!(set[0], set[1]);
        assert_eq!(ring.to_string(), "ring");
    }
}
