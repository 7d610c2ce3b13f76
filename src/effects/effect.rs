//! Effect contract and compiled effect blocks.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::arguments::Compilable;
use crate::core::{CompiledData, Config, SubjectId};
use crate::error::HandlerResult;
use crate::holders::CompileContext;
use crate::triggers::{ParameterSet, TriggerData};

/// A behavior applied to a subject while a holder is active.
///
/// Effects come in two flavors, and a handler may be both:
///
/// - **Persistent**: `enable` when the holder becomes active, `disable` when
///   it stops being active.
/// - **Triggered**: `on_trigger` each time one of the
///   [`applicable_triggers`](Effect::applicable_triggers) fires while the
///   holder is active.
///
/// `disable` may be called for a subject the effect was never enabled for and
/// must tolerate it.
pub trait Effect: Compilable {
    /// Ids of the triggers this effect responds to.
    fn applicable_triggers(&self) -> &[&str] {
        &[]
    }

    /// Parameters a trigger must supply for this effect to work.
    fn required_parameters(&self) -> ParameterSet {
        ParameterSet::empty()
    }

    /// Precompute state for one (already validated) argument block.
    fn compile(&self, _config: &Config, _context: &CompileContext<'_>) -> HandlerResult<CompiledData> {
        Ok(CompiledData::none())
    }

    /// Apply the persistent part of the effect.
    fn enable(&self, _subject: SubjectId, _config: &Config) -> HandlerResult<()> {
        Ok(())
    }

    /// Remove the persistent part of the effect.
    fn disable(&self, _subject: SubjectId) -> HandlerResult<()> {
        Ok(())
    }

    /// Handle a trigger occurrence. Returns whether anything happened.
    fn on_trigger(&self, _config: &Config, _data: &TriggerData, _compiled: &CompiledData) -> HandlerResult<bool> {
        Ok(false)
    }

    /// Whether `trigger` is one of [`applicable_triggers`](Effect::applicable_triggers).
    fn is_applicable(&self, trigger: &str) -> bool {
        self.applicable_triggers()
            .iter()
            .any(|id| id.eq_ignore_ascii_case(trigger))
    }
}

/// An effect handler bound to its argument block and compiled data.
#[derive(Clone)]
pub struct EffectBlock {
    handler: Arc<dyn Effect>,
    config: Config,
    compiled: CompiledData,
    triggers: Option<SmallVec<[String; 4]>>,
}

impl EffectBlock {
    /// Bind a handler to a block.
    pub fn new(handler: Arc<dyn Effect>, config: Config, compiled: CompiledData) -> Self {
        Self {
            handler,
            config,
            compiled,
            triggers: None,
        }
    }

    /// Narrow the triggers this block responds to (builder pattern).
    #[must_use]
    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers = Some(
            triggers
                .into_iter()
                .map(|id| id.into().to_lowercase())
                .collect(),
        );
        self
    }

    /// Id of the underlying handler.
    #[must_use]
    pub fn id(&self) -> &str {
        self.handler.id()
    }

    /// The underlying handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Effect> {
        &self.handler
    }

    /// The argument block.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The handler's compiled data for this block.
    #[must_use]
    pub fn compiled(&self) -> &CompiledData {
        &self.compiled
    }

    /// Triggers configured on this block, if narrowed.
    #[must_use]
    pub fn triggers(&self) -> Option<&[String]> {
        self.triggers.as_deref()
    }

    /// Whether this block fires on `trigger`.
    ///
    /// The handler must declare the trigger; if the block narrows its
    /// triggers, it must also be one of those.
    #[must_use]
    pub fn responds_to(&self, trigger: &str) -> bool {
        self.handler.is_applicable(trigger)
            && self
                .triggers
                .as_ref()
                .map_or(true, |narrowed| narrowed.iter().any(|id| id.eq_ignore_ascii_case(trigger)))
    }

    /// Apply the persistent part for `subject`.
    pub fn enable(&self, subject: SubjectId) -> HandlerResult<()> {
        self.handler.enable(subject, &self.config)
    }

    /// Remove the persistent part for `subject`.
    pub fn disable(&self, subject: SubjectId) -> HandlerResult<()> {
        self.handler.disable(subject)
    }

    /// Hand a trigger occurrence to the handler.
    pub fn fire(&self, data: &TriggerData) -> HandlerResult<bool> {
        self.handler.on_trigger(&self.config, data, &self.compiled)
    }
}

impl PartialEq for EffectBlock {
    fn eq(&self, other: &Self) -> bool {
        self.handler.id() == other.handler.id()
            && self.config == other.config
            && self.triggers == other.triggers
    }
}

impl Eq for EffectBlock {}

impl std::fmt::Debug for EffectBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectBlock")
            .field("id", &self.handler.id())
            .field("config", &self.config)
            .field("triggers", &self.triggers)
            .finish()
    }
}

/// Ordered list of effect blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EffectList(Vec<EffectBlock>);

impl EffectList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block.
    pub fn push(&mut self, block: EffectBlock) {
        self.0.push(block);
    }

    /// Iterate the blocks in order.
    pub fn iter(&self) -> std::slice::Iter<'_, EffectBlock> {
        self.0.iter()
    }

    /// Number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<EffectBlock>> for EffectList {
    fn from(blocks: Vec<EffectBlock>) -> Self {
        Self(blocks)
    }
}

impl FromIterator<EffectBlock> for EffectList {
    fn from_iter<I: IntoIterator<Item = EffectBlock>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EffectList {
    type Item = &'a EffectBlock;
    type IntoIter = std::slice::Iter<'a, EffectBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::ArgumentSchema;
    use crate::core::Identified;

    struct Strike {
        arguments: ArgumentSchema,
    }

    impl Identified for Strike {
        fn id(&self) -> &str {
            "strike"
        }
    }

    impl Compilable for Strike {
        fn arguments(&self) -> &ArgumentSchema {
            &self.arguments
        }
    }

    impl Effect for Strike {
        fn applicable_triggers(&self) -> &[&str] {
            &["melee_attack", "bow_attack"]
        }

        fn on_trigger(&self, config: &Config, data: &TriggerData, _: &CompiledData) -> HandlerResult<bool> {
            Ok(data.value.unwrap_or(0.0) >= config.get_double("min").unwrap_or(0.0))
        }
    }

    fn strike() -> Arc<dyn Effect> {
        Arc::new(Strike {
            arguments: ArgumentSchema::empty(),
        })
    }

    #[test]
    fn test_responds_to_declared_triggers() {
        let block = EffectBlock::new(strike(), Config::empty(), CompiledData::none());

        assert!(block.responds_to("melee_attack"));
        assert!(block.responds_to("BOW_ATTACK"));
        assert!(!block.responds_to("jump"));
        assert_eq!(block.triggers(), None);
    }

    #[test]
    fn test_narrowed_triggers() {
        let block = EffectBlock::new(strike(), Config::empty(), CompiledData::none())
            .with_triggers(["Bow_Attack", "jump"]);

        assert!(block.responds_to("bow_attack"));
        assert!(!block.responds_to("melee_attack"));
        // Narrowing never widens past the handler's own triggers.
        assert!(!block.responds_to("jump"));
    }

    #[test]
    fn test_fire_uses_block_config() {
        let config = Config::builder().set("min", 5).build();
        let block = EffectBlock::new(strike(), config, CompiledData::none());

        assert!(!block.fire(&TriggerData::new().with_value(2.0)).unwrap());
        assert!(block.fire(&TriggerData::new().with_value(7.0)).unwrap());
    }

    #[test]
    fn test_default_persistent_hooks_are_noops() {
        let block = EffectBlock::new(strike(), Config::empty(), CompiledData::none());
        let subject = SubjectId::new(1);

        assert!(block.enable(subject).is_ok());
        assert!(block.disable(subject).is_ok());
        assert!(block.disable(subject).is_ok());
    }

    #[test]
    fn test_block_equality() {
        let a = EffectBlock::new(strike(), Config::builder().set("min", 1).build(), CompiledData::none());
        let b = EffectBlock::new(strike(), Config::builder().set("min", 1).build(), CompiledData::none());
        let c = b.clone().with_triggers(["bow_attack"]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(EffectList::from(vec![a.clone()]), EffectList::from(vec![b]));
    }
}
