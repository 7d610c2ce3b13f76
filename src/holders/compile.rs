//! Compiling holder configs into [`Holder`]s.
//!
//! Compilation never fails as a whole. Each condition or effect block is
//! looked up, validated against its handler's argument schema and compiled;
//! a block that fails any step is reported to the [`ViolationSink`] and left
//! out, and the rest of the holder still compiles.
//!
//! ```yaml
//! conditions:
//!   - id: in_water
//! effects:
//!   - id: damage_multiplier
//!     args: { multiplier: "1 + %level% / 100" }
//!     triggers: [melee_attack]
//! ```

use smallvec::SmallVec;
use tracing::trace;

use crate::arguments::{Violation, ViolationContext, ViolationSink};
use crate::conditions::{Condition, ConditionBlock, ConditionList};
use crate::core::{Config, Registry};
use crate::effects::{Effect, EffectBlock, EffectList};
use crate::triggers::Trigger;

use super::holder::Holder;

/// Registries and reporting context for one compilation.
///
/// Handlers receive the context in `compile` so composite handlers can
/// compile nested blocks under a deeper [`ViolationContext`].
pub struct CompileContext<'a> {
    conditions: &'a Registry<dyn Condition>,
    effects: &'a Registry<dyn Effect>,
    triggers: &'a Registry<dyn Trigger>,
    sink: &'a dyn ViolationSink,
    context: ViolationContext,
}

impl<'a> CompileContext<'a> {
    pub fn new(
        conditions: &'a Registry<dyn Condition>,
        effects: &'a Registry<dyn Effect>,
        triggers: &'a Registry<dyn Trigger>,
        sink: &'a dyn ViolationSink,
        context: ViolationContext,
    ) -> Self {
        Self {
            conditions,
            effects,
            triggers,
            sink,
            context,
        }
    }

    /// Where in the config tree this context reports from.
    #[must_use]
    pub fn context(&self) -> &ViolationContext {
        &self.context
    }

    /// Same registries, one context segment deeper.
    #[must_use]
    pub fn with(&self, segment: impl Into<String>) -> CompileContext<'a> {
        CompileContext {
            context: self.context.with(segment),
            ..*self
        }
    }

    /// Report a violation for handler `id`.
    pub fn report(&self, id: &str, violation: &Violation) {
        self.sink.report(id, &self.context, violation);
    }

    fn report_all(&self, id: &str, violations: &[Violation]) {
        for violation in violations {
            self.report(id, violation);
        }
    }

    /// Compile a list of condition blocks, skipping invalid ones.
    pub fn compile_conditions(&self, configs: &[Config]) -> ConditionList {
        configs
            .iter()
            .filter_map(|config| self.compile_condition(config))
            .collect()
    }

    /// Compile one condition block.
    pub fn compile_condition(&self, config: &Config) -> Option<ConditionBlock> {
        let Some(id) = config.get_string("id") else {
            self.report("condition", &Violation::new("id", "Condition ID is missing!"));
            return None;
        };
        let Some(handler) = self.conditions.get_by_id(&id) else {
            self.report(&id, &Violation::new("id", format!("Invalid condition ID specified: {id}")));
            return None;
        };

        let args = config.get_subsection("args").unwrap_or_default();
        let violations = handler.arguments().test(&args);
        if !violations.is_empty() {
            self.report_all(handler.id(), &violations);
            return None;
        }

        match handler.compile(&args, self) {
            Ok(compiled) => {
                trace!(context = %self.context, condition = handler.id(), "compiled condition");
                Some(ConditionBlock::new(handler, args, compiled))
            }
            Err(error) => {
                self.report(handler.id(), &Violation::new("args", format!("Failed to compile: {error}")));
                None
            }
        }
    }

    /// Compile a list of effect blocks, skipping invalid ones.
    pub fn compile_effects(&self, configs: &[Config]) -> EffectList {
        configs
            .iter()
            .filter_map(|config| self.compile_effect(config))
            .collect()
    }

    /// Compile one effect block, including its optional `triggers` list.
    pub fn compile_effect(&self, config: &Config) -> Option<EffectBlock> {
        let Some(id) = config.get_string("id") else {
            self.report("effect", &Violation::new("id", "Effect ID is missing!"));
            return None;
        };
        let Some(handler) = self.effects.get_by_id(&id) else {
            self.report(&id, &Violation::new("id", format!("Invalid effect ID specified: {id}")));
            return None;
        };

        let args = config.get_subsection("args").unwrap_or_default();
        let violations = handler.arguments().test(&args);
        if !violations.is_empty() {
            self.report_all(handler.id(), &violations);
            return None;
        }

        let triggers = if config.has("triggers") {
            Some(self.compile_triggers(handler.as_ref(), &config.get_strings("triggers"))?)
        } else {
            None
        };

        match handler.compile(&args, self) {
            Ok(compiled) => {
                trace!(context = %self.context, effect = handler.id(), "compiled effect");
                let block = EffectBlock::new(handler, args, compiled);
                Some(match triggers {
                    Some(triggers) => block.with_triggers(triggers),
                    None => block,
                })
            }
            Err(error) => {
                self.report(handler.id(), &Violation::new("args", format!("Failed to compile: {error}")));
                None
            }
        }
    }

    /// Resolve a block's `triggers` list. Any unknown or inapplicable
    /// trigger drops the whole block; missing parameters are only advisory.
    fn compile_triggers(&self, effect: &dyn Effect, ids: &[String]) -> Option<SmallVec<[String; 4]>> {
        let mut resolved = SmallVec::new();
        let mut valid = true;

        for id in ids {
            let Some(trigger) = self.triggers.get_by_id(id) else {
                self.report(effect.id(), &Violation::new("triggers", format!("Invalid trigger specified: {id}")));
                valid = false;
                continue;
            };

            if !effect.is_applicable(trigger.id()) {
                self.report(
                    effect.id(),
                    &Violation::new(
                        "triggers",
                        format!("{} cannot be activated by trigger {}", effect.id(), trigger.id()),
                    ),
                );
                valid = false;
                continue;
            }

            let missing = effect.required_parameters().missing_from(trigger.parameters());
            if !missing.is_empty() {
                self.report(
                    effect.id(),
                    &Violation::new(
                        "triggers",
                        format!("Trigger {} does not supply {missing}, which {} requires", trigger.id(), effect.id()),
                    ),
                );
            }

            resolved.push(trigger.id().to_lowercase());
        }

        valid.then_some(resolved)
    }

    /// Compile a whole holder config.
    pub fn compile_holder(&self, id: &str, config: &Config) -> Holder {
        let conditions = self
            .with("conditions")
            .compile_conditions(&config.get_subsections("conditions"));
        let effects = self
            .with("effects")
            .compile_effects(&config.get_subsections("effects"));

        Holder::new(id, config.clone(), conditions, effects)
    }
}

impl std::fmt::Debug for CompileContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileContext")
            .field("context", &self.context.to_string())
            .finish()
    }
}
