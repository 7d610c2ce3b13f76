//! `any_of`: met when at least one nested condition is met.

use crate::arguments::{ArgumentSchema, Compilable};
use crate::core::{CompiledData, Config, Identified, SubjectId};
use crate::error::HandlerResult;
use crate::holders::{CompileContext, Holder};

use super::condition::{Condition, ConditionList};

/// Composite condition over a nested condition list.
///
/// ```yaml
/// id: any_of
/// args:
///   conditions:
///     - id: in_water
///     - id: below_health
///       args: { percent: 20 }
/// ```
#[derive(Debug)]
pub struct AnyOf {
    arguments: ArgumentSchema,
}

impl AnyOf {
    /// Registry id.
    pub const ID: &'static str = "any_of";

    /// Create the condition.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arguments: ArgumentSchema::builder()
                .require("conditions", "You must specify the conditions that can be met!")
                .build(),
        }
    }
}

impl Default for AnyOf {
    fn default() -> Self {
        Self::new()
    }
}

impl Identified for AnyOf {
    fn id(&self) -> &str {
        Self::ID
    }
}

impl Compilable for AnyOf {
    fn arguments(&self) -> &ArgumentSchema {
        &self.arguments
    }
}

impl Condition for AnyOf {
    fn compile(&self, config: &Config, context: &CompileContext<'_>) -> HandlerResult<CompiledData> {
        let nested = context
            .with("any_of conditions")
            .compile_conditions(&config.get_subsections("conditions"));
        Ok(CompiledData::new(nested))
    }

    fn is_met(
        &self,
        subject: SubjectId,
        _config: &Config,
        holder: &Holder,
        compiled: &CompiledData,
    ) -> HandlerResult<bool> {
        compiled.require::<ConditionList>(Self::ID)?.any_met(subject, holder)
    }
}
