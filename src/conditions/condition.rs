//! Condition contract and compiled condition blocks.

use std::sync::Arc;

use crate::arguments::Compilable;
use crate::core::{CompiledData, Config, SubjectId};
use crate::error::HandlerResult;
use crate::holders::{CompileContext, Holder};

/// A predicate gating whether a holder's effects may be active for a subject.
///
/// Implementations are registered by id and shared by every holder that uses
/// them; per-block state lives in the [`CompiledData`] returned by `compile`.
pub trait Condition: Compilable {
    /// Precompute state for one (already validated) argument block.
    fn compile(&self, _config: &Config, _context: &CompileContext<'_>) -> HandlerResult<CompiledData> {
        Ok(CompiledData::none())
    }

    /// Whether the condition currently holds for `subject`.
    fn is_met(
        &self,
        subject: SubjectId,
        config: &Config,
        holder: &Holder,
        compiled: &CompiledData,
    ) -> HandlerResult<bool>;
}

/// A condition handler bound to its argument block and compiled data.
#[derive(Clone)]
pub struct ConditionBlock {
    handler: Arc<dyn Condition>,
    config: Config,
    compiled: CompiledData,
}

impl ConditionBlock {
    /// Bind a handler to a block.
    pub fn new(handler: Arc<dyn Condition>, config: Config, compiled: CompiledData) -> Self {
        Self {
            handler,
            config,
            compiled,
        }
    }

    /// Id of the underlying handler.
    #[must_use]
    pub fn id(&self) -> &str {
        self.handler.id()
    }

    /// The underlying handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Condition> {
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

    /// Evaluate for `subject` on behalf of `holder`.
    pub fn is_met(&self, subject: SubjectId, holder: &Holder) -> HandlerResult<bool> {
        self.handler.is_met(subject, &self.config, holder, &self.compiled)
    }
}

impl PartialEq for ConditionBlock {
    fn eq(&self, other: &Self) -> bool {
        self.handler.id() == other.handler.id() && self.config == other.config
    }
}

impl Eq for ConditionBlock {}

impl std::fmt::Debug for ConditionBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionBlock")
            .field("id", &self.handler.id())
            .field("config", &self.config)
            .finish()
    }
}

/// Ordered list of condition blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConditionList(Vec<ConditionBlock>);

impl ConditionList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every condition holds. Stops at the first that does not.
    pub fn are_met(&self, subject: SubjectId, holder: &Holder) -> HandlerResult<bool> {
        for condition in &self.0 {
            if !condition.is_met(subject, holder)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether at least one condition holds. Stops at the first that does.
    pub fn any_met(&self, subject: SubjectId, holder: &Holder) -> HandlerResult<bool> {
        for condition in &self.0 {
            if condition.is_met(subject, holder)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Append a block.
    pub fn push(&mut self, block: ConditionBlock) {
        self.0.push(block);
    }

    /// Iterate the blocks in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ConditionBlock> {
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

impl From<Vec<ConditionBlock>> for ConditionList {
    fn from(blocks: Vec<ConditionBlock>) -> Self {
        Self(blocks)
    }
}

impl FromIterator<ConditionBlock> for ConditionList {
    fn from_iter<I: IntoIterator<Item = ConditionBlock>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ConditionList {
    type Item = &'a ConditionBlock;
    type IntoIter = std::slice::Iter<'a, ConditionBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
