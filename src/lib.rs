//! # holdfast
//!
//! A declarative effect engine. Hosts describe, in configuration, bundles of
//! behaviors ("holders") that subjects possess: which effects they grant,
//! under which conditions, and in response to which triggers. The engine
//! turns those descriptions into runtime behavior.
//!
//! ## Design Principles
//!
//! 1. **Host-Agnostic**: No built-in notion of players, items or worlds.
//!    Hosts register conditions, effects, triggers and holder providers.
//!
//! 2. **Degrade, Don't Crash**: Bad config blocks are reported and dropped;
//!    handler failures are logged and counted; teardown always completes.
//!
//! 3. **Reconcile, Don't Track**: Each pass diffs a subject's holders
//!    against the previous pass and applies only the transitions.
//!
//! ## Architecture
//!
//! - **Open Registries**: Capabilities are trait objects keyed by
//!   case-insensitive string id. Last registration wins.
//!
//! - **Persistent Holder Sets**: O(1) cloning via `im-rs`, so caches,
//!   previous states and reports share one holder multiset.
//!
//! - **Host Time**: Every cache lifetime is counted in host ticks passed to
//!   [`Engine::on_tick`].
//!
//! ## Modules
//!
//! - `core`: Subjects, ticks, config blocks, compiled data, registries
//! - `arguments`: Argument schemas and violation reporting
//! - `expressions`: Placeholder arithmetic in numeric config values
//! - `conditions`: Condition contract and the `any_of` built-in
//! - `effects`: Effect contract and compiled effect blocks
//! - `triggers`: Trigger contract, event routing, dispatch
//! - `holders`: Holder model, compilation, providers
//! - `engine`: Reconciliation, subject state, the [`Engine`] facade

pub mod arguments;
pub mod conditions;
pub mod core;
pub mod effects;
pub mod engine;
pub mod error;
pub mod expressions;
pub mod holders;
pub mod triggers;

// Re-export commonly used types
pub use crate::core::{CompiledData, Config, ConfigValue, Identified, Registry, SubjectId, Tick};

pub use crate::arguments::{
    ArgumentSchema, Compilable, CollectingSink, TracingSink, Violation, ViolationContext, ViolationSink,
};

pub use crate::expressions::{ExpressionCache, PlaceholderResolver};

pub use crate::conditions::{AnyOf, Condition, ConditionBlock, ConditionList};

pub use crate::effects::{Effect, EffectBlock, EffectList};

pub use crate::triggers::{
    Activation, DeclaredTrigger, DispatchReport, EnableTrigger, HolderEnableEvent, Location, ParameterSet,
    Trigger, TriggerData, TriggerParameter,
};

pub use crate::holders::{CompileContext, Holder, HolderProvider, HolderSet};

pub use crate::engine::{
    Engine, EngineBuilder, EngineConfig, ReconcileReport, SweepReport, TeardownReport, TickReport,
};

pub use crate::error::{ExpressionError, ExpressionResult, HandlerError, HandlerResult};
