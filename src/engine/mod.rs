//! The engine facade.
//!
//! [`Engine`] owns the capability registries, holder providers, the
//! expression cache, per-subject state and trigger routing, and exposes the
//! lifecycle the host drives:
//!
//! ```text
//! register_* / route ──► compile_holder ──► providers
//!                                             │
//!   on_tick(now, online) ──► reconcile(subject) ──► enable / disable
//!   handle_event(&event) ──► dispatch(trigger)  ──► on_trigger
//!   disconnect(subject), reload(), shutdown()
//! ```
//!
//! The engine is `Send + Sync`. Calls for different subjects may run
//! concurrently; a reconciliation already running for a subject makes a
//! second one for that subject a no-op.

pub mod cache;
pub mod config;
pub mod reconcile;
pub mod state;

pub use cache::ExpiringCache;
pub use config::EngineConfig;
pub use reconcile::{HolderDiff, ReconcileReport, Reconciler, TeardownReport};
pub use state::{FlightGuard, SubjectStates};

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::arguments::{TracingSink, ViolationContext, ViolationSink};
use crate::conditions::{AnyOf, Condition};
use crate::core::{Config, Registry, SubjectId, Tick};
use crate::effects::Effect;
use crate::expressions::{
    ArithmeticCompiler, ExpressionCache, ExpressionCompiler, NoPlaceholders, PlaceholderResolver,
};
use crate::holders::{CompileContext, Holder, HolderProvider, HolderProviders, HolderSet};
use crate::triggers::{
    Activation, DispatchReport, EnableTrigger, HolderEnableEvent, ParameterSet, Trigger, TriggerData,
    TriggerDispatcher, TriggerRouter,
};

/// An effect whose applicable trigger does not supply what it requires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Incompatibility {
    pub effect: String,
    pub trigger: String,
    pub missing: ParameterSet,
}

/// Outcome of one periodic sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub reconciled: Vec<ReconcileReport>,
    /// Another sweep was already running.
    pub skipped: bool,
}

/// Outcome of one [`Engine::on_tick`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Teardown of subjects whose state went idle.
    pub expired: TeardownReport,
    /// The sweep, if one was due.
    pub sweep: Option<SweepReport>,
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    config: EngineConfig,
    resolver: Arc<dyn PlaceholderResolver>,
    compiler: Arc<dyn ExpressionCompiler>,
    sink: Arc<dyn ViolationSink>,
}

impl EngineBuilder {
    /// Set the tunables (builder pattern).
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the placeholder resolver (builder pattern).
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn PlaceholderResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the expression compiler (builder pattern).
    #[must_use]
    pub fn compiler(mut self, compiler: Arc<dyn ExpressionCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Set where config violations are reported (builder pattern).
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn ViolationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Build the engine with the built-in `any_of` condition and `enable` trigger.
    pub fn build(self) -> Engine {
        let engine = Engine {
            states: SubjectStates::new(self.config.holder_cache_ttl, self.config.state_idle_ttl),
            config: self.config,
            conditions: Registry::new("condition"),
            effects: Registry::new("effect"),
            triggers: Registry::new("trigger"),
            router: TriggerRouter::new(),
            providers: HolderProviders::new(),
            expressions: Arc::new(ExpressionCache::with_compiler(self.resolver, self.compiler)),
            sink: self.sink,
            sweeping: AtomicBool::new(false),
            last_sweep: Mutex::new(None),
        };

        engine.register_condition(Arc::new(AnyOf::new()));
        engine.register_trigger(Arc::new(EnableTrigger));
        engine.route(EnableTrigger::ID, |event: &HolderEnableEvent| {
            Some(
                Activation::new(
                    event.subject,
                    TriggerData::new().with_player(event.subject).with_event(event.clone()),
                )
                .with_force_holders(event.holders.clone()),
            )
        });
        engine
    }
}

/// Declarative effect engine.
pub struct Engine {
    config: EngineConfig,
    conditions: Registry<dyn Condition>,
    effects: Registry<dyn Effect>,
    triggers: Registry<dyn Trigger>,
    router: TriggerRouter,
    providers: HolderProviders,
    expressions: Arc<ExpressionCache>,
    states: SubjectStates,
    sink: Arc<dyn ViolationSink>,
    sweeping: AtomicBool,
    last_sweep: Mutex<Option<Tick>>,
}

impl Engine {
    /// Engine with default tunables, no placeholders and warn-level violation logging.
    pub fn builder() -> EngineBuilder {
        EngineBuilder {
            config: EngineConfig::default(),
            resolver: Arc::new(NoPlaceholders),
            compiler: Arc::new(ArithmeticCompiler),
            sink: Arc::new(TracingSink),
        }
    }

    /// Engine with `config` and a placeholder resolver.
    pub fn new(config: EngineConfig, resolver: Arc<dyn PlaceholderResolver>) -> Self {
        Self::builder().config(config).resolver(resolver).build()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // === Registration ===

    /// Register a condition, replacing any with the same id.
    pub fn register_condition(&self, condition: Arc<dyn Condition>) {
        self.conditions.register(condition);
    }

    /// Register an effect, replacing any with the same id.
    ///
    /// Applicable triggers that are already registered but don't supply the
    /// effect's required parameters are logged.
    pub fn register_effect(&self, effect: Arc<dyn Effect>) {
        for incompatibility in self.incompatibilities_of(effect.as_ref()) {
            log_incompatibility(&incompatibility);
        }
        self.effects.register(effect);
    }

    /// Register a trigger, replacing any with the same id.
    pub fn register_trigger(&self, trigger: Arc<dyn Trigger>) {
        self.triggers.register(trigger);
    }

    /// Add a holder provider.
    pub fn register_provider(&self, provider: Arc<dyn HolderProvider>) {
        self.providers.register(provider);
    }

    /// Route host events of type `E` to `trigger`.
    pub fn route<E, F>(&self, trigger: &str, extract: F)
    where
        E: Any,
        F: Fn(&E) -> Option<Activation> + Send + Sync + 'static,
    {
        self.router.route(trigger, extract);
    }

    #[must_use]
    pub fn conditions(&self) -> &Registry<dyn Condition> {
        &self.conditions
    }

    #[must_use]
    pub fn effects(&self) -> &Registry<dyn Effect> {
        &self.effects
    }

    #[must_use]
    pub fn triggers(&self) -> &Registry<dyn Trigger> {
        &self.triggers
    }

    #[must_use]
    pub fn router(&self) -> &TriggerRouter {
        &self.router
    }

    /// Shared expression cache; handlers keep a clone to evaluate numeric args.
    #[must_use]
    pub fn expressions(&self) -> &Arc<ExpressionCache> {
        &self.expressions
    }

    #[must_use]
    pub fn states(&self) -> &SubjectStates {
        &self.states
    }

    /// Every registered effect/trigger pair that cannot work together.
    #[must_use]
    pub fn check_compatibility(&self) -> Vec<Incompatibility> {
        let mut all: Vec<Incompatibility> = self
            .effects
            .values()
            .iter()
            .flat_map(|effect| self.incompatibilities_of(effect.as_ref()))
            .collect();
        all.sort_by(|a, b| (&a.effect, &a.trigger).cmp(&(&b.effect, &b.trigger)));
        all
    }

    fn incompatibilities_of(&self, effect: &dyn Effect) -> Vec<Incompatibility> {
        let required = effect.required_parameters();
        effect
            .applicable_triggers()
            .iter()
            .filter_map(|id| {
                let trigger = self.triggers.get_by_id(id)?;
                let missing = required.missing_from(trigger.parameters());
                (!missing.is_empty()).then(|| Incompatibility {
                    effect: effect.id().to_string(),
                    trigger: trigger.id().to_string(),
                    missing,
                })
            })
            .collect()
    }

    // === Compilation ===

    /// Compile a holder config. Bad blocks are reported and left out.
    pub fn compile_holder(&self, id: &str, config: &Config) -> Holder {
        self.compile_context(ViolationContext::new(id)).compile_holder(id, config)
    }

    /// A compile context rooted at `context`.
    pub fn compile_context(&self, context: ViolationContext) -> CompileContext<'_> {
        CompileContext::new(
            &self.conditions,
            &self.effects,
            &self.triggers,
            self.sink.as_ref(),
            context,
        )
    }

    // === Holders ===

    /// The subject's current holders, from the cache or the providers.
    pub fn holders(&self, subject: SubjectId) -> HolderSet {
        if let Some(holders) = self.states.cached_holders(subject) {
            return holders;
        }
        let holders = self.providers.collect(subject);
        self.states.cache_holders(subject, holders.clone());
        holders
    }

    /// Force the next [`holders`](Engine::holders) call to query providers.
    pub fn clear_holder_cache(&self, subject: SubjectId) {
        self.states.clear_holders(subject);
    }

    // === Reconciliation ===

    /// Bring the subject's enabled effects in line with its current holders.
    pub fn reconcile(&self, subject: SubjectId) -> ReconcileReport {
        let Some(_flight) = self.states.begin(subject) else {
            debug!(%subject, "reconciliation already in flight, skipping");
            return ReconcileReport::skipped(subject);
        };

        self.states.clear_holders(subject);
        let after = self.holders(subject);
        let before = self.states.replace_previous(subject, after.clone());
        let report = Reconciler::apply(subject, &before, &after);

        debug!(
            %subject,
            added = report.added,
            removed = report.removed,
            enabled = report.enabled,
            disabled = report.disabled,
            failures = report.failures,
            "reconciled"
        );

        if self.config.dispatch_enable_trigger && !report.activated.is_empty() {
            self.handle_event(&HolderEnableEvent::new(subject, report.activated.clone()));
        }
        report
    }

    /// Reconcile every subject in `subjects`. A sweep already running makes
    /// this a no-op.
    pub fn update_all<I>(&self, subjects: I) -> SweepReport
    where
        I: IntoIterator<Item = SubjectId>,
    {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("sweep already in flight, skipping");
            return SweepReport {
                reconciled: Vec::new(),
                skipped: true,
            };
        }
        let _sweep = SweepGuard(&self.sweeping);

        SweepReport {
            reconciled: subjects.into_iter().map(|subject| self.reconcile(subject)).collect(),
            skipped: false,
        }
    }

    /// Advance host time: tear down idle subjects, then sweep `subjects` if
    /// `update_interval` ticks have passed since the last sweep.
    ///
    /// `subjects` are the ones online now; their state never goes idle,
    /// whatever `state_idle_ttl` is.
    pub fn on_tick<I>(&self, now: Tick, subjects: I) -> TickReport
    where
        I: IntoIterator<Item = SubjectId>,
    {
        let subjects: Vec<SubjectId> = subjects.into_iter().collect();
        self.states.advance(now);
        self.states.touch(subjects.iter().copied());
        let expired = self.expire();

        let due = {
            let mut last = self.last_sweep.lock();
            match *last {
                Some(previous) if now.since(previous) < self.config.update_interval => false,
                _ => {
                    *last = Some(now);
                    true
                }
            }
        };

        TickReport {
            expired,
            sweep: due.then(|| self.update_all(subjects)),
        }
    }

    /// Tear down subjects whose state has been idle past `state_idle_ttl`.
    pub fn expire(&self) -> TeardownReport {
        let mut report = TeardownReport::default();
        for (subject, holders) in self.states.expire() {
            debug!(%subject, holders = holders.len(), "tearing down idle subject");
            report.merge(Reconciler::teardown(subject, &holders));
        }
        report
    }

    /// Disable everything the subject had enabled and forget it.
    pub fn disconnect(&self, subject: SubjectId) -> TeardownReport {
        match self.states.forget(subject) {
            Some(holders) => {
                let report = Reconciler::teardown(subject, &holders);
                debug!(%subject, disabled = report.disabled, failures = report.failures, "disconnected");
                report
            }
            None => TeardownReport::default(),
        }
    }

    /// Drop compiled expressions and cached provider results.
    ///
    /// Previous holders are kept, so the next pass diffs against what is
    /// actually enabled.
    pub fn reload(&self) {
        self.expressions.clear();
        self.states.clear_all_holders();
        *self.last_sweep.lock() = None;
        debug!("reloaded engine caches");
    }

    /// Disable every effect of every tracked subject's current holders.
    pub fn shutdown(&self) -> TeardownReport {
        let mut report = TeardownReport::default();
        for subject in self.states.tracked() {
            let holders = self.holders(subject);
            report.merge(Reconciler::teardown(subject, &holders));
            self.states.forget(subject);
        }
        if report.failures > 0 {
            warn!(failures = report.failures, "effects failed to disable during shutdown");
        }
        debug!(subjects = report.subjects, disabled = report.disabled, "shut down");
        report
    }

    // === Dispatch ===

    /// Route a host event to its triggers and dispatch each activation.
    pub fn handle_event<E: Any>(&self, event: &E) -> DispatchReport {
        let mut report = DispatchReport::default();
        for (trigger, activation) in self.router.activations(event) {
            report.merge(self.dispatch(&trigger, activation));
        }
        report
    }

    /// Dispatch one activation of the trigger with id `trigger`.
    pub fn dispatch(&self, trigger: &str, activation: Activation) -> DispatchReport {
        let Some(handler) = self.triggers.get_by_id(trigger) else {
            warn!(trigger, "dispatch to unregistered trigger");
            return DispatchReport::default();
        };

        let Activation {
            subject,
            data,
            force_holders,
        } = activation;
        let holders = force_holders.unwrap_or_else(|| self.holders(subject));
        TriggerDispatcher::dispatch(handler.as_ref(), subject, &data, &holders)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("conditions", &self.conditions)
            .field("effects", &self.effects)
            .field("triggers", &self.triggers)
            .field("router", &self.router)
            .field("providers", &self.providers)
            .field("states", &self.states)
            .finish()
    }
}

struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn log_incompatibility(incompatibility: &Incompatibility) {
    warn!(
        effect = %incompatibility.effect,
        trigger = %incompatibility.trigger,
        missing = %incompatibility.missing,
        "effect requires parameters its trigger does not supply"
    );
}
