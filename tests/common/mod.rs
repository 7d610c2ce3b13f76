//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use holdfast::arguments::{ArgumentSchema, CollectingSink, Compilable};
use holdfast::conditions::Condition;
use holdfast::core::{CompiledData, Config, Identified, SubjectId};
use holdfast::effects::Effect;
use holdfast::engine::{Engine, EngineConfig};
use holdfast::error::{HandlerError, HandlerResult};
use holdfast::expressions::{ExpressionCache, PlaceholderResolver};
use holdfast::holders::Holder;
use holdfast::triggers::{ParameterSet, TriggerData};

/// Install a test subscriber once; filtered by `RUST_LOG`, quiet by default.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a config block from JSON.
pub fn config(value: Value) -> Config {
    serde_json::from_value(value).expect("valid config")
}

/// Effect that records every call it receives.
pub struct Recorder {
    id: String,
    arguments: ArgumentSchema,
    triggers: Vec<&'static str>,
    required: ParameterSet,
    expressions: Option<Arc<ExpressionCache>>,
    fail_enable: AtomicBool,
    fail_trigger: AtomicBool,
    active: Mutex<FxHashMap<SubjectId, u32>>,
    enables: AtomicUsize,
    disables: AtomicUsize,
    fired: Mutex<Vec<(Option<SubjectId>, f64)>>,
}

impl Recorder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            arguments: ArgumentSchema::empty(),
            triggers: Vec::new(),
            required: ParameterSet::empty(),
            expressions: None,
            fail_enable: AtomicBool::new(false),
            fail_trigger: AtomicBool::new(false),
            active: Mutex::new(FxHashMap::default()),
            enables: AtomicUsize::new(0),
            disables: AtomicUsize::new(0),
            fired: Mutex::new(Vec::new()),
        }
    }

    pub fn with_arguments(mut self, arguments: ArgumentSchema) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_triggers(mut self, triggers: &[&'static str]) -> Self {
        self.triggers = triggers.to_vec();
        self
    }

    pub fn with_required(mut self, required: ParameterSet) -> Self {
        self.required = required;
        self
    }

    /// Scale trigger values by the block's `multiplier` expression.
    pub fn with_expressions(mut self, expressions: Arc<ExpressionCache>) -> Self {
        self.expressions = Some(expressions);
        self
    }

    pub fn fail_enable(&self, fail: bool) {
        self.fail_enable.store(fail, Ordering::SeqCst);
    }

    pub fn fail_trigger(&self, fail: bool) {
        self.fail_trigger.store(fail, Ordering::SeqCst);
    }

    /// How many times the effect is currently applied to `subject`.
    pub fn active(&self, subject: SubjectId) -> u32 {
        self.active.lock().get(&subject).copied().unwrap_or(0)
    }

    pub fn enables(&self) -> usize {
        self.enables.load(Ordering::SeqCst)
    }

    pub fn disables(&self) -> usize {
        self.disables.load(Ordering::SeqCst)
    }

    pub fn fired(&self) -> Vec<(Option<SubjectId>, f64)> {
        self.fired.lock().clone()
    }
}

impl Identified for Recorder {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Compilable for Recorder {
    fn arguments(&self) -> &ArgumentSchema {
        &self.arguments
    }
}

impl Effect for Recorder {
    fn applicable_triggers(&self) -> &[&str] {
        &self.triggers
    }

    fn required_parameters(&self) -> ParameterSet {
        self.required
    }

    fn enable(&self, subject: SubjectId, _config: &Config) -> HandlerResult<()> {
        if self.fail_enable.load(Ordering::SeqCst) {
            return Err(HandlerError::msg(format!("{} refused to enable", self.id)));
        }
        self.enables.fetch_add(1, Ordering::SeqCst);
        *self.active.lock().entry(subject).or_insert(0) += 1;
        Ok(())
    }

    fn disable(&self, subject: SubjectId) -> HandlerResult<()> {
        self.disables.fetch_add(1, Ordering::SeqCst);
        if let Some(count) = self.active.lock().get_mut(&subject) {
            *count = count.saturating_sub(1);
        }
        Ok(())
    }

    fn on_trigger(&self, config: &Config, data: &TriggerData, _compiled: &CompiledData) -> HandlerResult<bool> {
        if self.fail_trigger.load(Ordering::SeqCst) {
            return Err(HandlerError::msg("trigger handler failed"));
        }
        let multiplier = match &self.expressions {
            Some(cache) => cache.get_double_or_none(config, "multiplier", data.player)?.unwrap_or(1.0),
            None => 1.0,
        };
        self.fired
            .lock()
            .push((data.player, data.value.unwrap_or(1.0) * multiplier));
        Ok(true)
    }
}

/// Condition whose answer per subject is set by the test.
pub struct Switch {
    id: String,
    arguments: ArgumentSchema,
    default: bool,
    states: Mutex<FxHashMap<SubjectId, bool>>,
    broken: AtomicBool,
}

impl Switch {
    pub fn new(id: &str, default: bool) -> Self {
        Self {
            id: id.to_string(),
            arguments: ArgumentSchema::empty(),
            default,
            states: Mutex::new(FxHashMap::default()),
            broken: AtomicBool::new(false),
        }
    }

    pub fn set(&self, subject: SubjectId, met: bool) {
        self.states.lock().insert(subject, met);
    }

    pub fn break_it(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }
}

impl Identified for Switch {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Compilable for Switch {
    fn arguments(&self) -> &ArgumentSchema {
        &self.arguments
    }
}

impl Condition for Switch {
    fn is_met(&self, subject: SubjectId, _: &Config, _: &Holder, _: &CompiledData) -> HandlerResult<bool> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(HandlerError::msg("switch is broken"));
        }
        Ok(self.states.lock().get(&subject).copied().unwrap_or(self.default))
    }
}

/// An engine wired to a collecting sink and a test-controlled provider.
pub struct Fixture {
    pub engine: Engine,
    pub sink: Arc<CollectingSink>,
    holders: Arc<Mutex<FxHashMap<SubjectId, Vec<Holder>>>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(config, Arc::new(|_: SubjectId, _: &str| None::<String>))
    }

    pub fn with_resolver(resolver: Arc<dyn PlaceholderResolver>) -> Self {
        Self::build(EngineConfig::default(), resolver)
    }

    fn build(config: EngineConfig, resolver: Arc<dyn PlaceholderResolver>) -> Self {
        init_tracing();
        let sink = Arc::new(CollectingSink::new());
        let engine = Engine::builder()
            .config(config)
            .resolver(resolver)
            .sink(sink.clone())
            .build();

        let holders: Arc<Mutex<FxHashMap<SubjectId, Vec<Holder>>>> = Arc::default();
        let source = Arc::clone(&holders);
        engine.register_provider(Arc::new(move |subject: SubjectId| {
            source.lock().get(&subject).cloned().unwrap_or_default()
        }));

        Self { engine, sink, holders }
    }

    /// Give `subject` one more copy of `holder`.
    pub fn give(&self, subject: SubjectId, holder: &Holder) {
        self.holders.lock().entry(subject).or_default().push(holder.clone());
    }

    /// Take one copy of the holder with `id` from `subject`.
    pub fn take(&self, subject: SubjectId, id: &str) {
        if let Some(list) = self.holders.lock().get_mut(&subject) {
            if let Some(index) = list.iter().position(|holder| holder.id() == id) {
                list.remove(index);
            }
        }
    }

    /// Compile `value` as a holder config.
    pub fn compile(&self, id: &str, value: Value) -> Holder {
        self.engine.compile_holder(id, &config(value))
    }
}
