//! Configuration blocks.
//!
//! A [`Config`] is an already-loaded tree of keyed values. The engine does not
//! read files; the host deserializes whatever format it likes (YAML, JSON,
//! TOML...) into a `Config` through serde, or builds one with
//! [`Config::builder`].
//!
//! ## Identity vs. content
//!
//! Configs carry two notions of sameness:
//!
//! - **Content**: `PartialEq`/`Hash` compare the values. Holders compiled from
//!   equal configuration compare equal, which the reconciler relies on when
//!   diffing holder multisets across passes.
//! - **Identity**: every constructed config gets a fresh [`ConfigId`]; clones
//!   share it. The expression cache is keyed by identity, so replacing a
//!   config object on reload naturally stops hitting the old cache entries.
//!
//! ## Paths
//!
//! Getters accept dotted paths (`"args.multiplier"`). A key that literally
//! contains a dot is matched first.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identity of a config object. Clones share an ID; new objects never reuse one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigId(u64);

impl ConfigId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConfigId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config({})", self.0)
    }
}

/// A single configuration value.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// An explicit null (`null`, `~`). Reads as absent.
    Null,
    /// A boolean flag.
    Bool(bool),
    /// A number. Integers are stored as `f64`.
    Number(f64),
    /// Text; may hold an arithmetic expression with placeholders.
    Text(String),
    /// A list of values (strings, or sections for condition/effect lists).
    List(Vec<ConfigValue>),
    /// A nested block.
    Section(Config),
}

impl ConfigValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Get as bool if this is a Bool value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as a number. Text is parsed if it holds a plain number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ConfigValue::Number(n) => Some(*n),
            ConfigValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Render a scalar as text. Lists and sections have no text form.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            ConfigValue::Text(s) => Some(s.clone()),
            ConfigValue::Number(n) => Some(format_number(*n)),
            ConfigValue::Bool(b) => Some(b.to_string()),
            ConfigValue::Null | ConfigValue::List(_) | ConfigValue::Section(_) => None,
        }
    }

    /// Get as a section reference if this is a Section value.
    #[must_use]
    pub fn as_section(&self) -> Option<&Config> {
        match self {
            ConfigValue::Section(c) => Some(c),
            _ => None,
        }
    }

    /// Get as a list reference if this is a List value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(v) => Some(v),
            _ => None,
        }
    }
}

/// Integral numbers print without a trailing `.0` so that `5` stays `5`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl PartialEq for ConfigValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConfigValue::Null, ConfigValue::Null) => true,
            (ConfigValue::Bool(a), ConfigValue::Bool(b)) => a == b,
            (ConfigValue::Number(a), ConfigValue::Number(b)) => a.to_bits() == b.to_bits(),
            (ConfigValue::Text(a), ConfigValue::Text(b)) => a == b,
            (ConfigValue::List(a), ConfigValue::List(b)) => a == b,
            (ConfigValue::Section(a), ConfigValue::Section(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ConfigValue {}

impl Hash for ConfigValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ConfigValue::Null => {}
            ConfigValue::Bool(v) => v.hash(state),
            ConfigValue::Number(n) => n.to_bits().hash(state),
            ConfigValue::Text(s) => s.hash(state),
            ConfigValue::List(v) => v.hash(state),
            ConfigValue::Section(c) => c.hash(state),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Number(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Number(v as f64)
    }
}

impl From<i32> for ConfigValue {
    fn from(v: i32) -> Self {
        ConfigValue::Number(f64::from(v))
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Text(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Text(v)
    }
}

impl From<Config> for ConfigValue {
    fn from(v: Config) -> Self {
        ConfigValue::Section(v)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(v: Vec<ConfigValue>) -> Self {
        ConfigValue::List(v)
    }
}

impl From<Vec<Config>> for ConfigValue {
    fn from(v: Vec<Config>) -> Self {
        ConfigValue::List(v.into_iter().map(ConfigValue::Section).collect())
    }
}

impl From<Vec<&str>> for ConfigValue {
    fn from(v: Vec<&str>) -> Self {
        ConfigValue::List(v.into_iter().map(ConfigValue::from).collect())
    }
}

#[derive(Debug)]
struct ConfigInner {
    id: ConfigId,
    values: BTreeMap<String, ConfigValue>,
}

/// A shared, identity-bearing configuration block.
///
/// Cloning is cheap and preserves identity.
#[derive(Clone)]
pub struct Config {
    inner: Arc<ConfigInner>,
}

impl Config {
    /// Create a config from a key/value map. Each call yields a new identity.
    #[must_use]
    pub fn new(values: BTreeMap<String, ConfigValue>) -> Self {
        Self {
            inner: Arc::new(ConfigInner {
                id: ConfigId::next(),
                values,
            }),
        }
    }

    /// Create an empty config.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    /// Start building a config.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Identity of this config object.
    #[must_use]
    pub fn id(&self) -> ConfigId {
        self.inner.id
    }

    /// Whether two handles point at the same config object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Config) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A weak handle that does not keep this config alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakConfig {
        WeakConfig {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Top-level keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.values.keys().map(String::as_str)
    }

    /// Number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.values.len()
    }

    /// Whether this config has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.values.is_empty()
    }

    /// Look up the value at a (possibly dotted) path. Nulls read as absent.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ConfigValue> {
        self.lookup(path).filter(|value| !value.is_null())
    }

    fn lookup(&self, path: &str) -> Option<&ConfigValue> {
        if let Some(value) = self.inner.values.get(path) {
            return Some(value);
        }

        let (parent, key) = path.rsplit_once('.')?;
        let mut current = self;
        for segment in parent.split('.') {
            current = current.inner.values.get(segment)?.as_section()?;
        }
        current.inner.values.get(key)
    }

    /// Whether a value exists at `path`.
    #[must_use]
    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Scalar at `path` rendered as text.
    #[must_use]
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).and_then(ConfigValue::to_text)
    }

    /// Number at `path`; numeric text is parsed.
    #[must_use]
    pub fn get_double(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(ConfigValue::as_number)
    }

    /// Number at `path`, truncated toward zero.
    #[must_use]
    pub fn get_int(&self, path: &str) -> Option<i64> {
        self.get_double(path).map(|n| n as i64)
    }

    /// Bool at `path`.
    #[must_use]
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(ConfigValue::as_bool)
    }

    /// Nested block at `path`.
    #[must_use]
    pub fn get_subsection(&self, path: &str) -> Option<Config> {
        self.get(path).and_then(ConfigValue::as_section).cloned()
    }

    /// List of nested blocks at `path`. Non-section entries are skipped.
    #[must_use]
    pub fn get_subsections(&self, path: &str) -> Vec<Config> {
        self.get(path)
            .and_then(ConfigValue::as_list)
            .map(|list| list.iter().filter_map(ConfigValue::as_section).cloned().collect())
            .unwrap_or_default()
    }

    /// List of strings at `path`. A single scalar is treated as a one-entry list.
    #[must_use]
    pub fn get_strings(&self, path: &str) -> Vec<String> {
        match self.get(path) {
            Some(ConfigValue::List(list)) => list.iter().filter_map(ConfigValue::to_text).collect(),
            Some(value) => value.to_text().into_iter().collect(),
            None => Vec::new(),
        }
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner.values == other.inner.values
    }
}

impl Eq for Config {}

impl Hash for Config {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.values.hash(state);
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("id", &self.inner.id.0)
            .field("values", &self.inner.values)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.values.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<String, ConfigValue>::deserialize(deserializer).map(Config::new)
    }
}

/// Weak handle to a config, used by caches keyed by config identity.
#[derive(Clone, Debug)]
pub struct WeakConfig {
    id: ConfigId,
    inner: Weak<ConfigInner>,
}

impl WeakConfig {
    /// Identity of the referenced config.
    #[must_use]
    pub fn id(&self) -> ConfigId {
        self.id
    }

    /// Whether the referenced config is still alive somewhere.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

/// Builder for programmatic configs.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    values: BTreeMap<String, ConfigValue>,
}

impl ConfigBuilder {
    /// Set a top-level key (builder pattern).
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Config {
        Config::new(self.values)
    }
}
