//! Per-config expression cache.
//!
//! Compiled expressions are memoized by `(config identity, path)`. Identity,
//! not content: a reloaded config is a new object with a new [`ConfigId`], so
//! its paths are recompiled and the old entries are dropped once the old
//! object is gone (see [`ExpressionCache::purge`]).
//!
//! The cache is shared by every subject. Placeholder values are resolved per
//! evaluation; only the parse is shared.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::{Config, ConfigId, SubjectId, WeakConfig};
use crate::error::{ExpressionError, ExpressionResult};

use super::compiler::{ArithmeticCompiler, CompiledExpression, ExpressionCompiler};
use super::placeholder::{scan_placeholders, PlaceholderResolver};

struct CachedConfig {
    owner: WeakConfig,
    expressions: FxHashMap<String, Arc<CompiledExpression>>,
}

/// Compiles and memoizes numeric config expressions.
pub struct ExpressionCache {
    compiler: Arc<dyn ExpressionCompiler>,
    resolver: Arc<dyn PlaceholderResolver>,
    entries: RwLock<FxHashMap<ConfigId, CachedConfig>>,
    compilations: AtomicUsize,
}

impl ExpressionCache {
    /// Create a cache using the built-in arithmetic compiler.
    pub fn new(resolver: Arc<dyn PlaceholderResolver>) -> Self {
        Self::with_compiler(resolver, Arc::new(ArithmeticCompiler))
    }

    /// Create a cache with a custom expression compiler.
    pub fn with_compiler(
        resolver: Arc<dyn PlaceholderResolver>,
        compiler: Arc<dyn ExpressionCompiler>,
    ) -> Self {
        Self {
            compiler,
            resolver,
            entries: RwLock::new(FxHashMap::default()),
            compilations: AtomicUsize::new(0),
        }
    }

    /// Evaluate the number at `path`.
    ///
    /// - `Ok(None)` if `path` is absent.
    /// - Without a subject, the raw value must be a literal number.
    /// - With a subject, placeholders are resolved for that subject and the
    ///   (cached) compiled expression is evaluated.
    pub fn evaluate(
        &self,
        config: &Config,
        path: &str,
        subject: Option<SubjectId>,
    ) -> ExpressionResult<Option<f64>> {
        let Some(value) = config.get(path) else {
            return Ok(None);
        };

        let raw = value.to_text().ok_or_else(|| ExpressionError::NotAnExpression {
            path: path.to_string(),
        })?;

        let Some(subject) = subject else {
            return value.as_number().map(Some).ok_or(ExpressionError::NotANumber {
                path: path.to_string(),
                value: raw,
            });
        };

        let placeholders = scan_placeholders(&raw);
        let values = placeholders
            .iter()
            .map(|token| self.resolve(subject, token))
            .collect::<ExpressionResult<Vec<f64>>>()?;

        let expression = self.expression(config, path, &raw, &placeholders)?;
        expression.evaluate(&values).map(Some)
    }

    /// Number at `path`, or `None` if absent.
    pub fn get_double_or_none(
        &self,
        config: &Config,
        path: &str,
        subject: Option<SubjectId>,
    ) -> ExpressionResult<Option<f64>> {
        self.evaluate(config, path, subject)
    }

    /// Number at `path`, or `0.0` if absent.
    pub fn get_double(&self, config: &Config, path: &str, subject: Option<SubjectId>) -> ExpressionResult<f64> {
        Ok(self.evaluate(config, path, subject)?.unwrap_or(0.0))
    }

    /// Integer at `path` (truncated toward zero), or `None` if absent.
    pub fn get_int_or_none(
        &self,
        config: &Config,
        path: &str,
        subject: Option<SubjectId>,
    ) -> ExpressionResult<Option<i64>> {
        Ok(self.evaluate(config, path, subject)?.map(|value| value as i64))
    }

    /// Integer at `path` (truncated toward zero), or `0` if absent.
    pub fn get_int(&self, config: &Config, path: &str, subject: Option<SubjectId>) -> ExpressionResult<i64> {
        Ok(self.get_int_or_none(config, path, subject)?.unwrap_or(0))
    }

    fn resolve(&self, subject: SubjectId, token: &str) -> ExpressionResult<f64> {
        let resolved = self.resolver.resolve(subject, token).ok_or_else(|| {
            ExpressionError::UnresolvedPlaceholder {
                token: token.to_string(),
            }
        })?;

        resolved
            .trim()
            .parse::<f64>()
            .map_err(|_| ExpressionError::InvalidPlaceholder {
                token: token.to_string(),
                value: resolved,
            })
    }

    fn expression(
        &self,
        config: &Config,
        path: &str,
        raw: &str,
        placeholders: &[String],
    ) -> ExpressionResult<Arc<CompiledExpression>> {
        if let Some(cached) = self
            .entries
            .read()
            .get(&config.id())
            .and_then(|entry| entry.expressions.get(path))
        {
            return Ok(Arc::clone(cached));
        }

        let compiled = Arc::new(self.compiler.compile(raw, placeholders)?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(config = %config.id(), path, expression = raw, "compiled expression");

        let mut entries = self.entries.write();
        if !entries.contains_key(&config.id()) {
            entries.retain(|_, entry| entry.owner.is_alive());
        }
        let entry = entries.entry(config.id()).or_insert_with(|| CachedConfig {
            owner: config.downgrade(),
            expressions: FxHashMap::default(),
        });
        let cached = entry
            .expressions
            .entry(path.to_string())
            .or_insert(compiled);
        Ok(Arc::clone(cached))
    }

    /// Drop every cached expression for `config`.
    pub fn invalidate(&self, config: &Config) {
        self.entries.write().remove(&config.id());
    }

    /// Drop every cached expression (on reload).
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drop entries whose config object no longer exists. Returns how many.
    pub fn purge(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.owner.is_alive());
        before - entries.len()
    }

    /// Number of expressions compiled so far.
    #[must_use]
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Number of configs with cached expressions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for ExpressionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionCache")
            .field("configs", &self.len())
            .field("compilations", &self.compilations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::NoPlaceholders;

    fn level_resolver() -> Arc<dyn PlaceholderResolver> {
        Arc::new(|subject: SubjectId, token: &str| match token {
            "%level%" => Some((subject.raw() * 10).to_string()),
            "%name%" => Some("steve".to_string()),
            _ => None,
        })
    }

    #[test]
    fn test_missing_path_is_none() {
        let cache = ExpressionCache::new(Arc::new(NoPlaceholders));
        let config = Config::empty();

        assert_eq!(cache.evaluate(&config, "damage", Some(SubjectId::new(1))).unwrap(), None);
        assert_eq!(cache.get_double(&config, "damage", None).unwrap(), 0.0);
        assert_eq!(cache.get_int(&config, "damage", None).unwrap(), 0);
    }

    #[test]
    fn test_literal_without_subject() {
        let cache = ExpressionCache::new(Arc::new(NoPlaceholders));
        let config = Config::builder()
            .set("a", 2.5)
            .set("b", "3.5")
            .set("c", "1 + 1")
            .build();

        assert_eq!(cache.evaluate(&config, "a", None).unwrap(), Some(2.5));
        assert_eq!(cache.evaluate(&config, "b", None).unwrap(), Some(3.5));
        assert!(matches!(
            cache.evaluate(&config, "c", None),
            Err(ExpressionError::NotANumber { .. })
        ));
        assert_eq!(cache.compilations(), 0);
    }

    #[test]
    fn test_placeholders_resolved_per_subject() {
        let cache = ExpressionCache::new(level_resolver());
        let config = Config::builder().set("damage", "%level% * 2 + 1").build();

        assert_eq!(cache.get_double(&config, "damage", Some(SubjectId::new(1))).unwrap(), 21.0);
        assert_eq!(cache.get_double(&config, "damage", Some(SubjectId::new(2))).unwrap(), 41.0);
        assert_eq!(cache.compilations(), 1);
    }

    #[test]
    fn test_integer_accessors_truncate() {
        let cache = ExpressionCache::new(level_resolver());
        let config = Config::builder().set("n", "%level% / 4").set("m", "-7 / 2").build();
        let subject = Some(SubjectId::new(1));

        assert_eq!(cache.get_int(&config, "n", subject).unwrap(), 2);
        assert_eq!(cache.get_int_or_none(&config, "m", subject).unwrap(), Some(-3));
    }

    #[test]
    fn test_placeholder_failures_are_errors() {
        let cache = ExpressionCache::new(level_resolver());
        let config = Config::builder()
            .set("unknown", "%mystery% + 1")
            .set("text", "%name% + 1")
            .build();
        let subject = Some(SubjectId::new(1));

        assert!(matches!(
            cache.evaluate(&config, "unknown", subject),
            Err(ExpressionError::UnresolvedPlaceholder { ref token }) if token == "%mystery%"
        ));
        assert!(matches!(
            cache.evaluate(&config, "text", subject),
            Err(ExpressionError::InvalidPlaceholder { ref value, .. }) if value == "steve"
        ));
    }

    #[test]
    fn test_non_scalar_and_malformed() {
        let cache = ExpressionCache::new(level_resolver());
        let config = Config::builder()
            .set("section", Config::empty())
            .set("broken", "2 * (3")
            .build();
        let subject = Some(SubjectId::new(1));

        assert!(matches!(
            cache.evaluate(&config, "section", subject),
            Err(ExpressionError::NotAnExpression { .. })
        ));
        assert!(matches!(
            cache.evaluate(&config, "broken", subject),
            Err(ExpressionError::Parse { .. })
        ));
        assert_eq!(cache.compilations(), 0);
    }

    #[test]
    fn test_keyed_by_identity() {
        let cache = ExpressionCache::new(level_resolver());
        let first = Config::builder().set("x", "%level% + 1").build();
        let same_content = Config::builder().set("x", "%level% + 1").build();
        let subject = Some(SubjectId::new(1));

        cache.evaluate(&first, "x", subject).unwrap();
        cache.evaluate(&first.clone(), "x", subject).unwrap();
        assert_eq!(cache.compilations(), 1);

        cache.evaluate(&same_content, "x", subject).unwrap();
        assert_eq!(cache.compilations(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalidate_purge_clear() {
        let cache = ExpressionCache::new(level_resolver());
        let kept = Config::builder().set("x", "%level%").build();
        let dropped = Config::builder().set("x", "%level%").build();
        let subject = Some(SubjectId::new(1));

        cache.evaluate(&kept, "x", subject).unwrap();
        cache.evaluate(&dropped, "x", subject).unwrap();
        drop(dropped);
        assert_eq!(cache.purge(), 1);
        assert_eq!(cache.len(), 1);

        cache.invalidate(&kept);
        assert!(cache.is_empty());
        cache.evaluate(&kept, "x", subject).unwrap();
        assert_eq!(cache.compilations(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }
}
