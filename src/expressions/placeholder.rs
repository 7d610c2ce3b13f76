//! External placeholders embedded in config values.
//!
//! Tokens look like `%player_level%` or `{mana}`. The engine recognizes them
//! but never interprets them: resolution belongs to the host, through a
//! [`PlaceholderResolver`].
//!
//! A token name starts with a letter or `_`, so `10%3+%level%` reads as a
//! modulo followed by one placeholder.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::SubjectId;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[A-Za-z_][^%\s]*%|\{[A-Za-z_][^{}\s]*\}").unwrap());

/// Resolves a placeholder token to text for one subject.
pub trait PlaceholderResolver: Send + Sync {
    /// Resolve `token` (delimiters included) for `subject`, or `None` if unknown.
    fn resolve(&self, subject: SubjectId, token: &str) -> Option<String>;
}

impl<F> PlaceholderResolver for F
where
    F: Fn(SubjectId, &str) -> Option<String> + Send + Sync,
{
    fn resolve(&self, subject: SubjectId, token: &str) -> Option<String> {
        self(subject, token)
    }
}

/// Resolver for hosts without placeholders. Every token is unresolved.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPlaceholders;

impl PlaceholderResolver for NoPlaceholders {
    fn resolve(&self, _subject: SubjectId, _token: &str) -> Option<String> {
        None
    }
}

/// Distinct placeholder tokens in `raw`, in first-encounter order.
#[must_use]
pub fn scan_placeholders(raw: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in PLACEHOLDER.find_iter(raw) {
        if !found.iter().any(|existing| existing == m.as_str()) {
            found.push(m.as_str().to_string());
        }
    }
    found
}
