//! Configuration violations and where they get reported.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A single problem with a configuration block.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    /// The offending argument.
    pub param: String,
    /// Human-readable reason.
    pub message: String,
}

impl Violation {
    /// Create a new violation.
    pub fn new(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Argument '{}': {}", self.param, self.message)
    }
}

/// Where in the configuration a block was compiled from.
///
/// Contexts nest: compiling the conditions of an `any_of` inside holder
/// `sword` gives `sword -> any_of conditions`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ViolationContext {
    segments: Vec<String>,
}

impl ViolationContext {
    /// Create a root context.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            segments: vec![root.into()],
        }
    }

    /// A child context one level deeper.
    #[must_use]
    pub fn with(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for ViolationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(" -> "))
    }
}

/// Receives violation reports from compilation.
pub trait ViolationSink: Send + Sync {
    /// Report one violation found while compiling handler `id` in `context`.
    fn report(&self, id: &str, context: &ViolationContext, violation: &Violation);
}

/// The report block for one violation, one entry per log line.
#[must_use]
pub fn report_lines(id: &str, context: &ViolationContext, violation: &Violation) -> [String; 5] {
    [
        String::new(),
        format!("Invalid configuration for {id} in context {context}:"),
        format!("(Cause) Argument '{}'", violation.param),
        format!("(Reason) {}", violation.message),
        String::new(),
    ]
}

/// Default sink: logs each report as a block of `tracing` warnings.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl ViolationSink for TracingSink {
    fn report(&self, id: &str, context: &ViolationContext, violation: &Violation) {
        for line in report_lines(id, context, violation) {
            tracing::warn!("{line}");
        }
    }
}

/// A single collected report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViolationReport {
    pub id: String,
    pub context: String,
    pub violation: Violation,
}

/// Sink that keeps every report in memory, for tooling that lints configs.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<ViolationReport>>,
}

impl CollectingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected reports.
    #[must_use]
    pub fn reports(&self) -> Vec<ViolationReport> {
        self.reports.lock().clone()
    }

    /// Take and clear the collected reports.
    pub fn drain(&self) -> Vec<ViolationReport> {
        std::mem::take(&mut *self.reports.lock())
    }

    /// Number of collected reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    /// Whether nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl ViolationSink for CollectingSink {
    fn report(&self, id: &str, context: &ViolationContext, violation: &Violation) {
        self.reports.lock().push(ViolationReport {
            id: id.to_string(),
            context: context.to_string(),
            violation: violation.clone(),
        });
    }
}
