//! Subject identity and host time.
//!
//! A subject is whoever holders are evaluated for (in most hosts, a player).
//! The engine never looks inside a subject; it only needs a stable key.
//!
//! Time is measured in host ticks. Every cache lifetime in the engine is
//! expressed in ticks so that a tick-synchronous host gets deterministic
//! expiry.

use serde::{Deserialize, Serialize};

/// Opaque, stable identifier for a subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub u64);

impl SubjectId {
    /// Create a new subject ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subject({})", self.0)
    }
}

/// A point in host time, counted in ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    /// The first tick.
    pub const ZERO: Tick = Tick(0);

    /// Create a new tick.
    #[must_use]
    pub const fn new(tick: u64) -> Self {
        Self(tick)
    }

    /// Get the raw tick count.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Ticks elapsed since `earlier` (zero if `earlier` is in the future).
    #[must_use]
    pub const fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// This tick advanced by `ticks`.
    #[must_use]
    pub const fn after(self, ticks: u64) -> Tick {
        Tick(self.0.saturating_add(ticks))
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}
