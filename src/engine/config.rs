//! Engine configuration parameters.

use serde::{Deserialize, Serialize};

/// Engine tunables. Durations are in host ticks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a provider query result is reused (default: 40).
    /// 0 disables the holder cache.
    pub holder_cache_ttl: u64,

    /// Ticks between periodic sweeps over online subjects (default: 30).
    pub update_interval: u64,

    /// How long a subject's previous holders are kept without a
    /// reconciliation before they are torn down (default: 6000).
    pub state_idle_ttl: u64,

    /// Fire the built-in `enable` trigger for holders activated by a pass.
    pub dispatch_enable_trigger: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            holder_cache_ttl: 40,
            update_interval: 30,
            state_idle_ttl: 6000,
            dispatch_enable_trigger: true,
        }
    }
}

impl EngineConfig {
    /// Create a new config with custom holder cache TTL.
    pub fn with_holder_cache_ttl(mut self, ticks: u64) -> Self {
        self.holder_cache_ttl = ticks;
        self
    }

    /// Create a new config with custom sweep interval.
    pub fn with_update_interval(mut self, ticks: u64) -> Self {
        self.update_interval = ticks;
        self
    }

    /// Create a new config with custom idle TTL.
    pub fn with_state_idle_ttl(mut self, ticks: u64) -> Self {
        self.state_idle_ttl = ticks;
        self
    }

    /// Create a new config with the `enable` trigger on or off.
    pub fn with_enable_trigger(mut self, enabled: bool) -> Self {
        self.dispatch_enable_trigger = enabled;
        self
    }
}
