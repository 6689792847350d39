//! Runtime configuration.
//!
//! Limits for the effect scheduler. Each thread flushes its own effect
//! queue, so configuration is installed per thread with
//! [`Runtime::configure`](crate::reactive::Runtime::configure).

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Scheduler limits and diagnostics switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Maximum number of effect runs in a single flush.
    pub max_flush_iterations: usize,

    /// Maximum number of times one effect may run in a single flush before
    /// the flush is aborted as a cycle.
    pub max_effect_reruns: usize,

    /// Emit a `trace` event for every propagated change.
    pub trace_propagation: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_flush_iterations: 10_000,
            max_effect_reruns: 100,
            trace_propagation: false,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}
