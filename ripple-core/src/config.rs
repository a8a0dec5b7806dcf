//! Graph Configuration
//!
//! Knobs that change how a graph evaluates, not what it computes.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Evaluation settings for a [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Run each node's output verifier after its operation returns.
    ///
    /// Verification costs an extra call per evaluation, so it is meant for
    /// development builds.
    pub verify_outputs: bool,

    /// Skip an operation when every input still carries the revision the
    /// node last computed from.
    ///
    /// Only disable this when operations are not pure functions of their
    /// inputs.
    pub short_circuit: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            verify_outputs: false,
            short_circuit: true,
        }
    }
}

impl GraphConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_verify_outputs(mut self, enabled: bool) -> Self {
        self.verify_outputs = enabled;
        self
    }

    pub fn with_short_circuit(mut self, enabled: bool) -> Self {
        self.short_circuit = enabled;
        self
    }
}
