//! Logic plan graph configuration.

use serde::{Deserialize, Serialize};

/// Configuration for graph construction and plan extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Maximum number of distinct states the exhaustive build may enumerate.
    pub max_states: usize,

    /// Maximum number of equal-length alternative plans returned per goal.
    pub max_alternatives: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_states: 100_000,
            max_alternatives: 64,
        }
    }
}

impl GraphConfig {
    /// Set the state enumeration cap.
    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

    /// Set the per-goal alternative cap.
    pub fn with_max_alternatives(mut self, max_alternatives: usize) -> Self {
        self.max_alternatives = max_alternatives;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: GraphConfig = serde_json::from_str(r#"{"max_states": 12}"#).unwrap();
        assert_eq!(config.max_states, 12);
        assert_eq!(config.max_alternatives, GraphConfig::default().max_alternatives);
    }
}
