//! Controller configuration.

use lgp_core::{predicates, LgpError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the execution controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Planning ticks per environment tick.
    pub ratio: u64,

    /// Verification horizon in planning ticks; `None` covers the whole episode.
    pub window_len: Option<u64>,

    /// Radius of the obstacle placed at the predicted human position.
    pub human_radius: f64,

    /// Nullary predicate asking the agent to avoid the human.
    pub avoid_human_predicate: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            ratio: 1,
            window_len: None,
            human_radius: 0.3,
            avoid_human_predicate: predicates::AGENT_AVOID_HUMAN.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Derive the tick ratio from the simulation and sampling rates.
    pub fn with_fps(mut self, sim_fps: u64, fps: u64) -> Self {
        self.ratio = if fps == 0 { 0 } else { sim_fps / fps };
        self
    }

    /// Set the verification horizon.
    pub fn with_window_len(mut self, window_len: u64) -> Self {
        self.window_len = Some(window_len);
        self
    }

    /// Resolve the horizon for an episode of `duration` ticks.
    pub fn window_len_for(&self, duration: u64) -> u64 {
        self.window_len
            .unwrap_or_else(|| duration / self.ratio.max(1))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.ratio == 0 {
            return Err(LgpError::Config(
                "ratio must be at least 1 (sim_fps must be a multiple of fps)".to_string(),
            ));
        }
        if self.human_radius < 0.0 {
            return Err(LgpError::Config("human_radius cannot be negative".to_string()));
        }
        Ok(())
    }
}
