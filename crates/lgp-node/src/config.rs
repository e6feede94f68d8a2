//! Node configuration.

use std::path::Path;

use anyhow::Context;
use lgp_engine::ControllerConfig;
use lgp_planner::GraphConfig;
use lgp_state::WorkspaceConfig;
use serde::{Deserialize, Serialize};

use crate::scenario::Scenario;

/// How the runner replans on trigger ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanningMode {
    /// Shortest plan, keeping progress on an unchanged first action.
    #[default]
    Dynamic,
    /// Full replan over all alternatives, with goal adaptation.
    Symbolic,
}

/// Configuration for the stepping loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub scenario: Scenario,
    pub workspace: WorkspaceConfig,
    pub graph: GraphConfig,
    pub controller: ControllerConfig,

    /// Replan every `trigger_period` planning ticks.
    pub trigger_period: u64,

    pub mode: PlanningMode,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::default(),
            workspace: WorkspaceConfig {
                duration: 60,
                ..WorkspaceConfig::default()
            },
            graph: GraphConfig::default(),
            controller: ControllerConfig::default(),
            trigger_period: 5,
            mode: PlanningMode::Dynamic,
        }
    }
}

impl NodeConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.trigger_period == 0 {
            anyhow::bail!("trigger_period must be at least 1");
        }
        self.controller.validate()?;
        Ok(())
    }
}
