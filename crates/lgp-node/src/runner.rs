//! Episode stepping loop.

use lgp_core::{Result, State};
use lgp_engine::{
    ActOptions, ActOutcome, Controller, ExecutionContext, LinearOptimizer, Predictor,
    ScriptedPredictor,
};
use lgp_planner::LogicPlanGraph;
use lgp_state::{InMemoryWorkspace, Workspace};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{NodeConfig, PlanningMode};

/// What happened during an episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub scenario: String,
    pub ticks: u64,
    pub replans: u64,
    pub failed_replans: u64,
    /// Ticks on which an action changed (or had already changed) the world.
    pub executed_ticks: u64,
    pub goal_reached: bool,
    pub final_state: State,
}

/// Drives a controller through one episode.
pub struct Runner {
    controller: Controller<InMemoryWorkspace, ScriptedPredictor, LinearOptimizer>,
    ctx: ExecutionContext,
    trigger_period: u64,
    mode: PlanningMode,
    scenario: String,
}

impl Runner {
    /// Build the world, the plan graph and the controller for a configuration.
    pub fn from_config(config: &NodeConfig) -> Result<Self> {
        let scenario = &config.scenario;
        let workspace = scenario.workspace(config.workspace.clone())?;
        let predictor = scenario.predictor(config.workspace.location_tolerance);

        let observed: State = workspace
            .symbolic_state()
            .iter()
            .filter(|a| !predictor.is_predicted(&a.predicate))
            .cloned()
            .collect();
        let problem = scenario.problem(observed);
        let actions = scenario.ground_actions()?;
        let graph = LogicPlanGraph::from_problem(&problem, &actions, config.graph.clone())?;
        info!(
            "Built logic plan graph for {}: {} states, {} transitions",
            problem.name,
            graph.node_count(),
            graph.edge_count()
        );

        let controller = Controller::new(
            graph,
            workspace,
            predictor,
            LinearOptimizer::default(),
            config.controller.clone(),
        )?;
        let ctx = controller.new_context()?;

        Ok(Self {
            controller,
            ctx,
            trigger_period: config.trigger_period.max(1),
            mode: config.mode,
            scenario: problem.name,
        })
    }

    fn goal_reached(&self) -> bool {
        self.controller
            .graph()
            .goal()
            .is_satisfied_by(&self.ctx.current_state)
    }

    fn replan(&mut self) -> bool {
        let ok = match self.mode {
            PlanningMode::Dynamic => self.controller.dynamic_plan(&mut self.ctx),
            PlanningMode::Symbolic => {
                self.ctx.symbolic_elapsed_t = 0;
                self.controller.plan_symbolic(&mut self.ctx, true, true)
                    && self.controller.geometric_plan(&mut self.ctx)
            }
        };
        if !ok {
            // Nothing executes until a trajectory is installed.
            self.ctx.clear_plan();
        }
        ok
    }

    /// Run until the goal holds or the episode ends.
    pub fn run(&mut self) -> EpisodeSummary {
        let mut summary = EpisodeSummary {
            scenario: self.scenario.clone(),
            ..EpisodeSummary::default()
        };
        info!("🚀 Running {} for {} ticks", self.scenario, self.ctx.duration);

        while self.ctx.t < self.ctx.duration {
            self.controller.update_workspace(&self.ctx);

            if self.ctx.lgp_t % self.trigger_period == 0 {
                self.controller.update_current_symbolic_state(&mut self.ctx);
                if self.goal_reached() {
                    summary.goal_reached = true;
                    break;
                }
                if self.controller.graph().contains(&self.ctx.current_state) {
                    summary.replans += 1;
                    if !self.replan() {
                        summary.failed_replans += 1;
                    }
                } else {
                    debug!(
                        "Agent is between symbolic states at time {}; keeping the current plan",
                        self.ctx.t
                    );
                }
            }

            if self.ctx.trajectory().is_some() {
                match self
                    .controller
                    .act(&mut self.ctx, None, &ActOptions::unchecked())
                {
                    outcome if outcome.is_applied() => summary.executed_ticks += 1,
                    ActOutcome::NoAction => {}
                    outcome => warn!("Action at time {} not executed: {:?}", self.ctx.t, outcome),
                }
            }

            self.controller.advance_timestep(&mut self.ctx);
        }

        if !summary.goal_reached {
            self.controller.update_current_symbolic_state(&mut self.ctx);
            summary.goal_reached = self.goal_reached();
        }
        summary.ticks = self.ctx.t;
        summary.final_state = self.ctx.current_state.clone();

        if summary.goal_reached {
            info!("🎯 Goal reached at time {}", summary.ticks);
        } else {
            warn!("Episode ended at time {} without reaching the goal", summary.ticks);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lgp_core::atom;

    #[test]
    fn test_default_scenario_waits_for_human() {
        let mut runner = Runner::from_config(&NodeConfig::default()).unwrap();
        let summary = runner.run();

        assert!(summary.goal_reached);
        assert!(summary.final_state.contains(&atom!("on", "cup", "shelf")));
        // Blocked by the predicted human at t=0, by the human obstacle at t=5.
        assert_eq!(summary.failed_replans, 2);
        assert_eq!(summary.ticks, 20);
    }

    #[test]
    fn test_symbolic_mode_reaches_goal() {
        let config = NodeConfig {
            mode: PlanningMode::Symbolic,
            ..NodeConfig::default()
        };
        let summary = Runner::from_config(&config).unwrap().run();
        assert!(summary.goal_reached);
    }

    #[test]
    fn test_short_episode_ends_without_goal() {
        let mut config = NodeConfig::default();
        config.workspace.duration = 8;
        let summary = Runner::from_config(&config).unwrap().run();
        assert!(!summary.goal_reached);
        assert_eq!(summary.ticks, 8);
    }
}
