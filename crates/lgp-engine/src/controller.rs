//! Receding-horizon execution controller.
//!
//! Each tick the caller advances the clocks, refreshes the symbolic state and
//! (on replanning ticks) asks for a new plan. The controller selects a
//! symbolic plan from the [`LogicPlanGraph`], verifies it against the
//! predicted human behavior inside the look-ahead window, turns it into a
//! waypoint skeleton and hands that to the trajectory optimizer.

use lgp_core::{ActionKind, Atom, GroundedAction, Plan, Result, State};
use lgp_planner::LogicPlanGraph;
use lgp_state::{Configuration, Shape, Trajectory, Waypoint, Workspace};
use tracing::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::context::{ExecutionContext, Phase};
use crate::goal::{CarryGoalAdapter, GoalAdapter};
use crate::optimizer::{OptimizationProblem, TrajectoryOptimizer};
use crate::prediction::Predictor;

/// Options for [`Controller::act`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActOptions {
    /// Check the action's preconditions against the current symbolic state.
    pub sanity_check: bool,
    /// Skip the action when the check fails.
    pub abort_on_violation: bool,
    /// Local offset for placed objects, relative to the target location.
    pub place_pos: Option<Configuration>,
}

impl Default for ActOptions {
    fn default() -> Self {
        Self {
            sanity_check: true,
            abort_on_violation: false,
            place_pos: None,
        }
    }
}

impl ActOptions {
    /// Options that skip the precondition check.
    pub fn unchecked() -> Self {
        Self {
            sanity_check: false,
            ..Self::default()
        }
    }

    pub fn aborting() -> Self {
        Self {
            abort_on_violation: true,
            ..Self::default()
        }
    }

    pub fn with_place_pos(mut self, place_pos: Configuration) -> Self {
        self.place_pos = Some(place_pos);
        self
    }
}

/// What [`Controller::act`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum ActOutcome {
    /// The world was changed.
    Applied,
    /// The action's effect was already in place.
    AlreadyApplied,
    /// Preconditions failed and the caller asked to abort.
    Aborted,
    /// No action given and none in progress.
    NoAction,
    /// A move was requested without an installed trajectory.
    NoTrajectory,
    /// The action kind has no geometric handler.
    Unsupported,
    /// The workspace rejected the change.
    Failed { reason: String },
}

impl ActOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ActOutcome::Applied | ActOutcome::AlreadyApplied)
    }
}

/// Controller tying the plan graph to a workspace, a predictor and an optimizer.
pub struct Controller<W, P, O> {
    graph: LogicPlanGraph,
    workspace: W,
    predictor: P,
    optimizer: O,
    goal_adapter: Box<dyn GoalAdapter>,
    config: ControllerConfig,
}

impl<W, P, O> Controller<W, P, O>
where
    W: Workspace,
    P: Predictor,
    O: TrajectoryOptimizer,
{
    /// Create a controller.
    ///
    /// Atoms of the problem's initial state that the workspace does not derive
    /// are installed as constant symbols.
    pub fn new(
        graph: LogicPlanGraph,
        mut workspace: W,
        predictor: P,
        optimizer: O,
        config: ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let adding = Self::symbol_sanity_check(graph.initial_state(), &workspace);
        let constants: State = graph
            .initial_state()
            .iter()
            .filter(|a| !workspace.deduced_predicates().contains(&a.predicate))
            .cloned()
            .collect();
        if !constants.is_empty() {
            debug!("Constant symbols: {}", constants);
        }
        workspace.set_constant_symbols(constants);
        if !adding.is_empty() {
            debug!("Symbols not derived from geometry: {}", adding);
        }

        Ok(Self {
            graph,
            workspace,
            predictor,
            optimizer,
            goal_adapter: Box::new(CarryGoalAdapter::default()),
            config,
        })
    }

    /// Replace the goal adapter.
    pub fn with_goal_adapter(mut self, adapter: impl GoalAdapter + 'static) -> Self {
        self.goal_adapter = Box::new(adapter);
        self
    }

    /// Compare the problem's initial state with the workspace's derived one.
    ///
    /// Returns the atoms the workspace does not derive.
    fn symbol_sanity_check(initial: &State, workspace: &W) -> State {
        let adding = initial.difference(&workspace.symbolic_state());
        for atom in &adding {
            if workspace.deduced_predicates().contains(&atom.predicate) {
                warn!(
                    "Adding symbol {}, which is deduced by the workspace but does not hold geometrically",
                    atom
                );
            }
            if !workspace.supported_predicates().contains(&atom.predicate) {
                error!(
                    "Adding symbol {}, whose predicate is not supported by the workspace",
                    atom
                );
            }
        }
        adding
    }

    /// Create a context for a new episode, starting from the workspace's symbolic state.
    pub fn new_context(&self) -> Result<ExecutionContext> {
        let duration = self.workspace.duration();
        let ctx = ExecutionContext::new(
            self.config.ratio,
            self.config.window_len_for(duration),
            duration,
        )?;
        Ok(ctx.with_state(self.observed_state()))
    }

    /// The workspace's symbolic state without atoms the predictor owns.
    ///
    /// Predicted atoms are checked during verification and never planned over.
    pub fn observed_state(&self) -> State {
        self.workspace
            .symbolic_state()
            .iter()
            .filter(|a| !self.predictor.is_predicted(&a.predicate))
            .cloned()
            .collect()
    }

    pub fn graph(&self) -> &LogicPlanGraph {
        &self.graph
    }

    pub fn workspace(&self) -> &W {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut W {
        &mut self.workspace
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn predictor_mut(&mut self) -> &mut P {
        &mut self.predictor
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Clear the plan and zero every clock.
    pub fn reset(&self, ctx: &mut ExecutionContext) {
        ctx.reset();
    }

    /// Advance one environment tick.
    pub fn advance_timestep(&self, ctx: &mut ExecutionContext) {
        ctx.advance();
    }

    /// Refresh the planning state from the workspace.
    pub fn update_current_symbolic_state(&self, ctx: &mut ExecutionContext) {
        ctx.current_state = self.observed_state();
    }

    /// Advance externally driven parts of the world to the current tick.
    pub fn update_workspace(&mut self, ctx: &ExecutionContext) {
        self.workspace.update(ctx.t);
    }

    /// True if the current symbolic state satisfies the action's preconditions.
    ///
    /// A violation is logged, not enforced.
    pub fn check_action_precondition(
        &self,
        ctx: &ExecutionContext,
        action: &GroundedAction,
    ) -> bool {
        let holds = action.is_applicable(&ctx.current_state);
        if !holds {
            error!(
                "Preconditions of action {} do not hold at time {}: state {}",
                action, ctx.t, ctx.current_state
            );
        }
        holds
    }

    fn requires_prediction(&self, action: &GroundedAction) -> bool {
        action
            .precondition_atoms()
            .chain(action.start_positive_preconditions().iter())
            .chain(action.start_negative_preconditions().iter())
            .chain(action.end_positive_preconditions().iter())
            .chain(action.end_negative_preconditions().iter())
            .any(|a| self.predictor.is_predicted(&a.predicate))
    }

    /// Check a plan against predicted states inside the look-ahead window.
    ///
    /// The start check of a first action already in progress is skipped.
    pub fn verify_plan(&self, ctx: &ExecutionContext, plan: &Plan) -> bool {
        let window = ctx.window_len as i64;
        let elapsed = ctx.symbolic_elapsed_t as i64;
        let mut lookahead: i64 = 0;

        for (i, action) in plan.actions().iter().enumerate() {
            let mut consumed = action.duration() as i64;
            if i == 0 {
                consumed -= elapsed;
            }

            if !self.requires_prediction(action) {
                lookahead += consumed;
                if lookahead > window {
                    break;
                }
                continue;
            }

            let in_progress = i == 0 && ctx.symbolic_elapsed_t != 0;
            if !in_progress {
                let predicted = self.predictor.predict(ctx.prediction_tick(lookahead));
                if !action.start_holds(&predicted) {
                    debug!(
                        "Start preconditions of {} violated at lookahead {}",
                        action, lookahead
                    );
                    return false;
                }
            }

            lookahead += consumed;
            if lookahead > window {
                break;
            }
            let predicted = self.predictor.predict(ctx.prediction_tick(lookahead));
            if !action.end_holds(&predicted) {
                debug!(
                    "End preconditions of {} violated at lookahead {}",
                    action, lookahead
                );
                return false;
            }
        }
        true
    }

    /// Rewrite the current state with the first goal patch found in the window.
    fn adapt_goal(&self, ctx: &mut ExecutionContext) {
        for i in 0..ctx.window_len {
            let t = ctx.t + i * ctx.ratio;
            let predicted = self.predictor.predict(t);
            if let Some(patch) =
                self.goal_adapter
                    .adapt(&predicted, self.graph.goal(), &ctx.current_state)
            {
                info!(
                    "Adapting goal from prediction at time {}: asserting {}",
                    t, patch.assert
                );
                ctx.current_state = patch.apply(&ctx.current_state);
                break;
            }
        }
    }

    /// Select and install the first acceptable symbolic plan.
    pub fn plan_symbolic(&self, ctx: &mut ExecutionContext, update_goal: bool, verify: bool) -> bool {
        ctx.clear_plan();
        if update_goal {
            self.adapt_goal(ctx);
        }

        let plans = self.graph.plan(&ctx.current_state, true);
        for plan in plans {
            if !verify || self.verify_plan(ctx, &plan) {
                info!(
                    "Selected symbolic plan with {} actions at time {}",
                    plan.len(),
                    ctx.t
                );
                ctx.install_plan(plan);
                return true;
            }
        }

        warn!("No feasible symbolic plan at time {}", ctx.t);
        false
    }

    /// Build the waypoint skeleton for the installed plan.
    fn waypoints(&self, ctx: &ExecutionContext) -> Option<Vec<Waypoint>> {
        let Some(plan) = ctx.plan() else {
            warn!("Symbolic plan is empty. Cannot plan trajectory!");
            return None;
        };
        let Some(robot_q) = self.workspace.robot_configuration() else {
            warn!("Agent frame {} has no configuration", self.workspace.robot_frame());
            return None;
        };

        let elapsed = ctx.symbolic_elapsed_t as i64;
        let mut waypoints = vec![Waypoint::new(robot_q.clone(), 0)];
        let mut t = -elapsed;
        for action in plan.actions() {
            let d = action.duration() as i64;
            if t + d > 0 {
                let hold = action.kind() != ActionKind::Move && t < elapsed && t + d > elapsed;
                let q = if hold {
                    robot_q.clone()
                } else {
                    let Some(location) = action.target_location() else {
                        warn!("Action {} has no target location", action);
                        return None;
                    };
                    match self.workspace.geometric_state(location) {
                        Some(q) => q,
                        None => {
                            warn!("Unknown location {} in action {}", location, action);
                            return None;
                        }
                    }
                };
                waypoints.push(Waypoint::new(q, (t + d) as u64));
            }
            t += d;
        }

        if waypoints.len() < 2 {
            warn!(
                "Elapsed time {} is larger than total time {} of the plan",
                elapsed,
                plan.total_duration()
            );
            return None;
        }
        Some(waypoints)
    }

    /// Treat the predicted human as an obstacle while the avoid atom holds.
    fn refresh_human_obstacle(&mut self, ctx: &ExecutionContext) {
        let human = self.workspace.human_frame().to_string();
        let avoid = Atom::nullary(self.config.avoid_human_predicate.as_str());
        if !ctx.current_state.contains(&avoid) {
            self.workspace.remove_obstacle(&human);
            return;
        }
        match self.predictor.position(ctx.t) {
            Some(origin) => {
                let shape = Shape::Circle {
                    origin,
                    radius: self.config.human_radius,
                };
                self.workspace.insert_obstacle(&human, shape);
            }
            None => {
                warn!("No predicted human position at time {}", ctx.t);
                self.workspace.remove_obstacle(&human);
            }
        }
    }

    /// Turn the installed plan into a trajectory.
    pub fn geometric_plan(&mut self, ctx: &mut ExecutionContext) -> bool {
        ctx.trajectory = None;
        ctx.geometric_elapsed_t = 0;
        ctx.phase = if ctx.plan.is_some() {
            Phase::SymbolicReady
        } else {
            Phase::Idle
        };

        let Some(waypoints) = self.waypoints(ctx) else {
            return false;
        };
        self.refresh_human_obstacle(ctx);

        let skeleton = Trajectory::linear_interpolation(&waypoints);
        let outcome = self.optimizer.optimize(&OptimizationProblem {
            workspace: &self.workspace,
            trajectory: skeleton,
            waypoints: &waypoints,
        });
        if !outcome.converged {
            warn!(
                "Trajectory optimization did not converge at time {}: gradient {}, delta {}",
                ctx.t, outcome.gradient, outcome.delta
            );
            return false;
        }

        debug!(
            "Installed trajectory with {} samples at time {}",
            outcome.trajectory.len(),
            ctx.t
        );
        ctx.trajectory = Some(outcome.trajectory);
        ctx.phase = Phase::GeometricReady;
        true
    }

    /// Replan from the current state, keeping progress on an unchanged first action.
    pub fn dynamic_plan(&mut self, ctx: &mut ExecutionContext) -> bool {
        ctx.clear_plan();

        let Some(plan) = self.graph.plan(&ctx.current_state, false).into_iter().next() else {
            warn!(
                "Logic planning failed at current time: {}. Trying replanning at next trigger.",
                ctx.t
            );
            return false;
        };
        if plan.is_empty() {
            info!("Goal already satisfied at time {}", ctx.t);
            return false;
        }
        if !self.verify_plan(ctx, &plan) {
            warn!(
                "Plan is infeasible at current time: {}. Trying replanning at next trigger.",
                ctx.t
            );
            return false;
        }

        let first = plan.first_action().map(GroundedAction::signature);
        if ctx.prev_first_action != first {
            ctx.symbolic_elapsed_t = 0;
            ctx.prev_first_action = first;
        }
        ctx.install_plan(plan);
        self.geometric_plan(ctx)
    }

    /// The action in progress, if any.
    pub fn get_current_action(&self, ctx: &ExecutionContext) -> Option<GroundedAction> {
        if ctx.plan().is_none() {
            warn!("Symbolic plan is empty. Cannot get current action!");
            return None;
        }
        ctx.current_action().cloned()
    }

    /// Apply an action's geometric effect; defaults to the action in progress.
    pub fn act(
        &mut self,
        ctx: &mut ExecutionContext,
        action: Option<&GroundedAction>,
        options: &ActOptions,
    ) -> ActOutcome {
        let action = match action {
            Some(a) => a.clone(),
            None => match ctx.current_action() {
                Some(a) => a.clone(),
                None => return ActOutcome::NoAction,
            },
        };

        if options.sanity_check
            && !self.check_action_precondition(ctx, &action)
            && options.abort_on_violation
        {
            return ActOutcome::Aborted;
        }

        let outcome = match action.kind() {
            ActionKind::Move => self.move_action(ctx),
            ActionKind::Pick => self.pick_action(&action),
            ActionKind::Place => self.place_action(&action, options.place_pos.clone()),
            ActionKind::Other => {
                warn!("Action {} has no geometric handler", action);
                ActOutcome::Unsupported
            }
        };

        if outcome.is_applied() && ctx.phase == Phase::GeometricReady {
            ctx.phase = Phase::Executing;
        }
        outcome
    }

    fn move_action(&mut self, ctx: &ExecutionContext) -> ActOutcome {
        let Some(q) = ctx
            .trajectory()
            .and_then(|traj| traj.configuration(ctx.geometric_elapsed_t))
            .cloned()
        else {
            warn!("Trajectory is empty. Cannot move at time {}", ctx.t);
            return ActOutcome::NoTrajectory;
        };
        let robot = self.workspace.robot_frame().to_string();
        match self.workspace.set_geometric_state(&robot, q) {
            Ok(()) => ActOutcome::Applied,
            Err(e) => {
                error!("Failed to move {}: {}", robot, e);
                ActOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn pick_action(&mut self, action: &GroundedAction) -> ActOutcome {
        let (Some(object), Some(location)) = (action.manipulated_object(), action.target_location())
        else {
            warn!("Action {} does not name an object and a location", action);
            return ActOutcome::Unsupported;
        };
        let robot = self.workspace.robot_frame().to_string();
        let dim = self.workspace.dim();
        let tree = self.workspace.kin_tree_mut();

        if tree.has_edge(&robot, object) {
            return ActOutcome::AlreadyApplied;
        }
        if !tree.contains(object) || !tree.contains(&robot) {
            let reason = format!("Unknown frame in action {}", action);
            error!("{}", reason);
            return ActOutcome::Failed { reason };
        }
        let result = tree.reparent(&robot, object).and_then(|support| {
            tree.set_origin(object, Configuration::zeros(dim))
                .map(|()| support)
        });
        match result {
            Ok(support) => {
                if let Some(support) = support.filter(|s| s != location) {
                    debug!("Picked {} from {} instead of {}", object, support, location);
                }
                ActOutcome::Applied
            }
            Err(e) => {
                error!("Failed to pick {}: {}", object, e);
                ActOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn place_action(
        &mut self,
        action: &GroundedAction,
        place_pos: Option<Configuration>,
    ) -> ActOutcome {
        let (Some(object), Some(location)) = (action.manipulated_object(), action.target_location())
        else {
            warn!("Action {} does not name an object and a location", action);
            return ActOutcome::Unsupported;
        };
        let robot = self.workspace.robot_frame().to_string();
        let dim = self.workspace.dim();
        let tree = self.workspace.kin_tree_mut();

        if !tree.has_edge(&robot, object) {
            return ActOutcome::AlreadyApplied;
        }
        if !tree.contains(location) {
            let reason = format!("Unknown location {} in action {}", location, action);
            error!("{}", reason);
            return ActOutcome::Failed { reason };
        }
        let offset = place_pos.unwrap_or_else(|| Configuration::zeros(dim));
        let result = tree
            .reparent(location, object)
            .and_then(|_| tree.set_origin(object, offset));
        match result {
            Ok(()) => ActOutcome::Applied,
            Err(e) => {
                error!("Failed to place {}: {}", object, e);
                ActOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
