//! Execution context: clocks and the active plan, owned by the caller and
//! passed into every controller call.

use lgp_core::{GroundedAction, LgpError, Plan, Result, State};
use lgp_state::Trajectory;
use serde::{Deserialize, Serialize};

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No active plan.
    #[default]
    Idle,
    /// A verified symbolic plan is selected.
    SymbolicReady,
    /// A trajectory is installed.
    GeometricReady,
    /// Ticking forward through the installed plan.
    Executing,
}

impl Phase {
    /// Returns true if a symbolic plan is active.
    pub fn has_plan(&self) -> bool {
        !matches!(self, Phase::Idle)
    }
}

/// Mutable execution state of the receding-horizon controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    /// Environment clock, capped at `duration`.
    pub t: u64,
    /// Internal planning clock.
    pub lgp_t: u64,
    /// Ticks since the current first plan action became first.
    pub symbolic_elapsed_t: u64,
    /// Ticks since the current trajectory was installed.
    pub geometric_elapsed_t: u64,
    /// Planning ticks per environment tick.
    pub ratio: u64,
    /// Verification horizon in planning ticks.
    pub window_len: u64,
    /// Episode length in environment ticks.
    pub duration: u64,
    /// Symbolic state planning starts from.
    pub current_state: State,
    pub(crate) plan: Option<Plan>,
    pub(crate) trajectory: Option<Trajectory>,
    pub(crate) prev_first_action: Option<String>,
    pub(crate) phase: Phase,
}

impl ExecutionContext {
    /// Create a context with zeroed clocks.
    pub fn new(ratio: u64, window_len: u64, duration: u64) -> Result<Self> {
        if ratio == 0 {
            return Err(LgpError::Config("ratio must be at least 1".to_string()));
        }
        Ok(Self {
            t: 0,
            lgp_t: 0,
            symbolic_elapsed_t: 0,
            geometric_elapsed_t: 0,
            ratio,
            window_len,
            duration,
            current_state: State::new(),
            plan: None,
            trajectory: None,
            prev_first_action: None,
            phase: Phase::Idle,
        })
    }

    /// Set the symbolic state.
    pub fn with_state(mut self, state: State) -> Self {
        self.current_state = state;
        self
    }

    /// Drop the active plan and trajectory.
    pub fn clear_plan(&mut self) {
        self.plan = None;
        self.trajectory = None;
        self.phase = Phase::Idle;
    }

    /// Clear the plan and zero every clock.
    pub fn reset(&mut self) {
        self.clear_plan();
        self.t = 0;
        self.lgp_t = 0;
        self.symbolic_elapsed_t = 0;
        self.geometric_elapsed_t = 0;
        self.prev_first_action = None;
    }

    /// Advance both clocks by one tick.
    pub fn advance(&mut self) {
        if self.t < self.duration {
            self.t += 1;
        }
        self.lgp_t += 1;
        if self.plan.is_some() && self.lgp_t % self.ratio == 0 {
            self.symbolic_elapsed_t += 1;
            self.geometric_elapsed_t += 1;
        }
    }

    pub(crate) fn install_plan(&mut self, plan: Plan) {
        self.plan = Some(plan);
        self.trajectory = None;
        self.phase = Phase::SymbolicReady;
    }

    /// Prediction tick `lookahead` planning ticks from now.
    pub(crate) fn prediction_tick(&self, lookahead: i64) -> u64 {
        let tick = self.t as i64 + lookahead * self.ratio as i64;
        tick.max(0) as u64
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.trajectory.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Signature of the first action of the last accepted dynamic plan.
    pub fn prev_first_action(&self) -> Option<&str> {
        self.prev_first_action.as_deref()
    }

    /// The action in progress at `symbolic_elapsed_t`, if the plan is not exhausted.
    pub fn current_action(&self) -> Option<&GroundedAction> {
        let plan = self.plan.as_ref()?;
        let mut t = 0;
        for action in plan.actions() {
            if t + action.duration() > self.symbolic_elapsed_t {
                return Some(action);
            }
            t += action.duration();
        }
        None
    }
}
