//! # LGP Engine
//!
//! Receding-horizon execution of logic-geometric plans.
//!
//! The [`Controller`] owns the plan graph and the collaborators (workspace,
//! predictor, trajectory optimizer). All time-varying state lives in an
//! [`ExecutionContext`] the caller passes in on every tick.

pub mod config;
pub mod context;
pub mod controller;
pub mod goal;
pub mod optimizer;
pub mod prediction;

pub use config::ControllerConfig;
pub use context::{ExecutionContext, Phase};
pub use controller::{ActOptions, ActOutcome, Controller};
pub use goal::{CarryGoalAdapter, GoalAdapter, GoalPatch, NoGoalAdaptation};
pub use optimizer::{LinearOptimizer, OptimizationOutcome, OptimizationProblem, TrajectoryOptimizer};
pub use prediction::{Predictor, ScriptedPredictor};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::ControllerConfig;
    pub use crate::context::{ExecutionContext, Phase};
    pub use crate::controller::{ActOptions, ActOutcome, Controller};
    pub use crate::goal::GoalAdapter;
    pub use crate::optimizer::TrajectoryOptimizer;
    pub use crate::prediction::Predictor;
}
