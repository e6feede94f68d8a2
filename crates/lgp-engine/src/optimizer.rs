//! Trajectory optimization seam.

use lgp_state::{Trajectory, Waypoint, Workspace};

/// Input to a trajectory optimizer.
pub struct OptimizationProblem<'a> {
    /// World the trajectory lives in, including current obstacles.
    pub workspace: &'a dyn Workspace,
    /// Initial guess, one configuration per planning tick.
    pub trajectory: Trajectory,
    /// Configurations the result must pass through.
    pub waypoints: &'a [Waypoint],
}

/// Result of an optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    pub converged: bool,
    pub trajectory: Trajectory,
    pub gradient: f64,
    pub delta: f64,
}

/// Refines a waypoint skeleton into a trajectory.
pub trait TrajectoryOptimizer {
    fn optimize(&mut self, problem: &OptimizationProblem<'_>) -> OptimizationOutcome;
}

/// Keeps the interpolated skeleton and accepts it only if it clears every
/// obstacle by `clearance`.
#[derive(Debug, Clone, Default)]
pub struct LinearOptimizer {
    pub clearance: f64,
}

impl LinearOptimizer {
    pub fn new(clearance: f64) -> Self {
        Self { clearance }
    }
}

impl TrajectoryOptimizer for LinearOptimizer {
    fn optimize(&mut self, problem: &OptimizationProblem<'_>) -> OptimizationOutcome {
        let obstacles = problem.workspace.obstacles();
        let min_distance = problem
            .trajectory
            .configurations()
            .iter()
            .flat_map(|q| obstacles.values().map(move |shape| shape.signed_distance(q)))
            .fold(f64::INFINITY, f64::min);

        OptimizationOutcome {
            converged: min_distance >= self.clearance,
            trajectory: problem.trajectory.clone(),
            gradient: 0.0,
            delta: min_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lgp_state::{Configuration, InMemoryWorkspace, Shape, WorkspaceConfig};

    fn c(coords: &[f64]) -> Configuration {
        Configuration::new(coords.to_vec())
    }

    fn run(workspace: &InMemoryWorkspace) -> OptimizationOutcome {
        let waypoints = [
            Waypoint::new(c(&[0.0, 0.0]), 0),
            Waypoint::new(c(&[4.0, 0.0]), 4),
        ];
        let problem = OptimizationProblem {
            workspace,
            trajectory: Trajectory::linear_interpolation(&waypoints),
            waypoints: &waypoints,
        };
        LinearOptimizer::new(0.0).optimize(&problem)
    }

    #[test]
    fn test_free_space_converges() {
        let ws = InMemoryWorkspace::new(WorkspaceConfig::default()).unwrap();
        let outcome = run(&ws);
        assert!(outcome.converged);
        assert_eq!(outcome.trajectory.len(), 5);
    }

    #[test]
    fn test_blocked_path_fails() {
        let mut ws = InMemoryWorkspace::new(WorkspaceConfig::default()).unwrap();
        ws.insert_obstacle(
            "human",
            Shape::Circle {
                origin: c(&[2.0, 0.0]),
                radius: 0.5,
            },
        );
        let outcome = run(&ws);
        assert!(!outcome.converged);
        assert!(outcome.delta < 0.0);
    }
}
