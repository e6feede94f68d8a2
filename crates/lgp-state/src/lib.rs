//! # LGP State
//!
//! Geometric world state shared by the planner and the execution controller.

pub mod geometry;
pub mod kinematics;
pub mod workspace;

pub use geometry::{Configuration, Shape, Trajectory, Waypoint};
pub use kinematics::{Frame, FrameKind, KinematicTree};
pub use workspace::{InMemoryWorkspace, Workspace, WorkspaceConfig};
