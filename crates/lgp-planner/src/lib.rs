//! # LGP Planner
//!
//! Logic plan graph construction and shortest-plan extraction for hybrid
//! logic-geometric planning.

pub mod config;
pub mod graph;

pub use config::GraphConfig;
pub use graph::LogicPlanGraph;
