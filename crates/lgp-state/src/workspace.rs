//! Workspace implementations.
//!
//! The workspace owns the geometric world: frame positions (stored as origins
//! in the [`KinematicTree`]), the obstacle set, and the symbolic state derived
//! from both.

use std::collections::{BTreeMap, BTreeSet};

use lgp_core::{predicates, Atom, LgpError, Result, State};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Configuration, Shape};
use crate::kinematics::{FrameKind, KinematicTree};

/// Geometric and relational world state consumed by the controller.
pub trait Workspace {
    /// Frame of the controlled agent.
    fn robot_frame(&self) -> &str;

    /// Frame of the tracked human.
    fn human_frame(&self) -> &str;

    /// Episode length in environment ticks.
    fn duration(&self) -> u64;

    /// Global configuration of a frame.
    fn geometric_state(&self, frame: &str) -> Option<Configuration>;

    /// Overwrite a frame's configuration.
    fn set_geometric_state(&mut self, frame: &str, configuration: Configuration) -> Result<()>;

    /// Current configuration of the controlled agent.
    fn robot_configuration(&self) -> Option<Configuration> {
        self.geometric_state(self.robot_frame())
    }

    fn kin_tree(&self) -> &KinematicTree;

    fn kin_tree_mut(&mut self) -> &mut KinematicTree;

    /// Obstacles by frame name.
    fn obstacles(&self) -> &BTreeMap<String, Shape>;

    /// Insert or refresh an obstacle.
    fn insert_obstacle(&mut self, name: &str, shape: Shape);

    /// Remove an obstacle if present.
    fn remove_obstacle(&mut self, name: &str) -> Option<Shape>;

    /// Symbolic state derived from the current geometry.
    fn symbolic_state(&self) -> State;

    /// Predicates the workspace can represent.
    fn supported_predicates(&self) -> &BTreeSet<String>;

    /// Predicates the workspace derives from geometry.
    fn deduced_predicates(&self) -> &BTreeSet<String>;

    /// Atoms that always hold, merged into every derived state.
    fn set_constant_symbols(&mut self, symbols: State);

    /// Dimension of configuration vectors.
    fn dim(&self) -> usize;

    /// Advance externally driven parts of the world to tick `t`.
    fn update(&mut self, _t: u64) {}
}

/// Configuration for [`InMemoryWorkspace`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Frame name of the controlled agent.
    pub robot_frame: String,

    /// Frame name of the tracked human.
    pub human_frame: String,

    /// Episode length in environment ticks.
    pub duration: u64,

    /// Configuration space dimension.
    pub dim: usize,

    /// Maximum distance at which an agent counts as standing at a location.
    pub location_tolerance: f64,

    /// Supported predicates beyond the deduced ones.
    pub extra_predicates: BTreeSet<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            robot_frame: "robot".to_string(),
            human_frame: "human".to_string(),
            duration: 1_000,
            dim: 2,
            location_tolerance: 0.1,
            extra_predicates: [predicates::AGENT_AVOID_HUMAN]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// In-memory workspace.
#[derive(Debug, Clone)]
pub struct InMemoryWorkspace {
    config: WorkspaceConfig,
    kin_tree: KinematicTree,
    obstacles: BTreeMap<String, Shape>,
    constant_symbols: State,
    /// Recorded human positions, one per environment tick.
    human_track: Vec<Configuration>,
    supported: BTreeSet<String>,
    deduced: BTreeSet<String>,
}

impl InMemoryWorkspace {
    /// Create a workspace with the robot at the origin.
    pub fn new(config: WorkspaceConfig) -> Result<Self> {
        let mut kin_tree = KinematicTree::new();
        kin_tree.add_frame(
            config.robot_frame.clone(),
            FrameKind::Robot,
            Configuration::zeros(config.dim),
        )?;

        let deduced: BTreeSet<String> = [
            predicates::AGENT_AT,
            predicates::AGENT_CARRY,
            predicates::AGENT_FREE,
            predicates::ON,
            predicates::HUMAN_AT,
            predicates::HUMAN_CARRY,
        ]
        .into_iter()
        .map(String::from)
        .collect();
        let supported = deduced.union(&config.extra_predicates).cloned().collect();

        Ok(Self {
            config,
            kin_tree,
            obstacles: BTreeMap::new(),
            constant_symbols: State::new(),
            human_track: Vec::new(),
            supported,
            deduced,
        })
    }

    /// Add a fixed location frame.
    pub fn add_location(&mut self, name: &str, origin: Configuration) -> Result<()> {
        self.kin_tree.add_frame(name, FrameKind::Location, origin)
    }

    /// Add an object resting on `support` at a local offset.
    pub fn add_object(&mut self, name: &str, support: &str, offset: Configuration) -> Result<()> {
        self.kin_tree.add_frame(name, FrameKind::Object, offset)?;
        self.kin_tree.attach(support, name)
    }

    /// Add the tracked human at a position.
    pub fn add_human(&mut self, origin: Configuration) -> Result<()> {
        let name = self.config.human_frame.clone();
        self.kin_tree.add_frame(name, FrameKind::Human, origin)
    }

    /// Record the human's positions, one per environment tick.
    pub fn with_human_track(mut self, track: Vec<Configuration>) -> Self {
        self.human_track = track;
        self
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn constant_symbols(&self) -> &State {
        &self.constant_symbols
    }

    /// Nearest location within tolerance of a frame.
    fn location_of(&self, frame: &str) -> Option<String> {
        let position = self.geometric_state(frame)?;
        self.kin_tree
            .frames_of_kind(FrameKind::Location)
            .into_iter()
            .map(|loc| (loc.name.as_str(), loc.origin.distance(&position)))
            .filter(|(_, d)| *d <= self.config.location_tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name.to_string())
    }
}

impl Workspace for InMemoryWorkspace {
    fn robot_frame(&self) -> &str {
        &self.config.robot_frame
    }

    fn human_frame(&self) -> &str {
        &self.config.human_frame
    }

    fn duration(&self) -> u64 {
        self.config.duration
    }

    fn geometric_state(&self, frame: &str) -> Option<Configuration> {
        self.kin_tree.global_origin(frame)
    }

    fn set_geometric_state(&mut self, frame: &str, configuration: Configuration) -> Result<()> {
        // Attached frames move with their support.
        if let Some(parent) = self.kin_tree.parent(frame) {
            return Err(LgpError::AlreadyAttached {
                frame: frame.to_string(),
                parent: parent.to_string(),
            });
        }
        self.kin_tree.set_origin(frame, configuration)
    }

    fn kin_tree(&self) -> &KinematicTree {
        &self.kin_tree
    }

    fn kin_tree_mut(&mut self) -> &mut KinematicTree {
        &mut self.kin_tree
    }

    fn obstacles(&self) -> &BTreeMap<String, Shape> {
        &self.obstacles
    }

    fn insert_obstacle(&mut self, name: &str, shape: Shape) {
        self.obstacles.insert(name.to_string(), shape);
    }

    fn remove_obstacle(&mut self, name: &str) -> Option<Shape> {
        self.obstacles.remove(name)
    }

    fn symbolic_state(&self) -> State {
        let robot = self.robot_frame();
        let human = self.human_frame();
        let mut atoms: Vec<Atom> = self.constant_symbols.iter().cloned().collect();

        let carried = self.kin_tree.children(robot);
        if carried.is_empty() {
            atoms.push(Atom::nullary(predicates::AGENT_FREE));
        }
        for obj in self.kin_tree.frames_of_kind(FrameKind::Object) {
            let Some(parent) = self.kin_tree.parent(&obj.name) else {
                continue;
            };
            match self.kin_tree.frame(parent).map(|f| f.kind) {
                Some(FrameKind::Robot) => {
                    atoms.push(Atom::new(predicates::AGENT_CARRY, [obj.name.as_str()]))
                }
                Some(FrameKind::Human) => {
                    atoms.push(Atom::new(predicates::HUMAN_CARRY, [obj.name.as_str()]))
                }
                Some(FrameKind::Location) => {
                    atoms.push(Atom::new(predicates::ON, [obj.name.as_str(), parent]))
                }
                _ => {}
            }
        }
        if let Some(loc) = self.location_of(robot) {
            atoms.push(Atom::new(predicates::AGENT_AT, [loc]));
        }
        if self.kin_tree.contains(human) {
            if let Some(loc) = self.location_of(human) {
                atoms.push(Atom::new(predicates::HUMAN_AT, [loc]));
            }
        }

        atoms.into_iter().collect()
    }

    fn supported_predicates(&self) -> &BTreeSet<String> {
        &self.supported
    }

    fn deduced_predicates(&self) -> &BTreeSet<String> {
        &self.deduced
    }

    fn set_constant_symbols(&mut self, symbols: State) {
        self.constant_symbols = symbols;
    }

    fn dim(&self) -> usize {
        self.config.dim
    }

    fn update(&mut self, t: u64) {
        let Some(last) = self.human_track.len().checked_sub(1) else {
            return;
        };
        let index = usize::try_from(t).map_or(last, |t| t.min(last));
        let position = self.human_track[index].clone();
        let human = self.config.human_frame.clone();
        if let Err(e) = self.set_geometric_state(&human, position) {
            debug!("Human frame not updated at tick {}: {}", t, e);
        }
    }
}
