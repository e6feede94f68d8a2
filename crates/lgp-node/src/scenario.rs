//! Scenario description: locations, objects, the human's track and the goal.

use lgp_core::{atom, predicates, Atom, GroundedAction, Goal, Problem, Result, State};
use lgp_engine::ScriptedPredictor;
use lgp_state::{Configuration, InMemoryWorkspace, Workspace, WorkspaceConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDef {
    pub name: String,
    pub position: Configuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDef {
    pub name: String,
    pub support: String,
    #[serde(default)]
    pub offset: Option<Configuration>,
}

/// A pick-and-deliver episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub locations: Vec<LocationDef>,
    pub objects: Vec<ObjectDef>,
    pub robot_start: Configuration,
    /// Human positions, one per environment tick; the last one holds.
    pub human_track: Vec<Configuration>,
    pub goal: Vec<Atom>,
    /// Treat the human as an obstacle.
    pub avoid_human: bool,
    pub move_duration: u64,
    pub manipulation_duration: u64,
}

impl Default for Scenario {
    /// The human lingers at the shelf, then walks away.
    fn default() -> Self {
        let at = |x: f64, y: f64| Configuration::new(vec![x, y]);
        let human_track = std::iter::repeat(at(4.0, 0.0))
            .take(8)
            .chain((1..=4).map(|i| at(4.0, 0.75 * i as f64)))
            .collect();
        Self {
            name: "deliver-cup".to_string(),
            locations: vec![
                LocationDef {
                    name: "table".to_string(),
                    position: at(0.0, 0.0),
                },
                LocationDef {
                    name: "shelf".to_string(),
                    position: at(4.0, 0.0),
                },
            ],
            objects: vec![ObjectDef {
                name: "cup".to_string(),
                support: "table".to_string(),
                offset: None,
            }],
            robot_start: at(0.0, 0.0),
            human_track,
            goal: vec![atom!("on", "cup", "shelf")],
            avoid_human: true,
            move_duration: 4,
            manipulation_duration: 2,
        }
    }
}

impl Scenario {
    /// Build the world.
    pub fn workspace(&self, config: WorkspaceConfig) -> Result<InMemoryWorkspace> {
        let dim = config.dim;
        let mut ws = InMemoryWorkspace::new(config)?.with_human_track(self.human_track.clone());
        for loc in &self.locations {
            ws.add_location(&loc.name, loc.position.clone())?;
        }
        for obj in &self.objects {
            let offset = obj.offset.clone().unwrap_or_else(|| Configuration::zeros(dim));
            ws.add_object(&obj.name, &obj.support, offset)?;
        }
        let robot = ws.robot_frame().to_string();
        ws.set_geometric_state(&robot, self.robot_start.clone())?;
        if let Some(first) = self.human_track.first() {
            ws.add_human(first.clone())?;
        }
        Ok(ws)
    }

    /// Predictor replaying the human track.
    pub fn predictor(&self, tolerance: f64) -> ScriptedPredictor {
        let mut predictor = ScriptedPredictor::new([predicates::HUMAN_AT]);
        for (t, position) in self.human_track.iter().enumerate() {
            let state: State = self
                .nearest_location(position, tolerance)
                .map(|loc| atom!(predicates::HUMAN_AT, loc))
                .into_iter()
                .collect();
            predictor = predictor
                .at(t as u64, state)
                .position_at(t as u64, position.clone());
        }
        predictor
    }

    fn nearest_location(&self, position: &Configuration, tolerance: f64) -> Option<&str> {
        self.locations
            .iter()
            .map(|loc| (loc.name.as_str(), loc.position.distance(position)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name)
    }

    /// The planning problem starting from an observed state.
    pub fn problem(&self, observed: State) -> Problem {
        let initial = if self.avoid_human {
            observed.with(Atom::nullary(predicates::AGENT_AVOID_HUMAN))
        } else {
            observed
        };
        Problem {
            name: self.name.clone(),
            initial,
            goal: Goal::new(self.goal.iter().cloned().collect(), State::new()),
        }
    }

    /// Ground move, pick and place over every location and object.
    pub fn ground_actions(&self) -> Result<Vec<GroundedAction>> {
        let mut actions = Vec::new();
        for from in &self.locations {
            for to in &self.locations {
                if from.name != to.name {
                    let back = self.move_action(&to.name, &from.name).build()?;
                    actions.push(self.move_action(&from.name, &to.name).reverse(back).build()?);
                }
            }
        }
        for obj in &self.objects {
            for loc in &self.locations {
                actions.push(self.pick_action(&obj.name, &loc.name)?);
                actions.push(self.place_action(&obj.name, &loc.name)?);
            }
        }
        Ok(actions)
    }

    /// A move must not end where the human is predicted to stand.
    fn move_action(&self, from: &str, to: &str) -> lgp_core::GroundedActionBuilder {
        GroundedAction::builder("move")
            .parameters([from, to])
            .precondition(atom!(predicates::AGENT_AT, from))
            .end_negative_precondition(atom!(predicates::HUMAN_AT, to))
            .add_effect(atom!(predicates::AGENT_AT, to))
            .del_effect(atom!(predicates::AGENT_AT, from))
            .duration(self.move_duration)
    }

    fn pick_action(&self, obj: &str, loc: &str) -> Result<GroundedAction> {
        GroundedAction::builder("pick")
            .parameters([obj, loc])
            .precondition(atom!(predicates::AGENT_AT, loc))
            .precondition(atom!(predicates::ON, obj, loc))
            .precondition(atom!(predicates::AGENT_FREE))
            .add_effect(atom!(predicates::AGENT_CARRY, obj))
            .del_effect(atom!(predicates::ON, obj, loc))
            .del_effect(atom!(predicates::AGENT_FREE))
            .duration(self.manipulation_duration)
            .build()
    }

    fn place_action(&self, obj: &str, loc: &str) -> Result<GroundedAction> {
        GroundedAction::builder("place")
            .parameters([obj, loc])
            .precondition(atom!(predicates::AGENT_AT, loc))
            .precondition(atom!(predicates::AGENT_CARRY, obj))
            .add_effect(atom!(predicates::ON, obj, loc))
            .add_effect(atom!(predicates::AGENT_FREE))
            .del_effect(atom!(predicates::AGENT_CARRY, obj))
            .duration(self.manipulation_duration)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lgp_engine::Predictor;

    #[test]
    fn test_default_world() {
        let scenario = Scenario::default();
        let ws = scenario.workspace(WorkspaceConfig::default()).unwrap();
        let state = ws.symbolic_state();
        assert!(state.contains(&atom!("agent-at", "table")));
        assert!(state.contains(&atom!("on", "cup", "table")));
        assert!(state.contains(&atom!("human-at", "shelf")));
    }

    #[test]
    fn test_ground_actions() {
        let actions = Scenario::default().ground_actions().unwrap();
        // Two moves, then pick/place at each of the two locations.
        assert_eq!(actions.len(), 6);
        let forward = &actions[0];
        assert_eq!(forward.signature(), "move table shelf");
        assert_eq!(
            forward.reverse().map(|a| a.signature()),
            Some("move shelf table".to_string())
        );
    }

    #[test]
    fn test_predictor_follows_track() {
        let predictor = Scenario::default().predictor(0.1);
        assert!(predictor.predict(7).contains(&atom!("human-at", "shelf")));
        assert!(predictor.predict(8).is_empty());
        assert_eq!(
            predictor.position(30),
            Some(Configuration::new(vec![4.0, 3.0]))
        );
    }

    #[test]
    fn test_problem_adds_avoid_atom() {
        let problem = Scenario::default().problem(State::new());
        assert!(problem.initial.contains(&atom!("agent-avoid-human")));
        assert_eq!(problem.goal.positive.len(), 1);
    }
}
