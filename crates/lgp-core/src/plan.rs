//! Symbolic plans: a state path plus the actions connecting it.

use serde::{Deserialize, Serialize};

use crate::action::GroundedAction;
use crate::atom::State;
use crate::error::{LgpError, Result};

/// A path of states from a source to a goal and the actions between them.
///
/// Invariant: `actions.len() == path.len() - 1` and applying `actions[i]` to
/// `path[i]` yields `path[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPlan")]
pub struct Plan {
    path: Vec<State>,
    actions: Vec<GroundedAction>,
}

#[derive(Deserialize)]
struct RawPlan {
    path: Vec<State>,
    #[serde(default)]
    actions: Vec<GroundedAction>,
}

impl TryFrom<RawPlan> for Plan {
    type Error = LgpError;

    fn try_from(raw: RawPlan) -> Result<Self> {
        Plan::new(raw.path, raw.actions)
    }
}

impl Plan {
    /// Create a plan, validating the path/action invariant.
    pub fn new(path: Vec<State>, actions: Vec<GroundedAction>) -> Result<Self> {
        Self::check(&path, &actions).map_err(|message| LgpError::InvalidPlan { message })?;
        Ok(Self { path, actions })
    }

    /// Create a plan produced by graph search.
    ///
    /// # Panics
    ///
    /// Panics if the path and actions disagree; search only emits consistent
    /// plans, so a violation is a bug in the caller.
    pub fn from_search(path: Vec<State>, actions: Vec<GroundedAction>) -> Self {
        if let Err(message) = Self::check(&path, &actions) {
            panic!("inconsistent plan from search: {}", message);
        }
        Self { path, actions }
    }

    fn check(path: &[State], actions: &[GroundedAction]) -> std::result::Result<(), String> {
        if path.is_empty() {
            return Err("State path cannot be empty".to_string());
        }
        if actions.len() + 1 != path.len() {
            return Err(format!(
                "Expected {} actions for a path of {} states, got {}",
                path.len() - 1,
                path.len(),
                actions.len()
            ));
        }
        for (i, action) in actions.iter().enumerate() {
            if action.apply(&path[i]) != path[i + 1] {
                return Err(format!(
                    "Action {} at position {} does not reproduce the next state",
                    action, i
                ));
            }
        }
        Ok(())
    }

    /// The state path, source first.
    pub fn path(&self) -> &[State] {
        &self.path
    }

    /// The action sequence.
    pub fn actions(&self) -> &[GroundedAction] {
        &self.actions
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True when the source already is the goal.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn first_action(&self) -> Option<&GroundedAction> {
        self.actions.first()
    }

    pub fn source(&self) -> &State {
        &self.path[0]
    }

    pub fn goal(&self) -> &State {
        &self.path[self.path.len() - 1]
    }

    /// Sum of action durations in planning ticks.
    pub fn total_duration(&self) -> u64 {
        self.actions.iter().map(GroundedAction::duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom;

    fn mv(from: &str, to: &str) -> GroundedAction {
        GroundedAction::builder("move")
            .parameters([from, to])
            .precondition(atom!("agent-at", from))
            .add_effect(atom!("agent-at", to))
            .del_effect(atom!("agent-at", from))
            .duration(4)
            .build()
            .unwrap()
    }

    fn at(location: &str) -> State {
        [atom!("agent-at", location)].into_iter().collect()
    }

    #[test]
    fn test_valid_plan() {
        let plan = Plan::new(
            vec![at("a"), at("b"), at("c")],
            vec![mv("a", "b"), mv("b", "c")],
        )
        .unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.total_duration(), 8);
        assert_eq!(plan.source(), &at("a"));
        assert_eq!(plan.goal(), &at("c"));
        assert_eq!(plan.first_action().map(|a| a.signature()), Some("move a b".to_string()));
    }

    #[test]
    fn test_length_mismatch() {
        let result = Plan::new(vec![at("a"), at("b")], vec![]);
        assert!(matches!(result, Err(LgpError::InvalidPlan { .. })));
    }

    #[test]
    fn test_effect_mismatch() {
        let result = Plan::new(vec![at("a"), at("c")], vec![mv("a", "b")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_plan() {
        let plan = Plan::new(vec![at("a")], vec![]).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_duration(), 0);
        assert!(plan.first_action().is_none());
    }

    #[test]
    fn test_deserialize_checks_invariant() {
        let empty = r#"{"path": [], "actions": []}"#;
        assert!(serde_json::from_str::<Plan>(empty).is_err());

        let plan = Plan::new(vec![at("a"), at("b")], vec![mv("a", "b")]).unwrap();
        let json = serde_json::to_string(&plan).unwrap();
        let parsed: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.source(), &at("a"));

        let mismatched = format!(
            r#"{{"path": {}, "actions": {}}}"#,
            serde_json::to_string(&vec![at("a"), at("c")]).unwrap(),
            serde_json::to_string(&vec![mv("a", "b")]).unwrap()
        );
        assert!(serde_json::from_str::<Plan>(&mismatched).is_err());
    }

    #[test]
    #[should_panic(expected = "inconsistent plan")]
    fn test_from_search_panics_on_mismatch() {
        Plan::from_search(vec![at("a")], vec![mv("a", "b")]);
    }
}
