//! Goal adaptation from predicted human behavior.

use lgp_core::{predicates, Atom, Goal, State};

/// Replacement of one atom in the current symbolic state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalPatch {
    pub retract: Option<Atom>,
    pub assert: Atom,
}

impl GoalPatch {
    pub fn apply(&self, state: &State) -> State {
        let state = match &self.retract {
            Some(atom) => state.without(atom),
            None => state.clone(),
        };
        state.with(self.assert.clone())
    }
}

/// Decides how a predicted state changes what the agent still has to do.
pub trait GoalAdapter {
    fn adapt(&self, predicted: &State, goal: &Goal, current: &State) -> Option<GoalPatch>;
}

/// If the human is predicted to carry an object, assume they deliver it to
/// its goal location.
#[derive(Debug, Clone)]
pub struct CarryGoalAdapter {
    carry_predicate: String,
    location_predicate: String,
}

impl Default for CarryGoalAdapter {
    fn default() -> Self {
        Self {
            carry_predicate: predicates::HUMAN_CARRY.to_string(),
            location_predicate: predicates::ON.to_string(),
        }
    }
}

impl CarryGoalAdapter {
    pub fn new(carry_predicate: impl Into<String>, location_predicate: impl Into<String>) -> Self {
        Self {
            carry_predicate: carry_predicate.into(),
            location_predicate: location_predicate.into(),
        }
    }
}

impl GoalAdapter for CarryGoalAdapter {
    fn adapt(&self, predicted: &State, goal: &Goal, current: &State) -> Option<GoalPatch> {
        // The human carries one object at a time.
        let object = predicted
            .with_predicate(&self.carry_predicate)
            .find_map(|a| a.arg(0))?;
        let target = goal.positive_about(&self.location_predicate, object)?;
        if current.contains(target) {
            return None;
        }
        let retract = current
            .with_predicate(&self.location_predicate)
            .find(|a| a.arg(0) == Some(object))
            .cloned();
        Some(GoalPatch {
            retract,
            assert: target.clone(),
        })
    }
}

/// Never adapts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGoalAdaptation;

impl GoalAdapter for NoGoalAdaptation {
    fn adapt(&self, _predicted: &State, _goal: &Goal, _current: &State) -> Option<GoalPatch> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lgp_core::atom;

    fn goal() -> Goal {
        Goal::new([atom!("on", "cup", "shelf")].into_iter().collect(), State::new())
    }

    #[test]
    fn test_carry_patch() {
        let predicted: State = [atom!("human-carry", "cup")].into_iter().collect();
        let current: State = [atom!("on", "cup", "table"), atom!("agent-free")]
            .into_iter()
            .collect();
        let patch = CarryGoalAdapter::default()
            .adapt(&predicted, &goal(), &current)
            .unwrap();
        assert_eq!(patch.retract, Some(atom!("on", "cup", "table")));

        let adapted = patch.apply(&current);
        assert!(adapted.contains(&atom!("on", "cup", "shelf")));
        assert!(!adapted.contains(&atom!("on", "cup", "table")));
        assert!(adapted.contains(&atom!("agent-free")));
    }

    #[test]
    fn test_no_patch_when_already_delivered() {
        let predicted: State = [atom!("human-carry", "cup")].into_iter().collect();
        let current: State = [atom!("on", "cup", "shelf")].into_iter().collect();
        assert!(CarryGoalAdapter::default()
            .adapt(&predicted, &goal(), &current)
            .is_none());
    }

    #[test]
    fn test_no_patch_without_carry() {
        let current: State = [atom!("on", "cup", "table")].into_iter().collect();
        assert!(CarryGoalAdapter::default()
            .adapt(&State::new(), &goal(), &current)
            .is_none());
        assert!(NoGoalAdaptation.adapt(&State::new(), &goal(), &current).is_none());
    }
}
