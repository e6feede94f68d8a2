//! Human-motion prediction.

use std::collections::{BTreeMap, BTreeSet};

use lgp_core::State;
use lgp_state::Configuration;

/// Source of predicted symbolic states and human positions.
pub trait Predictor {
    /// Predicted symbolic state at environment tick `t`.
    fn predict(&self, t: u64) -> State;

    /// Predicted human position at environment tick `t`.
    fn position(&self, t: u64) -> Option<Configuration>;

    /// True if this predictor is authoritative for `predicate`.
    fn is_predicted(&self, predicate: &str) -> bool;
}

/// Predictor replaying keyframed states and positions.
///
/// A query at tick `t` returns the latest keyframe at or before `t`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPredictor {
    predicates: BTreeSet<String>,
    states: BTreeMap<u64, State>,
    positions: BTreeMap<u64, Configuration>,
}

impl ScriptedPredictor {
    pub fn new<I, S>(predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            predicates: predicates.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Predict `state` from tick `t` on.
    pub fn at(mut self, t: u64, state: State) -> Self {
        self.states.insert(t, state);
        self
    }

    /// Predict the human at `position` from tick `t` on.
    pub fn position_at(mut self, t: u64, position: Configuration) -> Self {
        self.positions.insert(t, position);
        self
    }

    pub fn predicates(&self) -> &BTreeSet<String> {
        &self.predicates
    }
}

impl Predictor for ScriptedPredictor {
    fn predict(&self, t: u64) -> State {
        self.states
            .range(..=t)
            .next_back()
            .map(|(_, state)| state.clone())
            .unwrap_or_default()
    }

    fn position(&self, t: u64) -> Option<Configuration> {
        self.positions
            .range(..=t)
            .next_back()
            .map(|(_, q)| q.clone())
    }

    fn is_predicted(&self, predicate: &str) -> bool {
        self.predicates.contains(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lgp_core::atom;

    #[test]
    fn test_keyframes() {
        let shelf: State = [atom!("human-at", "shelf")].into_iter().collect();
        let predictor = ScriptedPredictor::new(["human-at"])
            .at(5, shelf.clone())
            .position_at(2, Configuration::new(vec![1.0, 1.0]));

        assert!(predictor.predict(0).is_empty());
        assert_eq!(predictor.predict(5), shelf);
        assert_eq!(predictor.predict(50), shelf);
        assert!(predictor.position(1).is_none());
        assert_eq!(
            predictor.position(3),
            Some(Configuration::new(vec![1.0, 1.0]))
        );
        assert!(predictor.is_predicted("human-at"));
        assert!(!predictor.is_predicted("agent-at"));
    }
}
