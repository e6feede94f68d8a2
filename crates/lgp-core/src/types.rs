//! Common types shared by the planner, world and controller.

use serde::{Deserialize, Serialize};

use crate::atom::{Atom, State};

/// Predicate names understood by the workspace and the default goal adapter.
pub mod predicates {
    /// `(agent-at ?location)`: the controlled agent stands at a location.
    pub const AGENT_AT: &str = "agent-at";
    /// `(agent-carry ?object)`: the controlled agent holds an object.
    pub const AGENT_CARRY: &str = "agent-carry";
    /// `(agent-free)`: the controlled agent holds nothing.
    pub const AGENT_FREE: &str = "agent-free";
    /// `(agent-avoid-human)`: treat the human as an obstacle.
    pub const AGENT_AVOID_HUMAN: &str = "agent-avoid-human";
    /// `(on ?object ?location)`: an object rests on a location.
    pub const ON: &str = "on";
    /// `(human-carry ?object)`: the human holds an object.
    pub const HUMAN_CARRY: &str = "human-carry";
    /// `(human-at ?location)`: the human stands at a location.
    pub const HUMAN_AT: &str = "human-at";
}

/// Goal condition over predicate states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Atoms that must hold.
    #[serde(default)]
    pub positive: State,

    /// Atoms that must not hold.
    #[serde(default)]
    pub negative: State,
}

impl Goal {
    /// Create a goal from positive and negative atoms.
    pub fn new(positive: State, negative: State) -> Self {
        Self { positive, negative }
    }

    /// Check whether a state satisfies this goal.
    pub fn is_satisfied_by(&self, state: &State) -> bool {
        state.applicable(&self.positive, &self.negative)
    }

    /// Find the positive goal atom with `predicate` whose first argument is `subject`.
    pub fn positive_about(&self, predicate: &str, subject: &str) -> Option<&Atom> {
        self.positive
            .iter()
            .find(|a| a.is(predicate) && a.arg(0) == Some(subject))
    }
}

/// An already-grounded planning problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Problem name.
    pub name: String,

    /// Initial symbolic state.
    pub initial: State,

    /// Goal condition.
    pub goal: Goal,
}
