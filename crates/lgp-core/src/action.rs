//! Grounded actions and their builder.
//!
//! A [`GroundedAction`] is an action template with every parameter bound.
//! Actions are produced once by grounding and never mutated afterwards, so
//! all fields are private and exposed through accessors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::atom::{Atom, State};
use crate::error::{LgpError, Result};

/// Kind of an action, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Locomotion of the controlled agent.
    Move,
    /// Grasping an object.
    Pick,
    /// Releasing a held object.
    Place,
    /// Any action without a geometric handler.
    Other,
}

impl ActionKind {
    /// Classify an action name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "move" => ActionKind::Move,
            "pick" => ActionKind::Pick,
            "place" => ActionKind::Place,
            _ => ActionKind::Other,
        }
    }

    /// Returns true for pick/place.
    pub fn is_manipulation(&self) -> bool {
        matches!(self, ActionKind::Pick | ActionKind::Place)
    }
}

/// A fully grounded action.
///
/// Deserialization goes through the same checks as [`GroundedActionBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawGroundedAction")]
pub struct GroundedAction {
    name: String,
    parameters: Vec<String>,
    positive_preconditions: State,
    negative_preconditions: State,
    start_positive_preconditions: State,
    start_negative_preconditions: State,
    end_positive_preconditions: State,
    end_negative_preconditions: State,
    add_effects: State,
    del_effects: State,
    duration: u64,
    reverse: Option<Box<GroundedAction>>,
}

impl GroundedAction {
    /// Create a new builder.
    pub fn builder(name: impl Into<String>) -> GroundedActionBuilder {
        GroundedActionBuilder::new(name)
    }

    /// Action name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound parameters, in order.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Kind of this action.
    pub fn kind(&self) -> ActionKind {
        ActionKind::from_name(&self.name)
    }

    /// Identity used to detect that the same action is still executing
    /// across replanning calls, e.g. `"move table shelf"`.
    pub fn signature(&self) -> String {
        let mut signature = self.name.clone();
        for p in &self.parameters {
            signature.push(' ');
            signature.push_str(p);
        }
        signature
    }

    /// Duration in planning ticks (always at least one).
    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn positive_preconditions(&self) -> &State {
        &self.positive_preconditions
    }

    pub fn negative_preconditions(&self) -> &State {
        &self.negative_preconditions
    }

    pub fn start_positive_preconditions(&self) -> &State {
        &self.start_positive_preconditions
    }

    pub fn start_negative_preconditions(&self) -> &State {
        &self.start_negative_preconditions
    }

    pub fn end_positive_preconditions(&self) -> &State {
        &self.end_positive_preconditions
    }

    pub fn end_negative_preconditions(&self) -> &State {
        &self.end_negative_preconditions
    }

    pub fn add_effects(&self) -> &State {
        &self.add_effects
    }

    pub fn del_effects(&self) -> &State {
        &self.del_effects
    }

    /// The undo action, if declared.
    pub fn reverse(&self) -> Option<&GroundedAction> {
        self.reverse.as_deref()
    }

    /// Check the planning preconditions against a state.
    pub fn is_applicable(&self, state: &State) -> bool {
        state.applicable(&self.positive_preconditions, &self.negative_preconditions)
    }

    /// Check the start-time preconditions against a (predicted) state.
    pub fn start_holds(&self, state: &State) -> bool {
        state.applicable(
            &self.start_positive_preconditions,
            &self.start_negative_preconditions,
        )
    }

    /// Check the end-time preconditions against a (predicted) state.
    pub fn end_holds(&self, state: &State) -> bool {
        state.applicable(
            &self.end_positive_preconditions,
            &self.end_negative_preconditions,
        )
    }

    /// Apply this action's effects.
    pub fn apply(&self, state: &State) -> State {
        state.apply(&self.add_effects, &self.del_effects)
    }

    /// Iterate over every atom in the positive and negative preconditions.
    pub fn precondition_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.positive_preconditions
            .iter()
            .chain(self.negative_preconditions.iter())
    }

    /// The location an action ends at: the last parameter.
    pub fn target_location(&self) -> Option<&str> {
        self.parameters.last().map(String::as_str)
    }

    /// The manipulated object of a pick/place: the second-to-last parameter.
    pub fn manipulated_object(&self) -> Option<&str> {
        if !self.kind().is_manipulation() || self.parameters.len() < 2 {
            return None;
        }
        self.parameters
            .get(self.parameters.len() - 2)
            .map(String::as_str)
    }
}

/// Unchecked wire form of a [`GroundedAction`].
#[derive(Deserialize)]
struct RawGroundedAction {
    name: String,
    #[serde(default)]
    parameters: Vec<String>,
    #[serde(default)]
    positive_preconditions: State,
    #[serde(default)]
    negative_preconditions: State,
    #[serde(default)]
    start_positive_preconditions: State,
    #[serde(default)]
    start_negative_preconditions: State,
    #[serde(default)]
    end_positive_preconditions: State,
    #[serde(default)]
    end_negative_preconditions: State,
    #[serde(default)]
    add_effects: State,
    #[serde(default)]
    del_effects: State,
    duration: u64,
    #[serde(default)]
    reverse: Option<Box<GroundedAction>>,
}

impl TryFrom<RawGroundedAction> for GroundedAction {
    type Error = LgpError;

    fn try_from(raw: RawGroundedAction) -> Result<Self> {
        check_header(&raw.name, raw.duration)?;
        Ok(GroundedAction {
            name: raw.name,
            parameters: raw.parameters,
            positive_preconditions: raw.positive_preconditions,
            negative_preconditions: raw.negative_preconditions,
            start_positive_preconditions: raw.start_positive_preconditions,
            start_negative_preconditions: raw.start_negative_preconditions,
            end_positive_preconditions: raw.end_positive_preconditions,
            end_negative_preconditions: raw.end_negative_preconditions,
            add_effects: raw.add_effects,
            del_effects: raw.del_effects,
            duration: raw.duration,
            reverse: raw.reverse,
        })
    }
}

fn check_header(name: &str, duration: u64) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LgpError::InvalidAction {
            name: name.to_string(),
            message: "Action name cannot be empty".to_string(),
        });
    }
    if duration == 0 {
        return Err(LgpError::InvalidAction {
            name: name.to_string(),
            message: "Duration must be at least one tick".to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for GroundedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// Builder for [`GroundedAction`].
#[derive(Debug, Default)]
pub struct GroundedActionBuilder {
    name: String,
    parameters: Vec<String>,
    positive_preconditions: Vec<Atom>,
    negative_preconditions: Vec<Atom>,
    start_positive_preconditions: Vec<Atom>,
    start_negative_preconditions: Vec<Atom>,
    end_positive_preconditions: Vec<Atom>,
    end_negative_preconditions: Vec<Atom>,
    add_effects: Vec<Atom>,
    del_effects: Vec<Atom>,
    duration: u64,
    reverse: Option<GroundedAction>,
}

impl GroundedActionBuilder {
    /// Create a new builder with a duration of one tick.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: 1,
            ..Default::default()
        }
    }

    /// Append a bound parameter.
    pub fn parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    /// Append several bound parameters.
    pub fn parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters
            .extend(parameters.into_iter().map(Into::into));
        self
    }

    pub fn precondition(mut self, atom: Atom) -> Self {
        self.positive_preconditions.push(atom);
        self
    }

    pub fn negative_precondition(mut self, atom: Atom) -> Self {
        self.negative_preconditions.push(atom);
        self
    }

    pub fn start_precondition(mut self, atom: Atom) -> Self {
        self.start_positive_preconditions.push(atom);
        self
    }

    pub fn start_negative_precondition(mut self, atom: Atom) -> Self {
        self.start_negative_preconditions.push(atom);
        self
    }

    pub fn end_precondition(mut self, atom: Atom) -> Self {
        self.end_positive_preconditions.push(atom);
        self
    }

    pub fn end_negative_precondition(mut self, atom: Atom) -> Self {
        self.end_negative_preconditions.push(atom);
        self
    }

    pub fn add_effect(mut self, atom: Atom) -> Self {
        self.add_effects.push(atom);
        self
    }

    pub fn del_effect(mut self, atom: Atom) -> Self {
        self.del_effects.push(atom);
        self
    }

    /// Set the duration in planning ticks.
    pub fn duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }

    /// Declare the undo action.
    pub fn reverse(mut self, reverse: GroundedAction) -> Self {
        self.reverse = Some(reverse);
        self
    }

    /// Build the action.
    pub fn build(self) -> Result<GroundedAction> {
        check_header(&self.name, self.duration)?;

        Ok(GroundedAction {
            name: self.name,
            parameters: self.parameters,
            positive_preconditions: self.positive_preconditions.into_iter().collect(),
            negative_preconditions: self.negative_preconditions.into_iter().collect(),
            start_positive_preconditions: self.start_positive_preconditions.into_iter().collect(),
            start_negative_preconditions: self.start_negative_preconditions.into_iter().collect(),
            end_positive_preconditions: self.end_positive_preconditions.into_iter().collect(),
            end_negative_preconditions: self.end_negative_preconditions.into_iter().collect(),
            add_effects: self.add_effects.into_iter().collect(),
            del_effects: self.del_effects.into_iter().collect(),
            duration: self.duration,
            reverse: self.reverse.map(Box::new),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom;

    fn pick() -> GroundedAction {
        GroundedAction::builder("pick")
            .parameters(["cup", "table"])
            .precondition(atom!("on", "cup", "table"))
            .precondition(atom!("agent-at", "table"))
            .negative_precondition(atom!("agent-carry", "cup"))
            .add_effect(atom!("agent-carry", "cup"))
            .del_effect(atom!("on", "cup", "table"))
            .duration(3)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder() {
        let action = pick();
        assert_eq!(action.name(), "pick");
        assert_eq!(action.kind(), ActionKind::Pick);
        assert_eq!(action.duration(), 3);
        assert_eq!(action.signature(), "pick cup table");
        assert_eq!(action.positive_preconditions().len(), 2);
        assert!(action.reverse().is_none());
    }

    #[test]
    fn test_builder_rejects_zero_duration() {
        let result = GroundedAction::builder("move").duration(0).build();
        assert!(matches!(result, Err(LgpError::InvalidAction { .. })));
    }

    #[test]
    fn test_builder_rejects_empty_name() {
        assert!(GroundedAction::builder("  ").build().is_err());
    }

    #[test]
    fn test_parameter_roles() {
        let action = pick();
        assert_eq!(action.manipulated_object(), Some("cup"));
        assert_eq!(action.target_location(), Some("table"));

        let mv = GroundedAction::builder("move")
            .parameters(["table", "shelf"])
            .build()
            .unwrap();
        assert_eq!(mv.target_location(), Some("shelf"));
        assert_eq!(mv.manipulated_object(), None);
    }

    #[test]
    fn test_apply_and_applicability() {
        let action = pick();
        let state: State = [atom!("on", "cup", "table"), atom!("agent-at", "table")]
            .into_iter()
            .collect();
        assert!(action.is_applicable(&state));

        let next = action.apply(&state);
        assert!(next.contains(&atom!("agent-carry", "cup")));
        assert!(!next.contains(&atom!("on", "cup", "table")));
        assert!(!action.is_applicable(&next));
    }

    #[test]
    fn test_reverse_action() {
        let place = GroundedAction::builder("place")
            .parameters(["cup", "table"])
            .build()
            .unwrap();
        let action = GroundedAction::builder("pick")
            .parameters(["cup", "table"])
            .reverse(place.clone())
            .build()
            .unwrap();
        assert_eq!(action.reverse(), Some(&place));
    }

    #[test]
    fn test_deserialize_validates() {
        let zero = r#"{"name": "move", "parameters": ["a", "b"], "duration": 0}"#;
        assert!(serde_json::from_str::<GroundedAction>(zero).is_err());

        let nameless = r#"{"name": "", "duration": 2}"#;
        assert!(serde_json::from_str::<GroundedAction>(nameless).is_err());

        let bad_reverse = r#"{"name": "pick", "duration": 2,
            "reverse": {"name": "place", "duration": 0}}"#;
        assert!(serde_json::from_str::<GroundedAction>(bad_reverse).is_err());
    }

    #[test]
    fn test_deserialize_serialized_action() {
        let action = pick();
        let json = serde_json::to_string(&action).unwrap();
        let parsed: GroundedAction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, action);
    }
}
