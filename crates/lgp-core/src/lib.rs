//! # LGP Core
//!
//! Core primitives for hybrid logic-geometric planning.
//!
//! This crate provides the fundamental building blocks:
//! - [`Atom`] / [`State`] - Ground atoms and value-typed predicate states
//! - [`GroundedAction`] - Immutable grounded actions with timed preconditions
//! - [`Plan`] - State path plus the actions connecting it
//! - [`LgpError`] - Error types

pub mod action;
pub mod atom;
pub mod error;
pub mod plan;
pub mod types;

// Re-exports for convenience
pub use action::{ActionKind, GroundedAction, GroundedActionBuilder};
pub use atom::{Atom, State};
pub use error::{LgpError, Result};
pub use plan::Plan;
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::action::{ActionKind, GroundedAction};
    pub use crate::atom::{Atom, State};
    pub use crate::error::{LgpError, Result};
    pub use crate::plan::Plan;
    pub use crate::types::{predicates, Goal, Problem};
}
