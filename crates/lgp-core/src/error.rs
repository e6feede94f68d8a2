//! Error types for hybrid logic-geometric planning.

use thiserror::Error;

/// Main error type for planning operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LgpError {
    /// A grounded action definition is malformed.
    #[error("Invalid action '{name}': {message}")]
    InvalidAction { name: String, message: String },

    /// A plan's state path and action sequence do not agree.
    #[error("Invalid plan: {message}")]
    InvalidPlan { message: String },

    /// Exhaustive graph construction reached its enumeration cap.
    #[error("State space exceeded the enumeration limit of {limit} states")]
    StateSpaceExceeded { limit: usize },

    /// A frame is not known to the workspace.
    #[error("Unknown frame: {frame}")]
    UnknownFrame { frame: String },

    /// A frame already rests on another support.
    #[error("Frame {frame} is already attached to {parent}")]
    AlreadyAttached { frame: String, parent: String },

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LgpError {
    /// Returns true if this error signals a programming mistake rather than
    /// a runtime condition the caller can retry around.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            LgpError::InvalidAction { .. } | LgpError::InvalidPlan { .. }
        )
    }

    /// Returns the frame name if the error concerns a workspace frame.
    pub fn frame(&self) -> Option<&str> {
        match self {
            LgpError::UnknownFrame { frame } => Some(frame),
            LgpError::AlreadyAttached { frame, .. } => Some(frame),
            _ => None,
        }
    }
}

/// Convenience Result type for planning operations.
pub type Result<T> = std::result::Result<T, LgpError>;
