//! Core error types for VIA Studio.

use thiserror::Error;

use crate::models::AttemptStatus;

/// Core error type for VIA Studio operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Prompt is blank.
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    /// A completed attempt needs a playable URL.
    #[error("Video reference must not be empty")]
    EmptyReference,

    /// Attempt status can only change once.
    #[error("Invalid attempt transition from {from} to {to}")]
    InvalidTransition {
        /// Status before the transition.
        from: AttemptStatus,
        /// Requested status.
        to: AttemptStatus,
    },

    /// The attempt is not the one in flight.
    #[error("Attempt {0} is not in flight")]
    NotInFlight(String),

    /// Unrecognized value for a setting.
    #[error("Invalid {field}: {value}")]
    InvalidValue {
        /// Which setting.
        field: &'static str,
        /// The rejected input.
        value: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
