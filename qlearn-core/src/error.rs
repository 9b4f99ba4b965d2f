//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// Functions return these wrapped in [`anyhow::Error`]; callers that need to
/// branch on the kind can use `err.downcast_ref::<QlearnError>()`.
#[derive(Error, Debug, PartialEq)]
pub enum QlearnError {
    /// A configuration value is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A transition pushed into a replay buffer does not have batch size 1.
    #[error("Transition batch size must be {expected}, got {actual}")]
    BatchSize {
        /// Required batch size.
        expected: usize,
        /// Batch size of the given transition.
        actual: usize,
    },

    /// A field of a transition does not match the shape established by the buffer.
    #[error("Shape mismatch in {field}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Name of the field.
        field: String,
        /// Trailing shape held by the buffer.
        expected: Vec<usize>,
        /// Trailing shape of the given data.
        actual: Vec<usize>,
    },

    /// Sampling was requested from a replay buffer holding no transitions.
    #[error("Cannot sample from an empty replay buffer")]
    EmptyBuffer,

    /// A component was used before `reset()` was called.
    #[error("{0} was used before reset()")]
    NotReset(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}
