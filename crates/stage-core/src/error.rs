//! Error taxonomy for scene operations.
//!
//! A vetoed mutation is not an error: mutators report it as `Ok(false)`.

use crate::id::ShapeId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// A value was rejected at construction or setter time.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A collaborator broke a structural invariant (double add, bad parent).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    /// The shape kind does not implement the requested operation.
    #[error("missing capability: {0}")]
    MissingCapability(String),
    #[error("shape {0} not found")]
    ShapeNotFound(ShapeId),
}

impl StageError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        StageError::InvalidArgument(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        StageError::InvariantViolation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, StageError>;
