//! Error types for procedure operations.

use thiserror::Error;
use ts_plumbing::EngineError;

use crate::engine::StepPosition;

/// Result type for procedure operations.
pub type ProcedureResult<T> = Result<T, ProcedureError>;

/// Errors that can occur while building or running procedures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProcedureError {
    /// The operation needs the current step to be at another position.
    #[error("Step {step} of procedure {procedure} must be at position {expected:?}")]
    WrongPosition {
        procedure: String,
        step: String,
        expected: StepPosition,
    },

    #[error("Unknown procedure: {procedure}")]
    UnknownProcedure { procedure: String },

    #[error("Unknown step {step} in procedure {procedure}")]
    UnknownStep { procedure: String, step: String },

    #[error("Checkpoint stack is empty")]
    EmptyStack,

    /// Suite or procedure failed construction checks.
    #[error("Invalid procedure suite: {what}")]
    InvalidSuite { what: String },

    #[error("Plumbing engine error: {0}")]
    Engine(#[from] EngineError),
}
