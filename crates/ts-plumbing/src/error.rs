//! Error types for engine operations.
//!
//! These are contract errors: the caller asked for something that cannot be
//! done. Data-quality problems in a loaded network are recorded as
//! `InvalidReason`s instead and never surface here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Bad input: {what}")]
    BadInput { what: String },

    #[error("Invalid engine: {what}")]
    InvalidEngine { what: String },

    #[error("Cannot reverse orientation: {what}")]
    BadOrientation { what: String },

    #[error("Graph error: {0}")]
    Graph(#[from] ts_graph::GraphError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub(crate) fn bad_input(what: impl Into<String>) -> Self {
        EngineError::BadInput { what: what.into() }
    }
}

impl From<ts_core::CoreError> for EngineError {
    fn from(e: ts_core::CoreError) -> Self {
        EngineError::BadInput {
            what: e.to_string(),
        }
    }
}
