//! Graph-specific error types.

use crate::graph::EdgeKey;

pub type GraphResult<T> = Result<T, GraphError>;

/// Graph mutation and lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An edge endpoint refers to a node that doesn't exist.
    InvalidNodeRef { node: String },

    /// An edge with the same `(from, to, key)` already exists.
    DuplicateEdge { key: EdgeKey },

    /// No edge with this `(from, to, key)`.
    EdgeNotFound { key: EdgeKey },

    /// No node with this name.
    NodeNotFound { node: String },

    /// A node still has incident edges and cannot be removed.
    NodeInUse { node: String, edges: usize },

    /// Name not found in index map.
    IdNotFound { what: String },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::InvalidNodeRef { node } => {
                write!(f, "Edge refers to non-existent node {}", node)
            }
            GraphError::DuplicateEdge { key } => write!(f, "Edge {} already exists", key),
            GraphError::EdgeNotFound { key } => write!(f, "Edge {} not found", key),
            GraphError::NodeNotFound { node } => write!(f, "Node {} not found", node),
            GraphError::NodeInUse { node, edges } => {
                write!(f, "Node {} still has {} incident edges", node, edges)
            }
            GraphError::IdNotFound { what } => write!(f, "{} not found in index map", what),
        }
    }
}

impl std::error::Error for GraphError {}
