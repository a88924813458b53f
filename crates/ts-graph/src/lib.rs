//! ts-graph: graph layer for the topside plumbing engine.
//!
//! Provides:
//! - Pressure nodes (mutable generic nodes and the immutable atmosphere)
//! - An owned, mutable directed multigraph keyed by `(from, to, key)`
//! - Stable dense indexing for solver integration
//!
//! # Example
//!
//! ```
//! use ts_graph::{MultiGraph, PressureNode};
//!
//! let mut graph: MultiGraph<PressureNode, f64> = MultiGraph::new();
//! graph.ensure_node("tank", PressureNode::for_name);
//! graph.ensure_node("atm", PressureNode::for_name);
//! graph.add_edge("tank", "atm", "vent.A1", 4.5).unwrap();
//!
//! assert_eq!(graph.node_count(), 2);
//! assert_eq!(graph.edge_count(), 1);
//! assert!(graph.node("atm").unwrap().is_atmosphere());
//! ```

pub mod error;
pub mod graph;
pub mod indexing;
pub mod node;

// Re-exports for ergonomics
pub use error::{GraphError, GraphResult};
pub use graph::{Edge, EdgeKey, MultiGraph};
pub use indexing::NodeIndex;
pub use node::{ATM, PressureNode};
