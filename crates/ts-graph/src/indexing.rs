//! Stable indexing for solver integration.
//!
//! Provides a bidirectional mapping between node names and contiguous solver
//! indices (0..N), in node-name order.

use std::collections::HashMap;

use crate::error::{GraphError, GraphResult};
use crate::graph::MultiGraph;

/// Index map providing stable, contiguous indices for graph nodes.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    /// Contiguous list of node names (index -> name).
    names: Vec<String>,

    /// Reverse lookup: name -> index.
    lookup: HashMap<String, usize>,
}

impl NodeIndex {
    /// Build an index map from a graph.
    pub fn from_graph<N, E>(graph: &MultiGraph<N, E>) -> Self {
        let names: Vec<String> = graph.nodes().map(|(name, _)| name.to_string()).collect();
        let lookup = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, lookup }
    }

    /// Number of nodes in the index.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get the contiguous index for a node name.
    pub fn node_idx(&self, name: &str) -> GraphResult<usize> {
        self.lookup
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::IdNotFound {
                what: format!("node {name}"),
            })
    }

    /// Get the node name at a contiguous index.
    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_follows_name_order() {
        let mut g: MultiGraph<(), ()> = MultiGraph::new();
        g.ensure_node("tank", |_| ());
        g.ensure_node("atm", |_| ());
        g.ensure_node("manifold", |_| ());

        let index = NodeIndex::from_graph(&g);
        assert_eq!(index.len(), 3);
        assert_eq!(index.node_idx("atm").unwrap(), 0);
        assert_eq!(index.name(2), Some("tank"));
        assert!(index.node_idx("nope").is_err());
    }
}
