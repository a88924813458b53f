//! Owned directed multigraph.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::error::{GraphError, GraphResult};

/// Full identity of an edge. Parallel edges between the same pair of nodes
/// are told apart by `key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub from: String,
    pub to: String,
    pub key: String,
}

impl EdgeKey {
    pub fn new(from: impl Into<String>, to: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} -> {}, {})", self.from, self.to, self.key)
    }
}

/// A directed edge with its weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<E> {
    pub key: EdgeKey,
    pub weight: E,
}

/// Directed multigraph over string-named nodes.
///
/// Edges live in a slot vector; removed slots are recycled. Each node keeps
/// the set of slots incident to it (in or out), which is what the solver and
/// garbage collection walk.
#[derive(Debug, Clone)]
pub struct MultiGraph<N, E> {
    nodes: BTreeMap<String, N>,
    slots: Vec<Option<Edge<E>>>,
    free: Vec<usize>,
    by_key: HashMap<EdgeKey, usize>,
    incident: BTreeMap<String, BTreeSet<usize>>,
}

impl<N, E> Default for MultiGraph<N, E> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            by_key: HashMap::new(),
            incident: BTreeMap::new(),
        }
    }
}

impl<N, E> MultiGraph<N, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&N> {
        self.nodes.get(name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut N> {
        self.nodes.get_mut(name)
    }

    /// Nodes in name order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &N)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = (&str, &mut N)> {
        self.nodes.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Return the node named `name`, inserting `make(name)` first if absent.
    pub fn ensure_node<F>(&mut self, name: &str, make: F) -> &mut N
    where
        F: FnOnce(&str) -> N,
    {
        if !self.nodes.contains_key(name) {
            self.incident.insert(name.to_string(), BTreeSet::new());
        }
        self.nodes
            .entry(name.to_string())
            .or_insert_with(|| make(name))
    }

    /// Remove a node with no incident edges.
    pub fn remove_node(&mut self, name: &str) -> GraphResult<N> {
        let degree = self.degree(name);
        if degree > 0 {
            return Err(GraphError::NodeInUse {
                node: name.to_string(),
                edges: degree,
            });
        }
        self.incident.remove(name);
        self.nodes.remove(name).ok_or_else(|| GraphError::NodeNotFound {
            node: name.to_string(),
        })
    }

    /// Number of edges entering or leaving `name`.
    pub fn degree(&self, name: &str) -> usize {
        self.incident.get(name).map_or(0, BTreeSet::len)
    }

    pub fn add_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        key: impl Into<String>,
        weight: E,
    ) -> GraphResult<()> {
        let key = EdgeKey::new(from, to, key);
        for end in [&key.from, &key.to] {
            if !self.nodes.contains_key(end) {
                return Err(GraphError::InvalidNodeRef { node: end.clone() });
            }
        }
        if self.by_key.contains_key(&key) {
            return Err(GraphError::DuplicateEdge { key });
        }

        let edge = Edge {
            key: key.clone(),
            weight,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(edge);
                slot
            }
            None => {
                self.slots.push(Some(edge));
                self.slots.len() - 1
            }
        };
        for end in [&key.from, &key.to] {
            self.incident.entry(end.clone()).or_default().insert(slot);
        }
        self.by_key.insert(key, slot);
        Ok(())
    }

    pub fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn edge_weight(&self, key: &EdgeKey) -> Option<&E> {
        let slot = *self.by_key.get(key)?;
        self.slots[slot].as_ref().map(|e| &e.weight)
    }

    pub fn edge_weight_mut(&mut self, key: &EdgeKey) -> Option<&mut E> {
        let slot = *self.by_key.get(key)?;
        self.slots[slot].as_mut().map(|e| &mut e.weight)
    }

    pub fn remove_edge(&mut self, key: &EdgeKey) -> GraphResult<E> {
        let slot = self
            .by_key
            .remove(key)
            .ok_or_else(|| GraphError::EdgeNotFound { key: key.clone() })?;
        let edge = self.slots[slot]
            .take()
            .ok_or_else(|| GraphError::EdgeNotFound { key: key.clone() })?;
        for end in [&key.from, &key.to] {
            if let Some(set) = self.incident.get_mut(end) {
                set.remove(&slot);
            }
        }
        self.free.push(slot);
        Ok(edge.weight)
    }

    /// Remove every edge whose key satisfies `pred`, returning them in slot order.
    pub fn remove_edges_where<F>(&mut self, pred: F) -> Vec<Edge<E>>
    where
        F: Fn(&EdgeKey) -> bool,
    {
        let doomed: Vec<EdgeKey> = self
            .edges()
            .filter(|e| pred(&e.key))
            .map(|e| e.key.clone())
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for key in doomed {
            if let Ok(weight) = self.remove_edge(&key) {
                removed.push(Edge { key, weight });
            }
        }
        removed
    }

    /// Edges in slot order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge<E>> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Edges entering or leaving `name`.
    pub fn incident_edges<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Edge<E>> + 'a {
        self.incident
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter())
            .filter_map(|&slot| self.slots[slot].as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_nodes() -> MultiGraph<(), f64> {
        let mut g = MultiGraph::new();
        g.ensure_node("a", |_| ());
        g.ensure_node("b", |_| ());
        g
    }

    #[test]
    fn parallel_edges_are_distinct() {
        let mut g = two_nodes();
        g.add_edge("a", "b", "v1.A1", 1.0).unwrap();
        g.add_edge("a", "b", "v2.A1", 2.0).unwrap();
        g.add_edge("b", "a", "v1.A2", 3.0).unwrap();

        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.degree("a"), 3);
        assert_eq!(g.edge_weight(&EdgeKey::new("a", "b", "v2.A1")), Some(&2.0));
    }

    #[test]
    fn duplicate_edge_rejected() {
        let mut g = two_nodes();
        g.add_edge("a", "b", "k", 1.0).unwrap();
        let err = g.add_edge("a", "b", "k", 5.0).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateEdge { .. }));
    }

    #[test]
    fn edge_to_missing_node_rejected() {
        let mut g = two_nodes();
        let err = g.add_edge("a", "zzz", "k", 1.0).unwrap_err();
        assert_eq!(
            err,
            GraphError::InvalidNodeRef {
                node: "zzz".to_string()
            }
        );
    }

    #[test]
    fn slots_are_recycled() {
        let mut g = two_nodes();
        g.add_edge("a", "b", "k1", 1.0).unwrap();
        g.remove_edge(&EdgeKey::new("a", "b", "k1")).unwrap();
        g.add_edge("b", "a", "k2", 2.0).unwrap();
        assert_eq!(g.slots.len(), 1);
        assert_eq!(g.degree("a"), 1);
    }

    #[test]
    fn node_in_use_cannot_be_removed() {
        let mut g = two_nodes();
        g.add_edge("a", "b", "k", 1.0).unwrap();
        assert!(matches!(
            g.remove_node("a"),
            Err(GraphError::NodeInUse { edges: 1, .. })
        ));
        g.remove_edge(&EdgeKey::new("a", "b", "k")).unwrap();
        assert!(g.remove_node("a").is_ok());
        assert!(!g.contains_node("a"));
    }
}
