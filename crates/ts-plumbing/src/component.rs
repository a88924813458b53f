//! Reusable plumbing component templates.
//!
//! A component is a small graph over its own local node names (for a valve,
//! usually `"1"` and `"2"`) plus a conductance table per named state. The
//! engine places it into the global graph through a node mapping.

use std::collections::BTreeMap;

use ts_core::{ErrorSet, FC_MAX, InvalidReason, Real, Teq, fc_to_teq, teq_to_fc};
use ts_graph::{EdgeKey, MultiGraph};

/// Per-state teq tables as supplied by a definition: `state -> edge key -> teq`.
pub type StateTeqs = BTreeMap<String, BTreeMap<String, Teq>>;

/// A component template with converted per-state flow coefficients.
#[derive(Debug, Clone)]
pub struct PlumbingComponent {
    name: String,
    component_graph: MultiGraph<(), ()>,
    /// Declared edges in declaration order.
    edges: Vec<EdgeKey>,
    /// `state -> local edge key -> FC`
    states: BTreeMap<String, BTreeMap<String, Real>>,
    current_state: Option<String>,
    error_set: ErrorSet,
}

impl PlumbingComponent {
    /// Build a component from its state teq tables and edge list.
    ///
    /// Problems are recorded on the component rather than returned: edges used
    /// by a state but missing from `edges` are skipped, bad teqs are clamped.
    /// Declared edges a state does not mention are closed in that state.
    pub fn new(name: impl Into<String>, states: &StateTeqs, edges: &[EdgeKey]) -> Self {
        let name = name.into();
        let mut component = Self {
            name,
            component_graph: MultiGraph::new(),
            edges: Vec::with_capacity(edges.len()),
            states: BTreeMap::new(),
            current_state: None,
            error_set: ErrorSet::new(),
        };

        for edge in edges {
            if component.edge(&edge.key).is_some() {
                component.error_set.insert(InvalidReason::InvalidComponentEdge {
                    message: format!(
                        "edge key {} declared more than once in {}",
                        edge.key, component.name
                    ),
                    component: component.name.clone(),
                    edge: edge.key.clone(),
                });
                continue;
            }
            component.component_graph.ensure_node(&edge.from, |_| ());
            component.component_graph.ensure_node(&edge.to, |_| ());
            match component.component_graph.add_edge(
                edge.from.clone(),
                edge.to.clone(),
                edge.key.clone(),
                (),
            ) {
                Ok(()) => component.edges.push(edge.clone()),
                Err(err) => {
                    component.error_set.insert(InvalidReason::InvalidComponentEdge {
                        message: format!("edge {} not added to {}: {err}", edge.key, component.name),
                        component: component.name.clone(),
                        edge: edge.key.clone(),
                    });
                }
            }
        }

        for (state, teqs) in states {
            let mut table: BTreeMap<String, Real> =
                component.edges.iter().map(|e| (e.key.clone(), 0.0)).collect();

            for (edge, teq) in teqs {
                if !table.contains_key(edge) {
                    component.error_set.insert(InvalidReason::InvalidComponentEdge {
                        message: format!("edge {} not found in {}'s edge list", edge, component.name),
                        component: component.name.clone(),
                        edge: edge.clone(),
                    });
                    continue;
                }
                let fc = match teq_to_fc(teq) {
                    Ok(fc) => fc,
                    Err(err) => {
                        component.error_set.insert(InvalidReason::InvalidTeq {
                            message: format!(
                                "{} (component {}, state {}, edge {})",
                                err, component.name, state, edge
                            ),
                            component: component.name.clone(),
                            state: state.clone(),
                            edge: edge.clone(),
                            teq: teq.to_string(),
                        });
                        err.clamped_fc()
                    }
                };
                table.insert(edge.clone(), fc);
            }
            component.states.insert(state.clone(), table);
        }

        component
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local graph of the component.
    pub fn component_graph(&self) -> &MultiGraph<(), ()> {
        &self.component_graph
    }

    pub fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }

    pub fn edge(&self, key: &str) -> Option<&EdgeKey> {
        self.edges.iter().find(|e| e.key == key)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.states.contains_key(state)
    }

    /// `local edge key -> FC` for one state.
    pub fn state_fcs(&self, state: &str) -> Option<&BTreeMap<String, Real>> {
        self.states.get(state)
    }

    pub fn fc(&self, state: &str, edge: &str) -> Option<Real> {
        self.states.get(state)?.get(edge).copied()
    }

    pub fn teq(&self, state: &str, edge: &str) -> Option<Teq> {
        self.fc(state, edge).map(fc_to_teq)
    }

    pub fn current_state(&self) -> Option<&str> {
        self.current_state.as_deref()
    }

    pub fn errors(&self) -> &ErrorSet {
        &self.error_set
    }

    pub fn is_valid(&self) -> bool {
        self.error_set.is_empty()
    }

    /// Fastest transition that is neither closed nor fully open.
    pub fn max_finite_fc(&self) -> Option<Real> {
        self.states
            .values()
            .flat_map(|table| table.values().copied())
            .filter(|&fc| fc > 0.0 && fc < FC_MAX)
            .reduce(Real::max)
    }

    pub(crate) fn set_current_state(&mut self, state: &str) {
        self.current_state = Some(state.to_string());
    }

    pub(crate) fn set_fc(&mut self, state: &str, edge: &str, fc: Real) {
        if let Some(slot) = self
            .states
            .get_mut(state)
            .and_then(|table| table.get_mut(edge))
        {
            *slot = fc;
        }
    }

    /// Swap the conductances of a two-edge component in every state.
    pub(crate) fn swap_orientation(&mut self) {
        let [a, b] = match self.edges.as_slice() {
            [a, b] => [a.key.clone(), b.key.clone()],
            _ => return,
        };
        for table in self.states.values_mut() {
            let fa = table.get(&a).copied().unwrap_or(0.0);
            let fb = table.get(&b).copied().unwrap_or(0.0);
            table.insert(a.clone(), fb);
            table.insert(b.clone(), fa);
        }
    }
}
