//! The plumbing engine: global graph composition, mutation and queries.
//!
//! Components are copied in and placed into one directed multigraph through a
//! per-component `local node -> global node` mapping. Edge keys on the global
//! graph are namespaced as `"<component>.<local key>"`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_core::{
    ErrorSet, InvalidReason, MIN_TIME_RESOLUTION, MICROS_PER_SEC, Micros, Real,
    TEQ_TO_FC_FACTOR, Teq, ensure_non_negative, teq_to_fc,
};
use ts_graph::{EdgeKey, MultiGraph, PressureNode};

use crate::component::{PlumbingComponent, StateTeqs};
use crate::config::SolverConfig;
use crate::error::{EngineError, EngineResult};

/// `local node -> global node` for one component.
pub type NodeMapping = BTreeMap<String, String>;
/// Node mappings of every component, by component name.
pub type ComponentMappings = BTreeMap<String, NodeMapping>;
/// Initial node pressures by global node name.
pub type InitialPressures = BTreeMap<String, NodePressure>;
/// Initial state name by component name.
pub type InitialStates = BTreeMap<String, String>;
/// Node pressures by global node name.
pub type Pressures = BTreeMap<String, Real>;

/// Pressure assignment for one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePressure {
    pub pressure: Real,
    #[serde(default)]
    pub fixed: bool,
}

impl From<Real> for NodePressure {
    fn from(pressure: Real) -> Self {
        Self {
            pressure,
            fixed: false,
        }
    }
}

impl From<(Real, bool)> for NodePressure {
    fn from((pressure, fixed): (Real, bool)) -> Self {
        Self { pressure, fixed }
    }
}

/// Simulation state as seen by conditions and hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: Micros,
    pub pressures: Pressures,
}

/// The simulation core.
#[derive(Debug, Clone)]
pub struct PlumbingEngine {
    pub(crate) config: SolverConfig,
    component_dict: BTreeMap<String, PlumbingComponent>,
    mapping: ComponentMappings,
    pub(crate) plumbing_graph: MultiGraph<PressureNode, Real>,
    pub(crate) time: Micros,
    time_resolution: Micros,
    error_set: ErrorSet,
}

pub(crate) fn global_key(component: &str, local_key: &str) -> String {
    format!("{component}.{local_key}")
}

impl Default for PlumbingEngine {
    fn default() -> Self {
        Self::empty(SolverConfig::default())
    }
}

impl PlumbingEngine {
    /// Empty engine with default solver settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty engine with custom solver settings.
    pub fn with_config(config: SolverConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self::empty(config))
    }

    fn empty(config: SolverConfig) -> Self {
        Self {
            time_resolution: config.default_time_resolution,
            config,
            component_dict: BTreeMap::new(),
            mapping: ComponentMappings::new(),
            plumbing_graph: MultiGraph::new(),
            time: 0,
            error_set: ErrorSet::new(),
        }
    }

    /// Engine loaded from the given network description.
    pub fn load(
        components: &[PlumbingComponent],
        mapping: &ComponentMappings,
        initial_pressures: &InitialPressures,
        initial_states: &InitialStates,
    ) -> Self {
        let mut engine = Self::new();
        engine.load_graph(components, mapping, initial_pressures, initial_states);
        engine
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Replace the whole engine state with the given network.
    ///
    /// Never fails; problems end up in [`errors`](Self::errors) and make the
    /// engine invalid until fixed.
    pub fn load_graph(
        &mut self,
        components: &[PlumbingComponent],
        mapping: &ComponentMappings,
        initial_pressures: &InitialPressures,
        initial_states: &InitialStates,
    ) {
        self.plumbing_graph.clear();
        self.error_set.clear();
        self.component_dict.clear();
        self.mapping = mapping.clone();
        self.time = 0;

        for component in components {
            if self.component_dict.contains_key(component.name()) {
                self.record(InvalidReason::InvalidComponentName {
                    message: format!("component {} is listed more than once", component.name()),
                    component: component.name().to_string(),
                });
                continue;
            }
            self.error_set.extend(component.errors().iter().cloned());

            let Some(node_map) = self.mapping.get(component.name()).cloned() else {
                self.record(InvalidReason::InvalidComponentName {
                    message: format!("component {} not found in mapping", component.name()),
                    component: component.name().to_string(),
                });
                continue;
            };
            self.insert_component_edges(component, &node_map);
            self.component_dict
                .insert(component.name().to_string(), component.clone());
        }

        for (node, pressure) in initial_pressures {
            self.apply_node_pressure(node, *pressure);
        }

        let names: Vec<String> = self.component_dict.keys().cloned().collect();
        for name in names {
            match initial_states.get(&name) {
                None => self.record(InvalidReason::InvalidComponentName {
                    message: format!("component {name} has no initial state"),
                    component: name.clone(),
                }),
                Some(state) => {
                    if self.set_component_state(&name, state).is_err() {
                        self.record(InvalidReason::InvalidStateName {
                            message: format!("state {state} not found in component {name}"),
                            component: name.clone(),
                            state: state.clone(),
                        });
                    }
                }
            }
        }

        self.recompute_time_resolution();
        debug!(
            components = self.component_dict.len(),
            nodes = self.plumbing_graph.node_count(),
            edges = self.plumbing_graph.edge_count(),
            errors = self.error_set.len(),
            time_resolution = self.time_resolution,
            "plumbing graph loaded"
        );
    }

    /// Switch a component to another state and rewrite its edges' FC.
    pub fn set_component_state(&mut self, name: &str, state: &str) -> EngineResult<()> {
        let node_map = self
            .mapping
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::bad_input(format!("component {name} not found")))?;
        let component = self
            .component_dict
            .get_mut(name)
            .ok_or_else(|| EngineError::bad_input(format!("component {name} not found")))?;
        let fcs = component.state_fcs(state).cloned().ok_or_else(|| {
            EngineError::bad_input(format!("state {state} not found in component {name}"))
        })?;
        component.set_current_state(state);
        let edges = component.edges().to_vec();

        for edge in edges {
            let Some(key) = self.translate_edge(name, &node_map, &edge) else {
                continue;
            };
            if let Some(weight) = self.plumbing_graph.edge_weight_mut(&key) {
                *weight = fcs.get(&edge.key).copied().unwrap_or(0.0);
            }
        }
        Ok(())
    }

    /// Merge one more component into the running network.
    pub fn add_component(
        &mut self,
        component: &PlumbingComponent,
        mapping: &NodeMapping,
        state: &str,
        pressures: &InitialPressures,
    ) -> EngineResult<()> {
        let name = component.name();
        if self.component_dict.contains_key(name) {
            return Err(EngineError::bad_input(format!(
                "component {name} is already loaded"
            )));
        }
        if !component.has_state(state) {
            return Err(EngineError::bad_input(format!(
                "state {state} not found in component {name}"
            )));
        }

        self.error_set.extend(component.errors().iter().cloned());
        self.mapping.insert(name.to_string(), mapping.clone());
        self.insert_component_edges(component, mapping);
        self.component_dict
            .insert(name.to_string(), component.clone());
        self.set_component_state(name, state)?;

        for (node, pressure) in pressures {
            self.apply_node_pressure(node, *pressure);
        }
        self.recompute_time_resolution();
        debug!(component = name, "component added");
        Ok(())
    }

    /// Take a component out of the network along with its edges, any node
    /// left without edges, and every error it was responsible for.
    pub fn remove_component(&mut self, name: &str) -> EngineResult<()> {
        if self.component_dict.remove(name).is_none() {
            return Err(EngineError::bad_input(format!("component {name} not found")));
        }
        let node_map = self.mapping.remove(name).unwrap_or_default();

        let prefix = global_key(name, "");
        let removed = self
            .plumbing_graph
            .remove_edges_where(|key| key.key.starts_with(&prefix));

        let touched: BTreeSet<String> = removed
            .iter()
            .flat_map(|e| [e.key.from.clone(), e.key.to.clone()])
            .collect();
        for node in touched {
            if self.plumbing_graph.degree(&node) == 0 {
                self.plumbing_graph.remove_node(&node)?;
            }
        }

        let mapped: BTreeSet<&String> = node_map.values().collect();
        let purged = self.error_set.purge(|reason| {
            reason.component() == Some(name)
                || matches!(
                    reason.root(),
                    InvalidReason::InvalidNodePressure { node, .. } if mapped.contains(node)
                )
        });

        self.recompute_time_resolution();
        debug!(
            component = name,
            edges = removed.len(),
            purged,
            "component removed"
        );
        Ok(())
    }

    /// Set the pressure of a non-atmosphere node, keeping its fixed flag.
    pub fn set_pressure(&mut self, node: &str, value: Real) -> EngineResult<()> {
        let value = ensure_non_negative(value, "pressure")?;
        let target = self
            .plumbing_graph
            .node_mut(node)
            .ok_or_else(|| EngineError::bad_input(format!("node {node} not found")))?;
        if !target.update_pressure(value) {
            return Err(EngineError::bad_input(format!(
                "pressure of atmosphere node {node} cannot be set"
            )));
        }
        Ok(())
    }

    /// Pin or release a node's pressure during stepping.
    pub fn set_fixed(&mut self, node: &str, fixed: bool) -> EngineResult<()> {
        let target = self
            .plumbing_graph
            .node_mut(node)
            .ok_or_else(|| EngineError::bad_input(format!("node {node} not found")))?;
        if !target.set_fixed(fixed) {
            return Err(EngineError::bad_input(format!(
                "atmosphere node {node} is always fixed"
            )));
        }
        Ok(())
    }

    /// Change stored teqs of a component. Nothing is written unless every
    /// entry is valid.
    pub fn set_teq(&mut self, name: &str, changes: &StateTeqs) -> EngineResult<()> {
        let component = self
            .component_dict
            .get(name)
            .ok_or_else(|| EngineError::bad_input(format!("component {name} not found")))?;

        let mut updates = Vec::new();
        for (state, edges) in changes {
            if !component.has_state(state) {
                return Err(EngineError::bad_input(format!(
                    "state {state} not found in component {name}"
                )));
            }
            for (edge, teq) in edges {
                if component.edge(edge).is_none() {
                    return Err(EngineError::bad_input(format!(
                        "edge {edge} not found in component {name}"
                    )));
                }
                let fc = teq_to_fc(teq).map_err(|e| {
                    EngineError::bad_input(format!("{e} (component {name}, state {state})"))
                })?;
                updates.push((state.as_str(), edge.as_str(), fc));
            }
        }

        let Some(component) = self.component_dict.get_mut(name) else {
            return Ok(());
        };
        for (state, edge, fc) in updates {
            component.set_fc(state, edge, fc);
        }
        let current = component.current_state().map(str::to_string);
        if let Some(current) = current {
            if changes.contains_key(&current) {
                self.set_component_state(name, &current)?;
            }
        }
        self.recompute_time_resolution();
        Ok(())
    }

    /// Swap the flow direction of a two-edge component.
    pub fn reverse_orientation(&mut self, name: &str) -> EngineResult<()> {
        let component = self
            .component_dict
            .get_mut(name)
            .ok_or_else(|| EngineError::bad_input(format!("component {name} not found")))?;
        if component.edge_count() != 2 {
            return Err(EngineError::BadOrientation {
                what: format!(
                    "component {name} has {} edges, expected 2",
                    component.edge_count()
                ),
            });
        }
        component.swap_orientation();
        let current = component.current_state().map(str::to_string);
        if let Some(current) = current {
            self.set_component_state(name, &current)?;
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.error_set.is_empty()
    }

    pub fn errors(&self) -> &ErrorSet {
        &self.error_set
    }

    pub fn is_empty(&self) -> bool {
        self.plumbing_graph.is_empty()
    }

    pub fn time(&self) -> Micros {
        self.time
    }

    pub fn time_resolution(&self) -> Micros {
        self.time_resolution
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &PressureNode)> {
        self.plumbing_graph.nodes()
    }

    /// Directed edges with their current FC.
    pub fn edges(&self) -> impl Iterator<Item = (&EdgeKey, Real)> {
        self.plumbing_graph.edges().map(|e| (&e.key, e.weight))
    }

    pub fn edge_teq(&self, key: &EdgeKey) -> Option<Teq> {
        self.plumbing_graph
            .edge_weight(key)
            .map(|&fc| ts_core::fc_to_teq(fc))
    }

    pub fn components(&self) -> impl Iterator<Item = &PlumbingComponent> {
        self.component_dict.values()
    }

    pub fn component(&self, name: &str) -> Option<&PlumbingComponent> {
        self.component_dict.get(name)
    }

    pub fn mapping(&self, name: &str) -> Option<&NodeMapping> {
        self.mapping.get(name)
    }

    pub fn current_state(&self, name: &str) -> Option<&str> {
        self.component_dict.get(name)?.current_state()
    }

    pub fn current_states(&self) -> BTreeMap<&str, &str> {
        self.component_dict
            .iter()
            .filter_map(|(name, c)| Some((name.as_str(), c.current_state()?)))
            .collect()
    }

    pub fn pressure(&self, node: &str) -> EngineResult<Real> {
        self.plumbing_graph
            .node(node)
            .map(PressureNode::pressure)
            .ok_or_else(|| EngineError::bad_input(format!("node {node} not found")))
    }

    pub fn current_pressures(&self) -> Pressures {
        self.plumbing_graph
            .nodes()
            .map(|(name, node)| (name.to_string(), node.pressure()))
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.time,
            pressures: self.current_pressures(),
        }
    }

    fn record(&mut self, reason: InvalidReason) {
        warn!(%reason, "plumbing engine marked invalid");
        self.error_set.insert(reason);
    }

    /// Global key of a component edge, or `None` (recorded) if an endpoint
    /// is not in the mapping.
    fn translate_edge(
        &mut self,
        component: &str,
        node_map: &NodeMapping,
        edge: &EdgeKey,
    ) -> Option<EdgeKey> {
        let mut ends = Vec::with_capacity(2);
        for local in [&edge.from, &edge.to] {
            match node_map.get(local) {
                Some(global) => ends.push(global.clone()),
                None => self.record(InvalidReason::InvalidComponentNode {
                    message: format!("node {local} of component {component} not found in mapping"),
                    component: component.to_string(),
                    node: local.clone(),
                }),
            }
        }
        match ends.as_slice() {
            [from, to] => Some(EdgeKey::new(
                from.clone(),
                to.clone(),
                global_key(component, &edge.key),
            )),
            _ => None,
        }
    }

    fn insert_component_edges(&mut self, component: &PlumbingComponent, node_map: &NodeMapping) {
        for edge in component.edges() {
            let Some(key) = self.translate_edge(component.name(), node_map, edge) else {
                continue;
            };
            self.plumbing_graph
                .ensure_node(&key.from, PressureNode::for_name);
            self.plumbing_graph.ensure_node(&key.to, PressureNode::for_name);
            if let Err(err) = self
                .plumbing_graph
                .add_edge(key.from, key.to, key.key, 0.0)
            {
                self.record(InvalidReason::InvalidComponentEdge {
                    message: format!("edge {} of {} not inserted: {err}", edge.key, component.name()),
                    component: component.name().to_string(),
                    edge: edge.key.clone(),
                });
            }
        }
    }

    fn apply_node_pressure(&mut self, node: &str, value: NodePressure) {
        let problem = match self.plumbing_graph.node_mut(node) {
            None => Some(format!("node {node} not found in graph")),
            Some(target) if target.is_atmosphere() => {
                Some(format!("pressure of atmosphere node {node} cannot be set"))
            }
            Some(_) if !(value.pressure.is_finite() && value.pressure >= 0.0) => Some(format!(
                "pressure {} of node {node} is not a non-negative number",
                value.pressure
            )),
            Some(target) => {
                target.update_pressure(value.pressure);
                target.set_fixed(value.fixed);
                None
            }
        };
        if let Some(message) = problem {
            self.record(InvalidReason::InvalidNodePressure {
                message,
                node: node.to_string(),
            });
        }
    }

    /// Step size that resolves the fastest finite transition of any loaded
    /// component; fully open edges are left out so they do not force tiny steps.
    fn recompute_time_resolution(&mut self) {
        let fastest = self
            .component_dict
            .values()
            .filter_map(PlumbingComponent::max_finite_fc)
            .reduce(Real::max);

        self.time_resolution = match fastest {
            Some(fc) => {
                let secs = TEQ_TO_FC_FACTOR / (fc * self.config.time_resolution_scale);
                let micros = (secs * MICROS_PER_SEC as Real).floor();
                let max = self.config.max_time_resolution;
                if micros >= max as Real {
                    max
                } else {
                    (micros as Micros).max(MIN_TIME_RESOLUTION)
                }
            }
            None => self.config.default_time_resolution,
        };
    }
}
