//! Project schema definitions.

use serde::{Deserialize, Serialize};
use ts_plumbing::{ComponentMappings, InitialPressures, InitialStates, SolverConfig, StateTeqs};
use ts_procedures::{Action, Condition};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverConfig>,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    /// `component -> local node -> global node`
    #[serde(default)]
    pub mapping: ComponentMappings,
    #[serde(default)]
    pub initial_pressures: InitialPressures,
    #[serde(default)]
    pub initial_states: InitialStates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite: Option<SuiteDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDef {
    pub name: String,
    pub edges: Vec<EdgeDef>,
    /// `state -> edge key -> teq`
    pub states: StateTeqs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeDef {
    pub from: String,
    pub to: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuiteDef {
    pub start: String,
    pub procedures: Vec<ProcedureDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcedureDef {
    pub id: String,
    pub steps: Vec<StepDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepDef {
    pub id: String,
    pub action: Action,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub guards: Vec<GuardDef>,
}

/// One `condition -> target` pair. `procedure` defaults to the enclosing one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuardDef {
    pub when: Condition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure: Option<String>,
    pub step: String,
}

