//! Procedure suite data model.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::{ProcedureError, ProcedureResult};

/// What a step does when executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Switch a component of the bound plumbing engine to another state.
    StateChange { component: String, state: String },
    /// Anything the simulation does not model (e.g. "call the range").
    Misc { action_type: String },
}

/// Target of a satisfied condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub procedure: String,
    pub step: String,
}

impl Transition {
    pub fn new(procedure: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            procedure: procedure.into(),
            step: step.into(),
        }
    }
}

/// One checklist entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureStep {
    pub step_id: String,
    pub action: Action,
    /// Guards in priority order; the first satisfied one is taken.
    pub conditions: Vec<(Condition, Transition)>,
    /// Who performs the step.
    pub operator: String,
}

/// An ordered list of steps with id lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    id: String,
    steps: Vec<ProcedureStep>,
    index: HashMap<String, usize>,
}

impl Procedure {
    pub fn new(id: impl Into<String>, steps: Vec<ProcedureStep>) -> ProcedureResult<Self> {
        let id = id.into();
        if steps.is_empty() {
            return Err(ProcedureError::InvalidSuite {
                what: format!("procedure {id} has no steps"),
            });
        }
        let mut index = HashMap::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            if index.insert(step.step_id.clone(), i).is_some() {
                return Err(ProcedureError::InvalidSuite {
                    what: format!("procedure {id} repeats step id {}", step.step_id),
                });
            }
        }
        Ok(Self { id, steps, index })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn steps(&self) -> &[ProcedureStep] {
        &self.steps
    }

    pub fn first_step(&self) -> &ProcedureStep {
        &self.steps[0]
    }

    pub fn index_of(&self, step_id: &str) -> Option<usize> {
        self.index.get(step_id).copied()
    }

    pub fn step(&self, step_id: &str) -> Option<&ProcedureStep> {
        self.index_of(step_id).map(|i| &self.steps[i])
    }
}

/// A set of procedures and the one to start in.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureSuite {
    procedures: BTreeMap<String, Procedure>,
    starting_procedure_id: String,
}

impl ProcedureSuite {
    /// Build a suite, checking that the starting procedure and every
    /// transition target exist.
    pub fn new(
        procedures: Vec<Procedure>,
        starting_procedure_id: impl Into<String>,
    ) -> ProcedureResult<Self> {
        let starting_procedure_id = starting_procedure_id.into();
        let mut by_id = BTreeMap::new();
        for procedure in procedures {
            let id = procedure.id().to_string();
            if by_id.insert(id.clone(), procedure).is_some() {
                return Err(ProcedureError::InvalidSuite {
                    what: format!("procedure id {id} is used twice"),
                });
            }
        }
        if !by_id.contains_key(&starting_procedure_id) {
            return Err(ProcedureError::InvalidSuite {
                what: format!("starting procedure {starting_procedure_id} not found"),
            });
        }

        for procedure in by_id.values() {
            for step in procedure.steps() {
                for (_, transition) in &step.conditions {
                    let target = by_id.get(&transition.procedure);
                    if target.and_then(|p| p.step(&transition.step)).is_none() {
                        return Err(ProcedureError::InvalidSuite {
                            what: format!(
                                "step {} of {} transitions to missing {}.{}",
                                step.step_id,
                                procedure.id(),
                                transition.procedure,
                                transition.step
                            ),
                        });
                    }
                }
            }
        }

        Ok(Self {
            procedures: by_id,
            starting_procedure_id,
        })
    }

    pub fn starting_procedure_id(&self) -> &str {
        &self.starting_procedure_id
    }

    pub fn procedure(&self, id: &str) -> Option<&Procedure> {
        self.procedures.get(id)
    }

    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.procedures.values()
    }

    pub fn starting_procedure(&self) -> &Procedure {
        &self.procedures[&self.starting_procedure_id]
    }
}
