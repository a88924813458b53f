//! Structural checks that do not need a built engine.
//!
//! Problems inside the network itself (bad teqs, unmapped nodes, unknown
//! initial states) are left to the plumbing engine, which records them rather
//! than refusing to load.

use std::collections::HashSet;

use crate::schema::{ProjectFile, SuiteDef};
use ts_procedures::Action;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} ({reason})")]
    InvalidValue { field: String, reason: String },
}

pub fn validate_project(project: &ProjectFile) -> Result<(), ValidationError> {
    if let Some(solver) = &project.solver {
        solver
            .validate()
            .map_err(|e| ValidationError::InvalidValue {
                field: "solver".to_string(),
                reason: e.to_string(),
            })?;
    }

    let mut component_names = HashSet::new();
    for component in &project.components {
        if !component_names.insert(component.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: component.name.clone(),
                context: "components".to_string(),
            });
        }
        let mut keys = HashSet::new();
        for edge in &component.edges {
            if !keys.insert(edge.key.as_str()) {
                return Err(ValidationError::DuplicateId {
                    id: edge.key.clone(),
                    context: format!("component '{}' edges", component.name),
                });
            }
        }
    }

    for name in project.mapping.keys() {
        if !component_names.contains(name.as_str()) {
            return Err(ValidationError::MissingReference {
                id: name.clone(),
                context: "mapping".to_string(),
            });
        }
    }
    for name in project.initial_states.keys() {
        if !component_names.contains(name.as_str()) {
            return Err(ValidationError::MissingReference {
                id: name.clone(),
                context: "initial_states".to_string(),
            });
        }
    }

    if let Some(suite) = &project.suite {
        validate_suite(suite, &component_names)?;
    }
    Ok(())
}

fn validate_suite(suite: &SuiteDef, components: &HashSet<&str>) -> Result<(), ValidationError> {
    let mut procedure_ids = HashSet::new();
    for procedure in &suite.procedures {
        if !procedure_ids.insert(procedure.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: procedure.id.clone(),
                context: "suite procedures".to_string(),
            });
        }
    }
    if !procedure_ids.contains(suite.start.as_str()) {
        return Err(ValidationError::MissingReference {
            id: suite.start.clone(),
            context: "suite start".to_string(),
        });
    }

    for procedure in &suite.procedures {
        if procedure.steps.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("procedure '{}'", procedure.id),
                reason: "has no steps".to_string(),
            });
        }
        for step in &procedure.steps {
            if let Action::StateChange { component, .. } = &step.action {
                if !components.contains(component.as_str()) {
                    return Err(ValidationError::MissingReference {
                        id: component.clone(),
                        context: format!("step '{}.{}' action", procedure.id, step.id),
                    });
                }
            }
        }
    }
    Ok(())
}
