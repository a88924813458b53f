//! Turning a parsed project into live engines.

use tracing::{debug, warn};
use ts_graph::EdgeKey;
use ts_plumbing::{PlumbingComponent, PlumbingEngine};
use ts_procedures::{Procedure, ProcedureStep, ProcedureSuite, Transition};

use crate::ProjectResult;
use crate::schema::{ComponentDef, ProcedureDef, ProjectFile};

pub fn build_component(def: &ComponentDef) -> PlumbingComponent {
    let edges: Vec<EdgeKey> = def
        .edges
        .iter()
        .map(|e| EdgeKey::new(e.from.as_str(), e.to.as_str(), e.key.as_str()))
        .collect();
    PlumbingComponent::new(def.name.as_str(), &def.states, &edges)
}

/// Load the project's network into a fresh plumbing engine.
///
/// The engine may come back invalid; check [`PlumbingEngine::errors`].
pub fn build_engine(project: &ProjectFile) -> ProjectResult<PlumbingEngine> {
    let components: Vec<PlumbingComponent> =
        project.components.iter().map(build_component).collect();
    let mut engine = PlumbingEngine::with_config(project.solver.clone().unwrap_or_default())?;
    engine.load_graph(
        &components,
        &project.mapping,
        &project.initial_pressures,
        &project.initial_states,
    );
    if !engine.is_valid() {
        warn!(
            project = project.name.as_str(),
            errors = engine.errors().len(),
            "engine built with errors"
        );
    }
    Ok(engine)
}

/// Build the project's procedure suite, if it has one.
pub fn build_suite(project: &ProjectFile) -> ProjectResult<Option<ProcedureSuite>> {
    let Some(suite) = &project.suite else {
        return Ok(None);
    };
    let procedures = suite
        .procedures
        .iter()
        .map(build_procedure)
        .collect::<ProjectResult<Vec<_>>>()?;
    let suite = ProcedureSuite::new(procedures, suite.start.as_str())?;
    debug!(start = suite.starting_procedure_id(), "suite built");
    Ok(Some(suite))
}

fn build_procedure(def: &ProcedureDef) -> ProjectResult<Procedure> {
    let steps = def
        .steps
        .iter()
        .map(|step| ProcedureStep {
            step_id: step.id.clone(),
            action: step.action.clone(),
            conditions: step
                .guards
                .iter()
                .map(|guard| {
                    let procedure = guard.procedure.as_deref().unwrap_or(&def.id);
                    (
                        guard.when.clone(),
                        Transition::new(procedure, guard.step.as_str()),
                    )
                })
                .collect(),
            operator: step.operator.clone(),
        })
        .collect();
    Ok(Procedure::new(def.id.as_str(), steps)?)
}
