//! ts-project: YAML network and procedure files.

pub mod build;
pub mod schema;
pub mod validate;

pub use build::{build_engine, build_suite};
pub use schema::*;
pub use validate::{ValidationError, validate_project};

use ts_plumbing::EngineError;
use ts_procedures::ProcedureError;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Procedure error: {0}")]
    Procedure(#[from] ProcedureError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Parse and validate a project from YAML text.
pub fn parse_project(content: &str) -> ProjectResult<ProjectFile> {
    let project: ProjectFile = serde_yaml::from_str(content)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn load_project(path: &std::path::Path) -> ProjectResult<ProjectFile> {
    let content = std::fs::read_to_string(path)?;
    let project = parse_project(&content)?;
    tracing::debug!(path = %path.display(), name = project.name.as_str(), "project loaded");
    Ok(project)
}

pub fn save_project(path: &std::path::Path, project: &ProjectFile) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_yaml::to_string(project)?;
    std::fs::write(path, content)?;
    Ok(())
}
