//! Procedure automation for topside.
//!
//! A procedure suite is a set of named checklists. Each step performs one
//! action (usually switching a component's state on the bound plumbing
//! engine) and then waits until one of its conditions holds, which selects the
//! next step to run. The engine keeps a persistent stack of checkpoints so a
//! host can rewind to the last decision point.
//!
//! # Architecture
//!
//! - Conditions are live predicates over [`ts_plumbing::Snapshot`]s
//! - Suites are immutable once built; the engine keeps its own copies of the
//!   current step's conditions
//! - Checkpoints own deep copies of the plumbing engine

pub mod checkpoint;
pub mod condition;
pub mod engine;
pub mod error;
pub mod procedure;

pub use checkpoint::{Checkpoint, CheckpointStack};
pub use condition::{Comparator, Comparison, Condition, Evaluate, WaitFor, WaitUntil};
pub use engine::{ProceduresEngine, StepPosition};
pub use error::{ProcedureError, ProcedureResult};
pub use procedure::{Action, Procedure, ProcedureStep, ProcedureSuite, Transition};
