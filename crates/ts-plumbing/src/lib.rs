//! Plumbing network simulation for topside.
//!
//! Provides:
//! - Reusable component templates with per-state conductance tables
//! - The plumbing engine: global graph composition, mutation and validity tracking
//! - Explicit, conductance-weighted time stepping with steady-state detection

pub mod component;
pub mod config;
pub mod engine;
pub mod error;
pub mod solve;

// Re-exports for public API
pub use component::{PlumbingComponent, StateTeqs};
pub use config::SolverConfig;
pub use engine::{
    ComponentMappings, InitialPressures, InitialStates, NodeMapping, NodePressure,
    PlumbingEngine, Pressures, Snapshot,
};
pub use error::{EngineError, EngineResult};
