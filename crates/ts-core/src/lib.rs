//! ts-core: stable foundation for the topside plumbing engine.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - time (integer microsecond clock helpers)
//! - conductance (teq <-> flow coefficient conversion)
//! - invalid (structural validity reasons + deduplicating error set)
//! - error (shared error types)

pub mod conductance;
pub mod error;
pub mod invalid;
pub mod numeric;
pub mod time;

// Re-exports: nice ergonomics for downstream crates
pub use conductance::*;
pub use error::{CoreError, CoreResult};
pub use invalid::{ErrorSet, InvalidReason};
pub use numeric::*;
pub use time::*;
