//! Solver tuning.

use serde::{Deserialize, Serialize};
use ts_core::{Micros, Real};

use crate::error::{EngineError, EngineResult};

/// Knobs for time-resolution selection and steady-state detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Largest per-second pressure change at which the network counts as settled.
    pub convergence_eps: Real,
    /// Number of steps the fastest finite teq is divided into.
    pub time_resolution_scale: Real,
    /// Step used when no component has a finite, non-fully-open transition (µs).
    pub default_time_resolution: Micros,
    /// Upper bound on the computed step (µs), for very slow networks.
    pub max_time_resolution: Micros,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            convergence_eps: 1e-3,
            time_resolution_scale: 20.0,
            default_time_resolution: 10_000,
            max_time_resolution: 1_000_000,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.convergence_eps.is_finite() && self.convergence_eps > 0.0) {
            return Err(EngineError::bad_input("convergence_eps must be positive"));
        }
        if !(self.time_resolution_scale.is_finite() && self.time_resolution_scale >= 1.0) {
            return Err(EngineError::bad_input(
                "time_resolution_scale must be at least 1",
            ));
        }
        if self.default_time_resolution < ts_core::MIN_TIME_RESOLUTION {
            return Err(EngineError::bad_input(
                "default_time_resolution must be at least 1 µs",
            ));
        }
        if self.max_time_resolution < self.default_time_resolution {
            return Err(EngineError::bad_input(
                "max_time_resolution must not be below default_time_resolution",
            ));
        }
        Ok(())
    }
}
