//! Time stepping and steady-state solving.
//!
//! Every node is treated as an equal unit volume. A directed edge `a -> b`
//! with flow coefficient `FC` conducts only from `a` to `b`, at a rate of
//! `FC * (P_a - P_b)` while `P_a > P_b`. All rates are computed from the
//! pre-step pressures and applied to the mutable nodes in one batch.
//!
//! Explicit Euler on a stiff network would overshoot, so each edge moves at
//! most half of its pressure difference per step, and the total fraction any
//! mutable node exchanges per step is capped at one half. Every update is then
//! a convex combination of pre-step pressures: no oscillation, no negative
//! pressures, and a fully open edge between two nodes equalizes in one step.

use nalgebra::DVector;
use tracing::debug;
use ts_core::{MIN_TIME_RESOLUTION, Micros, Real, secs_from_micros};
use ts_graph::NodeIndex;

use crate::engine::{PlumbingEngine, Pressures, Snapshot};
use crate::error::{EngineError, EngineResult};

/// Largest fraction of its pressure a mutable node exchanges in one step.
const MAX_STEP_FRACTION: Real = 0.5;

impl PlumbingEngine {
    /// Advance the network by `dt` microseconds and return the new pressures.
    pub fn step(&mut self, dt: Micros) -> EngineResult<Pressures> {
        self.ensure_steppable()?;
        ensure_timestep(dt, "timestep")?;
        let index = NodeIndex::from_graph(&self.plumbing_graph);
        self.advance(&index, dt)?;
        Ok(self.current_pressures())
    }

    /// Step by the engine's time resolution until the network settles or
    /// `max_time` microseconds have elapsed, and return the final pressures.
    ///
    /// Running out of time is not an error; the last state is returned as is.
    pub fn solve(&mut self, max_time: Option<Micros>) -> EngineResult<Pressures> {
        self.ensure_steppable()?;
        let index = NodeIndex::from_graph(&self.plumbing_graph);
        let start = self.time;

        loop {
            let elapsed = self.time - start;
            let dt = match max_time {
                Some(max) if elapsed >= max => {
                    debug!(elapsed, "solve stopped at max_time before settling");
                    break;
                }
                Some(max) => self.time_resolution().min(max - elapsed),
                None => self.time_resolution(),
            };
            let rate = self.advance(&index, dt)?;
            if rate < self.config.convergence_eps {
                debug!(elapsed = self.time - start, "solve converged");
                break;
            }
        }
        Ok(self.current_pressures())
    }

    /// Like [`solve`](Self::solve) but records a snapshot every
    /// `return_resolution` microseconds. Never returns more than
    /// `max_time / return_resolution` samples.
    pub fn solve_sampled(
        &mut self,
        max_time: Option<Micros>,
        return_resolution: Micros,
    ) -> EngineResult<Vec<Snapshot>> {
        self.ensure_steppable()?;
        ensure_timestep(return_resolution, "return resolution")?;
        let index = NodeIndex::from_graph(&self.plumbing_graph);
        let start = self.time;
        let mut samples = Vec::new();

        loop {
            let elapsed = self.time - start;
            if let Some(max) = max_time {
                if elapsed + return_resolution > max {
                    debug!(elapsed, samples = samples.len(), "sampled solve hit max_time");
                    break;
                }
            }

            let before = self.pressure_vector(&index)?;
            let mut remaining = return_resolution;
            while remaining > 0 {
                let dt = self.time_resolution().min(remaining);
                self.advance(&index, dt)?;
                remaining -= dt;
            }
            let after = self.pressure_vector(&index)?;
            samples.push(self.snapshot());

            if max_rate(&before, &after, return_resolution) < self.config.convergence_eps {
                debug!(samples = samples.len(), "sampled solve converged");
                break;
            }
        }
        Ok(samples)
    }

    fn ensure_steppable(&self) -> EngineResult<()> {
        if self.is_empty() {
            return Err(EngineError::InvalidEngine {
                what: "engine has no nodes".to_string(),
            });
        }
        if !self.is_valid() {
            return Err(EngineError::InvalidEngine {
                what: format!("engine has {} unresolved errors", self.errors().len()),
            });
        }
        Ok(())
    }

    fn pressure_vector(&self, index: &NodeIndex) -> EngineResult<DVector<Real>> {
        let mut p = DVector::zeros(index.len());
        for (i, name) in index.names().iter().enumerate() {
            p[i] = self.pressure(name)?;
        }
        Ok(p)
    }

    /// One explicit step. Returns the largest per-second pressure change.
    fn advance(&mut self, index: &NodeIndex, dt: Micros) -> EngineResult<Real> {
        let next_time = self.time.checked_add(dt).ok_or_else(|| {
            EngineError::bad_input(format!("timestep of {dt} µs overflows the simulation clock"))
        })?;
        let dt_s = secs_from_micros(dt);
        let p0 = self.pressure_vector(index)?;

        let mutable: Vec<bool> = index
            .names()
            .iter()
            .map(|name| {
                self.plumbing_graph
                    .node(name)
                    .is_some_and(|node| !node.is_fixed())
            })
            .collect();

        // (from, to, fraction of the difference moved, pressure difference)
        let mut flows = Vec::new();
        let mut load = DVector::<Real>::zeros(index.len());
        for edge in self.plumbing_graph.edges() {
            if edge.weight <= 0.0 {
                continue;
            }
            let a = index.node_idx(&edge.key.from)?;
            let b = index.node_idx(&edge.key.to)?;
            let dp = p0[a] - p0[b];
            if dp <= 0.0 {
                continue;
            }
            let fraction = (edge.weight * dt_s).min(MAX_STEP_FRACTION);
            for end in [a, b] {
                if mutable[end] {
                    load[end] += fraction;
                }
            }
            flows.push((a, b, fraction, dp));
        }

        let mut delta = DVector::<Real>::zeros(index.len());
        for (a, b, fraction, dp) in flows {
            let mut scale: Real = 1.0;
            for end in [a, b] {
                if mutable[end] && load[end] > MAX_STEP_FRACTION {
                    scale = scale.min(MAX_STEP_FRACTION / load[end]);
                }
            }
            let moved = scale * fraction * dp;
            delta[a] -= moved;
            delta[b] += moved;
        }

        let p1 = &p0 + &delta;
        for (i, name) in index.names().iter().enumerate() {
            if !mutable[i] {
                continue;
            }
            if let Some(node) = self.plumbing_graph.node_mut(name) {
                node.update_pressure(p1[i]);
            }
        }
        self.time = next_time;

        let applied = DVector::from_iterator(
            index.len(),
            (0..index.len()).map(|i| if mutable[i] { delta[i] } else { 0.0 }),
        );
        Ok(applied.amax() / dt_s)
    }
}

fn ensure_timestep(dt: Micros, what: &str) -> EngineResult<()> {
    if dt < MIN_TIME_RESOLUTION {
        return Err(EngineError::bad_input(format!(
            "{what} of {dt} µs is below the minimum of {MIN_TIME_RESOLUTION} µs"
        )));
    }
    Ok(())
}

fn max_rate(before: &DVector<Real>, after: &DVector<Real>, dt: Micros) -> Real {
    (after - before).amax() / secs_from_micros(dt)
}
