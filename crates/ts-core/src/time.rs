//! Simulation clock helpers.
//!
//! The engine keeps time as an integer count of microseconds so that repeated
//! stepping never accumulates floating point drift.

use crate::{CoreError, CoreResult, Real};

/// Simulation time or duration in microseconds.
pub type Micros = u64;

pub const MICROS_PER_SEC: Micros = 1_000_000;

/// Smallest timestep the engine accepts.
pub const MIN_TIME_RESOLUTION: Micros = 1;

pub fn secs_from_micros(t: Micros) -> Real {
    t as Real / MICROS_PER_SEC as Real
}

/// Convert seconds to microseconds, rejecting values that do not land on a
/// whole microsecond (within 1e-6 µs).
pub fn micros_from_secs(secs: Real, what: &'static str) -> CoreResult<Micros> {
    let secs = crate::ensure_non_negative(secs, what)?;
    let micros = secs * MICROS_PER_SEC as Real;
    let rounded = micros.round();
    if (micros - rounded).abs() > 1e-6 {
        return Err(CoreError::NotIntegral { what, value: micros });
    }
    Ok(rounded as Micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_round_trip() {
        assert_eq!(micros_from_secs(1.0, "t").unwrap(), 1_000_000);
        assert_eq!(micros_from_secs(0.25, "t").unwrap(), 250_000);
        assert_eq!(secs_from_micros(1_500_000), 1.5);
    }

    #[test]
    fn fractional_microseconds_rejected() {
        let err = micros_from_secs(1.5e-7, "dt").unwrap_err();
        assert!(matches!(err, CoreError::NotIntegral { what: "dt", .. }));
    }

    #[test]
    fn negative_seconds_rejected() {
        assert!(micros_from_secs(-1.0, "dt").is_err());
    }
}
