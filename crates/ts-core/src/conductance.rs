//! Conversion between the user-facing time-equivalent (`teq`) and the
//! internal flow coefficient (`FC`).
//!
//! `teq` is the number of seconds a connection needs to bring two equal
//! volumes close to equilibrium. `FC = TEQ_TO_FC_FACTOR / teq`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::Real;

/// Keyword marking a connection as closed.
pub const CLOSED: &str = "closed";

/// `FC * teq`. After `teq` seconds the remaining imbalance is e^-4.5 (about 1%).
pub const TEQ_TO_FC_FACTOR: Real = 4.5;

/// Smallest nonzero teq (seconds) the solver can resolve.
pub const TEQ_MIN: Real = 1e-4;

/// Flow coefficient of a fully open connection.
pub const FC_MAX: Real = TEQ_TO_FC_FACTOR / TEQ_MIN;

/// A time-equivalent as supplied by a component definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Teq {
    Seconds(Real),
    Keyword(String),
}

impl Teq {
    pub fn closed() -> Self {
        Teq::Keyword(CLOSED.to_string())
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Teq::Keyword(k) if k == CLOSED)
    }
}

impl From<Real> for Teq {
    fn from(secs: Real) -> Self {
        Teq::Seconds(secs)
    }
}

impl fmt::Display for Teq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Teq::Seconds(s) => write!(f, "{s}"),
            Teq::Keyword(k) => write!(f, "{k}"),
        }
    }
}

/// Why a teq could not be converted exactly.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TeqError {
    #[error("teq value {teq} is not a non-negative number or 'closed'")]
    Invalid { teq: String },

    #[error("teq value {teq} s is below the minimum resolvable teq")]
    TooSmall { teq: Real },
}

impl TeqError {
    /// The FC a component falls back to after recording this error.
    pub fn clamped_fc(&self) -> Real {
        match self {
            TeqError::Invalid { .. } => 0.0,
            TeqError::TooSmall { .. } => FC_MAX,
        }
    }
}

pub fn teq_to_fc(teq: &Teq) -> Result<Real, TeqError> {
    match teq {
        Teq::Keyword(_) if teq.is_closed() => Ok(0.0),
        Teq::Keyword(k) => Err(TeqError::Invalid { teq: k.clone() }),
        Teq::Seconds(t) if !t.is_finite() || *t < 0.0 => Err(TeqError::Invalid {
            teq: t.to_string(),
        }),
        Teq::Seconds(t) if *t == 0.0 => Ok(FC_MAX),
        Teq::Seconds(t) if *t < TEQ_MIN => Err(TeqError::TooSmall { teq: *t }),
        Teq::Seconds(t) => Ok(TEQ_TO_FC_FACTOR / t),
    }
}

pub fn fc_to_teq(fc: Real) -> Teq {
    if fc <= 0.0 {
        Teq::closed()
    } else if fc >= FC_MAX {
        Teq::Seconds(0.0)
    } else {
        Teq::Seconds(TEQ_TO_FC_FACTOR / fc)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::{Tolerances, nearly_equal};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn teq_fc_round_trip(t in (TEQ_MIN * 1.001)..1.0e4_f64) {
            let fc = teq_to_fc(&Teq::Seconds(t)).unwrap();
            prop_assert!(fc > 0.0 && fc < FC_MAX);
            match fc_to_teq(fc) {
                Teq::Seconds(back) => {
                    let tol = Tolerances { abs: 1e-12, rel: 1e-9 };
                    prop_assert!(nearly_equal(back, t, tol));
                }
                other => prop_assert!(false, "unexpected teq {other:?}"),
            }
        }
    }
}
