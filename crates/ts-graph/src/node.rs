//! Pressure nodes.

use serde::{Deserialize, Serialize};
use ts_core::Real;

/// Identity of the shared atmosphere node.
pub const ATM: &str = "atm";

/// A node of the plumbing graph.
///
/// The atmosphere always reads zero pressure and ignores every update, so the
/// solver can treat "is this node mutable" as a property of the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PressureNode {
    Generic { pressure: Real, fixed: bool },
    Atmosphere,
}

impl PressureNode {
    pub fn generic(pressure: Real) -> Self {
        PressureNode::Generic {
            pressure,
            fixed: false,
        }
    }

    /// Default node for a graph identity: the atmosphere for [`ATM`],
    /// otherwise a free node at zero pressure.
    pub fn for_name(name: &str) -> Self {
        if name == ATM {
            PressureNode::Atmosphere
        } else {
            PressureNode::generic(0.0)
        }
    }

    pub fn pressure(&self) -> Real {
        match self {
            PressureNode::Generic { pressure, .. } => *pressure,
            PressureNode::Atmosphere => 0.0,
        }
    }

    /// Set the pressure. Returns `false` (and does nothing) for the atmosphere.
    pub fn update_pressure(&mut self, value: Real) -> bool {
        match self {
            PressureNode::Generic { pressure, .. } => {
                *pressure = value;
                true
            }
            PressureNode::Atmosphere => false,
        }
    }

    /// Whether the solver must leave this node's pressure unchanged.
    pub fn is_fixed(&self) -> bool {
        match self {
            PressureNode::Generic { fixed, .. } => *fixed,
            PressureNode::Atmosphere => true,
        }
    }

    pub fn set_fixed(&mut self, value: bool) -> bool {
        match self {
            PressureNode::Generic { fixed, .. } => {
                *fixed = value;
                true
            }
            PressureNode::Atmosphere => false,
        }
    }

    pub fn is_atmosphere(&self) -> bool {
        matches!(self, PressureNode::Atmosphere)
    }
}
