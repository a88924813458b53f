//! Structural validity reasons and the deduplicating set that stores them.
//!
//! A reason raised a second time is folded into a single
//! [`InvalidReason::DuplicateError`] wrapper, so the number of stored entries
//! tracks distinct root causes rather than how often each one fired.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One structural problem with a component or engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidReason {
    InvalidComponentName {
        message: String,
        component: String,
    },
    InvalidStateName {
        message: String,
        component: String,
        state: String,
    },
    InvalidComponentNode {
        message: String,
        component: String,
        node: String,
    },
    InvalidComponentEdge {
        message: String,
        component: String,
        edge: String,
    },
    InvalidNodePressure {
        message: String,
        node: String,
    },
    InvalidTeq {
        message: String,
        component: String,
        state: String,
        edge: String,
        teq: String,
    },
    DuplicateError {
        original: Box<InvalidReason>,
    },
}

impl InvalidReason {
    pub fn message(&self) -> &str {
        match self {
            InvalidReason::InvalidComponentName { message, .. }
            | InvalidReason::InvalidStateName { message, .. }
            | InvalidReason::InvalidComponentNode { message, .. }
            | InvalidReason::InvalidComponentEdge { message, .. }
            | InvalidReason::InvalidNodePressure { message, .. }
            | InvalidReason::InvalidTeq { message, .. } => message,
            InvalidReason::DuplicateError { original } => original.message(),
        }
    }

    /// Component the reason concerns, looking through duplicate wrappers.
    pub fn component(&self) -> Option<&str> {
        match self {
            InvalidReason::InvalidComponentName { component, .. }
            | InvalidReason::InvalidStateName { component, .. }
            | InvalidReason::InvalidComponentNode { component, .. }
            | InvalidReason::InvalidComponentEdge { component, .. }
            | InvalidReason::InvalidTeq { component, .. } => Some(component),
            InvalidReason::InvalidNodePressure { .. } => None,
            InvalidReason::DuplicateError { original } => original.component(),
        }
    }

    /// Node the reason concerns, looking through duplicate wrappers.
    pub fn node(&self) -> Option<&str> {
        match self {
            InvalidReason::InvalidComponentNode { node, .. }
            | InvalidReason::InvalidNodePressure { node, .. } => Some(node),
            InvalidReason::DuplicateError { original } => original.node(),
            _ => None,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, InvalidReason::DuplicateError { .. })
    }

    /// The wrapped reason for duplicates, `self` otherwise.
    pub fn root(&self) -> &InvalidReason {
        match self {
            InvalidReason::DuplicateError { original } => original.root(),
            other => other,
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::InvalidComponentName { message, .. } => {
                write!(f, "invalid component name: {message}")
            }
            InvalidReason::InvalidStateName { message, .. } => {
                write!(f, "invalid state name: {message}")
            }
            InvalidReason::InvalidComponentNode { message, .. } => {
                write!(f, "invalid component node: {message}")
            }
            InvalidReason::InvalidComponentEdge { message, .. } => {
                write!(f, "invalid component edge: {message}")
            }
            InvalidReason::InvalidNodePressure { message, .. } => {
                write!(f, "invalid node pressure: {message}")
            }
            InvalidReason::InvalidTeq { message, .. } => write!(f, "invalid teq: {message}"),
            InvalidReason::DuplicateError { original } => write!(f, "duplicate of ({original})"),
        }
    }
}

/// Insertion-ordered set of [`InvalidReason`]s keyed by value equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorSet {
    reasons: Vec<InvalidReason>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reason. Returns `true` if it was stored as a new original.
    ///
    /// A repeat of a stored original is stored once as a `DuplicateError`;
    /// further repeats change nothing.
    pub fn insert(&mut self, reason: InvalidReason) -> bool {
        if !self.contains(&reason) {
            let original = !reason.is_duplicate();
            self.reasons.push(reason);
            return original;
        }
        if reason.is_duplicate() {
            return false;
        }
        let dup = InvalidReason::DuplicateError {
            original: Box::new(reason),
        };
        if !self.contains(&dup) {
            self.reasons.push(dup);
        }
        false
    }

    pub fn extend<I: IntoIterator<Item = InvalidReason>>(&mut self, reasons: I) {
        for reason in reasons {
            self.insert(reason);
        }
    }

    pub fn contains(&self, reason: &InvalidReason) -> bool {
        self.reasons.iter().any(|r| r == reason)
    }

    /// Remove every original matching `pred`, then every duplicate wrapping a
    /// removed original. Returns the number of entries removed.
    pub fn purge<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&InvalidReason) -> bool,
    {
        let doomed: Vec<InvalidReason> = self
            .reasons
            .iter()
            .filter(|r| !r.is_duplicate() && pred(r))
            .cloned()
            .collect();

        let before = self.reasons.len();
        self.reasons.retain(|r| {
            let root = r.root();
            !doomed.iter().any(|d| d == root) && !pred(r)
        });
        before - self.reasons.len()
    }

    pub fn clear(&mut self) {
        self.reasons.clear();
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InvalidReason> {
        self.reasons.iter()
    }
}

impl<'a> IntoIterator for &'a ErrorSet {
    type Item = &'a InvalidReason;
    type IntoIter = std::slice::Iter<'a, InvalidReason>;

    fn into_iter(self) -> Self::IntoIter {
        self.reasons.iter()
    }
}
