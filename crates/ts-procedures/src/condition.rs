//! Conditions that gate transitions between procedure steps.
//!
//! Conditions are evaluated against [`Snapshot`]s of the plumbing engine:
//! - **Time**: wait until an absolute time, or for a duration after the step ran
//! - **Pressure**: compare one node's pressure against a reference
//! - **Logic**: `And` / `Or` over child conditions
//!
//! Equality compares definitions only, never the cached evaluation.

use serde::{Deserialize, Serialize};
use ts_core::{Micros, Real};
use ts_plumbing::Snapshot;

/// Evaluation contract shared by every condition.
pub trait Evaluate {
    /// Reset any state that is relative to when the step was executed.
    fn reinitialize(&mut self, snapshot: &Snapshot) {
        self.update(snapshot);
    }

    /// Re-evaluate against a new snapshot.
    fn update(&mut self, snapshot: &Snapshot);

    /// Result of the last evaluation.
    fn satisfied(&self) -> bool;
}

/// True once the simulation clock reaches `time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitUntil {
    pub time: Micros,
    #[serde(skip)]
    reached: bool,
}

impl WaitUntil {
    pub fn new(time: Micros) -> Self {
        Self {
            time,
            reached: false,
        }
    }
}

impl PartialEq for WaitUntil {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
    }
}

impl Evaluate for WaitUntil {
    fn update(&mut self, snapshot: &Snapshot) {
        self.reached = snapshot.time >= self.time;
    }

    fn satisfied(&self) -> bool {
        self.reached
    }
}

/// True once `duration` has elapsed since the last reinitialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitFor {
    pub duration: Micros,
    #[serde(skip)]
    deadline: Option<Micros>,
    #[serde(skip)]
    reached: bool,
}

impl WaitFor {
    pub fn new(duration: Micros) -> Self {
        Self {
            duration,
            deadline: None,
            reached: false,
        }
    }
}

impl PartialEq for WaitFor {
    fn eq(&self, other: &Self) -> bool {
        self.duration == other.duration
    }
}

impl Evaluate for WaitFor {
    fn reinitialize(&mut self, snapshot: &Snapshot) {
        self.deadline = Some(snapshot.time + self.duration);
        self.update(snapshot);
    }

    fn update(&mut self, snapshot: &Snapshot) {
        let deadline = *self
            .deadline
            .get_or_insert(snapshot.time + self.duration);
        self.reached = snapshot.time >= deadline;
    }

    fn satisfied(&self) -> bool {
        self.reached
    }
}

/// How a node pressure is compared against the reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// Within `eps` of the reference, inclusive.
    Equal { eps: Real },
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl Comparator {
    pub fn holds(&self, value: Real, reference: Real) -> bool {
        match self {
            Comparator::Equal { eps } => (value - reference).abs() <= *eps,
            Comparator::Less => value < reference,
            Comparator::Greater => value > reference,
            Comparator::LessEqual => value <= reference,
            Comparator::GreaterEqual => value >= reference,
        }
    }
}

/// Pressure of `node` compared against `reference`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub node: String,
    pub comparator: Comparator,
    pub reference: Real,
    #[serde(skip)]
    holds: bool,
}

impl Comparison {
    pub fn new(node: impl Into<String>, comparator: Comparator, reference: Real) -> Self {
        Self {
            node: node.into(),
            comparator,
            reference,
            holds: false,
        }
    }
}

impl PartialEq for Comparison {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
            && self.comparator == other.comparator
            && self.reference == other.reference
    }
}

impl Evaluate for Comparison {
    fn update(&mut self, snapshot: &Snapshot) {
        // A node missing from the snapshot never satisfies a comparison.
        self.holds = snapshot
            .pressures
            .get(&self.node)
            .is_some_and(|&p| self.comparator.holds(p, self.reference));
    }

    fn satisfied(&self) -> bool {
        self.holds
    }
}

/// A transition guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Immediate,
    WaitUntil(WaitUntil),
    WaitFor(WaitFor),
    Comparison(Comparison),
    And { conditions: Vec<Condition> },
    Or { conditions: Vec<Condition> },
}

impl Condition {
    pub fn wait_until(time: Micros) -> Self {
        Condition::WaitUntil(WaitUntil::new(time))
    }

    pub fn wait_for(duration: Micros) -> Self {
        Condition::WaitFor(WaitFor::new(duration))
    }

    pub fn equal(node: impl Into<String>, reference: Real, eps: Real) -> Self {
        Condition::Comparison(Comparison::new(node, Comparator::Equal { eps }, reference))
    }

    pub fn less(node: impl Into<String>, reference: Real) -> Self {
        Condition::Comparison(Comparison::new(node, Comparator::Less, reference))
    }

    pub fn greater(node: impl Into<String>, reference: Real) -> Self {
        Condition::Comparison(Comparison::new(node, Comparator::Greater, reference))
    }

    pub fn less_equal(node: impl Into<String>, reference: Real) -> Self {
        Condition::Comparison(Comparison::new(node, Comparator::LessEqual, reference))
    }

    pub fn greater_equal(node: impl Into<String>, reference: Real) -> Self {
        Condition::Comparison(Comparison::new(node, Comparator::GreaterEqual, reference))
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And { conditions }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or { conditions }
    }
}

impl Evaluate for Condition {
    fn reinitialize(&mut self, snapshot: &Snapshot) {
        match self {
            Condition::Immediate => {}
            Condition::WaitUntil(c) => c.reinitialize(snapshot),
            Condition::WaitFor(c) => c.reinitialize(snapshot),
            Condition::Comparison(c) => c.reinitialize(snapshot),
            Condition::And { conditions } | Condition::Or { conditions } => {
                for c in conditions {
                    c.reinitialize(snapshot);
                }
            }
        }
    }

    fn update(&mut self, snapshot: &Snapshot) {
        match self {
            Condition::Immediate => {}
            Condition::WaitUntil(c) => c.update(snapshot),
            Condition::WaitFor(c) => c.update(snapshot),
            Condition::Comparison(c) => c.update(snapshot),
            Condition::And { conditions } | Condition::Or { conditions } => {
                for c in conditions {
                    c.update(snapshot);
                }
            }
        }
    }

    fn satisfied(&self) -> bool {
        match self {
            Condition::Immediate => true,
            Condition::WaitUntil(c) => c.satisfied(),
            Condition::WaitFor(c) => c.satisfied(),
            Condition::Comparison(c) => c.satisfied(),
            Condition::And { conditions } => conditions.iter().all(|c| c.satisfied()),
            Condition::Or { conditions } => conditions.iter().any(|c| c.satisfied()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ts_plumbing::Pressures;

    fn snap(time: Micros, pressures: &[(&str, Real)]) -> Snapshot {
        Snapshot {
            time,
            pressures: pressures
                .iter()
                .map(|(n, p)| (n.to_string(), *p))
                .collect::<Pressures>(),
        }
    }

    #[test]
    fn immediate_is_always_satisfied() {
        let c = Condition::Immediate;
        assert!(c.satisfied());
    }

    #[test]
    fn wait_until_is_absolute() {
        let mut c = Condition::wait_until(1_000);
        c.reinitialize(&snap(500, &[]));
        assert!(!c.satisfied());
        c.update(&snap(999, &[]));
        assert!(!c.satisfied());
        c.update(&snap(1_000, &[]));
        assert!(c.satisfied());
    }

    #[test]
    fn wait_for_counts_from_reinitialize() {
        let mut c = Condition::wait_for(1_000);
        c.reinitialize(&snap(5_000, &[]));
        c.update(&snap(5_999, &[]));
        assert!(!c.satisfied());
        c.update(&snap(6_000, &[]));
        assert!(c.satisfied());

        c.reinitialize(&snap(10_000, &[]));
        assert!(!c.satisfied());
    }

    #[test]
    fn comparisons() {
        let s = snap(0, &[("tank", 100.0)]);
        let cases = [
            (Condition::equal("tank", 99.5, 0.5), true),
            (Condition::equal("tank", 99.0, 0.5), false),
            (Condition::less("tank", 100.0), false),
            (Condition::less_equal("tank", 100.0), true),
            (Condition::greater("tank", 50.0), true),
            (Condition::greater_equal("tank", 100.5), false),
            (Condition::greater("missing", -1.0), false),
        ];
        for (mut c, expected) in cases {
            c.update(&s);
            assert_eq!(c.satisfied(), expected, "{c:?}");
        }
    }

    #[test]
    fn comparison_is_not_latched() {
        let mut c = Condition::greater("tank", 10.0);
        c.update(&snap(0, &[("tank", 20.0)]));
        assert!(c.satisfied());
        c.update(&snap(1, &[("tank", 5.0)]));
        assert!(!c.satisfied());
    }

    #[test]
    fn and_or_combine_children() {
        let s = snap(2_000, &[("tank", 10.0)]);
        let mut and = Condition::and(vec![
            Condition::wait_until(1_000),
            Condition::less("tank", 5.0),
        ]);
        let mut or = Condition::or(vec![
            Condition::wait_until(1_000),
            Condition::less("tank", 5.0),
        ]);
        and.update(&s);
        or.update(&s);
        assert!(!and.satisfied());
        assert!(or.satisfied());
    }

    #[test]
    fn equality_ignores_evaluation_state() {
        let mut evaluated = Condition::less("tank", 5.0);
        evaluated.update(&snap(0, &[("tank", 1.0)]));
        assert_eq!(evaluated, Condition::less("tank", 5.0));
        assert_ne!(evaluated, Condition::less("tank", 6.0));
        assert_ne!(Condition::wait_until(5), Condition::wait_for(5));
    }

    #[test]
    fn deserializes_tagged_conditions() {
        let c: Condition = serde_json::from_str(
            r#"{"type": "or", "conditions": [
                {"type": "comparison", "node": "tank", "comparator": "less", "reference": 10.0},
                {"type": "wait_for", "duration": 5000000}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            c,
            Condition::or(vec![
                Condition::less("tank", 10.0),
                Condition::wait_for(5_000_000)
            ])
        );
    }
}
