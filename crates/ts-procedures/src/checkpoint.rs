//! Persistent checkpoint stack.
//!
//! Each checkpoint owns a full copy of the plumbing engine, so nothing done
//! after the checkpoint was taken can leak into it. Links are shared through
//! `Rc`, which makes cloning a stack cheap and leaves both copies immutable
//! below their heads.

use std::rc::Rc;

use ts_plumbing::PlumbingEngine;

use crate::condition::Condition;
use crate::engine::StepPosition;
use crate::procedure::Transition;

/// Everything needed to resume from a point in a run.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub plumb: PlumbingEngine,
    pub procedure_id: String,
    pub step_id: String,
    pub position: StepPosition,
    pub conditions: Vec<(Condition, Transition)>,
}

#[derive(Debug)]
struct Link {
    checkpoint: Checkpoint,
    next: Option<Rc<Link>>,
}

/// Singly-linked stack of checkpoints.
#[derive(Debug, Clone, Default)]
pub struct CheckpointStack {
    head: Option<Rc<Link>>,
    depth: usize,
}

impl CheckpointStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, checkpoint: Checkpoint) {
        let next = self.head.take();
        self.head = Some(Rc::new(Link { checkpoint, next }));
        self.depth += 1;
    }

    pub fn pop(&mut self) -> Option<Checkpoint> {
        let head = self.head.take()?;
        let (checkpoint, next) = match Rc::try_unwrap(head) {
            Ok(link) => (link.checkpoint, link.next),
            Err(shared) => (shared.checkpoint.clone(), shared.next.clone()),
        };
        self.head = next;
        self.depth -= 1;
        Some(checkpoint)
    }

    pub fn peek(&self) -> Option<&Checkpoint> {
        self.head.as_ref().map(|link| &link.checkpoint)
    }

    pub fn len(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Drop for CheckpointStack {
    // Unlink iteratively; recursive drops of a long list overflow the stack.
    fn drop(&mut self) {
        let mut cur = self.head.take();
        while let Some(link) = cur {
            match Rc::try_unwrap(link) {
                Ok(mut link) => cur = link.next.take(),
                Err(_) => break,
            }
        }
    }
}
