//! Procedure state machine.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_core::Micros;
use ts_plumbing::PlumbingEngine;

use crate::checkpoint::{Checkpoint, CheckpointStack};
use crate::condition::{Condition, Evaluate};
use crate::error::{ProcedureError, ProcedureResult};
use crate::procedure::{Action, ProcedureStep, ProcedureSuite, Transition};

/// Whether the current step's action has run yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepPosition {
    Before,
    After,
}

/// Walks a procedure suite against a bound plumbing engine.
#[derive(Debug, Clone)]
pub struct ProceduresEngine {
    plumb: PlumbingEngine,
    suite: ProcedureSuite,
    current_procedure_id: String,
    current_step_id: String,
    step_position: StepPosition,
    /// Live copies of the current step's guards.
    conditions: Vec<(Condition, Transition)>,
    stack: CheckpointStack,
}

impl ProceduresEngine {
    /// Bind a plumbing engine and a suite, positioned before the first step
    /// of the starting procedure.
    pub fn new(plumb: PlumbingEngine, suite: ProcedureSuite) -> Self {
        let procedure = suite.starting_procedure();
        let current_procedure_id = procedure.id().to_string();
        let current_step_id = procedure.first_step().step_id.clone();
        Self {
            plumb,
            suite,
            current_procedure_id,
            current_step_id,
            step_position: StepPosition::Before,
            conditions: Vec::new(),
            stack: CheckpointStack::new(),
        }
    }

    /// Replace the suite and start over.
    pub fn load_suite(&mut self, suite: ProcedureSuite) {
        self.suite = suite;
        self.reset();
    }

    /// Replace the bound plumbing engine, keeping the procedure position.
    pub fn bind_plumbing(&mut self, plumb: PlumbingEngine) {
        self.plumb = plumb;
    }

    pub fn plumbing(&self) -> &PlumbingEngine {
        &self.plumb
    }

    pub fn plumbing_mut(&mut self) -> &mut PlumbingEngine {
        &mut self.plumb
    }

    pub fn suite(&self) -> &ProcedureSuite {
        &self.suite
    }

    pub fn current_procedure(&self) -> &str {
        &self.current_procedure_id
    }

    pub fn current_step_id(&self) -> &str {
        &self.current_step_id
    }

    pub fn current_step(&self) -> ProcedureResult<&ProcedureStep> {
        self.suite
            .procedure(&self.current_procedure_id)
            .ok_or_else(|| ProcedureError::UnknownProcedure {
                procedure: self.current_procedure_id.clone(),
            })?
            .step(&self.current_step_id)
            .ok_or_else(|| ProcedureError::UnknownStep {
                procedure: self.current_procedure_id.clone(),
                step: self.current_step_id.clone(),
            })
    }

    pub fn step_position(&self) -> StepPosition {
        self.step_position
    }

    pub fn current_conditions(&self) -> &[(Condition, Transition)] {
        &self.conditions
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Run the current step's action and start watching its conditions.
    pub fn execute_current(&mut self) -> ProcedureResult<()> {
        self.expect_position(StepPosition::Before)?;
        let step = self.current_step()?.clone();
        let checkpoint = self.checkpoint();

        match &step.action {
            Action::StateChange { component, state } => {
                self.plumb.set_component_state(component, state)?;
            }
            Action::Misc { action_type } => {
                debug!(action_type = action_type.as_str(), "misc action has no plumbing effect");
            }
        }
        self.stack.push(checkpoint);

        self.step_position = StepPosition::After;
        let snapshot = self.plumb.snapshot();
        self.conditions = step.conditions;
        for (condition, _) in &mut self.conditions {
            condition.reinitialize(&snapshot);
        }
        info!(
            procedure = self.current_procedure_id.as_str(),
            step = self.current_step_id.as_str(),
            operator = step.operator.as_str(),
            "step executed"
        );
        Ok(())
    }

    /// Whether [`proceed`](Self::proceed) would move.
    pub fn ready_to_proceed(&self) -> bool {
        self.step_position == StepPosition::After
            && self.conditions.iter().any(|(c, _)| c.satisfied())
    }

    /// Take the first satisfied transition. Returns `false` if none holds.
    pub fn proceed(&mut self) -> ProcedureResult<bool> {
        self.expect_position(StepPosition::After)?;
        let Some(transition) = self
            .conditions
            .iter()
            .find(|(c, _)| c.satisfied())
            .map(|(_, t)| t.clone())
        else {
            return Ok(false);
        };

        let target = self.suite.procedure(&transition.procedure).ok_or_else(|| {
            ProcedureError::UnknownProcedure {
                procedure: transition.procedure.clone(),
            }
        })?;
        if target.step(&transition.step).is_none() {
            return Err(ProcedureError::UnknownStep {
                procedure: transition.procedure,
                step: transition.step,
            });
        }

        self.push_stack();
        info!(
            from = self.current_step_id.as_str(),
            procedure = transition.procedure.as_str(),
            step = transition.step.as_str(),
            "transition"
        );
        self.current_procedure_id = transition.procedure;
        self.current_step_id = transition.step;
        self.step_position = StepPosition::Before;
        self.conditions.clear();
        Ok(true)
    }

    /// Execute the current step, or move on and execute the next one once a
    /// condition holds. Does nothing while waiting.
    pub fn next_step(&mut self) -> ProcedureResult<()> {
        match self.step_position {
            StepPosition::Before => self.execute_current(),
            StepPosition::After => {
                if self.proceed()? {
                    self.execute_current()?;
                }
                Ok(())
            }
        }
    }

    /// Advance the plumbing engine and re-evaluate the current conditions.
    pub fn step_time(&mut self, dt: Micros) -> ProcedureResult<()> {
        self.plumb.step(dt)?;
        self.update_conditions();
        Ok(())
    }

    /// Re-evaluate the current conditions against the engine as it is now.
    pub fn update_conditions(&mut self) {
        let snapshot = self.plumb.snapshot();
        for (condition, _) in &mut self.conditions {
            condition.update(&snapshot);
        }
    }

    /// Back to the first step of the starting procedure. The plumbing engine
    /// is left as is; checkpoints from the old run are dropped.
    pub fn reset(&mut self) {
        let procedure = self.suite.starting_procedure();
        self.current_procedure_id = procedure.id().to_string();
        self.current_step_id = procedure.first_step().step_id.clone();
        self.step_position = StepPosition::Before;
        self.conditions.clear();
        self.stack.clear();
    }

    pub fn push_stack(&mut self) {
        let checkpoint = self.checkpoint();
        self.stack.push(checkpoint);
    }

    /// Restore the most recent checkpoint and drop it from the stack.
    pub fn pop_and_set_stack(&mut self) -> ProcedureResult<()> {
        let checkpoint = self.stack.pop().ok_or(ProcedureError::EmptyStack)?;
        self.plumb = checkpoint.plumb;
        self.current_procedure_id = checkpoint.procedure_id;
        self.current_step_id = checkpoint.step_id;
        self.step_position = checkpoint.position;
        self.conditions = checkpoint.conditions;
        debug!(
            step = self.current_step_id.as_str(),
            depth = self.stack.len(),
            "checkpoint restored"
        );
        Ok(())
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            plumb: self.plumb.clone(),
            procedure_id: self.current_procedure_id.clone(),
            step_id: self.current_step_id.clone(),
            position: self.step_position,
            conditions: self.conditions.clone(),
        }
    }

    fn expect_position(&self, expected: StepPosition) -> ProcedureResult<()> {
        if self.step_position != expected {
            return Err(ProcedureError::WrongPosition {
                procedure: self.current_procedure_id.clone(),
                step: self.current_step_id.clone(),
                expected,
            });
        }
        Ok(())
    }
}
