//! Step management on an in-memory sequence.
//!
//! Every successful mutation refreshes `updated_at`. Order is the list
//! index; there is no separate position field.

use leadnectar_core::{NectarError, NectarResult};
use tracing::warn;
use uuid::Uuid;

use crate::types::{Sequence, Step, StepKind, StepPatch, StepRemoval, StepType, Trigger};
use crate::validation::{validate_step, validate_trigger};

impl Sequence {
    /// Append a step of `step_type` with its default payload.
    pub fn add_step(&mut self, step_type: StepType) -> Step {
        let step = new_step(step_type);
        self.steps.push(step.clone());
        self.touch();
        step
    }

    /// Insert a step of `step_type` before `index`. `index == len` appends.
    pub fn insert_step(&mut self, index: usize, step_type: StepType) -> NectarResult<Step> {
        if index > self.steps.len() {
            return Err(NectarError::IndexOutOfRange {
                index,
                len: self.steps.len(),
            });
        }
        let step = new_step(step_type);
        self.steps.insert(index, step.clone());
        self.touch();
        Ok(step)
    }

    /// Merge `patch` into the step with `step_id`. The step is left untouched
    /// when the patch names a payload of another kind or fails validation.
    pub fn edit_step(&mut self, step_id: Uuid, patch: StepPatch) -> NectarResult<&Step> {
        let index = self
            .position(step_id)
            .ok_or_else(|| NectarError::not_found("step", step_id))?;

        let mut step = self.steps[index].clone();
        apply_patch(&mut step, patch)?;
        validate_step(&step)?;

        self.steps[index] = step;
        self.touch();
        Ok(&self.steps[index])
    }

    /// Remove the step with `step_id`. Branches that targeted it are left in
    /// place and reported in [`StepRemoval::dangling`].
    pub fn remove_step(&mut self, step_id: Uuid) -> NectarResult<StepRemoval> {
        let index = self
            .position(step_id)
            .ok_or_else(|| NectarError::not_found("step", step_id))?;
        let step = self.steps.remove(index);
        self.touch();

        let dangling: Vec<_> = crate::validation::validate_sequence(self)
            .into_iter()
            .filter(|r| r.target_step_id == step_id)
            .collect();
        if !dangling.is_empty() {
            warn!(
                sequence_id = %self.id,
                step_id = %step_id,
                count = dangling.len(),
                "Removed step is still a branch target"
            );
        }

        Ok(StepRemoval { step, dangling })
    }

    /// Move the step at `from` to `to`: remove, then reinsert.
    pub fn reorder_steps(&mut self, from: usize, to: usize) -> NectarResult<()> {
        let len = self.steps.len();
        for index in [from, to] {
            if index >= len {
                return Err(NectarError::IndexOutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }
        let step = self.steps.remove(from);
        self.steps.insert(to, step);
        self.touch();
        Ok(())
    }

    pub fn set_trigger(&mut self, trigger: Trigger) -> NectarResult<()> {
        validate_trigger(&trigger)?;
        self.trigger = trigger;
        self.touch();
        Ok(())
    }

    pub fn rename(&mut self, name: impl Into<String>, description: Option<String>) {
        self.name = name.into();
        self.description = description;
        self.touch();
    }
}

fn new_step(step_type: StepType) -> Step {
    Step {
        id: Uuid::new_v4(),
        name: step_type.default_name().to_string(),
        kind: StepKind::default_for(step_type),
    }
}

fn apply_patch(step: &mut Step, patch: StepPatch) -> NectarResult<()> {
    let step_type = step.step_type();
    let mismatch = |field: &str| {
        NectarError::validation(format!(
            "cannot set `{}` on a {} step",
            field,
            step_type.as_str()
        ))
    };

    match &mut step.kind {
        StepKind::Email { template_id } => {
            if patch.delay.is_some() {
                return Err(mismatch("delay"));
            }
            if patch.condition.is_some() {
                return Err(mismatch("condition"));
            }
            if let Some(new_template) = patch.template_id {
                *template_id = new_template;
            }
        }
        StepKind::Delay { delay } => {
            if patch.template_id.is_some() {
                return Err(mismatch("template_id"));
            }
            if patch.condition.is_some() {
                return Err(mismatch("condition"));
            }
            if let Some(new_delay) = patch.delay {
                *delay = new_delay;
            }
        }
        StepKind::Condition { condition } => {
            if patch.template_id.is_some() {
                return Err(mismatch("template_id"));
            }
            if patch.delay.is_some() {
                return Err(mismatch("delay"));
            }
            if let Some(new_condition) = patch.condition {
                *condition = new_condition;
            }
        }
    }

    if let Some(name) = patch.name {
        step.name = name;
    }
    Ok(())
}
