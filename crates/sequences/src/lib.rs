//! Email sequences: ordered email/delay/condition steps, their editing
//! rules, lifecycle, and the display helpers the sequence builder uses.

pub mod engine;
pub mod format;
pub mod state_machine;
pub mod steps;
pub mod types;
pub mod validation;

pub use engine::SequenceEngine;
pub use state_machine::{SequenceEvent, SequenceStateMachine};
pub use types::{
    Condition, ConditionType, Delay, DelayUnit, Sequence, SequenceStatus, Step, StepKind,
    StepPatch, StepRemoval, StepType, Trigger,
};
pub use validation::validate_sequence;
