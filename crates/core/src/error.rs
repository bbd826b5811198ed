use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type NectarResult<T> = Result<T, NectarError>;

/// A condition step whose branch target no longer exists in its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DanglingReference {
    pub step_id: Uuid,
    pub target_step_id: Uuid,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {} branches to missing step {}",
            self.step_id, self.target_step_id
        )
    }
}

#[derive(Error, Debug)]
pub enum NectarError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Index {index} out of range for {len} steps")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Dangling branch references: {}", join_refs(.0))]
    DanglingReference(Vec<DanglingReference>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Event {event} is not allowed in status {state}")]
    InvalidEvent { state: String, event: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl NectarError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_transition(from: impl fmt::Debug, to: impl fmt::Debug) -> Self {
        Self::InvalidTransition {
            from: format!("{:?}", from),
            to: format!("{:?}", to),
        }
    }

    pub fn invalid_event(state: impl fmt::Debug, event: impl fmt::Debug) -> Self {
        Self::InvalidEvent {
            state: format!("{:?}", state),
            event: format!("{:?}", event),
        }
    }
}

fn join_refs(refs: &[DanglingReference]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_reference_message() {
        let r = DanglingReference {
            step_id: Uuid::nil(),
            target_step_id: Uuid::nil(),
        };
        let err = NectarError::DanglingReference(vec![r, r]);
        let msg = err.to_string();
        assert!(msg.starts_with("Dangling branch references: step "));
        assert_eq!(msg.matches("missing step").count(), 2);
    }

    #[test]
    fn test_not_found_message() {
        let err = NectarError::not_found("step", "abc");
        assert_eq!(err.to_string(), "step not found: abc");
    }

    #[test]
    fn test_event_and_transition_messages_differ() {
        assert_eq!(
            NectarError::invalid_event("Completed", "Activate").to_string(),
            "Event \"Activate\" is not allowed in status \"Completed\""
        );
        assert_eq!(
            NectarError::invalid_transition("Paused", "Draft").to_string(),
            "Invalid status transition from \"Paused\" to \"Draft\""
        );
    }
}
