use leadnectar_core::lifecycle::TransitionTable;
use leadnectar_core::{NectarError, NectarResult};
use serde::{Deserialize, Serialize};

use crate::types::{Sequence, SequenceStatus};
use crate::validation::check_ready;

/// User actions that move a sequence through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceEvent {
    Activate,
    Pause,
    Resume,
    Complete,
}

/// Guards sequence status changes with an explicit transition table.
/// `Completed` has no outgoing edges.
#[derive(Debug, Clone)]
pub struct SequenceStateMachine {
    table: TransitionTable<SequenceStatus, SequenceEvent>,
}

impl SequenceStateMachine {
    pub fn new() -> Self {
        use SequenceEvent::*;
        use SequenceStatus::*;

        Self {
            table: TransitionTable::new(&[
                (Draft, Activate, Active),
                (Draft, Complete, Completed),
                (Active, Pause, Paused),
                (Active, Complete, Completed),
                (Paused, Resume, Active),
                (Paused, Complete, Completed),
            ]),
        }
    }

    pub fn next(&self, from: SequenceStatus, event: SequenceEvent) -> Option<SequenceStatus> {
        self.table.next(from, event)
    }

    pub fn can_transition(&self, from: SequenceStatus, to: SequenceStatus) -> bool {
        self.table.can_transition(from, to)
    }

    /// Events the UI may offer for a sequence in `status`.
    pub fn available_events(&self, status: SequenceStatus) -> Vec<SequenceEvent> {
        self.table.events_from(status)
    }

    /// Apply `event` to `sequence`. Activation additionally requires the
    /// sequence to be ready to run (see [`check_ready`]).
    pub fn apply(&self, sequence: &mut Sequence, event: SequenceEvent) -> NectarResult<SequenceStatus> {
        let to = self.table.apply(sequence.status, event)?;
        if to == SequenceStatus::Active {
            check_ready(sequence)?;
        }
        sequence.status = to;
        sequence.touch();
        Ok(to)
    }

    /// The event that moves a sequence from `from` to `to`.
    pub fn event_for(&self, from: SequenceStatus, to: SequenceStatus) -> NectarResult<SequenceEvent> {
        self.table
            .event_between(from, to)
            .ok_or_else(|| NectarError::invalid_transition(from, to))
    }

    /// Move `sequence` straight to `to`, resolving the matching event.
    pub fn transition_to(&self, sequence: &mut Sequence, to: SequenceStatus) -> NectarResult<SequenceStatus> {
        let event = self.event_for(sequence.status, to)?;
        self.apply(sequence, event)
    }
}

impl Default for SequenceStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StepType, Trigger};

    fn ready_sequence() -> Sequence {
        let mut seq = Sequence::new("s", Trigger::Manual);
        seq.add_step(StepType::Email);
        seq
    }

    #[test]
    fn test_full_lifecycle_with_monotonic_timestamps() {
        let sm = SequenceStateMachine::new();
        let mut seq = ready_sequence();
        let mut last = seq.updated_at;

        for to in [
            SequenceStatus::Active,
            SequenceStatus::Paused,
            SequenceStatus::Active,
            SequenceStatus::Completed,
        ] {
            assert_eq!(sm.transition_to(&mut seq, to).unwrap(), to);
            assert_eq!(seq.status, to);
            assert!(seq.updated_at >= last);
            last = seq.updated_at;
        }
    }

    #[test]
    fn test_completed_is_terminal() {
        let sm = SequenceStateMachine::new();
        let mut seq = ready_sequence();
        sm.apply(&mut seq, SequenceEvent::Complete).unwrap();
        assert!(sm.available_events(SequenceStatus::Completed).is_empty());
        for event in [
            SequenceEvent::Activate,
            SequenceEvent::Pause,
            SequenceEvent::Resume,
            SequenceEvent::Complete,
        ] {
            assert!(matches!(
                sm.apply(&mut seq, event),
                Err(NectarError::InvalidEvent { .. })
            ));
        }
        assert_eq!(seq.status, SequenceStatus::Completed);
    }

    #[test]
    fn test_unlisted_transitions_rejected() {
        let sm = SequenceStateMachine::new();
        assert!(!sm.can_transition(SequenceStatus::Draft, SequenceStatus::Paused));
        assert!(!sm.can_transition(SequenceStatus::Paused, SequenceStatus::Draft));
        assert!(sm.can_transition(SequenceStatus::Paused, SequenceStatus::Active));
        assert_eq!(sm.next(SequenceStatus::Draft, SequenceEvent::Resume), None);
    }

    #[test]
    fn test_event_for_target_status() {
        let sm = SequenceStateMachine::new();
        assert_eq!(
            sm.event_for(SequenceStatus::Paused, SequenceStatus::Active).unwrap(),
            SequenceEvent::Resume
        );
        assert!(matches!(
            sm.event_for(SequenceStatus::Completed, SequenceStatus::Active),
            Err(NectarError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_activation_requires_ready_sequence() {
        let sm = SequenceStateMachine::new();
        let mut empty = Sequence::new("empty", Trigger::Manual);
        let before = empty.updated_at;
        assert!(matches!(
            sm.apply(&mut empty, SequenceEvent::Activate),
            Err(NectarError::Validation(_))
        ));
        assert_eq!(empty.status, SequenceStatus::Draft);
        assert_eq!(empty.updated_at, before);
    }
}
